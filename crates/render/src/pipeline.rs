//! Render pipeline: template → HTML → plain-text fallback → inlined CSS.
//!
//! Only a failed template *lookup* aborts a message. A failed render keeps
//! whatever output was produced, and the two transform steps fall back to a
//! safe value, so a message that reaches this point always comes out the
//! other end with something deliverable.

use courier_common::config::DeliveryConfig;
use courier_common::types::MailMessage;
use tera::{Context, Tera};
use thiserror::Error;

use crate::templates::DEFAULT_TEMPLATE;

/// Line width used when deriving the plain-text fallback.
const PLAIN_TEXT_WIDTH: usize = 80;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("mail template not found: {0}")]
    TemplateNotFound(String),
}

/// Final deliverable payload for one message.
#[derive(Debug, Clone)]
pub struct RenderedMail {
    /// Self-contained HTML body with styles inlined.
    pub html: String,
    /// Plain-text alternative derived from the rendered HTML.
    pub plain: String,
}

/// Run the full pipeline for one message against the compiled template cache
/// and the current configuration snapshot.
///
/// Errors only when the selected template does not exist; every other failure
/// is logged and degraded to a fallback value.
pub fn render_mail(
    message: &MailMessage,
    config: &DeliveryConfig,
    templates: &Tera,
) -> Result<RenderedMail, RenderError> {
    let name = if message.template.is_empty() {
        DEFAULT_TEMPLATE
    } else {
        message.template.as_str()
    };

    if !templates.get_template_names().any(|n| n == name) {
        return Err(RenderError::TemplateNotFound(name.to_string()));
    }

    let mut context = Context::new();
    context.insert("content", &message.content);
    context.insert("from", &message.from_address);
    context.insert("from_name", &message.from_name);
    context.insert("preferences", config);
    context.insert("string_map", &message.string_map);
    context.insert("int_map", &message.int_map);
    context.insert("float_map", &message.float_map);
    context.insert("row_sets", &message.row_sets);

    // A render error does not abort the message; it proceeds with whatever
    // output the engine produced before failing.
    let html = match templates.render(name, &context) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(
                error = %e,
                template = name,
                "Mail template render failed, continuing with partial output"
            );
            String::new()
        }
    };

    let plain = plain_text(&html);
    let html = inline_styles(html);

    Ok(RenderedMail { html, plain })
}

/// Best-effort plain-text rendering of the HTML body. Falls back to the empty
/// string so a conversion failure never drops the message.
pub fn plain_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), PLAIN_TEXT_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Plain-text conversion failed, using empty fallback");
            String::new()
        }
    }
}

/// Inline `<style>` rules into element attributes so the mail is
/// self-contained for clients that strip document-level styles. Falls back to
/// the un-inlined HTML on failure.
pub fn inline_styles(html: String) -> String {
    match css_inline::inline(&html) {
        Ok(inlined) => inlined,
        Err(e) => {
            tracing::error!(error = %e, "CSS inlining failed, sending un-inlined HTML");
            html
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn test_config() -> DeliveryConfig {
        DeliveryConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: "587".to_string(),
            smtp_user: "user".to_string(),
            smtp_password: "secret".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: "Courier".to_string(),
        }
    }

    fn cache_with(name: &str, body: &str) -> Tera {
        let mut tera = Tera::default();
        tera.add_raw_template(name, body).unwrap();
        tera
    }

    #[test]
    fn test_empty_template_name_selects_default() {
        let templates = cache_with(DEFAULT_TEMPLATE, "{{ content | safe }}");
        let message = MailMessage::new("a@x.com", "S", "<p>Hi</p>");

        let rendered = render_mail(&message, &test_config(), &templates).unwrap();
        assert!(rendered.html.contains("Hi"));
    }

    #[test]
    fn test_unresolvable_template_aborts() {
        let templates = cache_with(DEFAULT_TEMPLATE, "{{ content | safe }}");
        let mut message = MailMessage::new("a@x.com", "S", "<p>Hi</p>");
        message.template = "no-such-template.html".to_string();

        let err = render_mail(&message, &test_config(), &templates).unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(name) if name == "no-such-template.html"));
    }

    #[test]
    fn test_render_failure_continues_with_partial_output() {
        // Referencing an undefined variable fails the render; the message
        // still comes through with the (empty) partial output.
        let templates = cache_with(DEFAULT_TEMPLATE, "{{ undefined_variable }}");
        let message = MailMessage::new("a@x.com", "S", "<p>Hi</p>");

        let rendered = render_mail(&message, &test_config(), &templates).unwrap();
        assert!(!rendered.html.contains("Hi"));
        assert!(rendered.plain.trim().is_empty());
    }

    #[test]
    fn test_auxiliary_maps_reach_the_template() {
        let templates = cache_with(
            DEFAULT_TEMPLATE,
            "{{ string_map.service }} {{ int_map.count }} {{ float_map.uptime }}",
        );
        let mut message = MailMessage::new("a@x.com", "S", "");
        message.string_map = HashMap::from([("service".to_string(), "web-1".to_string())]);
        message.int_map = HashMap::from([("count".to_string(), 3)]);
        message.float_map = HashMap::from([("uptime".to_string(), 99.9)]);

        let rendered = render_mail(&message, &test_config(), &templates).unwrap();
        assert!(rendered.html.contains("web-1"));
        assert!(rendered.html.contains('3'));
        assert!(rendered.html.contains("99.9"));
    }

    #[test]
    fn test_preferences_exposed_under_stable_name() {
        let templates = cache_with(DEFAULT_TEMPLATE, "{{ preferences.smtp_host }}");
        let message = MailMessage::new("a@x.com", "S", "");

        let rendered = render_mail(&message, &test_config(), &templates).unwrap();
        assert!(rendered.html.contains("smtp.example.com"));
    }

    #[test]
    fn test_plain_text_from_simple_html() {
        assert_eq!(plain_text("<p>Hi</p>").trim(), "Hi");
    }

    #[test]
    fn test_inline_styles_moves_rules_onto_elements() {
        let html = "<html><head><style>p { color: red; }</style></head>\
                    <body><p>Hi</p></body></html>";
        let inlined = inline_styles(html.to_string());
        assert!(inlined.contains("color: red"));
        assert!(inlined.contains("style="));
    }

    #[test]
    fn test_row_sets_reach_the_template() {
        let templates = cache_with(
            DEFAULT_TEMPLATE,
            "{% for host in row_sets.hosts %}{{ host }};{% endfor %}",
        );
        let mut message = MailMessage::new("a@x.com", "S", "");
        message.row_sets = HashMap::from([(
            "hosts".to_string(),
            serde_json::json!(["alpha", "beta"]),
        )]);

        let rendered = render_mail(&message, &test_config(), &templates).unwrap();
        assert!(rendered.html.contains("alpha;beta;"));
    }
}
