use tera::Tera;

/// Template used when a message does not name one.
pub const DEFAULT_TEMPLATE: &str = "default-mail.html";

/// Compile every mail template under `dir` into a process-wide cache.
///
/// Called once at startup; workers share the compiled cache for the lifetime
/// of the process.
pub fn load_templates(dir: &str) -> anyhow::Result<Tera> {
    let glob = format!("{}/**/*.html", dir);
    let tera = Tera::new(&glob)?;

    let count = tera.get_template_names().count();
    if count == 0 {
        anyhow::bail!("no mail templates found under {dir}");
    }
    tracing::info!(dir, count, "Mail template cache loaded");

    Ok(tera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_templates_missing_dir_fails() {
        assert!(load_templates("no/such/dir").is_err());
    }
}
