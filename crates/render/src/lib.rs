pub mod pipeline;
pub mod templates;

pub use pipeline::{RenderError, RenderedMail, render_mail};
pub use templates::{DEFAULT_TEMPLATE, load_templates};
