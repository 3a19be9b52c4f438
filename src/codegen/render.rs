//! Template rendering

use minijinja::Environment;
use serde_json::Value;

use super::names::{pascal_case, snake_case};
use super::GenerationError;

/// Renders one template source against a context
pub trait TemplateRenderer {
    fn render(&self, name: &str, source: &str, context: &Value) -> Result<String, GenerationError>;
}

/// [`TemplateRenderer`] backed by minijinja
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaRenderer;

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, source: &str, context: &Value) -> Result<String, GenerationError> {
        let render_error = |err: minijinja::Error| GenerationError::Render {
            template: name.to_string(),
            message: err.to_string(),
        };

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.add_filter("pascal_case", pascal_case);
        env.add_filter("snake_case", snake_case);

        env.add_template(name, source).map_err(render_error)?;
        env.get_template(name)
            .and_then(|template| template.render(context))
            .map_err(render_error)
    }
}
