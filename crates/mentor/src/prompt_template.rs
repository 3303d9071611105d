use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

/// The default system prompt, rendered with the agent's systems
pub const SYSTEM_PROMPT_TEMPLATE: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Read a template from disk and check that it renders with `context_data`.
///
/// Returns the template source, not the rendered text.
pub fn load_template_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    let template_content = fs::read_to_string(&template_path).map_err(|e| {
        TeraError::chain(
            format!("Failed to read template file {}", template_path.display()),
            e,
        )
    })?;
    load_prompt(&template_content, context_data)?;
    Ok(template_content)
}
