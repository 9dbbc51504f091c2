//! Skill Description Generator
//!
//! Asks the completion backend for a one-line summary of a procedure and
//! wraps it as a commented signature stub, which is what gets embedded.

use anyhow::{Context, Result};
use tracing::info;

use crate::completion::{Prompt, SharedCompletion};
use crate::frames::VisionContext;
use crate::prompts;

pub struct DescriptionGenerator {
    completion: SharedCompletion,
    vision: VisionContext,
}

impl DescriptionGenerator {
    pub fn new(completion: SharedCompletion, vision: VisionContext) -> Self {
        Self { completion, vision }
    }

    pub fn render_prompt(&self, program_name: &str, program_code: &str) -> Prompt {
        Prompt::new(prompts::SKILL_DESCRIPTION)
            .with_images(self.vision.image_parts())
            .with_text(format!(
                "{}\n\nThe main function is `{}`.",
                program_code, program_name
            ))
    }

    pub async fn generate(&self, program_name: &str, program_code: &str) -> Result<String> {
        let prompt = self.render_prompt(program_name, program_code);
        let summary = self
            .completion
            .complete(&prompt)
            .await
            .with_context(|| format!("Failed to describe skill {}", program_name))?;

        let description = format_description(program_name, &summary);
        info!(skill = %program_name, "Generated skill description:\n{}", description);
        Ok(description)
    }
}

/// `async function {name}(bot) {\n    // {summary}\n}`
pub fn format_description(program_name: &str, summary: &str) -> String {
    let summary = summary.trim().replace('\n', " ");
    format!(
        "async function {}(bot) {{\n    // {}\n}}",
        program_name, summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_description() {
        assert_eq!(
            format_description("mineWood", "Mine wood logs nearby.\n"),
            "async function mineWood(bot) {\n    // Mine wood logs nearby.\n}"
        );
    }
}
