//! Task Critic
//!
//! Renders the judgment prompt (observation, task, context and optional
//! frames) and dispatches to the automated validator or a human reviewer.

use std::io::{BufRead, Write};
use tracing::{debug, error};

use super::manual::ManualReviewer;
use super::validator::{ResponseValidator, ValidatedResponse};
use crate::completion::Prompt;
use crate::config::CriticMode;
use crate::context::AgentContext;
use crate::frames::VisionContext;
use crate::prompts;

pub struct Critic {
    validator: ResponseValidator,
    vision: VisionContext,
    mode: CriticMode,
    max_retries: u32,
}

impl Critic {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            validator: ResponseValidator::new(ctx.completion.clone()),
            vision: ctx.vision.clone(),
            mode: ctx.config.critic_mode,
            max_retries: ctx.config.critic_max_retries,
        }
    }

    /// Judgment prompt; `None` when the observation is unusable
    pub fn render_prompt(&self, task: &str, context: &str, observation: Option<&str>) -> Option<Prompt> {
        let observation = observation?;

        let mut text = String::new();
        text.push_str(observation);
        if !observation.is_empty() && !observation.ends_with("\n\n") {
            text.push_str("\n\n");
        }
        text.push_str(&format!("Task: {}\n\n", task));
        if context.is_empty() {
            text.push_str("Context: None\n\n");
        } else {
            text.push_str(&format!("Context: {}\n\n", context));
        }

        debug!("Critic human message:\n{}", text);

        Some(
            Prompt::new(prompts::CRITIC)
                .with_images(self.vision.image_parts())
                .with_text(text),
        )
    }

    /// Judge task success in the configured mode.
    ///
    /// Manual mode reads from the process terminal.
    pub async fn check_task_success(
        &self,
        task: &str,
        context: &str,
        observation: Option<&str>,
    ) -> ValidatedResponse {
        match self.mode {
            CriticMode::Manual => {
                let stdin = std::io::stdin();
                let mut reviewer = ManualReviewer::new(stdin.lock(), std::io::stdout());
                Self::judge_manually(&mut reviewer)
            }
            CriticMode::Auto => self.judge_automatically(task, context, observation).await,
        }
    }

    /// Validator loop over the rendered prompt
    pub async fn judge_automatically(
        &self,
        task: &str,
        context: &str,
        observation: Option<&str>,
    ) -> ValidatedResponse {
        match self.render_prompt(task, context, observation) {
            Some(prompt) => self.validator.invoke(&prompt, self.max_retries).await,
            None => ValidatedResponse::failed(),
        }
    }

    pub fn judge_manually<R: BufRead, W: Write>(
        reviewer: &mut ManualReviewer<R, W>,
    ) -> ValidatedResponse {
        reviewer.review().unwrap_or_else(|e| {
            error!("Manual review aborted: {}", e);
            ValidatedResponse::failed()
        })
    }
}
