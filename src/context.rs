//! Agent Context
//!
//! Built once per agent run and handed to each component constructor.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::completion::{ChatClient, SharedCompletion};
use crate::config::Config;
use crate::embeddings::{embedder_from_config, Embedder};
use crate::frames::VisionContext;

#[derive(Clone)]
pub struct AgentContext {
    pub config: Config,
    pub completion: SharedCompletion,
    pub embedder: Arc<dyn Embedder>,
    pub vision: VisionContext,
}

impl AgentContext {
    /// Wire collaborators from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let completion: SharedCompletion = Arc::new(ChatClient::from_config(&config));
        let embedder = embedder_from_config(&config)?;

        info!(
            completion = ?config.completion_backend,
            model = %config.completion_model,
            embeddings = embedder.name(),
            vision = config.vision.enabled,
            "Agent context ready"
        );

        Ok(Self::new(config, completion, embedder))
    }

    /// Assemble from explicit collaborators
    pub fn new(config: Config, completion: SharedCompletion, embedder: Arc<dyn Embedder>) -> Self {
        let vision = VisionContext::from_config(&config.vision);
        Self {
            config,
            completion,
            embedder,
            vision,
        }
    }
}
