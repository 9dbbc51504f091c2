//! Skill Memory
//!
//! Memory and validation core for autonomous agents that accumulate reusable
//! skills.
//!
//! # Features
//!
//! - **Skill Store**: durable registry + similarity index kept in lockstep,
//!   versioned overwrites, bounded top-k retrieval
//! - **Critic**: bounded-retry coercion of model output into `(success, critique)`
//! - **Frame Sampling**: evenly spaced screenshots from the latest complete session
//!
//! # Architecture
//!
//! ```text
//! Agent loop ──► SkillStore.retrieve ──► SimilarityIndex (SQLite + Embedder)
//!     │                                      ▲
//!     ├──► SkillStore.add ──► Description ───┘ (Completion)
//!     │
//!     └──► Critic ──► ResponseValidator ──► Completion
//!               ▲
//!               └── FrameSampler (vision)
//! ```

pub mod completion;
pub mod config;
pub mod context;
pub mod critic;
pub mod embeddings;
pub mod error;
pub mod frames;
pub mod index;
pub mod prompts;
pub mod skills;

pub use completion::{ChatClient, CompletionClient, ContentPart, Prompt, SharedCompletion};
pub use config::{Config, CriticMode, EmbeddingBackend, ImageEncoding};
pub use context::AgentContext;
pub use critic::{Critic, ManualReviewer, ResponseValidator, ValidatedResponse};
pub use embeddings::{Embedder, HashEmbedder, OllamaEmbedder, OpenAiEmbedder};
pub use error::{ConfigError, StoreError, StoreResult};
pub use frames::{FrameSampler, VisionContext};
pub use index::{IndexHit, SimilarityIndex, SqliteVectorIndex};
pub use skills::{AddOutcome, NewSkill, SkillEntry, SkillStore};
