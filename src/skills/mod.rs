//! Skill Library
//!
//! Reusable procedures with generated descriptions, retrievable by semantic
//! similarity.
//!
//! # Architecture
//!
//! ```text
//! add(skill) ──► Description Generator ──► archive previous version (overwrite only)
//!                                                │
//!                              index delete ◄────┘
//!                                   │
//!                     index upsert ──► registry upsert ──► count check ──► persist
//!
//! A failure after the archive step rolls the registry and index back to the
//! previous entry. If they still disagree the error is `Consistency`.
//!
//! retrieve(query) ──► index query (k = min(top_k, |registry|)) ──► registry code
//! ```
//!
//! # Layout
//!
//! ```text
//! {ckpt}/skill/skills.json           registry, rewritten on every add
//! {ckpt}/skill/code/{name}.js        current code (+ {name}V{n}.js archives)
//! {ckpt}/skill/description/{name}.txt
//! {ckpt}/skill/vectordb/             similarity index
//! ```

pub mod generator;
pub mod store;
pub mod types;

pub use generator::{format_description, DescriptionGenerator};
pub use store::SkillStore;
pub use types::{AddOutcome, NewSkill, Registry, SkillEntry, SkillPaths};
