//! Critic
//!
//! Coerces free-form model judgments into validated structured data.
//!
//! ```text
//! completion ──► strip fences ──► fix & parse ──► schema check ──► (success, critique)
//!      ▲                                               │
//!      └────────────── retry (bounded) ◄───────────────┘
//! ```

pub mod agent;
pub mod manual;
pub mod repair;
pub mod validator;

pub use agent::Critic;
pub use manual::ManualReviewer;
pub use repair::{fix_and_parse_json, strip_code_fences};
pub use validator::{parse_response, ResponseValidator, ValidatedResponse};
