//! Schema-validated turn narration.
//!
//! Contains the narrator agent, structured output recovery, schema
//! validation, and bounded conversation history.

mod agent;
mod extract;
pub mod history;
mod validate;

pub use agent::{Narrator, NarratorConfig, NarratorError, TurnAttempt};
pub use extract::extract_json_object;
pub use history::ConversationHistory;
pub use validate::{validate_turn, TurnReply, TurnValidator, ValidationError};
