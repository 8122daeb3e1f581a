//! Echo Shard narrative engine.
//!
//! This crate provides:
//! - A schema-validated turn protocol over a language-model backend
//!   (extraction, validation, one-shot repair, bounded history)
//! - A deterministic story director advancing narrative acts from
//!   keyword triggers in player input
//! - An append-only JSONL turn log
//! - Scripted-backend test utilities
//!
//! # Quick Start
//!
//! ```ignore
//! use shard_core::{OllamaGenerator, SessionConfig, StorySession, TurnOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ollama::Ollama::from_env();
//!     let generator = OllamaGenerator::new(client, 256);
//!
//!     let config = SessionConfig::new(template)
//!         .with_npc("Eli")
//!         .with_location("Market Gate");
//!     let mut session = StorySession::new(generator, config);
//!
//!     match session.player_turn("I question Eli about the shipment").await {
//!         TurnOutcome::Story { reply, .. } => println!("{}", reply.narrator),
//!         other => println!("{other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod director;
pub mod generate;
pub mod narrator;
pub mod session;
pub mod testing;
pub mod turn_log;
pub mod world;

// Re-export the wire types the engine speaks.
pub use ollama::{Message, Role};

// Primary public API
pub use generate::{GenerateError, OllamaGenerator, TextGenerator};
pub use narrator::{Narrator, NarratorConfig, NarratorError, TurnReply};
pub use session::{SessionConfig, SessionError, StorySession, TurnOutcome};
pub use testing::{ScriptedLlm, TestHarness};
pub use world::{StoryAct, StoryState};
