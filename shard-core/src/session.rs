//! StorySession - the primary public API for playing the game.
//!
//! A session owns everything mutable about one playthrough: the narrator
//! (orchestrator plus conversation history), the story state the
//! director advances, and the turn logger. Nothing lives in process-wide
//! state.

use crate::director;
use crate::generate::TextGenerator;
use crate::narrator::{Narrator, NarratorConfig, TurnAttempt, TurnReply};
use crate::turn_log::{TurnLogger, TurnRecord};
use crate::world::{self, DialogueEntry, StoryAct, StoryState};
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Default log target, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "dialogue_log.jsonl";

/// Errors from session setup.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Prompt file not found: {0}")]
    MissingPromptTemplate(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend unavailable: {0}")]
    Backend(#[from] ollama::Error),
}

/// Load the prompt contract template.
///
/// Called once at startup; a missing template is fatal before any
/// session state exists.
pub async fn load_prompt_template(path: &Path) -> Result<String, SessionError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(SessionError::MissingPromptTemplate(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).await?;
    Ok(text.trim().to_string())
}

/// Configuration for creating a story session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The turn contract template (already loaded).
    pub prompt_template: String,

    /// Prologue summary repeated in every prompt.
    pub prologue_summary: String,

    /// NPC the dynamic conversation opens on.
    pub npc: String,

    /// Location the dynamic conversation opens in.
    pub location: String,

    /// Where turn records are appended.
    pub log_path: PathBuf,
}

impl SessionConfig {
    pub fn new(prompt_template: impl Into<String>) -> Self {
        Self {
            prompt_template: prompt_template.into(),
            prologue_summary: String::new(),
            npc: "Eli".to_string(),
            location: "Market Gate".to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }

    pub fn with_prologue_summary(mut self, summary: impl Into<String>) -> Self {
        self.prologue_summary = summary.into();
        self
    }

    pub fn with_npc(mut self, npc: impl Into<String>) -> Self {
        self.npc = npc.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }
}

/// What one player turn produced.
#[derive(Debug)]
pub enum TurnOutcome {
    /// A committed, validated turn ready for presentation.
    Story { reply: TurnReply, recovered: bool },

    /// The director closed the story; no generation call was made.
    Ending {
        summary: String,
        epilogue: Vec<DialogueEntry>,
    },

    /// Structured generation failed twice; the session is over.
    Failed { errors: Vec<String> },

    /// The backend call failed; the turn was abandoned and the session
    /// may continue with fresh input.
    Abandoned { reason: String },
}

/// A single playthrough.
pub struct StorySession<G> {
    narrator: Narrator<G>,
    state: StoryState,
    logger: TurnLogger,
}

impl<G: TextGenerator> StorySession<G> {
    /// Create a session over the standard starting world.
    pub fn new(generator: G, config: SessionConfig) -> Self {
        Self::with_state(generator, config, world::initial_state())
    }

    /// Create a session over a pre-shaped world, e.g. after the scripted
    /// prologue has applied its side effects.
    pub fn with_state(generator: G, config: SessionConfig, state: StoryState) -> Self {
        let narrator = Narrator::new(
            generator,
            NarratorConfig {
                prompt_template: config.prompt_template,
                prologue_summary: config.prologue_summary,
                npc: config.npc,
                location: config.location,
            },
        );
        Self {
            narrator,
            state,
            logger: TurnLogger::new(config.log_path),
        }
    }

    /// Run one full player turn.
    ///
    /// The director sees the raw input first; if it closes the story the
    /// generation call is skipped. Otherwise the narrator runs the
    /// schema-validated protocol and the attempt is logged exactly once.
    pub async fn player_turn(&mut self, input: &str) -> TurnOutcome {
        self.state
            .history
            .push(DialogueEntry::dynamic(self.state.player.name.clone(), input).with_tags(&["player_input"]));

        if director::apply(&mut self.state, input) == Some(StoryAct::Finished) {
            tracing::info!(turn = self.state.story_turn, "story finished");
            return TurnOutcome::Ending {
                summary: self.state.ending_summary.clone(),
                epilogue: world::epilogue(),
            };
        }

        let attempt = match self.narrator.run_turn(input).await {
            Ok(attempt) => attempt,
            Err(err) => {
                tracing::warn!(error = %err, "turn abandoned");
                return TurnOutcome::Abandoned {
                    reason: err.to_string(),
                };
            }
        };

        self.log_attempt(input, &attempt).await;

        match attempt.reply {
            Some(reply) => {
                self.state
                    .history
                    .push(DialogueEntry::dynamic(reply.speaker.clone(), reply.reply.clone()));
                TurnOutcome::Story {
                    reply,
                    recovered: attempt.recovered,
                }
            }
            None => TurnOutcome::Failed {
                errors: attempt.errors,
            },
        }
    }

    async fn log_attempt(&self, input: &str, attempt: &TurnAttempt) {
        let record = TurnRecord {
            timestamp: Utc::now(),
            session: self.logger.session(),
            model: self.narrator.model_id().to_string(),
            turn: attempt.turn,
            user_input: input.to_string(),
            prompt: attempt.prompt.clone(),
            raw_output: attempt.raw_output.clone(),
            parsed_output: attempt
                .reply
                .as_ref()
                .and_then(|r| serde_json::to_value(r).ok()),
            valid: attempt.is_valid(),
            errors: attempt.errors.clone(),
            attempts: attempt.attempts,
            recovered: attempt.recovered,
        };
        // A logging failure must not end the game.
        if let Err(err) = self.logger.append(&record).await {
            tracing::warn!(error = %err, "failed to append turn record");
        }
    }

    pub fn state(&self) -> &StoryState {
        &self.state
    }

    /// Direct access to story state.
    ///
    /// Use with caution - this bypasses the director. Intended for the
    /// scripted prologue's quest and NPC side effects.
    pub fn state_mut(&mut self) -> &mut StoryState {
        &mut self.state
    }

    pub fn narrator(&self) -> &Narrator<G> {
        &self.narrator
    }

    pub fn logger(&self) -> &TurnLogger {
        &self.logger
    }

    /// The running memory summary from the most recent committed turn.
    pub fn last_memory_summary(&self) -> &str {
        self.narrator.last_memory_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("contract")
            .with_prologue_summary("the shard is missing")
            .with_npc("Mara")
            .with_location("Old Library")
            .with_log_path("/tmp/shard-test.jsonl");

        assert_eq!(config.prompt_template, "contract");
        assert_eq!(config.npc, "Mara");
        assert_eq!(config.location, "Old Library");
        assert_eq!(config.log_path, PathBuf::from("/tmp/shard-test.jsonl"));
    }

    #[tokio::test]
    async fn test_load_prompt_template_missing_is_fatal() {
        let missing = Path::new("/nonexistent/prompt_v1.txt");
        match load_prompt_template(missing).await {
            Err(SessionError::MissingPromptTemplate(path)) => {
                assert_eq!(path, missing.to_path_buf());
            }
            other => panic!("expected MissingPromptTemplate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_prompt_template_trims() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompt_v1.txt");
        std::fs::write(&path, "  stay in character  \n").expect("write");

        let template = load_prompt_template(&path).await.expect("load");
        assert_eq!(template, "stay in character");
    }
}
