//! The narrator agent.
//!
//! Drives one schema-validated turn against the generation backend:
//! prompt assembly, extraction, validation, and the single permitted
//! repair attempt. The narrator owns the conversation history; only
//! committed turns ever reach it.

use super::extract::extract_json_object;
use super::history::{ConversationHistory, HISTORY_WINDOW, PROMPT_CONTEXT_WINDOW};
use super::validate::{TurnReply, TurnValidator};
use crate::generate::{GenerateError, TextGenerator};
use ollama::Message;
use thiserror::Error;

/// System message seeding every session's conversation.
const SYSTEM_PROMPT: &str =
    "You are a grounded fantasy NPC narrator. Keep replies short and specific.";

/// Memory summary before the first committed turn.
const INITIAL_MEMORY_SUMMARY: &str = "Investigation has just entered dynamic mode.";

/// Errors from the narrator agent.
#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),

    #[error("failed to serialize committed turn: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration for a narrator.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// The fixed contract template heading every prompt.
    pub prompt_template: String,

    /// Summary of the scripted prologue, repeated each turn.
    pub prologue_summary: String,

    /// NPC the conversation is focused on.
    pub npc: String,

    /// Where the scene takes place.
    pub location: String,
}

/// Outcome of one turn attempt sequence (one or two generation calls).
#[derive(Debug, Clone)]
pub struct TurnAttempt {
    /// 1-based turn index.
    pub turn: u32,

    /// The full prompt text sent as the new user message.
    pub prompt: String,

    /// Raw model text from the most recent generation call.
    pub raw_output: String,

    /// The validated reply, if either attempt produced one.
    pub reply: Option<TurnReply>,

    /// Field-level errors from the failing attempt; empty on success.
    pub errors: Vec<String>,

    /// Generation calls made: 1 or 2.
    pub attempts: u8,

    /// True when the first attempt failed and the repair succeeded.
    pub recovered: bool,
}

impl TurnAttempt {
    pub fn is_valid(&self) -> bool {
        self.reply.is_some()
    }
}

/// The model-driven storyteller.
pub struct Narrator<G> {
    generator: G,
    history: ConversationHistory,
    validator: TurnValidator,
    config: NarratorConfig,
    turn: u32,
    last_memory_summary: String,
}

impl<G: TextGenerator> Narrator<G> {
    pub fn new(generator: G, config: NarratorConfig) -> Self {
        Self {
            generator,
            history: ConversationHistory::new(SYSTEM_PROMPT),
            validator: TurnValidator::new(),
            config,
            turn: 0,
            last_memory_summary: INITIAL_MEMORY_SUMMARY.to_string(),
        }
    }

    /// Run one turn for the given player input.
    ///
    /// On schema failure exactly one repair request is issued against the
    /// same bounded history plus the original prompt; the invalid
    /// assistant output itself is never added to the conversation. A
    /// second failure is terminal for the turn: the returned attempt
    /// carries no reply and the history is untouched.
    pub async fn run_turn(&mut self, player_input: &str) -> Result<TurnAttempt, NarratorError> {
        self.turn += 1;
        let prompt = self.build_prompt(player_input);

        let mut messages: Vec<Message> = self.history.recent(HISTORY_WINDOW).to_vec();
        messages.push(Message::user(&prompt));

        let raw = self.generator.generate(&messages).await?;
        let (reply, errors) = self.check(&raw);
        if let Some(reply) = reply {
            self.commit(player_input, &reply)?;
            return Ok(TurnAttempt {
                turn: self.turn,
                prompt,
                raw_output: raw,
                reply: Some(reply),
                errors: Vec::new(),
                attempts: 1,
                recovered: false,
            });
        }

        tracing::debug!(turn = self.turn, ?errors, "invalid model output, issuing repair");

        let mut retry_messages = messages;
        retry_messages.push(Message::user(self.repair_instruction()));
        let retry_raw = self.generator.generate(&retry_messages).await?;
        let (retry_reply, retry_errors) = self.check(&retry_raw);

        match retry_reply {
            Some(reply) => {
                self.commit(player_input, &reply)?;
                Ok(TurnAttempt {
                    turn: self.turn,
                    prompt,
                    raw_output: retry_raw,
                    reply: Some(reply),
                    errors: Vec::new(),
                    attempts: 2,
                    recovered: true,
                })
            }
            None => Ok(TurnAttempt {
                turn: self.turn,
                prompt,
                raw_output: retry_raw,
                reply: None,
                errors: retry_errors,
                attempts: 2,
                recovered: false,
            }),
        }
    }

    /// Assemble the prompt: contract template, prologue summary, recent
    /// context, running counters, scene bindings, and the player input.
    pub fn build_prompt(&self, player_input: &str) -> String {
        format!(
            "{template}\n\n{prologue}\n\nRecent context:\n{recent}\n\nTurn: {turn}\nCurrent NPC: {npc}\nCurrent location: {location}\nPlayer input: {input}\n\nReturn JSON only.",
            template = self.config.prompt_template,
            prologue = self.config.prologue_summary,
            recent = self.history.render_recent(PROMPT_CONTEXT_WINDOW),
            turn = self.turn,
            npc = self.config.npc,
            location = self.config.location,
            input = player_input,
        )
    }

    /// The single repair message: restate the full required shape with
    /// the current NPC bound into `speaker` as a literal example.
    fn repair_instruction(&self) -> String {
        format!(
            "Your last response was invalid. Return ONLY valid JSON with exactly this shape:\n{{\"narrator\":\"...\",\"speaker\":\"{}\",\"reply\":\"...\",\"choices\":[\"...\",\"...\"],\"state_updates\":{{}},\"memory_summary\":\"...\"}}",
            self.config.npc
        )
    }

    fn check(&self, raw: &str) -> (Option<TurnReply>, Vec<String>) {
        let Some(candidate) = extract_json_object(raw) else {
            return (
                None,
                vec!["No JSON object found in model output".to_string()],
            );
        };
        match self.validator.validate(&candidate) {
            Ok(reply) => (Some(reply), Vec::new()),
            Err(errors) => (None, errors.iter().map(ToString::to_string).collect()),
        }
    }

    fn commit(&mut self, player_input: &str, reply: &TurnReply) -> Result<(), NarratorError> {
        let serialized = serde_json::to_string(reply)?;
        self.history.commit_turn(player_input, &serialized);
        self.last_memory_summary = reply.memory_summary.clone();
        Ok(())
    }

    /// Turns attempted so far (including abandoned ones).
    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn last_memory_summary(&self) -> &str {
        &self.last_memory_summary
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        self.generator.model_id()
    }
}
