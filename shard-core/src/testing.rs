//! Testing utilities.
//!
//! This module provides tools for protocol testing without a running
//! backend:
//! - `ScriptedLlm` returns queued raw outputs (or scripted errors) in order
//! - `TestHarness` wires a scripted backend into a full session
//! - `valid_turn_json` builds a schema-compliant raw completion

use crate::generate::{GenerateError, TextGenerator};
use crate::session::{SessionConfig, StorySession, TurnOutcome};
use crate::world::StoryAct;
use async_trait::async_trait;
use ollama::Message;
use std::collections::VecDeque;
use uuid::Uuid;

/// One scripted backend result.
#[derive(Debug, Clone)]
enum ScriptedOutput {
    Text(String),
    Error(String),
}

/// A deterministic backend that replays scripted completions.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    outputs: VecDeque<ScriptedOutput>,
}

impl ScriptedLlm {
    /// Create a backend that will return the given raw outputs in order.
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: outputs
                .into_iter()
                .map(|s| ScriptedOutput::Text(s.into()))
                .collect(),
        }
    }

    /// A backend with nothing queued; every call errors.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Queue another raw completion.
    pub fn queue(&mut self, raw: impl Into<String>) {
        self.outputs.push_back(ScriptedOutput::Text(raw.into()));
    }

    /// Queue a backend failure.
    pub fn queue_error(&mut self, message: impl Into<String>) {
        self.outputs.push_back(ScriptedOutput::Error(message.into()));
    }

    /// Scripted outputs not yet consumed.
    pub fn remaining(&self) -> usize {
        self.outputs.len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&mut self, _messages: &[Message]) -> Result<String, GenerateError> {
        match self.outputs.pop_front() {
            Some(ScriptedOutput::Text(text)) => Ok(text),
            Some(ScriptedOutput::Error(message)) => Err(GenerateError::Backend(message)),
            None => Err(GenerateError::Backend(
                "scripted backend exhausted".to_string(),
            )),
        }
    }

    fn model_id(&self) -> &str {
        "scripted-llm"
    }
}

/// A schema-compliant raw completion with the given speaker, wrapped in
/// the kind of prose a real model produces.
pub fn valid_turn_json(speaker: &str) -> String {
    format!(
        "Here is the turn:\n{{\"narrator\":\"The rain keeps falling.\",\"speaker\":\"{speaker}\",\"reply\":\"Ask your questions quickly.\",\"choices\":[\"Press about the shipment\",\"Mention Mara\",\"Leave\"],\"state_updates\":{{}},\"memory_summary\":\"{speaker} agreed to talk.\"}}"
    )
}

/// Test harness for running scripted game scenarios.
pub struct TestHarness {
    pub session: StorySession<ScriptedLlm>,
}

impl TestHarness {
    /// Create a harness over a scripted backend. Turn records land in a
    /// per-harness file under the system temp directory.
    pub fn new(llm: ScriptedLlm) -> Self {
        let log_path =
            std::env::temp_dir().join(format!("shard-harness-{}.jsonl", Uuid::new_v4()));
        let config = SessionConfig::new("Respond as the scene's NPC. Return one JSON object.")
            .with_prologue_summary(
                "Prologue summary: Mara asked Alex to investigate the missing Echo Shard.",
            )
            .with_npc("Eli")
            .with_location("Market Gate")
            .with_log_path(log_path);

        Self {
            session: StorySession::new(llm, config),
        }
    }

    /// Run one player turn.
    pub async fn turn(&mut self, input: &str) -> TurnOutcome {
        self.session.player_turn(input).await
    }

    pub fn act(&self) -> StoryAct {
        self.session.state().act
    }

    /// Conversation messages committed so far (system seed included).
    pub fn history_len(&self) -> usize {
        self.session.narrator().history().len()
    }

    /// Parsed turn records from this harness's log file.
    pub fn logged_records(&self) -> Vec<crate::turn_log::TurnRecord> {
        let Ok(content) = std::fs::read_to_string(self.session.logger().path()) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.session.logger().path());
    }
}

/// Assert the outcome is a committed story turn and return its reply.
#[track_caller]
pub fn assert_committed(outcome: &TurnOutcome) -> &crate::narrator::TurnReply {
    match outcome {
        TurnOutcome::Story { reply, .. } => reply,
        other => panic!("expected a committed turn, got {other:?}"),
    }
}

/// Assert the outcome ended the session as a protocol failure.
#[track_caller]
pub fn assert_failed(outcome: &TurnOutcome) -> &[String] {
    match outcome {
        TurnOutcome::Failed { errors } => errors,
        other => panic!("expected a failed turn, got {other:?}"),
    }
}
