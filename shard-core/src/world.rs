//! Story world types and starting data.
//!
//! Contains the player, NPCs, quests, scripted dialogue, and the story
//! state the director advances. The starting data is the Echo Shard
//! investigation: Mara the archivist sends Alex after a missing shard,
//! with the courier Eli as the first lead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A person in the story, player included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub role: String,
    pub bio: String,
    pub traits: Vec<String>,
    pub speaking_style: String,
}

/// A non-player character. Trust is unconstrained and currently unused
/// by any adjustment logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub role: String,
    pub bio: String,
    pub traits: Vec<String>,
    pub speaking_style: String,
    pub location: String,
    pub trust_level: i32,
}

/// Where a quest stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    NotStarted,
    Active,
    Completed,
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestStatus::NotStarted => "not started",
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
        };
        write!(f, "{label}")
    }
}

/// A tracked quest. Title, description, and giver never change after
/// creation; only the director (and the scripted prologue) rewrite the
/// objective or status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub description: String,
    pub giver: String,
    pub status: QuestStatus,
    pub objective: String,
}

/// Whether a dialogue line came from the script or the dynamic loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueMode {
    Scripted,
    Dynamic,
}

/// One line of dialogue or narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueEntry {
    pub speaker: String,
    pub text: String,
    pub mode: DialogueMode,
    pub tags: Vec<String>,
}

impl DialogueEntry {
    pub fn scripted(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            mode: DialogueMode::Scripted,
            tags: Vec::new(),
        }
    }

    pub fn dynamic(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            mode: DialogueMode::Dynamic,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Coarse narrative phase, advanced only by the story director.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryAct {
    Beginning,
    Middle,
    End,
    Finished,
}

impl fmt::Display for StoryAct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StoryAct::Beginning => "beginning",
            StoryAct::Middle => "middle",
            StoryAct::End => "end",
            StoryAct::Finished => "finished",
        };
        write!(f, "{label}")
    }
}

/// The mutable story state owned by one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryState {
    pub player: Character,
    pub npcs: BTreeMap<String, Npc>,
    pub quests: BTreeMap<String, Quest>,

    /// Who the conversation is focused on.
    pub active_npc: String,

    /// Scripted and dynamic dialogue in order.
    pub history: Vec<DialogueEntry>,

    pub act: StoryAct,
    pub story_goal: String,

    /// Director invocations so far.
    pub story_turn: u32,

    // Beats: set once, never cleared.
    pub met_eli: bool,
    pub found_clue: bool,
    pub truth_decision: bool,

    pub ending_summary: String,
}

impl StoryState {
    /// Printable quest summary for console commands.
    pub fn quest_view(&self) -> String {
        self.quests
            .values()
            .map(|q| {
                let objective = if q.objective.is_empty() {
                    &q.description
                } else {
                    &q.objective
                };
                format!("[{}] {} - {}", q.status, q.title, objective)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Id of the quest the director tracks through to the ending.
pub const TRACKED_QUEST: &str = "echo_shard";

/// Build the starting world: Alex, Mara, Eli, the shard quest, and the
/// scripted intro seeded into dialogue history.
pub fn initial_state() -> StoryState {
    let player = Character {
        name: "Alex".to_string(),
        role: "Main Character".to_string(),
        bio: "A young systems apprentice who returned to town after a long absence.".to_string(),
        traits: vec![
            "curious".to_string(),
            "persistent".to_string(),
            "morally conflicted".to_string(),
        ],
        speaking_style: "Direct questions, reflective under pressure.".to_string(),
    };

    let mut npcs = BTreeMap::new();
    npcs.insert(
        "mara".to_string(),
        Npc {
            name: "Mara".to_string(),
            role: "Town Archivist".to_string(),
            bio: "Protective of old knowledge, sharp but fair.".to_string(),
            traits: vec![
                "controlled".to_string(),
                "intense".to_string(),
                "duty-driven".to_string(),
            ],
            speaking_style: "Short, precise, no-nonsense.".to_string(),
            location: "Old Library".to_string(),
            trust_level: 1,
        },
    );
    npcs.insert(
        "eli".to_string(),
        Npc {
            name: "Eli".to_string(),
            role: "Courier".to_string(),
            bio: "Fast-talking messenger who hears everything first.".to_string(),
            traits: vec![
                "street-smart".to_string(),
                "evasive".to_string(),
                "opportunistic".to_string(),
            ],
            speaking_style: "Quick, slippery, tests people before revealing facts.".to_string(),
            location: "Market Gate".to_string(),
            trust_level: 0,
        },
    );

    let mut quests = BTreeMap::new();
    quests.insert(
        TRACKED_QUEST.to_string(),
        Quest {
            id: TRACKED_QUEST.to_string(),
            title: "The Missing Echo Shard".to_string(),
            description: "Find the shard that powers the archive records.".to_string(),
            giver: "Mara".to_string(),
            status: QuestStatus::Active,
            objective: "Ask Eli at the Market Gate where the shard shipment went.".to_string(),
        },
    );

    StoryState {
        player,
        npcs,
        quests,
        active_npc: "mara".to_string(),
        history: scripted_intro(),
        act: StoryAct::Beginning,
        story_goal: "Recover the missing Echo Shard and decide what truth to report.".to_string(),
        story_turn: 0,
        met_eli: false,
        found_clue: false,
        truth_decision: false,
        ending_summary: String::new(),
    }
}

/// The hardcoded opening scene.
pub fn scripted_intro() -> Vec<DialogueEntry> {
    vec![
        DialogueEntry::scripted(
            "Narrator",
            "Rain taps against the cracked glass of the Old Library as you step inside.",
        )
        .with_tags(&["scene_start"]),
        DialogueEntry::scripted("Mara", "Alex. Good. The archive's Echo Shard is missing.")
            .with_tags(&["quest_hook"]),
        DialogueEntry::scripted("Alex", "Missing? Who had access?"),
        DialogueEntry::scripted(
            "Mara",
            "A courier team. Eli was last seen near the Market Gate. Start there.",
        )
        .with_tags(&["quest_assigned"]),
        DialogueEntry::scripted("Mara", "Get me the truth.").with_tags(&["tone_set"]),
    ]
}

/// Closing lines shown once the director finishes the story.
pub fn epilogue() -> Vec<DialogueEntry> {
    vec![
        DialogueEntry::scripted("Narrator", "The storm thins to a mist as the case closes."),
        DialogueEntry::scripted("Mara", "It's done."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = initial_state();
        assert_eq!(state.act, StoryAct::Beginning);
        assert_eq!(state.story_turn, 0);
        assert!(!state.met_eli);
        assert!(!state.found_clue);
        assert!(!state.truth_decision);
        assert!(state.ending_summary.is_empty());
        assert_eq!(state.active_npc, "mara");
        assert_eq!(state.npcs.len(), 2);
        assert_eq!(
            state.quests[TRACKED_QUEST].status,
            QuestStatus::Active
        );
        assert_eq!(state.history.len(), 5);
    }

    #[test]
    fn test_quest_view_shows_status_and_objective() {
        let state = initial_state();
        let view = state.quest_view();
        assert!(view.contains("[active] The Missing Echo Shard"));
        assert!(view.contains("Ask Eli at the Market Gate"));
    }

    #[test]
    fn test_quest_view_falls_back_to_description() {
        let mut state = initial_state();
        if let Some(quest) = state.quests.get_mut(TRACKED_QUEST) {
            quest.objective.clear();
        }
        assert!(state
            .quest_view()
            .contains("Find the shard that powers the archive records."));
    }
}
