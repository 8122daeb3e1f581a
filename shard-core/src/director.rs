//! Deterministic story progression.
//!
//! Acts advance linearly on keyword triggers found in the raw player
//! input; the model's generated dialogue never drives progression. Each
//! act has one pure predicate, and only the predicate for the current
//! act is consulted per invocation.

use crate::world::{QuestStatus, StoryAct, StoryState, TRACKED_QUEST};

const BEGINNING_TRIGGERS: &[&str] = &["eli", "market gate"];
const MIDDLE_TRIGGERS: &[&str] = &["ledger", "clue", "signature"];
const END_TRIGGERS: &[&str] = &["truth", "report", "lie"];

/// Summary written when the truth decision lands.
const ENDING_SUMMARY: &str = "Alex resolved the Echo Shard case.";

/// Objective line the tracked quest closes on.
const CLOSING_OBJECTIVE: &str = "Case closed.";

fn contains_any(input: &str, triggers: &[&str]) -> bool {
    let lowered = input.to_lowercase();
    triggers.iter().any(|t| lowered.contains(t))
}

/// Does this input move the story out of the opening act?
pub fn beginning_advances(input: &str) -> bool {
    contains_any(input, BEGINNING_TRIGGERS)
}

/// Does this input uncover the clue that ends the middle act?
pub fn middle_advances(input: &str) -> bool {
    contains_any(input, MIDDLE_TRIGGERS)
}

/// Does this input commit to a verdict and finish the story?
pub fn end_advances(input: &str) -> bool {
    contains_any(input, END_TRIGGERS)
}

/// Advance the story state for one player input.
///
/// `story_turn` increments on every invocation. At most one transition
/// fires, chosen by the current act alone; `Finished` is terminal.
/// Returns the act entered, if any.
pub fn apply(state: &mut StoryState, player_input: &str) -> Option<StoryAct> {
    state.story_turn += 1;

    let entered = match state.act {
        StoryAct::Beginning if beginning_advances(player_input) => {
            state.met_eli = true;
            Some(StoryAct::Middle)
        }
        StoryAct::Middle if middle_advances(player_input) => {
            state.found_clue = true;
            Some(StoryAct::End)
        }
        StoryAct::End if end_advances(player_input) => {
            state.truth_decision = true;
            state.ending_summary = ENDING_SUMMARY.to_string();
            if let Some(quest) = state.quests.get_mut(TRACKED_QUEST) {
                quest.status = QuestStatus::Completed;
                quest.objective = CLOSING_OBJECTIVE.to_string();
            }
            Some(StoryAct::Finished)
        }
        _ => None,
    };

    if let Some(act) = entered {
        tracing::debug!(
            from = %state.act,
            to = %act,
            turn = state.story_turn,
            "story act advanced"
        );
        state.act = act;
    }
    entered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::initial_state;

    #[test]
    fn test_predicates_are_case_insensitive() {
        assert!(beginning_advances("I go find ELI."));
        assert!(beginning_advances("Head for the Market Gate"));
        assert!(middle_advances("open Ledger 7C"));
        assert!(end_advances("I'll REPORT what I found"));
    }

    #[test]
    fn test_predicates_reject_unrelated_text() {
        assert!(!beginning_advances("I wander the docks"));
        assert!(!middle_advances("I ask about the weather"));
        assert!(!end_advances("I keep digging"));
    }

    #[test]
    fn test_beginning_to_middle_sets_beat() {
        let mut state = initial_state();
        let entered = apply(&mut state, "I go find Eli at the market gate");

        assert_eq!(entered, Some(StoryAct::Middle));
        assert_eq!(state.act, StoryAct::Middle);
        assert!(state.met_eli);
        // Only the current act's predicate is evaluated: the same call
        // must not also consume middle-act triggers.
        assert!(!state.found_clue);
        assert_eq!(state.story_turn, 1);
    }

    #[test]
    fn test_no_trigger_leaves_act_unchanged_but_counts_turn() {
        let mut state = initial_state();
        assert_eq!(apply(&mut state, "I stall for time"), None);
        assert_eq!(state.act, StoryAct::Beginning);
        assert_eq!(state.story_turn, 1);
    }

    #[test]
    fn test_no_act_skipping() {
        let mut state = initial_state();
        // A middle-act trigger does nothing while still in the beginning.
        assert_eq!(apply(&mut state, "I look for a ledger"), None);
        assert_eq!(state.act, StoryAct::Beginning);
        assert!(!state.found_clue);
    }

    #[test]
    fn test_full_progression_completes_quest() {
        let mut state = initial_state();

        apply(&mut state, "I head to the market gate");
        assert_eq!(state.act, StoryAct::Middle);

        apply(&mut state, "I found a ledger with a signature");
        assert_eq!(state.act, StoryAct::End);
        assert!(state.found_clue);

        let entered = apply(&mut state, "I'll report the truth");
        assert_eq!(entered, Some(StoryAct::Finished));
        assert_eq!(state.act, StoryAct::Finished);
        assert!(state.truth_decision);
        assert!(!state.ending_summary.is_empty());

        let quest = &state.quests[TRACKED_QUEST];
        assert_eq!(quest.status, QuestStatus::Completed);
        assert_eq!(quest.objective, "Case closed.");
        assert_eq!(state.story_turn, 3);
    }

    #[test]
    fn test_finished_is_terminal() {
        let mut state = initial_state();
        apply(&mut state, "eli");
        apply(&mut state, "clue");
        apply(&mut state, "truth");
        assert_eq!(state.act, StoryAct::Finished);

        // Further triggers change nothing but the turn counter.
        assert_eq!(apply(&mut state, "eli clue truth"), None);
        assert_eq!(state.act, StoryAct::Finished);
        assert_eq!(state.story_turn, 4);
    }
}
