//! The scripted prologue.
//!
//! Plays the hardcoded opening scene and two scripted choices, applies
//! their quest and NPC side effects, and hands the dynamic loop its
//! starting point.

use crate::ui;
use shard_core::world::{DialogueEntry, StoryState, TRACKED_QUEST};

/// What the prologue hands to the dynamic loop.
#[derive(Debug, Clone)]
pub struct PrologueOutcome {
    /// Summary repeated in every generated prompt.
    pub summary: String,

    /// The player's final scripted action, fed in as turn 1 input.
    pub initial_action: String,

    /// NPC the dynamic conversation opens on.
    pub npc: String,

    /// Location the dynamic conversation opens in.
    pub location: String,
}

/// Run the prologue against the starting world.
///
/// Returns `None` if the player quits (or stdin closes) mid-script.
pub async fn run(state: &mut StoryState) -> Option<PrologueOutcome> {
    println!("### PROLOGUE ###");
    for line in &state.history {
        println!("{}: {}", line.speaker, line.text);
    }
    println!();

    println!("### SCRIPTED CHOICES ###");
    let first = prompt_choice(
        "How do you answer Mara?",
        &["I'm in. Tell me where to start.", "Why pick me for this?"],
    )?;

    if first == 1 {
        append(state, "Alex", "I'm in. Tell me where to start.");
        ui::ellipsis("Mara is thinking", 2).await;
        append(state, "Mara", "Good. Keep your head down and your ears open.");
    } else {
        append(state, "Alex", "Why pick me for this?");
        ui::ellipsis("Mara is thinking", 2).await;
        append(
            state,
            "Mara",
            "Because you don't scare easy, and you still owe me a favor.",
        );
    }

    let second = prompt_choice(
        "What is your first move?",
        &[
            "Go straight to Eli at the Market Gate.",
            "Check the library shipping records first.",
        ],
    )?;

    let (initial_action, npc, location) = if second == 1 {
        append(state, "Alex", "I'll go to the Market Gate and find Eli.");
        ui::ellipsis("Mara is thinking", 2).await;
        append(state, "Mara", "Ask short questions. Eli lies when people ramble.");
        state.active_npc = "eli".to_string();
        if let Some(quest) = state.quests.get_mut(TRACKED_QUEST) {
            quest.objective =
                "Talk to Eli at the Market Gate about the missing shipment.".to_string();
        }
        (
            "I go to the Market Gate and question Eli about the missing shipment.",
            "Eli",
            "Market Gate",
        )
    } else {
        append(state, "Alex", "I'll check your shipping records first.");
        ui::ellipsis("Mara is thinking", 2).await;
        append(
            state,
            "Mara",
            "Fine. Find ledger 7C, then go to Eli with facts in hand.",
        );
        if let Some(quest) = state.quests.get_mut(TRACKED_QUEST) {
            quest.objective = "Inspect ledger 7C in the Old Library, then question Eli.".to_string();
        }
        (
            "I inspect ledger 7C in the Old Library before meeting Eli.",
            "Mara",
            "Old Library",
        )
    };

    println!("Narrator: The scripted prologue ends. From here, dynamic mode continues.");
    println!();

    let summary = format!(
        "Prologue summary: Mara asked Alex to investigate the missing Echo Shard. \
         Eli was last seen near the Market Gate. \
         Player final scripted action: {initial_action}"
    );

    Some(PrologueOutcome {
        summary,
        initial_action: initial_action.to_string(),
        npc: npc.to_string(),
        location: location.to_string(),
    })
}

fn append(state: &mut StoryState, speaker: &str, text: &str) {
    state.history.push(DialogueEntry::scripted(speaker, text));
    println!("{speaker}: {text}");
}

/// Present a two-way choice and block until the player picks one.
fn prompt_choice(prompt: &str, options: &[&str]) -> Option<u32> {
    println!("{prompt}");
    for (i, option) in options.iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
    loop {
        let raw = ui::read_line("Choice > ")?;
        if ui::is_quit(&raw) {
            println!("Session ended.");
            return None;
        }
        match raw.as_str() {
            "1" => return Some(1),
            "2" => return Some(2),
            _ => println!("Enter 1 or 2."),
        }
    }
}
