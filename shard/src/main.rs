//! Echo Shard console game.
//!
//! A scripted prologue hands off to a dynamic loop where a local model
//! narrates each turn as a validated JSON object and the story director
//! advances acts from the player's own words.

mod prologue;
mod ui;

use std::path::Path;

use shard_core::{
    session::load_prompt_template, world, OllamaGenerator, SessionConfig, SessionError,
    StorySession, TurnOutcome, TurnReply,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROMPT_PATH: &str = "prompts/prompt_v1.txt";
const DEFAULT_MAX_TOKENS: usize = 256;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "shard=info".into()),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), SessionError> {
    let prompt_path = std::env::var("SHARD_PROMPT_PATH")
        .unwrap_or_else(|_| DEFAULT_PROMPT_PATH.to_string());
    let template = load_prompt_template(Path::new(&prompt_path)).await?;

    let client = ollama::Ollama::from_env();
    tracing::info!(model = client.model(), "checking backend");
    client.probe().await?;

    let max_tokens = std::env::var("SHARD_MAX_TOKENS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_TOKENS);
    let generator = OllamaGenerator::new(client, max_tokens);

    let log_path = std::env::var("SHARD_LOG_PATH")
        .unwrap_or_else(|_| shard_core::session::DEFAULT_LOG_PATH.to_string());

    // The prologue shapes the world before the session takes ownership.
    let mut state = world::initial_state();
    let Some(outcome) = prologue::run(&mut state).await else {
        return Ok(());
    };

    let config = SessionConfig::new(template)
        .with_prologue_summary(outcome.summary.clone())
        .with_npc(outcome.npc.clone())
        .with_location(outcome.location.clone())
        .with_log_path(log_path);

    let mut session = StorySession::with_state(generator, config, state);

    println!("Dynamic mode enabled. The narrator is live. /quit or /exit to stop.");
    game_loop(&mut session, outcome.initial_action).await;
    Ok(())
}

/// The dynamic turn loop: each committed turn ends in a choice menu, and
/// the chosen line becomes the next turn's player input.
async fn game_loop(session: &mut StorySession<OllamaGenerator>, initial_action: String) {
    let mut input = initial_action;

    loop {
        println!("The narrator is thinking...");
        match session.player_turn(&input).await {
            TurnOutcome::Story { reply, recovered } => {
                if recovered {
                    tracing::debug!("turn recovered after retry");
                }
                present_turn(&reply).await;
                match choose(&reply.choices) {
                    Some(choice) => input = choice,
                    None => {
                        println!("Session ended.");
                        return;
                    }
                }
            }
            TurnOutcome::Ending { summary, epilogue } => {
                for line in epilogue {
                    println!("{}: {}", line.speaker, line.text);
                    ui::beat().await;
                }
                tracing::info!(summary = %summary, "story complete");
                return;
            }
            TurnOutcome::Failed { errors } => {
                println!("Narrator > (invalid JSON output)");
                for error in &errors {
                    println!("  - {error}");
                }
                println!("Session ended: no fallback mode.");
                return;
            }
            TurnOutcome::Abandoned { reason } => {
                println!("Generation error: {reason}");
                match free_input(session) {
                    Some(next) => input = next,
                    None => {
                        println!("Session ended.");
                        return;
                    }
                }
            }
        }
    }
}

async fn present_turn(reply: &TurnReply) {
    println!("Narrator: {}", reply.narrator);
    ui::beat().await;
    println!("{}: {}", reply.speaker, reply.reply);
    ui::beat().await;
    for (i, choice) in reply.choices.iter().enumerate() {
        println!("  {}. {choice}", i + 1);
    }
}

/// Block for a numeric choice; re-prompt on anything else.
fn choose(choices: &[String]) -> Option<String> {
    loop {
        let raw = ui::read_line("Choice > ")?;
        if ui::is_quit(&raw) {
            return None;
        }
        let Ok(index) = raw.parse::<usize>() else {
            println!("Please choose by number.");
            continue;
        };
        if (1..=choices.len()).contains(&index) {
            return Some(choices[index - 1].clone());
        }
        println!("Invalid choice number. Try again.");
    }
}

/// Free-text re-entry after an abandoned turn. Handles the console
/// commands; returns the next player input or `None` to quit.
fn free_input(session: &StorySession<OllamaGenerator>) -> Option<String> {
    loop {
        let raw = ui::read_line("You > ")?;
        if raw.is_empty() {
            continue;
        }
        if ui::is_quit(&raw) {
            return None;
        }
        match raw.to_lowercase().as_str() {
            "/help" => {
                println!("Commands: /help, /quests, /quit, /exit");
                println!("Anything else is played as your next action.");
            }
            "/quests" => println!("{}", session.state().quest_view()),
            _ => return Some(raw),
        }
    }
}
