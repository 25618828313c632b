//! WordMaster Engine - Main entry point.
//!
//! Console runner: wires the Ollama storyteller into a game loop and
//! drives one session per run from the terminal.

use std::io::{self, Write};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod infrastructure;
mod prompt_templates;
mod use_cases;

use infrastructure::ollama::OllamaClient;
use infrastructure::resilient_storyteller::{ResilientStoryteller, RetryConfig};
use use_cases::{ChapterGenerator, GameLoop};
use wordmaster_domain::{
    Chapter, GameSettings, GameSetup, Genre, Phase, Session, SessionEvent, SessionOutcome,
};

const DEFAULT_HERO_NAME: &str = "Cheolsu";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordmaster_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WordMaster Engine");

    // Load configuration
    let ollama_url = std::env::var("OLLAMA_URL")
        .or_else(|_| std::env::var("OLLAMA_BASE_URL"))
        .unwrap_or_else(|_| "http://localhost:11434".into());
    let ollama_model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".into());
    let settings = GameSettings::from_env();

    // Create infrastructure clients
    let ollama_client = Arc::new(OllamaClient::new(&ollama_url, &ollama_model));
    let storyteller = Arc::new(ResilientStoryteller::new(
        ollama_client,
        RetryConfig::default(),
    ));
    let generator = ChapterGenerator::from_env(storyteller);

    tracing::info!(url = %ollama_url, model = %ollama_model, "Storyteller configured");

    let mut game = GameLoop::new(Session::new(settings), generator);
    run_console(&mut game).await
}

async fn run_console(game: &mut GameLoop) -> anyhow::Result<()> {
    println!("=== WordMaster ===");
    println!("Learn three magic words by living one story.\n");

    loop {
        match game.session().phase() {
            Phase::Input => {
                let Some(setup) = read_setup()? else {
                    println!("Goodbye!");
                    return Ok(());
                };
                game.dispatch(SessionEvent::Start(setup));
            }
            Phase::Loading => {
                println!("\nThe storyteller is writing...");
                game.run_generation().await;
            }
            Phase::Story => {
                if let Some(chapter) = game.session().current_chapter() {
                    print_chapter(chapter, game.session().turn());
                }
                if prompt_line("Press Enter for the quiz")?.is_none() {
                    return Ok(());
                }
                game.dispatch(SessionEvent::Advance);
            }
            Phase::Quiz => {
                let Some(event) = run_quiz(game.session())? else {
                    return Ok(());
                };
                game.dispatch(event);
            }
            Phase::ActionInput => {
                let Some(action) = prompt_line("\nWhat does the hero do next? ")? else {
                    return Ok(());
                };
                if action.is_empty() {
                    println!("The hero hesitates. Type an action to continue.");
                    continue;
                }
                game.dispatch(SessionEvent::SubmitAction(action));
            }
            Phase::Result(outcome) => {
                print_result(outcome, game.session());
                match prompt_line("\nPlay again? [y/N] ")? {
                    Some(answer) if answer.eq_ignore_ascii_case("y") => {
                        game.dispatch(SessionEvent::Restart);
                        println!();
                    }
                    _ => {
                        println!("Goodbye!");
                        return Ok(());
                    }
                }
            }
            Phase::Error => {
                if let Some(failure) = game.session().last_error() {
                    println!("\nThe storyteller stumbled: {}", failure.message());
                }
                match prompt_line("Try again? [Y/n] ")? {
                    Some(answer) if answer.eq_ignore_ascii_case("n") => {
                        game.dispatch(SessionEvent::Restart);
                        println!();
                    }
                    Some(_) => game.dispatch(SessionEvent::Retry),
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Prompt and read one trimmed line. Returns `None` when stdin is closed.
fn prompt_line(prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Collect hero name, target words, and genre. Returns `None` to quit.
fn read_setup() -> anyhow::Result<Option<GameSetup>> {
    loop {
        let Some(hero_name) = prompt_line(&format!("Hero name [{DEFAULT_HERO_NAME}]: "))? else {
            return Ok(None);
        };
        if hero_name.eq_ignore_ascii_case("quit") || hero_name.eq_ignore_ascii_case("exit") {
            return Ok(None);
        }
        let hero_name = if hero_name.is_empty() {
            DEFAULT_HERO_NAME.to_string()
        } else {
            hero_name
        };

        let Some(words_line) = prompt_line("Three magic words (comma separated): ")? else {
            return Ok(None);
        };
        let words: Vec<String> = words_line.split(',').map(|w| w.trim().to_string()).collect();

        println!("Genre:");
        for (i, genre) in Genre::all().iter().enumerate() {
            println!("  {}. {}", i + 1, genre.display_name());
        }
        let Some(choice) = prompt_line("Pick a genre [1]: ")? else {
            return Ok(None);
        };
        let genre = parse_genre_choice(&choice);

        match GameSetup::new(hero_name, words, genre) {
            Ok(setup) => return Ok(Some(setup)),
            Err(e) => println!("{e}\n"),
        }
    }
}

fn parse_genre_choice(choice: &str) -> Genre {
    if choice.is_empty() {
        return Genre::default();
    }
    if let Ok(index) = choice.parse::<usize>() {
        if let Some(genre) = Genre::all().get(index.saturating_sub(1)) {
            return *genre;
        }
    }
    choice.parse().unwrap_or_default()
}

fn print_chapter(chapter: &Chapter, turn: u32) {
    println!("\n=== Turn {} - {} ===\n", turn, chapter.title());
    println!("{}\n", render_emphasis(chapter.content()));
}

/// Turn `<b></b>` word highlighting into something a terminal can show.
fn render_emphasis(content: &str) -> String {
    content.replace("<b>", "*").replace("</b>", "*")
}

/// Show the quiz and translate the player's pick into a session event.
/// Returns `None` when stdin is closed.
fn run_quiz(session: &Session) -> anyhow::Result<Option<SessionEvent>> {
    let Some(chapter) = session.current_chapter() else {
        return Ok(Some(SessionEvent::Restart));
    };
    let quiz = chapter.quiz();

    println!("--- Quiz ---");
    println!("{}", quiz.question());
    for (i, option) in quiz.options().iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    println!("Lives: {}", hearts(session.hp(), session.max_hp()));

    let Some(choice) = prompt_line("Your answer: ")? else {
        return Ok(None);
    };
    let picked = match choice.parse::<usize>() {
        Ok(n) => quiz
            .options()
            .get(n.saturating_sub(1))
            .cloned()
            .unwrap_or(choice),
        Err(_) => choice,
    };

    if quiz.is_correct(&picked) {
        println!("Correct!");
        Ok(Some(SessionEvent::AnswerCorrect))
    } else {
        println!("Not quite...");
        Ok(Some(SessionEvent::AnswerWrong))
    }
}

fn hearts(hp: u8, max_hp: u8) -> String {
    (0..max_hp)
        .map(|i| if i < hp { "♥" } else { "♡" })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_result(outcome: SessionOutcome, session: &Session) {
    match outcome {
        SessionOutcome::Victory => {
            println!("\n=== The story is complete! ===");
            if let Some(setup) = session.setup() {
                println!(
                    "{} mastered all three magic words: {}.",
                    setup.hero_name(),
                    setup.target_words().join(", ")
                );
            }
        }
        SessionOutcome::Defeat => {
            println!("\n=== Game over ===");
            println!("The hero ran out of lives on turn {}.", session.turn());
        }
    }

    let mut recap: Vec<&str> = session.history().iter().map(String::as_str).collect();
    if let Some(chapter) = session.current_chapter() {
        recap.push(chapter.summary());
    }
    if !recap.is_empty() {
        println!("\nThe story so far:");
        for (i, part) in recap.iter().enumerate() {
            println!("  {}. {}", i + 1, part);
        }
    }
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
