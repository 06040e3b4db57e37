use starlight_support::{
    config::SupportConfig,
    controller::TurnController,
    shell::{parse_input, render_suggestions, render_turn, ShellCommand, HELP_TEXT},
    speech::{SpeechInput, UnavailableSpeech},
    SupportError,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Logs go to stderr so they don't interleave with the chat
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SupportConfig::from_env()?;

    info!(
        model = %config.model,
        faq_path = %config.faq_path.display(),
        "Starlight Bank support chat starting"
    );

    let controller = TurnController::from_config(&config);
    let speech = UnavailableSpeech;

    println!("{}\n", HELP_TEXT);
    let mut printed = print_new_turns(&controller, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let suggestions = controller.visible_suggestions();
        let utterance = match parse_input(&line, suggestions.as_deref()) {
            ShellCommand::Quit => break,
            ShellCommand::Empty => continue,
            ShellCommand::Clear => {
                controller.clear_chat();
                printed = print_new_turns(&controller, 0);
                continue;
            }
            ShellCommand::Mic => match listen(&speech).await {
                Some(text) => text,
                None => continue,
            },
            ShellCommand::Say(text) => text,
        };

        println!("  ...");
        match controller.handle_utterance(&utterance).await {
            Ok(()) => {}
            Err(SupportError::EmptyMessage) => continue,
            Err(e) => {
                warn!("Message not sent: {}", e);
                continue;
            }
        }

        printed = print_new_turns(&controller, printed);
    }

    info!("Support chat closed");
    Ok(())
}

/// Print turns from `from` onwards plus any visible suggestions.
/// Returns the new count of printed turns.
fn print_new_turns(controller: &TurnController, from: usize) -> usize {
    let turns = controller.transcript();
    for turn in &turns[from.min(turns.len())..] {
        println!("{}", render_turn(turn));
    }
    if let Some(suggestions) = controller.visible_suggestions() {
        println!("{}", render_suggestions(&suggestions));
    }
    turns.len()
}

async fn listen(speech: &dyn SpeechInput) -> Option<String> {
    if !speech.is_available() {
        println!("Speech input isn't available here. Please type your question.");
        return None;
    }

    println!("Listening ({})...", speech.language());
    match speech.listen().await {
        Ok(text) => text.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            warn!("Speech recognition failed: {}", e);
            None
        }
    }
}
