use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use vocero::config::AppConfig;
use vocero::core::audio::device::CpalBackend;
use vocero::core::channel::{GeminiModel, GeminiVoice};
use vocero::core::session::{ConnectionState, SessionController};

/// Vocero - live voice assistant session from the terminal
#[derive(Parser, Debug)]
#[command(name = "vocero")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Live model to connect to
    #[arg(long = "model", value_name = "MODEL")]
    model: Option<String>,

    /// Voice for synthesized speech
    #[arg(long = "voice", value_name = "VOICE")]
    voice: Option<String>,

    /// Persona instruction sent at session setup
    #[arg(long = "instructions", value_name = "TEXT")]
    instructions: Option<String>,

    /// End the session after this many seconds (runs until Ctrl-C if unset)
    #[arg(long = "duration-secs", value_name = "SECS")]
    duration_secs: Option<u64>,

    /// Start with the microphone muted
    #[arg(long = "muted")]
    muted: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(model) = cli.model {
        config.model = GeminiModel::from_str_or_default(&model);
    }
    if let Some(voice) = cli.voice {
        config.voice = GeminiVoice::from_str_or_default(&voice);
    }
    if let Some(instructions) = cli.instructions {
        config.instructions = instructions;
    }

    println!(
        "Connecting to {} with voice {}",
        config.model, config.voice
    );

    let backend = Arc::new(CpalBackend::new());
    let controller = SessionController::new(config.channel_config(), backend);
    controller.set_muted(cli.muted);
    controller.connect().await?;

    println!("Session live. Speak into the microphone; Ctrl-C ends the session.");

    let deadline = cli.duration_secs.map(Duration::from_secs);
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                info!("interrupt received, closing session");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = controller.snapshot().await;
                if snapshot.connection_state != ConnectionState::Connected {
                    println!();
                    info!(state = %snapshot.connection_state, "session ended remotely");
                    break;
                }
                print_level_bar(snapshot.volume_level, snapshot.is_muted);
                if let Some(limit) = deadline {
                    if started.elapsed() >= limit {
                        println!();
                        break;
                    }
                }
            }
        }
    }

    controller.disconnect().await;
    println!("Session closed.");
    Ok(())
}

/// Redraw the single-line volume meter.
fn print_level_bar(level: f32, muted: bool) {
    const WIDTH: usize = 30;
    let filled = ((level * WIDTH as f32) as usize).min(WIDTH);
    let bar: String = "#".repeat(filled) + &" ".repeat(WIDTH - filled);
    let tag = if muted { "muted" } else { "live " };
    print!("\r[{bar}] {tag}");
    let _ = std::io::stdout().flush();
}
