mod event;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chatter_core::chat::TranscriptLog;
use chatter_core::{Credentials, Room, RoomCfg};
use chatter_llm::http::HttpProvider;
use chatter_llm::{LlmProvider, ProviderKind, ProviderSet};

/// Terminal chat room shared by you and a handful of LLM bots.
#[derive(Parser, Debug)]
#[command(name = "chatter")]
#[command(version, about, long_about = None)]
struct Args {
    /// Model for OpenAI bots
    #[arg(short, long, default_value = "gpt-4", env = "CHATTER_MODEL")]
    model: String,

    /// Model for Anthropic bots
    #[arg(long, default_value = "claude-3-haiku-20240307", env = "CHATTER_ANTHROPIC_MODEL")]
    anthropic_model: String,

    /// Model used for personalities and respond/ignore decisions
    #[arg(long, default_value = "gpt-3.5-turbo", env = "CHATTER_UTILITY_MODEL")]
    utility_model: String,

    /// Transcript log path (default: timestamped file in the working directory)
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Your name in the room
    #[arg(short, long, default_value = "user")]
    nick: String,

    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL")]
    anthropic_base_url: Option<String>,

    #[arg(long, env = Credentials::OPENAI_VAR, hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = Credentials::ANTHROPIC_VAR, hide_env_values = true)]
    anthropic_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Tracing: write to file when RUST_LOG is set (raw mode breaks stderr)
    if std::env::var("RUST_LOG").is_ok() {
        let file = std::fs::File::create(std::env::temp_dir().join("chatter.log"))?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().json().with_target(true).with_writer(file))
            .init();
    }

    // Missing keys abort before the terminal is touched
    let creds = Credentials::resolve(args.openai_api_key.clone(), args.anthropic_api_key.clone())?;

    let log = match TranscriptLog::open(args.log.as_deref()) {
        Ok(log) => {
            tracing::info!(path = %log.path().display(), "transcript log opened");
            Some(log)
        }
        Err(e) => {
            eprintln!("Error: Unable to open log file ({e}); continuing without a transcript.");
            tracing::warn!(error = %e, "transcript log unavailable");
            None
        }
    };

    let openai: Arc<dyn LlmProvider> = Arc::new(HttpProvider::new(
        ProviderKind::OpenAi,
        args.model.clone(),
        creds.openai_api_key.clone(),
        args.openai_base_url.clone(),
    ));
    let anthropic: Arc<dyn LlmProvider> = Arc::new(HttpProvider::new(
        ProviderKind::Anthropic,
        args.anthropic_model.clone(),
        creds.anthropic_api_key.clone(),
        args.anthropic_base_url.clone(),
    ));
    let utility: Arc<dyn LlmProvider> = Arc::new(HttpProvider::new(
        ProviderKind::OpenAi,
        args.utility_model.clone(),
        creds.openai_api_key,
        args.openai_base_url,
    ));
    tracing::info!(model = %args.model, anthropic = %args.anthropic_model, utility = %args.utility_model, "providers ready");

    // Panic hook: restore terminal even on panic in raw mode
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
        default_hook(info);
    }));

    let (room, runtime, status_rx) = Room::start(
        RoomCfg::from_env(),
        ProviderSet::new(openai, anthropic),
        utility,
        log,
        args.nick,
    );
    let quit = runtime.quit();
    quit.spawn_signal_listener();

    let ui_result = tui::run_app(Arc::clone(&room), runtime.input(), status_rx, quit.clone()).await;
    quit.trigger();
    runtime.shutdown().await;
    ui_result
}
