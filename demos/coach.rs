//! Interactive chat REPL for the Zenith Flow coach.
//!
//! Usage:
//!   GEMINI_API_KEY=... cargo run --example coach
//!   GEMINI_API_KEY=... cargo run --example coach -- --model gemini-2.0-flash --user demo-user
//!
//! Ctrl-C or type "exit" / "quit" to leave. Calendar sync will ask for
//! re-authentication unless GOOGLE_ACCESS_TOKEN is set.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use zenith_coach::{
    standard_registry, CallerContext, Coach, CoachConfig, CoachEvent, GeminiGateway,
    GoogleCalendarProvider, MemoryRepository, MemoryTokenStore, TurnOutcome,
};

#[derive(Parser)]
#[command(name = "coach", about = "Chat with the Zenith Flow coach")]
struct Cli {
    /// Model to use
    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,

    /// User id for this session
    #[arg(long, default_value = "demo-user")]
    user: String,

    /// Max tool round-trips per message
    #[arg(long, default_value_t = 4)]
    max_round_trips: usize,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("error: GEMINI_API_KEY not set");
        std::process::exit(1);
    });

    let mut gateway = GeminiGateway::new(&api_key).with_model(&cli.model);
    if let Some(ref url) = cli.base_url {
        gateway = gateway.with_base_url(url);
    }

    let repo = Arc::new(MemoryRepository::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    if let Ok(token) = std::env::var("GOOGLE_ACCESS_TOKEN") {
        tokens.insert(&cli.user, token).await;
    }
    let calendar = Arc::new(GoogleCalendarProvider::new(
        tokens,
        std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
        std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/api/auth/google/callback".into()),
    ));

    let registry = match standard_registry(repo, calendar) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let config = CoachConfig {
        max_tool_round_trips: cli.max_round_trips,
        ..CoachConfig::default()
    };
    let coach = Coach::new(gateway, registry, config);
    let context = CallerContext::new(&cli.user);

    eprintln!("zenith-coach");
    eprintln!("model: {}", cli.model);
    eprintln!("user: {}", cli.user);
    eprintln!("---");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut history = Vec::new();

    loop {
        eprint!("\x1b[1;36myou>\x1b[0m ");
        io::stderr().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if matches!(trimmed, "exit" | "quit" | "/q") {
            break;
        }

        let (tx, mut rx) = tokio::sync::mpsc::channel::<CoachEvent>(64);

        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    CoachEvent::Text { content } => {
                        eprint!("\x1b[1;32mcoach>\x1b[0m ");
                        println!("{content}");
                    }
                    CoachEvent::ToolCall { name, input } => {
                        eprintln!("\x1b[33m  [tool: {name}]\x1b[0m {input}");
                    }
                    CoachEvent::ToolResult {
                        name,
                        output,
                        is_error,
                    } => {
                        let tag = if is_error { "error" } else { "result" };
                        let rendered = output.to_string();
                        let truncated = if rendered.len() > 200 {
                            format!("{}...", &rendered[..200])
                        } else {
                            rendered
                        };
                        eprintln!("\x1b[33m  [{tag}: {name}]\x1b[0m {truncated}");
                    }
                    CoachEvent::AuthRequired { auth_url } => {
                        eprintln!("\x1b[35m  [reconnect calendar: {auth_url}]\x1b[0m");
                    }
                    CoachEvent::Finished { round_trips } => {
                        if round_trips > 0 {
                            eprintln!("\x1b[2m  ({round_trips} tool round-trips)\x1b[0m");
                        }
                    }
                    _ => {}
                }
            }
        });

        match coach
            .handle_turn_streaming(&mut history, trimmed, &context, tx)
            .await
        {
            Ok(TurnOutcome::AuthRequired { auth_url, .. }) => {
                printer.await.ok();
                eprintln!("\x1b[1;35mvisit to reconnect:\x1b[0m {auth_url}");
            }
            Ok(_) => {
                printer.await.ok();
            }
            Err(e) => {
                printer.await.ok();
                eprintln!("\x1b[1;31merror:\x1b[0m {e}");
            }
        }
    }

    eprintln!("bye.");
}
