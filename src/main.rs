use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use bank_chat_core::{BackendClient, ChatRole, Config, Conversation};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

const DEFAULT_LOG_FILTER: &str = "bank_chat=info,bank_chat_core=info";

#[derive(Parser)]
#[command(name = "bank-chat")]
#[command(version, about = "Chat with the Bank Support AI assistant")]
struct Cli {
    /// Backend API base URL (overrides the config file)
    #[arg(long, global = true, env = "BANK_CHAT_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat {
        /// Continue an existing backend session
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        #[arg(required = true)]
        message: Vec<String>,
        /// Continue an existing backend session
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Check that the backend is up
    Health {
        /// Include per-component status
        #[arg(short, long)]
        detailed: bool,
    },
    /// Show the backend's stored transcript for a session
    History {
        session_id: String,
    },
    /// Ask the backend to forget a session
    EndSession {
        session_id: String,
    },
    /// Show the effective settings
    Config {
        /// Write the settings (including --base-url) to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}: {} (using defaults)", "Could not read config".yellow(), e);
        Config::new()
    });

    if let Some(base_url) = cli.base_url {
        config.base_url = Some(base_url);
    }
    let client = BackendClient::with_timeout(config.base_url(), config.request_timeout())
        .context("Failed to create HTTP client")?;

    match cli.command.unwrap_or(Commands::Chat { session: None }) {
        Commands::Chat { session } => {
            init_file_logging(&config);
            run_tui(client, session).await?
        }
        Commands::Ask { message, session } => {
            init_stderr_logging();
            ask(&client, &message.join(" "), session).await?
        }
        Commands::Health { detailed } => {
            init_stderr_logging();
            health(&client, detailed).await?
        }
        Commands::History { session_id } => {
            init_stderr_logging();
            history(&client, &session_id).await?
        }
        Commands::EndSession { session_id } => {
            init_stderr_logging();
            end_session(&client, &session_id).await?
        }
        Commands::Config { save } => show_config(&config, save)?,
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

/// The TUI owns the terminal, so diagnostics go to a log file instead.
fn init_file_logging(config: &Config) {
    let Some(path) = config.log_path() else {
        return;
    };
    match open_log_file(&path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        Err(e) => eprintln!("Could not open log file {:?}: {}", path, e),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

async fn run_tui(client: BackendClient, session: Option<String>) -> Result<()> {
    let conversation = match session {
        Some(id) => Conversation::with_session(id),
        None => Conversation::new(),
    };
    let mut app = App::with_conversation(client, conversation);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    tracing::info!(base_url = app.client.base_url(), "chat started");

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!(messages = app.conversation.messages().len(), "chat closed");
    result
}

async fn ask(client: &BackendClient, question: &str, session: Option<String>) -> Result<()> {
    let mut conversation = match session {
        Some(id) => Conversation::with_session(id),
        None => Conversation::new(),
    };

    println!("🏦 {}\n", question.bold().cyan());
    conversation.send_message(client, question).await?;

    let Some(reply) = conversation
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::Assistant)
    else {
        return Ok(());
    };

    if reply.error {
        println!("{}", reply.content.red());
        println!("Make sure the backend is running at {}", client.base_url().bold());
        return Ok(());
    }

    println!("{}", reply.content);

    if !reply.sources.is_empty() {
        println!("\n{}", "Sources:".bold().blue());
        for source in &reply.sources {
            match &source.url {
                Some(url) => println!("  • {} {}", source.label().yellow(), url.dimmed()),
                None => println!("  • {}", source.label().yellow()),
            }
        }
    }

    if let Some(method) = &reply.method {
        println!("\n{} {}", "Method:".dimmed(), method.dimmed());
    }
    if reply.escalate {
        println!("{}", "This question has been handed off to a human agent.".magenta());
    }
    if let Some(session_id) = conversation.session_id() {
        println!("{} {}", "Session:".dimmed(), session_id.dimmed());
    }

    Ok(())
}

async fn health(client: &BackendClient, detailed: bool) -> Result<()> {
    let status = if detailed {
        client.get_detailed_health().await
    } else {
        client.get_health().await
    };

    match status {
        Ok(body) => {
            println!("{} {}", "✓".green(), client.base_url().bold());
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(e) => {
            println!("{} {}", "✗".red(), client.base_url().bold());
            return Err(e).context("Backend unreachable");
        }
    }

    Ok(())
}

async fn history(client: &BackendClient, session_id: &str) -> Result<()> {
    let history = client
        .get_history(session_id)
        .await
        .with_context(|| format!("Could not fetch history for session {}", session_id))?;

    println!("\n{}", format!("📜 Session {}", history.session_id).bold().green());
    println!("{}", "=".repeat(50).dimmed());

    if history.history.is_empty() {
        println!("{}", "No messages stored for this session".yellow());
    }

    for entry in &history.history {
        let label = match entry.role {
            ChatRole::User => "You".bold().cyan(),
            ChatRole::Assistant => "Assistant".bold().yellow(),
        };
        println!("\n{}\n{}", label, entry.content);
    }

    Ok(())
}

async fn end_session(client: &BackendClient, session_id: &str) -> Result<()> {
    let confirmation = client
        .end_session(session_id)
        .await
        .with_context(|| format!("Could not end session {}", session_id))?;
    println!("{} {}", "✓".green(), confirmation);
    Ok(())
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    let path = Config::get_config_path()?;

    println!("\n{}", "⚙️  Configuration".bold().green());
    println!("{}", "=".repeat(50).dimmed());
    println!("{} {}", "File:".bold(), path.display());
    println!("{} {}", "Backend:".bold(), config.base_url());
    println!("{} {}s", "Timeout:".bold(), config.request_timeout().as_secs());
    if let Some(log) = config.log_path() {
        println!("{} {}", "Log file:".bold(), log.display());
    }

    if save {
        config.save().context("Failed to save config")?;
        println!("\n{} Saved to {}", "✓".green(), path.display());
    }

    Ok(())
}
