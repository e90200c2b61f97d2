#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use anyhow::Result;
use clap::Parser;
use glimmer::chat::ChatController;
use glimmer::config::{Config, MODELS};
use glimmer::llm::{CliChunkSink, EngineConfig, GeminiEngine};
use glimmer::sessions::SessionManager;
use glimmer::storage::FileStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "glimmer", version, about = "Streaming AI chat with persistent sessions")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Model to chat with (overrides the configured default)
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::load_or_init()?;
    let model = cli.model.unwrap_or_else(|| config.default_model.clone());

    let store = FileStore::new(config.data_dir.clone())?;
    let manager = Arc::new(Mutex::new(SessionManager::new(
        Box::new(store),
        config.max_history,
    )));
    let engine = Arc::new(GeminiEngine::new(EngineConfig::new(config.api_key.clone())));
    let controller = ChatController::new(
        Arc::clone(&manager),
        engine,
        model,
        config.context_window,
    );

    repl(&controller, &manager).await
}

async fn repl(
    controller: &ChatController,
    manager: &Arc<Mutex<SessionManager>>,
) -> Result<()> {
    println!("glimmer — /help for commands, /quit to leave");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_prompt(manager).await;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        match line.split_whitespace().next() {
            Some("/quit" | "/exit") => break,
            Some("/help") => print_help(),
            Some("/new") => {
                let mut manager = manager.lock().await;
                manager.create_session();
                persist(&manager);
                println!("started a new chat");
            }
            Some("/list") => list_sessions(manager).await,
            Some("/switch") => switch_session(manager, line.split_whitespace().nth(1)).await,
            Some("/delete") => delete_session(manager, line.split_whitespace().nth(1)).await,
            Some("/model") => match line.split_whitespace().nth(1) {
                Some(model) if MODELS.contains(&model) => {
                    controller.set_model(model.to_string());
                    println!("model set to {model}");
                }
                Some(model) => println!("unknown model '{model}', pick one of: {MODELS:?}"),
                None => println!("current model: {}", controller.model()),
            },
            Some(command) if command.starts_with('/') => {
                println!("unknown command {command}, /help for commands");
            }
            _ => {
                if line.is_empty() {
                    continue;
                }
                let session_id = manager.lock().await.active_id().to_string();
                if let Err(error) = controller
                    .send_message(&session_id, &line, &CliChunkSink::new())
                    .await
                {
                    println!("error: {error}");
                }
                println!();
            }
        }
    }

    Ok(())
}

async fn print_prompt(manager: &Arc<Mutex<SessionManager>>) {
    use std::io::Write;
    let title = {
        let manager = manager.lock().await;
        manager.active_session().title().to_string()
    };
    print!("[{title}] > ");
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!(
        "/new            start a new chat\n\
         /list           list sessions\n\
         /switch <n>     switch to session n\n\
         /delete <n>     delete session n\n\
         /model [id]     show or set the model\n\
         /quit           exit"
    );
}

async fn list_sessions(manager: &Arc<Mutex<SessionManager>>) {
    let manager = manager.lock().await;
    for (index, session) in manager.sessions().iter().enumerate() {
        let marker = if session.id == manager.active_id() {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {index}: {} ({} messages, {})",
            session.title(),
            session.messages.len(),
            session.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

async fn switch_session(manager: &Arc<Mutex<SessionManager>>, index: Option<&str>) {
    let mut manager = manager.lock().await;
    match parse_index(&manager, index) {
        Some(id) => match manager.switch_active(&id) {
            Ok(()) => println!("switched"),
            Err(error) => println!("{error}"),
        },
        None => println!("usage: /switch <n> (see /list)"),
    }
}

async fn delete_session(manager: &Arc<Mutex<SessionManager>>, index: Option<&str>) {
    let mut manager = manager.lock().await;
    match parse_index(&manager, index) {
        Some(id) => match manager.delete_session(&id) {
            Ok(()) => {
                persist(&manager);
                println!("deleted");
            }
            Err(error) => println!("{error}"),
        },
        None => println!("usage: /delete <n> (see /list)"),
    }
}

fn parse_index(manager: &SessionManager, index: Option<&str>) -> Option<String> {
    let index: usize = index?.parse().ok()?;
    manager
        .sessions()
        .get(index)
        .map(|session| session.id.clone())
}

fn persist(manager: &SessionManager) {
    if let Err(error) = manager.persist() {
        tracing::warn!("persist failed: {error}");
    }
}
