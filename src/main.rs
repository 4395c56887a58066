use std::io::Write;
use std::sync::Arc;

use agent_chat::agent_directory::{AgentDirectory, HttpDirectoryApi};
use agent_chat::agent_socket::{ChatSession, SendOutcome, SessionUpdate, WebSocketConnector};
use agent_chat::chat_types::AgentId;
use agent_chat::commands::HELP_TEXT;
use agent_chat::{
    builtin_agent_kinds, init_logging, parse_slash_command, ChatView, EnvConfig, SlashCommand,
    TranscriptPrinter,
};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

type View = ChatView<HttpDirectoryApi>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EnvConfig::from_env().context("reading AGENT_CHAT_* environment")?;
    init_logging(&config.log_config());

    let api = HttpDirectoryApi::new(config.directory_config())
        .context("building directory client")?;
    let mut directory = AgentDirectory::new(api);
    directory.seed(builtin_agent_kinds());

    let mut connector = WebSocketConnector::new();
    if let Some(timeout) = config.timeout {
        connector = connector.with_handshake_timeout(timeout);
    }
    let session = ChatSession::new(config.session_config(), Arc::new(connector));
    let mut view = ChatView::new(directory, session);

    if view.refresh_agents().await.is_err() {
        if let Some(banner) = view.banner() {
            eprintln!("{banner}");
        }
    }

    let initial = config
        .agent
        .clone()
        .or_else(|| view.directory().agents().first().map(|agent| agent.id.clone()));
    if let Some(agent_id) = initial {
        if let Err(error) = view.select_agent(&agent_id).await {
            eprintln!("cannot open {agent_id}: {error}");
        }
    }

    println!("{}", view.header_line());
    eprintln!("{}", view.status_line());

    let result = run(&mut view).await;
    view.shutdown().await;
    result
}

async fn run(view: &mut View) -> anyhow::Result<()> {
    let mut updates = view.subscribe();
    let mut printer = TranscriptPrinter::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    return Ok(());
                };
                if !handle_line(view, &line).await {
                    return Ok(());
                }
            }
            update = updates.recv() => match update {
                Ok(SessionUpdate::TranscriptChanged) | Err(RecvError::Lagged(_)) => {
                    let text = printer.render(&view.messages());
                    stdout.write_all(text.as_bytes()).context("writing transcript")?;
                    stdout.flush().context("flushing transcript")?;
                }
                Ok(SessionUpdate::StatusChanged { .. }) => eprintln!("[{}]", view.status_line()),
                Ok(SessionUpdate::RetryScheduled { delay, .. }) => {
                    eprintln!("[retrying in {}ms]", delay.as_millis());
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

/// Returns false when the user asked to quit.
async fn handle_line(view: &mut View, line: &str) -> bool {
    let Some(command) = parse_slash_command(line) else {
        match view.submit(line) {
            Ok(SendOutcome::Queued) => eprintln!("[queued until connected]"),
            Ok(SendOutcome::Dispatched | SendOutcome::Ignored) => {}
            Err(error) => eprintln!("{error}; use /agents and /use <id>"),
        }
        return true;
    };

    match command {
        SlashCommand::Help => println!("{HELP_TEXT}"),
        SlashCommand::Agents => {
            if view.refresh_agents().await.is_err() {
                if let Some(banner) = view.banner() {
                    eprintln!("{banner}");
                }
            }
            let selected = view.directory().selected().cloned();
            for agent in view.directory().agents() {
                let marker = if Some(&agent.id) == selected.as_ref() { "*" } else { " " };
                println!("{marker} {}  {} ({})", agent.id, agent.name, agent.model);
            }
        }
        SlashCommand::Use(id) if id.is_empty() => eprintln!("usage: /use <agent-id>"),
        SlashCommand::Use(id) => {
            let id = AgentId::new(id);
            match view.select_agent(&id).await {
                Ok(()) => println!("{}", view.header_line()),
                Err(error) => eprintln!("cannot use {id}: {error}"),
            }
        }
        SlashCommand::Clear => view.clear(),
        SlashCommand::Status => eprintln!("[{}]", view.status_line()),
        SlashCommand::Retry => {
            if let Err(error) = view.retry().await {
                warn!(error = %error, "manual retry failed");
                eprintln!("cannot retry: {error}");
            }
        }
        SlashCommand::Quit => return false,
        SlashCommand::Unknown(command) => eprintln!("unknown command {command}; try /help"),
    }
    true
}
