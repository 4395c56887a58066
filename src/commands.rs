#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Agents,
    /// `/use <agent-id>`; empty when the id is missing.
    Use(String),
    Clear,
    Status,
    /// Reopen the current agent after a fatal error.
    Retry,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
/agents        list agents
/use <id>      switch to an agent
/clear         clear the transcript
/status        show connection status
/retry         reconnect to the current agent
/quit          exit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or(trimmed).to_string();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/agents" => SlashCommand::Agents,
        "/use" => SlashCommand::Use(parts.next().unwrap_or_default().to_string()),
        "/clear" => SlashCommand::Clear,
        "/status" => SlashCommand::Status,
        "/retry" => SlashCommand::Retry,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}
