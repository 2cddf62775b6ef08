//! Chat-style command parsing.
//!
//! Messages look like `-connect <@1> <@2> <@3>`: a prefix, a command word and
//! free text in which users are mentioned as `<@id>` or `<@!id>`.

use crate::domain::UserId;

/// A recognised chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Designate the current channel (admin only)
    SetChannel,

    /// Show the static graph
    Graph,

    /// Connect every mentioned user with each other
    Connect(Vec<UserId>),

    /// Remove the connection between two mentioned users
    Delete(Vec<UserId>),

    /// Clear the graph after confirmation (admin only)
    ClearGraph,

    /// Publish an interactive link
    Link,

    /// Greeting
    Hello,
}

impl Command {
    /// The command word, without prefix
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetChannel => "setchannel",
            Command::Graph => "graph",
            Command::Connect(_) => "connect",
            Command::Delete(_) => "delete",
            Command::ClearGraph => "cleargraph",
            Command::Link => "link",
            Command::Hello => "hello",
        }
    }

    /// Whether only administrators may run the command
    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::SetChannel | Command::ClearGraph)
    }
}

/// Parse `text` as a command introduced by `prefix`.
///
/// Returns `None` for ordinary messages and unknown command words.
pub fn parse_command(text: &str, prefix: &str) -> Option<Command> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let (word, rest) = match body.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (body, ""),
    };

    let command = match word {
        "setchannel" => Command::SetChannel,
        "graph" => Command::Graph,
        "connect" => Command::Connect(parse_mentions(rest)),
        "delete" => Command::Delete(parse_mentions(rest)),
        "cleargraph" => Command::ClearGraph,
        "link" => Command::Link,
        "hello" => Command::Hello,
        _ => return None,
    };
    Some(command)
}

/// Extract mentioned users in order of appearance.
///
/// Repeated mentions are kept; callers decide how duplicates count.
pub fn parse_mentions(text: &str) -> Vec<UserId> {
    let mut mentions = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("<@") {
        rest = &rest[start + 2..];
        let Some(end) = rest.find('>') else {
            break;
        };
        let inner = &rest[..end];
        let id = inner.strip_prefix('!').unwrap_or(inner);
        if is_valid_user_id(id) {
            mentions.push(UserId::new(id));
            rest = &rest[end + 1..];
        }
    }
    mentions
}

/// Maximum length of a user id accepted in mentions and on the command line.
pub const MAX_USER_ID_LENGTH: usize = 64;

/// Whether `id` can appear in a mention: ASCII alphanumerics, `_` and `-`.
pub fn is_valid_user_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_USER_ID_LENGTH
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Format a user mention.
pub fn mention(user: &UserId) -> String {
    format!("<@{user}>")
}
