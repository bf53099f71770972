//! Wire command grammar
//!
//! Each inbound line maps to exactly one command. The first
//! whitespace-delimited token is matched case-insensitively against the
//! known command set; anything else, including lines starting with an
//! unrecognized `/`, is a chat message broadcast verbatim.

/// One parsed client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/nick <name>` (argument may be empty; the handler reports usage)
    Nick(String),
    /// `/join <channel>` (argument may be empty; the handler reports usage)
    Join(String),
    /// `/leave [<channel>]`
    Leave(Option<String>),
    /// `/quit`
    Quit,
    /// `/help`
    Help,
    /// `/list`
    List,
    /// Anything else: broadcast verbatim to the sender's channel
    Chat(String),
}

impl Command {
    /// Parse one line into a command
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("").trim();

        match head.to_ascii_lowercase().as_str() {
            "/nick" => Self::Nick(arg.to_string()),
            "/join" => Self::Join(arg.to_string()),
            "/leave" => Self::Leave((!arg.is_empty()).then(|| arg.to_string())),
            "/quit" => Self::Quit,
            "/help" => Self::Help,
            "/list" => Self::List,
            _ => Self::Chat(line.to_string()),
        }
    }
}
