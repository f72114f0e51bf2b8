//! Parsing of interactive command lines.

use anyhow::{bail, Context};
use pulse_shared::{ConversationId, UserId};

pub const HELP: &str = "\
commands:
  login <name>           sign in with a fresh identity
  users                  list known users
  list                   list your conversations
  dm <user-id>           open (or start) a direct message
  group <name>           create a group
  join <conv-id>         ask to join a group
  open <n | conv-id>     open a conversation (n = position in `list`)
  send <text>            send to the open conversation
  accept <user-id>       accept a join request in the open group
  reject <user-id>       reject a join request in the open group
  refresh                refetch everything
  logout                 forget this identity
  help                   show this text
  quit                   exit";

/// A conversation picked by list position (1-based) or by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Id(ConversationId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Users,
    List,
    Dm(UserId),
    Group(String),
    Join(ConversationId),
    Open(Target),
    Send(String),
    Accept(UserId),
    Reject(UserId),
    Refresh,
    Logout,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "login" => Self::Login(required(rest, "login <name>")?.to_string()),
            "users" => Self::Users,
            "list" | "ls" => Self::List,
            "dm" => Self::Dm(UserId::from(required(rest, "dm <user-id>")?)),
            "group" => Self::Group(required(rest, "group <name>")?.to_string()),
            "join" => Self::Join(conversation_id(required(rest, "join <conv-id>")?)?),
            "open" => Self::Open(target(required(rest, "open <n | conv-id>")?)?),
            // Text is passed through untouched; blank text is the engine's call.
            "send" => Self::Send(rest.to_string()),
            "accept" => Self::Accept(UserId::from(required(rest, "accept <user-id>")?)),
            "reject" => Self::Reject(UserId::from(required(rest, "reject <user-id>")?)),
            "refresh" => Self::Refresh,
            "logout" => Self::Logout,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command `{other}` (try `help`)"),
        };
        Ok(Some(command))
    }
}

fn required<'a>(arg: &'a str, usage: &str) -> anyhow::Result<&'a str> {
    if arg.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(arg)
}

fn conversation_id(arg: &str) -> anyhow::Result<ConversationId> {
    arg.parse::<ConversationId>()
        .with_context(|| format!("`{arg}` is not a conversation id"))
}

fn target(arg: &str) -> anyhow::Result<Target> {
    match arg.parse::<usize>() {
        Ok(0) => bail!("positions start at 1"),
        Ok(n) => Ok(Target::Index(n)),
        Err(_) => conversation_id(arg).map(Target::Id),
    }
}
