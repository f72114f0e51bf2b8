//! Command execution against a [`SyncEngine`].

use anyhow::{anyhow, bail};
use pulse_shared::{Conversation, UserId};
use pulse_sync::{JoinOutcome, RefreshOutcome, SyncEngine};
use tracing::debug;

use crate::command::{Command, Target, HELP};
use crate::render;

/// Whether the loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command and return what to print.
pub async fn execute(engine: &SyncEngine, command: Command) -> anyhow::Result<(Flow, String)> {
    debug!(?command, "Executing command");
    let output = match command {
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok((Flow::Quit, "bye".to_string())),

        Command::Login(name) => {
            let me = engine.login(&name).await?;
            format!("signed in as {} ({})", me.display_name, me.id)
        }
        Command::Logout => {
            engine.logout()?;
            "signed out".to_string()
        }
        Command::Users => {
            let me = engine.identity().map(|i| i.id);
            render::users(&engine.directory(), me.as_ref())
        }
        Command::List => render::conversation_list(&engine.conversations(), &signed_in(engine)?),
        Command::Refresh => match engine.refresh().await? {
            RefreshOutcome::Applied {
                identities,
                conversations,
            } => format!("{identities} user(s), {conversations} conversation(s)"),
            RefreshOutcome::Superseded => "a newer refresh already landed".to_string(),
            RefreshOutcome::SignedOut => "not signed in".to_string(),
        },

        Command::Dm(other) => {
            let dm = engine.create_dm(&other).await?;
            open(engine, &dm).await?
        }
        Command::Group(name) => {
            let group = engine.create_group(&name).await?;
            format!("created group {} ({})", group.title(&signed_in(engine)?), group.id)
        }
        Command::Join(id) => match engine.request_join(id).await? {
            JoinOutcome::Requested => "join request sent".to_string(),
            JoinOutcome::AlreadyListed => "already requested or a member".to_string(),
        },
        Command::Open(target) => {
            let conversation = resolve(engine, target)?;
            open(engine, &conversation).await?
        }

        Command::Send(text) => {
            let active = active(engine)?;
            match engine.send_message(active.id, &text).await? {
                // The reply task runs detached; the change feed brings the
                // reply in.
                Some(sent) => format!("sent {}", sent.message.id),
                None => "nothing to send".to_string(),
            }
        }
        Command::Accept(user) => resolve_request(engine, user, true).await?,
        Command::Reject(user) => resolve_request(engine, user, false).await?,
    };
    Ok((Flow::Continue, output))
}

fn signed_in(engine: &SyncEngine) -> anyhow::Result<UserId> {
    engine
        .identity()
        .map(|i| i.id)
        .ok_or_else(|| anyhow!("not signed in (try `login <name>`)"))
}

fn active(engine: &SyncEngine) -> anyhow::Result<Conversation> {
    engine
        .active_conversation()
        .ok_or_else(|| anyhow!("no conversation open (try `open <n>`)"))
}

fn resolve(engine: &SyncEngine, target: Target) -> anyhow::Result<Conversation> {
    match target {
        Target::Index(n) => engine
            .conversations()
            .into_iter()
            .nth(n - 1)
            .ok_or_else(|| anyhow!("no conversation at position {n}")),
        Target::Id(id) => engine
            .conversation(id)
            .ok_or_else(|| anyhow!("conversation {id} is not in your list")),
    }
}

async fn open(engine: &SyncEngine, conversation: &Conversation) -> anyhow::Result<String> {
    let opened = engine.open_conversation(conversation.id).await?;
    Ok(render::conversation(&opened, &signed_in(engine)?))
}

async fn resolve_request(engine: &SyncEngine, user: UserId, accept: bool) -> anyhow::Result<String> {
    let group = active(engine)?;
    if !group.is_group() {
        bail!("join requests only exist in groups");
    }
    let changed = engine.resolve_request(group.id, &user, accept).await?;
    Ok(match (changed, accept) {
        (false, _) => format!("no request from {user}"),
        (true, true) => format!("{user} joined"),
        (true, false) => format!("{user} rejected"),
    })
}
