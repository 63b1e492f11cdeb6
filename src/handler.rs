//! Per-connection worker
//!
//! One task per accepted TCP connection: registers a guest user, drops
//! them into the default room, then turns each inbound line into a
//! registry operation or a chat fan-out. A second, dedicated writer task
//! drains the connection's outbound queue into the socket, so deliveries
//! coming from other workers never touch the socket directly.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::command::{self, Command};
use crate::error::ChatError;
use crate::registry::Registry;
use crate::types::{guest_name, RoomName, UserId};
use crate::user::Conn;

/// Longest accepted input line, in bytes. Longer input ends the session.
pub const MAX_LINE: usize = 512;

/// Room every fresh connection is dropped into.
pub const DEFAULT_ROOM: &str = "Lobby";

/// Drive one client connection from accept to teardown.
///
/// Whatever ends the session - EOF, an I/O or framing error, a dead
/// outbound queue or an explicit `exit`/`logout` - the user is removed
/// from the registry exactly once before this returns.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<Registry>,
) -> Result<(), ChatError> {
    let peer_addr = stream.peer_addr()?;
    let (read_half, mut write_half) = stream.into_split();

    // Writer task: drains the outbound queue into the socket. The user
    // record holds the only long-lived sender, so removing the user (or
    // tearing the registry down) closes the queue and ends this task,
    // which then shuts the socket down. A failed write ends it early.
    let (conn, mut outbound) = Conn::channel();
    tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = write_half.write_all(text.as_bytes()).await {
                debug!("Socket write failed, dropping writer task: {}", e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let name = guest_name();
    let me = registry.create_user(name.clone(), conn).await;
    info!("Client {} connected from {} as '{}'", me, peer_addr, name);

    // Everyone lands in the default room; racing workers get the same
    // handle back from the idempotent create.
    let lobby = registry.create_room(RoomName::new(DEFAULT_ROOM)).await;
    registry.join_room(me, &lobby).await;

    let result = session_loop(&registry, me, read_half).await;

    registry.remove_user(me).await;
    info!("Client {} disconnected", me);
    result
}

/// Read lines and dispatch them until the session ends.
///
/// Replies go through the registry so the worker never holds its own
/// sender; once the user record is gone the first reply attempt fails
/// and the loop ends.
async fn session_loop(
    registry: &Registry,
    me: UserId,
    read_half: OwnedReadHalf,
) -> Result<(), ChatError> {
    registry.send_to(me, command::MOTD.to_string()).await?;

    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE));
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Client {} input rejected: {}", me, e);
                return Err(e.into());
            }
        };
        match Command::parse(&line) {
            Command::Exit => {
                debug!("Client {} logged out", me);
                return Ok(());
            }
            cmd => {
                if let Some(reply) = dispatch(registry, me, cmd).await {
                    registry.send_to(me, reply).await?;
                }
            }
        }
    }
    debug!("Client {} reached EOF", me);
    Ok(())
}

/// Run one command against the registry.
///
/// Returns the response text to queue for the issuing client, or `None`
/// when the command answers with silence (chat lines fan out to the
/// recipients and are never echoed back to the sender).
async fn dispatch(registry: &Registry, me: UserId, cmd: Command) -> Option<String> {
    match cmd {
        Command::Create { room } => {
            let room = registry.create_room(RoomName::new(room)).await;
            registry.join_room(me, &room).await;
            Some(format!(
                "Created and joined room '{}'\n{}",
                room,
                command::PROMPT
            ))
        }
        Command::Join { room } => {
            // Joining a room that does not exist yet conjures it first.
            let room = registry.create_room(RoomName::new(room)).await;
            registry.join_room(me, &room).await;
            Some(format!("Joined room '{}'\n{}", room, command::PROMPT))
        }
        Command::Leave { room } => match registry.find_room(&room).await {
            Some(handle) => {
                registry.leave_room(me, &handle).await;
                Some(format!("Left room '{}'\n{}", handle, command::PROMPT))
            }
            None => Some(format!(
                "Room '{}' does not exist\n{}",
                room,
                command::PROMPT
            )),
        },
        Command::Connect { user } => match registry.find_user(&user).await {
            Some(peer) => {
                registry.connect_dm(me, peer.id).await;
                Some(format!(
                    "Connected (DM) to user '{}'\n{}",
                    user,
                    command::PROMPT
                ))
            }
            None => Some(format!("User '{}' not found\n{}", user, command::PROMPT)),
        },
        Command::Disconnect { user } => match registry.find_user(&user).await {
            Some(peer) => {
                registry.disconnect_dm(me, peer.id).await;
                Some(format!(
                    "Disconnected DM from user '{}'\n{}",
                    user,
                    command::PROMPT
                ))
            }
            None => Some(format!("User '{}' not found\n{}", user, command::PROMPT)),
        },
        Command::Login { name } => {
            registry.rename_user(me, name.clone()).await;
            Some(format!("Logged in as '{}'\n{}", name, command::PROMPT))
        }
        Command::Users => Some(render_listing("Users", registry.list_users().await)),
        Command::Rooms => Some(render_listing("Rooms", registry.list_rooms().await)),
        Command::Help => Some(command::HELP.to_string()),
        Command::Usage { text } => Some(text.to_string()),
        Command::Empty => Some(format!("\n{}", command::PROMPT)),
        Command::Chat { message } => {
            let delivered = broadcast(registry, me, &message).await;
            debug!("Chat from {} delivered to {} users", me, delivered);
            None
        }
        // The session loop intercepts Exit before dispatching.
        Command::Exit => None,
    }
}

/// Frame a listing reply: every name on its own line, then a blank line
/// before the prompt.
fn render_listing(title: &str, mut names: String) -> String {
    if !names.is_empty() {
        names.push('\n');
    }
    format!("{}:\n{}\n{}", title, names, command::PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn guest(registry: &Registry, name: &str) -> (UserId, mpsc::Receiver<String>) {
        let (conn, rx) = Conn::channel();
        let id = registry.create_user(name.to_string(), conn).await;
        (id, rx)
    }

    #[tokio::test]
    async fn test_create_joins_the_new_room() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("create games")).await;

        assert_eq!(
            reply.as_deref(),
            Some("Created and joined room 'games'\nchat>")
        );
        let state = registry.read_state().await;
        assert!(state.rooms.get("games").unwrap().contains(me));
    }

    #[tokio::test]
    async fn test_join_conjures_missing_room() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("join games")).await;

        assert_eq!(reply.as_deref(), Some("Joined room 'games'\nchat>"));
        assert!(registry.find_room("games").await.is_some());
    }

    #[tokio::test]
    async fn test_leave_unknown_room_reports_missing() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("leave nowhere")).await;

        assert_eq!(
            reply.as_deref(),
            Some("Room 'nowhere' does not exist\nchat>")
        );
    }

    #[tokio::test]
    async fn test_connect_by_name_builds_one_way_edge() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;
        let (bob, _bob_rx) = guest(&registry, "bob").await;

        let reply = dispatch(&registry, me, Command::parse("connect bob")).await;

        assert_eq!(
            reply.as_deref(),
            Some("Connected (DM) to user 'bob'\nchat>")
        );
        assert!(registry.is_dm_peer(me, bob).await);
        assert!(!registry.is_dm_peer(bob, me).await);
    }

    #[tokio::test]
    async fn test_connect_unknown_user_reports_missing() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("connect nobody")).await;

        assert_eq!(reply.as_deref(), Some("User 'nobody' not found\nchat>"));
    }

    #[tokio::test]
    async fn test_disconnect_drops_the_edge() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;
        let (bob, _bob_rx) = guest(&registry, "bob").await;
        registry.connect_dm(me, bob).await;

        let reply = dispatch(&registry, me, Command::parse("disconnect bob")).await;

        assert_eq!(
            reply.as_deref(),
            Some("Disconnected DM from user 'bob'\nchat>")
        );
        assert!(!registry.is_dm_peer(me, bob).await);
    }

    #[tokio::test]
    async fn test_login_renames_in_place() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "guest-AB12").await;

        let reply = dispatch(&registry, me, Command::parse("login neo")).await;

        assert_eq!(reply.as_deref(), Some("Logged in as 'neo'\nchat>"));
        assert_eq!(registry.get_user(me).await.unwrap().name, "neo");
    }

    #[tokio::test]
    async fn test_users_listing_reply() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;
        let (_bob, _bob_rx) = guest(&registry, "bob").await;

        let reply = dispatch(&registry, me, Command::parse("users"))
            .await
            .unwrap();

        assert!(reply.starts_with("Users:\n"));
        assert!(reply.contains("alice\n"));
        assert!(reply.contains("bob\n"));
        // Every name is newline-terminated, leaving a blank line before
        // the prompt.
        assert!(reply.ends_with("\n\nchat>"));
    }

    #[tokio::test]
    async fn test_rooms_listing_terminates_every_name() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;
        registry.create_room(RoomName::new("games")).await;

        let reply = dispatch(&registry, me, Command::parse("rooms")).await;

        assert_eq!(reply.as_deref(), Some("Rooms:\ngames\n\nchat>"));
    }

    #[tokio::test]
    async fn test_empty_rooms_listing_shape() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("rooms")).await;

        assert_eq!(reply.as_deref(), Some("Rooms:\n\nchat>"));
    }

    #[tokio::test]
    async fn test_missing_argument_echoes_usage() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("create")).await;

        assert_eq!(reply.as_deref(), Some("Usage: create <room>\nchat>"));
    }

    #[tokio::test]
    async fn test_empty_line_gets_bare_prompt() {
        let registry = Registry::new();
        let (me, _rx) = guest(&registry, "alice").await;

        let reply = dispatch(&registry, me, Command::parse("   ")).await;

        assert_eq!(reply.as_deref(), Some("\nchat>"));
    }

    #[tokio::test]
    async fn test_chat_fans_out_without_echo() {
        let registry = Registry::new();
        let (me, mut my_rx) = guest(&registry, "alice").await;
        let (bob, mut bob_rx) = guest(&registry, "bob").await;
        let lobby = registry.create_room(RoomName::new("lobby")).await;
        registry.join_room(me, &lobby).await;
        registry.join_room(bob, &lobby).await;

        let reply = dispatch(&registry, me, Command::parse("hi there")).await;

        assert!(reply.is_none());
        assert_eq!(
            bob_rx.recv().await.as_deref(),
            Some("\n::alice> hi there\nchat>")
        );
        assert!(my_rx.try_recv().is_err());
    }
}
