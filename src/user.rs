//! User struct definition
//!
//! Represents a connected user: identity, outbound delivery handle, and
//! the relationship sets (room memberships and outbound DM edges).

use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::{RoomName, UserId};

/// Outbound queue capacity per connection
///
/// A recipient whose queue is full stalls the sending worker until the
/// recipient's writer task drains it.
pub const OUTBOUND_BUFFER: usize = 32;

/// A user's outbound delivery handle
///
/// Wraps the bounded channel feeding that connection's writer task.
/// Clones are cheap but short-lived: the broadcaster and the registry's
/// send path snapshot one under read admission and drop it right after
/// delivery. The user record keeps the only long-lived sender, so
/// dropping the record closes the channel.
#[derive(Debug, Clone)]
pub struct Conn {
    sender: mpsc::Sender<String>,
}

impl Conn {
    /// Create the channel pair for a new connection
    ///
    /// The receiver end goes to the connection's writer task.
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_BUFFER);
        (Self { sender }, receiver)
    }

    /// Queue a chunk of response text for this connection
    ///
    /// One best-effort attempt: waits while the queue is full, and
    /// returns an error once the writer task is gone (connection dead).
    pub async fn send(&self, text: String) -> Result<(), SendError> {
        self.sender
            .send(text)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

/// Connected user record
///
/// Owned exclusively by the registry. The connection worker keeps only
/// the `UserId` handle; even its own responses go through the registry,
/// so this record's `Conn` is the last sender standing and removing the
/// user disconnects the client.
#[derive(Debug)]
pub struct User {
    /// Unique identifier, minted per connection
    pub id: UserId,
    /// Display name: `guest-XXXX` until the user logs in. Mutable, and
    /// deliberately not unique across users.
    pub name: String,
    /// Outbound delivery handle
    pub conn: Conn,
    /// Rooms this user is in (symmetric with each room's member set)
    pub rooms: HashSet<RoomName>,
    /// Users this user may DM (directed edges with this user as source)
    pub dms: HashSet<UserId>,
}

impl User {
    /// Create a new user with empty membership and edge sets
    pub fn new(id: UserId, name: String, conn: Conn) -> Self {
        Self {
            id,
            name,
            conn,
            rooms: HashSet::new(),
            dms: HashSet::new(),
        }
    }

    /// Check if this user shares at least one room with `other`
    pub fn shares_room_with(&self, other: &User) -> bool {
        // Walk the smaller membership set.
        let (small, large) = if self.rooms.len() <= other.rooms.len() {
            (&self.rooms, &other.rooms)
        } else {
            (&other.rooms, &self.rooms)
        };
        small.iter().any(|room| large.contains(room))
    }

    /// Check if this user has an outbound DM edge to `other`
    pub fn has_dm_to(&self, other: UserId) -> bool {
        self.dms.contains(&other)
    }

    /// Owned identity snapshot
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Owned snapshot of a user's identity, returned by registry lookups
///
/// Carrying a copy out of the critical section keeps callers from
/// holding references into the guarded state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The user's connection handle
    pub id: UserId,
    /// Display name at the time of the lookup
    pub name: String,
}
