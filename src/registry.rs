//! The shared chat registry
//!
//! Owns every user, room and DM edge in the process and funnels all
//! access through the reader/writer [`SyncGate`]: queries take a read
//! admission, mutations take the write admission, and no operation ever
//! nests one admission inside another.
//!
//! Domain conditions are not errors here. Lookups return `Option`,
//! re-creating an existing room hands back the existing handle, and
//! joining a room twice (or removing what is already gone) is a silent
//! no-op.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::SendError;
use crate::gate::{ReadGuard, SyncGate};
use crate::room::Room;
use crate::types::{RoomName, UserId};
use crate::user::{Conn, User, UserProfile};

/// Everything the gate guards: the user map and the room map.
///
/// Membership is stored on both sides (each user's room set, each room's
/// member set) and the two sides only ever change together under one
/// write admission.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// All connected users, keyed by connection handle
    pub(crate) users: HashMap<UserId, User>,
    /// All rooms, keyed by name
    pub(crate) rooms: HashMap<RoomName, Room>,
}

/// The process-wide registry of users, rooms and DM edges.
///
/// One instance is shared (via `Arc`) by every connection worker and
/// lives for the whole process; [`Registry::teardown`] empties it on
/// shutdown.
#[derive(Debug)]
pub struct Registry {
    state: SyncGate<RegistryState>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: SyncGate::new(RegistryState::default()),
        }
    }

    /// One read admission over the raw state.
    ///
    /// This is how the broadcaster runs its whole recipient scan under a
    /// single admission, and how tests check invariants. Everything else
    /// goes through the named operations below.
    pub(crate) async fn read_state(&self) -> ReadGuard<'_, RegistryState> {
        self.state.read().await
    }

    // ---- users ----

    /// Register a new user with empty membership and DM sets.
    ///
    /// Returns the handle the owning connection worker uses for every
    /// later operation on this user.
    pub async fn create_user(&self, name: String, conn: Conn) -> UserId {
        let id = UserId::new();
        let mut state = self.state.write().await;
        info!("User {} ('{}') registered", id, name);
        state.users.insert(id, User::new(id, name, conn));
        id
    }

    /// Look up a user by connection handle.
    pub async fn get_user(&self, id: UserId) -> Option<UserProfile> {
        let state = self.state.read().await;
        state.users.get(&id).map(User::profile)
    }

    /// Look up a user by display name.
    ///
    /// Names are not unique; the first match in map order wins, and that
    /// order is not a contract.
    pub async fn find_user(&self, name: &str) -> Option<UserProfile> {
        let state = self.state.read().await;
        state
            .users
            .values()
            .find(|user| user.name == name)
            .map(User::profile)
    }

    /// Change a user's display name.
    ///
    /// No uniqueness check: two users may end up sharing a name, and
    /// name lookup then finds whichever comes first. Unknown handles
    /// are ignored.
    pub async fn rename_user(&self, id: UserId, new_name: String) {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&id) else {
            return;
        };
        info!("User {} renamed '{}' -> '{}'", id, user.name, new_name);
        user.name = new_name;
    }

    /// Remove a user and every trace of them, atomically.
    ///
    /// One write admission unlinks the map entry, evicts the user from
    /// every room they were in, deletes every DM edge other users hold
    /// toward them, and drops their own sets together with the
    /// registry's connection handle. No reader can observe the user
    /// half-removed. Removing an unknown handle is a no-op.
    pub async fn remove_user(&self, id: UserId) {
        let mut state = self.state.write().await;
        let Some(user) = state.users.remove(&id) else {
            return;
        };
        for name in &user.rooms {
            if let Some(room) = state.rooms.get_mut(name) {
                room.remove_member(id);
            }
        }
        for other in state.users.values_mut() {
            other.dms.remove(&id);
        }
        info!("User {} ('{}') removed", id, user.name);
        debug!(
            "{} users and {} rooms remain",
            state.users.len(),
            state.rooms.len()
        );
        // `user` drops here, still inside the admission: its sets go
        // away and the only long-lived sender for the connection's
        // outbound channel goes with them, closing the channel.
    }

    /// Queue `text` on a user's outbound channel.
    ///
    /// Connection workers route their own replies through here instead
    /// of keeping a channel handle of their own, so the sender stored
    /// in the user record stays the only long-lived one and dropping
    /// the record disconnects the client. The handle is cloned under a
    /// read admission and the send happens after it, like the
    /// broadcaster's deliveries. A user who is already gone reports the
    /// channel as closed.
    pub async fn send_to(&self, id: UserId, text: String) -> Result<(), SendError> {
        let conn = {
            let state = self.state.read().await;
            let Some(user) = state.users.get(&id) else {
                return Err(SendError::ChannelClosed);
            };
            user.conn.clone()
        };
        conn.send(text).await
    }

    // ---- rooms ----

    /// Look up a room handle by name (case-sensitive).
    pub async fn find_room(&self, name: &str) -> Option<RoomName> {
        let state = self.state.read().await;
        state.rooms.get(name).map(|room| room.name.clone())
    }

    /// Create a room, or hand back the existing one with that name.
    ///
    /// Idempotent: "already exists" is not an error, and the registry
    /// never holds two rooms with the same name.
    pub async fn create_room(&self, name: RoomName) -> RoomName {
        let mut state = self.state.write().await;
        if state.rooms.contains_key(&name) {
            return name;
        }
        info!("Room '{}' created", name);
        state.rooms.insert(name.clone(), Room::new(name.clone()));
        name
    }

    /// Delete a room.
    ///
    /// Deletion is symmetric: the same admission that unlinks the room
    /// evicts it from every member's own room set, so nobody is left
    /// holding a stale membership. Deleting an unknown room is a no-op.
    /// (Nothing in the command layer deletes rooms; they outlive empty
    /// membership.)
    pub async fn delete_room(&self, name: &RoomName) {
        let mut state = self.state.write().await;
        let Some(room) = state.rooms.remove(name) else {
            return;
        };
        for id in &room.members {
            if let Some(user) = state.users.get_mut(id) {
                user.rooms.remove(name);
            }
        }
        info!(
            "Room '{}' deleted, {} members evicted",
            name,
            room.member_count()
        );
    }

    // ---- relationships ----

    /// Put a user in a room, updating both membership sides together.
    ///
    /// Already a member, unknown user, unknown room: silent no-ops.
    pub async fn join_room(&self, id: UserId, room: &RoomName) {
        let mut state = self.state.write().await;
        if !state.rooms.contains_key(room) {
            return;
        }
        let Some(user) = state.users.get_mut(&id) else {
            return;
        };
        if !user.rooms.insert(room.clone()) {
            return; // already a member
        }
        if let Some(r) = state.rooms.get_mut(room) {
            r.add_member(id);
        }
        debug!("User {} joined room '{}'", id, room);
    }

    /// Take a user out of a room, updating both sides together.
    ///
    /// Leaving a room the user is not in (or using stale handles) is a
    /// silent no-op.
    pub async fn leave_room(&self, id: UserId, room: &RoomName) {
        let mut state = self.state.write().await;
        let mut was_member = false;
        if let Some(user) = state.users.get_mut(&id) {
            was_member = user.rooms.remove(room);
        }
        if let Some(r) = state.rooms.get_mut(room) {
            r.remove_member(id);
        }
        if was_member {
            debug!("User {} left room '{}'", id, room);
        }
    }

    /// Add the one-way DM edge `from -> to`.
    ///
    /// Self-edges are refused, duplicates collapse into one edge, and
    /// stale handles are ignored - all silently.
    pub async fn connect_dm(&self, from: UserId, to: UserId) {
        if from == to {
            return;
        }
        let mut state = self.state.write().await;
        if !state.users.contains_key(&to) {
            return;
        }
        let Some(user) = state.users.get_mut(&from) else {
            return;
        };
        if user.dms.insert(to) {
            debug!("DM edge {} -> {} connected", from, to);
        }
    }

    /// Drop the one-way DM edge `from -> to`, if it exists.
    pub async fn disconnect_dm(&self, from: UserId, to: UserId) {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&from) else {
            return;
        };
        if user.dms.remove(&to) {
            debug!("DM edge {} -> {} disconnected", from, to);
        }
    }

    /// Whether two users are in at least one room together.
    pub async fn users_share_room(&self, a: UserId, b: UserId) -> bool {
        let state = self.state.read().await;
        match (state.users.get(&a), state.users.get(&b)) {
            (Some(a), Some(b)) => a.shares_room_with(b),
            _ => false,
        }
    }

    /// Whether `from` holds a DM edge to `to`. Direction matters.
    pub async fn is_dm_peer(&self, from: UserId, to: UserId) -> bool {
        let state = self.state.read().await;
        state.users.get(&from).is_some_and(|user| user.has_dm_to(to))
    }

    // ---- listings ----

    /// All current display names, newline-joined.
    ///
    /// Map iteration order; callers treat the listing as unordered.
    pub async fn list_users(&self) -> String {
        let state = self.state.read().await;
        state
            .users
            .values()
            .map(|user| user.name.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All current room names, newline-joined and unordered.
    pub async fn list_rooms(&self) -> String {
        let state = self.state.read().await;
        state
            .rooms
            .keys()
            .map(RoomName::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ---- shutdown ----

    /// Drop every user and room under one final write admission.
    ///
    /// The user records hold the only long-lived senders for their
    /// outbound channels, so dropping them ends every connection's
    /// writer task and shuts every client socket down; a session still
    /// parked on its read side ends the moment it next tries to reply.
    pub async fn teardown(&self) {
        let mut state = self.state.write().await;
        let users = state.users.len();
        let rooms = state.rooms.len();
        state.users.clear();
        state.rooms.clear();
        info!("Registry torn down: {} users and {} rooms dropped", users, rooms);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
