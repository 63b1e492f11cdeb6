//! Room struct definition
//!
//! Represents a named chat room and the users currently in it.

use std::collections::HashSet;

use crate::types::{RoomName, UserId};

/// A chat room
///
/// Rooms hold any number of members. The name is fixed at creation; the
/// membership set is kept symmetric with each member's own room set by
/// the registry (both sides change together under one write admission).
/// Rooms are never deleted just because everyone left.
#[derive(Debug)]
pub struct Room {
    /// Room name, also the registry key
    pub name: RoomName,
    /// Users currently in this room
    pub members: HashSet<UserId>,
}

impl Room {
    /// Create a new, empty room with the given name
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: HashSet::new(),
        }
    }

    /// Add a member
    ///
    /// Returns false if the user was already in the room (join is
    /// idempotent).
    pub fn add_member(&mut self, id: UserId) -> bool {
        self.members.insert(id)
    }

    /// Remove a member
    ///
    /// Removing a non-member is a silent no-op (returns false).
    pub fn remove_member(&mut self, id: UserId) -> bool {
        self.members.remove(&id)
    }

    /// Check if a user is in this room
    pub fn contains(&self, id: UserId) -> bool {
        self.members.contains(&id)
    }

    /// Get the number of users currently in the room
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Check if the room has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
