//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `UserId`: UUID-based handle for one connected user
//! - `RoomName`: case-sensitive room key

use uuid::Uuid;

/// Unique user identifier (newtype pattern)
///
/// One `UserId` is minted per accepted connection and doubles as the
/// connection handle: the worker that created the user keeps the id and
/// addresses every registry operation with it.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new random user ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name (unique registry key)
///
/// Names are compared case-sensitively and never rewritten: `Lobby` and
/// `lobby` are two different rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(pub String);

impl RoomName {
    /// Create a RoomName from user input
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The room name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Lets map lookups take a plain &str without building a RoomName.
impl std::borrow::Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Generate a guest display name for a fresh connection
///
/// Users start out as `guest-XXXX` until they pick a name with `login`.
/// The suffix is random so reconnects don't collide on the same name.
pub fn guest_name() -> String {
    use rand::Rng;
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("guest-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_unique() {
        let id1 = UserId::new();
        let id2 = UserId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_room_name_case_sensitive() {
        let a = RoomName::new("Lobby");
        let b = RoomName::new("lobby");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "Lobby");
    }

    #[test]
    fn test_guest_name_shape() {
        let name = guest_name();
        assert!(name.starts_with("guest-"));
        assert_eq!(name.len(), "guest-".len() + 4);
    }
}
