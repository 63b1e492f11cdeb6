//! Multi-Room TCP Chat Server Library
//!
//! A line-based chat server whose shared state - users, rooms and
//! one-way DM links - lives in one in-memory registry guarded by a
//! hand-rolled reader/writer admission gate.
//!
//! # Features
//! - Guest sessions with `login` rename
//! - Named rooms, created on first use and joined idempotently
//! - One-way DM links between users
//! - Chat fan-out to everyone sharing a room with the sender, plus the
//!   sender's DM targets
//! - User and room listings
//! - Registry-wide teardown on shutdown
//!
//! # Architecture
//! One tokio task per connection, one shared [`Registry`]:
//! - [`SyncGate`] admits any number of readers or one exclusive writer
//!   (first-reader/last-reader policy). The gate is deliberately unfair:
//!   a steady stream of readers can keep a writer waiting indefinitely,
//!   and nothing orders waiting readers against waiting writers.
//! - Every registry operation is a single admission; no operation nests
//!   one admission inside another.
//! - The broadcaster collects its recipient snapshot under one read
//!   admission and delivers only after releasing it, through each
//!   recipient's bounded outbound queue.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use bisonchat::{handle_connection, Registry, RoomName, DEFAULT_ROOM};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let registry = Arc::new(Registry::new());
//!     registry.create_room(RoomName::new(DEFAULT_ROOM)).await;
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let registry = registry.clone();
//!         tokio::spawn(handle_connection(stream, registry));
//!     }
//! }
//! ```

pub mod broadcast;
pub mod command;
pub mod error;
pub mod gate;
pub mod handler;
pub mod registry;
pub mod room;
pub mod types;
pub mod user;

// Re-export main types for convenience
pub use broadcast::{broadcast, render_message};
pub use command::Command;
pub use error::{ChatError, SendError};
pub use gate::SyncGate;
pub use handler::{handle_connection, DEFAULT_ROOM, MAX_LINE};
pub use registry::Registry;
pub use room::Room;
pub use types::{RoomName, UserId};
pub use user::{Conn, User, UserProfile};
