//! Chat fan-out
//!
//! Given a sender and a message body, decides who hears it and delivers
//! the formatted line to each recipient's outbound queue.
//!
//! The decision runs as one scan over the registry under a single read
//! admission: a user qualifies if they share at least one room with the
//! sender or the sender holds a DM edge to them, and the sender is never
//! their own recipient. The scan collects the formatted text plus one
//! queue handle per recipient, the admission ends, and only then do the
//! sends happen. Every broadcast therefore sees one consistent snapshot
//! of the graph and never holds the gate across a channel wait.
//!
//! Deliveries are sequential, single-attempt and best-effort: a dead
//! recipient is logged and skipped, while a recipient with a full queue
//! stalls the ones after it until their writer task drains.

use tracing::debug;

use crate::command::PROMPT;
use crate::registry::Registry;
use crate::types::UserId;
use crate::user::Conn;

/// One delivery captured while the read admission was held.
struct Delivery {
    recipient: UserId,
    conn: Conn,
}

/// Format a chat line the way recipients see it on the wire.
pub fn render_message(sender: &str, body: &str) -> String {
    format!("\n::{}> {}\n{}", sender, body, PROMPT)
}

/// Fan `body` out from `sender` to every qualifying recipient.
///
/// Returns how many recipients were actually delivered to. Failed sends
/// are logged and skipped, so one dead recipient never stops the rest,
/// and nothing about delivery surfaces back to the sender. A sender
/// missing from the registry delivers to nobody.
pub async fn broadcast(registry: &Registry, sender: UserId, body: &str) -> usize {
    let (message, deliveries) = {
        let state = registry.read_state().await;
        let Some(from) = state.users.get(&sender) else {
            return 0;
        };
        let deliveries: Vec<Delivery> = state
            .users
            .values()
            .filter(|user| user.id != sender)
            .filter(|user| from.shares_room_with(user) || from.has_dm_to(user.id))
            .map(|user| Delivery {
                recipient: user.id,
                conn: user.conn.clone(),
            })
            .collect();
        (render_message(&from.name, body), deliveries)
    };

    let mut delivered = 0;
    for delivery in deliveries {
        match delivery.conn.send(message.clone()).await {
            Ok(()) => delivered += 1,
            Err(e) => debug!("Dropping message for {}: {}", delivery.recipient, e),
        }
    }
    delivered
}
