//! Message dispatch: look up the recipient's live connection and push the
//! message there, mirroring an identical copy back to the sender.
//!
//! Messages are ephemeral. A recipient with no current binding means the
//! message is dropped silently — nothing is stored and no failure is
//! signaled to the sender. A push that loses the race with the recipient's
//! disconnect is best-effort and ignored.

use axum::extract::ws::Message;
use chrono::Utc;

use crate::registry::{ConnectionSender, Registry};
use crate::ws::protocol::ServerEvent;

/// Relay `body` from `sender` to whoever is currently bound to `recipient`.
/// On a hit the deliver event carries a server-assigned timestamp and goes
/// to both the recipient's queue and `echo` (the sender's own queue). On a
/// miss nothing happens, echo included.
pub fn relay(registry: &Registry, echo: &ConnectionSender, sender: &str, recipient: &str, body: &str) {
    let Some(recipient_tx) = registry.lookup_sender(recipient) else {
        tracing::debug!(
            sender = %sender,
            recipient = %recipient,
            "Recipient not connected, dropping message"
        );
        return;
    };

    let event = ServerEvent::Deliver {
        from: sender.to_string(),
        body: body.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    let frame = match serde_json::to_string(&event) {
        Ok(json) => Message::Text(json.into()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode deliver event");
            return;
        }
    };

    // Both pushes are fire-and-forget; a closed queue means the connection
    // is going away and its cleanup will run on its own.
    let _ = recipient_tx.send(frame.clone());
    let _ = echo.send(frame);

    tracing::debug!(sender = %sender, recipient = %recipient, "Message relayed");
}
