//! WebSocket event protocol and dispatch.
//!
//! Events are JSON text frames tagged by `type`. The relay surfaces no
//! errors to the peer: malformed or rejected events are logged and dropped.

use serde::{Deserialize, Serialize};

use crate::registry::{ConnId, ConnectionSender};
use crate::relay;
use crate::state::AppState;

/// Events a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection as the live endpoint for the caller's phone
    /// number. Re-registration overwrites (reconnect flow).
    Register { identity: String },
    /// Relay a message to whoever is currently bound to `to`.
    Send { to: String, body: String },
}

/// Events the server pushes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A relayed message, delivered to the recipient and echoed to the
    /// sender's own connection.
    Deliver {
        from: String,
        body: String,
        timestamp: String,
    },
}

/// Handle one inbound text frame from an authenticated connection.
///
/// `identity` is the phone number verified at login and carried in the
/// connection's token claims; it is the only identity this connection may
/// register or send as.
pub fn handle_text_frame(
    text: &str,
    conn: ConnId,
    tx: &ConnectionSender,
    state: &AppState,
    identity: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(identity = %identity, error = %e, "Malformed client event, dropping");
            return;
        }
    };

    match event {
        ClientEvent::Register { identity: claimed } => {
            if claimed != identity {
                tracing::warn!(
                    identity = %identity,
                    claimed = %claimed,
                    "Register event identity does not match token claims, rejecting"
                );
                return;
            }
            state.registry.bind(identity, conn);
            tracing::info!(identity = %identity, conn = %conn, "Identity bound");
        }
        ClientEvent::Send { to, body } => {
            if to.is_empty() || body.is_empty() {
                tracing::debug!(identity = %identity, "Send event with empty recipient or body, dropping");
                return;
            }
            relay::relay(&state.registry, tx, identity, &to, &body);
        }
    }
}
