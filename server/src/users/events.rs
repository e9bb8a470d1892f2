//! User lifecycle events.
//!
//! Published on a broadcast channel held in application state. Delivery
//! (e.g. sending the verification mail) belongs to subscribers.

use tokio::sync::broadcast;
use uuid::Uuid;

/// Channel capacity for user events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// The user's email needs (re-)verification.
    VerificationRequested { user_id: Uuid, email: String },
}

pub type EventSender = broadcast::Sender<UserEvent>;

#[must_use]
pub fn channel() -> (EventSender, broadcast::Receiver<UserEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

/// Publish an event. Having no subscribers is not an error.
pub fn publish(events: &EventSender, event: UserEvent) {
    if events.send(event).is_err() {
        tracing::debug!("No subscribers for user event");
    }
}

/// Log every user event until the channel closes.
pub fn spawn_event_logger(mut receiver: broadcast::Receiver<UserEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(UserEvent::VerificationRequested { user_id, email }) => {
                    tracing::info!(%user_id, %email, "Email verification requested");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "User event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
