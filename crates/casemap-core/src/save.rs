//! One-shot save relay to the host application.
//!
//! The host channel is fire-and-forget: nothing comes back. After a fixed
//! delay the trigger is re-enabled and success is reported optimistically.
//! When no host is attached the attempt is surfaced through the notifier
//! instead of being dropped.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::mode::Selection;
use crate::store::StatusMap;

/// Action tag the host listens for.
pub const SAVE_ACTION: &str = "saveData";

/// Delay before a dispatched save is reported as sent.
pub const DEFAULT_ACK_DELAY: Duration = Duration::from_millis(1500);

/// Outbound message posted to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveEnvelope {
    pub action: &'static str,
    pub payload: SavePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavePayload {
    pub version: String,
    pub user: String,
    pub content: StatusMap,
    pub message: String,
}

impl SaveEnvelope {
    #[must_use]
    pub fn new(version: &str, user: &str, content: StatusMap) -> Self {
        Self {
            action: SAVE_ACTION,
            payload: SavePayload {
                version: version.to_string(),
                user: user.to_string(),
                content,
                message: format!("[Test] {user} updated results for {version}"),
            },
        }
    }
}

/// Error reported by a host channel that could not accept a message.
#[derive(Debug, thiserror::Error)]
#[error("host channel rejected message: {0}")]
pub struct HostError(pub String);

/// Bridge to the environment responsible for durable persistence.
pub trait HostChannel {
    /// Post `envelope` without waiting for any response.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] if the message could not be handed over.
    fn post_message(&mut self, envelope: &SaveEnvelope) -> Result<(), HostError>;
}

/// User-visible notices raised by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Save refused because no tester is selected.
    SelectTester,
    /// Save refused because the trigger is disabled.
    SaveInFlight,
    /// The host accepted the message and the acknowledgment delay elapsed.
    SaveSent,
    /// No host is attached; nothing was persisted.
    HostUnavailable { envelope: String },
    /// The host channel reported an error.
    SaveFailed { reason: String },
}

impl Notice {
    /// Short text suitable for a toast or status line.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::SelectTester => "Select a tester first".to_string(),
            Self::SaveInFlight => "A save is already in progress".to_string(),
            Self::SaveSent => "Save request sent".to_string(),
            Self::HostUnavailable { .. } => {
                "Saving is only available inside the host app; results were not persisted"
                    .to_string()
            }
            Self::SaveFailed { reason } => format!("Save failed: {reason}"),
        }
    }
}

/// Receives notices for presentation.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Why a save was refused before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoTester,
    InFlight,
}

/// Result of a save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Refused up front; no state change, no host activity.
    Rejected(Rejection),
    /// Posted to the host; the trigger re-enables at `ack_at`.
    Pending { ack_at: Instant },
    /// Posted and acknowledged by the delay.
    Sent,
    /// No host attached; the trigger is ready again.
    Fallback,
    /// The host channel failed; the trigger is ready again.
    Failed(String),
}

/// State of the save control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Ready,
    Busy { ack_at: Instant },
}

/// Serialises saves to at most one in flight.
#[derive(Debug)]
pub struct SaveGateway<H> {
    host: Option<H>,
    ack_delay: Duration,
    trigger: TriggerState,
}

impl<H: HostChannel> SaveGateway<H> {
    #[must_use]
    pub const fn new(host: Option<H>, ack_delay: Duration) -> Self {
        Self {
            host,
            ack_delay,
            trigger: TriggerState::Ready,
        }
    }

    #[must_use]
    pub const fn trigger(&self) -> TriggerState {
        self.trigger
    }

    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self.trigger, TriggerState::Busy { .. })
    }

    #[must_use]
    pub const fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// Validate and post a save without waiting for the acknowledgment delay.
    pub fn dispatch(
        &mut self,
        selection: &Selection,
        content: StatusMap,
        notifier: &mut dyn Notifier,
    ) -> SaveOutcome {
        if selection.user.is_default() {
            notifier.notify(Notice::SelectTester);
            return SaveOutcome::Rejected(Rejection::NoTester);
        }
        if self.is_busy() {
            notifier.notify(Notice::SaveInFlight);
            return SaveOutcome::Rejected(Rejection::InFlight);
        }

        let envelope = SaveEnvelope::new(&selection.version, selection.user.as_str(), content);
        let Some(host) = self.host.as_mut() else {
            let rendered = serde_json::to_string(&envelope).unwrap_or_default();
            info!(payload = %rendered, "no host channel; save not persisted");
            notifier.notify(Notice::HostUnavailable { envelope: rendered });
            return SaveOutcome::Fallback;
        };

        match host.post_message(&envelope) {
            Ok(()) => {
                let ack_at = Instant::now() + self.ack_delay;
                self.trigger = TriggerState::Busy { ack_at };
                info!(
                    version = %envelope.payload.version,
                    user = %envelope.payload.user,
                    cases = envelope.payload.content.len(),
                    "save dispatched to host"
                );
                SaveOutcome::Pending { ack_at }
            }
            Err(err) => {
                warn!(error = %err, "host channel failed");
                let reason = err.to_string();
                notifier.notify(Notice::SaveFailed {
                    reason: reason.clone(),
                });
                SaveOutcome::Failed(reason)
            }
        }
    }

    /// Re-enable the trigger once its acknowledgment deadline has passed.
    /// Returns true when this call completed a pending save.
    pub fn settle(&mut self, now: Instant, notifier: &mut dyn Notifier) -> bool {
        match self.trigger {
            TriggerState::Busy { ack_at } if now >= ack_at => {
                self.trigger = TriggerState::Ready;
                notifier.notify(Notice::SaveSent);
                true
            }
            _ => false,
        }
    }

    /// Dispatch, then wait out the acknowledgment delay.
    pub async fn save(
        &mut self,
        selection: &Selection,
        content: StatusMap,
        notifier: &mut dyn Notifier,
    ) -> SaveOutcome {
        match self.dispatch(selection, content, notifier) {
            SaveOutcome::Pending { ack_at } => {
                tokio::time::sleep_until(ack_at).await;
                self.settle(Instant::now(), notifier);
                SaveOutcome::Sent
            }
            other => other,
        }
    }
}
