use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::error::ChatError;
use crate::events::{SessionCommand, SessionEvent};
use crate::session::SessionSnapshot;

/// Cloneable front door to a running session.
///
/// Commands are queued and applied in order by the session event loop; state
/// is observed through snapshots.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: UnboundedSender<SessionEvent>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        events: UnboundedSender<SessionEvent>,
        snapshots: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self { events, snapshots }
    }

    fn send(&self, cmd: SessionCommand) -> Result<(), ChatError> {
        self.events
            .send(SessionEvent::Command(cmd))
            .map_err(|_| ChatError::SessionClosed)
    }

    pub fn edit_input(&self, text: impl Into<String>) -> Result<(), ChatError> {
        self.send(SessionCommand::EditInput(text.into()))
    }

    pub fn toggle_recording(&self) -> Result<(), ChatError> {
        self.send(SessionCommand::ToggleRecording)
    }

    pub fn submit(&self) -> Result<(), ChatError> {
        self.send(SessionCommand::Submit)
    }

    pub fn clear(&self) -> Result<(), ChatError> {
        self.send(SessionCommand::Clear)
    }

    pub fn shutdown(&self) -> Result<(), ChatError> {
        self.send(SessionCommand::Shutdown)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until a published snapshot satisfies `pred`.
    pub async fn wait_for(
        &self,
        pred: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, ChatError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(pred)
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    /// Resolves once the event loop has exited.
    pub async fn closed(&self) {
        self.events.closed().await
    }
}
