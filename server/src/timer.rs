//! One-shot delayed events for turn deadlines and the post-victory cooldown

use crate::session::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// A cancelable, reschedulable one-shot timer.
///
/// Arming spawns a task that sleeps and then feeds the given event back into
/// the session queue, so a firing timer is serialized with every other intent
/// and can never observe a half-updated session. Arming always aborts the
/// previously armed task first: at most one task per timer is ever live.
///
/// An abort can race a task that already sent its event; the session guards
/// for that (a timeout arriving after its round ended is a no-op).
#[derive(Default)]
pub struct EventTimer {
    handle: Option<JoinHandle<()>>,
}

impl EventTimer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Schedules `event` to be delivered on `events_tx` after `delay`,
    /// replacing any previously armed delivery.
    pub fn arm(
        &mut self,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
        delay: Duration,
        event: SessionEvent,
    ) {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = events_tx.send(event);
        }));
    }

    /// Aborts the pending delivery, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
