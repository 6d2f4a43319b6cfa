//! Idle-session logout.
//!
//! A background task waits for interaction events. Each event pushes the
//! deadline out by the idle timeout; reaching the deadline runs the idle
//! callback once and ends the task.

use log::{debug, info};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Deadline used when the idle timeout is too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// The interaction kinds that count as user activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    MouseMove,
    MouseDown,
    KeyPress,
    Scroll,
    TouchStart,
}

impl Activity {
    pub const ALL: [Activity; 5] = [
        Activity::MouseMove,
        Activity::MouseDown,
        Activity::KeyPress,
        Activity::Scroll,
        Activity::TouchStart,
    ];
}

/// Handle to a running idle timer. Dropping it stops the timer without
/// firing the callback.
pub struct InactivityMonitor {
    activity: mpsc::UnboundedSender<Activity>,
    task: JoinHandle<()>,
    timeout: Duration,
}

impl InactivityMonitor {
    /// Starts the timer. Must be called from within a tokio runtime.
    pub fn spawn<F>(timeout: Duration, on_idle: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (activity, rx) = mpsc::unbounded_channel();
        let deadline = deadline_after(timeout);
        let task = tokio::spawn(watch(deadline, timeout, rx, on_idle));
        debug!("Inactivity monitor started with a {:?} timeout", timeout);
        Self {
            activity,
            task,
            timeout,
        }
    }

    /// Resets the idle timer. Ignored once the timer has fired.
    pub fn record(&self, activity: Activity) {
        let _ = self.activity.send(activity);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stop(self) {
        // Drop aborts the task.
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

async fn watch<F>(
    deadline: Instant,
    timeout: Duration,
    mut activity: mpsc::UnboundedReceiver<Activity>,
    on_idle: F,
) where
    F: FnOnce(),
{
    let deadline = time::sleep_until(deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = activity.recv() => match event {
                Some(event) => {
                    debug!("User activity ({:?}), idle timer reset", event);
                    deadline.as_mut().reset(deadline_after(timeout));
                }
                None => return,
            },
            () = &mut deadline => {
                info!("No user activity for {:?}, logging out", timeout);
                on_idle();
                return;
            }
        }
    }
}
