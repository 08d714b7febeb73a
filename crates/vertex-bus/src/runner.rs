//! Per-machine cooperative executor draining a [`Mailbox`].

use crate::mailbox::Mailbox;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use vertex_types::{MachineEvent, MachineId};

/// A machine's event handler: a synchronous state transition that may fail.
///
/// Handlers see their own state exclusively and are never invoked
/// concurrently with themselves (one runner per machine), so no
/// internal locking is required.
pub trait MachineHandler<P>: Send {
    /// The error type a failed transition reports.
    type Error: std::fmt::Display;

    /// Applies `event` to this machine's state.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is invalid for the current state.
    fn handle(&mut self, event: MachineEvent<P>) -> Result<(), Self::Error>;
}

/// `ActorRunner` construction parameters.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// A human-readable name, attached to every tracing span this
    /// runner emits.
    pub name: String,
    /// How long to sleep when the mailbox is found empty.
    pub poll_interval: Duration,
    /// The maximum number of events drained and handled per tick.
    pub max_events_per_tick: usize,
    /// Whether a handler error is reported and skipped (`true`) or
    /// fatal to the runner (`false`).
    pub continue_on_error: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            name: String::from("runner"),
            poll_interval: Duration::from_millis(50),
            max_events_per_tick: 32,
            continue_on_error: true,
        }
    }
}

/// A handle to a running [`ActorRunner`] task.
///
/// Dropping the handle does not stop the runner; call [`RunnerHandle::stop`]
/// explicitly, then (optionally) await [`RunnerHandle::join`].
pub struct RunnerHandle {
    stop_flag: Arc<AtomicBool>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RunnerHandle {
    /// Signals the runner to exit at the next tick boundary. Events
    /// already dequeued this tick run to completion.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Waits for the runner task to exit.
    ///
    /// # Panics
    ///
    /// Panics if the underlying task panicked.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await.expect("actor runner task panicked");
        }
    }
}

/// Drains up to `max_events_per_tick` events per tick, invoking
/// `handler` with each in arrival order, sleeping `poll_interval`
/// whenever the mailbox is found empty.
///
/// On a handler error: if `continue_on_error`, the error is logged and
/// the next event (if any) is still processed this tick; otherwise the
/// runner stops immediately and no further events are drained.
pub fn spawn<P, H>(
    machine_id: MachineId,
    mailbox: Arc<Mailbox<P>>,
    mut handler: H,
    config: RunnerConfig,
) -> RunnerHandle
where
    P: Send + 'static,
    H: MachineHandler<P> + 'static,
{
    let stop_flag = Arc::new(AtomicBool::new(false));
    let task_stop_flag = stop_flag.clone();

    let task = tokio::spawn(async move {
        let span = tracing::info_span!("actor_runner", name = %config.name, machine_id = %machine_id);
        let _enter = span.enter();

        loop {
            if task_stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let batch = mailbox.drain_up_to(config.max_events_per_tick);
            if batch.is_empty() {
                tokio::time::sleep(config.poll_interval).await;
                continue;
            }

            for event in batch {
                let event_id = event.id.clone();
                if let Err(err) = handler.handle(event) {
                    if config.continue_on_error {
                        warn!(
                            machine_id = %machine_id,
                            event_id = %event_id,
                            cause = %err,
                            "handler error, continuing"
                        );
                    } else {
                        error!(
                            machine_id = %machine_id,
                            event_id = %event_id,
                            cause = %err,
                            "fatal handler error, stopping runner"
                        );
                        return;
                    }
                }
            }
        }
    });

    RunnerHandle {
        stop_flag,
        task: Mutex::new(Some(task)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use vertex_types::Recipient;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
        fail_on: Option<u32>,
    }

    impl MachineHandler<u32> for CountingHandler {
        type Error = String;

        fn handle(&mut self, event: MachineEvent<u32>) -> Result<(), Self::Error> {
            if Some(event.payload) == self.fail_on {
                return Err("boom".to_string());
            }
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event(n: u32) -> MachineEvent<u32> {
        MachineEvent {
            id: n.to_string(),
            kind: vertex_types::MessageKind::Event,
            payload: n,
            sender: MachineId::new("s"),
            recipient: Recipient::Direct(MachineId::new("m")),
            timestamp: 0,
            causation_id: None,
        }
    }

    #[tokio::test]
    async fn drains_events_in_arrival_order() {
        let mailbox = Arc::new(Mailbox::new());
        for i in 0..3 {
            mailbox.push(event(i));
        }
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
            fail_on: None,
        };
        let handle = spawn(
            MachineId::new("m"),
            mailbox,
            handler,
            RunnerConfig {
                poll_interval: Duration::from_millis(5),
                ..Default::default()
            },
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
        handle.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn continue_on_error_processes_remaining_events() {
        let mailbox = Arc::new(Mailbox::new());
        mailbox.push(event(1));
        mailbox.push(event(1)); // fails
        mailbox.push(event(2));
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
            fail_on: Some(1),
        };
        let handle = spawn(
            MachineId::new("m"),
            mailbox,
            handler,
            RunnerConfig {
                poll_interval: Duration::from_millis(5),
                continue_on_error: true,
                ..Default::default()
            },
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
        handle.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 1); // only the `2` event counted
    }

    #[tokio::test]
    async fn stop_is_cooperative_at_next_tick_boundary() {
        let mailbox: Arc<Mailbox<u32>> = Arc::new(Mailbox::new());
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
            fail_on: None,
        };
        let handle = spawn(
            MachineId::new("m"),
            mailbox,
            handler,
            RunnerConfig {
                poll_interval: Duration::from_millis(5),
                ..Default::default()
            },
        );
        handle.stop();
        handle.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
