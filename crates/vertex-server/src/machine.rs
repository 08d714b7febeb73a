//! `ServerMachine`: the top-of-hierarchy submachine that owns each
//! child's last-known state root, seals blocks of accepted
//! transactions on a timer, and periodically probes children for sync.

use crate::apply::{apply, apply_immediate};
use crate::command::{ConsensusEvent, ServerCommand, ServerEvent};
use crate::error::{Result, ServerError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use vertex_bus::MachineHandler;
use vertex_machine::MachineCore;
use vertex_types::{Block, Hash, MachineEvent, MachineId, Message, ServerState};

/// Default interval between block-production ticks.
pub const DEFAULT_BLOCK_INTERVAL: Duration = Duration::from_millis(100);
/// Default interval between child-sync ticks.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);
/// Capacity of the lifecycle-event broadcast channel.
const CONSENSUS_EVENT_CAPACITY: usize = 256;

/// A multisig-free, top-of-hierarchy submachine: wraps a
/// [`MachineCore`] over [`ServerState`], plus a `tokio::sync::broadcast`
/// channel of structured lifecycle events consumed by dashboards and
/// tests.
pub struct ServerMachine {
    /// The shared produce/receive/verify pipeline.
    pub core: MachineCore<ServerState, ServerCommand>,
    events: Arc<Mutex<Vec<ServerEvent>>>,
    consensus_tx: broadcast::Sender<ConsensusEvent>,
}

impl ServerMachine {
    /// Builds a fresh server machine with empty child bookkeeping.
    #[must_use]
    pub fn new(self_id: MachineId, mempool_capacity: usize) -> Self {
        let (consensus_tx, _) = broadcast::channel(CONSENSUS_EVENT_CAPACITY);
        Self {
            core: MachineCore::new(self_id, ServerState::default(), mempool_capacity),
            events: Arc::new(Mutex::new(Vec::new())),
            consensus_tx,
        }
    }

    /// Subscribes to this server's `BlockProposed`/`BlockFinalized`/
    /// `StateChanged` lifecycle feed. Lagging subscribers miss older
    /// events rather than blocking production.
    #[must_use]
    pub fn subscribe_consensus_events(&self) -> broadcast::Receiver<ConsensusEvent> {
        self.consensus_tx.subscribe()
    }

    /// Admits a command into this server's mempool.
    ///
    /// `UPDATE_CHILD_STATE`/`SYNC_CHILD_STATES` must go through
    /// [`Self::apply_immediate`] instead; admitting them here is
    /// rejected since they never flow through the block pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the mempool is at capacity, or if `command`
    /// is one of the immediate-only variants.
    pub fn admit(&mut self, command: Message<ServerCommand>, gas_price: u64, now: i64) -> Result<Hash> {
        if matches!(
            command.payload,
            ServerCommand::UpdateChildState { .. } | ServerCommand::SyncChildStates { .. }
        ) {
            return Err(ServerError::Machine(vertex_machine::MachineError::ApplyFailed(
                "UPDATE_CHILD_STATE/SYNC_CHILD_STATES bypass the mempool".to_string(),
            )));
        }
        self.core.admit(command, gas_price, now).map_err(ServerError::Machine)
    }

    /// Applies `UPDATE_CHILD_STATE`/`SYNC_CHILD_STATES` directly,
    /// bypassing the mempool and block pipeline entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if `command` is not one of those two variants.
    pub fn apply_immediate(&mut self, command: ServerCommand) -> Result<Vec<ServerEvent>> {
        apply_immediate(&mut self.core.state, command)
    }

    /// Produces a block over this server's pending commands.
    ///
    /// # Errors
    ///
    /// See [`MachineCore::produce_block`].
    pub fn produce_block(&mut self, now: u64, max_transactions: usize) -> Result<(Block<ServerCommand>, Vec<ServerEvent>)> {
        self.events.lock().clear();
        let self_id = self.core.self_id.clone();
        let events = self.events.clone();
        let block = self
            .core
            .produce_block(self_id, now, max_transactions, move |state, txs| {
                let mut acc = events.lock();
                apply(state, &mut acc, txs)
            })
            .map_err(ServerError::Machine)?;
        self.consensus_tx.send(ConsensusEvent::BlockProposed { height: block.height(), id: block.id() }).ok();
        self.consensus_tx
            .send(ConsensusEvent::BlockFinalized { height: block.height(), id: block.id() })
            .ok();
        self.consensus_tx
            .send(ConsensusEvent::StateChanged { state_root: self.core.state.base.state_root })
            .ok();
        Ok((block, self.events.lock().clone()))
    }

    /// Validates and commits a block produced by this server elsewhere
    /// (a peer replica received over gossip).
    ///
    /// # Errors
    ///
    /// See [`MachineCore::receive_block`].
    pub fn receive_block(&mut self, block: &Block<ServerCommand>) -> Result<Vec<ServerEvent>> {
        self.events.lock().clear();
        let events = self.events.clone();
        self.core
            .receive_block(block, move |state, txs| {
                let mut acc = events.lock();
                apply(state, &mut acc, txs)
            })
            .map_err(ServerError::Machine)?;
        self.consensus_tx
            .send(ConsensusEvent::BlockFinalized { height: block.height(), id: block.id() })
            .ok();
        self.consensus_tx
            .send(ConsensusEvent::StateChanged { state_root: self.core.state.base.state_root })
            .ok();
        Ok(self.events.lock().clone())
    }
}

impl MachineHandler<ServerCommand> for ServerMachine {
    type Error = ServerError;

    fn handle(&mut self, event: MachineEvent<ServerCommand>) -> Result<()> {
        if matches!(
            event.payload,
            ServerCommand::UpdateChildState { .. } | ServerCommand::SyncChildStates { .. }
        ) {
            self.apply_immediate(event.payload).map(|_| ())
        } else {
            let message = Message::command(event.sender, self.core.self_id.clone(), event.payload, event.timestamp);
            self.core.admit(message, 0, event.timestamp).map(|_| ()).map_err(ServerError::Machine)
        }
    }
}

/// A handle to a spawned server timer task.
pub struct TimerHandle {
    stop_flag: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl TimerHandle {
    /// Signals the timer loop to exit at its next tick boundary.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Waits for the timer task to exit.
    ///
    /// # Panics
    ///
    /// Panics if the underlying task panicked.
    pub async fn join(self) {
        self.task.await.expect("server timer task panicked");
    }
}

/// Spawns the block-production timer: every `interval`, produces a
/// block over up to `max_transactions_per_block` pending commands. An
/// empty mempool (`NoTransactions`) is not an error at this layer —
/// it simply means nothing to seal this tick.
pub fn spawn_block_production_timer(
    server: Arc<Mutex<ServerMachine>>,
    interval: Duration,
    max_transactions_per_block: usize,
) -> TimerHandle {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let task_stop_flag = stop_flag.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if task_stop_flag.load(Ordering::SeqCst) {
                break;
            }
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            let mut guard = server.lock();
            match guard.produce_block(now, max_transactions_per_block) {
                Ok((block, _events)) => {
                    guard.core.state.last_block_time = now as i64;
                    debug!(height = block.height(), "server sealed a block");
                }
                Err(ServerError::Machine(vertex_machine::MachineError::NoTransactions)) => {}
                Err(err) => warn!(cause = %err, "block production failed"),
            }
        }
    });

    TimerHandle { stop_flag, task }
}

/// Spawns the child-sync timer: every `interval`, invokes `on_tick`
/// with the server's current `childId -> lastKnownRoot` snapshot, so
/// the caller can dispatch a `SYNC_STATE` query to each child over
/// whatever bus that child kind listens on (the server itself is
/// agnostic to child command types).
pub fn spawn_child_sync_timer<F>(
    server: Arc<Mutex<ServerMachine>>,
    interval: Duration,
    mut on_tick: F,
) -> TimerHandle
where
    F: FnMut(&std::collections::BTreeMap<MachineId, Hash>) + Send + 'static,
{
    let stop_flag = Arc::new(AtomicBool::new(false));
    let task_stop_flag = stop_flag.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if task_stop_flag.load(Ordering::SeqCst) {
                break;
            }
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            let mut guard = server.lock();
            guard.core.state.last_sync_time = now;
            on_tick(&guard.core.state.submachines);
        }
    });

    TimerHandle { stop_flag, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_types::MessageKind;

    fn cmd(sender: &str, payload: ServerCommand) -> Message<ServerCommand> {
        Message::new(MessageKind::Command, MachineId::new(sender), MachineId::new("server-1"), payload, 1000)
    }

    #[test]
    fn produce_block_registers_a_child_and_emits_event() {
        let mut server = ServerMachine::new(MachineId::new("server-1"), 10);
        server
            .admit(cmd("op", ServerCommand::CreateSigner { signer_id: MachineId::new("signer-1") }), 0, 1000)
            .unwrap();
        let (block, events) = server.produce_block(1000, 10).unwrap();
        assert_eq!(block.header.block_number, 1);
        assert!(events.iter().any(|e| matches!(e, ServerEvent::ChildRegistered { .. })));
        assert!(server.core.state.submachines.contains_key(&MachineId::new("signer-1")));
    }

    #[test]
    fn admit_rejects_immediate_only_commands() {
        let mut server = ServerMachine::new(MachineId::new("server-1"), 10);
        let err = server
            .admit(
                cmd("op", ServerCommand::UpdateChildState { child_id: MachineId::new("x"), state_root: Hash::GENESIS }),
                0,
                1000,
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::Machine(_)));
    }

    #[test]
    fn apply_immediate_updates_a_child_root_without_a_block() {
        let mut server = ServerMachine::new(MachineId::new("server-1"), 10);
        let root = Hash::digest(b"child-root");
        server
            .apply_immediate(ServerCommand::UpdateChildState { child_id: MachineId::new("signer-1"), state_root: root })
            .unwrap();
        assert_eq!(server.core.state.submachines[&MachineId::new("signer-1")], root);
        assert_eq!(server.core.state.base.block_height, 0);
    }

    #[tokio::test]
    async fn produce_then_receive_round_trips_on_a_fresh_peer() {
        let mut producer = ServerMachine::new(MachineId::new("server-1"), 10);
        producer
            .admit(cmd("op", ServerCommand::CreateSigner { signer_id: MachineId::new("signer-1") }), 0, 1000)
            .unwrap();
        let (block, _) = producer.produce_block(1000, 10).unwrap();

        let mut peer = ServerMachine::new(MachineId::new("server-2"), 10);
        peer.receive_block(&block).unwrap();
        assert_eq!(peer.core.state.base.state_root, producer.core.state.base.state_root);
        assert!(peer.core.state.submachines.contains_key(&MachineId::new("signer-1")));
    }
}
