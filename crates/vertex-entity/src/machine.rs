//! `EntityMachine`: a `MachineCore` specialized to the threshold-weighted
//! multisig proposal engine, plus the `ActorRunner` glue that admits
//! incoming bus commands into its mempool.

use crate::apply::apply;
use crate::command::EntityCommand;
use crate::error::{EntityError, Result};
use crate::EntityEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use vertex_bus::MachineHandler;
use vertex_machine::MachineCore;
use vertex_types::{Block, Canonicalize, EntityConfig, EntityState, MachineEvent, MachineId, Message};

/// A multisig account: wraps a [`MachineCore`] over [`EntityState`]
/// plus the proposal-lifecycle events its apply step accumulates
/// during the single `apply` call a `produce_block`/`receive_block`
/// invocation performs.
pub struct EntityMachine<C> {
    /// The shared produce/receive/verify pipeline.
    pub core: MachineCore<EntityState<C>, EntityCommand<C>>,
    events: Arc<Mutex<Vec<EntityEvent>>>,
}

impl<C> EntityMachine<C>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    /// Builds a fresh entity machine seeded with `config`.
    #[must_use]
    pub fn new(self_id: MachineId, config: EntityConfig, mempool_capacity: usize) -> Self {
        let state = EntityState {
            base: vertex_types::BaseMachineState::default(),
            config,
            channels: std::collections::BTreeMap::new(),
            balance: vertex_types::Amount::ZERO,
            nonce: 0,
            proposals: std::collections::BTreeMap::new(),
            pending_transactions: std::collections::BTreeMap::new(),
        };
        Self {
            core: MachineCore::new(self_id, state, mempool_capacity),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Admits a command into this entity's mempool.
    ///
    /// # Errors
    ///
    /// Returns an error if the mempool is at capacity.
    pub fn admit(
        &mut self,
        command: Message<EntityCommand<C>>,
        gas_price: u64,
        now: i64,
    ) -> Result<vertex_types::Hash> {
        self.core.admit(command, gas_price, now).map_err(EntityError::Machine)
    }

    /// Produces a block over this entity's pending commands, returning
    /// it alongside the lifecycle events its apply step emitted.
    ///
    /// # Errors
    ///
    /// See [`MachineCore::produce_block`].
    pub fn produce_block(
        &mut self,
        now: u64,
        max_transactions: usize,
    ) -> Result<(Block<EntityCommand<C>>, Vec<EntityEvent>)> {
        self.events.lock().clear();
        let self_id = self.core.self_id.clone();
        let now_i64 = now as i64;
        let events = self.events.clone();
        let block = self
            .core
            .produce_block(self_id.clone(), now, max_transactions, move |state, txs| {
                apply(state, &self_id, now_i64, &events, txs)
            })
            .map_err(EntityError::Machine)?;
        Ok((block, self.events.lock().clone()))
    }

    /// Validates and commits a block produced by this entity elsewhere,
    /// returning the lifecycle events its apply step emitted.
    ///
    /// # Errors
    ///
    /// See [`MachineCore::receive_block`].
    pub fn receive_block(
        &mut self,
        block: &Block<EntityCommand<C>>,
        now: i64,
    ) -> Result<Vec<EntityEvent>> {
        self.events.lock().clear();
        let self_id = self.core.self_id.clone();
        let events = self.events.clone();
        self.core
            .receive_block(block, move |state, txs| apply(state, &self_id, now, &events, txs))
            .map_err(EntityError::Machine)?;
        Ok(self.events.lock().clone())
    }
}

impl<C> MachineHandler<EntityCommand<C>> for EntityMachine<C>
where
    C: Canonicalize + Clone + Send + 'static,
    Message<C>: Canonicalize,
{
    type Error = EntityError;

    fn handle(&mut self, event: MachineEvent<EntityCommand<C>>) -> Result<()> {
        let message = Message::command(
            event.sender,
            self.core.self_id.clone(),
            event.payload,
            event.timestamp,
        );
        self.admit(message, 0, event.timestamp).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ChannelClosureProof;
    use std::collections::{BTreeMap, BTreeSet};
    use vertex_types::{Amount, ChannelState, ChannelStatus, MessageKind, ProposalStatus};

    fn config(threshold: u32, signers: &[(&str, u32)]) -> EntityConfig {
        EntityConfig {
            threshold,
            signers: signers.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            admins: BTreeSet::new(),
        }
    }

    fn command_message(
        sender: &str,
        payload: EntityCommand<u64>,
    ) -> Message<EntityCommand<u64>> {
        Message::new(
            MessageKind::Command,
            MachineId::new(sender),
            MachineId::new("entity-1"),
            payload,
            1000,
        )
    }

    #[test]
    fn propose_transaction_auto_executes_when_proposer_alone_meets_threshold() {
        let cfg = config(1, &[("a", 1), ("b", 1)]);
        let mut entity: EntityMachine<u64> = EntityMachine::new(MachineId::new("entity-1"), cfg, 10);

        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let tx = vertex_types::SignedTransaction::new(inner);

        entity
            .admit(
                command_message("a", EntityCommand::ProposeTransaction { transaction: tx, nonce: 1 }),
                0,
                1000,
            )
            .unwrap();
        let (block, events) = entity.produce_block(1000, 10).unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, EntityEvent::ProposalExecuted { .. })));
        assert_eq!(entity.core.state.nonce, 1);
        assert_eq!(entity.core.state.pending_transactions.len(), 1);
    }

    #[test]
    fn propose_transaction_waits_for_approval_below_threshold() {
        let cfg = config(2, &[("a", 1), ("b", 1)]);
        let mut entity: EntityMachine<u64> = EntityMachine::new(MachineId::new("entity-1"), cfg, 10);

        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let tx = vertex_types::SignedTransaction::new(inner);

        entity
            .admit(
                command_message("a", EntityCommand::ProposeTransaction { transaction: tx, nonce: 1 }),
                0,
                1000,
            )
            .unwrap();
        let (_, events) = entity.produce_block(1000, 10).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, EntityEvent::ProposalCreated { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, EntityEvent::ProposalExecuted { .. })));

        let proposal_id = entity
            .core
            .state
            .proposals
            .keys()
            .next()
            .cloned()
            .unwrap();
        entity
            .admit(
                command_message("b", EntityCommand::ApproveProposal { proposal_id: proposal_id.clone() }),
                0,
                1001,
            )
            .unwrap();
        let (_, events) = entity.produce_block(1001, 10).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, EntityEvent::ProposalExecuted { .. })));
        assert_eq!(
            entity.core.state.proposals[&proposal_id].status,
            ProposalStatus::Executed
        );
    }

    #[test]
    fn cancel_proposal_rejects_a_non_proposer_non_admin() {
        let cfg = config(2, &[("a", 1), ("b", 1)]);
        let mut entity: EntityMachine<u64> = EntityMachine::new(MachineId::new("entity-1"), cfg, 10);
        let inner = Message::new(
            MessageKind::Command,
            MachineId::new("entity-1"),
            MachineId::new("entity-1"),
            7u64,
            0,
        );
        let tx = vertex_types::SignedTransaction::new(inner);
        entity
            .admit(
                command_message("a", EntityCommand::ProposeTransaction { transaction: tx, nonce: 1 }),
                0,
                1000,
            )
            .unwrap();
        entity.produce_block(1000, 10).unwrap();
        let proposal_id = entity.core.state.proposals.keys().next().cloned().unwrap();

        entity
            .admit(
                command_message("b", EntityCommand::CancelProposal { proposal_id }),
                0,
                1001,
            )
            .unwrap();
        let err = entity.produce_block(1001, 10).unwrap_err();
        assert!(matches!(err, EntityError::Unauthorized(_)));
    }

    #[test]
    fn open_then_close_channel_round_trips() {
        let cfg = config(1, &[("a", 1)]);
        let mut entity: EntityMachine<u64> = EntityMachine::new(MachineId::new("entity-1"), cfg, 10);

        let mut balances = BTreeMap::new();
        balances.insert(MachineId::new("entity-1"), Amount::new(100));
        balances.insert(MachineId::new("entity-2"), Amount::new(100));

        entity
            .admit(
                command_message(
                    "a",
                    EntityCommand::OpenChannel {
                        partner_id: MachineId::new("entity-2"),
                        balances: balances.clone(),
                        dispute_period_ms: 60_000,
                    },
                ),
                0,
                1000,
            )
            .unwrap();
        let (_, events) = entity.produce_block(1000, 10).unwrap();
        let channel_id = match &events[0] {
            EntityEvent::ChannelOpened { channel_id } => channel_id.clone(),
            other => panic!("unexpected event: {other:?}"),
        };
        assert!(entity.core.state.channels.contains_key(&channel_id));

        let participants = if MachineId::new("entity-1").as_str() <= MachineId::new("entity-2").as_str() {
            (MachineId::new("entity-1"), MachineId::new("entity-2"))
        } else {
            (MachineId::new("entity-2"), MachineId::new("entity-1"))
        };
        let mut update = vertex_types::SignedStateUpdate::new(1, balances.clone(), 1100);
        update.signatures.insert(MachineId::new("entity-1"), "sig-a".to_string());
        update.signatures.insert(MachineId::new("entity-2"), "sig-b".to_string());
        let mut state_updates = BTreeMap::new();
        state_updates.insert(1, update);

        let channel_state = ChannelState {
            participants,
            balances,
            sequence: 1,
            status: ChannelStatus::Settling,
            dispute_period_ms: 60_000,
            state_updates,
            current_dispute: None,
        };

        entity
            .admit(
                command_message(
                    "a",
                    EntityCommand::CloseChannel {
                        channel_id: channel_id.clone(),
                        proof: ChannelClosureProof { channel_state },
                    },
                ),
                0,
                1200,
            )
            .unwrap();
        let (_, events) = entity.produce_block(1200, 10).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, EntityEvent::ChannelClosed { .. })));
    }
}
