//! The pure state transitions a `ServerMachine` applies: the
//! block-pipeline path (`apply`, used by `produce_block`/
//! `receive_block`/replay) and the immediate path (`apply_immediate`,
//! used by `UPDATE_CHILD_STATE`/`SYNC_CHILD_STATES`, which bypass the
//! mempool entirely).

use crate::command::{ServerCommand, ServerEvent};
use crate::error::{Result, ServerError};
use tracing::{debug, warn};
use vertex_types::{Amount, MachineId, Message, ServerState};

fn balance_key(id: &MachineId) -> String {
    format!("balance:{id}")
}

fn get_balance(state: &ServerState, id: &MachineId) -> Amount {
    state
        .base
        .data
        .get(&balance_key(id))
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse::<u128>().ok())
        .map(Amount::new)
        .unwrap_or(Amount::ZERO)
}

fn set_balance(state: &mut ServerState, id: &MachineId, amount: Amount) {
    state
        .base
        .data
        .insert(balance_key(id), serde_json::Value::String(amount.to_string()));
}

/// Applies an ordered batch of server commands to `state`, used both
/// by `produce_block`/`receive_block` and by full replay.
pub fn apply(
    state: &mut ServerState,
    events: &mut Vec<ServerEvent>,
    messages: &[Message<ServerCommand>],
) -> Result<()> {
    for message in messages {
        apply_one(state, events, &message.sender, &message.payload)?;
    }
    Ok(())
}

fn apply_one(
    state: &mut ServerState,
    events: &mut Vec<ServerEvent>,
    sender: &MachineId,
    command: &ServerCommand,
) -> Result<()> {
    let nonce = state.base.nonces.get(sender).copied().unwrap_or(0) + 1;
    state.base.nonces.insert(sender.clone(), nonce);

    match command {
        ServerCommand::CreateSigner { signer_id } => {
            if !state.submachines.contains_key(signer_id) {
                state.submachines.insert(signer_id.clone(), vertex_types::Hash::GENESIS);
                state.base.child_ids.push(signer_id.clone());
                events.push(ServerEvent::ChildRegistered {
                    child_id: signer_id.clone(),
                });
                debug!(%signer_id, "registered child signer");
            }
            Ok(())
        }
        ServerCommand::ProcessBlock { child_id, block_hash } => {
            if !state.submachines.contains_key(child_id) {
                return Err(ServerError::UnknownChild(child_id.clone()));
            }
            state.submachines.insert(child_id.clone(), *block_hash);
            events.push(ServerEvent::ChildStateUpdated {
                child_id: child_id.clone(),
                state_root: *block_hash,
            });
            Ok(())
        }
        ServerCommand::SyncState {
            child_id,
            reported_state_root,
        } => {
            let known = state
                .submachines
                .get(child_id)
                .copied()
                .ok_or_else(|| ServerError::UnknownChild(child_id.clone()))?;
            if known != *reported_state_root {
                warn!(%child_id, known = %known, reported = %reported_state_root, "child state root mismatch, adopting child's report");
                state.submachines.insert(child_id.clone(), *reported_state_root);
                events.push(ServerEvent::ChildStateUpdated {
                    child_id: child_id.clone(),
                    state_root: *reported_state_root,
                });
            }
            Ok(())
        }
        ServerCommand::SyncChildStates { .. } | ServerCommand::UpdateChildState { .. } => {
            Err(ServerError::UnknownChild(sender.clone()))
        }
        ServerCommand::Transfer { from, to, amount } => {
            let from_balance = get_balance(state, from);
            let to_balance = get_balance(state, to);
            set_balance(state, from, Amount::new(from_balance.value().saturating_sub(amount.value())));
            set_balance(state, to, to_balance + *amount);
            events.push(ServerEvent::TransferApplied {
                from: from.clone(),
                to: to.clone(),
                amount: *amount,
            });
            Ok(())
        }
    }
}

/// Applies `UPDATE_CHILD_STATE`/`SYNC_CHILD_STATES` directly to
/// `state`, bypassing the block pipeline entirely. Never removes an
/// existing child's entry: children vanish only via an explicit
/// close, never as a side effect of a sync.
pub fn apply_immediate(state: &mut ServerState, command: ServerCommand) -> Result<Vec<ServerEvent>> {
    let mut events = Vec::new();
    match command {
        ServerCommand::UpdateChildState { child_id, state_root } => {
            state.submachines.insert(child_id.clone(), state_root);
            events.push(ServerEvent::ChildStateUpdated { child_id, state_root });
        }
        ServerCommand::SyncChildStates { updates } => {
            for (child_id, state_root) in updates {
                state.submachines.insert(child_id.clone(), state_root);
                events.push(ServerEvent::ChildStateUpdated { child_id, state_root });
            }
        }
        other => {
            return Err(ServerError::Machine(vertex_machine::MachineError::ApplyFailed(format!(
                "{other:?} is not an immediate command"
            ))))
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertex_types::{Hash, MessageKind};

    fn msg(sender: &str, payload: ServerCommand) -> Message<ServerCommand> {
        Message::new(MessageKind::Command, MachineId::new(sender), MachineId::new("server-1"), payload, 0)
    }

    #[test]
    fn create_signer_registers_a_genesis_child() {
        let mut state = ServerState::default();
        let mut events = Vec::new();
        apply(
            &mut state,
            &mut events,
            &[msg("op", ServerCommand::CreateSigner { signer_id: MachineId::new("signer-1") })],
        )
        .unwrap();
        assert_eq!(state.submachines[&MachineId::new("signer-1")], Hash::GENESIS);
        assert_eq!(state.base.child_ids, vec![MachineId::new("signer-1")]);
    }

    #[test]
    fn process_block_rejects_unknown_child() {
        let mut state = ServerState::default();
        let mut events = Vec::new();
        let err = apply(
            &mut state,
            &mut events,
            &[msg(
                "op",
                ServerCommand::ProcessBlock { child_id: MachineId::new("ghost"), block_hash: Hash::digest(b"x") },
            )],
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::UnknownChild(_)));
    }

    #[test]
    fn transfer_moves_value_between_ledger_entries() {
        let mut state = ServerState::default();
        let mut events = Vec::new();
        apply(
            &mut state,
            &mut events,
            &[msg(
                "op",
                ServerCommand::Transfer { from: MachineId::new("a"), to: MachineId::new("b"), amount: Amount::new(30) },
            )],
        )
        .unwrap();
        assert_eq!(get_balance(&state, &MachineId::new("b")), Amount::new(30));
    }

    #[test]
    fn sync_child_states_never_removes_an_existing_child() {
        let mut state = ServerState::default();
        state.submachines.insert(MachineId::new("signer-1"), Hash::GENESIS);
        let mut updates = std::collections::BTreeMap::new();
        updates.insert(MachineId::new("signer-2"), Hash::digest(b"s2"));
        let events = apply_immediate(&mut state, ServerCommand::SyncChildStates { updates }).unwrap();
        assert!(state.submachines.contains_key(&MachineId::new("signer-1")));
        assert!(state.submachines.contains_key(&MachineId::new("signer-2")));
        assert_eq!(events.len(), 1);
    }
}
