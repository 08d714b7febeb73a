//! The pure state transition a `ChannelMachine` applies per command.

use crate::command::{ChannelCommand, ChannelEvent};
use crate::error::{ChannelError, Result};
use std::collections::BTreeMap;
use vertex_crypto::{PublicKey, Signature};
use vertex_types::{
    Amount, ChannelState, ChannelStatus, DisputeState, MachineId, SignedStateUpdate,
};

/// Applies one command, first sweeping an elapsed dispute timeout
/// regardless of which command arrived.
///
/// # Errors
///
/// Returns an error if `command` is not permitted in `state`'s current
/// status, or if its balances or signatures fail to validate.
pub fn apply(
    state: &mut ChannelState,
    sender: &MachineId,
    now: i64,
    command: ChannelCommand,
) -> Result<Vec<ChannelEvent>> {
    let mut events = Vec::new();
    if let Some(event) = sweep_timeout(state, now) {
        events.push(event);
    }

    match command {
        ChannelCommand::UpdateBalance {
            new_balances,
            signatures,
        } => {
            events.push(update_balance(state, new_balances, &signatures, now)?);
        }
        ChannelCommand::InitiateDispute { evidence } => {
            events.push(initiate_dispute(state, sender, evidence, now)?);
        }
        ChannelCommand::ResolveDispute { evidence } => {
            events.extend(resolve_dispute(state, sender, evidence, now)?);
        }
        ChannelCommand::FinalizeSettlement { final_balances } => {
            events.push(finalize_settlement(state, final_balances)?);
        }
        ChannelCommand::CloseChannel => {
            events.push(close_channel(state)?);
        }
    }

    Ok(events)
}

/// Checks for an elapsed dispute deadline without requiring a command
/// to arrive, so a periodic tick can drive the `TIMED_OUT` branch.
pub fn tick(state: &mut ChannelState, now: i64) -> Vec<ChannelEvent> {
    sweep_timeout(state, now).into_iter().collect()
}

fn sweep_timeout(state: &mut ChannelState, now: i64) -> Option<ChannelEvent> {
    if state.status != ChannelStatus::Disputed {
        return None;
    }
    let timed_out = state
        .current_dispute
        .as_ref()
        .is_some_and(|d| d.is_timed_out(now));
    if !timed_out {
        return None;
    }
    Some(apply_timeout(state, now))
}

fn update_balance(
    state: &mut ChannelState,
    new_balances: BTreeMap<MachineId, Amount>,
    signatures: &BTreeMap<MachineId, String>,
    now: i64,
) -> Result<ChannelEvent> {
    if state.status != ChannelStatus::Open {
        return Err(ChannelError::NotOpen);
    }
    require_exact_participants(state, &new_balances).ok_or(ChannelError::WrongParticipants)?;
    if new_balances.values().copied().sum::<Amount>() != state.total_balance() {
        return Err(ChannelError::ConservationViolated);
    }

    let sequence = state.sequence + 1;
    let proposed = SignedStateUpdate::new(sequence, new_balances.clone(), now);
    let (a, b) = state.participants.clone();
    for participant in [&a, &b] {
        let sig_hex = signatures
            .get(participant)
            .ok_or(ChannelError::InvalidSignatures)?;
        if !verify_participant_signature(participant, proposed.state_hash.as_bytes(), sig_hex) {
            return Err(ChannelError::InvalidSignatures);
        }
    }

    let mut signed = proposed;
    signed.signatures = signatures.clone();
    state.sequence = sequence;
    state.balances = new_balances;
    state.state_updates.insert(sequence, signed);
    Ok(ChannelEvent::BalanceUpdated { sequence })
}

fn initiate_dispute(
    state: &mut ChannelState,
    sender: &MachineId,
    evidence: Option<SignedStateUpdate>,
    now: i64,
) -> Result<ChannelEvent> {
    if state.status != ChannelStatus::Open {
        return Err(ChannelError::NotOpen);
    }
    if state.current_dispute.is_some() {
        return Err(ChannelError::DisputeAlreadyActive);
    }

    let contested_update = state
        .state_updates
        .get(&state.sequence)
        .cloned()
        .unwrap_or_else(|| SignedStateUpdate::new(state.sequence, state.balances.clone(), now));

    let mut dispute_evidence = BTreeMap::new();
    if let Some(ev) = evidence {
        dispute_evidence.insert(sender.clone(), ev);
    }

    state.current_dispute = Some(DisputeState {
        initiator: sender.clone(),
        contested_update,
        start_time: now,
        resolved: false,
        evidence: dispute_evidence,
        automatic_resolution_time: now + state.dispute_period_ms,
    });
    state.status = ChannelStatus::Disputed;
    Ok(ChannelEvent::DisputeInitiated)
}

fn resolve_dispute(
    state: &mut ChannelState,
    sender: &MachineId,
    evidence: SignedStateUpdate,
    now: i64,
) -> Result<Vec<ChannelEvent>> {
    if state.status != ChannelStatus::Disputed {
        return Err(ChannelError::NotDisputed);
    }
    let deadline = state
        .current_dispute
        .as_ref()
        .map(|d| d.start_time + state.dispute_period_ms)
        .ok_or(ChannelError::NotDisputed)?;
    if now >= deadline {
        return Err(ChannelError::DisputeWindowClosed);
    }

    let dispute = state.current_dispute.as_mut().ok_or(ChannelError::NotDisputed)?;
    dispute.evidence.insert(sender.clone(), evidence);

    let (a, b) = state.participants.clone();
    let both_in = dispute.evidence.contains_key(&a) && dispute.evidence.contains_key(&b);
    if !both_in {
        return Ok(vec![ChannelEvent::EvidenceRecorded {
            participant: sender.clone(),
        }]);
    }

    let dispute = state.current_dispute.take().ok_or(ChannelError::NotDisputed)?;
    let authoritative = highest_sequence(&dispute);
    let sequence = authoritative.sequence;
    resolve_with_balances(state, authoritative.balances.clone(), sequence, now);
    let finalize_event = finalize_settlement(state, authoritative.balances)?;
    Ok(vec![ChannelEvent::DisputeResolved { sequence }, finalize_event])
}

/// Highest-`sequence`-wins across the contested update and every
/// submitted evidence update.
fn highest_sequence(dispute: &DisputeState) -> SignedStateUpdate {
    let mut best = dispute.contested_update.clone();
    for candidate in dispute.evidence.values() {
        if candidate.sequence > best.sequence {
            best = candidate.clone();
        }
    }
    best
}

fn apply_timeout(state: &mut ChannelState, now: i64) -> ChannelEvent {
    let dispute = state.current_dispute.take().expect("checked Disputed above");
    let authoritative = highest_sequence(&dispute);
    let (a, b) = state.participants.clone();

    let responded: Vec<&MachineId> = [&a, &b]
        .into_iter()
        .filter(|p| dispute.evidence.contains_key(*p))
        .collect();
    let silent: Vec<&MachineId> = [&a, &b]
        .into_iter()
        .filter(|p| !dispute.evidence.contains_key(*p))
        .collect();

    let mut balances = authoritative.balances.clone();
    let penalized: Vec<MachineId> = silent.iter().map(|p| (*p).clone()).collect();

    if !responded.is_empty() && !silent.is_empty() {
        let mut redistributed = Amount::ZERO;
        for participant in &silent {
            let debit = balances.get(*participant).copied().unwrap_or(Amount::ZERO).tenth();
            if let Some(balance) = balances.get_mut(*participant) {
                *balance = *balance - debit;
            }
            redistributed = redistributed + debit;
        }
        let share = redistributed.scale(1, responded.len() as u128);
        let mut remainder = redistributed;
        for (index, participant) in responded.iter().enumerate() {
            let credit = if index + 1 == responded.len() {
                remainder
            } else {
                remainder = remainder - share;
                share
            };
            if let Some(balance) = balances.get_mut(*participant) {
                *balance = *balance + credit;
            }
        }
    }

    let sequence = authoritative.sequence;
    resolve_with_balances(state, balances.clone(), sequence, now);
    // TIMED_OUT resolves to the same RESOLVED -> SETTLING handoff as a
    // normal RESOLVE_DISPUTE; the settlement call cannot fail here since
    // `balances` was just mirrored into `state.balances` above.
    finalize_settlement(state, balances).expect("penalty redistribution preserves conservation");
    ChannelEvent::DisputeTimedOut { sequence, penalized }
}

/// Applies the dispute-ends-in-agreement step RESOLVE_DISPUTE and
/// TIMED_OUT both reach: stamp the authoritative balances and
/// sequence, clear the dispute, and land in `RESOLVED`, the state both
/// paths pass through before the synthetic `FINALIZE_SETTLEMENT` call
/// (`finalize_settlement`) carries the channel on into `SETTLING`.
fn resolve_with_balances(
    state: &mut ChannelState,
    balances: BTreeMap<MachineId, Amount>,
    sequence: u64,
    now: i64,
) {
    let settled = SignedStateUpdate::new(sequence, balances.clone(), now);
    state.balances = balances;
    state.sequence = sequence;
    state.state_updates.insert(sequence, settled);
    state.current_dispute = None;
    state.status = ChannelStatus::Resolved;
}

fn finalize_settlement(
    state: &mut ChannelState,
    final_balances: BTreeMap<MachineId, Amount>,
) -> Result<ChannelEvent> {
    if state.status != ChannelStatus::Resolved {
        return Err(ChannelError::NotResolved);
    }
    require_exact_participants(state, &final_balances).ok_or(ChannelError::SettlementWrongParticipants)?;
    if final_balances.values().copied().sum::<Amount>() != state.total_balance() {
        return Err(ChannelError::SettlementConservationViolated);
    }

    let sequence = state.sequence + 1;
    state.balances = final_balances;
    state.sequence = sequence;
    state.current_dispute = None;
    state.status = ChannelStatus::Settling;
    Ok(ChannelEvent::SettlementFinalized)
}

fn close_channel(state: &mut ChannelState) -> Result<ChannelEvent> {
    match state.status {
        ChannelStatus::Disputed => Err(ChannelError::DisputeStillActive),
        ChannelStatus::Closed => Err(ChannelError::AlreadyClosed),
        _ => {
            state.current_dispute = None;
            state.status = ChannelStatus::Closed;
            Ok(ChannelEvent::ChannelClosed)
        }
    }
}

fn require_exact_participants(
    state: &ChannelState,
    balances: &BTreeMap<MachineId, Amount>,
) -> Option<()> {
    let (a, b) = &state.participants;
    let expected: std::collections::BTreeSet<&MachineId> = [a, b].into_iter().collect();
    let actual: std::collections::BTreeSet<&MachineId> = balances.keys().collect();
    (expected == actual).then_some(())
}

/// Verifies `sig_hex` against `digest`, treating `participant`'s own
/// id string as its hex-encoded public key — the same identity
/// modeling `vertex-entity` uses for transaction partial signatures,
/// since a channel's participants are entity ids rather than individual
/// signer keys.
fn verify_participant_signature(participant: &MachineId, digest: &[u8; 32], sig_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(participant.as_str()) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };
    if sig_bytes.len() != Signature::LEN {
        return false;
    }
    let signature = Signature::from_slice(&sig_bytes);
    public_key.verify_prehash(digest, &signature).is_ok()
}
