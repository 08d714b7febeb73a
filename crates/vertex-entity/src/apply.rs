//! The pure state transition an `EntityMachine` applies per command,
//! shared by `produce_block`, `receive_block`, and replay.

use crate::command::{derive_channel_id, EntityCommand, EntityEvent};
use crate::error::{EntityError, Result};
use crate::validation::validate_transaction;
use parking_lot::Mutex;
use tracing::debug;
use vertex_types::{
    Canonicalize, ChannelStatus, EntityState, MachineId, Message, Proposal, ProposalId,
    ProposalStatus, ProposalType,
};

/// Applies an ordered batch of entity commands to `state`, first
/// sweeping any `ACTIVE` proposal whose `expires_at` has passed
/// regardless of whether this batch addresses it.
pub fn apply<C>(
    state: &mut EntityState<C>,
    self_id: &MachineId,
    now: i64,
    events: &Mutex<Vec<EntityEvent>>,
    messages: &[Message<EntityCommand<C>>],
) -> Result<()>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    sweep_expired_proposals(state, now, events);
    for message in messages {
        let signer_key = message.sender.as_str().to_string();
        apply_one(state, self_id, &signer_key, now, events, &message.id, &message.payload)?;
    }
    Ok(())
}

fn sweep_expired_proposals<C>(state: &mut EntityState<C>, now: i64, events: &Mutex<Vec<EntityEvent>>) {
    let expired: Vec<ProposalId> = state
        .proposals
        .iter()
        .filter(|(_, p)| p.status == ProposalStatus::Active && p.is_past_expiry(now))
        .map(|(id, _)| id.clone())
        .collect();
    for proposal_id in expired {
        if let Some(proposal) = state.proposals.get_mut(&proposal_id) {
            proposal.status = ProposalStatus::Expired;
            proposal.finalized_at = Some(now);
        }
        events.lock().push(EntityEvent::ProposalExpired { proposal_id });
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_one<C>(
    state: &mut EntityState<C>,
    self_id: &MachineId,
    signer_key: &str,
    now: i64,
    events: &Mutex<Vec<EntityEvent>>,
    message_id: &str,
    command: &EntityCommand<C>,
) -> Result<()>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    match command {
        EntityCommand::ProposeTransaction { transaction, nonce } => {
            if *nonce <= state.nonce {
                return Err(EntityError::StaleNonce {
                    got: *nonce,
                    current: state.nonce,
                });
            }

            let validation = validate_transaction(transaction, &state.config);
            let proposal_id = ProposalId(format!("tx-{message_id}"));
            let mut approvals = std::collections::BTreeMap::new();
            approvals.insert(signer_key.to_string(), true);

            let proposal = Proposal {
                id: proposal_id.clone(),
                proposer: signer_key.to_string(),
                proposal_type: ProposalType::Transaction,
                transaction: Some(transaction.clone()),
                new_config: None,
                approvals,
                status: ProposalStatus::Active,
                timestamp: now,
                expires_at: now + Proposal::<C>::EXPIRY_MS,
                finalized_at: None,
            };
            let proposer_weight = state.config.approved_weight(&proposal.approvals);
            state.proposals.insert(proposal_id.clone(), proposal);
            events.lock().push(EntityEvent::ProposalCreated {
                proposal_id: proposal_id.clone(),
            });

            let weight = proposer_weight.max(validation.total_weight);
            if weight >= state.config.threshold {
                execute_proposal(state, &proposal_id, now)?;
                events.lock().push(EntityEvent::ProposalExecuted { proposal_id });
            }
            Ok(())
        }

        EntityCommand::UpdateConfig { new_config } => {
            new_config.validate().map_err(EntityError::InvalidConfig)?;

            let proposal_id = ProposalId(format!("cfg-{message_id}"));
            let mut approvals = std::collections::BTreeMap::new();
            approvals.insert(signer_key.to_string(), true);

            let proposal: Proposal<C> = Proposal {
                id: proposal_id.clone(),
                proposer: signer_key.to_string(),
                proposal_type: ProposalType::ConfigUpdate,
                transaction: None,
                new_config: Some(new_config.clone()),
                approvals,
                status: ProposalStatus::Active,
                timestamp: now,
                expires_at: now + Proposal::<C>::EXPIRY_MS,
                finalized_at: None,
            };
            let weight = state.config.approved_weight(&proposal.approvals);
            state.proposals.insert(proposal_id.clone(), proposal);
            events.lock().push(EntityEvent::ProposalCreated {
                proposal_id: proposal_id.clone(),
            });

            if weight >= state.config.threshold {
                execute_proposal(state, &proposal_id, now)?;
                events.lock().push(EntityEvent::ProposalExecuted { proposal_id });
            }
            Ok(())
        }

        EntityCommand::ApproveProposal { proposal_id } => {
            let weight = {
                let proposal = state
                    .proposals
                    .get_mut(proposal_id)
                    .ok_or_else(|| EntityError::UnknownProposal(proposal_id.clone()))?;
                if proposal.status != ProposalStatus::Active {
                    return Err(EntityError::ProposalNotActive(proposal_id.clone()));
                }
                proposal.approvals.insert(signer_key.to_string(), true);
                state.config.approved_weight(&proposal.approvals)
            };

            if weight >= state.config.threshold {
                execute_proposal(state, proposal_id, now)?;
                events.lock().push(EntityEvent::ProposalExecuted {
                    proposal_id: proposal_id.clone(),
                });
            } else {
                events.lock().push(EntityEvent::ProposalApproved {
                    proposal_id: proposal_id.clone(),
                    weight,
                });
            }
            Ok(())
        }

        EntityCommand::CancelProposal { proposal_id } => {
            let proposal = state
                .proposals
                .get_mut(proposal_id)
                .ok_or_else(|| EntityError::UnknownProposal(proposal_id.clone()))?;
            if proposal.status != ProposalStatus::Active {
                return Err(EntityError::ProposalNotActive(proposal_id.clone()));
            }
            let authorized = proposal.proposer == signer_key || state.config.admins.contains(signer_key);
            if !authorized {
                return Err(EntityError::Unauthorized(signer_key.to_string()));
            }
            proposal.status = ProposalStatus::Cancelled;
            proposal.finalized_at = Some(now);
            events.lock().push(EntityEvent::ProposalCancelled {
                proposal_id: proposal_id.clone(),
            });
            Ok(())
        }

        EntityCommand::OpenChannel {
            partner_id,
            balances,
            dispute_period_ms,
        } => {
            let channel_id = derive_channel_id(self_id, partner_id);
            if state.channels.contains_key(&channel_id) {
                return Err(EntityError::ChannelExists(channel_id));
            }
            let expected_keys: std::collections::BTreeSet<&MachineId> =
                [self_id, partner_id].into_iter().collect();
            let actual_keys: std::collections::BTreeSet<&MachineId> = balances.keys().collect();
            if expected_keys != actual_keys {
                return Err(EntityError::InvalidChannelBalances);
            }

            let participants = if self_id.as_str() <= partner_id.as_str() {
                (self_id.clone(), partner_id.clone())
            } else {
                (partner_id.clone(), self_id.clone())
            };
            let channel_state = vertex_types::ChannelState {
                participants,
                balances: balances.clone(),
                sequence: 0,
                status: ChannelStatus::Open,
                dispute_period_ms: *dispute_period_ms,
                state_updates: std::collections::BTreeMap::new(),
                current_dispute: None,
            };
            state.channels.insert(channel_id.clone(), channel_state.canonical_hash());
            events.lock().push(EntityEvent::ChannelOpened {
                channel_id: channel_id.clone(),
            });
            debug!(%channel_id, "opened channel");
            Ok(())
        }

        EntityCommand::CloseChannel { channel_id, proof } => {
            if !state.channels.contains_key(channel_id) {
                return Err(EntityError::UnknownChannel(channel_id.clone()));
            }
            let (a, b) = &proof.channel_state.participants;
            let recomputed_id = derive_channel_id(a, b);
            if recomputed_id != *channel_id || (a != self_id && b != self_id) {
                return Err(EntityError::ChannelProofMismatch(channel_id.clone()));
            }

            closeable_or_err(&proof.channel_state, now)?;

            state.channels.remove(channel_id);
            events.lock().push(EntityEvent::ChannelClosed {
                channel_id: channel_id.clone(),
            });
            Ok(())
        }
    }
}

/// Checks whether `channel` is eligible for `CLOSE_CHANNEL`: either
/// `SETTLING` with both participants having signed the latest state
/// update and that update's balances matching the channel's recorded
/// balances, or `DISPUTED` with the automatic resolution deadline
/// already passed.
fn closeable_or_err(channel: &vertex_types::ChannelState, now: i64) -> Result<()> {
    match channel.status {
        ChannelStatus::Settling => {
            let latest = channel
                .state_updates
                .iter()
                .next_back()
                .map(|(_, update)| update)
                .ok_or(EntityError::ChannelNotCloseable)?;
            let (a, b) = &channel.participants;
            let both_signed = latest.signatures.contains_key(a) && latest.signatures.contains_key(b);
            let balances_match = latest.balances == channel.balances;
            if both_signed && balances_match {
                Ok(())
            } else {
                Err(EntityError::ChannelNotCloseable)
            }
        }
        ChannelStatus::Disputed => {
            let dispute = channel
                .current_dispute
                .as_ref()
                .ok_or(EntityError::ChannelNotCloseable)?;
            if dispute.is_timed_out(now) {
                Ok(())
            } else {
                Err(EntityError::ChannelNotCloseable)
            }
        }
        _ => Err(EntityError::ChannelNotCloseable),
    }
}

fn execute_proposal<C>(state: &mut EntityState<C>, proposal_id: &ProposalId, now: i64) -> Result<()>
where
    C: Canonicalize + Clone,
    Message<C>: Canonicalize,
{
    let (proposal_type, transaction, new_config) = {
        let proposal = state
            .proposals
            .get(proposal_id)
            .ok_or_else(|| EntityError::UnknownProposal(proposal_id.clone()))?;
        (
            proposal.proposal_type.clone(),
            proposal.transaction.clone(),
            proposal.new_config.clone(),
        )
    };

    match proposal_type {
        ProposalType::Transaction => {
            if let Some(tx) = transaction {
                state.pending_transactions.insert(tx.digest(), tx);
                state.nonce += 1;
            }
        }
        ProposalType::ConfigUpdate => {
            if let Some(cfg) = new_config {
                state.config = cfg;
            }
        }
    }

    let proposal = state
        .proposals
        .get_mut(proposal_id)
        .ok_or_else(|| EntityError::UnknownProposal(proposal_id.clone()))?;
    proposal.status = ProposalStatus::Executed;
    proposal.finalized_at = Some(now);
    Ok(())
}
