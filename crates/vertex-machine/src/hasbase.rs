//! Uniform access to [`BaseMachineState`] across the three concrete
//! state types that ride the block pipeline.
//!
//! `ChannelState` deliberately has no impl here: its lifecycle is
//! governed by signed state updates and sequence numbers rather than
//! blocks, so it never passes through [`crate::MachineCore`].

use vertex_types::{BaseMachineState, EntityState, ServerState, SignerState};

/// A state type that embeds [`BaseMachineState`] and exposes it to the
/// pipeline for height/link/nonce bookkeeping.
pub trait HasBase {
    /// Returns the embedded base state.
    fn base(&self) -> &BaseMachineState;
    /// Returns the embedded base state, mutably.
    fn base_mut(&mut self) -> &mut BaseMachineState;
}

impl HasBase for ServerState {
    fn base(&self) -> &BaseMachineState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseMachineState {
        &mut self.base
    }
}

impl<C> HasBase for SignerState<C> {
    fn base(&self) -> &BaseMachineState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseMachineState {
        &mut self.base
    }
}

impl<C> HasBase for EntityState<C> {
    fn base(&self) -> &BaseMachineState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseMachineState {
        &mut self.base
    }
}
