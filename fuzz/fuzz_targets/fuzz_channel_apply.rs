//! Drives a fresh `ChannelMachine` with arbitrary commands and checks
//! that the total-balance conservation invariant holds after every
//! successful `apply`, regardless of how adversarial the input is.
#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;
use vertex_channel::{ChannelCommand, ChannelMachine};
use vertex_types::{Amount, MachineId, SignedStateUpdate};

#[derive(Debug, Arbitrary)]
enum FuzzCommand {
    Rebalance { shift: i8 },
    InitiateDispute { with_own_evidence: bool },
    ResolveDispute { sequence: u8 },
    Tick { elapsed: u16 },
    Close,
}

fuzz_target!(|commands: Vec<(bool, FuzzCommand, u16)>| {
    let x = MachineId::new("x");
    let y = MachineId::new("y");
    let mut balances = BTreeMap::new();
    balances.insert(x.clone(), Amount::new(100));
    balances.insert(y.clone(), Amount::new(100));
    let total = Amount::new(200);

    let mut channel = ChannelMachine::open((x.clone(), y.clone()), balances, 1_000);
    let mut now: i64 = 0;

    for (sender_is_x, command, advance) in commands {
        now += i64::from(advance);
        let sender = if sender_is_x { x.clone() } else { y.clone() };

        let result = match command {
            FuzzCommand::Rebalance { shift } => {
                let shift = i128::from(shift);
                let total_now = channel.state.total_balance().value() as i128;
                let x_new = (channel.state.balances[&x].value() as i128 + shift).clamp(0, total_now);
                let y_new = total_now - x_new;
                let mut new_balances = BTreeMap::new();
                new_balances.insert(x.clone(), Amount::new(x_new as u128));
                new_balances.insert(y.clone(), Amount::new(y_new as u128));
                channel.apply(
                    &sender,
                    now,
                    ChannelCommand::UpdateBalance { new_balances, signatures: BTreeMap::new() },
                )
            }
            FuzzCommand::InitiateDispute { with_own_evidence } => {
                let evidence = with_own_evidence.then(|| {
                    SignedStateUpdate::new(channel.state.sequence, channel.state.balances.clone(), now)
                });
                channel.apply(&sender, now, ChannelCommand::InitiateDispute { evidence })
            }
            FuzzCommand::ResolveDispute { sequence } => {
                let evidence =
                    SignedStateUpdate::new(u64::from(sequence), channel.state.balances.clone(), now);
                channel.apply(&sender, now, ChannelCommand::ResolveDispute { evidence })
            }
            FuzzCommand::Tick { elapsed } => {
                now += i64::from(elapsed);
                channel.tick(now);
                continue;
            }
            FuzzCommand::Close => channel.apply(&sender, now, ChannelCommand::CloseChannel),
        };

        if result.is_ok() {
            assert_eq!(channel.state.total_balance(), total);
        }
    }
});
