//! Account holder agent.

use crate::agent::Agent;
use crate::error::AgentError;
use crate::message::Message;
use powersim_actors::builtin::METHOD_SEND;
use powersim_actors::{Address, MethodParams, TokenAmount};
use powersim_vm::LedgerState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Tuning for an account agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountAgentConfig {
    /// Chance of sending a transfer in any epoch
    pub send_probability: f64,
    /// Largest share of the current balance sent at once
    pub max_send_fraction: f64,
}

impl Default for AccountAgentConfig {
    fn default() -> Self {
        Self {
            send_probability: 0.5,
            max_send_fraction: 0.1,
        }
    }
}

/// Moves funds between a fixed set of peer accounts.
pub struct AccountAgent {
    pub address: Address,
    peers: Vec<Address>,
    config: AccountAgentConfig,
    rng: ChaCha8Rng,
}

impl AccountAgent {
    /// `peers` should not contain `address`; it is filtered out if present.
    pub fn new(address: Address, peers: Vec<Address>, seed: u64, config: AccountAgentConfig) -> Self {
        let peers = peers.into_iter().filter(|p| *p != address).collect();
        Self {
            address,
            peers,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn peers(&self) -> &[Address] {
        &self.peers
    }
}

impl Agent for AccountAgent {
    fn tick(&mut self, state: &dyn LedgerState) -> Result<Vec<Message>, AgentError> {
        if self.peers.is_empty() || self.rng.gen::<f64>() >= self.config.send_probability {
            return Ok(Vec::new());
        }

        let to = self.peers[self.rng.gen_range(0..self.peers.len())];
        let fraction = self.rng.gen::<f64>() * self.config.max_send_fraction.clamp(0.0, 1.0);
        let balance = state.balance(&self.address);
        let amount = TokenAmount::new((balance.value() as f64 * fraction) as i128);
        if !amount.is_positive() || amount > balance {
            return Ok(Vec::new());
        }

        Ok(vec![Message::new(self.address, to, amount, METHOD_SEND, MethodParams::None)])
    }

    fn name(&self) -> &'static str {
        "account"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powersim_vm::{Ledger, Vm};

    #[test]
    fn test_self_is_not_a_peer() {
        let a = Address::new_id(100);
        let agent = AccountAgent::new(a, vec![a, Address::new_id(101)], 1, AccountAgentConfig::default());
        assert_eq!(agent.peers(), &[Address::new_id(101)]);
    }

    #[test]
    fn test_transfers_stay_within_fraction() {
        let mut vm = Vm::new().unwrap();
        let accounts = vm.create_accounts(3, TokenAmount::new(10_000), 5).unwrap();
        let config = AccountAgentConfig {
            send_probability: 1.0,
            max_send_fraction: 0.25,
        };
        let mut agent = AccountAgent::new(accounts[0], accounts.clone(), 17, config);

        for _ in 0..50 {
            let balance = vm.balance(&accounts[0]);
            let msgs = agent.tick(&vm).unwrap();
            assert!(msgs.len() <= 1);
            for msg in msgs {
                assert!(msg.value <= balance.div_floor(4));
                assert_ne!(msg.to, accounts[0]);
                let (_, code) = vm.apply_message(&msg.from, &msg.to, msg.value, msg.method, msg.params);
                assert!(code.is_success());
            }
        }
        assert!(vm.balance(&accounts[0]) < TokenAmount::new(10_000));
    }

    #[test]
    fn test_silent_without_peers_or_probability() {
        let vm = Vm::new().unwrap();
        let mut lonely = AccountAgent::new(Address::new_id(100), vec![], 1, AccountAgentConfig::default());
        assert!(lonely.tick(&vm).unwrap().is_empty());

        let quiet = AccountAgentConfig {
            send_probability: 0.0,
            ..Default::default()
        };
        let mut agent = AccountAgent::new(Address::new_id(100), vec![Address::new_id(101)], 1, quiet);
        assert!(agent.tick(&vm).unwrap().is_empty());
    }
}
