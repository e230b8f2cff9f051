//! Method parameters and return values.
//!
//! Every builtin method takes one [`MethodParams`] variant and produces one
//! [`ReturnValue`] variant. Plain value transfers use `MethodParams::None`.

use crate::builtin::{init, miner, multisig, power, reward};
use crate::address::Address;
use crate::abi::StoragePower;
use serde::{Deserialize, Serialize};

/// Parameters of a method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MethodParams {
    #[default]
    None,

    // Init
    Exec(init::ExecParams),

    // Storage power
    CreateMiner(power::CreateMinerParams),
    UpdateClaimedPower(power::UpdateClaimedPowerParams),
    UpdatePledgeTotal(power::UpdatePledgeTotalParams),

    // Reward
    AwardBlockReward(reward::AwardBlockRewardParams),
    UpdateNetworkKpi(Option<StoragePower>),

    // Storage miner
    MinerConstructor(miner::MinerConstructorParams),
    PreCommitSector(miner::SectorPreCommitInfo),
    ProveCommitSector(miner::ProveCommitSectorParams),
    ApplyRewards(miner::ApplyRewardsParams),

    // Multisig
    MultisigConstructor(multisig::ConstructorParams),
    Propose(multisig::ProposeParams),
    Approve(multisig::TxnIdParams),
    Cancel(multisig::TxnIdParams),

    // Account
    AccountConstructor(Address),
}

impl MethodParams {
    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MethodParams::None => "none",
            MethodParams::Exec(_) => "exec",
            MethodParams::CreateMiner(_) => "create_miner",
            MethodParams::UpdateClaimedPower(_) => "update_claimed_power",
            MethodParams::UpdatePledgeTotal(_) => "update_pledge_total",
            MethodParams::AwardBlockReward(_) => "award_block_reward",
            MethodParams::UpdateNetworkKpi(_) => "update_network_kpi",
            MethodParams::MinerConstructor(_) => "miner_constructor",
            MethodParams::PreCommitSector(_) => "pre_commit_sector",
            MethodParams::ProveCommitSector(_) => "prove_commit_sector",
            MethodParams::ApplyRewards(_) => "apply_rewards",
            MethodParams::MultisigConstructor(_) => "multisig_constructor",
            MethodParams::Propose(_) => "propose",
            MethodParams::Approve(_) => "approve",
            MethodParams::Cancel(_) => "cancel",
            MethodParams::AccountConstructor(_) => "account_constructor",
        }
    }
}

/// Opaque return value of a method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnValue {
    #[default]
    None,
    Exec(init::ExecReturn),
    CreateMiner(power::CreateMinerReturn),
    ThisEpochReward(reward::ThisEpochRewardReturn),
    PubkeyAddress(Address),
    Propose(multisig::ProposeReturn),
    Approve(multisig::ApproveReturn),
}

/// Extracts the expected variant from params, or fails with a serialization error.
#[macro_export]
macro_rules! expect_params {
    ($params:expr, $variant:ident) => {
        match $params {
            $crate::params::MethodParams::$variant(inner) => inner,
            other => {
                return Err($crate::error::ActorError::serialization(format!(
                    "expected {} params, got {}",
                    stringify!($variant),
                    other.kind()
                )))
            }
        }
    };
}
