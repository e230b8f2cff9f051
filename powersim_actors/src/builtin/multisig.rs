//! Multisig actor: an M-of-N wallet with optional linear vesting.

use super::{unhandled, ActorCode, INIT_ACTOR_ADDR, METHOD_CONSTRUCTOR};
use crate::abi::{ChainEpoch, MethodNum, TokenAmount};
use crate::address::Address;
use crate::error::ActorError;
use crate::exit_code::ExitCode;
use crate::params::{MethodParams, ReturnValue};
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROPOSE: MethodNum = 2;
pub const APPROVE: MethodNum = 3;
pub const CANCEL: MethodNum = 4;

pub(crate) fn method_name(method: MethodNum) -> Option<&'static str> {
    match method {
        PROPOSE => Some("Propose"),
        APPROVE => Some("Approve"),
        CANCEL => Some("Cancel"),
        _ => None,
    }
}

pub type TxnId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: MethodParams,
    /// Signers that approved, proposer first
    pub approved: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub signers: Vec<Address>,
    pub num_approvals_threshold: u64,
    pub next_txn_id: TxnId,

    // Linear vesting of the initial balance
    pub initial_balance: TokenAmount,
    pub start_epoch: ChainEpoch,
    pub unlock_duration: ChainEpoch,

    pub pending: BTreeMap<TxnId, Transaction>,
}

impl State {
    /// Portion of the initial balance still locked at `elapsed` epochs after start.
    pub fn amount_locked(&self, elapsed: ChainEpoch) -> TokenAmount {
        if elapsed >= self.unlock_duration {
            return TokenAmount::zero();
        }
        if elapsed <= 0 {
            return self.initial_balance;
        }
        let remaining = (self.unlock_duration - elapsed) as i128;
        self.initial_balance
            .scale(remaining)
            .div_floor(self.unlock_duration as i128)
    }

    /// Whether `amount` can leave a wallet holding `balance` at `epoch`.
    pub fn has_available(&self, balance: TokenAmount, amount: TokenAmount, epoch: ChainEpoch) -> bool {
        if amount.is_negative() || balance < amount {
            return false;
        }
        if self.unlock_duration == 0 {
            return true;
        }
        balance - amount >= self.amount_locked(epoch - self.start_epoch)
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }
}

// =============================================================================
// PARAMS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorParams {
    pub signers: Vec<Address>,
    pub num_approvals_threshold: u64,
    pub unlock_duration: ChainEpoch,
    pub start_epoch: ChainEpoch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeParams {
    pub to: Address,
    pub value: TokenAmount,
    pub method: MethodNum,
    pub params: Box<MethodParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnIdParams {
    pub id: TxnId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposeReturn {
    pub txn_id: TxnId,
    /// Whether the threshold was met and the transaction executed
    pub applied: bool,
    pub code: ExitCode,
    pub ret: Box<ReturnValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveReturn {
    pub applied: bool,
    pub code: ExitCode,
    pub ret: Box<ReturnValue>,
}

// =============================================================================
// METHODS
// =============================================================================

pub(crate) fn invoke<RT: Runtime>(
    rt: &mut RT,
    method: MethodNum,
    params: MethodParams,
) -> Result<ReturnValue, ActorError> {
    match method {
        METHOD_CONSTRUCTOR => constructor(rt, crate::expect_params!(params, MultisigConstructor)),
        PROPOSE => propose(rt, crate::expect_params!(params, Propose)),
        APPROVE => approve(rt, crate::expect_params!(params, Approve)),
        CANCEL => cancel(rt, crate::expect_params!(params, Cancel)),
        _ => Err(unhandled(ActorCode::Multisig, method)),
    }
}

fn constructor<RT: Runtime>(rt: &mut RT, params: ConstructorParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_is(&[INIT_ACTOR_ADDR])?;

    if params.signers.is_empty() {
        return Err(ActorError::illegal_argument("must have at least one signer"));
    }

    let mut signers = Vec::with_capacity(params.signers.len());
    for signer in &params.signers {
        let resolved = rt
            .resolve_address(signer)
            .ok_or_else(|| ActorError::illegal_argument(format!("unable to resolve signer {}", signer)))?;
        if signers.contains(&resolved) {
            return Err(ActorError::illegal_argument(format!("duplicate signer {}", signer)));
        }
        signers.push(resolved);
    }

    if params.num_approvals_threshold == 0 || params.num_approvals_threshold as usize > signers.len() {
        return Err(ActorError::illegal_argument(format!(
            "approval threshold {} invalid for {} signers",
            params.num_approvals_threshold,
            signers.len()
        )));
    }
    if params.unlock_duration < 0 {
        return Err(ActorError::illegal_argument(format!(
            "negative unlock duration {}",
            params.unlock_duration
        )));
    }

    let (initial_balance, start_epoch) = if params.unlock_duration > 0 {
        (rt.value_received(), params.start_epoch)
    } else {
        (TokenAmount::zero(), 0)
    };

    rt.set_state(&State {
        signers,
        num_approvals_threshold: params.num_approvals_threshold,
        next_txn_id: 0,
        initial_balance,
        start_epoch,
        unlock_duration: params.unlock_duration,
        pending: BTreeMap::new(),
    })?;
    Ok(ReturnValue::None)
}

fn validate_signer<RT: Runtime>(rt: &RT, st: &State) -> Result<Address, ActorError> {
    let caller = rt.caller();
    if !st.is_signer(&caller) {
        return Err(ActorError::forbidden(format!("{} is not a signer", caller)));
    }
    Ok(caller)
}

fn propose<RT: Runtime>(rt: &mut RT, params: ProposeParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_type(&[ActorCode::Account, ActorCode::Multisig])?;

    let (txn_id, txn, threshold) = rt.transaction(|st: &mut State, rt| {
        let proposer = validate_signer(rt, st)?;
        let txn_id = st.next_txn_id;
        st.next_txn_id += 1;
        let txn = Transaction {
            to: params.to,
            value: params.value,
            method: params.method,
            params: *params.params.clone(),
            approved: vec![proposer],
        };
        st.pending.insert(txn_id, txn.clone());
        Ok((txn_id, txn, st.num_approvals_threshold))
    })?;

    let (applied, code, ret) = execute_if_approved(rt, txn_id, &txn, threshold)?;
    Ok(ReturnValue::Propose(ProposeReturn {
        txn_id,
        applied,
        code,
        ret: Box::new(ret),
    }))
}

fn approve<RT: Runtime>(rt: &mut RT, params: TxnIdParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_type(&[ActorCode::Account, ActorCode::Multisig])?;

    let (txn, threshold) = rt.transaction(|st: &mut State, rt| {
        let approver = validate_signer(rt, st)?;
        let txn = st
            .pending
            .get_mut(&params.id)
            .ok_or_else(|| ActorError::not_found(format!("no such transaction {}", params.id)))?;
        if txn.approved.contains(&approver) {
            return Err(ActorError::forbidden(format!(
                "{} already approved transaction {}",
                approver, params.id
            )));
        }
        txn.approved.push(approver);
        Ok((txn.clone(), st.num_approvals_threshold))
    })?;

    let (applied, code, ret) = execute_if_approved(rt, params.id, &txn, threshold)?;
    Ok(ReturnValue::Approve(ApproveReturn {
        applied,
        code,
        ret: Box::new(ret),
    }))
}

/// Only the proposer may cancel a pending transaction.
fn cancel<RT: Runtime>(rt: &mut RT, params: TxnIdParams) -> Result<ReturnValue, ActorError> {
    rt.validate_caller_type(&[ActorCode::Account, ActorCode::Multisig])?;

    rt.transaction(|st: &mut State, rt| {
        let caller = validate_signer(rt, st)?;
        let txn = st
            .pending
            .get(&params.id)
            .ok_or_else(|| ActorError::not_found(format!("no such transaction {}", params.id)))?;
        if txn.approved.first() != Some(&caller) {
            return Err(ActorError::forbidden(format!(
                "only the proposer may cancel transaction {}",
                params.id
            )));
        }
        st.pending.remove(&params.id);
        Ok(())
    })?;
    Ok(ReturnValue::None)
}

/// Sends the transaction once it has enough approvals and removes it from the
/// pending set. The inner send's failure is reported in the exit code rather
/// than aborting the approval.
fn execute_if_approved<RT: Runtime>(
    rt: &mut RT,
    txn_id: TxnId,
    txn: &Transaction,
    threshold: u64,
) -> Result<(bool, ExitCode, ReturnValue), ActorError> {
    if (txn.approved.len() as u64) < threshold {
        return Ok((false, ExitCode::OK, ReturnValue::None));
    }

    let balance = rt.current_balance();
    let epoch = rt.epoch();
    rt.transaction(|st: &mut State, _| {
        if !st.has_available(balance, txn.value, epoch) {
            return Err(ActorError::insufficient_funds(format!(
                "insufficient unlocked funds to send {}",
                txn.value
            )));
        }
        st.pending.remove(&txn_id);
        Ok(())
    })?;

    match rt.send(&txn.to, txn.method, txn.params.clone(), txn.value) {
        Ok(ret) => Ok((true, ExitCode::OK, ret)),
        Err(e) => {
            rt.log(format!("multisig transaction {} failed: {}", txn_id, e));
            Ok((true, e.exit_code(), ReturnValue::None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vesting(initial: i128, start: ChainEpoch, duration: ChainEpoch) -> State {
        State {
            signers: vec![Address::new_id(100), Address::new_id(101)],
            num_approvals_threshold: 2,
            next_txn_id: 0,
            initial_balance: TokenAmount::new(initial),
            start_epoch: start,
            unlock_duration: duration,
            pending: BTreeMap::new(),
        }
    }

    #[test]
    fn test_amount_locked_vests_linearly() {
        let st = vesting(1000, 0, 10);
        assert_eq!(st.amount_locked(0), TokenAmount::new(1000));
        assert_eq!(st.amount_locked(3), TokenAmount::new(700));
        assert_eq!(st.amount_locked(10), TokenAmount::zero());
        assert_eq!(st.amount_locked(25), TokenAmount::zero());
    }

    #[test]
    fn test_amount_locked_does_not_truncate_to_zero() {
        // 1000 * 9 / 10, not 1000 * (9 / 10)
        let st = vesting(1000, 0, 10);
        assert_eq!(st.amount_locked(1), TokenAmount::new(900));
    }

    #[test]
    fn test_has_available_respects_lock() {
        let st = vesting(1000, 100, 10);
        let balance = TokenAmount::new(1000);
        assert!(!st.has_available(balance, TokenAmount::new(1), 100));
        assert!(st.has_available(balance, TokenAmount::new(500), 105));
        assert!(!st.has_available(balance, TokenAmount::new(501), 105));
        assert!(st.has_available(balance, TokenAmount::new(1000), 110));
        assert!(!st.has_available(balance, TokenAmount::new(1001), 200));
    }

    #[test]
    fn test_has_available_without_vesting() {
        let st = vesting(0, 0, 0);
        assert!(st.has_available(TokenAmount::new(5), TokenAmount::new(5), 0));
        assert!(!st.has_available(TokenAmount::new(5), TokenAmount::new(-1), 0));
    }

    #[test]
    fn test_is_signer() {
        let st = vesting(0, 0, 0);
        assert!(st.is_signer(&Address::new_id(101)));
        assert!(!st.is_signer(&Address::new_id(102)));
    }
}
