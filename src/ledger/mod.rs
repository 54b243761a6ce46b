//! Token ledger arithmetic
//!
//! The ledger is the one piece of state shared across jobs. Generation only
//! reads it; the apply phase reserves, then commits or releases. A reservation
//! holds tokens without touching `balance`, so the balance only moves down when
//! a confirmed apply commits, and it can never go negative.

use crate::error::{CatalystError, ErrorCode, Result};
use crate::plan::TokenPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};
use uuid::Uuid;

/// Balance source payload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub balance: u64,
    #[serde(default)]
    pub total_purchased: u64,
    #[serde(default)]
    pub total_used: u64,
}

impl LedgerSnapshot {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            total_purchased: balance,
            total_used: 0,
        }
    }
}

/// Reservation could not be taken
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("insufficient tokens: {required} required, {available} available")]
pub struct InsufficientTokens {
    pub required: u64,
    pub available: u64,
}

/// Tokens held for one pending commit
///
/// Not `Clone`: a reservation is settled exactly once, by value.
#[derive(Debug, PartialEq, Eq)]
pub struct Reservation {
    id: Uuid,
    amount: u64,
}

impl Reservation {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }
}

/// Balance arithmetic for one store
#[derive(Debug)]
pub struct TokenLedger {
    snapshot: LedgerSnapshot,
    policy: TokenPolicy,
    held: HashMap<Uuid, u64>,
}

impl TokenLedger {
    pub fn new(snapshot: LedgerSnapshot, policy: TokenPolicy) -> Self {
        Self {
            snapshot,
            policy,
            held: HashMap::new(),
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    pub fn balance(&self) -> u64 {
        self.snapshot.balance
    }

    /// Tokens currently held by open reservations
    pub fn held(&self) -> u64 {
        self.held.values().sum()
    }

    /// Balance not claimed by open reservations
    pub fn available(&self) -> u64 {
        self.snapshot.balance.saturating_sub(self.held())
    }

    /// Whether `cost` could be reserved right now. Included plans never pay.
    pub fn can_afford(&self, cost: u64) -> bool {
        self.policy == TokenPolicy::Included || cost <= self.available()
    }

    /// Hold `cost` tokens for a later commit
    pub fn reserve(&mut self, cost: u64) -> std::result::Result<Reservation, InsufficientTokens> {
        let amount = if self.policy == TokenPolicy::Included {
            0
        } else {
            cost
        };

        let available = self.available();
        if amount > available {
            debug!("Reservation of {} refused, {} available", amount, available);
            return Err(InsufficientTokens {
                required: amount,
                available,
            });
        }

        let id = Uuid::new_v4();
        self.held.insert(id, amount);
        trace!("Reserved {} tokens ({})", amount, id);
        Ok(Reservation { id, amount })
    }

    /// Turn a reservation into a debit; returns the debited amount
    pub fn commit(&mut self, reservation: Reservation) -> Result<u64> {
        let amount = reservation.amount;
        self.commit_up_to(reservation, amount)
    }

    /// Debit at most `amount` from a reservation and release the remainder
    pub fn commit_up_to(&mut self, reservation: Reservation, amount: u64) -> Result<u64> {
        let held = self.take(&reservation)?;
        let amount = amount.min(held);
        self.snapshot.balance = self.snapshot.balance.checked_sub(amount).ok_or_else(|| {
            CatalystError::ledger(
                ErrorCode::LEDGER_OVERFLOW,
                format!("commit of {} exceeds balance {}", amount, self.snapshot.balance),
            )
        })?;
        self.snapshot.total_used = self.snapshot.total_used.saturating_add(amount);
        trace!(
            "Committed {} of {} held tokens ({})",
            amount,
            held,
            reservation.id
        );
        Ok(amount)
    }

    /// Drop a reservation without debiting
    pub fn release(&mut self, reservation: Reservation) -> Result<()> {
        self.take(&reservation)?;
        trace!("Released {} tokens ({})", reservation.amount, reservation.id);
        Ok(())
    }

    /// Add purchased tokens
    pub fn credit(&mut self, amount: u64) -> Result<()> {
        let overflow = || {
            CatalystError::ledger(ErrorCode::LEDGER_OVERFLOW, "token credit overflows balance")
        };
        self.snapshot.balance = self.snapshot.balance.checked_add(amount).ok_or_else(overflow)?;
        self.snapshot.total_purchased = self
            .snapshot
            .total_purchased
            .checked_add(amount)
            .ok_or_else(overflow)?;
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot
    }

    fn take(&mut self, reservation: &Reservation) -> Result<u64> {
        self.held.remove(&reservation.id).ok_or_else(|| {
            CatalystError::ledger(
                ErrorCode::LEDGER_UNKNOWN_RESERVATION,
                format!("reservation {} is not held by this ledger", reservation.id),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reserve_commit_moves_tokens_into_used() {
        let mut ledger = TokenLedger::new(LedgerSnapshot::with_balance(10), TokenPolicy::Metered);

        let r = ledger.reserve(4).unwrap();
        assert_eq!(ledger.balance(), 10);
        assert_eq!(ledger.available(), 6);

        assert_eq!(ledger.commit(r).unwrap(), 4);
        let snap = ledger.snapshot();
        assert_eq!(snap.balance, 6);
        assert_eq!(snap.total_used, 4);
        assert_eq!(ledger.held(), 0);
    }

    #[test]
    fn test_partial_commit_releases_remainder() {
        let mut ledger = TokenLedger::new(LedgerSnapshot::with_balance(10), TokenPolicy::Metered);
        let r = ledger.reserve(6).unwrap();

        assert_eq!(ledger.commit_up_to(r, 2).unwrap(), 2);
        assert_eq!(ledger.held(), 0);
        assert_eq!(ledger.available(), 8);
        assert_eq!(ledger.snapshot().total_used, 2);

        let r = ledger.reserve(3).unwrap();
        assert_eq!(ledger.commit_up_to(r, 7).unwrap(), 3);
        assert_eq!(ledger.balance(), 5);
    }

    #[test]
    fn test_release_restores_availability() {
        let mut ledger = TokenLedger::new(LedgerSnapshot::with_balance(5), TokenPolicy::Metered);
        let r = ledger.reserve(5).unwrap();
        assert!(!ledger.can_afford(1));

        ledger.release(r).unwrap();
        assert!(ledger.can_afford(5));
        assert_eq!(ledger.snapshot(), LedgerSnapshot::with_balance(5));
    }

    #[test]
    fn test_insufficient_reservation() {
        let mut ledger = TokenLedger::new(LedgerSnapshot::with_balance(10), TokenPolicy::Metered);
        let err = ledger.reserve(50).unwrap_err();
        assert_eq!(
            err,
            InsufficientTokens {
                required: 50,
                available: 10
            }
        );
    }

    #[test]
    fn test_included_policy_never_debits() {
        let mut ledger = TokenLedger::new(LedgerSnapshot::default(), TokenPolicy::Included);
        assert!(ledger.can_afford(1_000));

        let r = ledger.reserve(1_000).unwrap();
        assert_eq!(r.amount(), 0);
        assert_eq!(ledger.commit(r).unwrap(), 0);
        assert_eq!(ledger.snapshot(), LedgerSnapshot::default());
    }

    #[test]
    fn test_foreign_reservation_is_rejected() {
        let mut a = TokenLedger::new(LedgerSnapshot::with_balance(5), TokenPolicy::Metered);
        let mut b = TokenLedger::new(LedgerSnapshot::with_balance(5), TokenPolicy::Metered);

        let r = a.reserve(1).unwrap();
        let err = b.commit(r).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LEDGER_UNKNOWN_RESERVATION);
        assert_eq!(b.balance(), 5);
    }

    #[test]
    fn test_credit_updates_purchased() {
        let mut ledger = TokenLedger::new(LedgerSnapshot::default(), TokenPolicy::Metered);
        ledger.credit(25).unwrap();
        assert_eq!(ledger.snapshot().total_purchased, 25);
        assert!(ledger.can_afford(25));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(u64),
        Commit(usize),
        Release(usize),
        Credit(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..40).prop_map(Op::Reserve),
            (0usize..8).prop_map(Op::Commit),
            (0usize..8).prop_map(Op::Release),
            (0u64..20).prop_map(Op::Credit),
        ]
    }

    proptest! {
        #[test]
        fn prop_balance_never_negative_and_only_commit_lowers_it(
            start in 0u64..100,
            ops in prop::collection::vec(op_strategy(), 0..60),
        ) {
            let mut ledger = TokenLedger::new(LedgerSnapshot::with_balance(start), TokenPolicy::Metered);
            let mut open: Vec<Reservation> = Vec::new();

            for op in ops {
                let before = ledger.snapshot();
                match op {
                    Op::Reserve(cost) => {
                        if let Ok(r) = ledger.reserve(cost) {
                            open.push(r);
                        }
                        prop_assert_eq!(ledger.balance(), before.balance);
                    }
                    Op::Commit(i) if !open.is_empty() => {
                        let r = open.remove(i % open.len());
                        let amount = r.amount();
                        prop_assert!(ledger.commit(r).is_ok());
                        prop_assert_eq!(ledger.balance(), before.balance - amount);
                        prop_assert_eq!(ledger.snapshot().total_used, before.total_used + amount);
                    }
                    Op::Release(i) if !open.is_empty() => {
                        let r = open.remove(i % open.len());
                        prop_assert!(ledger.release(r).is_ok());
                        prop_assert_eq!(ledger.balance(), before.balance);
                    }
                    Op::Credit(amount) => {
                        prop_assert!(ledger.credit(amount).is_ok());
                    }
                    _ => {}
                }
                prop_assert!(ledger.held() <= ledger.balance());
            }
        }
    }
}
