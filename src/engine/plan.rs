use crate::core::balance::BalanceSheet;
use crate::core::member::MemberId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A transfer that, once recorded as a settlement, moves both members
/// towards zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTransfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
}

/// Transfers that would square every balance in a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    transfers: Vec<SuggestedTransfer>,
}

impl SettlementPlan {
    /// Match the largest debtor with the largest creditor until every
    /// position is zero.
    ///
    /// Each step closes out at least one member, so the plan never has
    /// more than `n - 1` transfers for `n` members with a non-zero
    /// position. Ties are broken by member id, which keeps the plan
    /// deterministic.
    pub fn from_balances(balances: &BalanceSheet) -> Self {
        let mut creditors = ranked(balances.creditors());
        let mut debtors = ranked(balances.debtors());
        let mut transfers = Vec::new();

        while let (Some((owed, Reverse(to))), Some((owes, Reverse(from)))) =
            (creditors.pop(), debtors.pop())
        {
            let amount = owed.min(owes);
            transfers.push(SuggestedTransfer {
                from: from.clone(),
                to: to.clone(),
                amount,
            });
            if owed > amount {
                creditors.push((owed - amount, Reverse(to)));
            }
            if owes > amount {
                debtors.push((owes - amount, Reverse(from)));
            }
        }

        Self { transfers }
    }

    pub fn transfers(&self) -> &[SuggestedTransfer] {
        &self.transfers
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Total money moved by the plan.
    pub fn total(&self) -> Decimal {
        self.transfers.iter().map(|t| t.amount).sum()
    }

    /// Transfers `member` has to make.
    pub fn payments_by<'a>(
        &'a self,
        member: &'a MemberId,
    ) -> impl Iterator<Item = &'a SuggestedTransfer> + 'a {
        self.transfers.iter().filter(move |t| &t.from == member)
    }
}

/// Max-heap on amount; equal amounts pop the smallest member id first.
fn ranked(positions: Vec<(MemberId, Decimal)>) -> BinaryHeap<(Decimal, Reverse<MemberId>)> {
    positions
        .into_iter()
        .map(|(member, amount)| (amount, Reverse(member)))
        .collect()
}

impl std::fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Settle Up ===")?;
        if self.transfers.is_empty() {
            return writeln!(f, "Everyone is settled up.");
        }
        for t in &self.transfers {
            writeln!(f, "  {} pays {} {}", t.from, t.to, t.amount)?;
        }
        writeln!(f, "Total moved: {}", self.total())
    }
}
