use crate::core::currency::CurrencyCode;
use crate::core::member::MemberId;
use crate::core::transaction::Transaction;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net position of each member within one scope.
///
/// A positive balance means the member is owed money.
/// A negative balance means the member owes money.
///
/// Balances are derived from a transaction log and never stored on
/// their own; see [`crate::engine::split::LedgerEngine::compute_balances`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSheet {
    positions: BTreeMap<MemberId, Decimal>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a sheet with every listed member at zero.
    pub fn with_members<'a>(members: impl IntoIterator<Item = &'a MemberId>) -> Self {
        Self {
            positions: members
                .into_iter()
                .map(|m| (m.clone(), Decimal::ZERO))
                .collect(),
        }
    }

    /// Fold one transaction into the sheet.
    pub fn apply(&mut self, transaction: &Transaction) {
        for (member, delta) in transaction.deltas() {
            *self
                .positions
                .entry(member.clone())
                .or_insert(Decimal::ZERO) += delta;
        }
    }

    /// Net position of a member; zero when they have no activity.
    pub fn position(&self, member: &MemberId) -> Decimal {
        self.positions
            .get(member)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn positions(&self) -> &BTreeMap<MemberId, Decimal> {
        &self.positions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, Decimal)> {
        self.positions.iter().map(|(m, v)| (m, *v))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn sum(&self) -> Decimal {
        self.positions.values().copied().sum()
    }

    /// Every debit has a matching credit.
    pub fn is_balanced(&self) -> bool {
        self.sum() == Decimal::ZERO
    }

    /// Total still owed across the scope (sum of positive positions).
    pub fn total_outstanding(&self) -> Decimal {
        self.positions
            .values()
            .filter(|v| **v > Decimal::ZERO)
            .sum()
    }

    /// True once every member is square.
    pub fn is_settled(&self) -> bool {
        self.positions.values().all(|v| v.is_zero())
    }

    /// Members who are owed money, largest first.
    pub fn creditors(&self) -> Vec<(MemberId, Decimal)> {
        let mut out: Vec<_> = self
            .iter()
            .filter(|(_, v)| *v > Decimal::ZERO)
            .map(|(m, v)| (m.clone(), v))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Members who owe money with the amount as a positive number, largest first.
    pub fn debtors(&self) -> Vec<(MemberId, Decimal)> {
        let mut out: Vec<_> = self
            .iter()
            .filter(|(_, v)| *v < Decimal::ZERO)
            .map(|(m, v)| (m.clone(), v.abs()))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Positions rounded to the currency's minor unit for display.
    ///
    /// Rounded values are not guaranteed to sum to zero.
    pub fn rounded(&self, currency: &CurrencyCode) -> BTreeMap<MemberId, Decimal> {
        self.positions
            .iter()
            .map(|(m, v)| (m.clone(), currency.round(*v)))
            .collect()
    }

    /// Rounded positions as plain numbers for JSON consumers.
    pub fn to_display(&self, currency: &CurrencyCode) -> BTreeMap<MemberId, f64> {
        self.rounded(currency)
            .into_iter()
            .map(|(m, v)| (m, v.to_f64().unwrap_or(0.0)))
            .collect()
    }
}
