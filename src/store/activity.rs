use crate::core::member::MemberId;
use crate::core::scope::{Scope, ScopeCategory, ScopeId};
use crate::core::transaction::{TransactionId, TransactionKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Expense,
    Settlement,
}

/// One line of a member's activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub scope_id: ScopeId,
    pub scope_name: String,
    /// Who paid.
    pub who: MemberId,
    /// Receiver of a settlement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<MemberId>,
    pub description: String,
    pub amount: Decimal,
    /// Change this transaction made to the member's balance; zero for a
    /// group expense they were not part of.
    pub effect: Decimal,
    pub date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

/// A member's standing in one scope, as listed on the settle-up page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleUpEntry {
    pub scope_id: ScopeId,
    pub kind: ScopeCategory,
    /// Group name, or the friend's name for a friend pair.
    pub name: String,
    /// Positive: they owe the member. Negative: the member owes them.
    pub amount: Decimal,
}

/// Summary shown on a member's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub member: MemberId,
    /// Net position summed over every scope.
    pub net_balance: Decimal,
    pub scopes: Vec<String>,
    pub activity: Vec<ActivityEntry>,
}

/// Feed entries for `member` from a scope they belong to: every expense,
/// plus the settlements they paid or received.
pub(crate) fn entries_for(scope: &Scope, member: &MemberId) -> Vec<ActivityEntry> {
    let scope_name = scope.name();
    scope
        .log()
        .iter()
        .filter(|tx| !tx.is_settlement() || tx.involves(member))
        .map(|tx| {
            let (kind, counterparty, description) = match tx.kind() {
                TransactionKind::Expense(e) => {
                    (ActivityKind::Expense, None, e.description.clone())
                }
                TransactionKind::Settlement(s) => (
                    ActivityKind::Settlement,
                    Some(s.receiver.clone()),
                    s.note.clone().unwrap_or_else(|| "Settle up".to_string()),
                ),
            };
            ActivityEntry {
                transaction_id: tx.id(),
                kind,
                scope_id: scope.id(),
                scope_name: scope_name.clone(),
                who: tx.payer().clone(),
                counterparty,
                description,
                amount: tx.amount(),
                effect: tx
                    .deltas()
                    .into_iter()
                    .filter(|(m, _)| *m == member)
                    .map(|(_, d)| d)
                    .sum(),
                date: tx.date(),
                recorded_at: tx.recorded_at(),
            }
        })
        .collect()
}

/// Newest first by business date, then by record time; keep `limit`.
pub(crate) fn newest_first(mut entries: Vec<ActivityEntry>, limit: usize) -> Vec<ActivityEntry> {
    entries.sort_by_key(|e| (Reverse(e.date), Reverse(e.recorded_at)));
    entries.truncate(limit);
    entries
}
