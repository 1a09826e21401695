use crate::config::MAX_SPLIT_SCALE;
use crate::core::error::{LedgerError, Result};
use crate::core::member::MemberId;
use crate::core::scope::ScopeId;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Most money a single scope may ever record, summed over every expense
/// and settlement.
///
/// Every balance, share and running sum in a scope is bounded by this
/// volume. With at most [`MAX_SPLIT_SCALE`] decimal places they all stay
/// exactly representable, so the zero-sum fold can never overflow or round.
pub const MAX_SCOPE_VOLUME: Decimal = dec!(1_000_000_000_000_000);

/// Reject a non-positive amount or one the ledger cannot hold exactly.
pub(crate) fn check_amount(field: &'static str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount { field, amount });
    }
    check_range(field, amount)
}

/// Reject an amount above the scope volume or finer than the split scale.
pub(crate) fn check_range(field: &'static str, amount: Decimal) -> Result<()> {
    if amount.abs() > MAX_SCOPE_VOLUME || amount.normalize().scale() > MAX_SPLIT_SCALE {
        return Err(LedgerError::AmountOutOfRange { field, amount });
    }
    Ok(())
}

/// Unique identifier for a recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One participant's portion of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub member: MemberId,
    pub amount: Decimal,
}

impl Share {
    pub fn new(member: impl Into<MemberId>, amount: Decimal) -> Self {
        Self {
            member: member.into(),
            amount,
        }
    }
}

/// How an expense is divided among its participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "shares", rename_all = "snake_case")]
pub enum ShareRule {
    /// Divide the amount evenly.
    #[default]
    Equal,
    /// Explicit amount per participant.
    Exact(Vec<Share>),
}

/// An expense after its shares have been resolved.
///
/// `shares` always sums exactly to `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub payer: MemberId,
    pub amount: Decimal,
    pub description: String,
    pub shares: Vec<Share>,
}

impl Expense {
    /// The share owed by `member`, zero if they did not participate.
    pub fn share_of(&self, member: &MemberId) -> Decimal {
        self.shares
            .iter()
            .filter(|s| &s.member == member)
            .map(|s| s.amount)
            .sum()
    }
}

/// A direct transfer from `payer` to `receiver`. Never re-split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub payer: MemberId,
    pub receiver: MemberId,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    Expense(Expense),
    Settlement(Settlement),
}

/// A recorded ledger entry. Immutable once appended to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    scope: ScopeId,
    /// Business date chosen by the submitter.
    date: NaiveDate,
    /// When the ledger accepted the entry.
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    kind: TransactionKind,
}

impl Transaction {
    pub(crate) fn new(scope: ScopeId, date: NaiveDate, kind: TransactionKind) -> Self {
        Self {
            id: TransactionId::new(),
            scope,
            date,
            recorded_at: Utc::now(),
            kind,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn kind(&self) -> &TransactionKind {
        &self.kind
    }

    pub fn amount(&self) -> Decimal {
        match &self.kind {
            TransactionKind::Expense(e) => e.amount,
            TransactionKind::Settlement(s) => s.amount,
        }
    }

    /// Who handed over the money.
    pub fn payer(&self) -> &MemberId {
        match &self.kind {
            TransactionKind::Expense(e) => &e.payer,
            TransactionKind::Settlement(s) => &s.payer,
        }
    }

    pub fn is_settlement(&self) -> bool {
        matches!(self.kind, TransactionKind::Settlement(_))
    }

    /// Whether `member` pays, receives or shares in this transaction.
    pub fn involves(&self, member: &MemberId) -> bool {
        match &self.kind {
            TransactionKind::Expense(e) => {
                &e.payer == member || e.shares.iter().any(|s| &s.member == member)
            }
            TransactionKind::Settlement(s) => &s.payer == member || &s.receiver == member,
        }
    }

    /// Signed balance changes this transaction causes.
    ///
    /// The deltas of a single transaction always sum to zero.
    pub fn deltas(&self) -> Vec<(&MemberId, Decimal)> {
        match &self.kind {
            TransactionKind::Expense(e) => {
                let mut out = Vec::with_capacity(e.shares.len() + 1);
                let mut credited = Decimal::ZERO;
                for share in &e.shares {
                    out.push((&share.member, -share.amount));
                    credited += share.amount;
                }
                out.push((&e.payer, credited));
                out
            }
            TransactionKind::Settlement(s) => {
                vec![(&s.payer, s.amount), (&s.receiver, -s.amount)]
            }
        }
    }
}

/// Append-only, insertion-ordered list of a scope's transactions.
///
/// The log also tracks its gross volume and refuses any transaction
/// that would push it past [`MAX_SCOPE_VOLUME`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Transaction>", into = "Vec<Transaction>")]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    volume: Decimal,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, transaction: Transaction) -> Result<&Transaction> {
        let amount = transaction.amount();
        check_amount("amount", amount)?;
        self.volume = self
            .volume
            .checked_add(amount)
            .filter(|v| *v <= MAX_SCOPE_VOLUME)
            .ok_or(LedgerError::AmountOutOfRange {
                field: "amount",
                amount,
            })?;
        self.entries.push(transaction);
        // just pushed, never empty
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Gross amount moved by every transaction so far.
    pub fn volume(&self) -> Decimal {
        self.volume
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every expense amount; settlements are not spending.
    pub fn expense_total(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|t| !t.is_settlement())
            .map(|t| t.amount())
            .sum()
    }

    pub fn expense_count(&self) -> usize {
        self.entries.iter().filter(|t| !t.is_settlement()).count()
    }
}

impl TryFrom<Vec<Transaction>> for TransactionLog {
    type Error = LedgerError;

    fn try_from(entries: Vec<Transaction>) -> Result<Self> {
        let mut log = Self::new();
        for transaction in entries {
            log.append(transaction)?;
        }
        Ok(log)
    }
}

impl From<TransactionLog> for Vec<Transaction> {
    fn from(log: TransactionLog) -> Self {
        log.entries
    }
}

/// Input for recording an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub payer: MemberId,
    pub amount: Decimal,
    pub participants: Vec<MemberId>,
    #[serde(default)]
    pub share_rule: ShareRule,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
}

impl ExpenseRequest {
    /// An expense split equally across `participants`.
    pub fn equal(
        payer: impl Into<MemberId>,
        amount: Decimal,
        participants: Vec<MemberId>,
        date: NaiveDate,
    ) -> Self {
        Self {
            payer: payer.into(),
            amount,
            participants,
            share_rule: ShareRule::Equal,
            description: String::new(),
            date,
        }
    }

    /// An expense with explicit shares; the participants are the share holders.
    pub fn exact(
        payer: impl Into<MemberId>,
        amount: Decimal,
        shares: Vec<Share>,
        date: NaiveDate,
    ) -> Self {
        Self {
            payer: payer.into(),
            amount,
            participants: shares.iter().map(|s| s.member.clone()).collect(),
            share_rule: ShareRule::Exact(shares),
            description: String::new(),
            date,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Input for recording a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub payer: MemberId,
    pub receiver: MemberId,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
}

impl SettlementRequest {
    pub fn new(
        payer: impl Into<MemberId>,
        receiver: impl Into<MemberId>,
        amount: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            payer: payer.into(),
            receiver: receiver.into(),
            amount,
            date,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
