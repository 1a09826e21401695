use crate::config::SplitPolicy;
use crate::core::balance::BalanceSheet;
use crate::core::currency::CurrencyCode;
use crate::core::error::{LedgerError, MemberRole, Result};
use crate::core::member::{Member, MemberId};
use crate::core::transaction::{
    check_amount, Expense, ExpenseRequest, Settlement, SettlementRequest, Transaction,
    TransactionKind, TransactionLog,
};
use crate::engine::split::LedgerEngine;
use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a group or friend pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(Uuid);

impl ScopeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeKind {
    Group { name: String },
    /// Direct one-to-one balances between two friends.
    FriendPair,
}

/// Coarse scope classification shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeCategory {
    Friend,
    Group,
}

/// A bounded context whose balances always sum to zero.
///
/// A scope owns its member list and an append-only transaction log.
/// Balances are never stored; [`Scope::compute_balances`] derives them
/// from the log on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    id: ScopeId,
    kind: ScopeKind,
    currency: CurrencyCode,
    members: Vec<Member>,
    log: TransactionLog,
    created_at: DateTime<Utc>,
}

impl Scope {
    /// Create a named group.
    pub fn group(
        name: impl Into<String>,
        currency: CurrencyCode,
        members: Vec<Member>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidName);
        }
        let mut scope = Self::empty(ScopeKind::Group { name }, currency);
        for member in members {
            scope.insert_member(member)?;
        }
        Ok(scope)
    }

    /// Create the scope holding direct balances between two friends.
    pub fn friend_pair(a: Member, b: Member, currency: CurrencyCode) -> Result<Self> {
        if a.id() == b.id() {
            return Err(LedgerError::FriendPairMembership);
        }
        let mut scope = Self::empty(ScopeKind::FriendPair, currency);
        scope.members = vec![a, b];
        Ok(scope)
    }

    fn empty(kind: ScopeKind, currency: CurrencyCode) -> Self {
        Self {
            id: ScopeId::new(),
            kind,
            currency,
            members: Vec::new(),
            log: TransactionLog::new(),
            created_at: Utc::now(),
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    pub fn is_friend_pair(&self) -> bool {
        matches!(self.kind, ScopeKind::FriendPair)
    }

    pub fn category(&self) -> ScopeCategory {
        match self.kind {
            ScopeKind::Group { .. } => ScopeCategory::Group,
            ScopeKind::FriendPair => ScopeCategory::Friend,
        }
    }

    /// Group name, or both friends' names for a friend pair.
    pub fn name(&self) -> String {
        match &self.kind {
            ScopeKind::Group { name } => name.clone(),
            ScopeKind::FriendPair => self
                .members
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
                .join(" & "),
        }
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|m| m.id().clone()).collect()
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id() == id)
    }

    pub fn is_member(&self, id: &MemberId) -> bool {
        self.member(id).is_some()
    }

    /// For a friend pair, the member on the other side of `id`.
    pub fn counterpart(&self, id: &MemberId) -> Option<&Member> {
        if !self.is_friend_pair() || !self.is_member(id) {
            return None;
        }
        self.members.iter().find(|m| m.id() != id)
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Number of transactions recorded so far.
    pub fn version(&self) -> u64 {
        self.log.len() as u64
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // --- Membership ---

    /// Add a member to a group.
    pub fn add_member(&mut self, member: Member) -> Result<()> {
        if self.is_friend_pair() {
            return Err(LedgerError::FriendPairMembership);
        }
        self.insert_member(member)
    }

    fn insert_member(&mut self, member: Member) -> Result<()> {
        if self.is_member(member.id()) {
            return Err(LedgerError::DuplicateMember {
                member: member.id().clone(),
            });
        }
        self.members.push(member);
        Ok(())
    }

    /// Update a member's display name; returns false if they are not here.
    pub fn rename_member(&mut self, id: &MemberId, name: &str) -> bool {
        match self.members.iter_mut().find(|m| m.id() == id) {
            Some(member) => {
                member.rename(name);
                true
            }
            None => false,
        }
    }

    fn require_member(&self, id: &MemberId, role: MemberRole) -> Result<()> {
        if self.is_member(id) {
            Ok(())
        } else {
            Err(LedgerError::UnknownMember {
                member: id.clone(),
                role,
            })
        }
    }

    // --- Ledger operations ---

    /// Validate and append an expense.
    pub fn record_expense(
        &mut self,
        request: ExpenseRequest,
        policy: &SplitPolicy,
    ) -> Result<&Transaction> {
        check_amount("amount", request.amount)?;
        self.require_member(&request.payer, MemberRole::Payer)?;
        for p in &request.participants {
            self.require_member(p, MemberRole::Participant)?;
        }

        let shares = LedgerEngine::resolve_shares(
            &request.payer,
            request.amount,
            &request.participants,
            &request.share_rule,
            policy,
        )?;

        let tx = Transaction::new(
            self.id,
            request.date,
            TransactionKind::Expense(Expense {
                payer: request.payer,
                amount: request.amount,
                description: request.description,
                shares,
            }),
        );
        let tx = self.log.append(tx)?;
        debug!(
            "scope {}: expense {} of {} paid by {}",
            self.id,
            tx.id(),
            tx.amount(),
            tx.payer()
        );
        Ok(tx)
    }

    /// Validate and append a settlement between two members.
    pub fn record_settlement(&mut self, request: SettlementRequest) -> Result<&Transaction> {
        check_amount("amount", request.amount)?;
        if request.payer == request.receiver {
            return Err(LedgerError::SelfSettlement {
                member: request.payer,
            });
        }
        self.require_member(&request.payer, MemberRole::Payer)?;
        self.require_member(&request.receiver, MemberRole::Receiver)?;

        let tx = Transaction::new(
            self.id,
            request.date,
            TransactionKind::Settlement(Settlement {
                payer: request.payer,
                receiver: request.receiver,
                amount: request.amount,
                note: request.note,
            }),
        );
        let tx = self.log.append(tx)?;
        debug!(
            "scope {}: settlement {} of {} from {}",
            self.id,
            tx.id(),
            tx.amount(),
            tx.payer()
        );
        Ok(tx)
    }

    /// Net balance of every member, derived from the log.
    pub fn compute_balances(&self) -> BalanceSheet {
        LedgerEngine::compute_balances(self.members.iter().map(|m| m.id()), &self.log)
    }

    /// Sum of all expenses in the scope.
    pub fn equal_split_total(&self) -> Decimal {
        self.log.expense_total()
    }

    /// What each member would pay if all spending were shared equally.
    pub fn per_head_amount(&self) -> Decimal {
        LedgerEngine::per_head(&self.log, self.members.len())
    }

    /// A consistent, serializable view of the scope.
    pub fn snapshot(&self) -> ScopeSnapshot {
        let balances = self.compute_balances();
        ScopeSnapshot {
            id: self.id,
            name: self.name(),
            kind: self.category(),
            currency: self.currency.clone(),
            members: self.members.clone(),
            transactions: self.log.entries().to_vec(),
            display_balances: balances.rounded(&self.currency),
            balances,
            total_spent: self.equal_split_total(),
            per_head: self.per_head_amount(),
            version: self.version(),
        }
    }
}

/// Everything a client needs to render a scope: members, the log and
/// the authoritative balances computed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    pub id: ScopeId,
    pub name: String,
    pub kind: ScopeCategory,
    pub currency: CurrencyCode,
    pub members: Vec<Member>,
    pub transactions: Vec<Transaction>,
    pub balances: BalanceSheet,
    /// Balances rounded to the currency's minor unit.
    pub display_balances: BTreeMap<MemberId, Decimal>,
    pub total_spent: Decimal,
    pub per_head: Decimal,
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::MAX_SCOPE_VOLUME;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 20).unwrap()
    }

    fn bali() -> Scope {
        Scope::group(
            "Trip to Bali",
            CurrencyCode::new("USD"),
            vec![
                Member::new("emma", "Emma"),
                Member::new("liam", "Liam"),
                Member::new("olivia", "Olivia"),
                Member::new("william", "William"),
            ],
        )
        .unwrap()
    }

    fn id(s: &str) -> MemberId {
        MemberId::new(s)
    }

    #[test]
    fn test_scenario_dinner_then_settlement() {
        let mut scope = bali();
        let policy = SplitPolicy::default();
        let everyone = scope.member_ids();

        scope
            .record_expense(
                ExpenseRequest::equal("emma", dec!(42.50), everyone, date())
                    .with_description("Dinner"),
                &policy,
            )
            .unwrap();
        let b = scope.compute_balances();
        assert_eq!(b.position(&id("emma")), dec!(31.875));
        assert_eq!(b.position(&id("liam")), dec!(-10.625));
        assert_eq!(b.position(&id("olivia")), dec!(-10.625));
        assert_eq!(b.position(&id("william")), dec!(-10.625));
        assert_eq!(b.sum(), Decimal::ZERO);

        scope
            .record_settlement(SettlementRequest::new("liam", "emma", dec!(10.625), date()))
            .unwrap();
        let b = scope.compute_balances();
        assert_eq!(b.position(&id("emma")), dec!(21.25));
        assert_eq!(b.position(&id("liam")), Decimal::ZERO);
        assert_eq!(b.position(&id("olivia")), dec!(-10.625));
        assert_eq!(b.position(&id("william")), dec!(-10.625));
        assert_eq!(b.sum(), Decimal::ZERO);
    }

    #[test]
    fn test_payer_outside_participants() {
        let mut scope = bali();
        scope
            .record_expense(
                ExpenseRequest::equal("emma", dec!(30), vec![id("liam"), id("olivia")], date()),
                &SplitPolicy::default(),
            )
            .unwrap();
        let b = scope.compute_balances();
        assert_eq!(b.position(&id("emma")), dec!(30));
        assert_eq!(b.position(&id("liam")), dec!(-15));
        assert_eq!(b.position(&id("william")), Decimal::ZERO);
    }

    #[test]
    fn test_negative_expense_rejected() {
        let mut scope = bali();
        let err = scope
            .record_expense(
                ExpenseRequest::equal("emma", dec!(-5), scope.member_ids(), date()),
                &SplitPolicy::default(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(scope.version(), 0);
    }

    #[test]
    fn test_oversized_amounts_rejected_and_scope_stays_usable() {
        let mut scope = bali();
        let policy = SplitPolicy::default();
        for _ in 0..2 {
            let err = scope
                .record_expense(
                    ExpenseRequest::equal("emma", Decimal::MAX, vec![id("liam")], date()),
                    &policy,
                )
                .unwrap_err();
            assert!(matches!(
                err,
                LedgerError::AmountOutOfRange { field: "amount", .. }
            ));
        }
        let err = scope
            .record_settlement(SettlementRequest::new("liam", "emma", Decimal::MAX, date()))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountOutOfRange { .. }));

        // two in-range writes whose combined volume is too large
        let half = MAX_SCOPE_VOLUME / dec!(2) + dec!(1);
        scope
            .record_expense(ExpenseRequest::equal("emma", half, vec![id("liam")], date()), &policy)
            .unwrap();
        let err = scope
            .record_expense(ExpenseRequest::equal("liam", half, vec![id("emma")], date()), &policy)
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountOutOfRange { .. }));

        assert_eq!(scope.version(), 1);
        let b = scope.compute_balances();
        assert_eq!(b.position(&id("emma")), half);
        assert!(b.is_balanced());
        assert_eq!(scope.snapshot().version, 1);
    }

    #[test]
    fn test_unknown_payer_and_participant() {
        let mut scope = bali();
        let policy = SplitPolicy::default();
        let err = scope
            .record_expense(
                ExpenseRequest::equal("zoe", dec!(5), vec![id("emma")], date()),
                &policy,
            )
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownMember {
                member: id("zoe"),
                role: MemberRole::Payer
            }
        );

        let err = scope
            .record_expense(
                ExpenseRequest::equal("emma", dec!(5), vec![id("zoe")], date()),
                &policy,
            )
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownMember {
                member: id("zoe"),
                role: MemberRole::Participant
            }
        );
    }

    #[test]
    fn test_self_settlement_rejected() {
        let mut scope = bali();
        let err = scope
            .record_settlement(SettlementRequest::new("emma", "emma", dec!(10), date()))
            .unwrap_err();
        assert_eq!(err, LedgerError::SelfSettlement { member: id("emma") });
    }

    #[test]
    fn test_settlement_unknown_receiver() {
        let mut scope = bali();
        let err = scope
            .record_settlement(SettlementRequest::new("emma", "zoe", dec!(10), date()))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownMember {
                member: id("zoe"),
                role: MemberRole::Receiver
            }
        );
    }

    #[test]
    fn test_settlement_only_touches_two_members() {
        let mut scope = bali();
        let policy = SplitPolicy::default();
        scope
            .record_expense(
                ExpenseRequest::equal("olivia", dec!(99.99), scope.member_ids(), date()),
                &policy,
            )
            .unwrap();
        let before = scope.compute_balances();
        scope
            .record_settlement(SettlementRequest::new("william", "liam", dec!(7), date()))
            .unwrap();
        let after = scope.compute_balances();

        assert_eq!(after.position(&id("william")) - before.position(&id("william")), dec!(7));
        assert_eq!(after.position(&id("liam")) - before.position(&id("liam")), dec!(-7));
        assert_eq!(after.position(&id("emma")), before.position(&id("emma")));
        assert_eq!(after.position(&id("olivia")), before.position(&id("olivia")));
    }

    #[test]
    fn test_totals_and_per_head() {
        let mut scope = bali();
        let policy = SplitPolicy::default();
        assert_eq!(scope.per_head_amount(), Decimal::ZERO);

        scope
            .record_expense(ExpenseRequest::equal("emma", dec!(100), scope.member_ids(), date()), &policy)
            .unwrap();
        scope
            .record_expense(
                ExpenseRequest::equal("liam", dec!(20), vec![id("emma")], date()),
                &policy,
            )
            .unwrap();
        scope
            .record_settlement(SettlementRequest::new("olivia", "emma", dec!(25), date()))
            .unwrap();

        assert_eq!(scope.equal_split_total(), dec!(120));
        assert_eq!(scope.per_head_amount(), dec!(30));
    }

    #[test]
    fn test_empty_group_per_head() {
        let scope = Scope::group("Empty", CurrencyCode::new("USD"), vec![]).unwrap();
        assert_eq!(scope.per_head_amount(), Decimal::ZERO);
        assert!(scope.compute_balances().is_empty());
    }

    #[test]
    fn test_group_validation() {
        assert_eq!(
            Scope::group("  ", CurrencyCode::new("USD"), vec![]).unwrap_err(),
            LedgerError::InvalidName
        );
        let err = Scope::group(
            "Dup",
            CurrencyCode::new("USD"),
            vec![Member::new("a", "A"), Member::new("a", "A again")],
        )
        .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateMember { member: id("a") });
    }

    #[test]
    fn test_friend_pair_is_closed() {
        let mut pair = Scope::friend_pair(
            Member::new("jacob", "Jacob"),
            Member::new("sophia", "Sophia"),
            CurrencyCode::new("USD"),
        )
        .unwrap();
        assert_eq!(pair.name(), "Jacob & Sophia");
        assert_eq!(
            pair.add_member(Member::new("x", "X")),
            Err(LedgerError::FriendPairMembership)
        );
        assert_eq!(pair.counterpart(&id("jacob")).map(|m| m.name()), Some("Sophia"));

        assert!(Scope::friend_pair(
            Member::new("a", "A"),
            Member::new("a", "A"),
            CurrencyCode::new("USD")
        )
        .is_err());
    }

    #[test]
    fn test_log_keeps_insertion_order() {
        let mut scope = bali();
        let policy = SplitPolicy::default();
        let first = scope
            .record_expense(ExpenseRequest::equal("emma", dec!(1), vec![id("liam")], date()), &policy)
            .unwrap()
            .id();
        let second = scope
            .record_settlement(SettlementRequest::new("liam", "emma", dec!(1), date()))
            .unwrap()
            .id();
        let ids: Vec<_> = scope.log().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(scope.version(), 2);
    }

    #[test]
    fn test_snapshot_contents() {
        let mut scope = bali();
        scope
            .record_expense(
                ExpenseRequest::equal("emma", dec!(42.50), scope.member_ids(), date()),
                &SplitPolicy::default(),
            )
            .unwrap();
        let snap = scope.snapshot();
        assert_eq!(snap.name, "Trip to Bali");
        assert_eq!(snap.members.len(), 4);
        assert_eq!(snap.transactions.len(), 1);
        assert_eq!(snap.display_balances[&id("emma")], dec!(31.88));
        assert_eq!(snap.total_spent, dec!(42.50));
        assert_eq!(snap.per_head, dec!(10.625));
        assert_eq!(snap.version, 1);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["kind"], "group");
        assert_eq!(json["transactions"][0]["type"], "expense");
    }
}
