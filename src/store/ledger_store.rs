use crate::config::LedgerConfig;
use crate::core::balance::BalanceSheet;
use crate::core::error::{LedgerError, MemberRole, Result};
use crate::core::member::{Member, MemberId};
use crate::core::scope::{Scope, ScopeId, ScopeKind, ScopeSnapshot};
use crate::core::transaction::{ExpenseRequest, SettlementRequest, TransactionLog};
use crate::engine::pairwise::PairwiseBalance;
use crate::engine::plan::SettlementPlan;
use crate::store::activity::{self, ActivityEntry, Dashboard, SettleUpEntry};
use log::{info, warn};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

type ScopeHandle = Arc<RwLock<Scope>>;

#[derive(Default)]
struct Registry {
    scopes: HashMap<ScopeId, ScopeHandle>,
    /// Friend pairs keyed by their member ids in sorted order.
    pairs: HashMap<(MemberId, MemberId), ScopeId>,
}

/// Thread-safe home of every member and scope.
///
/// Each scope sits behind its own lock: writers to one scope are
/// serialized, readers see a complete log, and scopes never block each
/// other. Locks are always taken in the order members → registry →
/// scope.
///
/// # Examples
///
/// ```
/// use split_ledger::prelude::*;
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let store = LedgerStore::new(LedgerConfig::default());
/// store.register_member(Member::new("emma", "Emma")).unwrap();
/// store.register_member(Member::new("liam", "Liam")).unwrap();
///
/// let group = store
///     .create_group("Lunch", &[MemberId::new("emma"), MemberId::new("liam")])
///     .unwrap();
/// let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
/// let snapshot = store
///     .record_expense(
///         group,
///         ExpenseRequest::equal("emma", dec!(24), vec![MemberId::new("emma"), MemberId::new("liam")], date),
///         None,
///     )
///     .unwrap();
///
/// assert_eq!(snapshot.balances.position(&MemberId::new("liam")), dec!(-12));
/// ```
pub struct LedgerStore {
    config: LedgerConfig,
    members: RwLock<HashMap<MemberId, Member>>,
    registry: RwLock<Registry>,
}

impl LedgerStore {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            members: RwLock::new(HashMap::new()),
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // --- Members ---

    pub fn register_member(&self, member: Member) -> Result<()> {
        if member.name().trim().is_empty() {
            return Err(LedgerError::InvalidName);
        }
        let mut members = self.members.write();
        if members.contains_key(member.id()) {
            return Err(LedgerError::DuplicateMember {
                member: member.id().clone(),
            });
        }
        info!("registered member {}", member.id());
        members.insert(member.id().clone(), member);
        Ok(())
    }

    pub fn member(&self, id: &MemberId) -> Option<Member> {
        self.members.read().get(id).cloned()
    }

    /// Change a member's display name everywhere they appear.
    pub fn rename_member(&self, id: &MemberId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidName);
        }
        let mut members = self.members.write();
        let member = members.get_mut(id).ok_or_else(|| LedgerError::UnknownMember {
            member: id.clone(),
            role: MemberRole::Member,
        })?;
        member.rename(name);

        let handles: Vec<ScopeHandle> = self.registry.read().scopes.values().cloned().collect();
        for handle in handles {
            handle.write().rename_member(id, name);
        }
        Ok(())
    }

    fn resolve(&self, ids: &[MemberId]) -> Result<Vec<Member>> {
        let members = self.members.read();
        ids.iter()
            .map(|id| {
                members
                    .get(id)
                    .cloned()
                    .ok_or_else(|| LedgerError::UnknownMember {
                        member: id.clone(),
                        role: MemberRole::Member,
                    })
            })
            .collect()
    }

    // --- Scopes ---

    /// Create a group; names are unique across the store.
    pub fn create_group(&self, name: &str, members: &[MemberId]) -> Result<ScopeId> {
        let name = name.trim();
        let resolved = self.resolve(members)?;

        let mut registry = self.registry.write();
        let taken = registry.scopes.values().any(|h| {
            matches!(h.read().kind(), ScopeKind::Group { name: existing } if existing == name)
        });
        if taken {
            warn!("rejected group '{}': name already exists", name);
            return Err(LedgerError::DuplicateGroupName {
                name: name.to_string(),
            });
        }

        let scope = Scope::group(name, self.config.default_currency.clone(), resolved)?;
        let id = scope.id();
        registry.scopes.insert(id, Arc::new(RwLock::new(scope)));
        info!("created group '{}' ({})", name, id);
        Ok(id)
    }

    /// Return the friend-pair scope for `a` and `b`, creating it on first use.
    pub fn open_friend_pair(&self, a: &MemberId, b: &MemberId) -> Result<ScopeId> {
        if a == b {
            return Err(LedgerError::FriendPairMembership);
        }
        let mut resolved = self.resolve(&[a.clone(), b.clone()])?;
        let key = pair_key(a, b);

        let mut registry = self.registry.write();
        if let Some(id) = registry.pairs.get(&key) {
            return Ok(*id);
        }
        let second = resolved.pop().ok_or(LedgerError::FriendPairMembership)?;
        let first = resolved.pop().ok_or(LedgerError::FriendPairMembership)?;
        let scope = Scope::friend_pair(first, second, self.config.default_currency.clone())?;
        let id = scope.id();
        registry.scopes.insert(id, Arc::new(RwLock::new(scope)));
        registry.pairs.insert(key, id);
        info!("opened friend pair {} / {} ({})", a, b, id);
        Ok(id)
    }

    pub fn add_group_member(&self, scope: ScopeId, member: &MemberId) -> Result<ScopeSnapshot> {
        let mut resolved = self.resolve(std::slice::from_ref(member))?;
        let handle = self.handle(scope)?;
        let mut guard = handle.write();
        if let Some(m) = resolved.pop() {
            guard.add_member(m)?;
        }
        Ok(guard.snapshot())
    }

    pub fn delete_scope(&self, scope: ScopeId) -> Result<()> {
        let mut registry = self.registry.write();
        if registry.scopes.remove(&scope).is_none() {
            return Err(LedgerError::ScopeNotFound(scope));
        }
        registry.pairs.retain(|_, id| *id != scope);
        info!("deleted scope {}", scope);
        Ok(())
    }

    pub fn scope_count(&self) -> usize {
        self.registry.read().scopes.len()
    }

    fn handle(&self, scope: ScopeId) -> Result<ScopeHandle> {
        self.registry
            .read()
            .scopes
            .get(&scope)
            .cloned()
            .ok_or(LedgerError::ScopeNotFound(scope))
    }

    /// Handles of every scope `member` belongs to.
    fn handles_for(&self, member: &MemberId) -> Vec<ScopeHandle> {
        self.registry
            .read()
            .scopes
            .values()
            .filter(|h| h.read().is_member(member))
            .cloned()
            .collect()
    }

    // --- Writes ---

    /// Record an expense and return the refreshed scope.
    ///
    /// With `expected_version` set, the write only goes through if no
    /// other transaction was recorded since the caller's snapshot.
    pub fn record_expense(
        &self,
        scope: ScopeId,
        request: ExpenseRequest,
        expected_version: Option<u64>,
    ) -> Result<ScopeSnapshot> {
        let handle = self.handle(scope)?;
        let mut guard = handle.write();
        check_version(&guard, expected_version)?;
        let policy = self.config.split_policy(guard.currency());
        guard.record_expense(request, &policy).map_err(|e| {
            warn!("scope {}: expense rejected: {}", scope, e);
            e
        })?;
        Ok(guard.snapshot())
    }

    /// Record a settlement and return the refreshed scope.
    pub fn record_settlement(
        &self,
        scope: ScopeId,
        request: SettlementRequest,
        expected_version: Option<u64>,
    ) -> Result<ScopeSnapshot> {
        let handle = self.handle(scope)?;
        let mut guard = handle.write();
        check_version(&guard, expected_version)?;
        guard.record_settlement(request).map_err(|e| {
            warn!("scope {}: settlement rejected: {}", scope, e);
            e
        })?;
        Ok(guard.snapshot())
    }

    // --- Reads ---

    pub fn snapshot(&self, scope: ScopeId) -> Result<ScopeSnapshot> {
        Ok(self.handle(scope)?.read().snapshot())
    }

    pub fn compute_balances(&self, scope: ScopeId) -> Result<BalanceSheet> {
        Ok(self.handle(scope)?.read().compute_balances())
    }

    pub fn settlement_plan(&self, scope: ScopeId) -> Result<SettlementPlan> {
        let balances = self.compute_balances(scope)?;
        Ok(SettlementPlan::from_balances(&balances))
    }

    /// What `a` owes `b` in their friend pair; zero if they have none.
    pub fn friend_balance(&self, a: &MemberId, b: &MemberId) -> Result<PairwiseBalance> {
        let scope = self.registry.read().pairs.get(&pair_key(a, b)).copied();
        match scope {
            Some(id) => {
                let handle = self.handle(id)?;
                let guard = handle.read();
                Ok(PairwiseBalance::between(guard.log(), a, b))
            }
            None => Ok(PairwiseBalance::between(&TransactionLog::new(), a, b)),
        }
    }

    /// Recent expenses and settlements involving `member`, newest first.
    pub fn activity_for(&self, member: &MemberId) -> Result<Vec<ActivityEntry>> {
        self.require_registered(member)?;
        let entries = self
            .handles_for(member)
            .iter()
            .flat_map(|h| activity::entries_for(&h.read(), member))
            .collect();
        Ok(activity::newest_first(entries, self.config.activity_limit))
    }

    /// One entry per scope where `member` is not square.
    pub fn settle_up(&self, member: &MemberId) -> Result<Vec<SettleUpEntry>> {
        self.require_registered(member)?;
        let mut out = Vec::new();
        for handle in self.handles_for(member) {
            let scope = handle.read();
            let amount = scope.compute_balances().position(member);
            if amount.is_zero() {
                continue;
            }
            let name = match scope.counterpart(member) {
                Some(friend) => friend.name().to_string(),
                None => scope.name(),
            };
            out.push(SettleUpEntry {
                scope_id: scope.id(),
                kind: scope.category(),
                name,
                amount,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    pub fn dashboard(&self, member: &MemberId) -> Result<Dashboard> {
        self.require_registered(member)?;
        let mut net_balance = Decimal::ZERO;
        let mut scopes = Vec::new();
        let mut entries = Vec::new();
        // balance and feed come from the same guard, so they agree per scope
        for handle in self.handles_for(member) {
            let scope = handle.read();
            net_balance += scope.compute_balances().position(member);
            scopes.push(scope.name());
            entries.extend(activity::entries_for(&scope, member));
        }
        scopes.sort();
        Ok(Dashboard {
            member: member.clone(),
            net_balance,
            scopes,
            activity: activity::newest_first(entries, self.config.activity_limit),
        })
    }

    fn require_registered(&self, member: &MemberId) -> Result<()> {
        if self.members.read().contains_key(member) {
            Ok(())
        } else {
            Err(LedgerError::UnknownMember {
                member: member.clone(),
                role: MemberRole::Member,
            })
        }
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

fn pair_key(a: &MemberId, b: &MemberId) -> (MemberId, MemberId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

fn check_version(scope: &Scope, expected: Option<u64>) -> Result<()> {
    match expected {
        Some(expected) if expected != scope.version() => {
            warn!(
                "scope {}: stale write at version {}, current {}",
                scope.id(),
                expected,
                scope.version()
            );
            Err(LedgerError::Conflict {
                scope: scope.id(),
                expected,
                actual: scope.version(),
            })
        }
        _ => Ok(()),
    }
}
