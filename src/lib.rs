//! # split-ledger
//!
//! Ledger and balance reconciliation engine for splitting expenses.
//!
//! Groups and friend pairs each keep an append-only log of expenses and
//! settlements. Net balances are always derived from that log and always
//! sum to zero within a scope.
//!
//! ## Architecture
//!
//! - **core**: Foundational types: members, currencies, transactions, balances, scopes
//! - **engine**: Share resolution, balance fold, pairwise balances, settle-up plans
//! - **store**: Thread-safe registry of members and scopes with the derived views
//! - **simulation**: Random activity generation for testing and benchmarks

pub mod config;
pub mod core;
pub mod engine;
pub mod simulation;
pub mod store;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{LedgerConfig, SplitPolicy};
    pub use crate::core::balance::BalanceSheet;
    pub use crate::core::currency::CurrencyCode;
    pub use crate::core::error::{LedgerError, MemberRole};
    pub use crate::core::member::{Member, MemberId};
    pub use crate::core::scope::{Scope, ScopeCategory, ScopeId, ScopeSnapshot};
    pub use crate::core::transaction::{
        ExpenseRequest, Settlement, SettlementRequest, Share, ShareRule, Transaction,
        TransactionKind,
    };
    pub use crate::engine::pairwise::PairwiseBalance;
    pub use crate::engine::plan::{SettlementPlan, SuggestedTransfer};
    pub use crate::engine::split::LedgerEngine;
    pub use crate::store::ledger_store::LedgerStore;
}
