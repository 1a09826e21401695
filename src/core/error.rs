use crate::core::member::MemberId;
use crate::core::scope::ScopeId;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// The part a member plays in a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Payer,
    Participant,
    Receiver,
    Member,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberRole::Payer => "payer",
            MemberRole::Participant => "participant",
            MemberRole::Receiver => "receiver",
            MemberRole::Member => "member",
        };
        f.write_str(s)
    }
}

/// Validation and lookup failures raised by the ledger.
///
/// Every variant is recoverable: the caller can correct the request
/// and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{field} must be positive, got {amount}")]
    InvalidAmount { field: &'static str, amount: Decimal },

    #[error("{field} {amount} is outside the range the ledger can hold exactly")]
    AmountOutOfRange { field: &'static str, amount: Decimal },

    #[error("{role} {member} is not a member of this scope")]
    UnknownMember { member: MemberId, role: MemberRole },

    #[error("shares sum to {actual} but the expense amount is {expected} (tolerance {tolerance})")]
    ShareMismatch {
        expected: Decimal,
        actual: Decimal,
        tolerance: Decimal,
    },

    #[error("share list does not match participants at {member}")]
    ShareCoverage { member: MemberId },

    #[error("an expense needs at least one participant")]
    NoParticipants,

    #[error("participant {member} is listed more than once")]
    DuplicateParticipant { member: MemberId },

    #[error("{member} cannot settle with themself")]
    SelfSettlement { member: MemberId },

    #[error("scope {0} not found")]
    ScopeNotFound(ScopeId),

    #[error("scope {scope} is at version {actual}, expected {expected}; refresh and retry")]
    Conflict {
        scope: ScopeId,
        expected: u64,
        actual: u64,
    },

    #[error("{member} is already registered")]
    DuplicateMember { member: MemberId },

    #[error("group name '{name}' already exists")]
    DuplicateGroupName { name: String },

    #[error("name must not be blank")]
    InvalidName,

    #[error("a friend pair has exactly two distinct, fixed members")]
    FriendPairMembership,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
