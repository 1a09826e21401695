use crate::config::SplitPolicy;
use crate::core::balance::BalanceSheet;
use crate::core::error::{LedgerError, Result};
use crate::core::member::MemberId;
use crate::core::transaction::{check_amount, check_range, Share, ShareRule, TransactionLog};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;

/// The core ledger engine.
///
/// Stateless: share resolution and the balance fold operate on the
/// data they are handed. [`crate::core::scope::Scope`] wires them to a
/// member list and a log.
pub struct LedgerEngine;

impl LedgerEngine {
    /// Divide `amount` evenly across `participants`.
    ///
    /// Every participant receives `amount / n` truncated to the policy
    /// scale. The remainder is handed out one split unit at a time in
    /// participant order, and anything below one unit goes to the first
    /// participant, so the shares always sum to `amount` exactly.
    ///
    /// # Examples
    ///
    /// ```
    /// use split_ledger::config::SplitPolicy;
    /// use split_ledger::core::member::MemberId;
    /// use split_ledger::engine::split::LedgerEngine;
    /// use rust_decimal_macros::dec;
    ///
    /// let people = vec![MemberId::new("a"), MemberId::new("b"), MemberId::new("c")];
    /// let shares = LedgerEngine::split_equally(dec!(10), &people, &SplitPolicy::default());
    /// assert_eq!(shares[0].amount, dec!(3.3334));
    /// assert_eq!(shares[1].amount, dec!(3.3333));
    /// assert_eq!(shares.iter().map(|s| s.amount).sum::<rust_decimal::Decimal>(), dec!(10));
    /// ```
    pub fn split_equally(
        amount: Decimal,
        participants: &[MemberId],
        policy: &SplitPolicy,
    ) -> Vec<Share> {
        if participants.is_empty() {
            return Vec::new();
        }
        let n = Decimal::from(participants.len());
        let base = (amount / n).round_dp_with_strategy(policy.scale, RoundingStrategy::ToZero);
        let unit = policy.unit();

        let mut shares: Vec<Share> = participants
            .iter()
            .map(|m| Share::new(m.clone(), base))
            .collect();

        let mut remainder = amount - base * n;
        for share in shares.iter_mut() {
            if remainder < unit {
                break;
            }
            share.amount += unit;
            remainder -= unit;
        }
        // sub-unit residue only when amount is finer than the split scale
        shares[0].amount += remainder;
        shares
    }

    /// Validate a request's participants and turn its share rule into
    /// concrete shares summing exactly to `amount`.
    pub fn resolve_shares(
        payer: &MemberId,
        amount: Decimal,
        participants: &[MemberId],
        rule: &ShareRule,
        policy: &SplitPolicy,
    ) -> Result<Vec<Share>> {
        check_amount("amount", amount)?;
        if participants.is_empty() {
            return Err(LedgerError::NoParticipants);
        }
        let mut seen = HashSet::with_capacity(participants.len());
        for p in participants {
            if !seen.insert(p) {
                return Err(LedgerError::DuplicateParticipant { member: p.clone() });
            }
        }

        match rule {
            ShareRule::Equal => Ok(Self::split_equally(amount, participants, policy)),
            ShareRule::Exact(shares) => {
                Self::reconcile_exact(payer, amount, participants, shares, policy)
            }
        }
    }

    fn reconcile_exact(
        payer: &MemberId,
        amount: Decimal,
        participants: &[MemberId],
        shares: &[Share],
        policy: &SplitPolicy,
    ) -> Result<Vec<Share>> {
        let mut covered = HashSet::with_capacity(shares.len());
        for share in shares {
            if share.amount < Decimal::ZERO {
                return Err(LedgerError::InvalidAmount {
                    field: "share",
                    amount: share.amount,
                });
            }
            check_range("share", share.amount)?;
            if !participants.contains(&share.member) || !covered.insert(&share.member) {
                return Err(LedgerError::ShareCoverage {
                    member: share.member.clone(),
                });
            }
        }
        if let Some(missing) = participants.iter().find(|p| !covered.contains(p)) {
            return Err(LedgerError::ShareCoverage {
                member: missing.clone(),
            });
        }

        let actual = shares
            .iter()
            .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.amount))
            .ok_or(LedgerError::AmountOutOfRange {
                field: "share",
                amount,
            })?;
        let gap = amount - actual;
        if gap.abs() > policy.tolerance {
            return Err(LedgerError::ShareMismatch {
                expected: amount,
                actual,
                tolerance: policy.tolerance,
            });
        }

        let mut resolved = shares.to_vec();
        if !gap.is_zero() {
            let idx = resolved
                .iter()
                .position(|s| &s.member == payer)
                .unwrap_or(0);
            resolved[idx].amount += gap;
            if resolved[idx].amount < Decimal::ZERO {
                return Err(LedgerError::ShareMismatch {
                    expected: amount,
                    actual,
                    tolerance: policy.tolerance,
                });
            }
        }
        Ok(resolved)
    }

    /// Fold a log into per-member balances.
    ///
    /// Every member in `members` appears in the result, including those
    /// with no activity. The fold is a sum of per-transaction deltas, so
    /// the result does not depend on traversal order and always sums
    /// to zero.
    pub fn compute_balances<'a>(
        members: impl IntoIterator<Item = &'a MemberId>,
        log: &TransactionLog,
    ) -> BalanceSheet {
        let mut sheet = BalanceSheet::with_members(members);
        for tx in log.iter() {
            sheet.apply(tx);
        }
        sheet
    }

    /// Total spent in a log divided by `member_count`; zero when there is
    /// nothing to divide.
    pub fn per_head(log: &TransactionLog, member_count: usize) -> Decimal {
        let total = log.expense_total();
        if member_count == 0 || total.is_zero() {
            return Decimal::ZERO;
        }
        total / Decimal::from(member_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ids(names: &[&str]) -> Vec<MemberId> {
        names.iter().map(|n| MemberId::new(*n)).collect()
    }

    #[test]
    fn test_equal_split_exact_division() {
        let people = ids(&["emma", "liam", "olivia", "william"]);
        let shares = LedgerEngine::split_equally(dec!(42.50), &people, &SplitPolicy::default());
        assert!(shares.iter().all(|s| s.amount == dec!(10.625)));
    }

    #[test]
    fn test_equal_split_distributes_remainder_in_order() {
        let people = ids(&["a", "b", "c"]);
        let policy = SplitPolicy {
            scale: 2,
            tolerance: dec!(0.01),
        };
        let shares = LedgerEngine::split_equally(dec!(100), &people, &policy);
        assert_eq!(shares[0].amount, dec!(33.34));
        assert_eq!(shares[1].amount, dec!(33.33));
        assert_eq!(shares[2].amount, dec!(33.33));
    }

    #[test]
    fn test_equal_split_two_units_of_remainder() {
        let people = ids(&["a", "b", "c"]);
        let policy = SplitPolicy {
            scale: 2,
            tolerance: dec!(0.01),
        };
        let shares = LedgerEngine::split_equally(dec!(0.05), &people, &policy);
        let amounts: Vec<_> = shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![dec!(0.02), dec!(0.02), dec!(0.01)]);
    }

    #[test]
    fn test_equal_split_amount_finer_than_scale() {
        let people = ids(&["a", "b"]);
        let policy = SplitPolicy {
            scale: 2,
            tolerance: dec!(0.01),
        };
        let shares = LedgerEngine::split_equally(dec!(0.015), &people, &policy);
        let total: Decimal = shares.iter().map(|s| s.amount).sum();
        assert_eq!(total, dec!(0.015));
        assert_eq!(shares[1].amount, dec!(0.00));
        assert_eq!(shares[0].amount, dec!(0.015));
    }

    #[test]
    fn test_resolve_rejects_non_positive_amount() {
        let people = ids(&["a", "b"]);
        for amount in [dec!(0), dec!(-5)] {
            let err = LedgerEngine::resolve_shares(
                &MemberId::new("a"),
                amount,
                &people,
                &ShareRule::Equal,
                &SplitPolicy::default(),
            )
            .unwrap_err();
            assert_eq!(
                err,
                LedgerError::InvalidAmount {
                    field: "amount",
                    amount
                }
            );
        }
    }

    #[test]
    fn test_resolve_rejects_empty_and_duplicate_participants() {
        let payer = MemberId::new("a");
        let policy = SplitPolicy::default();
        assert_eq!(
            LedgerEngine::resolve_shares(&payer, dec!(10), &[], &ShareRule::Equal, &policy),
            Err(LedgerError::NoParticipants)
        );
        assert_eq!(
            LedgerEngine::resolve_shares(
                &payer,
                dec!(10),
                &ids(&["a", "b", "a"]),
                &ShareRule::Equal,
                &policy
            ),
            Err(LedgerError::DuplicateParticipant {
                member: MemberId::new("a")
            })
        );
    }

    #[test]
    fn test_exact_shares_must_sum_to_amount() {
        let rule = ShareRule::Exact(vec![Share::new("a", dec!(20)), Share::new("b", dec!(25))]);
        let err = LedgerEngine::resolve_shares(
            &MemberId::new("a"),
            dec!(50),
            &ids(&["a", "b"]),
            &rule,
            &SplitPolicy::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::ShareMismatch {
                expected: dec!(50),
                actual: dec!(45),
                tolerance: dec!(0.01)
            }
        );
    }

    #[test]
    fn test_exact_shares_gap_absorbed_by_payer() {
        let rule = ShareRule::Exact(vec![
            Share::new("a", dec!(33.33)),
            Share::new("b", dec!(33.33)),
            Share::new("c", dec!(33.33)),
        ]);
        let shares = LedgerEngine::resolve_shares(
            &MemberId::new("b"),
            dec!(100),
            &ids(&["a", "b", "c"]),
            &rule,
            &SplitPolicy::default(),
        )
        .unwrap();
        assert_eq!(shares[1].amount, dec!(33.34));
        assert_eq!(shares.iter().map(|s| s.amount).sum::<Decimal>(), dec!(100));
    }

    #[test]
    fn test_exact_shares_gap_goes_to_first_when_payer_absent() {
        let rule = ShareRule::Exact(vec![Share::new("b", dec!(5)), Share::new("c", dec!(4.99))]);
        let shares = LedgerEngine::resolve_shares(
            &MemberId::new("a"),
            dec!(10),
            &ids(&["b", "c"]),
            &rule,
            &SplitPolicy::default(),
        )
        .unwrap();
        assert_eq!(shares[0].amount, dec!(5.01));
    }

    #[test]
    fn test_exact_shares_coverage() {
        let policy = SplitPolicy::default();
        let payer = MemberId::new("a");
        // share for someone outside the participant list
        let rule = ShareRule::Exact(vec![Share::new("a", dec!(5)), Share::new("z", dec!(5))]);
        assert_eq!(
            LedgerEngine::resolve_shares(&payer, dec!(10), &ids(&["a", "b"]), &rule, &policy),
            Err(LedgerError::ShareCoverage {
                member: MemberId::new("z")
            })
        );
        // participant without a share
        let rule = ShareRule::Exact(vec![Share::new("a", dec!(10))]);
        assert_eq!(
            LedgerEngine::resolve_shares(&payer, dec!(10), &ids(&["a", "b"]), &rule, &policy),
            Err(LedgerError::ShareCoverage {
                member: MemberId::new("b")
            })
        );
    }

    #[test]
    fn test_exact_negative_share_rejected() {
        let rule = ShareRule::Exact(vec![Share::new("a", dec!(15)), Share::new("b", dec!(-5))]);
        let err = LedgerEngine::resolve_shares(
            &MemberId::new("a"),
            dec!(10),
            &ids(&["a", "b"]),
            &rule,
            &SplitPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { field: "share", .. }));
    }

    #[test]
    fn test_exact_huge_shares_rejected() {
        let rule = ShareRule::Exact(vec![
            Share::new("a", Decimal::MAX),
            Share::new("b", Decimal::MAX),
        ]);
        let err = LedgerEngine::resolve_shares(
            &MemberId::new("a"),
            dec!(10),
            &ids(&["a", "b"]),
            &rule,
            &SplitPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::AmountOutOfRange { field: "share", .. }));
    }

    #[test]
    fn test_per_head_empty() {
        let log = TransactionLog::new();
        assert_eq!(LedgerEngine::per_head(&log, 4), Decimal::ZERO);
        assert_eq!(LedgerEngine::per_head(&log, 0), Decimal::ZERO);
    }
}
