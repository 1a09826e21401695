//! Random activity generation for the ledger.
//!
//! Builds groups with a random stream of expenses and settlements to
//! exercise balance computation at different sizes.

use crate::config::LedgerConfig;
use crate::core::currency::CurrencyCode;
use crate::core::error::Result;
use crate::core::member::{Member, MemberId};
use crate::core::scope::Scope;
use crate::core::transaction::{ExpenseRequest, SettlementRequest};
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a random group.
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// Number of members in the group.
    pub member_count: usize,
    /// Number of transactions to record.
    pub transaction_count: usize,
    /// Probability that a transaction is a settlement.
    pub settlement_ratio: f64,
    /// Smallest amount, in minor units.
    pub min_minor_units: i64,
    /// Largest amount, in minor units.
    pub max_minor_units: i64,
    pub currency: CurrencyCode,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            member_count: 5,
            transaction_count: 50,
            settlement_ratio: 0.2,
            min_minor_units: 100,
            max_minor_units: 50_000,
            currency: CurrencyCode::default(),
        }
    }
}

/// Build a group named `name` and fill it with random activity.
///
/// Dates run one day apart and end today.
pub fn generate_random_group(name: &str, config: &ActivityConfig) -> Result<Scope> {
    let mut rng = rand::thread_rng();
    let members: Vec<Member> = (0..config.member_count.max(2))
        .map(|i| Member::new(format!("member-{:03}", i), format!("Member {}", i)))
        .collect();
    let ids: Vec<MemberId> = members.iter().map(|m| m.id().clone()).collect();

    let mut scope = Scope::group(name, config.currency.clone(), members)?;
    let policy = LedgerConfig::default().split_policy(&config.currency);
    let start = Utc::now().date_naive() - Duration::days(config.transaction_count as i64);
    let digits = config.currency.minor_digits();
    let (lo, hi) = (
        config.min_minor_units.max(1),
        config.max_minor_units.max(config.min_minor_units.max(1) + 1),
    );

    for i in 0..config.transaction_count {
        let amount = Decimal::new(rng.gen_range(lo..hi), digits);
        let date = start + Duration::days(i as i64);
        let payer = ids[rng.gen_range(0..ids.len())].clone();

        if rng.gen_bool(config.settlement_ratio.clamp(0.0, 1.0)) {
            let mut receiver = payer.clone();
            while receiver == payer {
                receiver = ids[rng.gen_range(0..ids.len())].clone();
            }
            scope.record_settlement(SettlementRequest::new(payer, receiver, amount, date))?;
        } else {
            let n = rng.gen_range(1..=ids.len());
            let participants: Vec<MemberId> =
                ids.choose_multiple(&mut rng, n).cloned().collect();
            let request = ExpenseRequest::equal(payer, amount, participants, date)
                .with_description(format!("Expense #{}", i));
            scope.record_expense(request, &policy)?;
        }
    }

    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_group_generation() {
        let config = ActivityConfig {
            member_count: 4,
            transaction_count: 30,
            ..Default::default()
        };
        let scope = generate_random_group("Random", &config).unwrap();
        assert_eq!(scope.members().len(), 4);
        assert_eq!(scope.log().len(), 30);
    }

    #[test]
    fn test_random_group_balances_sum_to_zero() {
        let config = ActivityConfig {
            member_count: 12,
            transaction_count: 200,
            settlement_ratio: 0.35,
            ..Default::default()
        };
        let scope = generate_random_group("Random", &config).unwrap();
        assert!(scope.compute_balances().is_balanced());
    }
}
