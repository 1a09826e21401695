use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use split_ledger::prelude::*;

const MEMBERS: [&str; 5] = ["A", "B", "C", "D", "E"];

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn group() -> Scope {
    Scope::group(
        "Prop",
        CurrencyCode::new("USD"),
        MEMBERS.iter().map(|m| Member::new(*m, *m)).collect(),
    )
    .unwrap()
}

/// A random member from the fixed pool.
fn arb_member() -> impl Strategy<Value = MemberId> {
    prop::sample::select(MEMBERS.to_vec()).prop_map(MemberId::new)
}

/// A positive amount in cents (0.01 to 10,000.00).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A non-empty set of distinct participants.
fn arb_participants() -> impl Strategy<Value = Vec<MemberId>> {
    prop::sample::subsequence(MEMBERS.to_vec(), 1..=MEMBERS.len())
        .prop_map(|v| v.into_iter().map(MemberId::new).collect())
}

#[derive(Debug, Clone)]
enum Op {
    Expense(MemberId, Decimal, Vec<MemberId>),
    ExactExpense(MemberId, Decimal, Vec<Share>),
    Settlement(MemberId, MemberId, Decimal),
}

/// Explicit shares that miss the amount by at most one cent.
///
/// The payer may or may not be among the participants, so both ways of
/// absorbing the gap get exercised.
fn arb_exact_expense() -> impl Strategy<Value = Op> {
    (arb_member(), 1i64..1_000_000i64, arb_participants(), -1i64..=1).prop_map(
        |(payer, cents, participants, slack)| {
            let n = participants.len() as i64;
            let mut split: Vec<i64> = (0..n)
                .map(|i| cents / n + i64::from(i < cents % n))
                .collect();
            // the share that will absorb the gap
            let absorber = participants.iter().position(|p| *p == payer).unwrap_or(0);
            match slack {
                1 => split[absorber] += 1,
                -1 => {
                    let last = split.len() - 1;
                    if split[last] > 0 {
                        split[last] -= 1;
                    }
                }
                _ => {}
            }
            let shares = participants
                .into_iter()
                .zip(split)
                .map(|(m, c)| Share::new(m, Decimal::new(c, 2)))
                .collect();
            Op::ExactExpense(payer, Decimal::new(cents, 2), shares)
        },
    )
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (arb_member(), arb_amount(), arb_participants())
            .prop_map(|(p, a, ps)| Op::Expense(p, a, ps)),
        2 => arb_exact_expense(),
        1 => (arb_member(), arb_member(), arb_amount())
            .prop_filter_map("payer must differ from receiver", |(p, r, a)| {
                if p == r {
                    None
                } else {
                    Some(Op::Settlement(p, r, a))
                }
            }),
    ]
}

fn apply(scope: &mut Scope, op: Op, policy: &SplitPolicy) {
    match op {
        Op::Expense(payer, amount, participants) => {
            scope
                .record_expense(ExpenseRequest::equal(payer, amount, participants, date()), policy)
                .unwrap();
        }
        Op::ExactExpense(payer, amount, shares) => {
            scope
                .record_expense(ExpenseRequest::exact(payer, amount, shares, date()), policy)
                .unwrap();
        }
        Op::Settlement(payer, receiver, amount) => {
            scope
                .record_settlement(SettlementRequest::new(payer, receiver, amount, date()))
                .unwrap();
        }
    }
}

proptest! {
    /// Balances sum to exactly zero after every write.
    #[test]
    fn balances_always_sum_to_zero(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut scope = group();
        let policy = SplitPolicy::default();
        for op in ops {
            apply(&mut scope, op, &policy);
            prop_assert_eq!(scope.compute_balances().sum(), Decimal::ZERO);
        }
    }

    /// Stored shares of every expense add up to its amount exactly, even
    /// when explicit shares were a cent off.
    #[test]
    fn stored_shares_match_amount(ops in prop::collection::vec(arb_exact_expense(), 1..20)) {
        let mut scope = group();
        let policy = SplitPolicy::default();
        for op in ops {
            apply(&mut scope, op, &policy);
        }
        for tx in scope.log().iter() {
            if let TransactionKind::Expense(e) = tx.kind() {
                let total: Decimal = e.shares.iter().map(|s| s.amount).sum();
                prop_assert_eq!(total, e.amount);
                prop_assert!(e.shares.iter().all(|s| s.amount >= Decimal::ZERO));
            }
        }
        prop_assert_eq!(scope.compute_balances().sum(), Decimal::ZERO);
    }

    /// Equal shares add up to the amount and stay within one unit of A/N.
    #[test]
    fn equal_split_is_exact(amount in arb_amount(), participants in arb_participants()) {
        let policy = SplitPolicy::default();
        let shares = LedgerEngine::split_equally(amount, &participants, &policy);

        prop_assert_eq!(shares.len(), participants.len());
        let total: Decimal = shares.iter().map(|s| s.amount).sum();
        prop_assert_eq!(total, amount);

        let ideal = amount / Decimal::from(participants.len() as u64);
        for share in &shares {
            prop_assert!((share.amount - ideal).abs() <= policy.unit());
        }
    }

    /// A settlement moves exactly X between payer and receiver, nobody else.
    #[test]
    fn settlement_is_symmetric(
        ops in prop::collection::vec(arb_op(), 0..20),
        payer in arb_member(),
        receiver in arb_member(),
        amount in arb_amount(),
    ) {
        prop_assume!(payer != receiver);
        let mut scope = group();
        let policy = SplitPolicy::default();
        for op in ops {
            apply(&mut scope, op, &policy);
        }
        let before = scope.compute_balances();
        scope
            .record_settlement(SettlementRequest::new(payer.clone(), receiver.clone(), amount, date()))
            .unwrap();
        let after = scope.compute_balances();

        for m in MEMBERS {
            let id = MemberId::new(m);
            let delta = after.position(&id) - before.position(&id);
            if id == payer {
                prop_assert_eq!(delta, amount);
            } else if id == receiver {
                prop_assert_eq!(delta, -amount);
            } else {
                prop_assert_eq!(delta, Decimal::ZERO);
            }
        }
    }

    /// Reading twice without a write in between gives the same answer.
    #[test]
    fn compute_balances_is_idempotent(ops in prop::collection::vec(arb_op(), 0..30)) {
        let mut scope = group();
        let policy = SplitPolicy::default();
        for op in ops {
            apply(&mut scope, op, &policy);
        }
        prop_assert_eq!(scope.compute_balances(), scope.compute_balances());
    }

    /// What A owes B is the negation of what B owes A.
    #[test]
    fn pairwise_is_antisymmetric(
        ops in prop::collection::vec(arb_op(), 0..30),
        a in arb_member(),
        b in arb_member(),
    ) {
        prop_assume!(a != b);
        let mut scope = group();
        let policy = SplitPolicy::default();
        for op in ops {
            apply(&mut scope, op, &policy);
        }
        let ab = PairwiseBalance::between(scope.log(), &a, &b);
        let ba = PairwiseBalance::between(scope.log(), &b, &a);
        prop_assert_eq!(ab.net, -ba.net);
    }

    /// Carrying out the suggested plan leaves everyone square.
    #[test]
    fn settlement_plan_settles_everyone(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut scope = group();
        let policy = SplitPolicy::default();
        for op in ops {
            apply(&mut scope, op, &policy);
        }
        let plan = SettlementPlan::from_balances(&scope.compute_balances());
        prop_assert!(plan.len() < MEMBERS.len());

        for t in plan.transfers() {
            scope
                .record_settlement(SettlementRequest::new(t.from.clone(), t.to.clone(), t.amount, date()))
                .unwrap();
        }
        prop_assert!(scope.compute_balances().is_settled());
    }

    /// Non-positive amounts are always rejected and leave the log alone.
    #[test]
    fn non_positive_amounts_rejected(cents in -1_000_000i64..=0, payer in arb_member()) {
        let mut scope = group();
        let amount = Decimal::new(cents, 2);
        let result = scope.record_expense(
            ExpenseRequest::equal(payer, amount, vec![MemberId::new("A")], date()),
            &SplitPolicy::default(),
        );
        let rejected = matches!(result, Err(LedgerError::InvalidAmount { .. }));
        prop_assert!(rejected);
        prop_assert!(scope.log().is_empty());
    }
}
