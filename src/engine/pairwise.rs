use crate::core::member::MemberId;
use crate::core::transaction::{TransactionKind, TransactionLog};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What two members owe each other within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairwiseBalance {
    pub member_a: MemberId,
    pub member_b: MemberId,
    /// Shares of `b`'s expenses owed by `a`, plus anything `b` paid `a` directly.
    pub gross_a_to_b: Decimal,
    /// Shares of `a`'s expenses owed by `b`, plus anything `a` paid `b` directly.
    pub gross_b_to_a: Decimal,
    /// Positive means `a` owes `b` net, negative means `b` owes `a`.
    pub net: Decimal,
}

impl PairwiseBalance {
    /// Offset the mutual debts of `a` and `b` in a log.
    ///
    /// Only transactions between the two members count: an expense adds
    /// the other member's share to their debt towards the payer, and a
    /// settlement reduces the payer's debt towards the receiver.
    pub fn between(log: &TransactionLog, a: &MemberId, b: &MemberId) -> Self {
        let mut a_to_b = Decimal::ZERO;
        let mut b_to_a = Decimal::ZERO;

        for tx in log.iter() {
            match tx.kind() {
                TransactionKind::Expense(e) => {
                    if &e.payer == b {
                        a_to_b += e.share_of(a);
                    } else if &e.payer == a {
                        b_to_a += e.share_of(b);
                    }
                }
                TransactionKind::Settlement(s) => {
                    if &s.payer == a && &s.receiver == b {
                        b_to_a += s.amount;
                    } else if &s.payer == b && &s.receiver == a {
                        a_to_b += s.amount;
                    }
                }
            }
        }

        Self {
            member_a: a.clone(),
            member_b: b.clone(),
            gross_a_to_b: a_to_b,
            gross_b_to_a: b_to_a,
            net: a_to_b - b_to_a,
        }
    }

    /// True when neither side owes the other.
    pub fn is_square(&self) -> bool {
        self.net.is_zero()
    }
}
