//! Group trip example.
//!
//! Four friends share costs on a trip, one of them settles early, and
//! the ledger suggests how the rest can square up.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use split_ledger::prelude::*;

fn main() -> Result<(), LedgerError> {
    println!("╔══════════════════════════════════════════╗");
    println!("║   split-ledger: Group Trip Example       ║");
    println!("╚══════════════════════════════════════════╝\n");

    let store = LedgerStore::default();
    let friends = [
        ("emma", "Emma"),
        ("liam", "Liam"),
        ("olivia", "Olivia"),
        ("william", "William"),
    ];
    for (id, name) in friends {
        store.register_member(Member::new(id, name))?;
    }
    let everyone: Vec<MemberId> = friends.iter().map(|(id, _)| MemberId::new(*id)).collect();
    let trip = store.create_group("Trip to Bali", &everyone)?;
    let day = |d| NaiveDate::from_ymd_opt(2024, 8, d).unwrap();

    // --- Expenses ---
    println!("━━━ Expenses ━━━\n");

    store.record_expense(
        trip,
        ExpenseRequest::equal("emma", dec!(42.50), everyone.clone(), day(20)).with_description("Dinner"),
        None,
    )?;
    store.record_expense(
        trip,
        ExpenseRequest::exact(
            "olivia",
            dec!(120),
            vec![
                Share::new("olivia", dec!(30)),
                Share::new("liam", dec!(30)),
                Share::new("william", dec!(60)),
            ],
            day(21),
        )
        .with_description("Scooter rental"),
        None,
    )?;
    let snapshot = store.record_expense(
        trip,
        ExpenseRequest::equal(
            "william",
            dec!(75),
            vec![MemberId::new("emma"), MemberId::new("liam"), MemberId::new("william")],
            day(22),
        )
        .with_description("Snorkeling"),
        None,
    )?;

    for tx in &snapshot.transactions {
        if let TransactionKind::Expense(e) = tx.kind() {
            println!("  {}  {:<16} {:>8} paid by {}", tx.date(), e.description, e.amount, e.payer);
        }
    }
    println!();
    println!("Total spent: {}", snapshot.total_spent);
    println!("Per person:  {}", snapshot.currency.round(snapshot.per_head));
    println!();

    // --- Early settlement ---
    println!("━━━ Liam settles with Emma ━━━\n");
    let snapshot = store.record_settlement(
        trip,
        SettlementRequest::new("liam", "emma", dec!(10.63), day(23)).with_note("Dinner"),
        Some(snapshot.version),
    )?;

    for (id, net) in &snapshot.display_balances {
        let status = if net.is_sign_positive() && !net.is_zero() {
            "GETS BACK"
        } else if net.is_sign_negative() {
            "OWES"
        } else {
            "SETTLED"
        };
        println!("  {:<10} {:>10}  [{}]", id, net, status);
    }
    println!("\nBalanced: {}\n", snapshot.balances.is_balanced());

    // --- Settle up ---
    print!("{}", store.settlement_plan(trip)?);
    Ok(())
}
