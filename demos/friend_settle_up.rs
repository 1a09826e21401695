//! Friend balances example.
//!
//! One member shares costs with friends directly and in a group, then
//! checks the settle-up page and dashboard.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use split_ledger::prelude::*;

fn main() -> Result<(), LedgerError> {
    println!("╔══════════════════════════════════════════╗");
    println!("║  split-ledger: Friend Settle-Up Example  ║");
    println!("╚══════════════════════════════════════════╝\n");

    let store = LedgerStore::default();
    for (id, name) in [("me", "Me"), ("jacob", "Jacob"), ("sophia", "Sophia")] {
        store.register_member(Member::new(id, name))?;
    }
    let me = MemberId::new("me");
    let jacob = MemberId::new("jacob");
    let sophia = MemberId::new("sophia");
    let day = |d| NaiveDate::from_ymd_opt(2024, 9, d).unwrap();

    let with_jacob = store.open_friend_pair(&me, &jacob)?;
    let with_sophia = store.open_friend_pair(&me, &sophia)?;
    let club = store.create_group("Dinner Club", &[me.clone(), jacob.clone(), sophia.clone()])?;

    store.record_expense(
        with_jacob,
        ExpenseRequest::equal("me", dec!(100), vec![me.clone(), jacob.clone()], day(2))
            .with_description("Concert tickets"),
        None,
    )?;
    store.record_expense(
        with_sophia,
        ExpenseRequest::equal("sophia", dec!(30), vec![me.clone(), sophia.clone()], day(3))
            .with_description("Taxi"),
        None,
    )?;
    store.record_expense(
        club,
        ExpenseRequest::equal("jacob", dec!(96), vec![me.clone(), jacob.clone(), sophia.clone()], day(4))
            .with_description("Sushi"),
        None,
    )?;
    store.record_settlement(
        with_jacob,
        SettlementRequest::new("jacob", "me", dec!(20), day(5)),
        None,
    )?;

    // --- Direct balances ---
    println!("━━━ Friend Balances ━━━\n");
    for friend in [&jacob, &sophia] {
        let pair = store.friend_balance(friend, &me)?;
        println!(
            "  {:<8} owes me {:>8}  (gross {} / {})",
            friend, pair.net, pair.gross_a_to_b, pair.gross_b_to_a
        );
    }
    println!();

    // --- Settle-up page ---
    println!("━━━ Settle Up ━━━\n");
    for entry in store.settle_up(&me)? {
        let direction = if entry.amount.is_sign_negative() {
            "you owe"
        } else {
            "owes you"
        };
        println!("  {:<12} {:?}  {} {}", entry.name, entry.kind, direction, entry.amount.abs());
    }
    println!();

    // --- Dashboard ---
    let dashboard = store.dashboard(&me)?;
    println!("━━━ Dashboard ━━━\n");
    println!("Net balance: {}", dashboard.net_balance);
    println!("Scopes:      {}", dashboard.scopes.join(", "));
    println!("\nRecent activity:");
    for entry in &dashboard.activity {
        println!(
            "  {}  {:<16} {:>8}  ({})",
            entry.date, entry.description, entry.amount, entry.scope_name
        );
    }
    Ok(())
}
