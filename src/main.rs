//! split-ledger CLI
//!
//! Replay a group's expenses and settlements from a JSON file.
//!
//! # Usage
//!
//! ```bash
//! # Balances, totals and a settle-up plan
//! split-ledger balances --input trip.json
//!
//! # Output as JSON
//! split-ledger balances --input trip.json --format json
//!
//! # Only the suggested settlements
//! split-ledger settle-up --input trip.json
//!
//! # Generate a random group for testing
//! split-ledger generate --members 6 --transactions 40
//! ```

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use split_ledger::config::LedgerConfig;
use split_ledger::core::currency::CurrencyCode;
use split_ledger::core::member::{Member, MemberId};
use split_ledger::core::scope::Scope;
use split_ledger::core::transaction::{
    ExpenseRequest, SettlementRequest, Share, ShareRule, TransactionKind,
};
use split_ledger::engine::plan::SettlementPlan;
use split_ledger::simulation::activity::{generate_random_group, ActivityConfig};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"split-ledger: expense splitting ledger

USAGE:
    split-ledger <COMMAND> [OPTIONS]

COMMANDS:
    balances    Replay a scope file and print balances
    settle-up   Replay a scope file and print suggested settlements
    generate    Generate a random scope file (for testing)
    help        Show this message

OPTIONS (balances, settle-up):
    --input <FILE>      Path to JSON scope file
    --format <FORMAT>   Output format: text (default) or json
    --config <FILE>     Path to JSON ledger config

OPTIONS (generate):
    --members <N>       Number of members (default: 5)
    --transactions <N>  Number of transactions (default: 50)
    --output <FILE>     Write to file instead of stdout

ENVIRONMENT:
    RUST_LOG            Log level, e.g. RUST_LOG=debug

EXAMPLES:
    split-ledger balances --input trip.json
    split-ledger settle-up --input trip.json --format json
    split-ledger generate --members 4 --transactions 20 --output trip.json"#
    );
}

/// JSON schema for a scope file.
#[derive(serde::Deserialize, serde::Serialize)]
struct ScopeFile {
    name: String,
    #[serde(default)]
    currency: Option<String>,
    members: Vec<MemberInput>,
    transactions: Vec<TransactionInput>,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct MemberInput {
    id: String,
    name: String,
}

#[derive(serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TransactionInput {
    Expense {
        payer: String,
        amount: String,
        participants: Vec<String>,
        /// member id -> amount; omitted for an equal split
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shares: Option<Vec<ShareInput>>,
        #[serde(default)]
        description: String,
        date: NaiveDate,
    },
    Settlement {
        payer: String,
        receiver: String,
        amount: String,
        date: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

#[derive(serde::Deserialize, serde::Serialize)]
struct ShareInput {
    member: String,
    amount: String,
}

/// JSON output schema for the balances command.
#[derive(serde::Serialize)]
struct BalancesOutput {
    name: String,
    currency: String,
    transactions: usize,
    total_spent: String,
    per_head: String,
    balanced: bool,
    balances: Vec<BalanceOutput>,
    settle_up: Vec<TransferOutput>,
}

#[derive(serde::Serialize)]
struct BalanceOutput {
    member: String,
    name: String,
    net: String,
    /// Rounded to the currency's minor unit.
    display: f64,
    status: String,
}

#[derive(serde::Serialize)]
struct TransferOutput {
    from: String,
    to: String,
    amount: String,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", msg);
    process::exit(1);
}

fn parse_amount(raw: &str) -> Decimal {
    raw.parse().unwrap_or_else(|e| fail(format!("invalid amount '{}': {}", raw, e)))
}

fn load_scope(path: &str, config: &LedgerConfig) -> Scope {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read '{}': {}", path, e)));

    let file: ScopeFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "name": "Trip to Bali",
  "currency": "USD",
  "members": [{{ "id": "emma", "name": "Emma" }}, {{ "id": "liam", "name": "Liam" }}],
  "transactions": [
    {{ "type": "expense", "payer": "emma", "amount": "42.50", "participants": ["emma", "liam"], "description": "Dinner", "date": "2024-08-20" }},
    {{ "type": "settlement", "payer": "liam", "receiver": "emma", "amount": "21.25", "date": "2024-08-21" }}
  ]
}}"#
        );
        process::exit(1);
    });

    let currency = file
        .currency
        .map(CurrencyCode::new)
        .unwrap_or_else(|| config.default_currency.clone());
    let policy = config.split_policy(&currency);
    let members = file
        .members
        .into_iter()
        .map(|m| Member::new(m.id, m.name))
        .collect();
    let mut scope = Scope::group(&file.name, currency, members).unwrap_or_else(|e| fail(e));
    info!("loaded scope '{}' from {}", file.name, path);

    for (i, tx) in file.transactions.into_iter().enumerate() {
        let result = match tx {
            TransactionInput::Expense {
                payer,
                amount,
                participants,
                shares,
                description,
                date,
            } => {
                let share_rule = match shares {
                    Some(list) => ShareRule::Exact(
                        list.iter()
                            .map(|s| Share::new(s.member.as_str(), parse_amount(&s.amount)))
                            .collect(),
                    ),
                    None => ShareRule::Equal,
                };
                let request = ExpenseRequest {
                    payer: MemberId::new(payer),
                    amount: parse_amount(&amount),
                    participants: participants.into_iter().map(MemberId::new).collect(),
                    share_rule,
                    description,
                    date,
                };
                scope.record_expense(request, &policy).map(|t| t.id())
            }
            TransactionInput::Settlement {
                payer,
                receiver,
                amount,
                date,
                note,
            } => {
                let mut request = SettlementRequest::new(payer, receiver, parse_amount(&amount), date);
                request.note = note;
                scope.record_settlement(request).map(|t| t.id())
            }
        };
        match result {
            Ok(id) => debug!("transaction #{} recorded as {}", i, id),
            Err(e) => fail(format!("transaction #{}: {}", i, e)),
        }
    }
    scope
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}': expected 'text' or 'json'", other)),
        }
    }
}

struct CommonArgs {
    input: String,
    format: OutputFormat,
    config: LedgerConfig,
}

fn parse_common(args: &[String]) -> CommonArgs {
    let mut input_path = None;
    let mut format = OutputFormat::Text;
    let mut config_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--input requires a file path")),
                );
            }
            "--format" => {
                i += 1;
                format = args
                    .get(i)
                    .unwrap_or_else(|| fail("--format requires 'text' or 'json'"))
                    .parse()
                    .unwrap_or_else(|e| fail(e));
            }
            "--config" => {
                i += 1;
                config_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--config requires a file path")),
                );
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => LedgerConfig::from_file(&path).unwrap_or_else(|e| fail(e)),
        None => LedgerConfig::default(),
    };
    CommonArgs {
        input: input_path.unwrap_or_else(|| fail("--input <FILE> is required")),
        format,
        config,
    }
}

fn cmd_balances(args: &[String]) {
    let common = parse_common(args);
    let scope = load_scope(&common.input, &common.config);
    let balances = scope.compute_balances();
    let plan = SettlementPlan::from_balances(&balances);
    let currency = scope.currency();

    if common.format == OutputFormat::Json {
        let display = balances.to_display(currency);
        let output = BalancesOutput {
            name: scope.name(),
            currency: currency.to_string(),
            transactions: scope.log().len(),
            total_spent: scope.equal_split_total().to_string(),
            per_head: scope.per_head_amount().to_string(),
            balanced: balances.is_balanced(),
            balances: scope
                .members()
                .iter()
                .map(|m| {
                    let net = balances.position(m.id());
                    BalanceOutput {
                        member: m.id().to_string(),
                        name: m.name().to_string(),
                        net: net.to_string(),
                        display: display.get(m.id()).copied().unwrap_or(0.0),
                        status: status(net).to_string(),
                    }
                })
                .collect(),
            settle_up: transfers(&plan),
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        }
    } else {
        println!("=== {} ({}) ===", scope.name(), currency);
        println!("Transactions:   {}", scope.log().len());
        println!("Total spent:    {}", currency.round(scope.equal_split_total()));
        println!("Per person:     {}", currency.round(scope.per_head_amount()));
        println!("Balanced:       {}", balances.is_balanced());
        println!();
        for m in scope.members() {
            let net = balances.position(m.id());
            println!(
                "  {:<20} {:>12}  [{}]",
                m.name(),
                currency.round(net),
                status(net)
            );
        }
        println!();
        print!("{}", plan);
    }
}

fn cmd_settle_up(args: &[String]) {
    let common = parse_common(args);
    let scope = load_scope(&common.input, &common.config);
    let plan = SettlementPlan::from_balances(&scope.compute_balances());

    if common.format == OutputFormat::Json {
        match serde_json::to_string_pretty(&transfers(&plan)) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        }
    } else {
        print!("{}", plan);
    }
}

fn status(net: Decimal) -> &'static str {
    if net > Decimal::ZERO {
        "GETS BACK"
    } else if net < Decimal::ZERO {
        "OWES"
    } else {
        "SETTLED"
    }
}

fn transfers(plan: &SettlementPlan) -> Vec<TransferOutput> {
    plan.transfers()
        .iter()
        .map(|t| TransferOutput {
            from: t.from.to_string(),
            to: t.to.to_string(),
            amount: t.amount.to_string(),
        })
        .collect()
}

fn cmd_generate(args: &[String]) {
    let mut config = ActivityConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                config.member_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--members requires a number"));
            }
            "--transactions" => {
                i += 1;
                config.transaction_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| fail("--transactions requires a number"));
            }
            "--output" => {
                i += 1;
                output_path = Some(
                    args.get(i)
                        .cloned()
                        .unwrap_or_else(|| fail("--output requires a file path")),
                );
            }
            other => fail(format!("unknown option: {}", other)),
        }
        i += 1;
    }

    let scope = generate_random_group("Generated", &config).unwrap_or_else(|e| fail(e));

    let file = ScopeFile {
        name: scope.name(),
        currency: Some(scope.currency().to_string()),
        members: scope
            .members()
            .iter()
            .map(|m| MemberInput {
                id: m.id().to_string(),
                name: m.name().to_string(),
            })
            .collect(),
        transactions: scope
            .log()
            .iter()
            .map(|tx| match tx.kind() {
                TransactionKind::Expense(e) => TransactionInput::Expense {
                    payer: e.payer.to_string(),
                    amount: e.amount.to_string(),
                    participants: e.shares.iter().map(|s| s.member.to_string()).collect(),
                    shares: None,
                    description: e.description.clone(),
                    date: tx.date(),
                },
                TransactionKind::Settlement(s) => TransactionInput::Settlement {
                    payer: s.payer.to_string(),
                    receiver: s.receiver.to_string(),
                    amount: s.amount.to_string(),
                    date: tx.date(),
                    note: s.note.clone(),
                },
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&file).unwrap_or_else(|e| fail(e));

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| fail(format!("writing '{}': {}", path, e)));
        eprintln!(
            "Generated {} transactions across {} members → {}",
            scope.log().len(),
            scope.members().len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "balances" => cmd_balances(rest),
        "settle-up" => cmd_settle_up(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
