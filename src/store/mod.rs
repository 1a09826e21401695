pub mod activity;
pub mod ledger_store;
