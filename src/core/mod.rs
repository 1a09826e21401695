pub mod balance;
pub mod currency;
pub mod error;
pub mod member;
pub mod scope;
pub mod transaction;
