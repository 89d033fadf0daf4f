pub mod balance;
pub mod config;
pub mod error;
pub mod exchange;
pub mod history;
pub mod ledger;
pub mod memory;
pub mod mongo;
pub mod repository;
pub mod routes;
pub mod schemas;
pub mod seed;
pub mod service;
pub mod settlement;
pub mod split;
pub mod validate;

pub use error::{LedgerError, LedgerResult};
pub use service::BudgetService;
