pub mod account;
pub mod api;
pub mod config;
pub mod error;
pub mod render;

pub use account::{EntityKind, LedgerRecord, Payment, PaymentCategory, RecordId};
pub use api::{LedgerClient, ListQuery, Page, Totals};
pub use config::{Config, Role, SelectionStore};
pub use error::{LedgerError, Result};
