//! Swarm membership ledger.
//!
//! SQLite-backed record of scan findings (`host_online_find`), current swarm
//! membership (`host_swarm_list`) and the append-only operation histories
//! (`host_operate_history`, `swarm_operate_history`). Membership only changes
//! through [`MembershipController`], which commits each status change
//! together with its audit row.

mod arrow_schemas;
mod audit;
mod controller;
mod cursor;
mod discovery;
mod error;
mod export_parquet;
mod membership;
mod models;
mod open;
mod query;
mod schema;

pub use audit::{HistoryCursor, HostTimeline};
pub use controller::MembershipController;
pub use cursor::{Cursor, DEFAULT_PAGE_SIZE};
pub use discovery::{DiscoveryCursor, DiscoverySince};
pub use error::{LedgerError, LedgerResult};
pub use models::*;
pub use open::Db;
pub use schema::TABLES;
pub use swarm_core::{HostOperateType, HostStatus, SwarmOperateType};
