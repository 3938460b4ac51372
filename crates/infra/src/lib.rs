//! Infrastructure layer: document stores, store configuration and the
//! ledger service that drives the inventory engine over them.

pub mod config;
pub mod ledger_service;
pub mod store;

pub use ledger_service::{
    GenerationReport, LedgerService, LedgerSettings, RepairReport, RolledItem, RolloverReport, ServiceError,
    ServiceResult, UnitSyncReport, Upserted,
};
