//! Inventory ledger engine: unit conversion, derived-field computation and
//! the day rollover, plus the item and record documents built on them.
//!
//! Everything here is synchronous and free of I/O.

pub mod input;
pub mod item;
pub mod ledger;
pub mod quantity;
pub mod record;
pub mod rollover;
pub mod summary;
pub mod units;

pub use input::{RawLedgerInput, RawNumber, RawUnits, normalize_quantity};
pub use item::{InventoryItem, ItemDraft};
pub use ledger::{FlowInputs, Ledger, LedgerState};
pub use quantity::{Quantity, QuantityInput, combine};
pub use record::{DayEntry, InventoryRecord, RecordDraft};
pub use rollover::{Rollover, next_day};
pub use summary::{ItemPeriodTotals, RecordSummary, totals_by_item};
pub use units::{PrimaryUnit, SecondaryUnit, UnitConfig};
