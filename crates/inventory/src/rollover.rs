//! Day rollover: today's closing state becomes tomorrow's opening state.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::ledger::Ledger;
use crate::quantity::Quantity;

/// Outcome of closing one item-day.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollover {
    /// Signed final stock of the day being closed.
    pub today_balance: f64,
    /// What the next day opens with (never negative).
    pub opening: Quantity,
}

impl Rollover {
    /// Close the day described by `ledger`.
    ///
    /// The split final stock is carried as the split opening. When no split
    /// final stock was recorded at all, the whole combined opening is carried
    /// as primary units.
    pub fn close(ledger: &Ledger) -> Self {
        let today_balance = ledger.final_stock;
        let tomorrow = today_balance.max(0.0);

        let carried_split =
            ledger.final_stock_primary != 0.0 || ledger.final_stock_secondary != 0.0;
        let opening = if carried_split {
            Quantity {
                combined: tomorrow,
                primary: ledger.final_stock_primary,
                secondary: ledger.final_stock_secondary,
            }
        } else {
            Quantity::primary_only(tomorrow)
        };

        Self {
            today_balance,
            opening,
        }
    }

    pub fn tomorrow_opening_stock(&self) -> f64 {
        self.opening.combined
    }

    /// The settled ledger the next day starts from.
    pub fn settled_ledger(&self) -> Ledger {
        Ledger::settled(self.opening)
    }
}

/// The calendar day after `today` (saturating at the end of the calendar).
pub fn next_day(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}
