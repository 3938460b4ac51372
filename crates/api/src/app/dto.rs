use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use larder_core::{DomainError, DomainResult, ItemId};
use larder_infra::store::{PageRequest, RecordQuery, RecordSortKey, SortOrder};
use larder_inventory::{
    DayEntry, ItemDraft, RawLedgerInput, RawNumber, RawUnits, RecordDraft, normalize_quantity,
};

// -------------------------
// Parsing helpers
// -------------------------

/// Largest whole number a JSON (f64) number holds exactly.
const MAX_EXACT_JSON_INT: f64 = 9_007_199_254_740_992.0;

pub fn parse_item_id(raw: &RawNumber) -> DomainResult<ItemId> {
    match raw {
        RawNumber::Number(n) if *n >= 0.0 && *n <= MAX_EXACT_JSON_INT && n.fract() == 0.0 => {
            Ok(ItemId::new(*n as u64))
        }
        RawNumber::Number(n) => Err(DomainError::invalid_id(format!(
            "item id must be a whole number no larger than 2^53, got {n}"
        ))),
        RawNumber::Text(s) => s.parse(),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its date part is used).
pub fn parse_date(field: &str, value: &str) -> DomainResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| DomainError::validation(format!("{field} must be a date (YYYY-MM-DD), got {value:?}")))
}

fn parse_optional_date(field: &str, value: Option<&str>) -> DomainResult<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(field, v).map(Some),
    }
}

fn required_text(field: &str, value: Option<String>) -> DomainResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation(format!("{field} is required")))
}

fn parse_u32(field: &str, value: Option<&str>) -> DomainResult<Option<u32>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| DomainError::validation(format!("{field} must be a positive whole number"))),
    }
}

// -------------------------
// Request DTOs
// -------------------------

/// Body of item create/update. Unit and quantity fields sit at the top level.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(default)]
    pub id: Option<RawNumber>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub minimum_quantity: Option<RawNumber>,
    #[serde(flatten)]
    pub units: RawUnits,
    #[serde(flatten)]
    pub ledger: RawLedgerInput,
}

impl ItemRequest {
    pub fn into_draft(self) -> DomainResult<(Option<ItemId>, ItemDraft)> {
        let id = self.id.as_ref().map(parse_item_id).transpose()?;
        let units = self.units.to_unit_config()?;
        let inputs = self.ledger.to_flow_inputs(&units)?;
        let draft = ItemDraft {
            name: required_text("name", self.name)?,
            minimum_quantity: normalize_quantity("minimumQuantity", self.minimum_quantity.as_ref())?,
            units,
            inputs,
        };
        Ok((id, draft))
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkItemsRequest {
    #[serde(default)]
    pub items: Vec<ItemRequest>,
}

/// Body of an explicit record create/update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub units: RawUnits,
    #[serde(flatten)]
    pub ledger: RawLedgerInput,
}

impl RecordRequest {
    /// A missing date means `today`.
    pub fn into_draft(self, today: NaiveDate) -> DomainResult<RecordDraft> {
        let units = self.units.to_unit_config()?;
        let inputs = self.ledger.to_flow_inputs(&units)?;
        Ok(RecordDraft {
            item_name: required_text("itemName", self.item_name)?,
            date: parse_optional_date("date", self.date.as_deref())?.unwrap_or(today),
            units,
            inputs,
        })
    }
}

/// Body of `POST /inventory/create-record`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntryRequest {
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub opening_stock: Option<RawNumber>,
    #[serde(default)]
    pub received: Option<RawNumber>,
    #[serde(default)]
    pub consumed: Option<RawNumber>,
}

impl DayEntryRequest {
    pub fn into_parts(self) -> DomainResult<(String, NaiveDate, DayEntry)> {
        let item_name = required_text("itemName", self.item_name)?;
        let date = match parse_optional_date("date", self.date.as_deref())? {
            Some(d) => d,
            None => return Err(DomainError::validation("date is required")),
        };
        let opening = match &self.opening_stock {
            None => None,
            Some(RawNumber::Text(s)) if s.trim().is_empty() => None,
            Some(raw) => Some(normalize_quantity("openingStock", Some(raw))?),
        };
        let entry = DayEntry {
            opening,
            received: normalize_quantity("received", self.received.as_ref())?,
            consumed: normalize_quantity("consumed", self.consumed.as_ref())?,
        };
        Ok((item_name, date, entry))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateMissingRequest {
    #[serde(default)]
    pub date: Option<String>,
}

impl GenerateMissingRequest {
    pub fn date(&self) -> DomainResult<NaiveDate> {
        parse_optional_date("date", self.date.as_deref())?
            .ok_or_else(|| DomainError::validation("date is required"))
    }
}

// -------------------------
// Query strings
// -------------------------

/// What `GET /inventory-records` was asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordsView {
    /// Every record of one day, by item name.
    Day(NaiveDate),
    /// Per-item totals over a range.
    Month { start: NaiveDate, end: NaiveDate },
    /// Filtered, sorted, paged listing.
    List(RecordQuery),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsParams {
    pub view: Option<String>,
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub item_name: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl RecordsParams {
    pub fn into_view(self) -> DomainResult<RecordsView> {
        match self.view.as_deref().map(str::trim) {
            Some("day") => {
                let date = parse_optional_date("date", self.date.as_deref())?
                    .ok_or_else(|| DomainError::validation("date is required for the day view"))?;
                return Ok(RecordsView::Day(date));
            }
            Some("month") => {
                let start = parse_optional_date("start", self.start.as_deref())?;
                let end = parse_optional_date("end", self.end.as_deref())?;
                return match (start, end) {
                    (Some(start), Some(end)) => Ok(RecordsView::Month { start, end }),
                    _ => Err(DomainError::validation("start and end are required for the month view")),
                };
            }
            None | Some("") => {}
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "view must be one of: day, month (got {other:?})"
                )));
            }
        }

        let sort_by = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") | Some("date") => RecordSortKey::Date,
            Some("itemName") => RecordSortKey::ItemName,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "sortBy must be one of: date, itemName (got {other:?})"
                )));
            }
        };
        let sort_order = match self.sort_order.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => {
                return Err(DomainError::validation(format!(
                    "sortOrder must be one of: asc, desc (got {other:?})"
                )));
            }
        };
        let page = PageRequest::new(
            parse_u32("page", self.page.as_deref())?,
            parse_u32("limit", self.limit.as_deref())?,
        );

        Ok(RecordsView::List(RecordQuery {
            from: parse_optional_date("startDate", self.start_date.as_deref())?,
            to: parse_optional_date("endDate", self.end_date.as_deref())?,
            item_name: self.item_name.filter(|s| !s.trim().is_empty()),
            sort_by,
            sort_order,
            page: Some(page),
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl SummaryParams {
    pub fn range(&self) -> DomainResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        Ok((
            parse_optional_date("startDate", self.start_date.as_deref())?,
            parse_optional_date("endDate", self.end_date.as_deref())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_request_with_split_fields() {
        let req: ItemRequest = serde_json::from_value(json!({
            "name": "Flour",
            "secondaryUnit": "bag",
            "quantityPerSecondaryUnit": "50",
            "openingStockPrimary": 5,
            "openingStockSecondary": 2,
            "consumedSecondary": "1",
        }))
        .unwrap();
        let (id, draft) = req.into_draft().unwrap();
        assert_eq!(id, None);
        assert_eq!(draft.inputs.opening.combined, 105.0);
        assert_eq!(draft.inputs.consumed.combined, 50.0);
    }

    #[test]
    fn item_request_legacy_with_string_id() {
        let req: ItemRequest = serde_json::from_value(json!({
            "id": "12",
            "name": "Rice",
            "openingStock": 10,
            "received": "",
        }))
        .unwrap();
        let (id, draft) = req.into_draft().unwrap();
        assert_eq!(id, Some(ItemId::new(12)));
        assert_eq!(draft.inputs.opening.combined, 10.0);
        assert_eq!(draft.inputs.received.combined, 0.0);
    }

    #[test]
    fn item_request_rejects_bad_number_and_missing_name() {
        let req: ItemRequest = serde_json::from_value(json!({"name": "Rice", "consumed": "lots"})).unwrap();
        assert!(matches!(req.into_draft().unwrap_err(), DomainError::Validation(_)));

        let req: ItemRequest = serde_json::from_value(json!({"openingStock": 1})).unwrap();
        assert!(matches!(req.into_draft().unwrap_err(), DomainError::Validation(_)));

        let req: ItemRequest = serde_json::from_value(json!({"name": "Rice", "id": 1.5})).unwrap();
        assert!(matches!(req.into_draft().unwrap_err(), DomainError::InvalidId(_)));
    }

    #[test]
    fn item_ids_beyond_exact_float_range_are_rejected() {
        assert_eq!(
            parse_item_id(&RawNumber::Number(9_007_199_254_740_992.0)).unwrap(),
            ItemId::new(9_007_199_254_740_992)
        );
        for n in [1e30, 9_007_199_254_740_994.0, f64::INFINITY] {
            let err = parse_item_id(&RawNumber::Number(n)).unwrap_err();
            assert!(matches!(err, DomainError::InvalidId(_)), "{n}");
        }
        // Text ids are parsed exactly.
        assert_eq!(
            parse_item_id(&RawNumber::Text("18446744073709551615".into())).unwrap(),
            ItemId::new(u64::MAX)
        );
    }

    #[test]
    fn dates_accept_plain_and_timestamp_forms() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(parse_date("date", "2026-03-09").unwrap(), d);
        assert_eq!(parse_date("date", "2026-03-09T12:00:00Z").unwrap(), d);
        assert!(parse_date("date", "09/03/2026").is_err());
    }

    #[test]
    fn day_entry_blank_opening_keeps_existing() {
        let req: DayEntryRequest = serde_json::from_value(json!({
            "itemName": "Rice",
            "date": "2026-03-09",
            "openingStock": "",
            "received": 2,
        }))
        .unwrap();
        let (_, _, entry) = req.into_parts().unwrap();
        assert_eq!(entry.opening, None);
        assert_eq!(entry.received, 2.0);
    }

    #[test]
    fn records_params_pick_view() {
        let day = RecordsParams {
            view: Some("day".into()),
            date: Some("2026-03-09".into()),
            ..RecordsParams::default()
        };
        assert!(matches!(day.into_view().unwrap(), RecordsView::Day(_)));

        let month = RecordsParams {
            view: Some("month".into()),
            start: Some("2026-03-01".into()),
            ..RecordsParams::default()
        };
        assert!(month.into_view().is_err());

        let list = RecordsParams {
            item_name: Some("rice".into()),
            sort_by: Some("itemName".into()),
            sort_order: Some("ASC".into()),
            page: Some("2".into()),
            limit: Some("10".into()),
            ..RecordsParams::default()
        };
        match list.into_view().unwrap() {
            RecordsView::List(q) => {
                assert_eq!(q.sort_by, RecordSortKey::ItemName);
                assert_eq!(q.sort_order, SortOrder::Asc);
                assert_eq!(q.page, Some(PageRequest { page: 2, limit: 10 }));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }
}
