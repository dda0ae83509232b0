//! # Yearly Data Rule
//!
//! Turnover and workforce variants hold exactly three year slots:
//!
//! ```text
//! value = {
//!   "year_1": { "turnover": 100000, "market_percentage": 40, "fiscal_year_end": "2023-12-31" },
//!   "year_2": { ... },
//!   "year_3": { ... }
//! }
//! ```
//!
//! Slot fields are declared in a [`YearlyTable`]; one generic accessor pair
//! ([`slot_value`], [`set_slot_value`]) serves every table. Form input uses
//! `year_<n>_<field>` keys.
//!
//! Each slot is validated on its own and only when it has some non-blank
//! field: years are optional in aggregate, but a started year must be
//! complete. Errors read `year_<n>.<field> ...` and are keyed by their slot
//! (`year_<n>`), except malformed amounts, which are reported on `value`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{AssignContext, FieldRule};
use crate::input::FormInput;
use crate::model::Response;
use crate::validation::{ErrorCode, ErrorSet, ValidationContext};
use crate::value::{self, ValueMap};

/// Number of year slots.
pub const SLOT_COUNT: usize = 3;

static ISO_DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date shape pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFieldKind {
    /// Non-negative integer.
    Amount,
    /// Non-negative integer up to 100.
    Percentage,
    /// ISO-8601 date.
    Date,
    /// Calendar year between the configured minimum and the current year.
    Year,
}

#[derive(Debug, Clone, Copy)]
pub struct SlotField {
    pub name: &'static str,
    pub kind: SlotFieldKind,
    /// Whether a started slot must fill this field.
    pub required: bool,
}

impl SlotField {
    pub const fn new(name: &'static str, kind: SlotFieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YearlyTable {
    pub fields: &'static [SlotField],
}

impl YearlyTable {
    pub fn field(&self, name: &str) -> Option<&SlotField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Value keys the table allows: `year_1` .. `year_N`.
    pub const SLOT_KEYS: [&'static str; SLOT_COUNT] = ["year_1", "year_2", "year_3"];

    /// Split `year_<n>_<field>` into slot number and field name.
    pub fn parse_param<'a>(&self, name: &'a str) -> Option<(usize, &'a str)> {
        let rest = name.strip_prefix("year_")?;
        let (slot, field) = rest.split_once('_')?;
        let slot: usize = slot.parse().ok()?;
        if (1..=SLOT_COUNT).contains(&slot) && self.field(field).is_some() {
            Some((slot, field))
        } else {
            None
        }
    }
}

fn slot_key(slot: usize) -> String {
    format!("year_{}", slot)
}

/// Read one field of one slot.
pub fn slot_value<'a>(value: &'a ValueMap, slot: usize, field: &str) -> Option<&'a Value> {
    value.get(&slot_key(slot))?.as_object()?.get(field)
}

/// Write one field of one slot. `None` removes the field, and the slot once
/// it is empty.
pub fn set_slot_value(value: &mut ValueMap, slot: usize, field: &str, new: Option<Value>) {
    let key = slot_key(slot);
    match new {
        Some(v) => {
            let entry = value
                .entry(key)
                .or_insert_with(|| Value::Object(ValueMap::new()));
            if !entry.is_object() {
                *entry = Value::Object(ValueMap::new());
            }
            if let Value::Object(fields) = entry {
                fields.insert(field.to_string(), v);
            }
        }
        None => {
            let now_empty = match value.get_mut(&key) {
                Some(Value::Object(fields)) => {
                    fields.remove(field);
                    fields.is_empty()
                }
                _ => false,
            };
            if now_empty {
                value.remove(&key);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YearlyRule {
    pub table: YearlyTable,
    pub min_year: i32,
}

impl YearlyRule {
    pub fn new(table: YearlyTable, min_year: i32) -> Self {
        Self { table, min_year }
    }

    fn check_field(
        &self,
        slot: usize,
        field: &SlotField,
        raw: &Value,
        cx: &ValidationContext<'_>,
        errors: &mut ErrorSet,
    ) {
        let slot_field = slot_key(slot);
        let label = format!("{}.{}", slot_field, field.name);
        match field.kind {
            SlotFieldKind::Amount | SlotFieldKind::Percentage => {
                match value::as_non_negative_integer(raw) {
                    None => errors.add(
                        "value",
                        ErrorCode::NotAPositiveInteger,
                        format!("{} must be a positive integer", label),
                    ),
                    Some(n) if field.kind == SlotFieldKind::Percentage && n > 100 => errors.add(
                        &slot_field,
                        ErrorCode::OutOfRange,
                        format!("{} must be between 0 and 100", label),
                    ),
                    Some(_) => {}
                }
            }
            SlotFieldKind::Year => {
                let max = cx.current_year();
                let year = value::as_non_negative_integer(raw).and_then(|n| i32::try_from(n).ok());
                match year {
                    Some(y) if (self.min_year..=max).contains(&y) => {}
                    _ => errors.add(
                        &slot_field,
                        ErrorCode::OutOfRange,
                        format!("{} must be between {} and {}", label, self.min_year, max),
                    ),
                }
            }
            SlotFieldKind::Date => {
                let text = raw.as_str().map(str::trim).unwrap_or_default();
                if !ISO_DATE_SHAPE.is_match(text) {
                    errors.add(
                        &slot_field,
                        ErrorCode::WrongDateFormat,
                        format!("{} has the wrong format (expected YYYY-MM-DD)", label),
                    );
                } else if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
                    errors.add(
                        &slot_field,
                        ErrorCode::InvalidDate,
                        format!("{} is not a valid date", label),
                    );
                }
            }
        }
    }
}

impl FieldRule for YearlyRule {
    fn name(&self) -> &'static str {
        "yearly"
    }

    fn assign(&self, response: &mut Response, input: &FormInput, _cx: &AssignContext<'_>) {
        for (name, raw) in input.iter() {
            let Some((slot, field)) = self.table.parse_param(name) else {
                continue;
            };
            if let Some(scalar) = raw.as_scalar() {
                set_slot_value(&mut response.value, slot, field, value::presence(scalar));
            }
        }
    }

    fn normalize(&self, response: &mut Response) {
        for slot in 1..=SLOT_COUNT {
            for field in self.table.fields {
                let Some(raw) = slot_value(&response.value, slot, field.name).cloned() else {
                    continue;
                };
                let normalized = match (field.kind, &raw) {
                    (_, v) if value::is_blank(v) => None,
                    (SlotFieldKind::Date, Value::String(s)) => Some(Value::String(s.trim().to_string())),
                    (SlotFieldKind::Date, v) => Some(v.clone()),
                    (_, v) => Some(
                        value::as_non_negative_integer(v)
                            .map(Value::from)
                            .unwrap_or_else(|| v.clone()),
                    ),
                };
                set_slot_value(&mut response.value, slot, field.name, normalized);
            }
            let key = slot_key(slot);
            if response.value.get(&key).is_some_and(value::is_blank) {
                response.value.remove(&key);
            }
        }
    }

    fn validate(&self, response: &Response, cx: &ValidationContext<'_>, errors: &mut ErrorSet) {
        for slot in 1..=SLOT_COUNT {
            let key = slot_key(slot);
            let Some(raw_slot) = response.value.get(&key) else {
                continue;
            };
            let Some(fields) = raw_slot.as_object() else {
                if !value::is_blank(raw_slot) {
                    errors.add(
                        &key,
                        ErrorCode::InvalidType,
                        format!("year_{} must be an object", slot),
                    );
                }
                continue;
            };
            if value::is_map_blank(fields) {
                continue;
            }
            for field in self.table.fields {
                match fields.get(field.name).and_then(value::presence) {
                    Some(raw) => self.check_field(slot, field, &raw, cx, errors),
                    None if field.required => errors.add(
                        &key,
                        ErrorCode::Required,
                        format!("{}.{} is required", key, field.name),
                    ),
                    None => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::memory::MemBlobStore;
    use crate::catalog::CatalogEntry;
    use crate::config::EngineConfig;
    use crate::variants::VariantKind;
    use serde_json::json;
    use uuid::Uuid;

    const TURNOVER: YearlyTable = YearlyTable {
        fields: &[
            SlotField::new("turnover", SlotFieldKind::Amount),
            SlotField::new("market_percentage", SlotFieldKind::Percentage),
            SlotField::new("fiscal_year_end", SlotFieldKind::Date),
        ],
    };

    const WORKFORCE: YearlyTable = YearlyTable {
        fields: &[
            SlotField::new("year", SlotFieldKind::Year),
            SlotField::new("average_headcount", SlotFieldKind::Amount),
            SlotField::new("management_headcount", SlotFieldKind::Amount).optional(),
        ],
    };

    fn run(table: YearlyTable, input: FormInput) -> (Response, ErrorSet) {
        let store = MemBlobStore::new("s").unwrap();
        let rule = YearlyRule::new(table, 2000);
        let mut response = Response::new(
            Uuid::new_v4(),
            &CatalogEntry::new("ca", VariantKind::YearlyTurnover),
        );
        rule.assign(&mut response, &input, &AssignContext::new(&store));
        rule.normalize(&mut response);
        let config = EngineConfig::default();
        let cx = ValidationContext::new(&config)
            .with_today(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let mut errors = ErrorSet::new();
        rule.validate(&response, &cx, &mut errors);
        (response, errors)
    }

    fn full_year(n: usize, percentage: &str) -> FormInput {
        FormInput::new()
            .with(format!("year_{}_turnover", n), "100000")
            .with(format!("year_{}_market_percentage", n), percentage)
            .with(format!("year_{}_fiscal_year_end", n), "2023-12-31")
    }

    #[test]
    fn parse_param_checks_slot_and_field() {
        assert_eq!(TURNOVER.parse_param("year_1_turnover"), Some((1, "turnover")));
        assert_eq!(
            TURNOVER.parse_param("year_3_fiscal_year_end"),
            Some((3, "fiscal_year_end"))
        );
        assert_eq!(TURNOVER.parse_param("year_4_turnover"), None);
        assert_eq!(TURNOVER.parse_param("year_0_turnover"), None);
        assert_eq!(TURNOVER.parse_param("year_1_headcount"), None);
    }

    #[test]
    fn assign_and_normalize_store_numbers() {
        let (response, errors) = run(TURNOVER, full_year(2, "40"));
        assert!(errors.is_empty(), "{}", errors);
        assert_eq!(
            serde_json::Value::Object(response.value),
            json!({"year_2": {
                "turnover": 100000,
                "market_percentage": 40,
                "fiscal_year_end": "2023-12-31"
            }})
        );
    }

    #[test]
    fn blank_slot_is_valid_and_dropped() {
        let input = full_year(2, "40")
            .with("year_1_turnover", "")
            .with("year_1_market_percentage", " ");
        let (response, errors) = run(TURNOVER, input);
        assert!(errors.is_empty());
        assert!(response.value.get("year_1").is_none());
    }

    #[test]
    fn percentage_out_of_range_is_one_error() {
        let (_, errors) = run(TURNOVER, full_year(2, "150"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.codes("year_2"), vec![ErrorCode::OutOfRange]);
        assert_eq!(
            errors.messages("year_2"),
            vec!["year_2.market_percentage must be between 0 and 100"]
        );
        assert!(errors.get("value").is_empty());
    }

    #[test]
    fn negative_amount_is_not_a_positive_integer() {
        let (_, errors) = run(TURNOVER, FormInput::new().with("year_1_turnover", "-5"));
        assert!(errors
            .messages("value")
            .contains(&"year_1.turnover must be a positive integer"));
        assert!(errors
            .messages("year_1")
            .contains(&"year_1.fiscal_year_end is required"));
    }

    #[test]
    fn invalid_and_malformed_dates_are_distinct() {
        let input = FormInput::new()
            .with("year_1_turnover", "100000")
            .with("year_1_market_percentage", "40")
            .with("year_1_fiscal_year_end", "2023-13-40")
            .with("year_2_turnover", "100000")
            .with("year_2_market_percentage", "40")
            .with("year_2_fiscal_year_end", "31/12/2023");
        let (_, errors) = run(TURNOVER, input);
        assert_eq!(errors.codes("year_1"), vec![ErrorCode::InvalidDate]);
        assert_eq!(errors.codes("year_2"), vec![ErrorCode::WrongDateFormat]);
        assert_eq!(
            errors.messages("year_1"),
            vec!["year_1.fiscal_year_end is not a valid date"]
        );
        assert!(errors.get("value").is_empty());
    }

    #[test]
    fn workforce_year_bounds() {
        let input = FormInput::new()
            .with("year_1_year", "2023")
            .with("year_1_average_headcount", "12")
            .with("year_2_year", "1999")
            .with("year_2_average_headcount", "10")
            .with("year_3_year", "2025")
            .with("year_3_average_headcount", "10");
        let (_, errors) = run(WORKFORCE, input);
        assert!(errors.get("year_1").is_empty());
        assert_eq!(
            errors.messages("year_2"),
            vec!["year_2.year must be between 2000 and 2024"]
        );
        assert_eq!(
            errors.messages("year_3"),
            vec!["year_3.year must be between 2000 and 2024"]
        );
    }

    #[test]
    fn corrupted_slot_is_a_type_error() {
        let rule = YearlyRule::new(TURNOVER, 2000);
        let mut response = Response::new(
            Uuid::new_v4(),
            &CatalogEntry::new("ca", VariantKind::YearlyTurnover),
        );
        response.value.insert("year_1".into(), json!("lots"));
        let config = EngineConfig::default();
        let mut errors = ErrorSet::new();
        rule.validate(&response, &ValidationContext::new(&config), &mut errors);
        assert!(errors.has("year_1", ErrorCode::InvalidType));
    }

    #[test]
    fn set_slot_value_removes_empty_slot() {
        let mut value = ValueMap::new();
        set_slot_value(&mut value, 1, "turnover", Some(json!(5)));
        assert_eq!(slot_value(&value, 1, "turnover"), Some(&json!(5)));
        set_slot_value(&mut value, 1, "turnover", None);
        assert!(value.is_empty());
    }
}
