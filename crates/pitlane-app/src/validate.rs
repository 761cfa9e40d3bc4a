// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Raw row ingestion.
//!
//! Parsing runs in three passes: every field is coerced to its canonical
//! type with defaults, the legacy part fields are synced from the first part
//! entry, and finally the mode's rules are checked. Problems are collected as
//! field-keyed errors instead of stopping at the first one.

use serde_json::{Map, Value};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

use crate::{PartEntry, PartEntryId, Reminder, Row, RowId, RowStatus};

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";
pub const TIME_LAYOUT: &str = "HH:MM";

/// Repair-system tag the service center uses for warranty jobs.
pub const WARRANTY_REPAIR_SYSTEM: &str = "ضمان";
pub const WARRANTY_MILEAGE_LIMIT: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BeastRules {
    pub warranty_tag: String,
    pub mileage_limit: f64,
}

impl Default for BeastRules {
    fn default() -> Self {
        Self {
            warranty_tag: WARRANTY_REPAIR_SYSTEM.to_owned(),
            mileage_limit: WARRANTY_MILEAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValidationMode {
    #[default]
    Standard,
    Beast(BeastRules),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    Format,
    Domain,
}

impl FieldErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Format => "format",
            Self::Domain => "domain rule",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field, self.kind.as_str(), self.message)
    }
}

impl std::error::Error for FieldError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn push(&mut self, field: &'static str, kind: FieldErrorKind, message: impl Into<String>) {
        self.0.push(FieldError::new(field, kind, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub accepted: Vec<Row>,
    pub rejected: Vec<(usize, FieldErrors)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSchema {
    mode: ValidationMode,
}

impl RowSchema {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn beast() -> Self {
        Self::new(ValidationMode::Beast(BeastRules::default()))
    }

    pub fn mode(&self) -> &ValidationMode {
        &self.mode
    }

    pub fn parse(&self, raw: &Value) -> Result<Row, FieldErrors> {
        let Some(object) = raw.as_object() else {
            return Err(FieldError::new(
                "row",
                FieldErrorKind::Format,
                "row must be a JSON object",
            )
            .into());
        };

        let mut errors = FieldErrors::default();
        let mut row = coerce(object, &mut errors);
        row.sync_legacy_part();
        self.check_rules(&row, &mut errors);

        if errors.is_empty() {
            Ok(row)
        } else {
            Err(errors)
        }
    }

    /// Runs an already typed row back through the full pipeline.
    pub fn normalize(&self, row: &Row) -> Result<Row, FieldErrors> {
        let raw = serde_json::to_value(row).map_err(|error| {
            FieldErrors::from(FieldError::new(
                "row",
                FieldErrorKind::Format,
                error.to_string(),
            ))
        })?;
        self.parse(&raw)
    }

    pub fn parse_batch(&self, raws: &[Value]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, raw) in raws.iter().enumerate() {
            match self.parse(raw) {
                Ok(row) => report.accepted.push(row),
                Err(errors) => report.rejected.push((index, errors)),
            }
        }
        report
    }

    fn check_rules(&self, row: &Row, errors: &mut FieldErrors) {
        if row.id.is_blank() {
            errors.push("id", FieldErrorKind::Required, "row id is required");
        }

        let ValidationMode::Beast(rules) = &self.mode else {
            return;
        };

        let required = [
            ("customerName", &row.customer_name),
            ("vin", &row.vin),
            ("mobile", &row.mobile),
            ("model", &row.model),
            ("repairSystem", &row.repair_system),
            ("sabNumber", &row.sab_number),
            ("company", &row.company),
            ("requester", &row.requester),
            ("acceptedBy", &row.accepted_by),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(field, FieldErrorKind::Required, format!("{field} is required"));
            }
        }

        if !rules.warranty_tag.is_empty()
            && row.repair_system.trim() == rules.warranty_tag
            && row.cntr_rdg >= rules.mileage_limit
        {
            errors.push(
                "cntrRdg",
                FieldErrorKind::Domain,
                format!(
                    "not eligible for warranty repair: mileage {} is at or above {}",
                    row.cntr_rdg, rules.mileage_limit
                ),
            );
        }
    }
}

/// Parses an optional `YYYY-MM-DD` value; blank input means no date.
pub fn parse_calendar_date(field: &'static str, raw: &str) -> Result<Option<Date>, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Date::parse(trimmed, &format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| {
            FieldError::new(
                field,
                FieldErrorKind::Format,
                format!("expected a {DATE_LAYOUT} date, got {trimmed:?}"),
            )
        })
}

pub fn parse_reminder(date: &str, time: &str, subject: &str) -> Result<Reminder, FieldError> {
    let parsed_date = Date::parse(date.trim(), &format_description!("[year]-[month]-[day]"));
    let parsed_time = Time::parse(time.trim(), &format_description!("[hour]:[minute]"));
    match (parsed_date, parsed_time) {
        (Ok(date), Ok(time)) => Ok(Reminder {
            date,
            time,
            subject: subject.to_owned(),
        }),
        _ => Err(FieldError::new(
            "reminder",
            FieldErrorKind::Format,
            format!("reminder needs a {DATE_LAYOUT} date and {TIME_LAYOUT} time, got {date:?} {time:?}"),
        )),
    }
}

fn coerce(object: &Map<String, Value>, errors: &mut FieldErrors) -> Row {
    let id = RowId::new(text(object, "id"));
    let parts = coerce_parts(object.get("parts"), &id);

    Row {
        tracking_id: text(object, "trackingId"),
        customer_name: text(object, "customerName"),
        vin: text(object, "vin"),
        mobile: text(object, "mobile"),
        model: text(object, "model"),
        cntr_rdg: mileage(object.get("cntrRdg"), errors),
        repair_system: text(object, "repairSystem"),
        company: text(object, "company"),
        sab_number: text(object, "sabNumber"),
        requester: text(object, "requester"),
        accepted_by: text(object, "acceptedBy"),
        part_number: text(object, "partNumber"),
        description: text(object, "description"),
        parts,
        status: object
            .get("status")
            .and_then(Value::as_str)
            .and_then(RowStatus::parse)
            .unwrap_or_default(),
        warranty_start: date_field(object, "warrantyStart", errors),
        warranty_end: date_field(object, "warrantyEnd", errors),
        note: text(object, "note"),
        reminder: reminder_field(object.get("reminder"), errors),
        attachment_path: text(object, "attachmentPath"),
        archive_reason: text(object, "archiveReason"),
        archived_at: timestamp_field(object, "archivedAt", errors),
        booking_date: date_field(object, "bookingDate", errors),
        booking_note: text(object, "bookingNote"),
        id,
    }
}

fn text(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn mileage(value: Option<&Value>, errors: &mut FieldErrors) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => {
            let cleaned: String = raw
                .chars()
                .filter(|c| !c.is_whitespace() && *c != ',')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(value) if !value.is_finite() => {
            errors.push(
                "cntrRdg",
                FieldErrorKind::Format,
                format!("mileage must be a finite number, got {value}"),
            );
            0.0
        }
        Some(value) if value < 0.0 => {
            errors.push(
                "cntrRdg",
                FieldErrorKind::Format,
                format!("mileage cannot be negative, got {value}"),
            );
            0.0
        }
        Some(value) => value,
        None => 0.0,
    }
}

fn coerce_parts(value: Option<&Value>, row_id: &RowId) -> Vec<PartEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let entry = item.as_object()?;
            let mut id = text(entry, "id");
            if id.trim().is_empty() {
                id = format!("{row_id}-p{}", index + 1);
            }
            let row_ref = text(entry, "rowId");
            Some(PartEntry {
                id: PartEntryId::new(id),
                part_number: text(entry, "partNumber"),
                description: text(entry, "description"),
                row_id: (!row_ref.trim().is_empty()).then(|| RowId::new(row_ref)),
            })
        })
        .collect()
}

fn date_field(
    object: &Map<String, Value>,
    key: &'static str,
    errors: &mut FieldErrors,
) -> Option<Date> {
    match parse_calendar_date(key, &text(object, key)) {
        Ok(value) => value,
        Err(error) => {
            errors.0.push(error);
            None
        }
    }
}

fn timestamp_field(
    object: &Map<String, Value>,
    key: &'static str,
    errors: &mut FieldErrors,
) -> Option<OffsetDateTime> {
    let raw = text(object, key);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match OffsetDateTime::parse(trimmed, &Rfc3339) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(
                key,
                FieldErrorKind::Format,
                format!("expected an RFC 3339 timestamp, got {trimmed:?}"),
            );
            None
        }
    }
}

fn reminder_field(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Reminder> {
    let object = match value {
        Some(Value::Object(object)) => object,
        Some(Value::Null) | None => return None,
        Some(_) => {
            errors.push(
                "reminder",
                FieldErrorKind::Format,
                "reminder must be an object with date, time and subject",
            );
            return None;
        }
    };

    let date = text(object, "date");
    let time = text(object, "time");
    if date.trim().is_empty() && time.trim().is_empty() {
        return None;
    }
    match parse_reminder(&date, &time, &text(object, "subject")) {
        Ok(reminder) => Some(reminder),
        Err(error) => {
            errors.0.push(error);
            None
        }
    }
}
