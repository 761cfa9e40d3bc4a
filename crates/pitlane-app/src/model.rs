// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::ids::*;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(clock_time, Time, "[hour]:[minute]");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowStatus {
    #[default]
    Pending,
    Ordered,
    Hold,
    Booked,
    Archived,
    Reorder,
    Call,
    #[serde(rename = "Main Sheet")]
    MainSheet,
    Orders,
    Booking,
    Archive,
    #[serde(rename = "Search Result")]
    SearchResult,
}

impl RowStatus {
    pub const ALL: [Self; 12] = [
        Self::Pending,
        Self::Ordered,
        Self::Hold,
        Self::Booked,
        Self::Archived,
        Self::Reorder,
        Self::Call,
        Self::MainSheet,
        Self::Orders,
        Self::Booking,
        Self::Archive,
        Self::SearchResult,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Ordered => "Ordered",
            Self::Hold => "Hold",
            Self::Booked => "Booked",
            Self::Archived => "Archived",
            Self::Reorder => "Reorder",
            Self::Call => "Call",
            Self::MainSheet => "Main Sheet",
            Self::Orders => "Orders",
            Self::Booking => "Booking",
            Self::Archive => "Archive",
            Self::SearchResult => "Search Result",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
    }

    /// The list a row with this status belongs in, if the status implies one.
    pub const fn home_list(self) -> Option<ListKind> {
        match self {
            Self::Ordered => Some(ListKind::Orders),
            Self::Call => Some(ListKind::CallList),
            Self::Booked => Some(ListKind::Booking),
            Self::Archived => Some(ListKind::Archive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ListKind {
    #[serde(rename = "Main Sheet")]
    MainSheet,
    Orders,
    #[serde(rename = "Call List")]
    CallList,
    Booking,
    Archive,
}

impl ListKind {
    /// Scan order for duplicate detection; the first list wins.
    pub const RADAR_ORDER: [Self; 5] = [
        Self::MainSheet,
        Self::Orders,
        Self::CallList,
        Self::Booking,
        Self::Archive,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::MainSheet => "Main Sheet",
            Self::Orders => "Orders",
            Self::CallList => "Call List",
            Self::Booking => "Booking",
            Self::Archive => "Archive",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MainSheet => "main_sheet",
            Self::Orders => "orders",
            Self::CallList => "call_list",
            Self::Booking => "booking",
            Self::Archive => "archive",
        }
    }

    /// Accepts storage keys, display labels and kebab-case slugs.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::RADAR_ORDER
            .into_iter()
            .find(|list| list.as_str() == normalized)
    }
}

/// Where a row should move after its status changed, if anywhere.
///
/// Rows never leave the archive through a status change.
pub fn relocation_target(current: ListKind, status: RowStatus) -> Option<ListKind> {
    if current == ListKind::Archive {
        return None;
    }
    status.home_list().filter(|target| *target != current)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModalKind {
    Note,
    Reminder,
    Attachment,
    Archive,
}

impl ModalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Reminder => "reminder",
            Self::Attachment => "attachment",
            Self::Archive => "archive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartEntry {
    pub id: PartEntryId,
    pub part_number: String,
    pub description: String,
    pub row_id: Option<RowId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(with = "calendar_date")]
    pub date: Date,
    #[serde(with = "clock_time")]
    pub time: Time,
    pub subject: String,
}

impl Reminder {
    pub fn due_at(&self) -> PrimitiveDateTime {
        PrimitiveDateTime::new(self.date, self.time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    pub tracking_id: String,
    pub customer_name: String,
    pub vin: String,
    pub mobile: String,
    pub model: String,
    pub cntr_rdg: f64,
    pub repair_system: String,
    pub company: String,
    pub sab_number: String,
    pub requester: String,
    pub accepted_by: String,
    pub part_number: String,
    pub description: String,
    pub parts: Vec<PartEntry>,
    pub status: RowStatus,
    #[serde(with = "calendar_date::option")]
    pub warranty_start: Option<Date>,
    #[serde(with = "calendar_date::option")]
    pub warranty_end: Option<Date>,
    pub note: String,
    pub reminder: Option<Reminder>,
    pub attachment_path: String,
    pub archive_reason: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub archived_at: Option<OffsetDateTime>,
    #[serde(with = "calendar_date::option")]
    pub booking_date: Option<Date>,
    pub booking_note: String,
}

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Mirrors the first part entry into the legacy single-part fields.
    pub fn sync_legacy_part(&mut self) {
        if let Some(first) = self.parts.first() {
            self.part_number = first.part_number.clone();
            self.description = first.description.clone();
        }
    }
}
