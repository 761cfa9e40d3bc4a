// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::borrow::Cow;
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::{ListKind, Reminder, Row, RowId, RowStatus, relocation_target};

/// Read access to the five named lists.
pub trait ListProvider {
    fn rows(&self, list: ListKind) -> Result<Cow<'_, [Row]>>;
}

/// Applies a partial change to whichever list currently holds the row.
///
/// Unknown ids are a no-op, not an error.
pub trait RowUpdater {
    fn update(&mut self, row_id: &RowId, patch: &RowPatch) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    pub status: Option<RowStatus>,
    pub note: Option<String>,
    pub reminder: Option<Option<Reminder>>,
    pub attachment_path: Option<String>,
    pub archive_reason: Option<String>,
    pub archived_at: Option<OffsetDateTime>,
    pub booking_date: Option<Date>,
    pub booking_note: Option<String>,
}

impl RowPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, row: &mut Row) {
        if let Some(status) = self.status {
            row.status = status;
        }
        if let Some(note) = &self.note {
            row.note.clone_from(note);
        }
        if let Some(reminder) = &self.reminder {
            row.reminder.clone_from(reminder);
        }
        if let Some(path) = &self.attachment_path {
            row.attachment_path.clone_from(path);
        }
        if let Some(reason) = &self.archive_reason {
            row.archive_reason.clone_from(reason);
        }
        if let Some(archived_at) = self.archived_at {
            row.archived_at = Some(archived_at);
        }
        if let Some(booking_date) = self.booking_date {
            row.booking_date = Some(booking_date);
        }
        if let Some(booking_note) = &self.booking_note {
            row.booking_note.clone_from(booking_note);
        }
    }
}

/// In-memory list store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lists {
    main_sheet: Vec<Row>,
    orders: Vec<Row>,
    call_list: Vec<Row>,
    booking: Vec<Row>,
    archive: Vec<Row>,
}

impl Lists {
    pub fn rows_in(&self, list: ListKind) -> &[Row] {
        match list {
            ListKind::MainSheet => &self.main_sheet,
            ListKind::Orders => &self.orders,
            ListKind::CallList => &self.call_list,
            ListKind::Booking => &self.booking,
            ListKind::Archive => &self.archive,
        }
    }

    fn rows_in_mut(&mut self, list: ListKind) -> &mut Vec<Row> {
        match list {
            ListKind::MainSheet => &mut self.main_sheet,
            ListKind::Orders => &mut self.orders,
            ListKind::CallList => &mut self.call_list,
            ListKind::Booking => &mut self.booking,
            ListKind::Archive => &mut self.archive,
        }
    }

    pub fn push(&mut self, list: ListKind, row: Row) {
        self.rows_in_mut(list).push(row);
    }

    pub fn len(&self) -> usize {
        ListKind::RADAR_ORDER
            .into_iter()
            .map(|list| self.rows_in(list).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locate(&self, row_id: &RowId) -> Option<(ListKind, usize)> {
        ListKind::RADAR_ORDER.into_iter().find_map(|list| {
            self.rows_in(list)
                .iter()
                .position(|row| row.id == *row_id)
                .map(|index| (list, index))
        })
    }

    pub fn find(&self, row_id: &RowId) -> Option<(ListKind, &Row)> {
        let (list, index) = self.locate(row_id)?;
        Some((list, &self.rows_in(list)[index]))
    }

    pub fn remove(&mut self, row_id: &RowId) -> Option<(ListKind, Row)> {
        let (list, index) = self.locate(row_id)?;
        Some((list, self.rows_in_mut(list).remove(index)))
    }

    /// Moves a row to the end of `to`. Returns false for unknown ids.
    pub fn move_row(&mut self, row_id: &RowId, to: ListKind) -> bool {
        let Some((from, row)) = self.remove(row_id) else {
            return false;
        };
        debug!(row = %row_id, from = from.label(), to = to.label(), "moving row");
        self.push(to, row);
        true
    }
}

impl ListProvider for Lists {
    fn rows(&self, list: ListKind) -> Result<Cow<'_, [Row]>> {
        Ok(Cow::Borrowed(self.rows_in(list)))
    }
}

impl RowUpdater for Lists {
    fn update(&mut self, row_id: &RowId, patch: &RowPatch) -> Result<()> {
        let Some((list, index)) = self.locate(row_id) else {
            debug!(row = %row_id, "update for unknown row ignored");
            return Ok(());
        };

        let row = &mut self.rows_in_mut(list)[index];
        patch.apply(row);
        if let Some(target) = relocation_target(list, row.status) {
            self.move_row(row_id, target);
        }
        Ok(())
    }
}
