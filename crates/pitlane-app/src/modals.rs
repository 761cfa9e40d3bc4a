// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::Duration;
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::{ModalKind, Reminder, ReminderSignal, Row, RowId, RowPatch, RowStatus, RowUpdater};

pub const REMINDER_RECHECK_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveModal {
    pub kind: ModalKind,
    pub row: Row,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalCommand {
    Open(ModalKind, Row),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalEvent {
    Opened { kind: ModalKind, row_id: RowId },
    Discarded { kind: ModalKind, row_id: RowId },
    Committed { kind: ModalKind, row_id: RowId },
    Closed { kind: ModalKind, row_id: RowId },
}

/// Single-row side actions. At most one modal is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct RowModals {
    active: Option<ActiveModal>,
    recheck_delay: Duration,
}

impl Default for RowModals {
    fn default() -> Self {
        Self {
            active: None,
            recheck_delay: REMINDER_RECHECK_DELAY,
        }
    }
}

impl RowModals {
    pub fn with_recheck_delay(recheck_delay: Duration) -> Self {
        Self {
            active: None,
            recheck_delay,
        }
    }

    pub fn active(&self) -> Option<&ActiveModal> {
        self.active.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn dispatch(&mut self, command: ModalCommand) -> Vec<ModalEvent> {
        match command {
            ModalCommand::Open(kind, row) => self.open(kind, row),
            ModalCommand::Close => self.close().into_iter().collect(),
        }
    }

    /// Opening over an active modal drops the earlier edit unsaved.
    pub fn open(&mut self, kind: ModalKind, row: Row) -> Vec<ModalEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(previous) = self.active.take() {
            debug!(
                kind = previous.kind.as_str(),
                row = %previous.row.id,
                "discarding unsaved modal"
            );
            events.push(ModalEvent::Discarded {
                kind: previous.kind,
                row_id: previous.row.id,
            });
        }
        events.push(ModalEvent::Opened {
            kind,
            row_id: row.id.clone(),
        });
        self.active = Some(ActiveModal { kind, row });
        events
    }

    pub fn close(&mut self) -> Option<ModalEvent> {
        let previous = self.active.take()?;
        Some(ModalEvent::Closed {
            kind: previous.kind,
            row_id: previous.row.id,
        })
    }

    pub fn save_note<U>(&mut self, note: &str, updater: &mut U) -> Result<Vec<ModalEvent>>
    where
        U: RowUpdater + ?Sized,
    {
        let patch = RowPatch {
            note: Some(note.to_owned()),
            ..RowPatch::default()
        };
        self.commit(ModalKind::Note, &patch, updater)
    }

    /// A committed reminder also asks the reminder checker to look again.
    pub fn save_reminder<U, S>(
        &mut self,
        reminder: Option<Reminder>,
        updater: &mut U,
        signal: &S,
    ) -> Result<Vec<ModalEvent>>
    where
        U: RowUpdater + ?Sized,
        S: ReminderSignal + ?Sized,
    {
        let patch = RowPatch {
            reminder: Some(reminder),
            ..RowPatch::default()
        };
        let events = self.commit(ModalKind::Reminder, &patch, updater)?;
        if !events.is_empty() {
            signal.request_recheck(self.recheck_delay);
        }
        Ok(events)
    }

    pub fn save_attachment<U>(&mut self, path: &str, updater: &mut U) -> Result<Vec<ModalEvent>>
    where
        U: RowUpdater + ?Sized,
    {
        let patch = RowPatch {
            attachment_path: Some(path.to_owned()),
            ..RowPatch::default()
        };
        self.commit(ModalKind::Attachment, &patch, updater)
    }

    pub fn archive<U>(&mut self, reason: &str, updater: &mut U) -> Result<Vec<ModalEvent>>
    where
        U: RowUpdater + ?Sized,
    {
        self.archive_at(reason, OffsetDateTime::now_utc(), updater)
    }

    pub fn archive_at<U>(
        &mut self,
        reason: &str,
        archived_at: OffsetDateTime,
        updater: &mut U,
    ) -> Result<Vec<ModalEvent>>
    where
        U: RowUpdater + ?Sized,
    {
        let patch = RowPatch {
            status: Some(RowStatus::Archived),
            archive_reason: Some(reason.to_owned()),
            archived_at: Some(archived_at),
            ..RowPatch::default()
        };
        self.commit(ModalKind::Archive, &patch, updater)
    }

    // The modal only closes once the updater accepted the patch, so a failed
    // write leaves the edit open for another attempt.
    fn commit<U>(
        &mut self,
        kind: ModalKind,
        patch: &RowPatch,
        updater: &mut U,
    ) -> Result<Vec<ModalEvent>>
    where
        U: RowUpdater + ?Sized,
    {
        let Some(active) = &self.active else {
            debug!(kind = kind.as_str(), "save with no selected row ignored");
            return Ok(Vec::new());
        };
        let row_id = active.row.id.clone();

        updater.update(&row_id, patch)?;
        debug!(kind = kind.as_str(), row = %row_id, "modal committed");

        let mut events = vec![ModalEvent::Committed { kind, row_id }];
        events.extend(self.close());
        Ok(events)
    }
}

/// Confirms a booking: the row becomes `Booked` and carries the appointment.
pub fn confirm_booking<U>(
    updater: &mut U,
    row_id: &RowId,
    booking_date: Date,
    note: &str,
) -> Result<()>
where
    U: RowUpdater + ?Sized,
{
    let patch = RowPatch {
        status: Some(RowStatus::Booked),
        booking_date: Some(booking_date),
        booking_note: Some(note.to_owned()),
        ..RowPatch::default()
    };
    updater.update(row_id, &patch)
}
