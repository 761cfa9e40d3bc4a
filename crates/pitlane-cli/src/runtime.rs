// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pitlane_app::{
    BeastRules, ChannelSignal, ListKind, ModalEvent, ModalKind, RecheckRequest, Row, RowId,
    RowModals, RowSchema, ValidationMode, confirm_booking, due_reminders, parse_calendar_date,
    parse_reminder, radar,
};
use pitlane_db::Store;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lists,
    Import {
        path: PathBuf,
        list: ListKind,
        beast: bool,
    },
    Radar {
        vin: String,
        part_number: String,
    },
    Note {
        id: RowId,
        text: String,
    },
    Remind {
        id: RowId,
        date: String,
        time: String,
        subject: String,
    },
    Attach {
        id: RowId,
        path: String,
    },
    Archive {
        id: RowId,
        reason: String,
    },
    Book {
        id: RowId,
        date: String,
        note: String,
    },
    Due,
}

pub struct Runtime<'a> {
    store: &'a mut Store,
    schema: RowSchema,
    beast_rules: BeastRules,
    modals: RowModals,
    signal: ChannelSignal,
    rechecks: Receiver<RecheckRequest>,
}

impl<'a> Runtime<'a> {
    /// `beast_rules` apply to imports forced into Beast Mode with `--beast`.
    pub fn new(
        store: &'a mut Store,
        schema: RowSchema,
        beast_rules: BeastRules,
        recheck_delay: Duration,
    ) -> Self {
        let (signal, rechecks) = ChannelSignal::channel();
        Self {
            store,
            schema,
            beast_rules,
            modals: RowModals::with_recheck_delay(recheck_delay),
            signal,
            rechecks,
        }
    }

    pub fn execute(&mut self, command: &Command, out: &mut dyn Write) -> Result<()> {
        match command {
            Command::Lists => self.print_lists(out),
            Command::Import { path, list, beast } => self.import(path, *list, *beast, out),
            Command::Radar { vin, part_number } => {
                let hit = radar(&*self.store, vin, part_number);
                let rendered = serde_json::to_string_pretty(&hit).context("encode radar result")?;
                writeln!(out, "{rendered}")?;
                Ok(())
            }
            Command::Note { id, text } => {
                self.open_modal(ModalKind::Note, id)?;
                let events = self.modals.save_note(text, &mut *self.store)?;
                report(&events, out)
            }
            Command::Remind {
                id,
                date,
                time,
                subject,
            } => {
                let reminder = parse_reminder(date, time, subject)?;
                self.open_modal(ModalKind::Reminder, id)?;
                let events =
                    self.modals
                        .save_reminder(Some(reminder), &mut *self.store, &self.signal)?;
                report(&events, out)?;
                self.drain_rechecks(out)
            }
            Command::Attach { id, path } => {
                self.open_modal(ModalKind::Attachment, id)?;
                let events = self.modals.save_attachment(path, &mut *self.store)?;
                report(&events, out)
            }
            Command::Archive { id, reason } => {
                self.open_modal(ModalKind::Archive, id)?;
                let events = self.modals.archive(reason, &mut *self.store)?;
                report(&events, out)
            }
            Command::Book { id, date, note } => {
                let booking_date = parse_calendar_date("bookingDate", date)?
                    .ok_or_else(|| anyhow!("booking date is required"))?;
                self.require_row(id)?;
                confirm_booking(&mut *self.store, id, booking_date, note)?;
                writeln!(out, "booked {id} for {date}")?;
                Ok(())
            }
            Command::Due => self.print_due(now_utc(), out),
        }
    }

    pub fn print_due(&self, now: PrimitiveDateTime, out: &mut dyn Write) -> Result<()> {
        let due = due_reminders(&*self.store, now);
        if due.is_empty() {
            writeln!(out, "no reminders due")?;
            return Ok(());
        }
        for item in due {
            let at = item
                .reminder
                .due_at()
                .format(&format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .context("format reminder time")?;
            writeln!(
                out,
                "{at} [{}] {} ({})",
                item.list.label(),
                item.reminder.subject,
                item.row_id,
            )?;
        }
        Ok(())
    }

    fn print_lists(&self, out: &mut dyn Write) -> Result<()> {
        for (list, count) in self.store.counts()? {
            writeln!(out, "{:<10} {count}", list.label())?;
        }
        Ok(())
    }

    fn import(
        &mut self,
        path: &Path,
        list: ListKind,
        beast: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read import file {}", path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parse JSON in {}", path.display()))?;
        let raws = match value {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => bail!(
                "import file {} must hold a JSON object or an array of objects",
                path.display()
            ),
        };

        let schema = if beast {
            RowSchema::new(ValidationMode::Beast(self.beast_rules.clone()))
        } else {
            self.schema.clone()
        };
        let report = self.store.import_batch(list, &raws, &schema)?;
        writeln!(
            out,
            "imported {} rows into {}",
            report.inserted.len(),
            list.label()
        )?;
        for (index, errors) in &report.rejected {
            writeln!(out, "rejected row {index}: {errors}")?;
        }
        Ok(())
    }

    fn require_row(&self, id: &RowId) -> Result<Row> {
        self.store
            .get_row(id)?
            .map(|(_, row)| row)
            .ok_or_else(|| anyhow!("no row with id {id}; run `pitlane lists` to check the store"))
    }

    fn open_modal(&mut self, kind: ModalKind, id: &RowId) -> Result<()> {
        let row = self.require_row(id)?;
        self.modals.open(kind, row);
        Ok(())
    }

    // Waits out each pending recheck request and then lists due reminders.
    fn drain_rechecks(&mut self, out: &mut dyn Write) -> Result<()> {
        while let Ok(request) = self.rechecks.try_recv() {
            let wait = request.not_before.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                debug!(?wait, "waiting for reminder recheck");
                std::thread::sleep(wait);
            }
            self.print_due(now_utc(), out)?;
        }
        Ok(())
    }
}

fn report(events: &[ModalEvent], out: &mut dyn Write) -> Result<()> {
    for event in events {
        if let ModalEvent::Committed { kind, row_id } = event {
            info!(kind = kind.as_str(), row = %row_id, "saved");
            writeln!(out, "saved {} on {row_id}", kind.as_str())?;
        }
    }
    Ok(())
}

fn now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}
