// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use tracing::warn;

use crate::{ListKind, ListProvider, Reminder, RowId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReminder {
    pub list: ListKind,
    pub row_id: RowId,
    pub customer_name: String,
    pub reminder: Reminder,
}

/// Reminders due at or before `now`, in radar list order.
pub fn due_reminders<P>(provider: &P, now: PrimitiveDateTime) -> Vec<DueReminder>
where
    P: ListProvider + ?Sized,
{
    let mut due = Vec::new();
    for list in ListKind::RADAR_ORDER {
        let rows = match provider.rows(list) {
            Ok(rows) => rows,
            Err(error) => {
                warn!(list = list.label(), error = %format!("{error:#}"), "skipping unreadable list");
                continue;
            }
        };
        for row in rows.iter() {
            let Some(reminder) = &row.reminder else {
                continue;
            };
            if reminder.due_at() <= now {
                due.push(DueReminder {
                    list,
                    row_id: row.id.clone(),
                    customer_name: row.customer_name.clone(),
                    reminder: reminder.clone(),
                });
            }
        }
    }
    due
}
