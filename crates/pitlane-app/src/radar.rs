// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Duplicate detection across the five lists.
//!
//! The first pass looks for the exact VIN + part number pair; failing that,
//! a second pass looks for the part number alone and surfaces the
//! description it was filed under. Lists are visited in
//! [`ListKind::RADAR_ORDER`] and rows in their stored order, so the first
//! hit is deterministic.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::warn;

use crate::{ListKind, ListProvider, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarHit {
    pub is_duplicate: bool,
    pub location: Option<ListKind>,
    pub existing_description: Option<String>,
}

impl RadarHit {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Never fails: unreadable lists are skipped and blank input finds nothing.
pub fn radar<P>(provider: &P, vin: &str, part_number: &str) -> RadarHit
where
    P: ListProvider + ?Sized,
{
    let vin = vin.trim().to_uppercase();
    let part_number = part_number.trim().to_uppercase();
    if vin.is_empty() || part_number.is_empty() {
        return RadarHit::none();
    }

    let snapshot = snapshot(provider);
    let part_matches = |row: &Row| row.part_number.trim().to_uppercase() == part_number;

    for (list, rows) in &snapshot {
        if let Some(row) = rows
            .iter()
            .find(|row| part_matches(row) && row.vin.trim().to_uppercase() == vin)
        {
            return RadarHit {
                is_duplicate: true,
                location: Some(*list),
                existing_description: Some(row.description.clone()),
            };
        }
    }

    for (_, rows) in &snapshot {
        if let Some(row) = rows.iter().find(|row| part_matches(row)) {
            return RadarHit {
                is_duplicate: false,
                location: None,
                existing_description: Some(row.description.clone()),
            };
        }
    }

    RadarHit::none()
}

fn snapshot<P>(provider: &P) -> Vec<(ListKind, Cow<'_, [Row]>)>
where
    P: ListProvider + ?Sized,
{
    ListKind::RADAR_ORDER
        .into_iter()
        .filter_map(|list| match provider.rows(list) {
            Ok(rows) => Some((list, rows)),
            Err(error) => {
                warn!(list = list.label(), error = %format!("{error:#}"), "radar skipped unreadable list");
                None
            }
        })
        .collect()
}
