// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use pitlane_app::{
    ChannelSignal, FieldErrorKind, ListKind, ModalKind, Row, RowId, RowModals, RowPatch,
    RowSchema, RowStatus, RowUpdater, confirm_booking, parse_reminder, radar,
};
use pitlane_db::{Store, validate_db_path};
use pitlane_testkit::{OrderFaker, fixture_datetime, temp_db_path};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::date;

fn bootstrapped() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    Ok(store)
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("/tmp/pitlane.db").is_ok());
    assert!(validate_db_path(":memory:").is_ok());
}

#[test]
fn bootstrap_is_idempotent_on_disk() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.insert_row(ListKind::MainSheet, &Row::new("r-1"))?;
    }

    let reopened = Store::open(&path)?;
    reopened.bootstrap()?;
    assert_eq!(reopened.list_rows(ListKind::MainSheet)?.len(), 1);
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.raw_connection().execute_batch(
        "
        CREATE TABLE rows (
          id TEXT PRIMARY KEY,
          list TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );
        ",
    )?;

    let error = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = error.to_string();
    assert!(message.contains("table `rows` is missing required columns"));
    assert!(message.contains("position"));
    assert!(message.contains("body"));
    Ok(())
}

#[test]
fn rows_keep_insertion_order_per_list() -> Result<()> {
    let store = bootstrapped()?;
    let mut faker = OrderFaker::new(21);
    let rows: Vec<Row> = (0..4).map(|_| faker.row()).collect();
    for row in &rows {
        store.insert_row(ListKind::Orders, row)?;
    }

    let stored = store.list_rows(ListKind::Orders)?;
    assert_eq!(stored, rows);
    assert!(store.list_rows(ListKind::MainSheet)?.is_empty());
    Ok(())
}

#[test]
fn insert_normalizes_legacy_part_fields() -> Result<()> {
    let store = bootstrapped()?;
    let mut row = OrderFaker::new(5).row();
    row.part_number = "STALE".to_owned();
    row.description = "Stale".to_owned();
    store.insert_row(ListKind::MainSheet, &row)?;

    let (_, stored) = store
        .get_row(&row.id)?
        .expect("inserted row can be loaded");
    assert_eq!(stored.part_number, row.parts[0].part_number);
    assert_eq!(stored.description, row.parts[0].description);
    Ok(())
}

#[test]
fn insert_rejects_rows_without_id_and_duplicate_ids() -> Result<()> {
    let store = bootstrapped()?;
    let error = store
        .insert_row(ListKind::MainSheet, &Row::new(""))
        .expect_err("blank id should fail");
    assert!(error.to_string().contains("row id is required"));

    store.insert_row(ListKind::MainSheet, &Row::new("r-1"))?;
    let error = store
        .insert_row(ListKind::Archive, &Row::new("r-1"))
        .expect_err("duplicate id should fail");
    assert!(format!("{error:#}").contains("unique"));
    Ok(())
}

#[test]
fn import_batch_reports_rejections_without_aborting() -> Result<()> {
    let mut store = bootstrapped()?;
    let mut faker = OrderFaker::new(8);
    let good = faker.raw_row();
    let raws = vec![
        good.clone(),
        json!({ "id": "sparse", "vin": "VF1ABC" }),
        json!({ "vin": "missing id" }),
    ];

    let report = store.import_batch(ListKind::MainSheet, &raws, &RowSchema::beast())?;
    assert_eq!(report.inserted.len(), 1);
    assert_eq!(
        report
            .rejected
            .iter()
            .map(|(index, _)| *index)
            .collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(report.rejected[0].1.get("customerName").is_some());
    assert_eq!(store.list_rows(ListKind::MainSheet)?.len(), 1);
    Ok(())
}

#[test]
fn import_batch_rejects_stored_and_repeated_ids() -> Result<()> {
    let mut store = bootstrapped()?;
    store.insert_row(ListKind::Archive, &Row::new("taken"))?;

    let raws = vec![
        json!({ "id": "fresh-1" }),
        json!({ "id": "taken" }),
        json!({ "id": "fresh-2" }),
        json!({ "id": "fresh-1" }),
    ];
    let report = store.import_batch(ListKind::Orders, &raws, &RowSchema::default())?;

    let inserted: Vec<&str> = report.inserted.iter().map(RowId::as_str).collect();
    assert_eq!(inserted, vec!["fresh-1", "fresh-2"]);
    assert_eq!(
        report
            .rejected
            .iter()
            .map(|(index, _)| *index)
            .collect::<Vec<_>>(),
        vec![1, 3]
    );
    for (_, errors) in &report.rejected {
        let error = errors.get("id").expect("duplicate id is reported on id");
        assert_eq!(error.kind, FieldErrorKind::Domain);
    }
    assert_eq!(store.list_rows(ListKind::Orders)?.len(), 2);
    assert_eq!(store.list_rows(ListKind::Archive)?.len(), 1);
    Ok(())
}

#[test]
fn radar_reads_through_the_store() -> Result<()> {
    let store = bootstrapped()?;
    let mut lamp = Row::new("r-1");
    lamp.vin = "VF1ABC".to_owned();
    lamp.part_number = "7711".to_owned();
    lamp.description = "Headlamp".to_owned();
    store.insert_row(ListKind::Booking, &lamp)?;

    let hit = radar(&store, "vf1abc", "7711");
    assert!(hit.is_duplicate);
    assert_eq!(hit.location, Some(ListKind::Booking));
    assert_eq!(hit.existing_description.as_deref(), Some("Headlamp"));
    Ok(())
}

#[test]
fn update_relocates_on_status_change() -> Result<()> {
    let mut store = bootstrapped()?;
    store.insert_row(ListKind::Booking, &Row::new("existing"))?;
    store.insert_row(ListKind::MainSheet, &Row::new("r-1"))?;

    confirm_booking(&mut store, &RowId::from("r-1"), date!(2026 - 11 - 02), "bay 2")?;

    assert!(store.list_rows(ListKind::MainSheet)?.is_empty());
    let booking = store.list_rows(ListKind::Booking)?;
    let ids: Vec<&str> = booking.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["existing", "r-1"]);
    assert_eq!(booking[1].status, RowStatus::Booked);
    assert_eq!(booking[1].booking_note, "bay 2");
    Ok(())
}

#[test]
fn update_for_unknown_row_is_a_no_op() -> Result<()> {
    let mut store = bootstrapped()?;
    store.update(
        &RowId::from("ghost"),
        &RowPatch {
            note: Some("nobody home".to_owned()),
            ..RowPatch::default()
        },
    )?;
    assert!(store.get_row(&RowId::from("ghost"))?.is_none());
    Ok(())
}

#[test]
fn modal_workflow_commits_through_store() -> Result<()> {
    let mut store = bootstrapped()?;
    let row = OrderFaker::new(13).row();
    store.insert_row(ListKind::MainSheet, &row)?;

    let (signal, rx) = ChannelSignal::channel();
    let mut modals = RowModals::default();

    modals.open(ModalKind::Reminder, row.clone());
    let reminder = parse_reminder("2026-11-01", "10:30", "Parts ETA")?;
    modals.save_reminder(Some(reminder.clone()), &mut store, &signal)?;
    assert!(rx.try_recv().is_ok());

    let stamp = OffsetDateTime::parse(fixture_datetime(), &Rfc3339)?;
    modals.open(ModalKind::Archive, row.clone());
    modals.archive_at("Customer cancelled", stamp, &mut store)?;
    assert!(modals.is_idle());

    let (list, stored) = store.get_row(&row.id)?.expect("row still stored");
    assert_eq!(list, ListKind::Archive);
    assert_eq!(stored.status, RowStatus::Archived);
    assert_eq!(stored.archive_reason, "Customer cancelled");
    assert_eq!(stored.archived_at, Some(stamp));
    assert_eq!(stored.reminder, Some(reminder));
    Ok(())
}

#[test]
fn move_and_delete_report_unknown_ids() -> Result<()> {
    let store = bootstrapped()?;
    store.insert_row(ListKind::Orders, &Row::new("r-1"))?;

    assert!(store.move_row(&RowId::from("r-1"), ListKind::CallList)?);
    assert!(!store.move_row(&RowId::from("r-2"), ListKind::CallList)?);

    let counts = store.counts()?;
    assert!(counts.contains(&(ListKind::CallList, 1)));
    assert!(counts.contains(&(ListKind::Orders, 0)));

    assert!(store.delete_row(&RowId::from("r-1"))?);
    assert!(!store.delete_row(&RowId::from("r-1"))?);
    Ok(())
}
