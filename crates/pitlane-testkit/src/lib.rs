// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pitlane_app::{ListKind, Lists, Row, RowSchema, WARRANTY_REPAIR_SYSTEM};
use serde_json::{Value, json};
use std::path::PathBuf;

const MODELS: [&str; 10] = [
    "Duster", "Clio", "Megane", "Koleos", "Captur", "Symbol", "Logan", "Sandero", "Talisman",
    "Kadjar",
];

const COMPANIES: [&str; 4] = ["Renault", "Dacia", "Nissan", "Fleet Services"];

const REPAIR_SYSTEMS: [&str; 3] = ["Paid", "Internal", WARRANTY_REPAIR_SYSTEM];

const FIRST_NAMES: [&str; 12] = [
    "Huda", "Omar", "Lina", "Khalid", "Maha", "Yousef", "Sara", "Faisal", "Noura", "Tariq",
    "Reem", "Ali",
];
const LAST_NAMES: [&str; 10] = [
    "Saleh", "Nasser", "Hamad", "Ali", "Haddad", "Karim", "Mansour", "Farouk", "Qasim", "Aziz",
];

const PARTS: [(&str, &str); 12] = [
    ("7711", "Headlamp"),
    ("9090", "Brake Pad"),
    ("9091", "Brake Disc"),
    ("8200", "Oil Filter"),
    ("4410", "Wiper Blade"),
    ("3301", "Air Filter"),
    ("5520", "Spark Plug"),
    ("6610", "Timing Belt"),
    ("1208", "Side Mirror"),
    ("2290", "Radiator Hose"),
    ("7420", "Fuel Pump"),
    ("8815", "Cabin Filter"),
];

const VIN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible service-center orders.
#[derive(Debug, Clone)]
pub struct OrderFaker {
    rng: DeterministicRng,
    seed: u64,
    issued: u64,
}

impl OrderFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            issued: 0,
        }
    }

    pub fn vin(&mut self) -> String {
        (0..17)
            .map(|_| char::from(VIN_ALPHABET[self.rng.int_n(VIN_ALPHABET.len())]))
            .collect()
    }

    pub fn part(&mut self) -> (&'static str, &'static str) {
        PARTS[self.rng.int_n(PARTS.len())]
    }

    /// A raw order that passes Beast Mode: every order field is filled and
    /// warranty jobs stay under the mileage limit.
    pub fn raw_row(&mut self) -> Value {
        self.issued += 1;
        let id = format!("ord-{}-{}", self.seed, self.issued);
        let repair_system = self.pick(&REPAIR_SYSTEMS);
        let mileage = if repair_system == WARRANTY_REPAIR_SYSTEM {
            self.int_range(500, 99_999)
        } else {
            self.int_range(500, 240_000)
        };
        let part_count = 1 + self.rng.int_n(3);
        let parts: Vec<Value> = (0..part_count)
            .map(|index| {
                let (part_number, description) = self.part();
                json!({
                    "id": format!("{id}-p{}", index + 1),
                    "partNumber": part_number,
                    "description": description,
                    "rowId": id,
                })
            })
            .collect();

        json!({
            "id": id,
            "trackingId": format!("TRK-{:05}", self.int_range(1, 99_999)),
            "customerName": format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES)),
            "vin": self.vin(),
            "mobile": format!("05{:08}", self.int_range(0, 99_999_999)),
            "model": self.pick(&MODELS),
            "cntrRdg": mileage,
            "repairSystem": repair_system,
            "company": self.pick(&COMPANIES),
            "sabNumber": format!("SAB-{:04}", self.int_range(1, 9_999)),
            "requester": self.pick(&FIRST_NAMES),
            "acceptedBy": self.pick(&FIRST_NAMES),
            "parts": parts,
        })
    }

    pub fn row(&mut self) -> Row {
        let raw = self.raw_row();
        RowSchema::beast()
            .parse(&raw)
            .unwrap_or_else(|errors| panic!("faker produced invalid row {raw}: {errors}"))
    }

    /// Fills each list with `per_list` rows.
    pub fn lists(&mut self, per_list: usize) -> Lists {
        let mut lists = Lists::default();
        for list in ListKind::RADAR_ORDER {
            for _ in 0..per_list {
                let row = self.row();
                lists.push(list, row);
            }
        }
        lists
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + self.rng.next_u64() % (max - min + 1)
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("pitlane.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn part_catalog() -> &'static [(&'static str, &'static str)] {
    &PARTS
}
