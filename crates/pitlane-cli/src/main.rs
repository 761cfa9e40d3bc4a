// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use pitlane_app::{ListKind, RowId};
use pitlane_db::Store;
use runtime::{Command, Runtime};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pitlane --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_tracing(config.log_level());

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let mut store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or PITLANE_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }

    let recheck_delay = config.recheck_delay()?;
    if options.check_only {
        return Ok(());
    }

    let command = options.command.unwrap_or(Command::Lists);
    debug!(?command, db = %db_path.display(), "running command");
    let mut runtime = Runtime::new(
        &mut store,
        config.schema(),
        config.beast_rules(),
        recheck_delay,
    );
    runtime.execute(&command, &mut io::stdout().lock())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pitlane={level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            flag if flag.starts_with('-') => {
                return Err(anyhow!(
                    "unknown argument {flag:?}; run with --help to see supported options"
                ));
            }
            name => {
                let rest: Vec<String> = iter.map(|item| item.as_ref().to_owned()).collect();
                options.command = Some(parse_command(name, rest)?);
                break;
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command> {
    let mut args = args.into_iter();
    let mut required = |what: &str| {
        args.next()
            .ok_or_else(|| anyhow!("`{name}` requires {what}; run with --help for usage"))
    };

    let command = match name {
        "lists" => Command::Lists,
        "due" => Command::Due,
        "radar" => Command::Radar {
            vin: required("a VIN")?,
            part_number: required("a part number")?,
        },
        "note" => Command::Note {
            id: RowId::new(required("a row id")?),
            text: required("note text")?,
        },
        "remind" => Command::Remind {
            id: RowId::new(required("a row id")?),
            date: required("a YYYY-MM-DD date")?,
            time: required("an HH:MM time")?,
            subject: required("a subject")?,
        },
        "attach" => Command::Attach {
            id: RowId::new(required("a row id")?),
            path: required("a file path")?,
        },
        "archive" => Command::Archive {
            id: RowId::new(required("a row id")?),
            reason: required("a reason")?,
        },
        "book" => Command::Book {
            id: RowId::new(required("a row id")?),
            date: required("a YYYY-MM-DD date")?,
            note: args.next().unwrap_or_default(),
        },
        "import" => return parse_import(args),
        unknown => {
            return Err(anyhow!(
                "unknown command {unknown:?}; run with --help to see supported commands"
            ));
        }
    };

    if let Some(extra) = args.next() {
        return Err(anyhow!(
            "unexpected argument {extra:?} after `{name}`; quote values that contain spaces"
        ));
    }
    Ok(command)
}

fn parse_import(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let mut path = None;
    let mut list = ListKind::MainSheet;
    let mut beast = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--list" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--list requires a list name"))?;
                list = ListKind::parse(&value).ok_or_else(|| {
                    anyhow!(
                        "unknown list {value:?}; use one of: {}",
                        ListKind::RADAR_ORDER.map(ListKind::as_str).join(", ")
                    )
                })?;
            }
            "--beast" => {
                beast = true;
            }
            other if path.is_none() => {
                path = Some(PathBuf::from(other));
            }
            other => {
                return Err(anyhow!("unexpected argument {other:?} after `import`"));
            }
        }
    }

    let path = path.ok_or_else(|| anyhow!("`import` requires a JSON file path"))?;
    Ok(Command::Import { path, list, beast })
}

fn print_help() {
    println!("pitlane: service-center order lists");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Run against seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --help                   Show this help");
    println!();
    println!("commands:");
    println!("  lists                                  Row counts per list (default)");
    println!("  import <file.json> [--list <name>] [--beast]");
    println!("                                         Validate and store raw rows");
    println!("  radar <vin> <part>                     Cross-list duplicate check (JSON)");
    println!("  note <id> <text>                       Save a note on a row");
    println!("  remind <id> <date> <time> <subject>    Set a reminder (YYYY-MM-DD HH:MM)");
    println!("  attach <id> <path>                     Attach a file path to a row");
    println!("  archive <id> <reason>                  Archive a row");
    println!("  book <id> <date> [note]                Confirm a booking");
    println!("  due                                    Reminders due now");
}
