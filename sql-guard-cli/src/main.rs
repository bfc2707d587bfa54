//! sql-guard command-line front end.
//!
//! Reads one SQL statement (argument or stdin), checks it against a policy
//! file and reports the decision.
//!
//! Exit codes: `0` allowed, `1` rejected by the policy, `2` parse error or
//! usage/configuration failure.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sql_guard::{CheckOutcome, Dialect, Guard, Policy};
use tracing_subscriber::EnvFilter;

const EXIT_REJECTED: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Check a SQL statement against an allowlist policy.
#[derive(Debug, Parser)]
#[command(name = "sql-guard", version, about)]
struct Cli {
    /// Policy file, TOML or JSON (chosen by extension). Without one every slot is absent.
    #[arg(short, long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// SQL dialect: mysql, generic, postgres, sqlite.
    #[arg(short, long, default_value_t = Dialect::MySql)]
    dialect: Dialect,

    /// Print the outcome as a JSON object.
    #[arg(long)]
    json: bool,

    /// SQL text. Read from stdin when omitted.
    sql: Option<String>,
}

/// JSON shape of one decision.
#[derive(Debug, Serialize)]
struct Report<'a> {
    allowed: bool,
    message: &'a str,
    parse_error: Option<String>,
}

impl<'a> From<&'a CheckOutcome> for Report<'a> {
    fn from(outcome: &'a CheckOutcome) -> Self {
        Self {
            allowed: outcome.allowed,
            message: &outcome.message,
            parse_error: outcome.parse_error.as_ref().map(ToString::to_string),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        },
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let policy = match &cli.policy {
        Some(path) => load_policy(path)?,
        None => Policy::new(),
    };
    let sql = match &cli.sql {
        Some(sql) => sql.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read SQL from stdin")?;
            buf
        },
    };

    tracing::debug!(dialect = %cli.dialect, policy = ?cli.policy, "checking statement");
    let outcome = Guard::new(policy).dialect(cli.dialect).check(&sql);

    if cli.json {
        println!("{}", serde_json::to_string(&Report::from(&outcome))?);
    } else {
        println!("{}", render(&outcome));
    }
    Ok(exit_code(&outcome))
}

fn load_policy(path: &Path) -> Result<Policy> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let policy = if is_json {
        Policy::from_json(&source)
    } else {
        Policy::from_toml(&source)
    };
    policy.with_context(|| format!("invalid policy file {}", path.display()))
}

fn render(outcome: &CheckOutcome) -> String {
    if outcome.allowed {
        "allowed".to_string()
    } else if outcome.parse_error.is_some() {
        format!("parse error: {}", outcome.message)
    } else if outcome.message.is_empty() {
        "rejected".to_string()
    } else {
        format!("rejected: {}", outcome.message)
    }
}

const fn exit_code(outcome: &CheckOutcome) -> u8 {
    if outcome.allowed {
        0
    } else if outcome.parse_error.is_some() {
        EXIT_ERROR
    } else {
        EXIT_REJECTED
    }
}
