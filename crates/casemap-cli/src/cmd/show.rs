//! `cmap show`: print a version's plan decorated with one tester's results.

use crate::cmd::{self, Context};
use crate::output::{
    CliError, OutputMode, pretty_kv, pretty_rule, pretty_section, render_error, render_mode,
};
use casemap_core::ErrorCode;
use casemap_core::mode::DEFAULT_USER;
use casemap_core::session::OutlineRow;
use casemap_core::status::{CYCLE, Status};
use clap::Args;
use serde::Serialize;
use std::io::Write;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Version to load, e.g. "v1.2.0".
    pub version: String,

    /// Tester whose results are overlaid.
    #[arg(long, default_value = DEFAULT_USER)]
    pub user: String,
}

/// One outline line as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct ShowRow {
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub text: String,
}

impl From<&OutlineRow> for ShowRow {
    fn from(row: &OutlineRow) -> Self {
        Self {
            depth: row.depth,
            case_id: row.case_id.as_ref().map(ToString::to_string),
            status: row.status.map(|s| s.name().to_string()),
            text: row.label.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShowOutput {
    pub version: String,
    pub user: String,
    pub rows: Vec<ShowRow>,
    pub totals: Vec<(String, usize)>,
}

fn totals(rows: &[OutlineRow]) -> Vec<(String, usize)> {
    CYCLE
        .iter()
        .map(|status| {
            let count = rows.iter().filter(|r| r.status == Some(*status)).count();
            (status.name().to_string(), count)
        })
        .collect()
}

fn write_rows(rows: &[ShowRow], w: &mut dyn Write) -> std::io::Result<()> {
    for row in rows {
        writeln!(w, "{}{}", "  ".repeat(row.depth), row.text)?;
    }
    Ok(())
}

pub fn run_show(args: &ShowArgs, output: OutputMode, ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.config(output)?;
    let mut session = ctx.session(&config, &args.version, &args.user);
    let report = cmd::runtime()?.block_on(session.load());

    if let Some(failure) = report.failure {
        render_error(
            output,
            &CliError::from_code(ErrorCode::DocumentUnavailable, failure),
        )?;
        anyhow::bail!("could not load test cases for {}", args.version);
    }

    let outline = session.outline();
    let value = ShowOutput {
        version: report.version,
        user: report.user,
        rows: outline.iter().map(ShowRow::from).collect(),
        totals: totals(&outline),
    };

    render_mode(
        output,
        &value,
        |v, w| write_rows(&v.rows, w),
        |v, w| {
            pretty_section(w, &format!("{} · {}", v.version, v.user))?;
            write_rows(&v.rows, w)?;
            pretty_rule(w)?;
            for (name, count) in &v.totals {
                let glyph = name.parse::<Status>().map(Status::glyph).unwrap_or_default();
                pretty_kv(w, &format!("{glyph} {name}"), count.to_string())?;
            }
            Ok(())
        },
    )
}
