//! `cmap cycle`: click cases in edit mode and optionally save.

use crate::cmd::{self, Context};
use crate::host::{JsonLinesHost, StderrNotifier};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};
use anyhow::Context as _;
use casemap_core::CasemapError;
use casemap_core::ErrorCode;
use casemap_core::label::CaseId;
use casemap_core::overlay::ClickOutcome;
use casemap_core::save::{Notice, SaveGateway, SaveOutcome};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Args, Debug)]
pub struct CycleArgs {
    /// Version to load, e.g. "v1.2.0".
    pub version: String,

    /// Tester whose results are edited. Must not be `default`.
    #[arg(long)]
    pub user: String,

    /// Case ids to click, in order. Repeat an id to advance it further.
    #[arg(required = true, value_name = "CASE")]
    pub cases: Vec<String>,

    /// Send the resulting status map to the host after clicking.
    #[arg(long)]
    pub save: bool,

    /// JSON-lines file receiving save envelopes (`-` for stdout). Without it
    /// no host is attached and a save only reports that nothing persisted.
    #[arg(long, value_name = "PATH")]
    pub host_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct CycleChange {
    pub case_id: String,
    pub status: String,
    pub glyph: String,
}

#[derive(Debug, Serialize)]
pub struct CycleOutput {
    pub version: String,
    pub user: String,
    pub changes: Vec<CycleChange>,
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

const fn save_label(outcome: &SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Sent | SaveOutcome::Pending { .. } => "sent",
        SaveOutcome::Fallback => "not_persisted",
        SaveOutcome::Failed(_) => "failed",
        SaveOutcome::Rejected(_) => "rejected",
    }
}

/// Envelopes on stdout would be interleaved with the JSON result.
fn host_collides_with_output(args: &CycleArgs, output: OutputMode) -> bool {
    output == OutputMode::Json
        && args.save
        && args
            .host_out
            .as_deref()
            .is_some_and(|path| path.as_os_str() == "-")
}

pub fn run_cycle(args: &CycleArgs, output: OutputMode, ctx: &Context) -> anyhow::Result<()> {
    if host_collides_with_output(args, output) {
        let error = CliError {
            message: "--host-out - cannot be combined with JSON output".to_string(),
            suggestion: Some("Pass a file path to --host-out, or use --format text.".to_string()),
            error_code: None,
        };
        render_error(output, &error)?;
        anyhow::bail!("host output collides with JSON output");
    }

    let config = ctx.config(output)?;
    let mut session = ctx.session(&config, &args.version, &args.user);

    if session.selection().user.is_default() {
        render_error(output, &CliError::from(&CasemapError::NoTester))?;
        anyhow::bail!("no tester selected");
    }

    let rt = cmd::runtime()?;
    let report = rt.block_on(session.load());
    if let Some(failure) = report.failure {
        render_error(
            output,
            &CliError::from_code(ErrorCode::DocumentUnavailable, failure),
        )?;
        anyhow::bail!("could not load test cases for {}", args.version);
    }
    session.set_edit_mode(true);

    let mut changes = Vec::new();
    let mut missing = Vec::new();
    for raw in &args.cases {
        match session.click_case(&CaseId::new(raw.as_str()))? {
            ClickOutcome::Cycled {
                case_id, status, ..
            } => changes.push(CycleChange {
                case_id: case_id.to_string(),
                status: status.name().to_string(),
                glyph: status.glyph().to_string(),
            }),
            ClickOutcome::Ignored => {
                warn!(case_id = %raw, "case not found in plan");
                missing.push(raw.clone());
            }
        }
    }

    let mut notifier = StderrNotifier::default();
    let save = if args.save {
        let host = args
            .host_out
            .as_deref()
            .map(JsonLinesHost::open)
            .transpose()
            .context("Failed to open host output")?;
        let mut gateway = SaveGateway::new(host, config.save.ack_delay());
        let outcome = rt.block_on(gateway.save(
            session.selection(),
            session.store().snapshot(),
            &mut notifier,
        ));
        Some(save_label(&outcome).to_string())
    } else {
        None
    };

    let value = CycleOutput {
        version: args.version.clone(),
        user: args.user.clone(),
        changes,
        missing,
        save,
        notice: notifier.last.as_ref().map(Notice::text),
    };

    render_mode(
        output,
        &value,
        |v, w| {
            for change in &v.changes {
                writeln!(w, "{}\t{}", change.case_id, change.status)?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("{} · {}", v.version, v.user))?;
            for change in &v.changes {
                pretty_kv(w, &change.case_id, format!("{} {}", change.glyph, change.status))?;
            }
            if !v.missing.is_empty() {
                pretty_kv(w, "Not found", v.missing.join(", "))?;
            }
            if let Some(save) = &v.save {
                pretty_kv(w, "Save", save)?;
            }
            if let Some(notice) = &v.notice {
                pretty_kv(w, "Notice", notice)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use casemap_core::save::Rejection;

    #[test]
    fn save_labels_are_stable() {
        assert_eq!(save_label(&SaveOutcome::Sent), "sent");
        assert_eq!(save_label(&SaveOutcome::Fallback), "not_persisted");
        assert_eq!(
            save_label(&SaveOutcome::Rejected(Rejection::NoTester)),
            "rejected"
        );
    }

    fn args(host_out: Option<&str>, save: bool) -> CycleArgs {
        CycleArgs {
            version: "v1".to_string(),
            user: "alice".to_string(),
            cases: vec!["LOGIN-001".to_string()],
            save,
            host_out: host_out.map(PathBuf::from),
        }
    }

    #[test]
    fn stdout_host_is_refused_with_json_output() {
        assert!(host_collides_with_output(&args(Some("-"), true), OutputMode::Json));
        assert!(!host_collides_with_output(&args(Some("-"), true), OutputMode::Text));
        assert!(!host_collides_with_output(&args(Some("saves.jsonl"), true), OutputMode::Json));
        assert!(!host_collides_with_output(&args(Some("-"), false), OutputMode::Json));
    }

    #[test]
    fn default_user_is_rejected_before_loading() {
        let ctx = Context {
            project_root: std::env::temp_dir(),
            source: None,
            demo: true,
        };
        let args = CycleArgs {
            version: "v1".to_string(),
            user: "default".to_string(),
            cases: vec!["LOGIN-001".to_string()],
            save: false,
            host_out: None,
        };
        assert!(run_cycle(&args, OutputMode::Text, &ctx).is_err());
    }

    #[test]
    fn demo_cycle_with_file_host_writes_envelope() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("casemap.toml"), "[save]\nack_delay_ms = 0\n")
            .expect("config");
        let host_out = dir.path().join("saves.jsonl");
        let ctx = Context {
            project_root: dir.path().to_path_buf(),
            source: None,
            demo: true,
        };
        let args = CycleArgs {
            version: "v1".to_string(),
            user: "alice".to_string(),
            cases: vec!["LOGIN-003".to_string()],
            save: true,
            host_out: Some(host_out.clone()),
        };
        run_cycle(&args, OutputMode::Json, &ctx).expect("cycle");

        let line = std::fs::read_to_string(&host_out).expect("host file");
        let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
        assert_eq!(value["payload"]["user"], "alice");
        assert_eq!(value["payload"]["content"]["LOGIN-003"], "✅");
        assert_eq!(value["payload"]["content"]["LOGIN-001"], "✅");
    }
}
