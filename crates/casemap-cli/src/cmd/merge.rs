//! `cmap merge`: build `cases/<version>/_index.md` from its fragments.

use crate::cmd::Context;
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};
use casemap_core::merge::{self, MergeReport};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Version directory name under the cases directory, e.g. "v1.2.0".
    pub version: String,

    /// Directory holding one sub-directory per version.
    #[arg(long, default_value = "cases")]
    pub cases_dir: PathBuf,
}

/// Merge result as returned in JSON output.
#[derive(Debug, Serialize)]
pub struct MergeOutput {
    pub version: String,
    pub output: String,
    pub fragments: Vec<String>,
    pub bytes: usize,
}

impl From<MergeReport> for MergeOutput {
    fn from(report: MergeReport) -> Self {
        Self {
            version: report.version,
            output: report.output.display().to_string(),
            fragments: report.fragments,
            bytes: report.bytes,
        }
    }
}

pub fn run_merge(args: &MergeArgs, output: OutputMode, ctx: &Context) -> anyhow::Result<()> {
    let cases_root = ctx.project_root.join(&args.cases_dir);

    let report = match merge::merge_fragments(&cases_root, &args.version) {
        Ok(report) => report,
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("merge failed for {}", args.version);
        }
    };

    let value = MergeOutput::from(report);
    render_mode(
        output,
        &value,
        |v, w| writeln!(w, "{}", v.output),
        |v, w| {
            pretty_section(w, &format!("Merged {}", v.version))?;
            pretty_kv(w, "Output", &v.output)?;
            pretty_kv(w, "Fragments", v.fragments.join(", "))?;
            pretty_kv(w, "Bytes", v.bytes.to_string())
        },
    )
}
