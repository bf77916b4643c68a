//! `cmap tui`: interactive tree view.

use crate::cmd::{self, Context};
use crate::host::JsonLinesHost;
use crate::output::OutputMode;
use crate::tui::{self, app::App};
use anyhow::{Context as _, Result};
use casemap_core::mode::DEFAULT_USER;
use casemap_core::save::SaveGateway;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TuiArgs {
    /// Version to open. Defaults to `selection.version` in casemap.toml,
    /// then the first configured version.
    pub version: Option<String>,

    /// Tester to open as.
    #[arg(long, default_value = DEFAULT_USER)]
    pub user: String,

    /// JSON-lines file receiving save envelopes.
    #[arg(long, value_name = "PATH")]
    pub host_out: Option<PathBuf>,
}

pub fn run_tui(args: &TuiArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config(OutputMode::Text)?;
    let Some(version) = args
        .version
        .as_deref()
        .or_else(|| config.selection.initial_version())
        .map(str::to_string)
    else {
        anyhow::bail!("no version given and none configured in casemap.toml");
    };

    let host = match args.host_out.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            anyhow::bail!("--host-out - would write into the terminal UI; pass a file path");
        }
        Some(path) => Some(JsonLinesHost::open(path).context("Failed to open host output")?),
        None => None,
    };

    let mut versions = config.selection.versions.clone();
    if !versions.contains(&version) {
        versions.insert(0, version.clone());
    }
    let mut users = config.selection.user_choices();
    if !users.contains(&args.user) {
        users.push(args.user.clone());
    }

    let session = ctx.session(&config, &version, &args.user);
    let gateway = SaveGateway::new(host, config.save.ack_delay());
    let app = App::new(session, gateway, cmd::runtime()?, versions, users);
    tui::run(app)
}
