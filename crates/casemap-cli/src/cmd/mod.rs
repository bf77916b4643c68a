//! Subcommand handlers.
//!
//! Each handler receives parsed args, the resolved [`OutputMode`] and the
//! shared [`Context`].

pub mod completions;
pub mod cycle;
pub mod merge;
pub mod show;
pub mod tui;

use anyhow::{Context as _, Result};
use casemap_core::config::{self, ProjectConfig};
use casemap_core::render::OutlineRenderer;
use casemap_core::session::Session;
use casemap_core::source::{MemorySource, Source};
use casemap_core::{ErrorCode, Selection, User};
use crate::output::{CliError, OutputMode, render_error};
use std::path::PathBuf;
use tracing::debug;

/// Invocation-wide settings taken from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_root: PathBuf,
    pub source: Option<String>,
    pub demo: bool,
}

/// The session type every command drives.
pub type PlanSession = Session<Source, OutlineRenderer>;

impl Context {
    /// `casemap.toml` with env and flag overrides applied. A file that
    /// cannot be read or parsed is reported with its error code first.
    pub fn config(&self, output: OutputMode) -> Result<ProjectConfig> {
        let mut config = match config::resolve_config(&self.project_root, self.source.as_deref())
        {
            Ok(config) => config,
            Err(err) => {
                render_error(
                    output,
                    &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
                )?;
                return Err(err);
            }
        };
        if self.demo {
            config.selection = demo_selection();
        }
        Ok(config)
    }

    /// Content source for this invocation.
    pub fn content_source(&self, config: &ProjectConfig) -> Source {
        if self.demo {
            return Source::Memory(demo_source());
        }
        let location = &config.source.location;
        let resolved = if location.starts_with("http://") || location.starts_with("https://") {
            location.clone()
        } else {
            self.project_root.join(location).to_string_lossy().into_owned()
        };
        debug!(location = %resolved, "content source");
        Source::from_location(&resolved, config.source.cache_bust, config.source.timeout())
    }

    /// A session for `(version, user)`, not yet loaded.
    pub fn session(&self, config: &ProjectConfig, version: &str, user: &str) -> PlanSession {
        Session::new(
            self.content_source(config),
            OutlineRenderer,
            Selection::new(version, User::new(user)),
        )
    }
}

/// Single-threaded runtime: every suspension point is cooperative.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

const DEMO_V1: &str = "\
## Login

- [LOGIN-001] Sign in with a valid password
- [LOGIN-002] Sign in with a wrong password
  - Error banner is shown
  - [LOGIN-003] Account locks after five attempts

## Checkout

- [PAY-001] Pay by card
- [PAY-002] Pay with a saved wallet

## Notes

Cases without a bracketed id are context only.
";

const DEMO_V2: &str = "\
## Login

- [LOGIN-001] Sign in with a valid password
- [LOGIN-004] Sign in with a passkey
";

fn demo_selection() -> config::SelectionConfig {
    config::SelectionConfig {
        versions: vec!["v1".to_string(), "v2".to_string()],
        users: vec!["alice".to_string(), "bob".to_string()],
        version: Some("v1".to_string()),
    }
}

/// Built-in plan used by `--demo`.
pub fn demo_source() -> MemorySource {
    let v1 = casemap_core::merge::render_merged("v1", &[("login.md".to_string(), DEMO_V1.to_string())]);
    let v2 = casemap_core::merge::render_merged("v2", &[("login.md".to_string(), DEMO_V2.to_string())]);
    MemorySource::new()
        .with_document("v1", &v1)
        .with_document("v2", &v2)
        .with_results(
            "v1",
            "alice",
            r#"{"LOGIN-001": "✅", "LOGIN-002": "❌", "PAY-001": "🟡"}"#,
        )
        .with_results("v1", "bob", r#"{"LOGIN-001": "pass"}"#)
}
