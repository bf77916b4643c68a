//! casemap-core library.
//!
//! Status tracking for markdown test plans: case labels, per-tester status
//! maps, the overlay that decorates a rendered plan, and the save relay to a
//! host application.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at each boundary (`FetchError`,
//!   `MergeError`, `CasemapError`); `anyhow::Result` only for config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Async**: everything runs on one cooperative event loop; nothing here
//!   needs `Send`.

pub mod config;
pub mod error;
pub mod label;
pub mod merge;
pub mod mode;
pub mod overlay;
pub mod render;
pub mod save;
pub mod session;
pub mod source;
pub mod status;
pub mod store;
pub mod tree;

pub use error::{CasemapError, ErrorCode};
pub use label::CaseId;
pub use mode::{Selection, User};
pub use session::Session;
pub use status::Status;
