//! Fragment merge: concatenate per-module markdown into one document.
//!
//! Output layout, byte for byte:
//!
//! ```text
//! # {version} Test Cases\n\n
//! {fragment 1}\n\n---\n\n
//! {fragment 2}\n\n---\n\n
//! ```
//!
//! Fragments are every `*.md` file in `cases/{version}/` except the output
//! file itself, in lexicographic filename order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::source::validate_segment;

/// Name of the merged document inside each version directory.
pub const CANONICAL_FILE: &str = "_index.md";

/// Separator appended after every fragment.
pub const FRAGMENT_DELIMITER: &str = "\n\n---\n\n";

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("version directory not found: {}", path.display())]
    VersionNotFound { path: PathBuf },

    #[error("invalid version '{version}': must be a single path segment")]
    InvalidVersion { version: String },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MergeError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a merge produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub version: String,
    pub output: PathBuf,
    pub fragments: Vec<String>,
    pub bytes: usize,
}

/// Build the merged document from `(file name, content)` pairs already in
/// merge order.
#[must_use]
pub fn render_merged(version: &str, fragments: &[(String, String)]) -> String {
    let mut out = format!("# {version} Test Cases\n\n");
    for (_, content) in fragments {
        out.push_str(content);
        out.push_str(FRAGMENT_DELIMITER);
    }
    out
}

/// Fragment file names in `dir`, sorted.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn fragment_names(dir: &Path) -> Result<Vec<String>, MergeError> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(MergeError::io("failed to list", dir))?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext == "md")
                && name != CANONICAL_FILE
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Merge `cases_root/{version}/*.md` into `cases_root/{version}/_index.md`.
///
/// The output is written to a temporary sibling and renamed into place, so a
/// failure never leaves a partial document behind.
///
/// # Errors
///
/// Fails before touching the filesystem if the version is not a single path
/// segment or its directory does not exist; otherwise on any read or write
/// error.
pub fn merge_fragments(cases_root: &Path, version: &str) -> Result<MergeReport, MergeError> {
    validate_segment("version", version).map_err(|_| MergeError::InvalidVersion {
        version: version.to_string(),
    })?;

    let dir = cases_root.join(version);
    if !dir.is_dir() {
        return Err(MergeError::VersionNotFound { path: dir });
    }

    let names = fragment_names(&dir)?;
    debug!(version, fragments = ?names, "merging fragments");

    let mut fragments = Vec::with_capacity(names.len());
    for name in &names {
        let path = dir.join(name);
        let content = fs::read_to_string(&path).map_err(MergeError::io("failed to read", &path))?;
        fragments.push((name.clone(), content));
    }
    let merged = render_merged(version, &fragments);

    let output = dir.join(CANONICAL_FILE);
    let tmp = dir.join(format!(".{CANONICAL_FILE}.tmp"));
    fs::write(&tmp, &merged).map_err(MergeError::io("failed to write", &tmp))?;
    if let Err(err) = fs::rename(&tmp, &output) {
        let _ = fs::remove_file(&tmp);
        return Err(MergeError::io("failed to replace", &output)(err));
    }

    info!(version, output = %output.display(), fragments = names.len(), "merged test cases");
    Ok(MergeReport {
        version: version.to_string(),
        output,
        fragments: names,
        bytes: merged.len(),
    })
}
