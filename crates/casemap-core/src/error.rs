use std::fmt;

use crate::source::FetchError;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidSegment,
    NoTester,
    DocumentUnavailable,
    EmptyDocument,
    VersionNotFound,
    MergeWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidSegment => "E1002",
            Self::NoTester => "E2001",
            Self::DocumentUnavailable => "E3001",
            Self::EmptyDocument => "E3002",
            Self::VersionNotFound => "E4001",
            Self::MergeWriteFailed => "E4002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidSegment => "Invalid version or user name",
            Self::NoTester => "No tester selected",
            Self::DocumentUnavailable => "Test-case document unavailable",
            Self::EmptyDocument => "Test-case document is empty",
            Self::VersionNotFound => "Version directory not found",
            Self::MergeWriteFailed => "Merged document write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in casemap.toml and retry."),
            Self::InvalidSegment => {
                Some("Use letters, digits, `-`, `_` or `.` only, without `..`.")
            }
            Self::NoTester => Some("Pick a tester other than `default` before editing or saving."),
            Self::DocumentUnavailable => {
                Some("Check the source location and that `cmap merge <version>` was run.")
            }
            Self::EmptyDocument => Some("Run `cmap merge <version>` to regenerate _index.md."),
            Self::VersionNotFound => Some("Create cases/<version>/ with at least one fragment."),
            Self::MergeWriteFailed => Some("Check disk space and write permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by core operations that are surfaced to the caller.
///
/// Recoverable conditions (a missing status file, an absent host) never show
/// up here; they are converted to outcomes where they happen.
#[derive(Debug, thiserror::Error)]
pub enum CasemapError {
    /// A mutation or save was attempted while the `default` user is selected.
    #[error("select a tester before changing results")]
    NoTester,

    /// The canonical document could not be fetched.
    #[error("failed to load test cases for {version}: {source}")]
    DocumentUnavailable {
        version: String,
        #[source]
        source: FetchError,
    },

    /// The canonical document was fetched but contained only whitespace.
    #[error("test-case document for {version} is empty")]
    EmptyDocument { version: String },
}

impl CasemapError {
    /// The stable error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoTester => ErrorCode::NoTester,
            Self::DocumentUnavailable { source, .. } => match source {
                FetchError::InvalidSegment { .. } => ErrorCode::InvalidSegment,
                _ => ErrorCode::DocumentUnavailable,
            },
            Self::EmptyDocument { .. } => ErrorCode::EmptyDocument,
        }
    }

    /// Remediation text for the error, falling back to the code summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or(code.message()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidSegment,
            ErrorCode::NoTester,
            ErrorCode::DocumentUnavailable,
            ErrorCode::EmptyDocument,
            ErrorCode::VersionNotFound,
            ErrorCode::MergeWriteFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::NoTester.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn invalid_segment_fetch_maps_to_its_own_code() {
        let err = CasemapError::DocumentUnavailable {
            version: "../etc".to_string(),
            source: FetchError::InvalidSegment {
                kind: "version",
                value: "../etc".to_string(),
            },
        };
        assert_eq!(err.error_code(), ErrorCode::InvalidSegment);
        assert!(err.suggestion().contains("digits"));
    }
}
