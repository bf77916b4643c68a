//! Per-(version, user) status map.
//!
//! The store is replaced wholesale whenever the selection changes and mutated
//! in place only by click handlers. It never merges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CasemapError;
use crate::label::CaseId;
use crate::mode::User;
use crate::source::ContentSource;
use crate::status::Status;

/// Mapping of case id to status. Absent entries are [`Status::Untested`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMap(BTreeMap<CaseId, Status>);

impl StatusMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &CaseId) -> Status {
        self.0.get(id).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, id: CaseId, status: Status) {
        self.0.insert(id, status);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CaseId, &Status)> {
        self.0.iter()
    }

    /// Parse a status file.
    ///
    /// Anything other than a JSON object yields `None`. Entries whose value is
    /// not a known status are dropped.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return Some(Self::new());
        }
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let object = value.as_object()?;

        let mut map = Self::new();
        for (key, value) in object {
            match value.as_str().map(str::parse::<Status>) {
                Some(Ok(status)) => map.insert(CaseId::new(key.as_str()), status),
                _ => warn!(case_id = %key, value = %value, "dropping unknown status value"),
            }
        }
        Some(map)
    }
}

impl FromIterator<(CaseId, Status)> for StatusMap {
    fn from_iter<I: IntoIterator<Item = (CaseId, Status)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The active `(version, user)` pair a store belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub version: String,
    pub user: User,
}

/// Owner of the status map for one scope.
#[derive(Debug, Clone)]
pub struct StatusStore {
    scope: Scope,
    map: StatusMap,
}

impl StatusStore {
    /// An empty store for `scope`.
    #[must_use]
    pub fn empty(scope: Scope) -> Self {
        Self {
            scope,
            map: StatusMap::new(),
        }
    }

    /// Wrap an existing map.
    #[must_use]
    pub const fn with_map(scope: Scope, map: StatusMap) -> Self {
        Self { scope, map }
    }

    /// Load the status file for `(version, user)`.
    ///
    /// Never fails: fetch errors, absent files and malformed JSON all produce
    /// an empty store. The `default` user has no status file and is not
    /// fetched at all.
    pub async fn load<S: ContentSource>(source: &S, version: &str, user: &User) -> Self {
        let scope = Scope {
            version: version.to_string(),
            user: user.clone(),
        };
        if user.is_default() {
            return Self::empty(scope);
        }

        let map = match source.fetch_results(version, user.as_str()).await {
            Ok(Some(raw)) => StatusMap::parse(&raw).unwrap_or_else(|| {
                warn!(version, user = %user, "status file is not a JSON object; starting empty");
                StatusMap::new()
            }),
            Ok(None) => {
                debug!(version, user = %user, "no status file; starting empty");
                StatusMap::new()
            }
            Err(err) => {
                warn!(version, user = %user, error = %err, "could not load status file");
                StatusMap::new()
            }
        };

        debug!(version, user = %user, entries = map.len(), "status map loaded");
        Self::with_map(scope, map)
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn get(&self, id: &CaseId) -> Status {
        self.map.get(id)
    }

    /// Advance `id` to the next status in the cycle and return it.
    ///
    /// # Errors
    ///
    /// Returns [`CasemapError::NoTester`] when the store belongs to the
    /// `default` user; the map is left untouched.
    pub fn cycle(&mut self, id: &CaseId) -> Result<Status, CasemapError> {
        if self.scope.user.is_default() {
            return Err(CasemapError::NoTester);
        }
        let next = self.map.get(id).next();
        self.map.insert(id.clone(), next);
        Ok(next)
    }

    /// A copy of the current map for persistence.
    #[must_use]
    pub fn snapshot(&self) -> StatusMap {
        self.map.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
