//! Selection state and what each change requires.
//!
//! Version or user changes need a full reload. An edit-mode toggle only needs
//! the overlay re-applied to the tree that is already rendered; reloading
//! would throw away unsaved clicks.

use std::fmt;

use tracing::debug;

/// Sentinel user meaning "no tester identified".
pub const DEFAULT_USER: &str = "default";

/// A tester name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User(String);

impl User {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn default_user() -> Self {
        Self::new(DEFAULT_USER)
    }

    /// True for the sentinel user, who can neither edit nor save.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_USER
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `(version, user, edit_mode)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub version: String,
    pub user: User,
    pub edit_mode: bool,
}

impl Selection {
    #[must_use]
    pub fn new(version: impl Into<String>, user: User) -> Self {
        Self {
            version: version.into(),
            user,
            edit_mode: false,
        }
    }

    /// Whether decorated nodes accept clicks.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.edit_mode && !self.user.is_default()
    }

    /// Whether the save control is offered.
    #[must_use]
    pub fn save_visible(&self) -> bool {
        self.is_interactive()
    }
}

/// Work required after a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Fetch, render and synchronize from scratch.
    Reload,
    /// Re-apply the overlay to the current tree.
    Resync,
    /// Nothing changed.
    Unchanged,
}

/// Tracks the selection and classifies changes.
#[derive(Debug, Clone)]
pub struct ModeController {
    selection: Selection,
}

impl ModeController {
    #[must_use]
    pub const fn new(selection: Selection) -> Self {
        Self { selection }
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select_version(&mut self, version: &str) -> Transition {
        if self.selection.version == version {
            return Transition::Unchanged;
        }
        debug!(from = %self.selection.version, to = version, "version changed");
        self.selection.version = version.to_string();
        Transition::Reload
    }

    /// Switch tester. Always turns edit mode off.
    pub fn select_user(&mut self, user: User) -> Transition {
        let was_editing = std::mem::replace(&mut self.selection.edit_mode, false);
        if self.selection.user == user {
            return if was_editing {
                Transition::Resync
            } else {
                Transition::Unchanged
            };
        }
        debug!(from = %self.selection.user, to = %user, "user changed");
        self.selection.user = user;
        Transition::Reload
    }

    pub fn set_edit_mode(&mut self, on: bool) -> Transition {
        if self.selection.edit_mode == on {
            return Transition::Unchanged;
        }
        self.selection.edit_mode = on;
        Transition::Resync
    }

    pub fn toggle_edit_mode(&mut self) -> Transition {
        self.set_edit_mode(!self.selection.edit_mode)
    }
}
