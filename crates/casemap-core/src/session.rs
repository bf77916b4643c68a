//! Selection-driven load pipeline.
//!
//! A [`Session`] owns every piece of mutable state for one view: the
//! selection, the status store, the drawn surface and the rendered tree.
//! Loads take `&mut self`, so two loads can never interleave; whichever
//! finishes last has replaced everything.

use tracing::{info, warn};

use crate::error::CasemapError;
use crate::label::{self, CaseId};
use crate::mode::{ModeController, Selection, Transition, User};
use crate::overlay::{self, ClickOutcome, OverlayReport};
use crate::render::{RenderAdapter, RenderedTree, Surface, VisualHandle};
use crate::source::ContentSource;
use crate::status::Status;
use crate::store::{Scope, StatusStore};
use crate::tree::Tree;

/// Summary of one completed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub version: String,
    pub user: String,
    /// Message shown in place of the plan when the document failed.
    pub failure: Option<String>,
    pub statuses: usize,
    pub overlay: OverlayReport,
}

/// One drawn line of the outline, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRow {
    pub handle: VisualHandle,
    pub depth: usize,
    pub label: String,
    pub case_id: Option<CaseId>,
    pub status: Option<Status>,
    pub interactive: bool,
    pub has_children: bool,
}

/// Everything one view of a test plan needs.
pub struct Session<S, R> {
    source: S,
    renderer: R,
    controller: ModeController,
    store: StatusStore,
    surface: Surface,
    rendered: Option<RenderedTree>,
    last_report: Option<LoadReport>,
}

impl<S: ContentSource, R: RenderAdapter> Session<S, R> {
    /// A session with nothing loaded yet. Call [`Session::load`] next.
    #[must_use]
    pub fn new(source: S, renderer: R, selection: Selection) -> Self {
        let store = StatusStore::empty(Scope {
            version: selection.version.clone(),
            user: selection.user.clone(),
        });
        Self {
            source,
            renderer,
            controller: ModeController::new(selection),
            store,
            surface: Surface::new(),
            rendered: None,
            last_report: None,
        }
    }

    /// Fetch, transform, render, then overlay statuses.
    ///
    /// The document and status file are requested concurrently and both are
    /// awaited before the render starts. A document that cannot be fetched,
    /// or is empty, is replaced by a one-node tree carrying the error.
    pub async fn load(&mut self) -> LoadReport {
        let selection = self.controller.selection().clone();
        let version = selection.version.as_str();

        let (document, store) = tokio::join!(
            self.source.fetch_document(version),
            StatusStore::load(&self.source, version, &selection.user),
        );

        let (tree, failure) = match document {
            Ok(markdown) if markdown.trim().is_empty() => {
                let err = CasemapError::EmptyDocument {
                    version: version.to_string(),
                };
                warn!(version, "test-case document is empty");
                (Tree::failure(&err.to_string()), Some(err.to_string()))
            }
            Ok(markdown) => (self.renderer.transform(&markdown), None),
            Err(source) => {
                let err = CasemapError::DocumentUnavailable {
                    version: version.to_string(),
                    source,
                };
                warn!(version, error = %err, "test-case document unavailable");
                (Tree::failure(&err.to_string()), Some(err.to_string()))
            }
        };

        let rendered = self.renderer.render_into(&mut self.surface, tree).await;
        self.store = store;
        let overlay = overlay::apply(&rendered, &mut self.surface, &self.store, &selection);
        self.rendered = Some(rendered);

        info!(
            version,
            user = %selection.user,
            statuses = self.store.len(),
            decorated = overlay.decorated,
            "plan loaded"
        );
        let report = LoadReport {
            version: selection.version.clone(),
            user: selection.user.to_string(),
            failure,
            statuses: self.store.len(),
            overlay,
        };
        self.last_report = Some(report.clone());
        report
    }

    /// Re-apply the overlay to the tree already on screen.
    pub fn resync(&mut self) -> OverlayReport {
        let Some(rendered) = self.rendered.as_ref() else {
            return OverlayReport::default();
        };
        overlay::apply(
            rendered,
            &mut self.surface,
            &self.store,
            self.controller.selection(),
        )
    }

    async fn follow(&mut self, transition: Transition) -> Transition {
        match transition {
            Transition::Reload => {
                self.load().await;
            }
            Transition::Resync => {
                self.resync();
            }
            Transition::Unchanged => {}
        }
        transition
    }

    pub async fn select_version(&mut self, version: &str) -> Transition {
        let transition = self.controller.select_version(version);
        self.follow(transition).await
    }

    pub async fn select_user(&mut self, user: User) -> Transition {
        let transition = self.controller.select_user(user);
        self.follow(transition).await
    }

    /// Turn edit mode on or off. Never fetches or re-renders.
    pub fn set_edit_mode(&mut self, on: bool) -> Transition {
        let transition = self.controller.set_edit_mode(on);
        if transition == Transition::Resync {
            self.resync();
        }
        transition
    }

    pub fn toggle_edit_mode(&mut self) -> Transition {
        let on = !self.controller.selection().edit_mode;
        self.set_edit_mode(on)
    }

    /// Click the element behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`CasemapError::NoTester`] if a handler fires for the
    /// `default` user.
    pub fn click(&mut self, handle: VisualHandle) -> Result<ClickOutcome, CasemapError> {
        overlay::dispatch_click(&mut self.surface, handle, &mut self.store)
    }

    /// Click the first element showing `case_id`.
    ///
    /// # Errors
    ///
    /// See [`Session::click`].
    pub fn click_case(&mut self, case_id: &CaseId) -> Result<ClickOutcome, CasemapError> {
        let Some(handle) = self
            .rendered
            .as_ref()
            .and_then(|rendered| rendered.handle_for_case(case_id))
        else {
            return Ok(ClickOutcome::Ignored);
        };
        self.click(handle)
    }

    /// Drawn lines in depth-first order with their current labels.
    #[must_use]
    pub fn outline(&self) -> Vec<OutlineRow> {
        let Some(rendered) = self.rendered.as_ref() else {
            return Vec::new();
        };
        let tree = rendered.tree();
        tree.walk()
            .into_iter()
            .filter_map(|(id, depth)| {
                let node = tree.node(id)?;
                let handle = node.visual()?;
                let element = self.surface.element(handle)?;
                let case_id = label::extract_case_id(node.content());
                let status = case_id.as_ref().map(|id| self.store.get(id));
                Some(OutlineRow {
                    handle,
                    depth: depth.saturating_sub(1),
                    label: element.label().to_string(),
                    case_id,
                    status,
                    interactive: element.is_interactive(),
                    has_children: !node.children().is_empty(),
                })
            })
            .collect()
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        self.controller.selection()
    }

    #[must_use]
    pub const fn store(&self) -> &StatusStore {
        &self.store
    }

    #[must_use]
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    #[must_use]
    pub const fn rendered(&self) -> Option<&RenderedTree> {
        self.rendered.as_ref()
    }

    /// Report of the most recent load, including loads triggered by a
    /// selection change.
    #[must_use]
    pub const fn last_report(&self) -> Option<&LoadReport> {
        self.last_report.as_ref()
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}
