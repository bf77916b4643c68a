//! Status overlay on a rendered tree.
//!
//! [`apply`] decorates every recognised node and rebinds its click handler in
//! one pass: clear first, then attach only when the selection is interactive.
//! Applying twice in a row yields the same labels and the same single handler
//! per node.

use tracing::debug;

use crate::error::CasemapError;
use crate::label::{self, CaseId};
use crate::mode::Selection;
use crate::render::{CycleHandler, RenderedTree, Surface, VisualHandle};
use crate::status::Status;
use crate::store::StatusStore;

/// Counts from one overlay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Nodes that carry a case id and were relabelled.
    pub decorated: usize,
    /// Nodes that ended the pass with a handler bound.
    pub interactive: usize,
}

/// Decorate `rendered` on `surface` from `store`, wiring clicks according to
/// `selection`.
pub fn apply(
    rendered: &RenderedTree,
    surface: &mut Surface,
    store: &StatusStore,
    selection: &Selection,
) -> OverlayReport {
    let interactive = selection.is_interactive();
    let mut report = OverlayReport::default();

    for (_, node) in rendered.tree().iter() {
        let Some(handle) = node.visual() else { continue };
        if surface.element(handle).is_none() {
            continue;
        }
        let canonical = node.content();
        let Some(case_id) = label::extract_case_id(canonical) else {
            continue;
        };

        let status = store.get(&case_id);
        surface.set_label(handle, label::decorate(status, canonical));
        surface.unbind(handle);

        if interactive {
            surface.bind(
                handle,
                CycleHandler {
                    case_id,
                    canonical: canonical.to_string(),
                },
            );
            report.interactive += 1;
        }
        surface.set_interactive(handle, interactive);
        report.decorated += 1;
    }

    debug!(
        decorated = report.decorated,
        interactive = report.interactive,
        "overlay applied"
    );
    report
}

/// What a click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A handler ran; propagation stopped there.
    Cycled {
        target: VisualHandle,
        case_id: CaseId,
        status: Status,
    },
    /// No element on the path to the root had a handler.
    Ignored,
}

/// Deliver a click on `target`.
///
/// The click bubbles from `target` towards the root until an element with a
/// handler is found. That handler stops propagation, so ancestors never see
/// the click.
///
/// # Errors
///
/// Returns [`CasemapError::NoTester`] if a handler fires while the store
/// belongs to the `default` user. Labels are left untouched in that case.
pub fn dispatch_click(
    surface: &mut Surface,
    target: VisualHandle,
    store: &mut StatusStore,
) -> Result<ClickOutcome, CasemapError> {
    let mut current = Some(target);
    while let Some(handle) = current {
        let Some(element) = surface.element(handle) else {
            return Ok(ClickOutcome::Ignored);
        };

        if let Some(handler) = element.handler().cloned() {
            let status = store.cycle(&handler.case_id)?;
            surface.set_label(handle, label::decorate(status, &handler.canonical));
            debug!(case_id = %handler.case_id, status = status.name(), "case cycled");
            return Ok(ClickOutcome::Cycled {
                target: handle,
                case_id: handler.case_id,
                status,
            });
        }
        current = element.parent();
    }
    Ok(ClickOutcome::Ignored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::User;
    use crate::render::{OutlineRenderer, RenderAdapter};
    use crate::store::{Scope, StatusMap};

    const PLAN: &str = "# Login\n\n- [TC-1] valid\n  - [TC-2] nested\n    - note\n- plain item\n";

    async fn rendered(surface: &mut Surface) -> RenderedTree {
        let mut renderer = OutlineRenderer;
        let tree = renderer.transform(PLAN);
        renderer.render_into(surface, tree).await
    }

    fn store(user: &str, map: StatusMap) -> StatusStore {
        StatusStore::with_map(
            Scope {
                version: "v1".to_string(),
                user: User::new(user),
            },
            map,
        )
    }

    fn editing(user: &str) -> Selection {
        let mut selection = Selection::new("v1", User::new(user));
        selection.edit_mode = true;
        selection
    }

    fn label_of(surface: &Surface, rendered: &RenderedTree, id: &str) -> String {
        let handle = rendered.handle_for_case(&CaseId::new(id)).expect("handle");
        surface.element(handle).expect("element").label().to_string()
    }

    #[tokio::test]
    async fn decorates_only_recognised_nodes() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let map: StatusMap = [(CaseId::new("TC-2"), Status::Fail)].into_iter().collect();
        let report = apply(&rendered, &mut surface, &store("alice", map), &editing("alice"));

        assert_eq!(report.decorated, 2);
        assert_eq!(report.interactive, 2);
        assert_eq!(
            label_of(&surface, &rendered, "TC-1"),
            format!("{} [TC-1] valid", Status::Untested.glyph())
        );
        assert_eq!(
            label_of(&surface, &rendered, "TC-2"),
            format!("{} [TC-2] nested", Status::Fail.glyph())
        );
        let plain = surface
            .iter()
            .find(|(_, el)| el.label() == "plain item")
            .expect("plain item untouched");
        assert!(!plain.1.is_interactive());
    }

    #[tokio::test]
    async fn apply_twice_is_idempotent() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let store = store("alice", StatusMap::new());
        let selection = editing("alice");

        apply(&rendered, &mut surface, &store, &selection);
        let first: Vec<String> = surface.iter().map(|(_, el)| el.label().to_string()).collect();
        apply(&rendered, &mut surface, &store, &selection);
        let second: Vec<String> = surface.iter().map(|(_, el)| el.label().to_string()).collect();

        assert_eq!(first, second);
        assert_eq!(surface.handler_count(), 2);
    }

    #[tokio::test]
    async fn read_only_pass_removes_handlers() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let store = store("alice", StatusMap::new());

        apply(&rendered, &mut surface, &store, &editing("alice"));
        assert_eq!(surface.handler_count(), 2);

        let viewing = Selection::new("v1", User::new("alice"));
        let report = apply(&rendered, &mut surface, &store, &viewing);
        assert_eq!(report.interactive, 0);
        assert_eq!(surface.handler_count(), 0);
        assert!(surface.iter().all(|(_, el)| !el.is_interactive()));
    }

    #[tokio::test]
    async fn nested_click_cycles_only_the_target() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let mut store = store("alice", StatusMap::new());
        apply(&rendered, &mut surface, &store, &editing("alice"));

        let nested = rendered.handle_for_case(&CaseId::new("TC-2")).expect("nested");
        let outcome = dispatch_click(&mut surface, nested, &mut store).expect("click");

        assert!(matches!(
            outcome,
            ClickOutcome::Cycled { status: Status::Pass, .. }
        ));
        assert_eq!(store.get(&CaseId::new("TC-2")), Status::Pass);
        assert_eq!(store.get(&CaseId::new("TC-1")), Status::Untested);
        assert_eq!(
            label_of(&surface, &rendered, "TC-2"),
            format!("{} [TC-2] nested", Status::Pass.glyph())
        );
    }

    #[tokio::test]
    async fn click_on_undecorated_child_bubbles_to_case() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let mut store = store("alice", StatusMap::new());
        apply(&rendered, &mut surface, &store, &editing("alice"));

        let (note, _) = surface
            .iter()
            .find(|(_, el)| el.label() == "note")
            .expect("note");
        let outcome = dispatch_click(&mut surface, note, &mut store).expect("click");
        match outcome {
            ClickOutcome::Cycled { case_id, .. } => assert_eq!(case_id, CaseId::new("TC-2")),
            ClickOutcome::Ignored => panic!("expected the nearest case to handle the click"),
        }
    }

    #[tokio::test]
    async fn repeated_clicks_never_stack_glyphs() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let mut store = store("alice", StatusMap::new());
        apply(&rendered, &mut surface, &store, &editing("alice"));

        let handle = rendered.handle_for_case(&CaseId::new("TC-1")).expect("handle");
        for _ in 0..9 {
            dispatch_click(&mut surface, handle, &mut store).expect("click");
        }
        assert_eq!(
            label_of(&surface, &rendered, "TC-1"),
            format!("{} [TC-1] valid", Status::Pass.glyph())
        );
    }

    #[tokio::test]
    async fn clicks_without_handlers_are_ignored() {
        let mut surface = Surface::new();
        let rendered = rendered(&mut surface).await;
        let mut store = store("alice", StatusMap::new());
        apply(&rendered, &mut surface, &store, &Selection::new("v1", User::new("alice")));

        let handle = rendered.handle_for_case(&CaseId::new("TC-1")).expect("handle");
        let outcome = dispatch_click(&mut surface, handle, &mut store).expect("click");
        assert_eq!(outcome, ClickOutcome::Ignored);
        assert!(store.is_empty());
    }
}
