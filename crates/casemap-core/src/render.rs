//! Render adapter boundary and the visual surface it draws on.
//!
//! A [`RenderAdapter`] turns markdown into a [`Tree`] and lays it out on a
//! [`Surface`]. Layout is asynchronous: the [`RenderedTree`] carrying the
//! node-to-element back-references only exists once the render future has
//! completed, so nothing can query the surface against a half-built layout.

use std::future::Future;

use tracing::debug;

use crate::label::CaseId;
use crate::tree::{self, NodeId, Tree};

/// Non-owning reference from a tree node to its visual element.
///
/// Handles are tied to the surface epoch they were created in; after the
/// surface is cleared for a new render, old handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle {
    epoch: u64,
    index: usize,
}

/// Click behaviour bound to an element: cycle one case and relabel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleHandler {
    pub case_id: CaseId,
    pub canonical: String,
}

/// One drawn label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualElement {
    label: String,
    parent: Option<VisualHandle>,
    interactive: bool,
    handler: Option<CycleHandler>,
}

impl VisualElement {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn parent(&self) -> Option<VisualHandle> {
        self.parent
    }

    /// Whether the element shows a pointer affordance.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }

    #[must_use]
    pub const fn handler(&self) -> Option<&CycleHandler> {
        self.handler.as_ref()
    }
}

/// The drawn representation of one tree.
#[derive(Debug, Default)]
pub struct Surface {
    epoch: u64,
    elements: Vec<VisualElement>,
}

impl Surface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every element and invalidate all outstanding handles.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.elements.clear();
    }

    /// Add an element with an initial label.
    pub fn push(&mut self, parent: Option<VisualHandle>, label: impl Into<String>) -> VisualHandle {
        let handle = VisualHandle {
            epoch: self.epoch,
            index: self.elements.len(),
        };
        self.elements.push(VisualElement {
            label: label.into(),
            parent,
            interactive: false,
            handler: None,
        });
        handle
    }

    #[must_use]
    pub fn element(&self, handle: VisualHandle) -> Option<&VisualElement> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.elements.get(handle.index)
    }

    fn element_mut(&mut self, handle: VisualHandle) -> Option<&mut VisualElement> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.elements.get_mut(handle.index)
    }

    /// Replace the visible label. Returns false for stale handles.
    pub fn set_label(&mut self, handle: VisualHandle, label: impl Into<String>) -> bool {
        self.element_mut(handle)
            .map(|el| el.label = label.into())
            .is_some()
    }

    pub fn set_interactive(&mut self, handle: VisualHandle, interactive: bool) {
        if let Some(el) = self.element_mut(handle) {
            el.interactive = interactive;
        }
    }

    /// Attach `handler`, replacing whatever was bound before.
    pub fn bind(&mut self, handle: VisualHandle, handler: CycleHandler) {
        if let Some(el) = self.element_mut(handle) {
            el.handler = Some(handler);
        }
    }

    /// Detach and return the current handler.
    pub fn unbind(&mut self, handle: VisualHandle) -> Option<CycleHandler> {
        self.element_mut(handle).and_then(|el| el.handler.take())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements that currently have a handler bound.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.elements.iter().filter(|el| el.handler.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VisualHandle, &VisualElement)> {
        let epoch = self.epoch;
        self.elements
            .iter()
            .enumerate()
            .map(move |(index, el)| (VisualHandle { epoch, index }, el))
    }
}

/// A tree whose render has completed and whose back-references are bound.
#[derive(Debug, Clone)]
pub struct RenderedTree {
    tree: Tree,
}

impl RenderedTree {
    /// Wrap a tree after its layout is finished. Adapters call this as the
    /// last step of their render.
    #[must_use]
    pub const fn complete(tree: Tree) -> Self {
        Self { tree }
    }

    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Find the element for the first node carrying `case_id`.
    #[must_use]
    pub fn handle_for_case(&self, case_id: &CaseId) -> Option<VisualHandle> {
        self.tree.iter().find_map(|(_, node)| {
            let id = crate::label::extract_case_id(node.content())?;
            if &id == case_id { node.visual() } else { None }
        })
    }
}

/// Converts markdown to a tree and draws it.
pub trait RenderAdapter {
    /// Parse canonical markdown into a tree.
    fn transform(&self, markdown: &str) -> Tree;

    /// Lay `tree` out on `surface`. The returned future resolving is the
    /// render-completion signal.
    fn render_into(
        &mut self,
        surface: &mut Surface,
        tree: Tree,
    ) -> impl Future<Output = RenderedTree>;
}

/// Default adapter: one element per non-empty node, parented to the nearest
/// drawn ancestor.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlineRenderer;

impl RenderAdapter for OutlineRenderer {
    fn transform(&self, markdown: &str) -> Tree {
        tree::transform(markdown)
    }

    async fn render_into(&mut self, surface: &mut Surface, mut tree: Tree) -> RenderedTree {
        surface.clear();
        tree.clear_visuals();
        tokio::task::yield_now().await;

        let mut drawn: Vec<(NodeId, VisualHandle)> = Vec::new();
        let mut stack: Vec<(NodeId, Option<VisualHandle>)> = vec![(NodeId::ROOT, None)];
        while let Some((id, parent_visual)) = stack.pop() {
            let Some(node) = tree.node(id) else { continue };
            let visual = if node.content().is_empty() {
                parent_visual
            } else {
                let handle = surface.push(parent_visual, node.content());
                drawn.push((id, handle));
                Some(handle)
            };
            for child in node.children().iter().rev() {
                stack.push((*child, visual));
            }
        }

        for (id, handle) in drawn {
            tree.bind_visual(id, handle);
        }

        debug!(nodes = tree.len(), elements = surface.len(), "render complete");
        RenderedTree::complete(tree)
    }
}
