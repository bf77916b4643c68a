//! Test-plan tree built from markdown.
//!
//! Headings nest by level, list items nest under the nearest heading or
//! parent item, and paragraphs that are not part of an item become children of
//! their heading. Node 0 is a structural root with empty text.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::render::VisualHandle;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One node of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNode {
    content: String,
    children: Vec<NodeId>,
    visual: Option<VisualHandle>,
}

impl RenderNode {
    fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            children: Vec::new(),
            visual: None,
        }
    }

    /// Canonical text, exactly as transformed from markdown.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The visual element rendered for this node, if any.
    #[must_use]
    pub const fn visual(&self) -> Option<VisualHandle> {
        self.visual
    }
}

/// Arena of nodes rooted at [`NodeId::ROOT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<RenderNode>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// A tree holding only the structural root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![RenderNode::new("")],
        }
    }

    /// A single-node tree carrying an error message, shown when the plan
    /// could not be loaded.
    #[must_use]
    pub fn failure(message: &str) -> Self {
        let mut tree = Self::new();
        tree.push(NodeId::ROOT, message);
        tree
    }

    /// Append a child of `parent` and return its id.
    pub fn push(&mut self, parent: NodeId, content: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RenderNode::new(content));
        self.nodes[parent.0].children.push(id);
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn root(&self) -> &RenderNode {
        &self.nodes[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Record the visual element rendered for `id`.
    pub fn bind_visual(&mut self, id: NodeId, handle: VisualHandle) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.visual = Some(handle);
        }
    }

    /// Forget every back-reference, e.g. before a re-render.
    pub fn clear_visuals(&mut self) {
        for node in &mut self.nodes {
            node.visual = None;
        }
    }

    /// All nodes in arena order, root first.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &RenderNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Depth-first pre-order walk with depths; the root has depth 0.
    #[must_use]
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(NodeId::ROOT, 0_usize)];
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            for child in self.nodes[id.0].children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    fn content_mut(&mut self, id: NodeId) -> &mut String {
        &mut self.nodes[id.0].content
    }
}

/// Build a tree from canonical markdown.
#[must_use]
pub fn transform(markdown: &str) -> Tree {
    let mut tree = Tree::new();
    let mut headings: Vec<(usize, NodeId)> = Vec::new();
    let mut items: Vec<NodeId> = Vec::new();
    let mut capture: Option<NodeId> = None;

    let container = |headings: &[(usize, NodeId)], items: &[NodeId]| {
        items
            .last()
            .copied()
            .or_else(|| headings.last().map(|(_, id)| *id))
            .unwrap_or(NodeId::ROOT)
    };

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let level = level as usize;
                items.clear();
                while headings.last().is_some_and(|(l, _)| *l >= level) {
                    headings.pop();
                }
                let parent = headings.last().map_or(NodeId::ROOT, |(_, id)| *id);
                let id = tree.push(parent, "");
                headings.push((level, id));
                capture = Some(id);
            }
            Event::Start(Tag::Item) => {
                let parent = container(&headings, &items);
                let id = tree.push(parent, "");
                items.push(id);
                capture = Some(id);
            }
            Event::Start(Tag::List(_)) => capture = None,
            Event::Start(Tag::Paragraph) if capture.is_none() => {
                let parent = container(&headings, &items);
                let reuse = parent != NodeId::ROOT
                    && items.last() == Some(&parent)
                    && tree.nodes[parent.0].content.trim().is_empty();
                capture = Some(if reuse { parent } else { tree.push(parent, "") });
            }
            Event::End(TagEnd::Item) => {
                items.pop();
                capture = None;
            }
            Event::End(TagEnd::Heading(_) | TagEnd::Paragraph) => capture = None,
            Event::Text(text) => {
                if let Some(id) = capture {
                    tree.content_mut(id).push_str(&text);
                }
            }
            Event::Code(code) => {
                if let Some(id) = capture {
                    let content = tree.content_mut(id);
                    content.push('`');
                    content.push_str(&code);
                    content.push('`');
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(id) = capture {
                    tree.content_mut(id).push(' ');
                }
            }
            _ => {}
        }
    }

    for node in &mut tree.nodes {
        let trimmed = node.content.trim();
        if trimmed.len() != node.content.len() {
            node.content = trimmed.to_string();
        }
    }
    tree
}
