#![forbid(unsafe_code)]

//! In-memory rendering surface.
//!
//! [`MemorySurface`] implements [`HostAdapter`] over an arena of plain nodes
//! and records every operation it receives in a [`Mutation`] log. Tests read
//! the result back as markup ([`MemorySurface::render_markup`]), inspect the
//! log to check ordering and atomicity, and fire listeners with
//! [`MemorySurface::dispatch`].
//!
//! Nodes are never freed: a detached node keeps its id and contents, so a
//! stale handle can still be inspected.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ahash::AHashMap;
use serde::Serialize;
use weft_core::{Event, HostAdapter, Listener, PropValue, TEXT_VALUE_ATTR};

/// Handle to a node on a [`MemorySurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A render target created by the test.
    Container,
    /// An element-like node.
    Element(String),
    /// A text-like node.
    Text,
}

/// One node's state.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    /// Node kind.
    pub kind: NodeKind,
    /// Assigned attributes.
    pub attributes: BTreeMap<String, PropValue>,
    /// Installed listeners by event name.
    pub listeners: AHashMap<String, Vec<Listener>>,
    /// Children in order.
    pub children: Vec<NodeId>,
    /// Current parent.
    pub parent: Option<NodeId>,
}

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            listeners: AHashMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    /// Tag of an element node.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Number of listeners installed for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }
}

/// One operation received from the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// A node was created.
    Create { node: NodeId, kind: String },
    /// An attribute was assigned.
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    /// An attribute was cleared.
    RemoveAttribute { node: NodeId, name: String },
    /// A listener was installed.
    AddListener { node: NodeId, event: String },
    /// A listener was uninstalled.
    RemoveListener { node: NodeId, event: String },
    /// A node was appended to a parent.
    Attach { parent: NodeId, child: NodeId },
    /// A node was inserted before an existing child.
    InsertBefore {
        parent: NodeId,
        child: NodeId,
        anchor: NodeId,
    },
    /// A node was removed from a parent.
    Detach { parent: NodeId, child: NodeId },
}

impl Mutation {
    /// Whether this changes the tree structure.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Attach { .. } | Self::InsertBefore { .. } | Self::Detach { .. }
        )
    }

    /// Whether this changes attributes or listeners.
    #[must_use]
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            Self::SetAttribute { .. }
                | Self::RemoveAttribute { .. }
                | Self::AddListener { .. }
                | Self::RemoveListener { .. }
        )
    }

    /// Whether this created a node.
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }

    /// Node the operation targets (the child for structural operations).
    #[must_use]
    pub fn node(&self) -> NodeId {
        match self {
            Self::Create { node, .. }
            | Self::SetAttribute { node, .. }
            | Self::RemoveAttribute { node, .. }
            | Self::AddListener { node, .. }
            | Self::RemoveListener { node, .. } => *node,
            Self::Attach { child, .. }
            | Self::InsertBefore { child, .. }
            | Self::Detach { child, .. } => *child,
        }
    }
}

/// An in-memory [`HostAdapter`] with a mutation log.
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: Vec<MemoryNode>,
    log: Vec<Mutation>,
}

impl MemorySurface {
    /// Create an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a render target. Containers are not logged.
    pub fn create_container(&mut self) -> NodeId {
        self.push(MemoryNode::new(NodeKind::Container))
    }

    fn push(&mut self, node: MemoryNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0)
    }

    /// Nodes ever created, containers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `id`.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Attribute value on `id`.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        self.node(id)?.attributes.get(name)
    }

    /// Operations received so far.
    #[must_use]
    pub fn log(&self) -> &[Mutation] {
        &self.log
    }

    /// Drain the operation log.
    pub fn take_log(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    /// The operation log as a JSON array.
    pub fn log_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.log)
    }

    /// Markup for the subtree under `id`. A container renders only its
    /// children.
    #[must_use]
    pub fn render_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        match self.node(id).map(|node| &node.kind) {
            Some(NodeKind::Container) => {
                for &child in self.children(id) {
                    self.write_markup(child, &mut out);
                }
            }
            Some(_) => self.write_markup(id, &mut out),
            None => {}
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text => {
                if let Some(value) = node.attributes.get(TEXT_VALUE_ATTR) {
                    let _ = write!(out, "{value}");
                }
            }
            NodeKind::Element(tag) => {
                let _ = write!(out, "<{tag}");
                for (name, value) in &node.attributes {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                for &child in &node.children {
                    self.write_markup(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
            NodeKind::Container => {
                for &child in &node.children {
                    self.write_markup(child, out);
                }
            }
        }
    }

    /// Concatenated text under `id`.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            if node.kind == NodeKind::Text {
                if let Some(value) = node.attributes.get(TEXT_VALUE_ATTR) {
                    let _ = write!(out, "{value}");
                }
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// First element with `tag` under `root`, in document order.
    #[must_use]
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            if node.tag() == Some(tag) {
                return Some(current);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Fire `event` at `id`. Returns the number of listeners invoked.
    pub fn dispatch(&self, id: NodeId, event: &Event) -> usize {
        let listeners: Vec<Listener> = self
            .node(id)
            .and_then(|node| node.listeners.get(&event.name))
            .cloned()
            .unwrap_or_default();
        tracing::trace!(node = id.0, event = %event.name, listeners = listeners.len(), "dispatch");
        for listener in &listeners {
            listener.call(event);
        }
        listeners.len()
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child.0).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.retain(|&c| c != child);
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0)
    }
}

impl HostAdapter for MemorySurface {
    type Node = NodeId;

    fn create_element_node(&mut self, tag: &str) -> NodeId {
        let node = self.push(MemoryNode::new(NodeKind::Element(tag.to_owned())));
        self.log.push(Mutation::Create {
            node,
            kind: tag.to_owned(),
        });
        node
    }

    fn create_text_node(&mut self) -> NodeId {
        let node = self.push(MemoryNode::new(NodeKind::Text));
        self.log.push(Mutation::Create {
            node,
            kind: "#text".to_owned(),
        });
        node
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &PropValue) {
        if let Some(target) = self.node_mut(*node) {
            target.attributes.insert(name.to_owned(), value.clone());
        }
        self.log.push(Mutation::SetAttribute {
            node: *node,
            name: name.to_owned(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) {
        if let Some(target) = self.node_mut(*node) {
            target.attributes.remove(name);
        }
        self.log.push(Mutation::RemoveAttribute {
            node: *node,
            name: name.to_owned(),
        });
    }

    fn add_listener(&mut self, node: &NodeId, event: &str, listener: &Listener) {
        if let Some(target) = self.node_mut(*node) {
            target
                .listeners
                .entry(event.to_owned())
                .or_default()
                .push(listener.clone());
        }
        self.log.push(Mutation::AddListener {
            node: *node,
            event: event.to_owned(),
        });
    }

    fn remove_listener(&mut self, node: &NodeId, event: &str, listener: &Listener) {
        if let Some(installed) = self
            .node_mut(*node)
            .and_then(|target| target.listeners.get_mut(event))
        {
            if let Some(at) = installed.iter().position(|l| l.ptr_eq(listener)) {
                installed.remove(at);
            }
        }
        self.log.push(Mutation::RemoveListener {
            node: *node,
            event: event.to_owned(),
        });
    }

    fn attach(&mut self, parent: &NodeId, child: &NodeId) {
        self.unlink(*child);
        if let Some(target) = self.node_mut(*parent) {
            target.children.push(*child);
        }
        if let Some(target) = self.node_mut(*child) {
            target.parent = Some(*parent);
        }
        self.log.push(Mutation::Attach {
            parent: *parent,
            child: *child,
        });
    }

    fn insert_before(&mut self, parent: &NodeId, child: &NodeId, anchor: &NodeId) {
        self.unlink(*child);
        if let Some(target) = self.node_mut(*parent) {
            match target.children.iter().position(|c| c == anchor) {
                Some(at) => target.children.insert(at, *child),
                None => target.children.push(*child),
            }
        }
        if let Some(target) = self.node_mut(*child) {
            target.parent = Some(*parent);
        }
        self.log.push(Mutation::InsertBefore {
            parent: *parent,
            child: *child,
            anchor: *anchor,
        });
    }

    fn detach(&mut self, parent: &NodeId, child: &NodeId) {
        if let Some(target) = self.node_mut(*parent) {
            target.children.retain(|c| c != child);
        }
        if let Some(target) = self.node_mut(*child) {
            if target.parent == Some(*parent) {
                target.parent = None;
            }
        }
        self.log.push(Mutation::Detach {
            parent: *parent,
            child: *child,
        });
    }
}
