#![forbid(unsafe_code)]

//! Host node adapter contract.
//!
//! The reconciler never touches a rendering surface directly. It goes through
//! a [`HostAdapter`], which owns the physical nodes and exposes a small set of
//! primitives. The provided methods [`HostAdapter::create_node`] and
//! [`HostAdapter::patch_node`] build the higher-level contract on top of them.
//!
//! # Invariants
//!
//! 1. `create_node` assigns every attribute, then installs every listener.
//! 2. `patch_node` applies operations in [`PropsDiff`] order: removed
//!    listeners, cleared attributes, set attributes, added listeners. A clear
//!    is never issued for an attribute that is being set.
//! 3. Node handles are cheap to clone; a clone names the same physical node.

use crate::props::{Listener, PropValue, Props, PropsDiff};

/// What kind of physical node to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind<'a> {
    /// An element-like node with the given tag.
    Element(&'a str),
    /// A text-like node.
    Text,
}

/// A rendering surface the reconciler can drive.
pub trait HostAdapter {
    /// Handle to a physical node.
    type Node: Clone;

    /// Create an empty element-like node.
    fn create_element_node(&mut self, tag: &str) -> Self::Node;

    /// Create an empty text-like node.
    fn create_text_node(&mut self) -> Self::Node;

    /// Assign an attribute.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &PropValue);

    /// Clear an attribute.
    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    /// Install a listener for `event`.
    fn add_listener(&mut self, node: &Self::Node, event: &str, listener: &Listener);

    /// Uninstall a previously installed listener.
    fn remove_listener(&mut self, node: &Self::Node, event: &str, listener: &Listener);

    /// Append `child` as the last child of `parent`.
    fn attach(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Remove `child` from `parent`.
    fn detach(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Insert `child` into `parent` before `anchor`.
    ///
    /// Surfaces without positional insertion may keep the default, which
    /// appends.
    fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, anchor: &Self::Node) {
        let _ = anchor;
        self.attach(parent, child);
    }

    /// Create a node of `kind` carrying `props`.
    fn create_node(&mut self, kind: HostKind<'_>, props: &Props) -> Self::Node {
        let node = match kind {
            HostKind::Element(tag) => self.create_element_node(tag),
            HostKind::Text => self.create_text_node(),
        };
        for (name, value) in props.attributes() {
            self.set_attribute(&node, name, value);
        }
        for (event, listener) in props.listeners() {
            self.add_listener(&node, event, listener);
        }
        node
    }

    /// Bring `node` from `old` to `new` properties.
    ///
    /// Returns the number of property operations issued.
    fn patch_node(&mut self, node: &Self::Node, old: &Props, new: &Props) -> usize {
        let diff = PropsDiff::between(old, new);
        for (event, listener) in &diff.removed_listeners {
            self.remove_listener(node, event, listener);
        }
        for name in &diff.cleared {
            self.remove_attribute(node, name);
        }
        for (name, value) in &diff.set {
            self.set_attribute(node, name, value);
        }
        for (event, listener) in &diff.added_listeners {
            self.add_listener(node, event, listener);
        }
        diff.len()
    }
}
