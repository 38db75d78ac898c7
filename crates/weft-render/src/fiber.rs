#![forbid(unsafe_code)]

//! Fiber arena and traversal.
//!
//! Every fiber lives in a [`FiberTree`], a generational slot map. Structure
//! flows through `child` and `sibling` links; `parent` and `alternate` are
//! plain back references and never keep anything alive.
//!
//! # Invariants
//!
//! 1. A fiber's children are `child`, then `child.sibling`, and so on.
//! 2. `alternate` names the fiber of the previous generation at the same
//!    position with the same type, or nothing.
//! 3. Only the root, host, and text fibers own a node handle; component
//!    fibers never do.
//! 4. A freed [`FiberId`] resolves to `None`, never to a different fiber.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Traversal from an absent fiber | Returns `None` |
//! | `free_subtree` on an absent fiber | Frees nothing, returns 0 |

use std::borrow::Cow;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use weft_core::{Component, Element, ElementType, HookSlot, HostKind};

new_key_type! {
    /// Generational handle to a fiber.
    pub struct FiberId;
}

/// Commit-time action recorded on a fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTag {
    /// Insert the fiber's node into its host parent.
    Placement,
    /// Patch the fiber's node from its alternate's properties.
    Update,
    /// Remove the fiber's node from its host parent.
    Deletion,
}

/// Role of a fiber, resolved once from its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum FiberKind {
    /// Top of a generation; owns the container node.
    Root,
    /// A host element with the given tag.
    Host(Cow<'static, str>),
    /// A text node.
    Text,
    /// A user component.
    Component(Component),
}

impl FiberKind {
    /// Kind of fiber produced for an element of type `ty`.
    #[must_use]
    pub fn of(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(tag) => Self::Host(tag.clone()),
            ElementType::Text => Self::Text,
            ElementType::Component(component) => Self::Component(component.clone()),
        }
    }

    /// Host node kind, for fibers that own a node created by the adapter.
    #[must_use]
    pub fn host_kind(&self) -> Option<HostKind<'_>> {
        match self {
            Self::Host(tag) => Some(HostKind::Element(tag)),
            Self::Text => Some(HostKind::Text),
            Self::Root | Self::Component(_) => None,
        }
    }

    /// Whether this is a component fiber.
    #[must_use]
    pub fn is_component(&self) -> bool {
        matches!(self, Self::Component(_))
    }
}

/// One unit of work.
pub struct Fiber<N> {
    /// Role of the fiber.
    pub kind: FiberKind,
    /// Element this fiber was produced from. For the root, the element being
    /// rendered into the container.
    pub element: Element,
    /// Physical node handle, once created.
    pub node: Option<N>,
    /// Enclosing fiber.
    pub parent: Option<FiberId>,
    /// First child.
    pub child: Option<FiberId>,
    /// Next sibling.
    pub sibling: Option<FiberId>,
    /// Previous-generation counterpart.
    pub alternate: Option<FiberId>,
    /// Pending commit action.
    pub effect: Option<EffectTag>,
    /// Hook records (component fibers only).
    pub hooks: Vec<HookSlot>,
}

impl<N> Fiber<N> {
    /// Root fiber rendering `element` into `container`.
    pub fn root(element: Element, container: N, alternate: Option<FiberId>) -> Self {
        Self {
            kind: FiberKind::Root,
            element,
            node: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: None,
            hooks: Vec::new(),
        }
    }

    /// Fresh fiber for `element` under `parent`, with no links yet.
    pub fn for_element(element: Element, parent: FiberId) -> Self {
        Self {
            kind: FiberKind::of(element.ty()),
            element,
            node: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: None,
            hooks: Vec::new(),
        }
    }
}

impl<N> std::fmt::Debug for Fiber<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fiber")
            .field("kind", &self.element.ty().label())
            .field("has_node", &self.node.is_some())
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("alternate", &self.alternate)
            .field("effect", &self.effect)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Arena of fibers across all live generations.
pub struct FiberTree<N> {
    fibers: SlotMap<FiberId, Fiber<N>>,
}

impl<N> Default for FiberTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> FiberTree<N> {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }

    /// Store a fiber.
    pub fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
        self.fibers.insert(fiber)
    }

    /// Look up a fiber.
    #[must_use]
    pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
        self.fibers.get(id)
    }

    /// Look up a fiber mutably.
    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<N>> {
        self.fibers.get_mut(id)
    }

    /// Whether `id` names a live fiber.
    #[must_use]
    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    /// Number of live fibers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    /// Whether the arena holds no fibers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// The fiber to work on after `id`: its child, else its sibling, else the
    /// nearest ancestor's sibling. `None` once the climb passes the root.
    #[must_use]
    pub fn next_unit_of_work(&self, id: FiberId) -> Option<FiberId> {
        let fiber = self.get(id)?;
        if let Some(child) = fiber.child {
            return Some(child);
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let fiber = self.get(current)?;
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            cursor = fiber.parent;
        }
        None
    }

    /// Nearest proper ancestor of `id` that owns a node.
    #[must_use]
    pub fn host_parent(&self, id: FiberId) -> Option<FiberId> {
        let mut cursor = self.get(id)?.parent;
        while let Some(current) = cursor {
            let fiber = self.get(current)?;
            if fiber.node.is_some() {
                return Some(current);
            }
            cursor = fiber.parent;
        }
        None
    }

    /// Children of `id` in order.
    pub fn children(&self, id: FiberId) -> Children<'_, N> {
        Children {
            tree: self,
            next: self.get(id).and_then(|fiber| fiber.child),
        }
    }

    /// Pre-order walk of `root` and its descendants (not its siblings).
    pub fn preorder(&self, root: FiberId) -> Preorder<'_, N> {
        let mut stack = SmallVec::new();
        if self.contains(root) {
            stack.push(root);
        }
        Preorder {
            tree: self,
            root,
            stack,
        }
    }

    /// Remove `root` and all of its descendants. Returns the number freed.
    pub fn free_subtree(&mut self, root: FiberId) -> usize {
        let mut freed = 0;
        let mut stack: SmallVec<[FiberId; 16]> = SmallVec::new();
        if let Some(fiber) = self.fibers.remove(root) {
            freed += 1;
            stack.extend(fiber.child);
        }
        while let Some(id) = stack.pop() {
            if let Some(fiber) = self.fibers.remove(id) {
                freed += 1;
                stack.extend(fiber.sibling);
                stack.extend(fiber.child);
            }
        }
        freed
    }

    /// Drop every alternate link under `root`.
    pub fn clear_alternates(&mut self, root: FiberId) {
        let ids: Vec<FiberId> = self.preorder(root).collect();
        for id in ids {
            if let Some(fiber) = self.get_mut(id) {
                fiber.alternate = None;
            }
        }
    }
}

/// Iterator over a fiber's children.
pub struct Children<'a, N> {
    tree: &'a FiberTree<N>,
    next: Option<FiberId>,
}

impl<N> Iterator for Children<'_, N> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.next?;
        self.next = self.tree.get(id).and_then(|fiber| fiber.sibling);
        Some(id)
    }
}

/// Pre-order iterator over a subtree.
pub struct Preorder<'a, N> {
    tree: &'a FiberTree<N>,
    root: FiberId,
    stack: SmallVec<[FiberId; 16]>,
}

impl<N> Iterator for Preorder<'_, N> {
    type Item = FiberId;

    fn next(&mut self) -> Option<FiberId> {
        let id = self.stack.pop()?;
        let fiber = self.tree.get(id)?;
        // Siblings of the subtree root stay out of the walk.
        if id != self.root {
            self.stack.extend(fiber.sibling);
        }
        self.stack.extend(fiber.child);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::Element;

    fn leaf(tree: &mut FiberTree<()>, tag: &'static str, parent: FiberId) -> FiberId {
        tree.insert(Fiber::for_element(Element::host(tag).build(), parent))
    }

    /// root -> div -> (a -> text, b)
    fn sample() -> (FiberTree<()>, [FiberId; 5]) {
        let mut tree = FiberTree::new();
        let root = tree.insert(Fiber::root(Element::host("div").build(), (), None));
        let div = leaf(&mut tree, "div", root);
        let a = leaf(&mut tree, "a", div);
        let text = tree.insert(Fiber::for_element(weft_core::create_text_element("bar"), a));
        let b = leaf(&mut tree, "b", div);
        tree.get_mut(root).unwrap().child = Some(div);
        tree.get_mut(div).unwrap().child = Some(a);
        tree.get_mut(a).unwrap().child = Some(text);
        tree.get_mut(a).unwrap().sibling = Some(b);
        (tree, [root, div, a, text, b])
    }

    #[test]
    fn next_unit_follows_child_sibling_uncle() {
        let (tree, [root, div, a, text, b]) = sample();
        assert_eq!(tree.next_unit_of_work(root), Some(div));
        assert_eq!(tree.next_unit_of_work(div), Some(a));
        assert_eq!(tree.next_unit_of_work(a), Some(text));
        assert_eq!(tree.next_unit_of_work(text), Some(b));
        assert_eq!(tree.next_unit_of_work(b), None);
    }

    #[test]
    fn absent_fiber_has_no_next_unit() {
        let (mut tree, [_, div, ..]) = sample();
        tree.free_subtree(div);
        assert_eq!(tree.next_unit_of_work(div), None);
    }

    #[test]
    fn preorder_matches_unit_order() {
        let (tree, [root, div, a, text, b]) = sample();
        let order: Vec<_> = tree.preorder(root).collect();
        assert_eq!(order, vec![root, div, a, text, b]);
    }

    #[test]
    fn preorder_of_inner_fiber_skips_its_siblings() {
        let (tree, [_, _, a, text, _]) = sample();
        let order: Vec<_> = tree.preorder(a).collect();
        assert_eq!(order, vec![a, text]);
    }

    #[test]
    fn host_parent_skips_nodeless_ancestors() {
        let (mut tree, [root, div, a, text, _]) = sample();
        assert_eq!(tree.host_parent(div), Some(root));
        assert_eq!(tree.host_parent(text), Some(root));
        tree.get_mut(div).unwrap().node = Some(());
        assert_eq!(tree.host_parent(text), Some(div));
        tree.get_mut(a).unwrap().node = Some(());
        assert_eq!(tree.host_parent(text), Some(a));
    }

    #[test]
    fn free_subtree_leaves_siblings() {
        let (mut tree, [root, _, a, text, b]) = sample();
        assert_eq!(tree.free_subtree(a), 2);
        assert!(!tree.contains(text));
        assert!(tree.contains(b));
        assert!(tree.contains(root));
    }

    #[test]
    fn stale_ids_do_not_alias() {
        let (mut tree, [root, ..]) = sample();
        assert_eq!(tree.free_subtree(root), 5);
        assert!(tree.is_empty());
        let fresh = tree.insert(Fiber::root(Element::host("div").build(), (), None));
        assert!(tree.get(root).is_none());
        assert!(tree.get(fresh).is_some());
    }

    #[test]
    fn children_iterates_sibling_chain() {
        let (tree, [_, div, a, _, b]) = sample();
        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![a, b]);
    }

    mod traversal_properties {
        use super::*;
        use proptest::prelude::*;

        /// Grow a tree by appending each new fiber as the last child of an
        /// existing one, chosen by `parents`.
        fn grow(parents: &[usize]) -> (FiberTree<()>, FiberId) {
            let mut tree = FiberTree::new();
            let root = tree.insert(Fiber::root(Element::host("div").build(), (), None));
            let mut ids = vec![root];
            for &choice in parents {
                let parent = ids[choice % ids.len()];
                let id = leaf(&mut tree, "p", parent);
                let last = tree.children(parent).last();
                match last {
                    Some(last) => tree.get_mut(last).unwrap().sibling = Some(id),
                    None => tree.get_mut(parent).unwrap().child = Some(id),
                }
                ids.push(id);
            }
            (tree, root)
        }

        proptest! {
            #[test]
            fn unit_chain_is_the_preorder_walk(parents in prop::collection::vec(0usize..64, 0..40)) {
                let (tree, root) = grow(&parents);
                let chain: Vec<FiberId> =
                    std::iter::successors(Some(root), |&id| tree.next_unit_of_work(id)).collect();
                let walk: Vec<FiberId> = tree.preorder(root).collect();
                prop_assert_eq!(chain.len(), tree.len());
                prop_assert_eq!(chain, walk);
            }

            #[test]
            fn freeing_the_root_empties_the_arena(parents in prop::collection::vec(0usize..64, 0..40)) {
                let (mut tree, root) = grow(&parents);
                let total = tree.len();
                prop_assert_eq!(tree.free_subtree(root), total);
                prop_assert!(tree.is_empty());
            }
        }
    }
}
