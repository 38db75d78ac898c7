#![forbid(unsafe_code)]

//! Positional child reconciliation.
//!
//! [`reconcile_children`] walks a work-in-progress fiber's new child elements
//! alongside its alternate's old child fibers, pairing them by index:
//!
//! | Pair | Outcome |
//! |------|---------|
//! | old and new with equal type | new fiber tagged `Update`, reusing the old node |
//! | new only, or type differs | new fiber tagged `Placement` |
//! | old only, or type differs | old fiber tagged `Deletion` and queued |
//!
//! There is no key-based matching: a reorder is seen as a series of type
//! comparisons at each index.
//!
//! # Invariants
//!
//! 1. New fibers are linked as `child`, `sibling`, ... in element order.
//! 2. An `Update` fiber shares its alternate's node handle; its alternate is
//!    left untouched apart from the effect tag.
//! 3. Every old child is either the alternate of exactly one new fiber or in
//!    `deletions`.

use weft_core::Element;

use crate::fiber::{EffectTag, Fiber, FiberId, FiberTree};

/// Counts from one reconciliation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// New fibers tagged `Placement`.
    pub placements: usize,
    /// New fibers tagged `Update`.
    pub updates: usize,
    /// Old fibers queued for deletion.
    pub deletions: usize,
}

impl ReconcileStats {
    /// Whether the step changed the tree shape.
    #[must_use]
    pub fn structure_changed(&self) -> bool {
        self.placements > 0 || self.deletions > 0
    }

    /// Accumulate another step's counts.
    pub fn merge(&mut self, other: &Self) {
        self.placements += other.placements;
        self.updates += other.updates;
        self.deletions += other.deletions;
    }
}

/// Build the children of `wip` from `elements`, diffing against the children
/// of its alternate.
pub fn reconcile_children<N: Clone>(
    tree: &mut FiberTree<N>,
    deletions: &mut Vec<FiberId>,
    wip: FiberId,
    elements: &[Element],
) -> ReconcileStats {
    let mut stats = ReconcileStats::default();
    let alternate = match tree.get_mut(wip) {
        Some(fiber) => {
            fiber.child = None;
            fiber.alternate
        }
        None => return stats,
    };
    let mut old = alternate
        .and_then(|alternate| tree.get(alternate))
        .and_then(|alternate| alternate.child);

    let mut prev: Option<FiberId> = None;
    let mut index = 0;

    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let (same_type, old_node, next_old) = match old.and_then(|id| tree.get(id)) {
            Some(old_fiber) => {
                let same = element.is_some_and(|element| old_fiber.element.ty() == element.ty());
                let node = if same { old_fiber.node.clone() } else { None };
                (same, node, old_fiber.sibling)
            }
            None => (false, None, None),
        };

        let created = element.map(|element| {
            let mut fiber = Fiber::for_element(element.clone(), wip);
            if same_type {
                fiber.node = old_node;
                fiber.alternate = old;
                fiber.effect = Some(EffectTag::Update);
                stats.updates += 1;
            } else {
                fiber.effect = Some(EffectTag::Placement);
                stats.placements += 1;
            }
            tree.insert(fiber)
        });

        if let Some(old_id) = old.filter(|_| !same_type) {
            if let Some(old_fiber) = tree.get_mut(old_id) {
                old_fiber.effect = Some(EffectTag::Deletion);
            }
            deletions.push(old_id);
            stats.deletions += 1;
        }

        if let Some(new_id) = created {
            let slot = match prev {
                None => tree.get_mut(wip).map(|fiber| &mut fiber.child),
                Some(prev_id) => tree.get_mut(prev_id).map(|fiber| &mut fiber.sibling),
            };
            if let Some(slot) = slot {
                *slot = Some(new_id);
            }
            prev = Some(new_id);
        }

        old = next_old;
        index += 1;
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(
        placements = stats.placements,
        updates = stats.updates,
        deletions = stats.deletions,
        "reconciled children"
    );

    stats
}
