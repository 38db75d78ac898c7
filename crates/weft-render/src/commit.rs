#![forbid(unsafe_code)]

//! Commit phase.
//!
//! Committing applies a finished work-in-progress tree to the surface in one
//! synchronous pass, then makes it the current generation:
//!
//! 1. every queued deletion detaches its nearest node-owning fiber from the
//!    nearest node-owning ancestor;
//! 2. a pre-order walk (child before sibling) from the root's first child
//!    inserts `Placement` nodes and patches `Update` nodes;
//! 3. the committed root becomes `current`, the previous generation is
//!    freed, and alternate links on the new generation are cleared.
//!
//! # Invariants
//!
//! 1. No surface mutation happens outside [`Renderer::commit_root`].
//! 2. A placed node lands before the first following sibling node that is
//!    already on the surface, so surface order matches element order.
//! 3. The walk uses an explicit stack; depth is bounded by memory, not by the
//!    call stack.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Deleted component with no node below it | Nothing detached (traced) |
//! | Fiber with no node-owning ancestor | Skipped |

use smallvec::SmallVec;
use weft_core::HostAdapter;

use crate::fiber::{EffectTag, FiberId};
use crate::reconcile::ReconcileStats;
use crate::renderer::Renderer;

/// Surface operations performed by one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Nodes inserted into a parent.
    pub attached: usize,
    /// Nodes whose properties changed.
    pub patched: usize,
    /// Nodes removed from a parent.
    pub detached: usize,
    /// Attribute and listener operations issued.
    pub property_ops: usize,
    /// Fibers that were queued for deletion.
    pub deletions: usize,
    /// Reconciliation counts accumulated over the committed cycle.
    pub reconcile: ReconcileStats,
}

impl CommitReport {
    /// Whether the commit changed the surface at all.
    #[must_use]
    pub fn any_mutation(&self) -> bool {
        self.attached > 0 || self.detached > 0 || self.property_ops > 0
    }
}

impl<A: HostAdapter> Renderer<A> {
    /// Commit the pending work-in-progress tree.
    ///
    /// Returns `None` when there is nothing to commit.
    pub fn commit_root(&mut self) -> Option<CommitReport> {
        let wip = self.wip_root?;

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("weft.commit", deletions = self.deletions.len()).entered();

        let mut report = CommitReport::default();
        let deletions = std::mem::take(&mut self.deletions);
        report.deletions = deletions.len();
        report.reconcile = std::mem::take(&mut self.stats);
        for id in deletions {
            self.commit_deletion(id, &mut report);
        }

        let mut stack: SmallVec<[FiberId; 16]> = SmallVec::new();
        stack.extend(self.tree.get(wip).and_then(|root| root.child));
        while let Some(id) = stack.pop() {
            self.commit_work(id, &mut report);
            if let Some(fiber) = self.tree.get(id) {
                stack.extend(fiber.sibling);
                stack.extend(fiber.child);
            }
        }

        let previous = self.current_root.replace(wip);
        self.wip_root = None;
        if let Some(previous) = previous {
            self.tree.free_subtree(previous);
        }
        self.tree.clear_alternates(wip);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attached = report.attached,
            patched = report.patched,
            detached = report.detached,
            property_ops = report.property_ops,
            structure_changed = report.reconcile.structure_changed(),
            live_fibers = self.tree.len(),
            "commit applied"
        );

        Some(report)
    }

    fn commit_work(&mut self, id: FiberId, report: &mut CommitReport) {
        let Some(fiber) = self.tree.get(id) else {
            return;
        };
        let (Some(effect), Some(node)) = (fiber.effect, fiber.node.clone()) else {
            return;
        };
        let Some(parent) = self
            .tree
            .host_parent(id)
            .and_then(|parent| self.tree.get(parent))
            .and_then(|parent| parent.node.clone())
        else {
            return;
        };

        match effect {
            EffectTag::Placement => {
                match self.host_sibling(id) {
                    Some(anchor) => self.adapter.insert_before(&parent, &node, &anchor),
                    None => self.adapter.attach(&parent, &node),
                }
                report.attached += 1;
            }
            EffectTag::Update => {
                let Some(fiber) = self.tree.get(id) else {
                    return;
                };
                let Some(old) = fiber.alternate.and_then(|alternate| self.tree.get(alternate)) else {
                    return;
                };
                let ops = self
                    .adapter
                    .patch_node(&node, old.element.props(), fiber.element.props());
                if ops > 0 {
                    report.patched += 1;
                    report.property_ops += ops;
                }
            }
            EffectTag::Deletion => {}
        }
    }

    fn commit_deletion(&mut self, id: FiberId, report: &mut CommitReport) {
        let Some(parent) = self
            .tree
            .host_parent(id)
            .and_then(|parent| self.tree.get(parent))
            .and_then(|parent| parent.node.clone())
        else {
            return;
        };

        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(fiber) = self.tree.get(current) else {
                break;
            };
            if let Some(node) = fiber.node.clone() {
                self.adapter.detach(&parent, &node);
                report.detached += 1;
                return;
            }
            cursor = fiber.child;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(fiber = ?id, "deleted fiber owns no node");
    }

    /// First node after `id` among its host siblings that is already on the
    /// surface. Component fibers are looked through; siblings still awaiting
    /// placement are skipped.
    fn host_sibling(&self, id: FiberId) -> Option<A::Node> {
        let mut cursor = id;
        'siblings: loop {
            loop {
                let fiber = self.tree.get(cursor)?;
                if let Some(sibling) = fiber.sibling {
                    cursor = sibling;
                    break;
                }
                let parent = self.tree.get(fiber.parent?)?;
                if !parent.kind.is_component() {
                    return None;
                }
                cursor = fiber.parent?;
            }

            loop {
                let fiber = self.tree.get(cursor)?;
                if fiber.effect == Some(EffectTag::Placement) {
                    continue 'siblings;
                }
                if !fiber.kind.is_component() {
                    return fiber.node.clone();
                }
                match fiber.child {
                    Some(child) => cursor = child,
                    None => continue 'siblings,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ListHost;
    use weft_core::{Component, Element};

    fn drain(renderer: &mut Renderer<ListHost>) -> CommitReport {
        let mut next = renderer.wip_root();
        while let Some(id) = next {
            next = renderer.perform_unit_of_work(id);
        }
        renderer.commit_root().unwrap()
    }

    fn mount(renderer: &mut Renderer<ListHost>, element: Element) -> CommitReport {
        renderer.begin_cycle(0, element);
        drain(renderer)
    }

    #[test]
    fn first_commit_attaches_in_order() {
        let mut renderer = Renderer::new(ListHost::default());
        let report = mount(
            &mut renderer,
            Element::host("div")
                .child(Element::host("a").child("bar"))
                .child(Element::host("b"))
                .build(),
        );
        assert_eq!(report.attached, 4);
        assert_eq!(renderer.adapter().outline(0), "div(a(#text) b)");
    }

    #[test]
    fn nothing_to_commit_without_a_cycle() {
        let mut renderer = Renderer::new(ListHost::default());
        assert!(renderer.commit_root().is_none());
    }

    #[test]
    fn placement_before_surviving_sibling_keeps_order() {
        let mut renderer = Renderer::new(ListHost::default());
        let list = |tags: &[&'static str]| {
            Element::host("ul")
                .children(tags.iter().map(|tag| Element::host(*tag)))
                .build()
        };
        mount(&mut renderer, list(&["a", "b"]));
        let report = mount(&mut renderer, list(&["c", "b"]));
        assert_eq!(report.detached, 1);
        assert_eq!(report.attached, 1);
        assert_eq!(
            report.reconcile,
            ReconcileStats {
                placements: 1,
                updates: 2,
                deletions: 1,
            }
        );
        assert_eq!(renderer.adapter().outline(0), "ul(c b)");
    }

    #[test]
    fn anchor_search_looks_through_components() {
        let wrap = Component::new("Wrap", |scope| {
            Element::host("span").children(scope.children().iter().cloned()).build()
        });
        let mut renderer = Renderer::new(ListHost::default());
        let tree = |first: &'static str| {
            Element::host("div")
                .child(Element::host(first))
                .child(Element::component(&wrap).child("x"))
                .build()
        };
        mount(&mut renderer, tree("a"));
        mount(&mut renderer, tree("b"));
        assert_eq!(renderer.adapter().outline(0), "div(b span(#text))");
    }

    #[test]
    fn deleting_a_component_detaches_its_host_child() {
        let inner = Component::new("Inner", |_| Element::host("p").build());
        let mut renderer = Renderer::new(ListHost::default());
        mount(
            &mut renderer,
            Element::host("div").child(Element::component(&inner)).build(),
        );
        let report = mount(&mut renderer, Element::host("div").build());
        assert_eq!(report.detached, 1);
        assert_eq!(renderer.adapter().outline(0), "div");
    }

    #[test]
    fn unchanged_rerender_issues_no_mutations() {
        let mut renderer = Renderer::new(ListHost::default());
        let element = Element::host("div").attr("id", "foo").child("hi").build();
        mount(&mut renderer, element.clone());
        let report = mount(&mut renderer, element);
        assert!(!report.any_mutation());
        assert!(!report.reconcile.structure_changed());
        assert_eq!(report.reconcile.updates, 2);
    }

    #[test]
    fn previous_generation_is_freed() {
        let mut renderer = Renderer::new(ListHost::default());
        let element = Element::host("div").child("a").child("b").build();
        mount(&mut renderer, element.clone());
        let live = renderer.tree().len();
        mount(&mut renderer, element);
        assert_eq!(renderer.tree().len(), live);
        let root = renderer.current_root().unwrap();
        assert!(
            renderer
                .tree()
                .preorder(root)
                .all(|id| renderer.tree().get(id).unwrap().alternate.is_none())
        );
    }
}
