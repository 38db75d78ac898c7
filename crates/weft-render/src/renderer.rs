#![forbid(unsafe_code)]

//! Render cycle state.
//!
//! A [`Renderer`] owns everything one render target needs between turns: the
//! host adapter, the fiber arena, the committed root (`current`), the root
//! being built (`wip`), and the deletions collected for the next commit.
//!
//! # Invariants
//!
//! 1. At most one work-in-progress root exists. Starting a new cycle frees
//!    any pending one before seeding the next.
//! 2. `current` is only replaced by a commit.
//! 3. Every fiber in `deletions` belongs to the `current` generation.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Restart requested with nothing rendered | No-op, returns `None` |
//! | Restart before the first commit | Re-seeds from the pending root; queued state on it is lost |
//! | Restart while a new render is pending | Keeps the pending element; only the work done on it is redone |

use weft_core::{Element, HostAdapter, RestartSignal};

use crate::fiber::{Fiber, FiberId, FiberTree};
use crate::reconcile::ReconcileStats;

/// Owner of a render target's fiber generations.
pub struct Renderer<A: HostAdapter> {
    pub(crate) adapter: A,
    pub(crate) tree: FiberTree<A::Node>,
    pub(crate) current_root: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) stats: ReconcileStats,
    pub(crate) restart: RestartSignal,
}

impl<A: HostAdapter> Renderer<A> {
    /// Create a renderer driving `adapter`.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            tree: FiberTree::new(),
            current_root: None,
            wip_root: None,
            deletions: Vec::new(),
            stats: ReconcileStats::default(),
            restart: RestartSignal::new(),
        }
    }

    /// Seed a new cycle rendering `element` into `container`.
    ///
    /// Returns the new work-in-progress root, which is the first unit of work.
    pub fn begin_cycle(&mut self, container: A::Node, element: Element) -> FiberId {
        self.abandon_pending();
        let root = self
            .tree
            .insert(Fiber::root(element, container, self.current_root));
        self.wip_root = Some(root);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            root = ?root,
            has_current = self.current_root.is_some(),
            "render cycle seeded"
        );

        root
    }

    /// Re-seed the cycle so queued state transitions are picked up.
    ///
    /// The new cycle renders the pending root's element when a render is in
    /// progress, otherwise the committed root's, and diffs against `current`
    /// either way. Returns the new work-in-progress root.
    pub fn restart_from_current(&mut self) -> Option<FiberId> {
        let source = self.wip_root.or(self.current_root)?;
        let (element, container) = {
            let fiber = self.tree.get(source)?;
            (fiber.element.clone(), fiber.node.clone()?)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            from_current = self.current_root.is_some(),
            abandoned = self.wip_root.is_some(),
            "restarting render from root"
        );

        Some(self.begin_cycle(container, element))
    }

    /// Free the pending work-in-progress tree, if any.
    fn abandon_pending(&mut self) {
        self.deletions.clear();
        self.stats = ReconcileStats::default();
        if let Some(wip) = self.wip_root.take() {
            let _freed = self.tree.free_subtree(wip);

            #[cfg(feature = "tracing")]
            tracing::debug!(freed = _freed, "superseded pending render");
        }
    }

    /// Whether a work-in-progress root is waiting to be committed.
    #[must_use]
    pub fn has_pending_commit(&self) -> bool {
        self.wip_root.is_some()
    }

    /// Committed root.
    #[must_use]
    pub fn current_root(&self) -> Option<FiberId> {
        self.current_root
    }

    /// Root being built.
    #[must_use]
    pub fn wip_root(&self) -> Option<FiberId> {
        self.wip_root
    }

    /// Old fibers queued for removal at the next commit.
    #[must_use]
    pub fn deletions(&self) -> &[FiberId] {
        &self.deletions
    }

    /// Reconciliation counts of the pending cycle so far.
    #[must_use]
    pub fn cycle_stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Signal raised by state setters.
    #[must_use]
    pub fn restart_signal(&self) -> &RestartSignal {
        &self.restart
    }

    /// Fiber arena.
    #[must_use]
    pub fn tree(&self) -> &FiberTree<A::Node> {
        &self.tree
    }

    /// Host adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Host adapter, mutably.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Consume the renderer, returning its adapter.
    pub fn into_adapter(self) -> A {
        self.adapter
    }
}

impl<A: HostAdapter + std::fmt::Debug> std::fmt::Debug for Renderer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("adapter", &self.adapter)
            .field("fibers", &self.tree.len())
            .field("current_root", &self.current_root)
            .field("wip_root", &self.wip_root)
            .field("deletions", &self.deletions.len())
            .finish()
    }
}
