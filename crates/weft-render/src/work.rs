#![forbid(unsafe_code)]

//! Per-fiber work.
//!
//! Performing a unit of work on a fiber produces its children:
//!
//! - the root reconciles the single element it renders;
//! - a component runs its render function through a [`Scope`] seeded from
//!   its alternate's hooks, stores the new hooks, and reconciles the one
//!   element it returned;
//! - a host or text fiber gets its node from the adapter if it has none, then
//!   reconciles its element's children.
//!
//! Nothing here touches the rendered surface beyond creating detached nodes;
//! attaching happens only at commit.

use weft_core::{Element, HostAdapter, Scope};

use crate::fiber::{FiberId, FiberKind};
use crate::reconcile::{ReconcileStats, reconcile_children};
use crate::renderer::Renderer;

impl<A: HostAdapter> Renderer<A> {
    /// Do the work for fiber `id` and return the next unit of work.
    ///
    /// An absent fiber yields `None`.
    pub fn perform_unit_of_work(&mut self, id: FiberId) -> Option<FiberId> {
        let (kind, element) = {
            let fiber = self.tree.get(id)?;
            (fiber.kind.clone(), fiber.element.clone())
        };

        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("weft.unit", kind = element.ty().label()).entered();

        let stats = match &kind {
            FiberKind::Root => self.reconcile(id, std::slice::from_ref(&element)),
            FiberKind::Component(component) => {
                let (child, hooks) = {
                    let alternate = self.tree.get(id).and_then(|fiber| fiber.alternate);
                    let prior = alternate
                        .and_then(|alternate| self.tree.get(alternate))
                        .map_or(&[][..], |alternate| alternate.hooks.as_slice());
                    let mut scope = Scope::new(&element, prior, &self.restart);
                    let child = component.render(&mut scope);
                    (child, scope.into_hooks())
                };
                if let Some(fiber) = self.tree.get_mut(id) {
                    fiber.hooks = hooks;
                }
                self.reconcile(id, std::slice::from_ref(&child))
            }
            FiberKind::Host(_) | FiberKind::Text => {
                let needs_node = self.tree.get(id).is_some_and(|fiber| fiber.node.is_none());
                if needs_node {
                    if let Some(host_kind) = kind.host_kind() {
                        let node = self.adapter.create_node(host_kind, element.props());
                        if let Some(fiber) = self.tree.get_mut(id) {
                            fiber.node = Some(node);
                        }
                    }
                }
                self.reconcile(id, element.children())
            }
        };
        self.stats.merge(&stats);

        self.tree.next_unit_of_work(id)
    }

    fn reconcile(&mut self, id: FiberId, elements: &[Element]) -> ReconcileStats {
        reconcile_children(&mut self.tree, &mut self.deletions, id, elements)
    }
}
