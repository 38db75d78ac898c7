#![forbid(unsafe_code)]

//! Component state.
//!
//! A component receives a [`Scope`] while it renders. The scope serves
//! [`Scope::use_state`] calls by call order: the n-th call reads the n-th hook
//! record of the component's previous generation, folds every transition that
//! was queued on it since, and records a fresh hook for the next generation.
//!
//! # Invariants
//!
//! 1. Hook records are matched by call index only.
//! 2. Queued transitions are applied in enqueue order.
//! 3. Reading a prior hook never drains its queue: if an in-progress pass is
//!    abandoned and restarted, the restarted pass folds the same transitions
//!    again and reaches the same value.
//! 4. A [`StateSetter`] never touches scheduler state directly. It queues the
//!    transition and raises the shared [`RestartSignal`]; the scheduler picks
//!    the signal up between units of work.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Prior slot holds a different state type | Slot treated as a first call (logged) |
//! | Fewer calls than last render | Extra prior records are dropped |
//! | Setter used after its component unmounted | Transition is queued on an unread hook; a re-render is still requested |

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::element::Element;
use crate::props::Props;

/// Type-erased hook record stored on a component fiber.
pub type HookSlot = Box<dyn Any>;

type Transition<T> = Rc<dyn Fn(&T) -> T>;
type TransitionQueue<T> = Rc<RefCell<Vec<Transition<T>>>>;

// ============================================================================
// RestartSignal
// ============================================================================

/// Shared flag requesting a re-render from the committed root.
///
/// Cloning shares the flag.
#[derive(Clone, Default)]
pub struct RestartSignal(Rc<Cell<bool>>);

impl RestartSignal {
    /// Create a lowered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a restart.
    pub fn raise(&self) {
        self.0.set(true);
    }

    /// Whether a restart is pending.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.get()
    }

    /// Consume a pending request, lowering the flag.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }
}

impl fmt::Debug for RestartSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RestartSignal").field(&self.0.get()).finish()
    }
}

// ============================================================================
// State hook
// ============================================================================

struct StateHook<T> {
    value: T,
    queue: TransitionQueue<T>,
}

/// Handle for scheduling state transitions on one hook.
pub struct StateSetter<T> {
    queue: TransitionQueue<T>,
    restart: RestartSignal,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            restart: self.restart.clone(),
        }
    }
}

impl<T: 'static> StateSetter<T> {
    /// Queue a transition computed from the previous value and request a
    /// re-render.
    pub fn update(&self, transition: impl Fn(&T) -> T + 'static) {
        self.queue.borrow_mut().push(Rc::new(transition));
        self.restart.raise();
    }

    /// Queue a replacement value and request a re-render.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.update(move |_| value.clone());
    }

    /// Number of transitions queued on this hook.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Render context handed to a component for one invocation.
pub struct Scope<'a> {
    element: &'a Element,
    prior: &'a [HookSlot],
    hooks: Vec<HookSlot>,
    cursor: usize,
    restart: &'a RestartSignal,
}

impl<'a> Scope<'a> {
    /// Open a scope for `element`, reading hooks from `prior` (the previous
    /// generation's records, empty on first mount).
    #[must_use]
    pub fn new(element: &'a Element, prior: &'a [HookSlot], restart: &'a RestartSignal) -> Self {
        Self {
            element,
            prior,
            hooks: Vec::new(),
            cursor: 0,
            restart,
        }
    }

    /// Properties the component was rendered with.
    #[must_use]
    pub fn props(&self) -> &Props {
        self.element.props()
    }

    /// Children the component was rendered with.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        self.element.children()
    }

    /// Declare a piece of state seeded with `initial` on first mount.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state) but computes the initial value
    /// only when the slot is new.
    pub fn use_state_with<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, StateSetter<T>) {
        let index = self.cursor;
        self.cursor += 1;

        let prior_slot = self.prior.get(index);
        let prior = prior_slot.and_then(|slot| slot.downcast_ref::<StateHook<T>>());
        if prior.is_none() && prior_slot.is_some() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                hook = index,
                expected = std::any::type_name::<T>(),
                "hook slot changed state type; reinitializing"
            );
        }

        let value = match prior {
            Some(hook) => {
                let transitions: Vec<Transition<T>> = hook.queue.borrow().clone();
                transitions
                    .iter()
                    .fold(hook.value.clone(), |value, transition| transition(&value))
            }
            None => init(),
        };

        let queue: TransitionQueue<T> = Rc::new(RefCell::new(Vec::new()));
        let setter = StateSetter {
            queue: Rc::clone(&queue),
            restart: self.restart.clone(),
        };
        self.hooks.push(Box::new(StateHook {
            value: value.clone(),
            queue,
        }));
        (value, setter)
    }

    /// Number of hooks declared so far in this invocation.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Close the scope, yielding the hook records for the new generation.
    #[must_use]
    pub fn into_hooks(self) -> Vec<HookSlot> {
        self.hooks
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("element", &self.element.ty().label())
            .field("cursor", &self.cursor)
            .field("prior", &self.prior.len())
            .finish()
    }
}
