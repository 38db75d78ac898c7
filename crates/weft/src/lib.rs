#![forbid(unsafe_code)]

//! weft public facade.
//!
//! weft turns a tree of immutable element descriptions into mutations of a
//! host-owned surface. Rendering is split into small units of work that run
//! in the host's idle periods and can be interrupted between any two units;
//! the finished tree is then committed in one uninterruptible step.
//!
//! This crate re-exports the stable surface of the workspace crates and adds
//! a [`prelude`].
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use weft::prelude::*;
//! use weft_harness::MemorySurface;
//!
//! let counter = Component::new("Counter", |scope| {
//!     let (count, set) = scope.use_state(1_i64);
//!     Element::host("h1")
//!         .on("click", move |_| set.update(|c| c + 1))
//!         .child("Count: ")
//!         .child(count)
//!         .build()
//! });
//!
//! let mut surface = MemorySurface::new();
//! let container = surface.create_container();
//! let idle = Rc::new(IdleQueue::new());
//! let root = weft::render(Element::component(&counter).build(), container, surface, &idle);
//!
//! idle.run_until_settled(&root, 64);
//! assert_eq!(root.borrow().adapter().render_markup(container), "<h1>Count: 1</h1>");
//!
//! let h1 = root.borrow().adapter().find_by_tag(container, "h1").unwrap();
//! root.borrow().adapter().dispatch(h1, &Event::new("click"));
//! idle.run_until_settled(&root, 64);
//! assert_eq!(root.borrow().adapter().render_markup(container), "<h1>Count: 2</h1>");
//! ```
//!
//! # Features
//!
//! - `runtime` (default): the scheduler, deadlines and idle-time integration
//! - `config-file`: TOML loading for [`SchedulerConfig`]
//! - `tracing`: spans and events from the render crates

#[cfg(feature = "runtime")]
use std::cell::RefCell;
#[cfg(feature = "runtime")]
use std::rc::Rc;

// --- Core re-exports ---------------------------------------------------------

pub use weft_core::{
    Child, Component, Element, ElementBuilder, ElementType, Event, HostAdapter, HostKind,
    Listener, PropValue, Props, PropsDiff, Scope, StateSetter, TEXT_VALUE_ATTR, create_element,
    create_text_element,
};

// --- Render re-exports -------------------------------------------------------

pub use weft_render::{CommitReport, EffectTag, FiberId, FiberKind, Renderer};

// --- Runtime re-exports ------------------------------------------------------

#[cfg(feature = "runtime")]
pub use weft_runtime::{
    Deadline, IdleHost, IdleQueue, Scheduler, SchedulerConfig, TimeBudget, TurnReport, Unbounded,
    UnitBudget, schedule_perpetual,
};

#[cfg(feature = "config-file")]
pub use weft_runtime::ConfigError;

/// Render `element` into `container` through `adapter`, driven by `host`'s
/// idle periods.
///
/// Creates a scheduler, seeds the first render and starts the perpetual idle
/// loop. Keep the returned handle alive for as long as the tree should keep
/// updating; the loop stops once it is dropped. Call
/// [`Scheduler::render`] on it to render a new tree.
#[cfg(feature = "runtime")]
pub fn render<A, H>(
    element: Element,
    container: A::Node,
    adapter: A,
    host: &Rc<H>,
) -> Rc<RefCell<Scheduler<A>>>
where
    A: HostAdapter + 'static,
    H: IdleHost + 'static,
{
    render_with_config(element, container, adapter, host, SchedulerConfig::default())
}

/// Like [`render`] with an explicit scheduler configuration.
#[cfg(feature = "runtime")]
pub fn render_with_config<A, H>(
    element: Element,
    container: A::Node,
    adapter: A,
    host: &Rc<H>,
    config: SchedulerConfig,
) -> Rc<RefCell<Scheduler<A>>>
where
    A: HostAdapter + 'static,
    H: IdleHost + 'static,
{
    let mut scheduler = Scheduler::with_config(adapter, config);
    scheduler.render(element, container);
    let scheduler = Rc::new(RefCell::new(scheduler));
    schedule_perpetual(&scheduler, host);
    scheduler
}

/// Prelude for applications.
pub mod prelude {
    pub use crate::{
        Component, Element, Event, HostAdapter, PropValue, Props, Scope, StateSetter,
        create_element, create_text_element,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{IdleHost, IdleQueue, Scheduler, SchedulerConfig, render};
}
