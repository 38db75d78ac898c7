#![forbid(unsafe_code)]

//! Test harness for weft.
//!
//! - [`MemorySurface`]: an in-memory [`HostAdapter`](weft_core::HostAdapter)
//!   that records every operation as a [`Mutation`]
//! - [`Harness`]: a scheduler, idle queue and container wired together
//! - [`strategy`]: proptest strategies for element trees
//! - [`assert_markup!`] and [`assert_snapshot!`] for checking rendered output
//!
//! # Snapshots
//!
//! [`assert_snapshot!`] compares markup against
//! `tests/snapshots/<name>.snap` in the calling crate. Run with `BLESS=1` to
//! create or update snapshot files.

pub mod strategy;
pub mod surface;

use std::cell::{Ref, RefCell, RefMut};
use std::path::Path;
use std::rc::Rc;

use weft_core::{Element, Event};
use weft_runtime::{
    IdleQueue, Scheduler, SchedulerConfig, TurnReport, UnitBudget, schedule_perpetual,
};

pub use surface::{MemoryNode, MemorySurface, Mutation, NodeId, NodeKind};

/// A scheduler over a [`MemorySurface`], with one container and an idle queue
/// running the perpetual loop.
pub struct Harness {
    scheduler: Rc<RefCell<Scheduler<MemorySurface>>>,
    idle: Rc<IdleQueue>,
    container: NodeId,
}

impl Harness {
    /// Harness with the default scheduler config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Harness with `config`.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        let mut surface = MemorySurface::new();
        let container = surface.create_container();
        let scheduler = Rc::new(RefCell::new(Scheduler::with_config(surface, config)));
        let idle = Rc::new(IdleQueue::new());
        schedule_perpetual(&scheduler, &idle);
        Self {
            scheduler,
            idle,
            container,
        }
    }

    /// The render target.
    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Start rendering `element` into the container.
    pub fn render(&self, element: Element) {
        self.scheduler.borrow_mut().render(element, self.container);
    }

    /// Render `element` and run it to completion synchronously.
    pub fn mount(&self, element: Element) -> TurnReport {
        self.render(element);
        self.flush()
    }

    /// Run pending work to completion synchronously.
    pub fn flush(&self) -> TurnReport {
        self.scheduler.borrow_mut().flush_sync()
    }

    /// Run one idle period that allows `units` units of work.
    pub fn turn(&self, units: usize) -> usize {
        self.idle.run_with_deadline(&UnitBudget::new(units))
    }

    /// Run one turn of `units` units directly on the scheduler, bypassing the
    /// idle queue, and return its report.
    pub fn turn_report(&self, units: usize) -> TurnReport {
        self.scheduler
            .borrow_mut()
            .work_loop(&UnitBudget::new(units))
    }

    /// Run idle periods until the scheduler has no pending work. Returns the
    /// number of periods run.
    pub fn settle(&self, max_periods: usize) -> usize {
        self.idle.run_until_settled(&self.scheduler, max_periods)
    }

    /// Whether a turn would do anything.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.scheduler.borrow().has_pending_work()
    }

    /// Markup of everything under the container.
    #[must_use]
    pub fn markup(&self) -> String {
        self.surface().render_markup(self.container)
    }

    /// Fire `event` at the first element with `tag`. Returns the listeners
    /// invoked, or zero when no such element exists.
    pub fn dispatch_to(&self, tag: &str, event: &Event) -> usize {
        let surface = self.surface();
        surface
            .find_by_tag(self.container, tag)
            .map_or(0, |node| surface.dispatch(node, event))
    }

    /// The surface.
    pub fn surface(&self) -> Ref<'_, MemorySurface> {
        Ref::map(self.scheduler.borrow(), Scheduler::adapter)
    }

    /// The surface, mutably.
    pub fn surface_mut(&self) -> RefMut<'_, MemorySurface> {
        RefMut::map(self.scheduler.borrow_mut(), Scheduler::adapter_mut)
    }

    /// The shared scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<RefCell<Scheduler<MemorySurface>>> {
        &self.scheduler
    }

    /// The idle queue.
    #[must_use]
    pub fn idle(&self) -> &IdleQueue {
        &self.idle
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("container", &self.container)
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}

/// Assert that a node renders to the expected markup.
///
/// ```ignore
/// assert_markup!(surface, root, "<div id=\"foo\"></div>");
/// ```
#[macro_export]
macro_rules! assert_markup {
    ($surface:expr, $node:expr, $expected:expr $(,)?) => {{
        let actual = $surface.render_markup($node);
        assert_eq!(actual, $expected, "markup mismatch");
    }};
}

/// Compare markup against a stored snapshot.
///
/// ```ignore
/// assert_snapshot!("counter_initial", harness.markup());
/// ```
#[macro_export]
macro_rules! assert_snapshot {
    ($name:expr, $markup:expr $(,)?) => {
        $crate::check_snapshot(
            ::std::path::Path::new(env!("CARGO_MANIFEST_DIR")),
            $name,
            &$markup,
        )
    };
}

/// Backing function for [`assert_snapshot!`].
///
/// # Panics
///
/// When the snapshot is missing or differs and `BLESS` is not set, or when the
/// snapshot file cannot be written while blessing.
pub fn check_snapshot(manifest_dir: &Path, name: &str, actual: &str) {
    let path = manifest_dir
        .join("tests")
        .join("snapshots")
        .join(format!("{name}.snap"));
    let bless = std::env::var_os("BLESS").is_some_and(|v| v == "1");

    if bless {
        if let Some(dir) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(dir) {
                panic!("cannot create {}: {err}", dir.display());
            }
        }
        if let Err(err) = std::fs::write(&path, format!("{actual}\n")) {
            panic!("cannot write {}: {err}", path.display());
        }
        return;
    }

    match std::fs::read_to_string(&path) {
        Ok(expected) => {
            let expected = expected.trim_end_matches('\n');
            assert!(
                expected == actual,
                "snapshot `{name}` mismatch\n--- expected\n{expected}\n+++ actual\n{actual}\n\
                 rerun with BLESS=1 to accept"
            );
        }
        Err(_) => panic!(
            "snapshot `{name}` not found at {}; rerun with BLESS=1 to create it\n{actual}",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_renders_into_the_container() {
        let harness = Harness::new();
        let report = harness.mount(Element::host("p").child("hi").build());
        assert!(report.committed.is_some());
        assert_eq!(harness.markup(), "<p>hi</p>");
        assert_markup!(harness.surface(), harness.container(), "<p>hi</p>");
    }

    #[test]
    fn turns_run_through_the_idle_queue() {
        let harness = Harness::new();
        harness.render(Element::host("p").child("hi").build());
        // root, p, #text
        assert_eq!(harness.turn(1), 1);
        assert_eq!(harness.turn(1), 1);
        assert!(harness.markup().is_empty());
        harness.turn(1);
        assert_eq!(harness.markup(), "<p>hi</p>");
        assert!(!harness.has_pending_work());
    }

    #[test]
    fn turn_report_commits_on_the_last_unit() {
        let harness = Harness::new();
        harness.render(Element::host("p").child("hi").build());
        let first = harness.turn_report(2);
        assert_eq!(first.units_performed, 2);
        assert!(first.committed.is_none());

        let last = harness.turn_report(2);
        assert_eq!(last.units_performed, 1);
        let committed = last.committed.unwrap();
        assert_eq!(committed.attached, 2);
        assert_eq!(committed.reconcile.placements, 2);
    }

    #[test]
    fn dispatch_to_missing_tag_is_zero() {
        let harness = Harness::new();
        harness.mount(Element::host("p").build());
        assert_eq!(harness.dispatch_to("button", &Event::new("click")), 0);
    }
}
