#![forbid(unsafe_code)]

//! Time-sliced work loop.
//!
//! The [`Scheduler`] drives a [`Renderer`] one idle turn at a time. Each call
//! to [`Scheduler::work_loop`] performs units of work until the deadline runs
//! low, remembering where it stopped; the next turn resumes from there. Once
//! no work remains and a finished tree is pending, the turn commits it
//! synchronously.
//!
//! # Invariants
//!
//! 1. Every turn performs at least `min_units_per_turn` units when work
//!    exists; after that it yields as soon as the deadline reports less than
//!    `yield_threshold`.
//! 2. The surface is only mutated by the commit at the end of a turn that
//!    exhausted the work.
//! 3. A restart request from a state setter is honoured at the start of a
//!    turn and between units, never in the middle of one.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Turn with no pending work | Returns an empty report |
//! | Restart with nothing rendered yet | Ignored |

use tracing::{debug, info_span, trace};
use weft_core::{Element, HostAdapter};
use weft_render::{CommitReport, FiberId, Renderer};

use crate::config::SchedulerConfig;
use crate::deadline::{Deadline, Unbounded};

/// What one turn of the work loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Units of work performed.
    pub units_performed: usize,
    /// Surface changes, when the turn committed.
    pub committed: Option<CommitReport>,
    /// Whether the turn stopped early for the deadline.
    pub yielded: bool,
    /// Whether a state update restarted the render during the turn.
    pub restarted: bool,
}

/// Resumable, deadline-aware driver for a [`Renderer`].
pub struct Scheduler<A: HostAdapter> {
    renderer: Renderer<A>,
    next_unit: Option<FiberId>,
    config: SchedulerConfig,
    turns: u64,
}

impl<A: HostAdapter> Scheduler<A> {
    /// Scheduler over `adapter` with the default config.
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, SchedulerConfig::default())
    }

    /// Scheduler over `adapter` with `config` (sanitized).
    pub fn with_config(adapter: A, config: SchedulerConfig) -> Self {
        Self {
            renderer: Renderer::new(adapter),
            next_unit: None,
            config: config.sanitized(),
            turns: 0,
        }
    }

    /// Start rendering `element` into `container`, replacing any pending
    /// render.
    pub fn render(&mut self, element: Element, container: A::Node) {
        if self.renderer.has_pending_commit() {
            debug!("render superseded pending work");
        }
        self.next_unit = Some(self.renderer.begin_cycle(container, element));
    }

    /// Run one idle turn against `deadline`.
    pub fn work_loop(&mut self, deadline: &dyn Deadline) -> TurnReport {
        self.turns += 1;
        let span = info_span!(
            "weft.turn",
            turn = self.turns,
            units = tracing::field::Empty,
            committed = tracing::field::Empty
        );
        let _guard = span.enter();

        let mut report = TurnReport::default();
        self.observe_restart(&mut report);

        while let Some(unit) = self.next_unit {
            self.next_unit = self.renderer.perform_unit_of_work(unit);
            report.units_performed += 1;
            trace!(units = report.units_performed, "unit of work done");

            self.observe_restart(&mut report);
            if self.next_unit.is_some()
                && report.units_performed >= self.config.min_units_per_turn
                && deadline.time_remaining() < self.config.yield_threshold
            {
                report.yielded = true;
                debug!(units = report.units_performed, "yielding to host");
                break;
            }
        }

        if self.next_unit.is_none() && self.renderer.has_pending_commit() {
            report.committed = self.renderer.commit_root();
        }

        span.record("units", report.units_performed);
        span.record("committed", report.committed.is_some());
        report
    }

    /// Run the pending render to completion and commit it.
    pub fn flush_sync(&mut self) -> TurnReport {
        self.work_loop(&Unbounded)
    }

    fn observe_restart(&mut self, report: &mut TurnReport) {
        if !self.renderer.restart_signal().take() {
            return;
        }
        match self.renderer.restart_from_current() {
            Some(root) => {
                debug!(
                    abandoned = self.next_unit.is_some(),
                    "state update restarted render"
                );
                self.next_unit = Some(root);
                report.restarted = true;
            }
            None => debug!("state update with nothing rendered; ignored"),
        }
    }

    /// Whether a turn would do anything.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.next_unit.is_some()
            || self.renderer.has_pending_commit()
            || self.renderer.restart_signal().is_raised()
    }

    /// Number of turns run so far.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Underlying renderer.
    #[must_use]
    pub fn renderer(&self) -> &Renderer<A> {
        &self.renderer
    }

    /// Underlying renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut Renderer<A> {
        &mut self.renderer
    }

    /// Host adapter.
    #[must_use]
    pub fn adapter(&self) -> &A {
        self.renderer.adapter()
    }

    /// Host adapter, mutably.
    pub fn adapter_mut(&mut self) -> &mut A {
        self.renderer.adapter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::UnitBudget;
    use std::cell::RefCell;
    use std::rc::Rc;
    use weft_core::{Component, Listener, PropValue, StateSetter};

    /// Counts structural operations; node 0 is the container.
    #[derive(Default)]
    struct Counter {
        nodes: u32,
        attaches: u32,
    }

    impl HostAdapter for Counter {
        type Node = u32;

        fn create_element_node(&mut self, _: &str) -> u32 {
            self.nodes += 1;
            self.nodes
        }

        fn create_text_node(&mut self) -> u32 {
            self.nodes += 1;
            self.nodes
        }

        fn set_attribute(&mut self, _: &u32, _: &str, _: &PropValue) {}

        fn remove_attribute(&mut self, _: &u32, _: &str) {}

        fn add_listener(&mut self, _: &u32, _: &str, _: &Listener) {}

        fn remove_listener(&mut self, _: &u32, _: &str, _: &Listener) {}

        fn attach(&mut self, _: &u32, _: &u32) {
            self.attaches += 1;
        }

        fn detach(&mut self, _: &u32, _: &u32) {}
    }

    fn sample() -> Element {
        Element::host("div")
            .attr("id", "foo")
            .child(Element::host("a").child("bar"))
            .child(Element::host("b"))
            .build()
    }

    #[test]
    fn idle_turn_without_work_is_empty() {
        let mut scheduler = Scheduler::new(Counter::default());
        assert!(!scheduler.has_pending_work());
        assert_eq!(scheduler.work_loop(&UnitBudget::new(5)), TurnReport::default());
    }

    #[test]
    fn work_resumes_across_turns_and_commits_once() {
        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(sample(), 0);

        // root, div, a, #text, b
        let first = scheduler.work_loop(&UnitBudget::new(2));
        assert_eq!(first.units_performed, 2);
        assert!(first.yielded);
        assert!(first.committed.is_none());
        assert_eq!(scheduler.adapter().attaches, 0);

        let second = scheduler.work_loop(&UnitBudget::new(2));
        assert_eq!(second.units_performed, 2);
        assert!(second.committed.is_none());

        let third = scheduler.work_loop(&UnitBudget::new(2));
        assert_eq!(third.units_performed, 1);
        assert!(!third.yielded);
        assert_eq!(third.committed.map(|c| c.attached), Some(4));
        assert!(!scheduler.has_pending_work());
    }

    #[test]
    fn exhausted_deadline_still_makes_progress() {
        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(sample(), 0);
        let mut turns = 0;
        while scheduler.has_pending_work() {
            let report = scheduler.work_loop(&UnitBudget::new(0));
            assert_eq!(report.units_performed, 1);
            turns += 1;
        }
        assert_eq!(turns, 5);
        assert_eq!(scheduler.turns(), 5);
    }

    #[test]
    fn min_units_floor_is_honoured() {
        let config = SchedulerConfig::default().with_min_units_per_turn(3);
        let mut scheduler = Scheduler::with_config(Counter::default(), config);
        scheduler.render(sample(), 0);
        let report = scheduler.work_loop(&UnitBudget::new(0));
        assert_eq!(report.units_performed, 3);
        assert!(report.yielded);
    }

    #[test]
    fn flush_sync_commits_everything() {
        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(sample(), 0);
        let report = scheduler.flush_sync();
        assert_eq!(report.units_performed, 5);
        assert!(report.committed.is_some());
    }

    #[test]
    fn render_supersedes_pending_work() {
        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(sample(), 0);
        scheduler.work_loop(&UnitBudget::new(2));
        scheduler.render(Element::host("p").build(), 0);
        let report = scheduler.flush_sync();
        assert_eq!(report.units_performed, 2);
        assert_eq!(report.committed.map(|c| c.attached), Some(1));
    }

    #[test]
    fn setter_restarts_from_committed_root() {
        let setter: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::default();
        let slot = Rc::clone(&setter);
        let counter = Component::new("Counter", move |scope| {
            let (count, set) = scope.use_state(1_i64);
            *slot.borrow_mut() = Some(set);
            Element::host("h1").child(count).build()
        });

        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(Element::component(&counter).build(), 0);
        scheduler.flush_sync();

        setter.borrow().as_ref().unwrap().update(|c| c + 1);
        assert!(scheduler.has_pending_work());
        let report = scheduler.flush_sync();
        assert!(report.restarted);
        let committed = report.committed.unwrap();
        assert_eq!(committed.attached, 0);
        assert_eq!(committed.property_ops, 1);
    }

    #[test]
    fn setter_during_pending_work_abandons_it() {
        let setter: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::default();
        let slot = Rc::clone(&setter);
        let counter = Component::new("Counter", move |scope| {
            let (count, set) = scope.use_state(0_i64);
            *slot.borrow_mut() = Some(set);
            Element::host("p").child(count).build()
        });

        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(Element::component(&counter).build(), 0);
        scheduler.flush_sync();

        let set = setter.borrow().clone().unwrap();
        set.update(|c| c + 1);
        let partial = scheduler.work_loop(&UnitBudget::new(2));
        assert!(partial.restarted);
        assert!(partial.committed.is_none());

        set.update(|c| c + 10);
        let finished = scheduler.flush_sync();
        assert!(finished.restarted);
        assert_eq!(finished.committed.map(|c| c.property_ops), Some(1));
    }

    #[test]
    fn turn_emits_tracing_under_a_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("weft_runtime=trace")
            .try_init();
        let mut scheduler = Scheduler::new(Counter::default());
        scheduler.render(sample(), 0);
        assert!(scheduler.flush_sync().committed.is_some());
    }

    proptest::proptest! {
        #[test]
        fn unit_budget_bounds_every_turn(budget in 0usize..8, width in 0usize..12) {
            let list = Element::host("ul")
                .children((0..width).map(|_| Element::host("li").build()))
                .build();
            let mut scheduler = Scheduler::new(Counter::default());
            scheduler.render(list, 0);

            // root, ul, and one fiber per item
            let total = width + 2;
            let mut done = 0;
            while scheduler.has_pending_work() {
                let report = scheduler.work_loop(&UnitBudget::new(budget));
                proptest::prop_assert_eq!(report.units_performed, budget.max(1).min(total - done));
                done += report.units_performed;
            }
            proptest::prop_assert_eq!(done, total);
        }
    }
}
