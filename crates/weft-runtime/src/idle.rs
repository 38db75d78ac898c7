#![forbid(unsafe_code)]

//! Host idle-time boundary.
//!
//! Hosts expose their idle mechanism through [`IdleHost`]: a way to run a
//! callback during the next idle period, handing it a [`Deadline`].
//! [`schedule_perpetual`] turns that into the render loop: every idle period
//! runs one scheduler turn and books the next one, for as long as the
//! scheduler is alive.
//!
//! [`IdleQueue`] is an in-process host: callbacks wait in a FIFO until the
//! owner runs an idle period.
//!
//! # Invariants
//!
//! 1. A callback registered while an idle period runs waits for the next
//!    period.
//! 2. The perpetual loop holds the scheduler weakly; dropping the last strong
//!    handle ends the loop at its next callback.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace};
use weft_core::HostAdapter;

use crate::deadline::{Deadline, TimeBudget};
use crate::scheduler::Scheduler;

/// Work to run during an idle period.
pub type IdleCallback = Box<dyn FnOnce(&dyn Deadline)>;

/// A host able to run callbacks when it is idle.
pub trait IdleHost {
    /// Run `callback` during the next idle period.
    fn request_idle_callback(&self, callback: IdleCallback);
}

/// Drive `scheduler` from `host`'s idle periods, one turn per period,
/// indefinitely.
pub fn schedule_perpetual<A, H>(scheduler: &Rc<RefCell<Scheduler<A>>>, host: &Rc<H>)
where
    A: HostAdapter + 'static,
    H: IdleHost + 'static,
{
    register(Rc::downgrade(scheduler), Rc::clone(host));
}

fn register<A, H>(scheduler: Weak<RefCell<Scheduler<A>>>, host: Rc<H>)
where
    A: HostAdapter + 'static,
    H: IdleHost + 'static,
{
    let next_host = Rc::clone(&host);
    host.request_idle_callback(Box::new(move |deadline| {
        let Some(strong) = scheduler.upgrade() else {
            debug!("scheduler dropped; idle loop stopped");
            return;
        };
        match strong.try_borrow_mut() {
            Ok(mut scheduler) => {
                let report = scheduler.work_loop(deadline);
                trace!(units = report.units_performed, "idle turn finished");
            }
            Err(_) => debug!("scheduler busy; idle turn skipped"),
        }
        register(scheduler, next_host);
    }));
}

/// In-process idle host with a FIFO of pending callbacks.
#[derive(Default)]
pub struct IdleQueue {
    pending: RefCell<VecDeque<IdleCallback>>,
    periods: Cell<u64>,
}

impl IdleQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks waiting for the next period.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Idle periods run so far.
    #[must_use]
    pub fn periods(&self) -> u64 {
        self.periods.get()
    }

    /// Run one idle period lasting `budget`. Returns the callbacks invoked.
    pub fn run_idle_period(&self, budget: Duration) -> usize {
        self.run_with_deadline(&TimeBudget::new(budget))
    }

    /// Run one idle period against `deadline`. Returns the callbacks invoked.
    pub fn run_with_deadline(&self, deadline: &dyn Deadline) -> usize {
        let batch: Vec<IdleCallback> = self.pending.borrow_mut().drain(..).collect();
        self.periods.set(self.periods.get() + 1);
        let count = batch.len();
        for callback in batch {
            callback(deadline);
        }
        count
    }

    /// Run idle periods of the scheduler's configured length until it has no
    /// pending work, at most `max_periods` times. Returns the periods run.
    pub fn run_until_settled<A: HostAdapter>(
        &self,
        scheduler: &Rc<RefCell<Scheduler<A>>>,
        max_periods: usize,
    ) -> usize {
        let mut periods = 0;
        while periods < max_periods {
            let (pending, budget) = {
                let scheduler = scheduler.borrow();
                (scheduler.has_pending_work(), scheduler.config().idle_period)
            };
            if !pending {
                break;
            }
            self.run_idle_period(budget);
            periods += 1;
        }
        periods
    }
}

impl IdleHost for IdleQueue {
    fn request_idle_callback(&self, callback: IdleCallback) {
        self.pending.borrow_mut().push_back(callback);
    }
}

impl std::fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleQueue")
            .field("pending", &self.len())
            .field("periods", &self.periods.get())
            .finish()
    }
}
