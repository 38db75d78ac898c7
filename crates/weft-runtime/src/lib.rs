#![forbid(unsafe_code)]

//! Scheduling for weft.
//!
//! This crate provides:
//! - [`Scheduler`], the resumable, deadline-aware work loop
//! - [`Deadline`] and its implementations [`TimeBudget`], [`UnitBudget`],
//!   [`Unbounded`]
//! - [`IdleHost`] and [`schedule_perpetual`] for hooking the loop into a
//!   host's idle periods, plus the in-process [`IdleQueue`]
//! - [`SchedulerConfig`] with optional TOML loading (`config-file` feature)

pub mod config;
pub mod deadline;
pub mod idle;
pub mod scheduler;

pub use config::{ConfigError, SchedulerConfig};
pub use deadline::{Deadline, TimeBudget, Unbounded, UnitBudget};
pub use idle::{IdleCallback, IdleHost, IdleQueue, schedule_perpetual};
pub use scheduler::{Scheduler, TurnReport};
