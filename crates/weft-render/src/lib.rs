#![forbid(unsafe_code)]

//! Fiber reconciliation for weft.
//!
//! This crate provides:
//! - [`FiberTree`], a generational arena of [`Fiber`]s with pre-order
//!   traversal
//! - [`reconcile_children`], the positional type-only child diff
//! - [`Renderer`], which owns a render target's generations and exposes the
//!   resumable unit of work ([`Renderer::perform_unit_of_work`]) and the
//!   atomic commit ([`Renderer::commit_root`])
//!
//! Scheduling across idle periods lives in `weft-runtime`.

pub mod commit;
pub mod fiber;
pub mod reconcile;
pub mod renderer;
pub mod work;

pub use commit::CommitReport;
pub use fiber::{EffectTag, Fiber, FiberId, FiberKind, FiberTree};
pub use reconcile::{ReconcileStats, reconcile_children};
pub use renderer::Renderer;
