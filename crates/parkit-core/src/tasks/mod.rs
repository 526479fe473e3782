//! Task entry points.
//!
//! Each `run_*` function is the body of one long-lived task. It receives the
//! shared [`AppContext`](crate::app_state::AppContext) by reference and never
//! returns. The `*_step` functions hold one iteration each so they can be
//! driven directly.

mod activation;
mod heartbeat;
mod producers;
mod ui;

pub use activation::{ResumeChain, Trigger};
pub use heartbeat::{heartbeat_step, run_heartbeat};
pub use producers::{producer_step, run_producer};
pub use ui::{UiController, run_ui};
