//! Batch orchestration.
//!
//! Owns the sequential folder loop: dispatching one run request per folder,
//! pausing between runs, and stopping the batch on operator interrupt. The CLI
//! layer calls into this module and renders the resulting report.

mod controller;

pub(crate) use controller::{plan_batch, run_batch};
