//! # bdpm-service
//!
//! Keeps a [`SnapshotStore`](bdpm_loader::SnapshotStore) fresh by refreshing
//! the BDPM data on a fixed daily schedule.
//!
//! The store's read API is the interface an HTTP layer would serve from;
//! this crate only owns the refresh cadence and the `bdpm-server` binary.

#![warn(missing_docs)]

pub mod scheduler;

pub use scheduler::{run_scheduler, Clock, RefreshSchedule, SystemClock};
