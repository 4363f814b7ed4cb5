//! Transaction scheduler
//!
//! Turns transaction requests into schedules of jobs, drives every job
//! through its status state machine and hands jobs to the execution pipeline
//! over the message broker.

pub mod api;
pub mod broker;
pub mod chain;
pub mod config;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod parsers;
pub mod sessions;
pub mod store;
pub mod usecases;
pub mod validators;

#[cfg(test)]
mod testutils;

pub use error::{ErrorKind, SchedulerError, SchedulerResult};
