//! # eventq
//!
//! Durable work queue backed by a Postgres table.
//!
//! Producers insert typed events as PENDING rows. A single [`Worker`]
//! polls for the oldest PENDING event, runs the handler registered for its
//! type, and marks it COMPLETED, or PENDING again with one more retry, or
//! FAILED once the retry budget is spent.
//!
//! [`Worker`]: worker::Worker

pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod model;
pub mod producer;
pub mod store;
pub mod telemetry;
pub mod worker;
