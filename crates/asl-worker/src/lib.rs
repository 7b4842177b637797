//! # asl-worker — Change-Request Queue Worker
//!
//! Pulls messages from a [`MessageSource`](queue::MessageSource),
//! dereferences each envelope's blob key into a
//! [`ChangeRequest`](asl_resolvers::ChangeRequest), and applies it through
//! the resolvers inside exactly one storage transaction. Every settled
//! message leaves one changelog row: a success row written inside the
//! committed transaction, or an error row written afterwards in a fresh one.
//!
//! ## Modules
//!
//! - [`processor`]: the per-message transaction boundary.
//! - [`envelope`]: queue message and blob body decoding.
//! - [`secure`]: AES-256-GCM decryption of legacy secure payloads.
//! - [`blob`]: the blob store collaborator (HTTP and in-memory).
//! - [`queue`]: the message source collaborator (PostgreSQL and in-memory).
//! - [`metrics`]: counters, the duration histogram, and the Prometheus
//!   exporter.
//! - [`poll`]: backoff for the polling loop.
//! - [`config`]: environment configuration for the binary.

pub mod blob;
pub mod config;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod poll;
pub mod processor;
pub mod queue;
pub mod secure;

pub use config::WorkerConfig;
pub use error::ProcessError;
pub use processor::{Outcome, Processor};
