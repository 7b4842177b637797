#![deny(missing_docs)]

//! # asl-core — Foundational Types for the Licence Lifecycle Engine
//!
//! Every other crate in the workspace depends on this one. It has no
//! internal crate dependencies, only `serde`, `serde_json`, `thiserror`,
//! `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers that cross record boundaries.**
//!    You cannot pass an [`EstablishmentId`] where a [`ProfileId`] is expected.
//!
//! 2. **[`VersionData`] stays opaque.** The structured document attached to
//!    project versions is owned by the presentation layer. This crate only
//!    exposes the paths the engine reads and writes.
//!
//! 3. **UTC everywhere.** Dates are `chrono::DateTime<Utc>`; calendar
//!    arithmetic lives in [`temporal`] so the expiry and retrospective
//!    assessment rules share one implementation.

pub mod document;
pub mod error;
pub mod identity;
pub mod temporal;

pub use document::VersionData;
pub use error::ValidationError;
pub use identity::{EstablishmentId, ProfileId, ProjectId, VersionId};
