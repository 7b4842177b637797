//! # asl-resolvers — Change-Request Resolvers
//!
//! Every inbound change request names a `model` and an `action`. The
//! [`model`] dispatch table picks a resolver; the resolver applies the
//! request through a [`Transaction`](asl_store::Transaction) and returns a
//! [`Resolution`] for the changelog. Resolvers never commit: the message
//! processor owns the transaction boundary.
//!
//! ## Resolvers
//!
//! - [`project`]: the project lifecycle state machine.
//! - [`version`]: direct edits to one project version.
//! - [`reminder`]: condition reminders and dismissals.
//! - [`generic`]: create/update/soft-delete for the models in [`schemas`].
//!
//! ## Supporting modules
//!
//! - [`licence_number`]: unique licence numbers.
//! - [`changelog`]: success and failure audit rows.
//! - [`expiry`]: the scheduled expiry sweep.

pub mod changelog;
pub mod error;
pub mod expiry;
pub mod generic;
pub mod licence_number;
pub mod model;
pub mod project;
pub mod reminder;
pub mod request;
pub mod schemas;
pub mod version;

pub use error::ResolverError;
pub use model::{resolve, Model};
pub use request::{ChangeRequest, Context, Resolution};
