//! # asl-rules — Pure Domain Rules
//!
//! Functions over [`VersionData`](asl_core::VersionData) and dates that the
//! project lifecycle state machine composes. Nothing here touches storage,
//! the clock, or randomness; callers pass `now` in.
//!
//! - [`duration`]: licence duration capping and expiry dates (standard and
//!   legacy stub variants).
//! - [`retrospective`]: whether a version requires retrospective
//!   assessment, and the resulting due date.
//! - [`species`]: the species cache, from modern flat fields or legacy
//!   protocol-embedded numeric codes.
//! - [`reminders`]: reminder rows implied by condition data, and how
//!   existing reminders fare when a version is granted.
//! - [`normalise`]: stripping soft-deleted protocols and conditions.
//! - [`availability`]: additional-site selection and the grant-time plan.

pub mod availability;
pub mod duration;
pub mod normalise;
pub mod reminders;
pub mod retrospective;
pub mod species;

pub use availability::{selected_establishments, AvailabilityPlan};
pub use duration::{expiry_date, legacy_stub_expiry_date, LicenceDuration};
pub use normalise::strip_deleted;
pub use reminders::{condition_keys, extract_reminders, ExtractedReminder, ReminderFate};
pub use retrospective::{ra_compulsory, ra_date, ra_override, ra_required};
pub use species::extract_species;
