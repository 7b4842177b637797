//! # Dispatch Table
//!
//! Maps a change request's `model` string onto its resolver. The set of
//! models is closed: anything not listed here fails with
//! [`ResolverError::UnknownModel`] before a resolver runs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use asl_store::Transaction;

use crate::error::ResolverError;
use crate::generic::{self, Schema};
use crate::request::{ChangeRequest, Context, Resolution};
use crate::{project, reminder, schemas, version};

/// A model the engine can resolve.
#[derive(Debug, Clone, Copy)]
pub enum Model {
    Project,
    ProjectVersion,
    Reminder,
    /// A simple model handled by the generic resolver.
    Generic(&'static Schema),
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Project => project::MODEL,
            Self::ProjectVersion => version::MODEL,
            Self::Reminder => reminder::MODEL,
            Self::Generic(schema) => schema.model,
        }
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Model {}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            project::MODEL => Ok(Self::Project),
            version::MODEL => Ok(Self::ProjectVersion),
            reminder::MODEL => Ok(Self::Reminder),
            other => schemas::lookup(other)
                .map(Self::Generic)
                .ok_or_else(|| ResolverError::UnknownModel(other.to_string())),
        }
    }
}

/// Resolve a change request inside `tx`.
///
/// `now` is the processor's clock reading for this message; every
/// timestamp the resolvers write comes from it.
pub async fn resolve<T: Transaction>(
    tx: &mut T,
    request: &ChangeRequest,
    now: DateTime<Utc>,
) -> Result<Resolution, ResolverError> {
    let model: Model = request.model.parse()?;
    let ctx = Context::new(now, request.actor()?);
    match model {
        Model::Project => project::resolve(tx, request, &ctx).await,
        Model::ProjectVersion => version::resolve(tx, request, &ctx).await,
        Model::Reminder => reminder::resolve(tx, request, &ctx).await,
        Model::Generic(schema) => generic::resolve(schema, tx, request, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_every_model() {
        assert_eq!("project".parse::<Model>().unwrap(), Model::Project);
        assert_eq!("projectVersion".parse::<Model>().unwrap(), Model::ProjectVersion);
        assert_eq!("reminder".parse::<Model>().unwrap(), Model::Reminder);
        for schema in schemas::ALL {
            assert_eq!(schema.model.parse::<Model>().unwrap().name(), schema.model);
        }
    }

    #[test]
    fn test_unknown_model() {
        let err = "spaceship".parse::<Model>().unwrap_err();
        assert_eq!(err.kind(), "unknown_model");
        assert_eq!(err.to_string(), "unknown model \"spaceship\"");
    }
}
