//! # Licence Number Generator
//!
//! Candidates are a type prefix followed by eight random decimal digits.
//! Each candidate is probed against every stored licence number; on a
//! collision a fresh candidate is drawn, without a retry bound. The storage
//! unique index remains authoritative.

use rand::rngs::OsRng;
use rand::Rng;

use asl_store::{StoreError, Transaction};

/// Random digits after the prefix.
pub const DIGITS: usize = 8;

/// What kind of licence the number identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenceKind {
    /// Personal licences (PIL, training PIL).
    Personal,
    /// Project licences, by document schema version.
    Project { schema_version: i32 },
    /// Establishment licences.
    Establishment,
}

impl LicenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Personal => "I",
            Self::Project { schema_version } if *schema_version >= 1 => "PP",
            Self::Project { .. } => "P",
            Self::Establishment => "X",
        }
    }
}

fn candidate<R: Rng>(kind: LicenceKind, rng: &mut R) -> String {
    let mut number = String::with_capacity(kind.prefix().len() + DIGITS);
    number.push_str(kind.prefix());
    for _ in 0..DIGITS {
        number.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    number
}

/// Draw numbers from `rng` until one is not in use.
pub async fn generate_with<T, R>(tx: &mut T, kind: LicenceKind, rng: &mut R) -> Result<String, StoreError>
where
    T: Transaction,
    R: Rng + Send,
{
    loop {
        let number = candidate(kind, rng);
        if !tx.licence_number_in_use(&number).await? {
            return Ok(number);
        }
        tracing::debug!(licence_number = %number, "licence number collision, drawing again");
    }
}

/// Draw from the operating system CSPRNG.
pub async fn generate<T: Transaction>(tx: &mut T, kind: LicenceKind) -> Result<String, StoreError> {
    generate_with(tx, kind, &mut OsRng).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::EstablishmentId;
    use asl_store::{MemoryStore, Project, Store};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn prefixes() {
        assert_eq!(LicenceKind::Personal.prefix(), "I");
        assert_eq!(LicenceKind::Project { schema_version: 1 }.prefix(), "PP");
        assert_eq!(LicenceKind::Project { schema_version: 0 }.prefix(), "P");
        assert_eq!(LicenceKind::Establishment.prefix(), "X");
    }

    #[test]
    fn candidate_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = candidate(LicenceKind::Project { schema_version: 1 }, &mut rng);
        assert_eq!(n.len(), 2 + DIGITS);
        assert!(n.starts_with("PP"));
        assert!(n[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn retries_after_a_collision() {
        let store = MemoryStore::new();
        let kind = LicenceKind::Project { schema_version: 1 };
        let mut tx = store.begin().await.unwrap();

        let first = generate_with(&mut tx, kind, &mut StdRng::seed_from_u64(42)).await.unwrap();
        let mut holder = Project::new(EstablishmentId::new(), Utc::now());
        holder.licence_number = Some(first.clone());
        tx.insert_project(&holder).await.unwrap();

        // Same seed: the first draw collides with the stored number.
        let second = generate_with(&mut tx, kind, &mut StdRng::seed_from_u64(42)).await.unwrap();
        assert_ne!(first, second);
        assert!(second.starts_with("PP"));
    }

    #[tokio::test]
    async fn os_rng_numbers_are_well_formed() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let n = generate(&mut tx, LicenceKind::Personal).await.unwrap();
        assert!(n.starts_with('I'));
        assert_eq!(n.len(), 1 + DIGITS);
    }
}
