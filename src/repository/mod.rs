//! The share store that shared values delegate to.
//!
//! A repository owns every share this party holds, knows the sibling parties,
//! and runs the share-level protocols. [`SharedNatural`](crate::SharedNatural)
//! only ever talks to it through the [`ShareRepository`] trait.

pub mod local;

use crypto_bigint::U256;
use thiserror::Error;

pub use local::{LocalRepository, PartyStore};

/// Handle of one secret-shared field element inside a repository.
pub type ShareId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("No share stored under id {id}")]
    UnknownShare { id: ShareId },

    #[error("A share is already stored under id {id}")]
    DuplicateShare { id: ShareId },

    #[error("Share count mismatch: expected {expected}, got {actual}")]
    ShareCountMismatch { expected: usize, actual: usize },

    #[error("At least two parties are required, got {count}")]
    InvalidPartyCount { count: usize },

    #[error("Scalar has no inverse in the field")]
    NonInvertibleScalar,

    #[error("Share store lock poisoned")]
    LockPoisoned,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Anything that can hand out its share of a given handle.
pub trait ShareSource {
    fn share(&self, id: ShareId) -> RepositoryResult<U256>;
}

/// Share-level protocols over one party's store.
///
/// Operations that produce a value write it under the caller-chosen `new_id`
/// and return that id. `broadcast` asks the repository to mirror the
/// operation onto the sibling parties, which is what makes the result
/// reconstructable. [`ShareSource::share`] on the repository itself returns
/// this party's local share.
pub trait ShareRepository: ShareSource {
    type Sibling: ShareSource;

    /// Total number of parties, this one included.
    fn party_count(&self) -> usize;

    /// Secret-shares a value known to this party under a fresh id.
    fn create_natural(&self, value: U256) -> RepositoryResult<ShareId>;

    /// Stores an explicit share vector, one entry per party, under a fresh id.
    fn create_natural_with_shares(&self, shares: &[U256]) -> RepositoryResult<ShareId>;

    fn add(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
    ) -> RepositoryResult<ShareId>;

    fn sub(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
    ) -> RepositoryResult<ShareId>;

    /// Secret by secret multiplication. Interactive.
    fn mult(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
    ) -> RepositoryResult<ShareId>;

    fn mult_scalar(
        &self,
        new_id: ShareId,
        id: ShareId,
        scalar: U256,
        broadcast: bool,
    ) -> RepositoryResult<ShareId>;

    fn div_scalar(
        &self,
        new_id: ShareId,
        id: ShareId,
        scalar: U256,
        broadcast: bool,
    ) -> RepositoryResult<ShareId>;

    fn siblings(&self) -> &[Self::Sibling];
}
