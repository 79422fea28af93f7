//! Handle to one secret-shared field element.

use crate::field::PrimeField;
use crate::repository::{RepositoryError, RepositoryResult, ShareId, ShareRepository, ShareSource};
use crypto_bigint::U256;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// A capability into a [`ShareRepository`] entry.
///
/// The handle owns no share data. Every operator asks the repository to
/// build a new entry under a freshly drawn id and returns a handle to it;
/// existing entries are never modified.
pub struct SharedNatural<R: ShareRepository> {
    id: ShareId,
    repo: Arc<R>,
    field: PrimeField,
}

impl<R: ShareRepository> Clone for SharedNatural<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            repo: Arc::clone(&self.repo),
            field: self.field,
        }
    }
}

impl<R: ShareRepository> fmt::Debug for SharedNatural<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedNatural").field("id", &self.id).finish()
    }
}

impl<R: ShareRepository> SharedNatural<R> {
    pub fn new(id: ShareId, repo: Arc<R>, field: PrimeField) -> Self {
        Self { id, repo, field }
    }

    /// Secret-shares a value this party knows.
    pub fn from_value(value: U256, repo: Arc<R>, field: PrimeField) -> RepositoryResult<Self> {
        let id = repo.create_natural(value)?;
        Ok(Self::new(id, repo, field))
    }

    /// Wraps an explicit share vector, one entry per party.
    pub fn from_shares(
        shares: &[U256],
        repo: Arc<R>,
        field: PrimeField,
    ) -> RepositoryResult<Self> {
        let id = repo.create_natural_with_shares(shares)?;
        Ok(Self::new(id, repo, field))
    }

    /// Public constant: party 0 holds `value`, every other party holds zero.
    pub fn constant(value: U256, repo: Arc<R>, field: PrimeField) -> RepositoryResult<Self> {
        let count = repo.party_count();
        let mut shares = vec![U256::ZERO; count];
        let owner = shares
            .first_mut()
            .ok_or(RepositoryError::InvalidPartyCount { count })?;
        *owner = field.reduce(&value);
        Self::from_shares(&shares, repo, field)
    }

    pub fn id(&self) -> ShareId {
        self.id
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn field(&self) -> PrimeField {
        self.field
    }

    pub fn add(&self, other: &Self) -> RepositoryResult<Self> {
        let new_id = fresh_id();
        let id = self.repo.add(new_id, self.id, other.id, true)?;
        Ok(self.derive(id))
    }

    pub fn subtract(&self, other: &Self) -> RepositoryResult<Self> {
        let new_id = fresh_id();
        let id = self.repo.sub(new_id, self.id, other.id, true)?;
        Ok(self.derive(id))
    }

    /// Secret by secret product; interactive inside the repository.
    pub fn multiply(&self, other: &Self) -> RepositoryResult<Self> {
        let new_id = fresh_id();
        let id = self.repo.mult(new_id, self.id, other.id, true)?;
        Ok(self.derive(id))
    }

    pub fn multiply_scalar(&self, scalar: &U256) -> RepositoryResult<Self> {
        let new_id = fresh_id();
        let id = self.repo.mult_scalar(new_id, self.id, *scalar, true)?;
        Ok(self.derive(id))
    }

    /// Division by a public scalar, with whatever semantics the repository
    /// gives it. Invertibility is the repository's concern.
    pub fn divide_scalar(&self, scalar: &U256) -> RepositoryResult<Self> {
        let new_id = fresh_id();
        let id = self.repo.div_scalar(new_id, self.id, *scalar, true)?;
        Ok(self.derive(id))
    }

    /// Sibling shares followed by the local share.
    pub fn shares(&self) -> RepositoryResult<Vec<U256>> {
        let mut shares = self
            .repo
            .siblings()
            .iter()
            .map(|sibling| sibling.share(self.id))
            .collect::<RepositoryResult<Vec<_>>>()?;
        shares.push(self.repo.share(self.id)?);
        Ok(shares)
    }

    /// Reconstructs the plaintext element.
    ///
    /// Only call this when the value is meant to become public, or when it
    /// is masked.
    pub fn reveal(&self) -> RepositoryResult<U256> {
        Ok(self
            .shares()?
            .iter()
            .fold(U256::ZERO, |acc, share| self.field.add(&acc, share)))
    }

    fn derive(&self, id: ShareId) -> Self {
        Self::new(id, Arc::clone(&self.repo), self.field)
    }
}

/// Handle ids only need to avoid collisions, so the thread RNG is enough.
fn fresh_id() -> ShareId {
    rand::rng().random()
}
