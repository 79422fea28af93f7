//! In-process repository simulating every party in one address space.
//!
//! Values are split additively: party `i` holds `s_i` and the secret is
//! `sum(s_i) mod Q`. Party 0 plays "this party", the rest are its siblings.
//! Secret by secret multiplication consumes a Beaver triple produced by a
//! trusted dealer living inside the repository.

use super::{RepositoryError, RepositoryResult, ShareId, ShareRepository, ShareSource};
use crate::field::PrimeField;
use crypto_bigint::U256;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, RwLock};
use tracing::trace;

/// One party's view: its shares keyed by handle.
#[derive(Debug)]
pub struct PartyStore {
    index: usize,
    shares: RwLock<HashMap<ShareId, U256>>,
}

impl PartyStore {
    fn new(index: usize) -> Self {
        Self {
            index,
            shares: RwLock::new(HashMap::new()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn contains(&self, id: ShareId) -> RepositoryResult<bool> {
        let shares = self
            .shares
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(shares.contains_key(&id))
    }

    fn insert(&self, id: ShareId, share: U256) -> RepositoryResult<()> {
        let mut shares = self
            .shares
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        match shares.entry(id) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateShare { id }),
            Entry::Vacant(slot) => {
                slot.insert(share);
                Ok(())
            }
        }
    }
}

impl ShareSource for PartyStore {
    fn share(&self, id: ShareId) -> RepositoryResult<U256> {
        let shares = self
            .shares
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        shares
            .get(&id)
            .copied()
            .ok_or(RepositoryError::UnknownShare { id })
    }
}

pub struct LocalRepository {
    field: PrimeField,
    parties: Vec<PartyStore>,
    rng: Mutex<ChaCha20Rng>,
}

impl LocalRepository {
    pub fn new(field: PrimeField, party_count: usize) -> RepositoryResult<Self> {
        Self::with_rng(field, party_count, ChaCha20Rng::from_rng(&mut rand::rng()))
    }

    /// Deterministic share randomness, for reproducible runs.
    pub fn with_seed(
        field: PrimeField,
        party_count: usize,
        seed: u64,
    ) -> RepositoryResult<Self> {
        Self::with_rng(field, party_count, ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_rng(
        field: PrimeField,
        party_count: usize,
        rng: ChaCha20Rng,
    ) -> RepositoryResult<Self> {
        if party_count < 2 {
            return Err(RepositoryError::InvalidPartyCount { count: party_count });
        }
        Ok(Self {
            field,
            parties: (0..party_count).map(PartyStore::new).collect(),
            rng: Mutex::new(rng),
        })
    }

    pub fn field(&self) -> PrimeField {
        self.field
    }

    pub fn parties(&self) -> &[PartyStore] {
        &self.parties
    }

    /// Every party's share of `id`, in party order.
    fn gather(&self, id: ShareId) -> RepositoryResult<Vec<U256>> {
        self.parties.iter().map(|party| party.share(id)).collect()
    }

    fn open(&self, shares: &[U256]) -> U256 {
        shares
            .iter()
            .fold(U256::ZERO, |acc, share| self.field.add(&acc, share))
    }

    /// Additive split: uniform shares for parties `1..n`, party 0 takes the rest.
    fn split(&self, value: &U256) -> RepositoryResult<Vec<U256>> {
        let mut rng = self.rng.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        let mut shares = vec![U256::ZERO; self.parties.len()];
        let mut remainder = self.field.reduce(value);
        for share in shares.iter_mut().skip(1) {
            *share = self.field.sample(&mut *rng);
            remainder = self.field.sub(&remainder, share);
        }
        shares[0] = remainder;
        Ok(shares)
    }

    fn fresh_id(&self) -> RepositoryResult<ShareId> {
        loop {
            let id = self
                .rng
                .lock()
                .map_err(|_| RepositoryError::LockPoisoned)?
                .random::<ShareId>();
            if !self.parties[0].contains(id)? {
                return Ok(id);
            }
        }
    }

    fn store(
        &self,
        id: ShareId,
        shares: Vec<U256>,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        let targets = if broadcast { self.parties.len() } else { 1 };
        for party in &self.parties[..targets] {
            if party.contains(id)? {
                return Err(RepositoryError::DuplicateShare { id });
            }
        }
        for (party, share) in self.parties[..targets].iter().zip(shares) {
            party.insert(id, share)?;
        }
        Ok(id)
    }

    fn share_wise<F>(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
        op: F,
    ) -> RepositoryResult<ShareId>
    where
        F: Fn(&U256, &U256) -> U256,
    {
        let lhs = self.gather(lhs)?;
        let rhs = self.gather(rhs)?;
        let shares = lhs.iter().zip(&rhs).map(|(x, y)| op(x, y)).collect();
        self.store(new_id, shares, broadcast)
    }

    fn scaled(
        &self,
        new_id: ShareId,
        id: ShareId,
        factor: &U256,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        let shares = self
            .gather(id)?
            .iter()
            .map(|share| self.field.mul(share, factor))
            .collect();
        self.store(new_id, shares, broadcast)
    }

    /// Shares of `(a, b, a * b)` for uniform `a`, `b`.
    fn beaver_triple(&self) -> RepositoryResult<(Vec<U256>, Vec<U256>, Vec<U256>)> {
        let (a, b) = {
            let mut rng = self.rng.lock().map_err(|_| RepositoryError::LockPoisoned)?;
            (self.field.sample(&mut *rng), self.field.sample(&mut *rng))
        };
        let c = self.field.mul(&a, &b);
        Ok((self.split(&a)?, self.split(&b)?, self.split(&c)?))
    }
}

impl ShareSource for LocalRepository {
    fn share(&self, id: ShareId) -> RepositoryResult<U256> {
        self.parties[0].share(id)
    }
}

impl ShareRepository for LocalRepository {
    type Sibling = PartyStore;

    fn party_count(&self) -> usize {
        self.parties.len()
    }

    fn create_natural(&self, value: U256) -> RepositoryResult<ShareId> {
        let id = self.fresh_id()?;
        trace!(id, "sharing local value");
        let shares = self.split(&value)?;
        self.store(id, shares, true)
    }

    fn create_natural_with_shares(&self, shares: &[U256]) -> RepositoryResult<ShareId> {
        if shares.len() != self.parties.len() {
            return Err(RepositoryError::ShareCountMismatch {
                expected: self.parties.len(),
                actual: shares.len(),
            });
        }
        let id = self.fresh_id()?;
        trace!(id, "storing explicit shares");
        let shares = shares.iter().map(|share| self.field.reduce(share)).collect();
        self.store(id, shares, true)
    }

    fn add(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        trace!(new_id, lhs, rhs, "add");
        self.share_wise(new_id, lhs, rhs, broadcast, |x, y| self.field.add(x, y))
    }

    fn sub(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        trace!(new_id, lhs, rhs, "sub");
        self.share_wise(new_id, lhs, rhs, broadcast, |x, y| self.field.sub(x, y))
    }

    fn mult(
        &self,
        new_id: ShareId,
        lhs: ShareId,
        rhs: ShareId,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        trace!(new_id, lhs, rhs, "beaver multiplication");
        let xs = self.gather(lhs)?;
        let ys = self.gather(rhs)?;
        let (a, b, c) = self.beaver_triple()?;

        let masked_x: Vec<U256> = xs.iter().zip(&a).map(|(x, a)| self.field.sub(x, a)).collect();
        let masked_y: Vec<U256> = ys.iter().zip(&b).map(|(y, b)| self.field.sub(y, b)).collect();
        let d = self.open(&masked_x);
        let e = self.open(&masked_y);

        let mut shares: Vec<U256> = (0..self.parties.len())
            .map(|i| {
                let db = self.field.mul(&d, &b[i]);
                let ea = self.field.mul(&e, &a[i]);
                self.field.add(&self.field.add(&c[i], &db), &ea)
            })
            .collect();
        shares[0] = self.field.add(&shares[0], &self.field.mul(&d, &e));
        self.store(new_id, shares, broadcast)
    }

    fn mult_scalar(
        &self,
        new_id: ShareId,
        id: ShareId,
        scalar: U256,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        trace!(new_id, id, "scalar multiplication");
        let scalar = self.field.reduce(&scalar);
        self.scaled(new_id, id, &scalar, broadcast)
    }

    fn div_scalar(
        &self,
        new_id: ShareId,
        id: ShareId,
        scalar: U256,
        broadcast: bool,
    ) -> RepositoryResult<ShareId> {
        trace!(new_id, id, "scalar division");
        let inverse = self
            .field
            .inverse(&scalar)
            .ok_or(RepositoryError::NonInvertibleScalar)?;
        self.scaled(new_id, id, &inverse, broadcast)
    }

    fn siblings(&self) -> &[PartyStore] {
        &self.parties[1..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MODULUS;

    fn repository(parties: usize) -> LocalRepository {
        let field = PrimeField::new(DEFAULT_MODULUS).unwrap();
        LocalRepository::with_seed(field, parties, 42).unwrap()
    }

    fn opened(repo: &LocalRepository, id: ShareId) -> U256 {
        repo.open(&repo.gather(id).unwrap())
    }

    #[test]
    fn rejects_single_party() {
        let field = PrimeField::new(DEFAULT_MODULUS).unwrap();
        assert!(matches!(
            LocalRepository::new(field, 1),
            Err(RepositoryError::InvalidPartyCount { count: 1 })
        ));
    }

    #[test]
    fn created_value_is_split_across_parties() {
        let repo = repository(3);
        let secret = repo.field().element(123_456);
        let id = repo.create_natural(secret).unwrap();

        let shares = repo.gather(id).unwrap();
        assert_eq!(shares.len(), 3);
        assert!(shares.iter().all(|share| *share != secret));
        assert_eq!(opened(&repo, id), secret);
    }

    #[test]
    fn explicit_shares_are_stored_verbatim() {
        let repo = repository(3);
        let f = repo.field();
        let shares = [f.element(7), U256::ZERO, U256::ZERO];
        let id = repo.create_natural_with_shares(&shares).unwrap();
        assert_eq!(repo.share(id).unwrap(), f.element(7));
        assert_eq!(repo.siblings()[0].share(id).unwrap(), U256::ZERO);
    }

    #[test]
    fn explicit_shares_must_cover_every_party() {
        let repo = repository(3);
        let err = repo.create_natural_with_shares(&[U256::ONE]).unwrap_err();
        assert_eq!(
            err,
            RepositoryError::ShareCountMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn linear_operations_act_share_wise() {
        let repo = repository(4);
        let f = repo.field();
        let x = repo.create_natural(f.element(40)).unwrap();
        let y = repo.create_natural(f.element(2)).unwrap();

        let sum = repo.add(1, x, y, true).unwrap();
        let diff = repo.sub(2, y, x, true).unwrap();
        let scaled = repo.mult_scalar(3, x, f.element(3), true).unwrap();
        let halved = repo.div_scalar(4, x, f.element(2), true).unwrap();

        assert_eq!(opened(&repo, sum), f.element(42));
        assert_eq!(opened(&repo, diff), f.from_i128(-38));
        assert_eq!(opened(&repo, scaled), f.element(120));
        assert_eq!(opened(&repo, halved), f.element(20));
    }

    #[test]
    fn beaver_multiplication_is_correct() {
        let repo = repository(3);
        let f = repo.field();
        let x = repo.create_natural(f.from_i128(-12)).unwrap();
        let y = repo.create_natural(f.element(11)).unwrap();
        let product = repo.mult(9, x, y, true).unwrap();
        assert_eq!(opened(&repo, product), f.from_i128(-132));
    }

    #[test]
    fn division_by_zero_scalar_fails() {
        let repo = repository(2);
        let x = repo.create_natural(U256::ONE).unwrap();
        assert_eq!(
            repo.div_scalar(5, x, U256::ZERO, true).unwrap_err(),
            RepositoryError::NonInvertibleScalar
        );
    }

    #[test]
    fn reusing_an_id_is_rejected() {
        let repo = repository(2);
        let x = repo.create_natural(U256::ONE).unwrap();
        repo.add(77, x, x, true).unwrap();
        assert_eq!(
            repo.add(77, x, x, true).unwrap_err(),
            RepositoryError::DuplicateShare { id: 77 }
        );
    }

    #[test]
    fn missing_operand_is_reported() {
        let repo = repository(2);
        let x = repo.create_natural(U256::ONE).unwrap();
        let missing = x.wrapping_add(1);
        assert_eq!(
            repo.add(8, x, missing, true).unwrap_err(),
            RepositoryError::UnknownShare { id: missing }
        );
    }

    #[test]
    fn local_only_result_is_not_mirrored_to_siblings() {
        let repo = repository(3);
        let x = repo.create_natural(U256::ONE).unwrap();
        repo.add(11, x, x, false).unwrap();
        assert!(repo.share(11).is_ok());
        assert_eq!(
            repo.siblings()[1].share(11).unwrap_err(),
            RepositoryError::UnknownShare { id: 11 }
        );
    }
}
