use std::collections::HashSet;

use log::debug;
use parking_lot::RwLock;
use snafu::ensure;

use crate::config::*;

/// A ballot that can be kept in a `BallotStore`.
pub trait Ballot: Clone + Send + Sync {
    const KIND: BallotKind;
    fn voter_id(&self) -> VoterId;
}

impl Ballot for VoteRecord {
    const KIND: BallotKind = BallotKind::Plurality;
    fn voter_id(&self) -> VoterId {
        self.voter_id
    }
}

impl Ballot for RankedBallot {
    const KIND: BallotKind = BallotKind::Ranked;
    fn voter_id(&self) -> VoterId {
        self.voter_id
    }
}

impl Ballot for EncryptedBallot {
    const KIND: BallotKind = BallotKind::Encrypted;
    fn voter_id(&self) -> VoterId {
        self.voter_id
    }
}

#[derive(Debug)]
struct StoreInner<B> {
    // In submission order.
    records: Vec<B>,
    voted: HashSet<VoterId>,
}

/// The accepted ballots of one kind.
///
/// A voter may have at most one ballot in a store. Records are never removed or
/// modified once accepted.
#[derive(Debug)]
pub struct BallotStore<B> {
    inner: RwLock<StoreInner<B>>,
}

impl<B: Ballot> Default for BallotStore<B> {
    fn default() -> Self {
        BallotStore::new()
    }
}

impl<B: Ballot> BallotStore<B> {
    pub fn new() -> BallotStore<B> {
        BallotStore {
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                voted: HashSet::new(),
            }),
        }
    }

    /// Inserts the ballot, unless the voter already has a ballot in this store.
    ///
    /// The check and the insertion happen under the same lock.
    pub fn record(&self, ballot: B) -> TallyResult<B> {
        let voter_id = ballot.voter_id();
        let mut inner = self.inner.write();
        ensure!(
            !inner.voted.contains(&voter_id),
            DuplicateBallotSnafu {
                voter_id,
                kind: B::KIND
            }
        );
        inner.voted.insert(voter_id);
        inner.records.push(ballot.clone());
        debug!(
            "record: {} ballot from voter {} accepted ({} in store)",
            B::KIND,
            voter_id,
            inner.records.len()
        );
        Ok(ballot)
    }

    pub fn has_voted(&self, voter_id: VoterId) -> bool {
        self.inner.read().voted.contains(&voter_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// A copy of all the records, in submission order.
    pub fn snapshot(&self) -> Vec<B> {
        self.inner.read().records.clone()
    }

    /// Runs `f` over a consistent view of the records.
    pub fn read<R>(&self, f: impl FnOnce(&[B]) -> R) -> R {
        let inner = self.inner.read();
        f(&inner.records)
    }
}
