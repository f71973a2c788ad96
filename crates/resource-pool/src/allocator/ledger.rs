//! Dual-keyed allocation ledger shared by all pool types
//!
//! Tracks resource-key → owner and identifier → resource-key together, so
//! that a resource has at most one owner and an identifier holds at most one
//! resource. Both sides are updated inside a single operation or not at all.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Holder of a claimed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// Claimed with no consumer attached (bootstrap data without an owner)
    Anonymous,
    /// Claimed by a named consumer, retrievable through the reverse index
    Named(String),
}

impl Owner {
    pub fn from_identifier(identifier: Option<&str>) -> Self {
        match identifier {
            Some(name) => Owner::Named(name.to_string()),
            None => Owner::Anonymous,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Owner::Anonymous => None,
            Owner::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Anonymous => f.write_str("anonymous"),
            Owner::Named(name) => write!(f, "'{name}'"),
        }
    }
}

/// Why a claim was rejected; the ledger mutated nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRejected<K> {
    /// The resource is held by a different owner.
    HeldBy(Owner),
    /// The identifier already holds a different resource.
    BoundTo(K),
}

/// Allocation record keyed both ways
///
/// Resource keys live in a `BTreeMap` so iteration is ascending in the
/// native key type; identifiers index back into it for idempotent re-fetch.
#[derive(Debug, Clone)]
pub struct Ledger<K> {
    by_resource: BTreeMap<K, Owner>,
    by_identifier: HashMap<String, K>,
}

impl<K: Ord + Clone> Ledger<K> {
    pub fn new() -> Self {
        Self {
            by_resource: BTreeMap::new(),
            by_identifier: HashMap::new(),
        }
    }

    /// Resource previously claimed by `identifier`, if any.
    pub fn resource_for(&self, identifier: &str) -> Option<&K> {
        self.by_identifier.get(identifier)
    }

    pub fn owner_of(&self, key: &K) -> Option<&Owner> {
        self.by_resource.get(key)
    }

    pub fn is_claimed(&self, key: &K) -> bool {
        self.by_resource.contains_key(key)
    }

    pub fn claimed_count(&self) -> usize {
        self.by_resource.len()
    }

    /// Claimed resource keys in ascending order.
    pub fn resources(&self) -> impl Iterator<Item = &K> {
        self.by_resource.keys()
    }

    /// Claim `key` for `owner`.
    ///
    /// Returns `Ok(true)` on a fresh claim and `Ok(false)` when `key` is
    /// already held by exactly this owner (idempotent no-op). Any other
    /// combination is rejected without touching either map.
    pub fn try_claim(&mut self, key: K, owner: Owner) -> Result<bool, ClaimRejected<K>> {
        match self.by_resource.get(&key) {
            Some(current) if *current == owner => return Ok(false),
            Some(current) => return Err(ClaimRejected::HeldBy(current.clone())),
            None => {}
        }
        if let Some(name) = owner.name() {
            if let Some(held) = self.by_identifier.get(name) {
                return Err(ClaimRejected::BoundTo(held.clone()));
            }
            self.by_identifier.insert(name.to_string(), key.clone());
        }
        self.by_resource.insert(key, owner);
        Ok(true)
    }

    /// Attach `identifier` to an anonymously claimed resource.
    ///
    /// Returns false (and changes nothing) unless `key` is currently held
    /// anonymously and `identifier` holds nothing else.
    pub fn adopt(&mut self, key: &K, identifier: &str) -> bool {
        if self.by_resource.get(key) != Some(&Owner::Anonymous)
            || self.by_identifier.contains_key(identifier)
        {
            return false;
        }
        self.by_identifier
            .insert(identifier.to_string(), key.clone());
        self.by_resource
            .insert(key.clone(), Owner::Named(identifier.to_string()));
        true
    }
}

impl<K: Ord + Clone> Default for Ledger<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_claim_and_refetch() {
        let mut ledger: Ledger<u64> = Ledger::new();

        assert_eq!(ledger.try_claim(3, Owner::Named("a".into())), Ok(true));
        assert_eq!(ledger.resource_for("a"), Some(&3));
        assert_eq!(ledger.owner_of(&3), Some(&Owner::Named("a".into())));
        assert_eq!(ledger.claimed_count(), 1);
    }

    #[test]
    fn test_claim_is_idempotent_per_owner() {
        let mut ledger: Ledger<u64> = Ledger::new();

        ledger.try_claim(3, Owner::Named("a".into())).unwrap();
        assert_eq!(ledger.try_claim(3, Owner::Named("a".into())), Ok(false));

        ledger.try_claim(7, Owner::Anonymous).unwrap();
        assert_eq!(ledger.try_claim(7, Owner::Anonymous), Ok(false));
    }

    #[test]
    fn test_conflicting_claims_rejected_without_mutation() {
        let mut ledger: Ledger<u64> = Ledger::new();
        ledger.try_claim(3, Owner::Named("a".into())).unwrap();

        assert_eq!(
            ledger.try_claim(3, Owner::Named("b".into())),
            Err(ClaimRejected::HeldBy(Owner::Named("a".into())))
        );
        assert_eq!(
            ledger.try_claim(3, Owner::Anonymous),
            Err(ClaimRejected::HeldBy(Owner::Named("a".into())))
        );
        // loser left no trace in the reverse index
        assert_eq!(ledger.resource_for("b"), None);
        assert_eq!(ledger.resource_for("a"), Some(&3));
    }

    #[test]
    fn test_identifier_holds_one_resource() {
        let mut ledger: Ledger<u64> = Ledger::new();
        ledger.try_claim(3, Owner::Named("a".into())).unwrap();

        assert_eq!(
            ledger.try_claim(5, Owner::Named("a".into())),
            Err(ClaimRejected::BoundTo(3))
        );
        assert!(!ledger.is_claimed(&5));
    }

    #[test]
    fn test_anonymous_vs_named_are_distinct_owners() {
        let mut ledger: Ledger<u64> = Ledger::new();
        ledger.try_claim(3, Owner::Anonymous).unwrap();

        assert_eq!(
            ledger.try_claim(3, Owner::Named("a".into())),
            Err(ClaimRejected::HeldBy(Owner::Anonymous))
        );
    }

    #[test]
    fn test_adopt_anonymous_claim() {
        let mut ledger: Ledger<u64> = Ledger::new();
        ledger.try_claim(3, Owner::Anonymous).unwrap();

        assert!(ledger.adopt(&3, "gw"));
        assert_eq!(ledger.resource_for("gw"), Some(&3));
        assert_eq!(ledger.owner_of(&3), Some(&Owner::Named("gw".into())));

        // named claims and unclaimed keys cannot be adopted
        assert!(!ledger.adopt(&3, "other"));
        assert!(!ledger.adopt(&9, "other"));
    }

    #[test]
    fn test_resources_iterate_ascending() {
        let mut ledger: Ledger<u64> = Ledger::new();
        for key in [9u64, 2, 5] {
            ledger.try_claim(key, Owner::Anonymous).unwrap();
        }
        let keys: Vec<u64> = ledger.resources().copied().collect();
        assert_eq!(keys, vec![2, 5, 9]);
    }
}
