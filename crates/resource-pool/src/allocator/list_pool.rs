//! Allocation from an enumerable, ordered set of named items

use crate::allocator::ledger::{ClaimRejected, Ledger, Owner};
use crate::allocator::PoolAllocator;
use crate::expand::expand_list;
use crate::{Error, Result};
use std::collections::HashSet;

/// Allocator over an explicit ordered item set (interface names, port
/// groups, rack slots)
///
/// The set is built once at construction by expanding bracket templates;
/// items are handed out in expansion order, first occurrence winning over
/// later duplicates.
#[derive(Debug, Clone)]
pub struct ListPool {
    name: String,
    items: Vec<String>,
    ledger: Ledger<String>,
}

impl ListPool {
    pub fn new<S: AsRef<str>>(name: impl Into<String>, templates: &[S]) -> Result<Self> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for item in expand_list(templates)? {
            if seen.insert(item.clone()) {
                items.push(item);
            }
        }
        Ok(Self {
            name: name.into(),
            items,
            ledger: Ledger::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of items in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The expanded item set, in allocation order.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    fn claim(&mut self, item: &str, identifier: Option<&str>) -> Result<()> {
        let owner = Owner::from_identifier(identifier);
        match self.ledger.try_claim(item.to_string(), owner.clone()) {
            Ok(fresh) => {
                if fresh {
                    tracing::debug!(pool = %self.name, item, owner = %owner, "claimed item");
                }
                Ok(())
            }
            Err(ClaimRejected::HeldBy(current)) => Err(Error::Conflict {
                resource: item.to_string(),
                owner: current,
                requested: owner,
            }),
            Err(ClaimRejected::BoundTo(held)) => Err(Error::IdentifierBound {
                identifier: identifier.unwrap_or_default().to_string(),
                resource: held,
            }),
        }
    }
}

impl PoolAllocator for ListPool {
    type Resource = String;

    fn get(&mut self, identifier: Option<&str>) -> Result<String> {
        if let Some(id) = identifier {
            if let Some(held) = self.ledger.resource_for(id) {
                return Ok(held.clone());
            }
        }
        let next = self
            .items
            .iter()
            .find(|item| !self.ledger.is_claimed(*item))
            .cloned();
        match next {
            Some(item) => {
                self.claim(&item, identifier)?;
                Ok(item)
            }
            None => Err(Error::Exhausted {
                pool: self.name.clone(),
            }),
        }
    }

    fn reserve(&mut self, item: String, identifier: Option<&str>) -> Result<()> {
        if !self.items.contains(&item) {
            return Err(Error::OutOfRange {
                resource: item,
                pool: self.name.clone(),
            });
        }
        self.claim(&item, identifier)
    }

    fn available(&self) -> u128 {
        (self.items.len() - self.ledger.claimed_count()) as u128
    }
}
