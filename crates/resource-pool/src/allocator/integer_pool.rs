//! Bounded integer allocation (AS numbers, VLAN ids, route targets)

use crate::allocator::ledger::{ClaimRejected, Ledger, Owner};
use crate::allocator::PoolAllocator;
use crate::{Error, Result};

/// Allocator for a contiguous, end-exclusive integer range
///
/// Values are handed out lowest-first. A consumer identifier always gets
/// the value it was first given; `reserve` seeds the pool with values that
/// are already in use elsewhere.
#[derive(Debug, Clone)]
pub struct IntegerPool {
    name: String,
    start: u64,
    end: u64,
    /// Claims keyed by offset from `start`.
    ledger: Ledger<u64>,
}

impl IntegerPool {
    /// Create a pool over `[start, end)`.
    pub fn new(name: impl Into<String>, start: u64, end: u64) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self {
            name: name.into(),
            start,
            end,
            ledger: Ledger::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of values in the range.
    pub fn capacity(&self) -> u64 {
        self.end - self.start
    }

    fn claim(&mut self, offset: u64, identifier: Option<&str>) -> Result<()> {
        let owner = Owner::from_identifier(identifier);
        match self.ledger.try_claim(offset, owner.clone()) {
            Ok(fresh) => {
                if fresh {
                    tracing::debug!(
                        pool = %self.name,
                        value = self.start + offset,
                        owner = %owner,
                        "claimed integer"
                    );
                }
                Ok(())
            }
            Err(ClaimRejected::HeldBy(current)) => Err(Error::Conflict {
                resource: (self.start + offset).to_string(),
                owner: current,
                requested: owner,
            }),
            Err(ClaimRejected::BoundTo(held)) => Err(Error::IdentifierBound {
                identifier: identifier.unwrap_or_default().to_string(),
                resource: (self.start + held).to_string(),
            }),
        }
    }
}

impl PoolAllocator for IntegerPool {
    type Resource = u64;

    fn get(&mut self, identifier: Option<&str>) -> Result<u64> {
        if let Some(id) = identifier {
            if let Some(&offset) = self.ledger.resource_for(id) {
                return Ok(self.start + offset);
            }
        }
        let mut offset = 0;
        while offset < self.capacity() {
            if !self.ledger.is_claimed(&offset) {
                self.claim(offset, identifier)?;
                return Ok(self.start + offset);
            }
            offset += 1;
        }
        Err(Error::Exhausted {
            pool: self.name.clone(),
        })
    }

    fn reserve(&mut self, value: u64, identifier: Option<&str>) -> Result<()> {
        if value < self.start || value >= self.end {
            return Err(Error::OutOfRange {
                resource: value.to_string(),
                pool: self.name.clone(),
            });
        }
        self.claim(value - self.start, identifier)
    }

    fn available(&self) -> u128 {
        (self.capacity() - self.ledger.claimed_count() as u64) as u128
    }
}
