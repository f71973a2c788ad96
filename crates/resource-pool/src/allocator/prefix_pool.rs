//! Sub-prefix carving from a parent network via lazy buddy splitting
//!
//! Free blocks are indexed per prefix length, oldest first. Construction
//! seeds the index with just the parent's two immediate halves; finer
//! blocks only come into existence when a request forces a supernet to be
//! halved down to the requested length. A block that was never carved is
//! represented implicitly by the free ancestor containing it, which keeps
//! the structure proportional to the number of allocations rather than the
//! size of the address space — carving a /127 out of a /32 touches fewer
//! than a hundred entries, not 2^95.

use crate::allocator::ledger::{ClaimRejected, Ledger, Owner};
use crate::allocator::{addr_to_int, int_to_addr};
use crate::{Error, Result};
use ipnet::IpNet;
use std::collections::{BTreeMap, VecDeque};

/// Allocator carving sub-prefixes of any requested length out of one
/// parent network
#[derive(Debug, Clone)]
pub struct PrefixPool {
    network: IpNet,
    /// Maximal free blocks, grouped by prefix length, in carve order.
    free_by_len: BTreeMap<u8, VecDeque<IpNet>>,
    /// Allocated blocks and their owners.
    ledger: Ledger<IpNet>,
}

impl PrefixPool {
    /// Create a pool over `network`.
    ///
    /// The parent is split once into its two immediate halves; everything
    /// finer is carved on demand.
    pub fn new(network: IpNet) -> Result<Self> {
        let network = network.trunc();
        if network.prefix_len() >= network.max_prefix_len() {
            return Err(Error::InvalidNetwork(format!(
                "{network} is a single address and cannot be subdivided"
            )));
        }
        let halves: VecDeque<IpNet> = network.subnets(network.prefix_len() + 1)?.collect();
        let mut free_by_len = BTreeMap::new();
        free_by_len.insert(network.prefix_len() + 1, halves);
        Ok(Self {
            network,
            free_by_len,
            ledger: Ledger::new(),
        })
    }

    pub fn network(&self) -> IpNet {
        self.network
    }

    /// Return the block held by `identifier`, or carve out the next free
    /// block of exactly `prefix_len`.
    ///
    /// An identifier already holding a block of a different length is
    /// reported as a mismatch; it cannot hold two blocks.
    pub fn get(&mut self, prefix_len: u8, identifier: Option<&str>) -> Result<IpNet> {
        if let Some(id) = identifier {
            if let Some(&held) = self.ledger.resource_for(id) {
                if held.prefix_len() == prefix_len {
                    return Ok(held);
                }
                return Err(Error::PrefixSizeMismatch {
                    identifier: id.to_string(),
                    existing: held.to_string(),
                    requested: prefix_len,
                });
            }
        }
        self.check_prefix_len(prefix_len)?;

        if self.front_free(prefix_len).is_none() {
            // No free block of this length yet: halve the closest free
            // ancestor down to it.
            let supernet = ((self.network.prefix_len() + 1)..prefix_len)
                .rev()
                .find_map(|len| self.front_free(len));
            let Some(supernet) = supernet else {
                return Err(Error::Exhausted {
                    pool: self.network.to_string(),
                });
            };
            let target = IpNet::new(supernet.network(), prefix_len)?.trunc();
            self.split_supernet(supernet, target)?;
        }

        let block = self.front_free(prefix_len).ok_or_else(|| Error::Exhausted {
            pool: self.network.to_string(),
        })?;
        self.claim(block, identifier)?;
        self.remove_free(&block);
        Ok(block)
    }

    /// Claim a specific block, optionally for a named consumer.
    ///
    /// The block must be strictly longer than the parent prefix and lie
    /// inside it. A block still embedded in a larger free block is isolated
    /// by splitting its smallest free ancestor first.
    pub fn reserve(&mut self, block: IpNet, identifier: Option<&str>) -> Result<()> {
        let block = block.trunc();
        self.check_prefix_len(block.prefix_len())?;
        if self.ancestor_of(&block, self.network.prefix_len())? != self.network {
            return Err(Error::OutOfRange {
                resource: block.to_string(),
                pool: self.network.to_string(),
            });
        }

        if let Some(id) = identifier {
            if let Some(&held) = self.ledger.resource_for(id) {
                if held == block {
                    return Ok(());
                }
                return Err(Error::IdentifierBound {
                    identifier: id.to_string(),
                    resource: held.to_string(),
                });
            }
        }
        if let Some(owner) = self.ledger.owner_of(&block) {
            // the identifier holds nothing (checked above), so only an
            // anonymous re-reservation can be a no-op here
            let requested = Owner::from_identifier(identifier);
            if *owner == requested {
                return Ok(());
            }
            return Err(Error::Conflict {
                resource: block.to_string(),
                owner: owner.clone(),
                requested,
            });
        }

        if !self.free_contains(&block) {
            let Some(ancestor) = self.find_free_ancestor(&block)? else {
                return Err(self.overlap_error(block, identifier));
            };
            self.split_supernet(ancestor, block)?;
        }
        self.claim(block, identifier)?;
        self.remove_free(&block);
        Ok(())
    }

    /// Halve `supernet` repeatedly until `target`'s length is reached.
    ///
    /// At each intermediate length the half not containing `target` joins
    /// its own length's free list; at the final length `target` is appended
    /// first, then its buddy. `supernet` must currently be a free block.
    /// Runs in time proportional to the prefix-length delta.
    pub fn split_supernet(&mut self, supernet: IpNet, target: IpNet) -> Result<()> {
        let supernet = supernet.trunc();
        let target = target.trunc();
        if target.prefix_len() <= supernet.prefix_len()
            || target.prefix_len() > self.network.max_prefix_len()
            || !supernet.contains(&target)
        {
            return Err(Error::OutOfRange {
                resource: target.to_string(),
                pool: supernet.to_string(),
            });
        }
        if !self.free_contains(&supernet) {
            return Err(Error::BlockUnavailable {
                block: supernet.to_string(),
                pool: self.network.to_string(),
            });
        }

        self.remove_free(&supernet);
        let mut current = supernet;
        for len in (supernet.prefix_len() + 1)..=target.prefix_len() {
            let low = IpNet::new(current.network(), len)?.trunc();
            let high = self.sibling_of(&low)?;
            let (next, sibling) = if low.contains(&target) {
                (low, high)
            } else {
                (high, low)
            };
            if len == target.prefix_len() {
                self.push_free(next);
                self.push_free(sibling);
            } else {
                self.push_free(sibling);
                current = next;
            }
        }
        tracing::debug!(
            network = %self.network,
            supernet = %supernet,
            target = %target,
            "carved supernet"
        );
        Ok(())
    }

    /// Free-list sizes per prefix length (empty lists omitted).
    pub fn available_by_prefix_len(&self) -> BTreeMap<u8, usize> {
        self.free_by_len
            .iter()
            .filter(|(_, blocks)| !blocks.is_empty())
            .map(|(&len, blocks)| (len, blocks.len()))
            .collect()
    }

    /// How many blocks of `prefix_len` could still be carved out.
    pub fn available_count(&self, prefix_len: u8) -> u128 {
        self.free_by_len
            .iter()
            .filter(|(&len, _)| len <= prefix_len)
            .fold(0u128, |total, (&len, blocks)| {
                let per_block = 1u128
                    .checked_shl((prefix_len - len) as u32)
                    .unwrap_or(u128::MAX);
                total.saturating_add(per_block.saturating_mul(blocks.len() as u128))
            })
    }

    /// Ordered snapshot of the free list for one prefix length.
    pub fn free_blocks(&self, prefix_len: u8) -> Vec<IpNet> {
        self.free_by_len
            .get(&prefix_len)
            .map(|blocks| blocks.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Allocated blocks in address order.
    pub fn allocated_blocks(&self) -> Vec<IpNet> {
        self.ledger.resources().copied().collect()
    }

    pub fn is_allocated(&self, block: &IpNet) -> bool {
        self.ledger.is_claimed(&block.trunc())
    }

    /// Whether `identifier` already holds a block.
    pub fn has_allocation(&self, identifier: &str) -> bool {
        self.ledger.resource_for(identifier).is_some()
    }

    fn check_prefix_len(&self, prefix_len: u8) -> Result<()> {
        if prefix_len <= self.network.prefix_len() || prefix_len > self.network.max_prefix_len() {
            return Err(Error::InvalidPrefixLen {
                prefix_len,
                network: self.network.to_string(),
            });
        }
        Ok(())
    }

    /// The supernet of `block` at `prefix_len`.
    fn ancestor_of(&self, block: &IpNet, prefix_len: u8) -> Result<IpNet> {
        Ok(IpNet::new(block.network(), prefix_len)?.trunc())
    }

    /// The buddy block: same length, differing in the last prefix bit.
    fn sibling_of(&self, net: &IpNet) -> Result<IpNet> {
        let bit = 1u128 << (net.max_prefix_len() - net.prefix_len());
        let addr = int_to_addr(net, addr_to_int(net.network()) ^ bit);
        Ok(IpNet::new(addr, net.prefix_len())?.trunc())
    }

    /// Smallest free block strictly containing `block`, if any.
    fn find_free_ancestor(&self, block: &IpNet) -> Result<Option<IpNet>> {
        for len in ((self.network.prefix_len() + 1)..block.prefix_len()).rev() {
            let ancestor = self.ancestor_of(block, len)?;
            if self.free_contains(&ancestor) {
                return Ok(Some(ancestor));
            }
        }
        Ok(None)
    }

    fn front_free(&self, prefix_len: u8) -> Option<IpNet> {
        self.free_by_len
            .get(&prefix_len)
            .and_then(|blocks| blocks.front())
            .copied()
    }

    fn free_contains(&self, block: &IpNet) -> bool {
        self.free_by_len
            .get(&block.prefix_len())
            .is_some_and(|blocks| blocks.contains(block))
    }

    fn push_free(&mut self, block: IpNet) {
        self.free_by_len
            .entry(block.prefix_len())
            .or_default()
            .push_back(block);
    }

    fn remove_free(&mut self, block: &IpNet) {
        if let Some(blocks) = self.free_by_len.get_mut(&block.prefix_len()) {
            if let Some(pos) = blocks.iter().position(|b| b == block) {
                blocks.remove(pos);
            }
        }
    }

    /// Conflict diagnostics for a block overlapping existing allocations.
    fn overlap_error(&self, block: IpNet, identifier: Option<&str>) -> Error {
        let overlapping = self
            .ledger
            .resources()
            .find(|b| b.contains(&block) || block.contains(*b));
        match overlapping {
            Some(existing) => Error::Conflict {
                resource: block.to_string(),
                owner: self
                    .ledger
                    .owner_of(existing)
                    .cloned()
                    .unwrap_or(Owner::Anonymous),
                requested: Owner::from_identifier(identifier),
            },
            None => Error::BlockUnavailable {
                block: block.to_string(),
                pool: self.network.to_string(),
            },
        }
    }

    fn claim(&mut self, block: IpNet, identifier: Option<&str>) -> Result<()> {
        let owner = Owner::from_identifier(identifier);
        match self.ledger.try_claim(block, owner.clone()) {
            Ok(fresh) => {
                if fresh {
                    tracing::debug!(
                        network = %self.network,
                        block = %block,
                        owner = %owner,
                        "claimed prefix"
                    );
                }
                Ok(())
            }
            Err(ClaimRejected::HeldBy(current)) => Err(Error::Conflict {
                resource: block.to_string(),
                owner: current,
                requested: owner,
            }),
            Err(ClaimRejected::BoundTo(held)) => Err(Error::IdentifierBound {
                identifier: identifier.unwrap_or_default().to_string(),
                resource: held.to_string(),
            }),
        }
    }
}
