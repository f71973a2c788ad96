//! Host address allocation within one subnet

use crate::allocator::ledger::{ClaimRejected, Ledger, Owner};
use crate::allocator::{addr_to_int, int_to_addr, PoolAllocator};
use crate::{Error, Result};
use ipnet::IpNet;
use std::net::IpAddr;

/// Allocator for usable host addresses in a fixed subnet
///
/// Addresses are tracked as offsets from the subnet base, so the structure
/// costs nothing for IPv6-sized subnets. The network and broadcast
/// addresses are excluded from the usable window, except in point-to-point
/// subnets (IPv4 /31, IPv6 /127) where both addresses are usable.
#[derive(Debug, Clone)]
pub struct HostAddressPool {
    subnet: IpNet,
    base: u128,
    /// First usable offset from the subnet base.
    first_offset: u128,
    /// Last usable offset, inclusive.
    last_offset: u128,
    usable: u128,
    ledger: Ledger<u128>,
    /// Lowest offset that may still be free. Claims are never released, so
    /// the first free offset can only move up.
    scan_hint: u128,
}

impl HostAddressPool {
    pub fn new(subnet: IpNet) -> Self {
        let subnet = subnet.trunc();
        let host_bits = subnet.max_prefix_len() - subnet.prefix_len();

        let (first_offset, last_offset) = match host_bits {
            // single-address subnet, nothing allocatable
            0 => (1, 0),
            // point-to-point: both addresses are hosts
            1 => (0, 1),
            128 => (1, u128::MAX - 1),
            n => (1, (1u128 << n) - 2),
        };
        let usable = if last_offset < first_offset {
            0
        } else {
            last_offset - first_offset + 1
        };

        Self {
            base: addr_to_int(subnet.network()),
            subnet,
            first_offset,
            last_offset,
            usable,
            ledger: Ledger::new(),
            scan_hint: first_offset,
        }
    }

    pub fn subnet(&self) -> IpNet {
        self.subnet
    }

    /// Number of usable host addresses in the subnet.
    pub fn usable(&self) -> u128 {
        self.usable
    }

    /// Explicit-offset variant of `get`.
    ///
    /// `offset` counts from the subnet base address and must fall in the
    /// usable window. An address claimed anonymously may be adopted here by
    /// a named consumer; an address held by a different named consumer is a
    /// conflict.
    pub fn get_at(&mut self, offset: u128, identifier: Option<&str>) -> Result<IpAddr> {
        if let Some(id) = identifier {
            if let Some(&held) = self.ledger.resource_for(id) {
                return Ok(self.addr_at(held));
            }
        }
        self.check_window(offset)?;

        let addr = self.addr_at(offset);
        match self.ledger.owner_of(&offset) {
            None => {
                self.claim(offset, identifier)?;
                Ok(addr)
            }
            Some(Owner::Anonymous) => {
                if let Some(id) = identifier {
                    self.ledger.adopt(&offset, id);
                }
                Ok(addr)
            }
            Some(Owner::Named(name)) if identifier == Some(name.as_str()) => Ok(addr),
            Some(owner) => Err(Error::Conflict {
                resource: addr.to_string(),
                owner: owner.clone(),
                requested: Owner::from_identifier(identifier),
            }),
        }
    }

    /// Look up the address held by `identifier` without allocating.
    pub fn get_existing(&self, identifier: &str) -> Result<IpAddr> {
        self.ledger
            .resource_for(identifier)
            .map(|&offset| self.addr_at(offset))
            .ok_or_else(|| Error::NotFound {
                identifier: identifier.to_string(),
            })
    }

    fn addr_at(&self, offset: u128) -> IpAddr {
        int_to_addr(&self.subnet, self.base + offset)
    }

    fn check_window(&self, offset: u128) -> Result<()> {
        if offset < self.first_offset || offset > self.last_offset {
            return Err(Error::OutOfRange {
                resource: format!("offset {offset}"),
                pool: self.subnet.to_string(),
            });
        }
        Ok(())
    }

    fn claim(&mut self, offset: u128, identifier: Option<&str>) -> Result<()> {
        let owner = Owner::from_identifier(identifier);
        match self.ledger.try_claim(offset, owner.clone()) {
            Ok(fresh) => {
                if fresh {
                    tracing::debug!(
                        subnet = %self.subnet,
                        address = %self.addr_at(offset),
                        owner = %owner,
                        "claimed host address"
                    );
                }
                Ok(())
            }
            Err(ClaimRejected::HeldBy(current)) => Err(Error::Conflict {
                resource: self.addr_at(offset).to_string(),
                owner: current,
                requested: owner,
            }),
            Err(ClaimRejected::BoundTo(held)) => Err(Error::IdentifierBound {
                identifier: identifier.unwrap_or_default().to_string(),
                resource: self.addr_at(held).to_string(),
            }),
        }
    }
}

impl PoolAllocator for HostAddressPool {
    type Resource = IpAddr;

    fn get(&mut self, identifier: Option<&str>) -> Result<IpAddr> {
        if let Some(id) = identifier {
            if let Some(&held) = self.ledger.resource_for(id) {
                return Ok(self.addr_at(held));
            }
        }
        let mut offset = self.scan_hint;
        while offset <= self.last_offset {
            if !self.ledger.is_claimed(&offset) {
                self.claim(offset, identifier)?;
                self.scan_hint = offset + 1;
                return Ok(self.addr_at(offset));
            }
            offset += 1;
        }
        Err(Error::Exhausted {
            pool: self.subnet.to_string(),
        })
    }

    fn reserve(&mut self, address: IpAddr, identifier: Option<&str>) -> Result<()> {
        if !self.subnet.contains(&address) {
            return Err(Error::OutOfRange {
                resource: address.to_string(),
                pool: self.subnet.to_string(),
            });
        }
        let offset = addr_to_int(address) - self.base;
        self.check_window(offset)?;
        self.claim(offset, identifier)
    }

    fn available(&self) -> u128 {
        self.usable - self.ledger.claimed_count() as u128
    }
}
