//! Resource pool allocators
//!
//! Provides identifier-keyed allocation of:
//! - Integers from a bounded range (AS numbers, VLAN ids)
//! - Host addresses within one subnet
//! - Sub-prefixes carved out of a parent network (lazy buddy splitting)
//! - Items from an enumerable named set

use crate::Result;
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

mod host_pool;
mod integer_pool;
mod ledger;
mod list_pool;
mod prefix_pool;

pub use host_pool::HostAddressPool;
pub use integer_pool::IntegerPool;
pub use ledger::Owner;
pub use list_pool::ListPool;
pub use prefix_pool::PrefixPool;

/// Common allocation contract for pools whose `get` needs no parameters
/// beyond the consumer identifier
///
/// `get` is idempotent per identifier: the same consumer always receives
/// the resource it was first assigned. `reserve` claims a specific resource
/// (bootstrap of externally discovered state) and fails without mutating
/// anything when the resource is held by a different owner.
///
/// [`PrefixPool`] follows the same ownership rules but keeps its own API,
/// since allocating from it requires a prefix length.
pub trait PoolAllocator: Send + Sync {
    type Resource;

    /// Return the resource held by `identifier`, or claim the next free one.
    fn get(&mut self, identifier: Option<&str>) -> Result<Self::Resource>;

    /// Claim a specific resource, optionally for a named consumer.
    fn reserve(&mut self, resource: Self::Resource, identifier: Option<&str>) -> Result<()>;

    /// Number of resources not yet claimed.
    fn available(&self) -> u128;
}

/// Address as an integer in the family's full width.
pub(crate) fn addr_to_int(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Integer back to an address in `family`'s address family.
pub(crate) fn int_to_addr(family: &IpNet, value: u128) -> IpAddr {
    match family {
        IpNet::V4(_) => IpAddr::V4(Ipv4Addr::from(value as u32)),
        IpNet::V6(_) => IpAddr::V6(Ipv6Addr::from(value)),
    }
}
