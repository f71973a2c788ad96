//! Identifier-keyed allocation pools for scarce network resources
//!
//! Hands out uniquely-identified resources to named consumers:
//! - AS numbers and other bounded integers ([`IntegerPool`])
//! - Host addresses within one subnet ([`HostAddressPool`])
//! - Sub-prefixes carved out of a parent network ([`PrefixPool`])
//! - Items from an enumerable named set ([`ListPool`])
//!
//! All pools share one contract: `get` is idempotent per consumer
//! identifier (the same consumer always receives the resource it was first
//! assigned), `reserve` seeds a pool with resources already in use
//! elsewhere, and no resource is ever handed to two consumers. Failed
//! operations leave pool state untouched and report enough context to log
//! and move on.
//!
//! Pools are rebuilt each run: construct one from its immutable
//! definition, replay the known-in-use state as `reserve` calls, then
//! serve `get` requests. Nothing is released and nothing persists at this
//! layer.
//!
//! Pools do not lock internally; share one across threads only behind
//! external serialization.

pub mod allocator;
pub mod error;
pub mod expand;

pub use allocator::{
    HostAddressPool, IntegerPool, ListPool, Owner, PoolAllocator, PrefixPool,
};
pub use error::{Error, Result};
pub use expand::{expand_list, expand_range};
