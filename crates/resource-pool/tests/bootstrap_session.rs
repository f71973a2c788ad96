//! Allocation-session integration tests
//!
//! Exercises the bootstrap contract end to end: construct a pool, replay
//! externally discovered reservations, then serve idempotent `get`
//! requests — the way an inventory-backed allocation run uses the pools.

use ipnet::IpNet;
use resource_pool::{
    Error, HostAddressPool, IntegerPool, ListPool, PoolAllocator, PrefixPool,
};
use std::net::IpAddr;
use std::str::FromStr;

fn net(s: &str) -> IpNet {
    IpNet::from_str(s).unwrap()
}

fn addr(s: &str) -> IpAddr {
    IpAddr::from_str(s).unwrap()
}

// ============================================================================
// ASN session
// ============================================================================

#[test]
fn test_asn_session_bootstrap_then_allocate() {
    let mut asns = IntegerPool::new("private-asn", 64512, 64520).unwrap();

    // two devices already hold ASNs in the inventory
    asns.reserve(64512, Some("spine1")).unwrap();
    asns.reserve(64514, Some("leaf3")).unwrap();

    // known devices get their existing numbers back
    assert_eq!(asns.get(Some("spine1")).unwrap(), 64512);
    assert_eq!(asns.get(Some("leaf3")).unwrap(), 64514);

    // a new device fills the first hole
    assert_eq!(asns.get(Some("leaf4")).unwrap(), 64513);
    assert_eq!(asns.get(Some("leaf5")).unwrap(), 64515);

    // replays stay stable
    assert_eq!(asns.get(Some("leaf4")).unwrap(), 64513);
    assert_eq!(asns.available(), 4);
}

// ============================================================================
// Loopback addresses
// ============================================================================

#[test]
fn test_loopback_session() {
    let mut loopbacks = HostAddressPool::new(net("10.255.0.0/24"));

    loopbacks.reserve(addr("10.255.0.1"), Some("spine1")).unwrap();
    loopbacks.reserve(addr("10.255.0.2"), Some("spine2")).unwrap();

    assert_eq!(loopbacks.get(Some("spine1")).unwrap(), addr("10.255.0.1"));
    assert_eq!(loopbacks.get(Some("leaf1")).unwrap(), addr("10.255.0.3"));
    assert_eq!(loopbacks.get(Some("leaf1")).unwrap(), addr("10.255.0.3"));

    // a lookup-only probe for an unknown device does not allocate
    assert!(matches!(
        loopbacks.get_existing("leaf2"),
        Err(Error::NotFound { .. })
    ));
    assert_eq!(loopbacks.available(), 251);
}

// ============================================================================
// Point-to-point fabric links
// ============================================================================

#[test]
fn test_fabric_link_session() {
    // one /31 per fabric link, carved from the fabric supernet
    let mut links = PrefixPool::new(net("10.0.0.0/24")).unwrap();

    links.reserve(net("10.0.0.0/31"), Some("spine1::leaf1")).unwrap();
    assert_eq!(
        links.get(31, Some("spine1::leaf2")).unwrap(),
        net("10.0.0.2/31")
    );

    // each link subnet then hands out its two endpoint addresses
    let mut link = HostAddressPool::new(net("10.0.0.2/31"));
    assert_eq!(link.usable(), 2);
    assert_eq!(link.get(Some("spine1")).unwrap(), addr("10.0.0.2"));
    assert_eq!(link.get(Some("leaf2")).unwrap(), addr("10.0.0.3"));
}

// ============================================================================
// Site prefix carving
// ============================================================================

#[test]
fn test_site_prefix_session() {
    let mut sites = PrefixPool::new(net("10.128.0.0/12")).unwrap();

    // inventory says two sites exist already
    sites.reserve(net("10.128.0.0/16"), Some("ams1")).unwrap();
    sites.reserve(net("10.130.0.0/16"), Some("fra2")).unwrap();

    // a new site gets the earliest free /16 between them
    assert_eq!(sites.get(16, Some("lhr1")).unwrap(), net("10.129.0.0/16"));
    assert_eq!(sites.get(16, Some("ams1")).unwrap(), net("10.128.0.0/16"));

    // inconsistent inventory data surfaces as a diagnosable conflict
    let err = sites.reserve(net("10.129.0.0/16"), Some("sin1")).unwrap_err();
    assert!(err.is_recoverable());
    let message = err.to_string();
    assert!(message.contains("10.129.0.0/16"));
    assert!(message.contains("lhr1"));
    assert!(message.contains("sin1"));

    // the conflicting reserve changed nothing
    assert_eq!(sites.get(16, Some("lhr1")).unwrap(), net("10.129.0.0/16"));
    assert!(!sites.has_allocation("sin1"));
}

// ============================================================================
// Interface assignment
// ============================================================================

#[test]
fn test_interface_session() {
    let mut uplinks = ListPool::new("spine1-uplinks", &["et-[0-3]/0/0"]).unwrap();

    uplinks
        .reserve("et-0/0/0".to_string(), Some("leaf1::et-0/0/48"))
        .unwrap();

    assert_eq!(uplinks.get(Some("leaf2::et-0/0/48")).unwrap(), "et-1/0/0");
    assert_eq!(uplinks.get(Some("leaf1::et-0/0/48")).unwrap(), "et-0/0/0");
    assert_eq!(uplinks.available(), 2);
}

// ============================================================================
// IPv6 session
// ============================================================================

#[test]
fn test_v6_session() {
    let mut sites = PrefixPool::new(net("2001:db8::/32")).unwrap();
    sites.reserve(net("2001:db8:100::/48"), Some("ams1")).unwrap();

    // the reserved block's buddy was carved free and is handed out first
    let lhr1 = sites.get(48, Some("lhr1")).unwrap();
    assert_eq!(lhr1, net("2001:db8:101::/48"));

    let mut hosts = HostAddressPool::new(net("2001:db8::/64"));
    assert_eq!(hosts.get(Some("lb1")).unwrap(), addr("2001:db8::1"));
    assert_eq!(hosts.get(Some("lb1")).unwrap(), addr("2001:db8::1"));
}
