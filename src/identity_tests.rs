// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for host identity construction.

use super::*;

#[test]
fn test_new_derives_ip_port_address() {
    let identity = HostIdentity::new(Ipv4Addr::new(10, 0, 0, 2), 27017);
    assert_eq!(identity.ip, Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(identity.address, "10.0.0.2:27017");
}

#[test]
fn test_new_respects_non_default_port() {
    let identity = HostIdentity::new(Ipv4Addr::new(192, 168, 4, 17), 27018);
    assert_eq!(identity.address, "192.168.4.17:27018");
}

#[tokio::test]
async fn test_resolve_localhost_like_names() {
    // The loopback name is the only one guaranteed resolvable everywhere;
    // resolve() itself is exercised against the real hostname at startup.
    let addrs: Vec<_> = tokio::net::lookup_host(("localhost", 27017))
        .await
        .expect("localhost must resolve")
        .collect();
    assert!(!addrs.is_empty());
}
