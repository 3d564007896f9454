//! Integration tests for parsing network service data.

use openstack_network::models::{Direction, SecurityGroup};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize)]
struct SecurityGroupList {
    security_groups: Vec<SecurityGroup>,
}

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load the security group fixture from disk.
fn load_security_groups_fixture() -> String {
    let fixture_path = fixtures_dir().join("security_groups.json");
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read security group fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

#[test]
fn test_deserialize_security_groups() {
    let json_data = load_security_groups_fixture();

    let list: SecurityGroupList = serde_json::from_str(&json_data)
        .unwrap_or_else(|e| panic!("Failed to deserialize security group data: {}", e));

    assert_eq!(list.security_groups.len(), 2);

    let default = &list.security_groups[0];
    assert_eq!(default.security_group_rules.len(), 2);
    assert!(default.security_group_rules.iter().all(|rule| rule.protocol.is_none()));
    assert_eq!(
        default.extra.get("stateful").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn test_deploy_group_rules() {
    let list: SecurityGroupList = serde_json::from_str(&load_security_groups_fixture()).unwrap();
    let group = list
        .security_groups
        .iter()
        .find(|group| group.name == "deploy-web-ssh")
        .expect("deploy group should be present");

    let ranges: Vec<_> = group
        .security_group_rules
        .iter()
        .map(|rule| {
            assert_eq!(rule.direction, Direction::Ingress);
            (rule.port_range_min, rule.port_range_max)
        })
        .collect();
    assert_eq!(
        ranges,
        vec![(Some(80), Some(81)), (Some(443), Some(443)), (Some(22), Some(22))]
    );
}
