use controlflow::base::{RejectType, RequestBuilder};
use controlflow::blacklist::IpBlacklistFilter;
use controlflow::ControlFlow;
use std::fs;
use std::sync::Arc;

fn filter(properties: &str) -> (tempfile::TempDir, IpBlacklistFilter) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("controlflow.properties");
    fs::write(&path, properties).unwrap();
    let filter = IpBlacklistFilter::new(&path).unwrap();
    (dir, filter)
}

#[test]
fn blacklist_semantics() {
    let (_dir, blacklist_only) = filter("ip.blacklist=10.10.10.*\n");
    assert!(blacklist_only.is_blocked("10.10.10.5"));
    assert!(!blacklist_only.is_blocked("192.168.0.5"));

    let (_dir, whitelisted) = filter("ip.blacklist=10.10.10.*\nip.whitelist=10.10.10.5\n");
    assert!(!whitelisted.is_blocked("10.10.10.5"));
    assert!(whitelisted.is_blocked("10.10.10.6"));

    let (_dir, empty) = filter("ip.blacklist=\nip.whitelist=10.10.10.5\n");
    assert!(!empty.is_blocked("10.10.10.6"));
}

#[test]
fn blacklisted_requests_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("controlflow.properties");
    fs::write(&path, "ip.blacklist=10.10.10.*\n").unwrap();
    let control_flow = ControlFlow::new(&path).unwrap();

    let err = control_flow
        .admit(Arc::new(RequestBuilder::new("10.10.10.5").build()))
        .unwrap_err();
    assert_eq!(err.reject_type(), RejectType::Blacklisted);
    assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);

    // lifting the ban does not need a restart
    fs::write(&path, "ip.blacklist=10.10.10.*\nip.whitelist=10.10.10.5\n").unwrap();
    control_flow
        .admit(Arc::new(RequestBuilder::new("10.10.10.5").build()))
        .unwrap()
        .exit();
}
