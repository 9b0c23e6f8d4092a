use controlflow::base::{RejectType, RequestBuilder, DEFAULT_COOKIE_NAME};
use controlflow::utils::sleep_for_ms;
use controlflow::ControlFlow;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn control_flow(properties: &str) -> (tempfile::TempDir, Arc<ControlFlow>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("controlflow.properties");
    fs::write(&path, properties).unwrap();
    let control_flow = Arc::new(ControlFlow::new(&path).unwrap());
    (dir, control_flow)
}

#[test]
fn global_capacity_never_exceeded() {
    controlflow::init_default().unwrap_or_else(|err| controlflow::logging::error!("{:?}", err));
    let (_dir, control_flow) = control_flow("timeout=0\nows.global=3\nip=2\n");
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handlers = Vec::new();
    for i in 0..12 {
        let control_flow = Arc::clone(&control_flow);
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        handlers.push(std::thread::spawn(move || {
            let addr = format!("10.0.0.{}", i % 4);
            for _ in 0..10 {
                let request = Arc::new(RequestBuilder::new(addr.clone()).build());
                // no timeout: every request gets in eventually
                let admission = control_flow.admit(request).unwrap();
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep_for_ms(rand::random::<u64>() % 3);
                running.fetch_sub(1, Ordering::SeqCst);
                admission.exit();
            }
        }));
    }
    for h in handlers {
        h.join().expect("Couldn't join on the associated thread");
    }
    assert!(peak.load(Ordering::SeqCst) <= 3);
    let chain = control_flow.chain();
    assert_eq!(chain.running_requests(), 0);
    assert_eq!(chain.blocked_requests(), 0);
    for controller in chain.controllers() {
        assert_eq!(controller.running_requests_count(), 0);
    }
}

#[test]
fn per_ip_isolation() {
    let (_dir, control_flow) = control_flow("timeout=1\nip=1\n");
    let a1 = control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.1").build()))
        .unwrap();
    let b1 = control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.2").build()))
        .unwrap();

    let waiter = {
        let control_flow = Arc::clone(&control_flow);
        std::thread::spawn(move || {
            control_flow
                .admit(Arc::new(RequestBuilder::new("10.0.0.1").build()))
                .map(|admission| admission.exit())
        })
    };
    sleep_for_ms(50);
    assert_eq!(control_flow.chain().blocked_requests(), 1);
    a1.exit();
    assert!(waiter.join().unwrap().is_ok());
    b1.exit();
}

#[test]
fn user_identity_from_cookie() {
    let (_dir, control_flow) = control_flow("timeout=1\nuser=1\n");
    let first = Arc::new(RequestBuilder::new("10.0.0.1").build());
    let admission = control_flow.admit(Arc::clone(&first)).unwrap();
    let cookie = first.take_response_cookies().pop().unwrap();
    let identity = cookie.split(';').next().unwrap().to_string();
    assert!(identity.starts_with(DEFAULT_COOKIE_NAME));

    // same user from another address waits for the first request
    let err = control_flow
        .admit(Arc::new(
            RequestBuilder::new("10.0.0.2")
                .with_header("Cookie", &identity)
                .build(),
        ))
        .unwrap_err();
    assert_eq!(err.reject_type(), RejectType::Timeout);
    assert_eq!(err.status_code(), http::StatusCode::SERVICE_UNAVAILABLE);

    // anybody else gets in
    control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.1").build()))
        .unwrap()
        .exit();
    admission.exit();
}

#[test]
fn ows_rules_apply_to_matching_requests() {
    let (_dir, control_flow) = control_flow("timeout=1\nows.wms.getmap=1\n");
    let getmap = || {
        Arc::new(
            RequestBuilder::new("10.0.0.1")
                .with_service("WMS")
                .with_operation("GetMap")
                .build(),
        )
    };
    let held = control_flow.admit(getmap()).unwrap();
    assert!(control_flow.admit(getmap()).is_err());
    let capabilities = RequestBuilder::new("10.0.0.1")
        .with_service("WMS")
        .with_operation("GetCapabilities")
        .build();
    control_flow.admit(Arc::new(capabilities)).unwrap().exit();
    held.exit();
    control_flow.admit(getmap()).unwrap().exit();
}

#[test]
fn configuration_reloaded() {
    let (dir, control_flow) = control_flow("timeout=1\nows.global=1\n");
    let held = control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.1").build()))
        .unwrap();
    assert!(control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.2").build()))
        .is_err());

    fs::write(
        dir.path().join("controlflow.properties"),
        "timeout=1\nows.global=10\n",
    )
    .unwrap();
    // the new chain has its own slots
    control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.2").build()))
        .unwrap()
        .exit();
    held.exit();
}
