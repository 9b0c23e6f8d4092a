use controlflow::base::RequestBuilder;
use controlflow::utils::sleep_for_ms;
use controlflow::ControlFlow;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

#[test]
fn header_priority_orders_waiters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("controlflow.properties");
    fs::write(&path, "timeout=0\nows.global=1\nows.priority.http=gs-priority,0\n").unwrap();
    let control_flow = Arc::new(ControlFlow::new(&path).unwrap());

    let held = control_flow
        .admit(Arc::new(RequestBuilder::new("10.0.0.1").build()))
        .unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut handlers = Vec::new();
    for (name, priority) in &[("w1", "5"), ("w2", "10"), ("w3", "10")] {
        let flow = Arc::clone(&control_flow);
        let order = Arc::clone(&order);
        let (name, priority) = (name.to_string(), priority.to_string());
        handlers.push(std::thread::spawn(move || {
            let request = RequestBuilder::new("10.0.0.1")
                .with_header("gs-priority", &priority)
                .build();
            let admission = flow.admit(Arc::new(request)).unwrap();
            order.lock().push(name);
            sleep_for_ms(5);
            admission.exit();
        }));
        // arrival order is part of the contract
        while control_flow.chain().blocked_requests() < handlers.len() {
            sleep_for_ms(1);
        }
        sleep_for_ms(20);
    }
    held.exit();
    for h in handlers {
        h.join().expect("Couldn't join on the associated thread");
    }
    assert_eq!(*order.lock(), vec!["w2", "w3", "w1"]);
}
