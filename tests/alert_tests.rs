use fallwatch::scenario::Scenario;
use fallwatch::{AlertDispatcher, EngineConfig, FallDetectionEngine, SharedEngine, Stage};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_dispatcher_delivers_engine_output_on_worker() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = {
        let received = received.clone();
        AlertDispatcher::spawn(move |event| {
            received
                .lock()
                .unwrap()
                .push((event.at_ms, thread::current().id()))
        })
    };
    let mut alerts = dispatcher.sender().unwrap();

    let mut engine = FallDetectionEngine::new(1, EngineConfig::default()).unwrap();
    for s in Scenario::Fall.samples(20) {
        engine.process(&s, &mut alerts);
    }
    dispatcher.shutdown();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_ne!(received[0].1, thread::current().id());
}

#[test]
fn test_shared_engine_feeds_dispatcher() {
    let received = Arc::new(Mutex::new(0usize));
    let dispatcher = {
        let received = received.clone();
        AlertDispatcher::spawn(move |_| *received.lock().unwrap() += 1)
    };
    let alerts = dispatcher.sender().unwrap();

    let shared = SharedEngine::new(FallDetectionEngine::new(2, EngineConfig::default()).unwrap());
    let producer = {
        let shared = shared.clone();
        thread::spawn(move || {
            for s in Scenario::Fall.samples(20) {
                if let Some(event) = shared.push(&s) {
                    alerts.send(event);
                }
            }
        })
    };
    producer.join().unwrap();
    dispatcher.shutdown();

    assert_eq!(*received.lock().unwrap(), 1);
    assert_eq!(shared.with(|e| e.stats().confirmed), 1);
}
