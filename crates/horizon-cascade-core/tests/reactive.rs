//! Integration tests for signals and value cells.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_cascade_core::{Signal, SignalError, ValueCell};
use parking_lot::Mutex;

#[test]
fn fresh_slots_run_in_connection_order() {
    let signal = Signal::<u32>::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    for tag in ["a", "b", "c"] {
        let log = Arc::clone(&log);
        signal.connect(move |n| log.lock().push(format!("{tag}{n}")));
    }
    signal.emit(1);
    assert_eq!(*log.lock(), vec!["a1", "b1", "c1"]);
}

#[test]
fn slot_may_disconnect_itself_during_emit() {
    let signal = Arc::new(Signal::<()>::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let id = Arc::new(Mutex::new(None));

    let weak = Arc::downgrade(&signal);
    let own_id = Arc::clone(&id);
    let counter = Arc::clone(&calls);
    let connected = signal.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let (Some(signal), Some(id)) = (weak.upgrade(), own_id.lock().take()) {
            signal.disconnect(id);
        }
    });
    *id.lock() = Some(connected);

    signal.emit(());
    signal.emit(());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(signal.connection_count(), 0);
}

#[test]
fn blocked_signal_drops_emissions() {
    let signal = Signal::<i32>::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    signal.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    signal.set_blocked(true);
    signal.emit(1);
    signal.set_blocked(false);
    signal.emit(2);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_connection_is_an_error() {
    let signal = Signal::<i32>::new();
    let id = signal.connect(|_| {});
    assert_eq!(signal.try_disconnect(id), Ok(()));
    assert_eq!(signal.try_disconnect(id), Err(SignalError::InvalidConnection));
}

#[test]
fn guard_outliving_signal_is_harmless() {
    let signal = Arc::new(Signal::<i32>::new());
    let mut guard = signal.connect_scoped(|_| {});
    assert!(guard.id().is_some());
    drop(signal);
    assert!(!guard.disconnect());
}

#[test]
fn detached_guard_keeps_connection() {
    let signal = Arc::new(Signal::<i32>::new());
    let guard = signal.connect_scoped(|_| {});
    let id = guard.detach();
    assert!(id.is_some());
    assert_eq!(signal.connection_count(), 1);
}

#[test]
fn cell_clones_share_value_and_subscribers() {
    let cell = ValueCell::new(String::from("sans"));
    let alias = cell.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _guard = alias.subscribe(move |v: &String| sink.lock().push(v.clone()));

    assert_eq!(cell.replace("serif".into()), Some("sans".into()));
    assert_eq!(cell.replace("serif".into()), None);
    cell.set_silent("mono".into());

    assert_eq!(alias.get(), "mono");
    assert_eq!(*seen.lock(), vec!["serif".to_string()]);
    assert!(cell.ptr_eq(&alias));
    assert!(!cell.ptr_eq(&ValueCell::new(String::new())));
}

#[test]
fn cell_subscriber_may_read_the_cell() {
    let cell = ValueCell::new(1_u8);
    let reader = cell.clone();
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&seen);
    let _guard = cell.subscribe(move |_| {
        sink.store(usize::from(reader.get()), Ordering::SeqCst);
    });
    assert!(cell.set(7));
    assert_eq!(seen.load(Ordering::SeqCst), 7);
}
