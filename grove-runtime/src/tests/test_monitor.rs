use super::*;
use crate::object::Monitor;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn test_synchronized_blocks() {
    let source = "class Account {\n  int balance = 0\n  def deposit(n) {\n    synchronized (this) {\n      balance += n\n    }\n  }\n}\ndef a = new Account()\nsynchronized (a) {\n  a.deposit(5)\n}\nprintln(a.balance)";
    assert_eq!(run(source), "5\n");
}

#[test]
fn test_monitor_is_reentrant() {
    let monitor = Monitor::default();
    monitor.enter();
    monitor.enter();
    monitor.exit().unwrap();
    assert!(monitor.is_held());
    monitor.exit().unwrap();
    assert!(!monitor.is_held());
}

#[test]
fn test_exit_without_enter() {
    let monitor = Monitor::default();
    assert!(matches!(monitor.exit(), Err(RuntimeError::IllegalState { .. })));
}

#[test]
fn test_monitor_excludes_other_threads() {
    let monitor = Arc::new(Monitor::default());
    let counter = Arc::new(std::sync::Mutex::new(Vec::new()));
    let workers: Vec<_> = (0..4)
        .map(|id| {
            let monitor = Arc::clone(&monitor);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                monitor.enter();
                counter.lock().unwrap().push(id);
                counter.lock().unwrap().push(id);
                monitor.exit().unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    let order = counter.lock().unwrap().clone();
    assert_eq!(order.len(), 8);
    for pair in order.chunks(2) {
        assert_eq!(pair[0], pair[1]);
    }
}

#[test]
fn test_synchronized_on_null() {
    let error = run_error("def lock = null\nsynchronized (lock) {\n  println('never')\n}");
    assert_eq!(thrown_class(&error), grove_compiler::classpath::NULL_POINTER);
}
