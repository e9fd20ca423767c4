#![cfg(not(loom))]

use std::cell::Cell;
use std::rc::Rc;

use msqueue::{ConcurrentQueue, Domain, MsQueue, MutexQueue};

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn queue_is_send_and_sync_for_send_elements() {
    assert_send::<MsQueue<u64>>();
    assert_sync::<MsQueue<u64>>();
    // `Cell` is `Send` but not `Sync`; elements only ever move between threads.
    assert_send::<MsQueue<Cell<u64>>>();
    assert_sync::<MsQueue<Cell<u64>>>();
    assert_send::<MutexQueue<String>>();
    assert_sync::<MutexQueue<String>>();
}

#[test]
fn domain_is_send_and_sync() {
    assert_send::<Domain>();
    assert_sync::<Domain>();
}

#[test]
fn queues_usable_as_trait_objects() {
    let queues: Vec<Box<dyn ConcurrentQueue<u8>>> =
        vec![Box::new(MsQueue::new()), Box::new(MutexQueue::new())];
    for mut queue in queues {
        queue.enqueue(7);
        assert_eq!(queue.dequeue(), Some(7));
        assert_eq!(queue.dequeue(), None);
        queue.validate().unwrap();
    }
}

#[test]
fn non_send_elements_still_work_locally() {
    // `Rc` makes the queue `!Send`, but single-threaded use is fine.
    let queue = MsQueue::new();
    let shared = Rc::new(5);
    queue.enqueue(Rc::clone(&shared));
    assert_eq!(Rc::strong_count(&shared), 2);
    drop(queue.dequeue());
    assert_eq!(Rc::strong_count(&shared), 1);
}
