//! Priority queue and work queue behavior.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use taskbot::error::Error;
use taskbot::model::{Priority, Task};
use taskbot::queue::{PriorityQueue, WorkQueue};

fn task(name: &str, priority: Priority) -> Task {
    Task::new(name, || {}).priority(priority)
}

// ---------------------------------------------------------------------------
// PriorityQueue
// ---------------------------------------------------------------------------

#[test]
fn pops_in_descending_priority() {
    let mut queue = PriorityQueue::new();
    queue.push(task("low", Priority::Low));
    queue.push(task("high-1", Priority::High));
    queue.push(task("normal", Priority::Normal));
    queue.push(task("high-2", Priority::High));

    let first_two: HashSet<String> = [queue.pop().unwrap(), queue.pop().unwrap()]
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(
        first_two,
        HashSet::from(["high-1".to_string(), "high-2".to_string()])
    );
    assert_eq!(queue.pop().unwrap().name, "normal");
    assert_eq!(queue.pop().unwrap().name, "low");
    assert!(queue.is_empty());
}

#[test]
fn equal_priorities_come_out_in_insertion_order() {
    let mut queue = PriorityQueue::new();
    for i in 0..5 {
        queue.push(task(&format!("n{i}"), Priority::Normal));
    }
    queue.push(task("urgent", Priority::High));

    let order: Vec<String> = (0..6).map(|_| queue.pop().unwrap().name).collect();
    assert_eq!(order, ["urgent", "n0", "n1", "n2", "n3", "n4"]);
}

#[test]
fn interleaved_push_pop_always_returns_current_max() {
    let mut queue = PriorityQueue::new();
    queue.push(task("normal", Priority::Normal));
    queue.push(task("low", Priority::Low));
    assert_eq!(queue.pop().unwrap().name, "normal");

    queue.push(task("high", Priority::High));
    queue.push(task("normal-2", Priority::Normal));
    assert_eq!(queue.pop().unwrap().name, "high");
    assert_eq!(queue.pop().unwrap().name, "normal-2");
    assert_eq!(queue.len(), 1);
}

#[test]
fn pop_on_empty_queue_underflows() {
    let mut queue = PriorityQueue::new();
    assert!(matches!(queue.pop(), Err(Error::QueueUnderflow)));

    queue.push(task("only", Priority::Low));
    queue.pop().unwrap();
    assert!(matches!(queue.pop(), Err(Error::QueueUnderflow)));
}

// ---------------------------------------------------------------------------
// WorkQueue
// ---------------------------------------------------------------------------

#[test]
fn work_queue_tracks_length() {
    let queue = WorkQueue::new();
    assert!(queue.is_empty());

    queue.push(task("a", Priority::Normal));
    queue.push(task("b", Priority::Normal));
    assert_eq!(queue.len(), 2);
    assert!(!queue.is_empty());

    queue.pop().unwrap();
    assert_eq!(queue.len(), 1);
}

#[test]
fn work_queue_pop_on_empty_underflows() {
    let queue = WorkQueue::new();
    assert!(matches!(queue.pop(), Err(Error::QueueUnderflow)));
}

#[test]
fn drain_empties_queue_highest_priority_first() {
    let queue = WorkQueue::new();
    queue.push(task("low", Priority::Low));
    queue.push(task("high", Priority::High));
    queue.push(task("normal", Priority::Normal));

    let names: Vec<String> = queue.drain().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["high", "normal", "low"]);
    assert!(queue.is_empty());
    assert!(queue.drain().is_empty());
}

#[test]
fn concurrent_producers_lose_and_duplicate_nothing() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 250;

    let queue = Arc::new(WorkQueue::new());
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let priority = match i % 3 {
                        0 => Priority::Low,
                        1 => Priority::Normal,
                        _ => Priority::High,
                    };
                    queue.push(task(&format!("{p}-{i}"), priority));
                }
            })
        })
        .collect();

    // Single consumer popping while producers run, only after a non-empty check.
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut seen = HashSet::new();
            while seen.len() < PRODUCERS * PER_PRODUCER {
                if queue.is_empty() {
                    thread::yield_now();
                    continue;
                }
                let task = queue.pop().unwrap();
                assert!(seen.insert(task.name), "task popped twice");
            }
            seen
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    let seen = consumer.join().unwrap();

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert!(queue.is_empty());
}

#[test]
fn push_unless_refuses_once_closed() {
    let queue = WorkQueue::new();
    let closed = AtomicBool::new(false);

    queue.push_unless(task("before", Priority::Normal), &closed).unwrap();
    closed.store(true, Ordering::Release);
    let result = queue.push_unless(task("after", Priority::High), &closed);

    assert!(matches!(result, Err(Error::ShuttingDown)));
    let names: Vec<String> = queue.drain().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["before"]);
}

#[test]
fn close_then_drain_leaves_no_stragglers() {
    const PRODUCERS: usize = 4;

    let queue = Arc::new(WorkQueue::new());
    let closed = Arc::new(AtomicBool::new(false));
    let accepted = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let closed = Arc::clone(&closed);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                for i in 0.. {
                    if queue
                        .push_unless(task(&format!("{p}-{i}"), Priority::Normal), &closed)
                        .is_err()
                    {
                        break;
                    }
                    accepted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    closed.store(true, Ordering::Release);
    let drained = queue.drain().len();

    for producer in producers {
        producer.join().unwrap();
    }
    assert!(queue.is_empty(), "{} task(s) pushed after the drain", queue.len());
    assert_eq!(drained, accepted.load(Ordering::SeqCst));
}
