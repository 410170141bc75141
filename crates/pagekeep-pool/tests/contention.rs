// Five threads racing for three resources

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;

use pagekeep_pool::WorkerPool;

#[test]
fn three_of_five_threads_proceed_until_release() {
    let pool = Arc::new(WorkerPool::new(vec![1, 2, 3]).unwrap());
    let start = Arc::new(Barrier::new(5));
    let (acquired_tx, acquired_rx) = unbounded();
    let (release_tx, release_rx) = unbounded::<()>();

    let workers: Vec<_> = (0..5)
        .map(|_| {
            let pool = pool.clone();
            let start = start.clone();
            let acquired = acquired_tx.clone();
            let release = release_rx.clone();
            thread::spawn(move || {
                start.wait();
                let resource = pool.get();
                // repeated gets keep the same resource
                assert_eq!(pool.get(), resource);
                acquired.send(resource).unwrap();
                release.recv().unwrap();
                pool.release();
            })
        })
        .collect();

    let mut first = Vec::new();
    for _ in 0..3 {
        first.push(acquired_rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }
    first.sort_unstable();
    assert_eq!(first, vec![1, 2, 3]);

    // the other two are blocked in get()
    assert!(acquired_rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(pool.in_use(), 3);
    assert_eq!(pool.available(), 0);

    // each release lets one waiter through
    release_tx.send(()).unwrap();
    acquired_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    release_tx.send(()).unwrap();
    acquired_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    for _ in 0..3 {
        release_tx.send(()).unwrap();
    }
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(pool.available(), 3);
    assert_eq!(pool.in_use(), 0);
}
