//! Throughput of `BoundedQueue::put`/`get` against `crossbeam_channel::bounded`
//! for a single producer / single consumer pair.
//!
//! `BoundedQueue` trades the lock-free approach of a channel like
//! `crossbeam-channel` for mutex + condvar blocking (see the module docs on
//! [`pipeloom_core::queue`]), which is what the pipeline's consumer loop
//! depends on. This bench quantifies that trade-off rather than trying to
//! close the gap.

use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use pipeloom_core::BoundedQueue;

const BUFFER_SIZE: usize = 1024;
const TOTAL_MESSAGES: usize = 20_000;

fn pipeloom_put_get(c: &mut Criterion) {
    c.bench_function("pipeloom_queue/spsc_throughput", |b| {
        b.iter(|| {
            let queue = Arc::new(BoundedQueue::new(BUFFER_SIZE).unwrap());
            let producer = {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..TOTAL_MESSAGES {
                        queue.put(i.to_string()).unwrap();
                    }
                    queue.signal_finished();
                })
            };
            let mut received = 0;
            while queue.get().is_some() {
                received += 1;
            }
            producer.join().unwrap();
            assert_eq!(received, TOTAL_MESSAGES);
        });
    });
}

fn crossbeam_put_get(c: &mut Criterion) {
    c.bench_function("crossbeam_channel/spsc_throughput", |b| {
        b.iter(|| {
            let (tx, rx) = crossbeam_channel::bounded::<String>(BUFFER_SIZE);
            let producer = thread::spawn(move || {
                for i in 0..TOTAL_MESSAGES {
                    tx.send(i.to_string()).unwrap();
                }
            });
            let mut received = 0;
            while rx.recv().is_ok() {
                received += 1;
            }
            producer.join().unwrap();
            assert_eq!(received, TOTAL_MESSAGES);
        });
    });
}

fn pipeloom_multi_producer(c: &mut Criterion) {
    let producers = num_cpus::get().max(2);
    let per_producer = TOTAL_MESSAGES / producers;

    c.bench_function("pipeloom_queue/multi_producer_fan_in", |b| {
        b.iter(|| {
            let queue = Arc::new(BoundedQueue::new(BUFFER_SIZE).unwrap());
            let handles: Vec<_> = (0..producers)
                .map(|p| {
                    let queue = queue.clone();
                    thread::spawn(move || {
                        for i in 0..per_producer {
                            queue.put(format!("{p}:{i}")).unwrap();
                        }
                    })
                })
                .collect();

            let mut received = 0;
            // The capacity-1 boundary case (spec §8) is exercised directly
            // in pipeloom-core's unit tests; this bench measures realistic
            // throughput at BUFFER_SIZE instead.
            for handle in handles {
                handle.join().unwrap();
            }
            queue.signal_finished();
            while queue.get().is_some() {
                received += 1;
            }
            assert_eq!(received, producers * per_producer);
        });
    });
}

criterion_group!(
    benches,
    pipeloom_put_get,
    crossbeam_put_get,
    pipeloom_multi_producer
);
criterion_main!(benches);
