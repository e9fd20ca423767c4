use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msqueue::{ConcurrentQueue, MsQueue, MutexQueue};
use std::thread;

const ITEMS: usize = 10_000;

fn single_thread<Q: ConcurrentQueue<usize>>(queue: &Q) {
    for i in 0..ITEMS {
        queue.enqueue(i);
    }
    for _ in 0..ITEMS {
        black_box(queue.dequeue());
    }
}

fn producers_consumers<Q: ConcurrentQueue<usize>>(queue: &Q, pairs: usize) {
    let per_producer = ITEMS / pairs;
    thread::scope(|s| {
        for _ in 0..pairs {
            s.spawn(move || {
                for i in 0..per_producer {
                    queue.enqueue(i);
                }
            });
            s.spawn(move || {
                let mut count = 0;
                while count < per_producer {
                    if let Some(i) = queue.dequeue() {
                        black_box(i);
                        count += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });
        }
    });
}

fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");
    group.throughput(Throughput::Elements(ITEMS as u64));

    group.bench_function("ms_queue", |b| {
        let queue = MsQueue::new();
        b.iter(|| single_thread(&queue));
    });

    group.bench_function("mutex_vec_deque", |b| {
        let queue = MutexQueue::new();
        b.iter(|| single_thread(&queue));
    });

    group.finish();
}

fn bench_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpmc");
    group.throughput(Throughput::Elements(ITEMS as u64));

    for pairs in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::new("ms_queue", pairs), &pairs, |b, &pairs| {
            b.iter(|| {
                let queue = MsQueue::new();
                producers_consumers(&queue, pairs);
            });
        });

        group.bench_with_input(
            BenchmarkId::new("mutex_vec_deque", pairs),
            &pairs,
            |b, &pairs| {
                b.iter(|| {
                    let queue = MutexQueue::new();
                    producers_consumers(&queue, pairs);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_mpmc);
criterion_main!(benches);
