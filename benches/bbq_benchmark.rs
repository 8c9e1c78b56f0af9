/// Blocking bounded queue performance benchmark
///
/// 对比 RingBuffer 与 rtrb，以及 BlockingBoundedQueue 与 std sync_channel 的性能
///
/// 重点测试：
/// 1. 环形缓冲区单线程 push/pop 吞吐
/// 2. 阻塞队列单生产者单消费者吞吐
/// 3. 阻塞队列多生产者多消费者吞吐
/// 4. 关闭并释放阻塞线程的开销
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use smallbbq::ring::RingBuffer;
use smallbbq::{BlockingBoundedQueue, TakeError};
use std::hint::black_box;
use std::num::NonZero;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Benchmark: Ring buffer single-threaded push/pop throughput
///
/// 环形缓冲区单线程 push/pop 吞吐量测试
fn benchmark_ring_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_single_thread");

    for capacity in [8, 32, 128] {
        let operations = 10000;
        group.throughput(Throughput::Elements(operations));

        group.bench_with_input(
            BenchmarkId::new("ring_buffer", capacity),
            &capacity,
            |b, &cap| {
                b.iter(|| {
                    let mut ring = RingBuffer::<u64>::new(NonZero::new(cap).unwrap());
                    for i in 0..operations {
                        let _ = ring.push(black_box(i));
                        let _ = black_box(ring.pop());
                    }
                });
            },
        );

        // rtrb for comparison
        group.bench_with_input(BenchmarkId::new("rtrb", capacity), &capacity, |b, &cap| {
            b.iter(|| {
                let (mut producer, mut consumer) = rtrb::RingBuffer::<u64>::new(cap);
                for i in 0..operations {
                    let _ = producer.push(black_box(i));
                    let _ = black_box(consumer.pop());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark: Uncontended put/take on the blocking queue
///
/// 阻塞队列无竞争 put/take
fn benchmark_queue_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_uncontended");
    let operations = 10000;
    group.throughput(Throughput::Elements(operations));

    group.bench_function("bbq", |b| {
        let queue = BlockingBoundedQueue::new(64).unwrap();
        b.iter(|| {
            for i in 0..operations {
                queue.put(black_box(i)).unwrap();
                black_box(queue.take().unwrap());
            }
        });
    });

    group.bench_function("sync_channel", |b| {
        let (tx, rx) = mpsc::sync_channel(64);
        b.iter(|| {
            for i in 0..operations {
                tx.send(black_box(i)).unwrap();
                black_box(rx.recv().unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark: One producer, one consumer, both blocking
///
/// 单生产者单消费者，双方阻塞
fn benchmark_queue_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_spsc");
    group.measurement_time(Duration::from_secs(10));

    let messages = 10000u64;
    group.throughput(Throughput::Elements(messages));

    for capacity in [1, 16, 128] {
        group.bench_with_input(BenchmarkId::new("bbq", capacity), &capacity, |b, &cap| {
            b.iter(|| {
                let queue = Arc::new(BlockingBoundedQueue::new(cap).unwrap());

                let producer = {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for i in 0..messages {
                            queue.put(black_box(i)).unwrap();
                        }
                        queue.close().unwrap();
                    })
                };

                let mut count = 0;
                while queue.take().is_ok() {
                    count += 1;
                }
                producer.join().unwrap();
                assert_eq!(count, messages);
            });
        });

        group.bench_with_input(
            BenchmarkId::new("sync_channel", capacity),
            &capacity,
            |b, &cap| {
                b.iter(|| {
                    let (tx, rx) = mpsc::sync_channel(cap);

                    let producer = thread::spawn(move || {
                        for i in 0..messages {
                            tx.send(black_box(i)).unwrap();
                        }
                    });

                    let count = rx.iter().count() as u64;
                    producer.join().unwrap();
                    assert_eq!(count, messages);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: Several producers and consumers sharing one queue
///
/// 多个生产者与消费者共享一个队列
fn benchmark_queue_mpmc(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_mpmc");
    group.measurement_time(Duration::from_secs(10));

    let per_producer = 2500u64;
    let capacity = 32;

    for threads in [2u64, 4] {
        group.throughput(Throughput::Elements(per_producer * threads));

        group.bench_with_input(BenchmarkId::new("bbq", threads), &threads, |b, &n| {
            b.iter(|| {
                let queue = Arc::new(BlockingBoundedQueue::new(capacity).unwrap());

                let consumers: Vec<_> = (0..n)
                    .map(|_| {
                        let queue = Arc::clone(&queue);
                        thread::spawn(move || {
                            let mut count = 0u64;
                            loop {
                                match queue.take() {
                                    Ok(v) => {
                                        black_box(v);
                                        count += 1;
                                    }
                                    Err(TakeError::Closed) => return count,
                                    Err(err) => panic!("{err}"),
                                }
                            }
                        })
                    })
                    .collect();

                let producers: Vec<_> = (0..n)
                    .map(|_| {
                        let queue = Arc::clone(&queue);
                        thread::spawn(move || {
                            for i in 0..per_producer {
                                queue.put(i).unwrap();
                            }
                        })
                    })
                    .collect();

                for producer in producers {
                    producer.join().unwrap();
                }
                queue.close().unwrap();

                let total: u64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
                assert_eq!(total, per_producer * n);
            });
        });
    }

    group.finish();
}

/// Benchmark: Closing a queue with parked consumers
///
/// 关闭存在阻塞消费者的队列
fn benchmark_close_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_close");

    for parked in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("release_consumers", parked),
            &parked,
            |b, &n| {
                b.iter_batched(
                    || {
                        let queue = Arc::new(BlockingBoundedQueue::<u64>::new(4).unwrap());
                        let consumers: Vec<_> = (0..n)
                            .map(|_| {
                                let queue = Arc::clone(&queue);
                                thread::spawn(move || queue.take())
                            })
                            .collect();
                        while queue.deq_waiters() < n {
                            thread::yield_now();
                        }
                        (queue, consumers)
                    },
                    |(queue, consumers)| {
                        queue.close().unwrap();
                        for consumer in consumers {
                            black_box(consumer.join().unwrap().unwrap_err());
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_ring_single_thread,
    benchmark_queue_uncontended,
    benchmark_queue_spsc,
    benchmark_queue_mpmc,
    benchmark_close_release,
);

criterion_main!(benches);
