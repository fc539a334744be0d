//! Benchmarks comparing callback composition against task composition across
//! the four operation levels.

use celer::runtime::EventLoop;
use celer::{callback, task};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::cell::Cell;
use std::rc::Rc;

const LEVELS: [(&str, u64); 4] = [
    ("read_some", 1),
    ("read", 10),
    ("request", 100),
    ("session", 1000),
];

fn issue_callback(socket: &callback::Socket, level: u64, done: Rc<Cell<u64>>) {
    let completion = callback::from_fn(move || done.set(done.get() + 1));
    match level {
        1 => callback::read_some(socket, completion),
        10 => callback::read(socket, completion),
        100 => callback::request(socket, completion),
        1000 => callback::session(socket, completion),
        _ => unreachable!(),
    }
}

fn issue_task(executor: &celer::Executor, level: u64, done: Rc<Cell<u64>>) {
    match level {
        1 => task::spawn(executor, async move {
            task::Socket.read_some().await;
            done.set(done.get() + 1);
        }),
        10 => task::spawn(executor, async move {
            task::read(&task::Socket).await;
            done.set(done.get() + 1);
        }),
        100 => task::spawn(executor, async move {
            task::request(&task::Socket).await;
            done.set(done.get() + 1);
        }),
        1000 => task::spawn(executor, async move {
            task::session(&task::Socket).await;
            done.set(done.get() + 1);
        }),
        _ => unreachable!(),
    }
}

fn bench_dispatch_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_overhead");

    for &(name, level) in &LEVELS {
        group.bench_with_input(BenchmarkId::new("callback", name), &level, |b, &level| {
            let event_loop = EventLoop::new();
            let socket = callback::Socket::new(event_loop.executor());
            let done = Rc::new(Cell::new(0u64));
            b.iter(|| {
                issue_callback(&socket, level, done.clone());
                event_loop.run();
                black_box(done.get());
            });
        });

        group.bench_with_input(BenchmarkId::new("task", name), &level, |b, &level| {
            let event_loop = EventLoop::new();
            let executor = event_loop.executor();
            let done = Rc::new(Cell::new(0u64));
            b.iter(|| {
                issue_task(&executor, level, done.clone());
                event_loop.run();
                black_box(done.get());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch_models);
criterion_main!(benches);
