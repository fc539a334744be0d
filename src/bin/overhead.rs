//! Measurement driver: times both composition models across the four
//! operation levels against one event loop and reports per-iteration costs.

use anyhow::Result;
use celer::runtime::EventLoop;
use celer::{callback, instrument, task};
use clap::Parser;
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "overhead", version, about = "Dispatch-overhead measurements")]
struct Args {
    /// Iterations per (model, level) pair
    #[arg(long, default_value_t = 100_000)]
    iterations: u32,

    /// Emit the measurements as JSON instead of the table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Measurement {
    operation: &'static str,
    model: &'static str,
    ns_per_op: u64,
    allocs_per_op: u64,
    io_per_op: u64,
    work_per_op: u64,
}

const LEVELS: [(&str, u64); 4] = [
    ("read_some", 1),
    ("read", 10),
    ("request", 100),
    ("session", 1000),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();
    let args = Args::parse();

    let event_loop = EventLoop::new();
    let socket = callback::Socket::new(event_loop.executor());
    let executor = event_loop.executor();
    let done = Rc::new(Cell::new(0u64));

    let mut measurements = Vec::new();
    for (name, level) in LEVELS {
        let cb = measure(args.iterations, name, "callback", || {
            issue_callback(&socket, level, done.clone());
            event_loop.run();
        });
        let co = measure(args.iterations, name, "task", || {
            issue_task(&executor, level, done.clone());
            event_loop.run();
        });
        measurements.push((cb, co));
    }

    if args.json {
        let flat: Vec<Measurement> = measurements
            .iter()
            .flat_map(|&(cb, co)| [cb, co])
            .collect();
        println!("{}", serde_json::to_string_pretty(&flat)?);
    } else {
        for (cb, co) in measurements {
            println!();
            print_line(cb, co);
            print_line(co, cb);
        }
    }
    Ok(())
}

fn measure<F: FnMut()>(
    iterations: u32,
    operation: &'static str,
    model: &'static str,
    mut iteration: F,
) -> Measurement {
    instrument::reset();
    let start = Instant::now();
    for _ in 0..iterations {
        iteration();
    }
    let elapsed = start.elapsed();
    let counts = instrument::snapshot();

    let per = |n: u64| n / iterations as u64;
    Measurement {
        operation,
        model,
        ns_per_op: (elapsed.as_nanos() / iterations as u128) as u64,
        allocs_per_op: per(counts.allocations),
        io_per_op: per(counts.io_completions),
        work_per_op: per(counts.work_items),
    }
}

fn print_line(this: Measurement, other: Measurement) {
    print!(
        "{:<12} {:<9} {} ns/op",
        this.operation, this.model, this.ns_per_op
    );
    if this.allocs_per_op != 0 {
        print!(", {} allocs/op", this.allocs_per_op);
    }
    if this.io_per_op != other.io_per_op {
        print!(", {} io/op", this.io_per_op);
    }
    if this.work_per_op != other.work_per_op {
        print!(", {} work/op", this.work_per_op);
    }
    println!();
}

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
