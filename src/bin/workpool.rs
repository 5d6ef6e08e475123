//! workpool CLI: runs the worker pool, counter and limiter demonstrations.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use workpool::config::PoolConfig;
use workpool::pool::{WorkerPool, as_completed};
use workpool::sync::{Guard, Limiter, counter};
use workpool::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "workpool", about = "Introductory multithreading demonstrations")]
struct Cli {
    /// TOML file with a [pool] table
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Defaults to `queue` when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Producer/consumer pool: submit a batch, wait for every acknowledgment
    Queue(QueueArgs),
    /// Tasks that return values: ordered map, then completion-order collection
    Map {
        /// Tasks numbered from 1; each returns its square
        #[arg(long, default_value_t = 5)]
        tasks: u64,
        #[arg(long, default_value_t = 3)]
        workers: usize,
        /// Simulated work per task
        #[arg(long, default_value_t = 200)]
        delay_ms: u64,
    },
    /// Concurrent increments of one shared counter
    Counter {
        /// Number of threads, each incrementing once
        #[arg(long, default_value_t = 2)]
        workers: usize,
        /// Time each thread holds its local copy before writing back
        #[arg(long, default_value_t = 100)]
        hold_ms: u64,
        /// Skip the lock and let increments race
        #[arg(long)]
        unguarded: bool,
    },
    /// Many users sharing a small number of permits
    Limit {
        #[arg(long, default_value_t = 10)]
        users: usize,
        #[arg(long, default_value_t = 3)]
        permits: usize,
        /// Time each user holds its permit
        #[arg(long, default_value_t = 500)]
        hold_ms: u64,
    },
}

#[derive(Args)]
struct QueueArgs {
    /// Worker threads (overrides config)
    #[arg(long)]
    workers: Option<usize>,
    /// Items in the batch, numbered from 1
    #[arg(long, default_value_t = 20)]
    items: u32,
    /// Give up waiting after this many milliseconds (overrides config)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Default for QueueArgs {
    fn default() -> Self {
        Self {
            workers: None,
            items: 20,
            timeout_ms: None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => PoolConfig::from_file(path)?.merge_env()?,
        None => PoolConfig::from_env()?,
    };

    init_telemetry(TelemetryConfig {
        log_level: config.log_level.clone(),
        compact: true,
    })?;

    match cli.command.unwrap_or(Command::Queue(QueueArgs::default())) {
        Command::Queue(args) => cmd_queue(config, args),
        Command::Map {
            tasks,
            workers,
            delay_ms,
        } => cmd_map(config, tasks, workers, delay_ms),
        Command::Counter {
            workers,
            hold_ms,
            unguarded,
        } => cmd_counter(workers, hold_ms, unguarded),
        Command::Limit {
            users,
            permits,
            hold_ms,
        } => cmd_limit(users, permits, hold_ms),
    }
}

fn cmd_queue(mut config: PoolConfig, args: QueueArgs) -> anyhow::Result<()> {
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(ms) = args.timeout_ms {
        config.wait_timeout = Some(Duration::from_millis(ms));
    }

    let mut pool = WorkerPool::new(config, |item: &u32| -> Result<(), String> {
        let current = thread::current();
        println!("in {} got {item}", current.name().unwrap_or("unnamed"));
        Ok(())
    })?;
    pool.start()?;

    for item in 1..=args.items {
        pool.submit(item)?;
    }

    let report = pool.wait_for_completion()?;
    println!("main end");

    pool.shutdown()?;
    if report.failed > 0 {
        for failure in &report.failures {
            eprintln!("{} failed on {}: {}", failure.id, failure.worker, failure.error);
        }
        anyhow::bail!("{} item(s) failed", report.failed);
    }
    Ok(())
}

fn cmd_map(
    mut config: PoolConfig,
    tasks: u64,
    workers: usize,
    delay_ms: u64,
) -> anyhow::Result<()> {
    config.worker_count = workers;
    let delay = Duration::from_millis(delay_ms);

    let mut pool = WorkerPool::new(config, move |task: &u64| -> Result<u64, String> {
        println!("Task {task} starting...");
        // later tasks finish first so completion order differs from input order
        thread::sleep(delay / (*task as u32).max(1));
        let result = task * task;
        println!("Task {task} completed with result: {result}");
        Ok(result)
    })?;
    pool.start()?;

    let results = pool
        .map(1..=tasks)?
        .into_iter()
        .map(|c| c.into_result().map_err(anyhow::Error::msg))
        .collect::<anyhow::Result<Vec<_>>>()?;
    println!("All results: {results:?}");

    let pending = (1..=tasks)
        .map(|task| pool.submit_with_result(task))
        .collect::<Result<Vec<_>, _>>()?;
    for completion in as_completed(pending) {
        let completion = completion?;
        match completion.result {
            Ok(value) => println!("Got result from {}: {value}", completion.worker),
            Err(e) => println!("{} failed on {}: {e}", completion.id, completion.worker),
        }
    }

    let report = pool.shutdown()?;
    if let Some(rate) = report.throughput() {
        println!("Throughput: {rate:.2} tasks/second");
    }
    Ok(())
}

fn cmd_counter(workers: usize, hold_ms: u64, unguarded: bool) -> anyhow::Result<()> {
    let guard = if unguarded {
        Guard::Unguarded
    } else {
        Guard::Locked
    };

    println!("Start score 0 ({workers} threads, {guard:?})");
    let end = counter::race(workers, guard, Duration::from_millis(hold_ms))?;
    println!("End score {end}");
    if end != workers as i64 {
        println!("lost {} increment(s) to the race", workers as i64 - end);
    }
    Ok(())
}

fn cmd_limit(users: usize, permits: usize, hold_ms: u64) -> anyhow::Result<()> {
    let limiter = Arc::new(Limiter::new(permits)?);
    let hold = Duration::from_millis(hold_ms);
    let start = Instant::now();

    println!("Maximum allowed connections: {permits}");
    let mut handles = Vec::with_capacity(users);
    for user in 1..=users {
        let limiter = Arc::clone(&limiter);
        let handle = thread::Builder::new()
            .name(format!("user-{user}"))
            .spawn(move || {
                println!("User {user} is waiting for a connection...");
                let _permit = limiter.acquire();
                println!(
                    "User {user} acquired connection (active: {})",
                    limiter.in_use()
                );
                thread::sleep(hold);
                println!("User {user} finished and released connection.");
            })?;
        handles.push(handle);
    }

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("a user thread panicked"))?;
    }

    println!(
        "All {users} users processed in {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
