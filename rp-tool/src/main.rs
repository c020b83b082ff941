use anyhow::{ensure, format_err, Context, Result};
use log::{info, warn};
use noisy_float::prelude::*;
use prettytable::{cell, row, Table};
use rp_dataset::{affinity, DatasetPaths, ReaderInit, RpReader, SampleField};
use std::{
    env,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Inspect and benchmark the robot-push sample reader
enum Args {
    /// Print index statistics
    Info {
        #[structopt(flatten)]
        reader: ReaderArgs,
    },
    /// Render samples with worker threads and report the throughput
    Bench {
        #[structopt(flatten)]
        reader: ReaderArgs,
        #[structopt(long, default_value = "4")]
        workers: usize,
        #[structopt(long, default_value = "8")]
        batch_size: usize,
        #[structopt(long, default_value = "256")]
        /// number of rendered samples
        samples: usize,
        #[structopt(long)]
        /// base seed of the worker random sources
        seed: Option<u64>,
    },
    /// Render one sample and print its shapes
    Inspect {
        #[structopt(flatten)]
        reader: ReaderArgs,
        #[structopt(long)]
        index: usize,
        #[structopt(long, default_value = "0")]
        seed: u64,
    },
}

#[derive(Debug, Clone, StructOpt)]
struct ReaderArgs {
    #[structopt(long = "config", default_value = "dataset_path.json")]
    /// dataset location file
    config_file: PathBuf,
    #[structopt(long, default_value = "10")]
    max_interval: usize,
    #[structopt(long, default_value = "2")]
    min_ntraj: usize,
    #[structopt(long, default_value = "6")]
    max_ntraj: usize,
    #[structopt(long)]
    /// read the test split
    test: bool,
    #[structopt(long)]
    /// sample evaluation windows from the test split
    eval: bool,
    #[structopt(long)]
    /// border-mask intensity threshold in [0, 1], 10/255 by default
    mask_threshold: Option<f64>,
}

impl ReaderArgs {
    fn build(&self) -> Result<RpReader> {
        let paths = DatasetPaths::open(&self.config_file).with_context(|| {
            format!(
                "failed to load dataset file '{}'",
                self.config_file.display()
            )
        })?;
        self.reader_init()?.build(&paths)
    }

    fn reader_init(&self) -> Result<ReaderInit> {
        let defaults = ReaderInit::default();
        let mask_threshold = match self.mask_threshold {
            Some(threshold) => R64::try_new(threshold)
                .ok_or_else(|| format_err!("invalid mask threshold {}", threshold))?,
            None => defaults.mask_threshold,
        };

        Ok(ReaderInit {
            is_test: self.test,
            max_interval: self.max_interval,
            min_ntraj: self.min_ntraj,
            max_ntraj: self.max_ntraj,
            is_eval: self.eval,
            mask_threshold,
        })
    }
}

fn main() -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    match Args::from_args() {
        Args::Info { reader } => info(&reader.build()?),
        Args::Bench {
            reader,
            workers,
            batch_size,
            samples,
            seed,
        } => bench(reader.build()?, workers, batch_size, samples, seed),
        Args::Inspect {
            reader,
            index,
            seed,
        } => inspect(&reader.build()?, index, seed),
    }
}

fn info(reader: &RpReader) -> Result<()> {
    let index = reader.index();

    {
        let mut table = Table::new();
        table.add_row(row!["mode", format!("{:?}", reader.mode())]);
        table.add_row(row!["collator", format!("{:?}", reader.collator())]);
        table.add_row(row!["clips", index.clips().len()]);
        table.add_row(row!["samples", index.len()]);
        table.add_row(row!["excluded short clips", index.excluded_clips()]);
        table.add_row(row!["max interval", index.max_interval()]);
        table.add_row(row!["max trajectory length", index.max_traj_len()]);
        table.printstd();
    }

    {
        let mut table = Table::new();
        table.add_row(row!["interval", "entries"]);
        (1..=index.max_interval()).for_each(|interval| {
            table.add_row(row![interval, index.interval_entries(interval).len()]);
        });
        table.printstd();
    }

    Ok(())
}

fn bench(
    reader: RpReader,
    workers: usize,
    batch_size: usize,
    samples: usize,
    seed: Option<u64>,
) -> Result<()> {
    ensure!(workers > 0, "workers must be positive");
    ensure!(batch_size > 0, "batch_size must be positive");
    ensure!(!reader.is_empty(), "the reader has no samples");

    affinity::reset_cpu_affinity()?;

    let (tx, rx) = flume::bounded(workers * 2);
    let collator = reader.collator();
    let reader_len = reader.len();

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            let reader = reader.clone();
            let tx = tx.clone();

            thread::spawn(move || -> Result<()> {
                let mut active = match seed {
                    Some(seed) => reader.activate_seeded(worker_id, worker_seed(seed, worker_id))?,
                    None => reader.activate(worker_id)?,
                };
                let indices: Vec<_> = (worker_id..samples)
                    .step_by(workers)
                    .map(|position| position % reader_len)
                    .collect();

                for chunk in indices.chunks(batch_size) {
                    let since = Instant::now();
                    let rendered: Vec<_> = chunk
                        .iter()
                        .map(|&index| active.get(index))
                        .collect::<Result<_>>()?;
                    let batch = collator.collate(rendered)?;
                    let result = tx.send((worker_id, chunk.len(), batch, since.elapsed()));
                    if result.is_err() {
                        break;
                    }
                }

                Ok(())
            })
        })
        .collect();
    drop(tx);

    let since = Instant::now();
    let mut num_batches = 0usize;
    let mut num_samples = 0;
    let mut busy = Duration::ZERO;

    for (worker_id, count, batch, elapsed) in rx.iter() {
        num_batches += 1;
        num_samples += count;
        busy += elapsed;
        info!(
            "worker {} produced a batch of shape {:?} in {:.3}s",
            worker_id,
            batch.field(SampleField::WarpInput).shape(),
            elapsed.as_secs_f64()
        );
    }

    for (worker_id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(result) => {
                result.with_context(|| format!("worker {} failed", worker_id))?;
            }
            Err(_) => warn!("worker {} panicked", worker_id),
        }
    }

    let total = since.elapsed().as_secs_f64();
    let mut table = Table::new();
    table.add_row(row!["workers", workers]);
    table.add_row(row!["batches", num_batches]);
    table.add_row(row!["samples", num_samples]);
    table.add_row(row!["elapsed (s)", format!("{:.3}", total)]);
    table.add_row(row![
        "samples/s",
        format!("{:.2}", num_samples as f64 / total)
    ]);
    table.add_row(row![
        "mean batch time (s)",
        format!("{:.3}", busy.as_secs_f64() / num_batches.max(1) as f64)
    ]);
    table.printstd();

    Ok(())
}

/// The seed of a worker's random source, offset from the base seed by the worker id.
fn worker_seed(seed: u64, worker_id: usize) -> u64 {
    seed.wrapping_add(worker_id as u64)
}

fn inspect(reader: &RpReader, index: usize, seed: u64) -> Result<()> {
    let mut active = reader.activate_seeded(0, seed)?;
    let sample = active.get(index)?;

    let mut table = Table::new();
    table.add_row(row!["field", "shape"]);
    SampleField::ALL.iter().for_each(|&field| {
        table.add_row(row![field, format!("{:?}", sample.field(field).shape())]);
    });
    table.printstd();

    println!("mask area: {}", sample.mask.sum());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_threshold_defaults_to_the_library_default() {
        let args = ReaderArgs::from_iter(&["rp-tool"]);
        let init = args.reader_init().unwrap();
        assert_eq!(init.mask_threshold.raw(), rp_dataset::DEFAULT_MASK_THRESHOLD);
        assert_eq!(init, ReaderInit::default());

        let args = ReaderArgs::from_iter(&["rp-tool", "--mask-threshold", "0.25"]);
        assert_eq!(args.reader_init().unwrap().mask_threshold, r64(0.25));

        let args = ReaderArgs::from_iter(&["rp-tool", "--mask-threshold", "NaN"]);
        assert!(args.reader_init().is_err());
    }

    #[test]
    fn worker_seeds_wrap_around() {
        assert_eq!(worker_seed(7, 3), 10);
        assert_eq!(worker_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(worker_seed(u64::MAX, 2), 1);
    }
}
