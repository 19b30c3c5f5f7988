//! Driver: multiply two matrices, then eliminate the product, on a group of
//! in-process workers.
//!
//! Input is the matrix text format: a width, then A and B as `width * width`
//! values each, optionally followed by the expected product.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use distmat::matrix::io::{MatrixReader, write_matrix};
use distmat::matrix::{max_relative_error, transpose::transpose};
use distmat::{Collective, ExecConfig, LocalGroup, TransposeSite, Variant, eliminate_with, multiply_with};

/// Largest relative error tolerated against an expected product.
const THRESHOLD: f64 = 0.01;

#[derive(Debug, Parser)]
#[command(name = "distmat", about = "Distributed matrix multiply and Gaussian elimination")]
struct Args {
    /// Number of workers in the group
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Multiply strategy: baseline, transpose, pretranspose or balanced
    #[arg(short, long, default_value_t = Variant::Balanced)]
    variant: Variant,

    /// Input file; standard input when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Read the expected product after B and check against it
    #[arg(long)]
    expected: bool,

    /// Print the reduced matrix to standard output
    #[arg(long)]
    print: bool,

    /// Broadcast B untouched and transpose on every worker
    #[arg(long)]
    transpose_on_workers: bool,
}

struct Problem {
    width: usize,
    a: Vec<f64>,
    b: Vec<f64>,
    expected: Option<Vec<f64>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let problem = match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            read_problem(BufReader::new(file), args.expected)?
        }
        None => read_problem(io::stdin().lock(), args.expected)?,
    };
    let width = problem.width;
    info!(width, workers = args.workers, variant = %args.variant, "matrices read");

    let config = ExecConfig {
        transpose_site: if args.transpose_on_workers {
            TransposeSite::Worker
        } else {
            TransposeSite::Root
        },
        ..ExecConfig::default()
    };

    // pretranspose expects B^T from its caller; paid for outside the timing
    let b = if args.variant == Variant::Pretranspose {
        let mut bt = vec![0.0; width * width];
        transpose(&problem.b, &mut bt, width, usize::MAX);
        bt
    } else {
        problem.b.clone()
    };

    let results = LocalGroup::run(args.workers, |comm| {
        let root = comm.is_root();
        let (a, b) = if root {
            (&problem.a[..], &b[..])
        } else {
            (&[][..], &[][..])
        };
        let mut c = if root { vec![0.0; width * width] } else { Vec::new() };

        let start = Instant::now();
        multiply_with(comm, a, b, &mut c, width, args.variant, &config)?;
        let multiply_secs = start.elapsed().as_secs_f64();
        debug!(rank = comm.rank(), "returned from multiply");

        let product = c.clone();
        let start = Instant::now();
        eliminate_with(comm, &mut c, width, &config)?;
        let eliminate_secs = start.elapsed().as_secs_f64();
        debug!(rank = comm.rank(), "returned from elimination");

        Ok::<_, distmat::DistError>((product, c, multiply_secs, eliminate_secs))
    });

    let mut results = results.into_iter();
    let (product, reduced, multiply_secs, eliminate_secs) = results
        .next()
        .context("empty worker group")?
        .context("distributed run failed on rank 0")?;
    for (rank, result) in results.enumerate() {
        result.with_context(|| format!("distributed run failed on rank {}", rank + 1))?;
    }

    if let Some(expected) = &problem.expected {
        let (at, err) = max_relative_error(&product, expected);
        if err > THRESHOLD {
            bail!(
                "product differs at row {}, col {}: {} vs expected {}",
                at / width,
                at % width,
                product[at],
                expected[at]
            );
        }
        info!(max_relative_error = err, "product matches expected");
    }

    if args.print {
        write_matrix(io::stdout().lock(), &reduced, width)?;
    }

    // width workers multiply_time elimination_time
    println!("{} {} {:.6} {:.6}", width, args.workers, multiply_secs, eliminate_secs);
    Ok(())
}

fn read_problem<R: BufRead>(source: R, with_expected: bool) -> Result<Problem> {
    let mut reader = MatrixReader::new(source);
    let (width, a) = reader.read_square().context("reading matrix A")?;
    let b = reader.read_matrix(width).context("reading matrix B")?;
    let expected = if with_expected {
        Some(reader.read_matrix(width).context("reading expected product")?)
    } else {
        None
    };
    if !reader.at_end()? {
        debug!("ignoring trailing input");
    }
    Ok(Problem {
        width,
        a,
        b,
        expected,
    })
}
