//! Matrix multiplication and Gaussian elimination across message-passing workers.
//!
//! A fixed group of workers shares nothing but messages. Rank 0 owns the full
//! matrices; every operation splits them into row blocks, moves the blocks with
//! collectives (broadcast, scatter, gather), computes locally and gathers the
//! result back to rank 0.
//!
//! ## Usage
//!
//! ```
//! use distmat::{Collective, LocalGroup, Variant, eliminate, multiply};
//!
//! let width = 4;
//! let a: Vec<f64> = (0..16).map(|i| if i % 5 == 0 { 2.0 } else { 0.0 }).collect();
//! let b = distmat::matrix::identity(width);
//!
//! let results = LocalGroup::run(2, |comm| {
//!     let root = comm.is_root();
//!     let (a, b) = if root { (&a[..], &b[..]) } else { (&[][..], &[][..]) };
//!     let mut c = if root { vec![0.0; width * width] } else { Vec::new() };
//!
//!     multiply(comm, a, b, &mut c, width, Variant::Balanced)?;
//!     eliminate(comm, &mut c, width)?;
//!     Ok::<_, distmat::DistError>(c)
//! });
//!
//! assert_eq!(results[0].as_ref().unwrap(), &a);
//! ```
//!
//! ## What's inside
//!
//! - Row partitioning with tail-heavy or front-loaded remainder rows
//! - Four multiply variants: baseline, transpose, pretranspose, balanced
//! - Rotating-pivot elimination with agreed failure on a zero pivot
//! - A `Collective` trait and an in-process, channel-backed worker group
//! - Rayon inside each worker once a block is big enough

pub mod comm;
pub mod config;
pub mod elimination;
pub mod error;
pub mod kernel;
pub mod matrix;
pub mod multiply;
pub mod partition;

pub use comm::{Collective, LocalComm, LocalGroup};
pub use config::{ExecConfig, TransposeSite};
pub use elimination::{eliminate, eliminate_with};
pub use error::{DistError, ErrorKind};
pub use kernel::{OperandLayout, multiply_block};
pub use multiply::{Variant, multiply, multiply_with};
pub use partition::{BalancePolicy, PartitionPlan, PivotOwnership};
