//! # Sight Utils
//!
//! Small building blocks shared by the tracking crates: the packed cell
//! coordinate codec and a bounded object pool.

pub mod pool;
pub mod types;

pub use pool::{ObjectPool, PoolStats};
pub use types::CellPos;
