//! # Sistema de Workers
//! src/workers/mod.rs
//!
//! Pool de threads de tamaño fijo con cola FIFO. El servidor lo usa para
//! atender cada conexión fuera del loop de `accept`, pero el pool no sabe
//! nada de HTTP: acepta cualquier closure `FnOnce() + Send + 'static`.

pub mod pool;

pub use pool::{PoolError, PoolStats, Task, TaskId, WorkerPool};
