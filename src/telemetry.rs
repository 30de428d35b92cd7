//! # Logging
//! src/telemetry.rs
//!
//! El nivel se controla con `RUST_LOG` (por defecto `info`).
//!
//! ```bash
//! RUST_LOG=pool_server=debug ./pool_server
//! ```

use tracing_subscriber::EnvFilter;

/// Instala el subscriber global
///
/// Si ya hay uno instalado (por ejemplo en tests) no hace nada.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_thread_names(true)
        .try_init();
}
