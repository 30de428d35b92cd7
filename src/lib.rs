//! # Pool Server
//! src/lib.rs
//!
//! Servidor HTTP bloqueante que responde una página HTML estática. Cada
//! conexión aceptada se atiende en un pool de workers de tamaño fijo.
//!
//! ## Arquitectura
//!
//! - `workers`: Pool de threads con cola FIFO y apagado con drenado
//! - `server`: Loop de `accept` y manejo de cada conexión
//! - `http`: Parsing mínimo de requests y construcción de responses
//! - `config`: Argumentos CLI y variables de entorno
//! - `signal`: Espera de SIGINT/SIGTERM
//! - `telemetry`: Logging con `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use pool_server::config::Config;
//! use pool_server::server::Server;
//!
//! let server = Server::bind(Config::default()).unwrap();
//! server.run().unwrap();
//! server.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod signal;
pub mod telemetry;
pub mod workers;

pub use error::{Error, Result};
