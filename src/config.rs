//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./pool_server --port 8080 --workers 8 --max-request-bytes 32768
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=127.0.0.1 WORKERS=2 ./pool_server
//! ```

use crate::error::{Error, Result};
use clap::Parser;
use std::time::Duration;

/// Configuración del servidor HTTP
#[derive(Debug, Clone, Parser)]
#[command(name = "pool_server")]
#[command(about = "Servidor HTTP bloqueante con pool de workers de tamaño fijo")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === Workers ===

    /// Número de workers del pool que atiende conexiones
    #[arg(short, long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    // === Lectura de requests ===

    /// Tamaño máximo de los headers; se deja de leer al superarlo
    #[arg(long = "max-request-bytes", default_value = "16384", env = "MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    /// Bytes leídos por cada llamada a `read`
    #[arg(long = "read-chunk", default_value = "1024", env = "READ_CHUNK")]
    pub read_chunk: usize,

    /// Timeout de cada `read` en milisegundos (0 = esperar sin límite)
    #[arg(long = "read-timeout-ms", default_value = "10000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    // === Página ===

    /// Título de la página HTML
    #[arg(long, default_value = "Simple Server", env = "PAGE_TITLE")]
    pub title: String,

    /// Mensaje del cuerpo de la página HTML
    #[arg(long, default_value = "Hello from SimpleServer!", env = "PAGE_MESSAGE")]
    pub message: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use pool_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout de lectura por conexión; `None` si está desactivado
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("workers must be >= 1"));
        }

        if self.read_chunk == 0 {
            return Err(Error::config("read chunk must be >= 1"));
        }

        if self.max_request_bytes < self.read_chunk {
            return Err(Error::config("max request bytes must be >= read chunk"));
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════╗");
        println!("║        Pool Server Configuration             ║");
        println!("╚══════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!();
        println!("👷 Worker Pool:");
        println!("   Workers:      {}", self.workers);
        println!();
        println!("📥 Requests:");
        println!("   Read chunk:   {} bytes", self.read_chunk);
        println!("   Max headers:  {} bytes", self.max_request_bytes);
        match self.read_timeout() {
            Some(timeout) => println!("   Read timeout: {:?}", timeout),
            None => println!("   Read timeout: disabled"),
        }
        println!();
        println!("📄 Page:");
        println!("   Title:        {}", self.title);
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            workers: 4,
            max_request_bytes: 16 * 1024,
            read_chunk: 1024,
            read_timeout_ms: 10_000,
            title: "Simple Server".to_string(),
            message: "Hello from SimpleServer!".to_string(),
        }
    }
}
