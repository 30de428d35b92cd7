//! # Errores del Servidor
//! src/error.rs

use crate::workers::PoolError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuración inválida (CLI o variables de entorno)
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
