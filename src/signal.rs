//! # Señales del Sistema
//! src/signal.rs
//!
//! Espera SIGINT (Ctrl+C) o SIGTERM. Usa un runtime de tokio de un solo
//! thread solo para esto; el servidor en sí es bloqueante.
//!
//! La primera señal pide el apagado ordenado. La segunda se devuelve al
//! llamador, que decide salir sin esperar a las conexiones en curso.

use std::io;

/// Bloquea el thread actual esperando dos señales
///
/// Llama `on_first` con el nombre de la primera señal y retorna el nombre
/// de la segunda. Los handlers quedan instalados entre ambas, así ninguna
/// señal se pierde.
pub fn watch<F>(on_first: F) -> io::Result<&'static str>
where
    F: FnOnce(&'static str),
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut signals = Signals::new()?;
        let first = signals.recv().await?;
        on_first(first);
        signals.recv().await
    })
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::select! {
            _ = self.interrupt.recv() => Ok("SIGINT"),
            _ = self.terminate.recv() => Ok("SIGTERM"),
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn new() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}
