//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Loop de `accept` que entrega cada conexión al pool de workers como una
//! tarea. El loop nunca espera a que una conexión termine.
//!
//! ## Apagado
//!
//! `ShutdownHandle::shutdown()` marca la bandera y abre una conexión local
//! para desbloquear `accept()`. Toda conexión ya aceptada se entrega al pool,
//! incluida la de despertar, que se cierra sin enviar nada. Cuando `run()`
//! retorna, `Server::shutdown()` espera a que el pool termine las conexiones
//! en curso; el timeout de lectura acota cuánto espera un cliente callado.

use crate::config::Config;
use crate::error::Result;
use crate::server::connection::{self, ConnectionSettings};
use crate::workers::{PoolError, PoolStats, WorkerPool};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tiempo máximo para la conexión que despierta a `accept()`
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Espera tras el primer error de `accept`; se duplica hasta el máximo
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Back-off exponencial para errores seguidos de `accept` (p. ej. EMFILE)
#[derive(Debug)]
struct AcceptBackoff {
    delay: Option<Duration>,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self { delay: None }
    }

    /// Siguiente espera: la mínima tras un éxito, luego el doble, con tope
    fn next_delay(&mut self) -> Duration {
        let delay = match self.delay {
            None => ACCEPT_BACKOFF_MIN,
            Some(prev) => (prev * 2).min(ACCEPT_BACKOFF_MAX),
        };
        self.delay = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.delay = None;
    }
}

/// Permite pedir el apagado del servidor desde otro thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    fn new(local_addr: SocketAddr) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            wake_addr: wake_addr(local_addr),
        }
    }

    /// Pide que el loop de `accept` termine
    ///
    /// Llamarlo más de una vez no tiene efecto.
    pub fn shutdown(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("shutdown requested, waking the accept loop");

        // Se cierra enseguida: el worker que la reciba lee EOF
        match TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            Ok(stream) => drop(stream),
            Err(e) => warn!(error = %e, addr = %self.wake_addr, "could not wake the accept loop"),
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Una dirección no especificada (0.0.0.0 / ::) no sirve para conectarse
fn wake_addr(local_addr: SocketAddr) -> SocketAddr {
    let mut addr = local_addr;
    if addr.ip().is_unspecified() {
        let loopback: IpAddr = match addr {
            SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
            SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
        };
        addr.set_ip(loopback);
    }
    addr
}

/// Servidor HTTP con pool de workers
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    pool: WorkerPool,
    settings: Arc<ConnectionSettings>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Valida la configuración, hace bind y arranca los workers
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.address())?;
        let local_addr = listener.local_addr()?;
        let pool = WorkerPool::new(config.workers)?;

        info!(addr = %local_addr, workers = config.workers, "server listening");

        Ok(Self {
            listener,
            local_addr,
            pool,
            settings: Arc::new(ConnectionSettings::from_config(&config)),
            shutdown: ShutdownHandle::new(local_addr),
        })
    }

    /// Dirección real del listener (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Loop de `accept`: bloquea hasta que se pida el apagado
    ///
    /// La bandera se revisa después de entregar cada conexión, así un
    /// cliente aceptado justo antes del apagado recibe su respuesta.
    pub fn run(&self) -> Result<()> {
        info!("waiting for connections");

        let mut backoff = AcceptBackoff::new();

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    backoff.reset();
                    if let Err(PoolError::Closed) = self.dispatch(stream) {
                        warn!("worker pool closed, stopping accept loop");
                        break;
                    }
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(error = %e, retry_in = ?delay, "failed to accept connection");
                    thread::sleep(delay);
                }
            }

            if self.shutdown.is_requested() {
                break;
            }
        }

        info!("accept loop stopped");
        Ok(())
    }

    /// Entrega la conexión al pool como una tarea
    fn dispatch(&self, stream: TcpStream) -> std::result::Result<(), PoolError> {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let settings = Arc::clone(&self.settings);

        let task_peer = peer.clone();
        let id = self.pool.submit(move || {
            if let Err(e) = stream.set_read_timeout(settings.read_timeout) {
                warn!(peer = %task_peer, error = %e, "could not set read timeout");
            }
            if let Err(e) = connection::handle_connection(stream, &settings) {
                warn!(peer = %task_peer, error = %e, "connection failed");
            }
        })?;

        debug!(peer = %peer, task = %id, "connection queued");
        Ok(())
    }

    /// Deja de aceptar y espera a que terminen las conexiones en curso
    pub fn shutdown(self) -> PoolStats {
        let stats = self.pool.shutdown();
        info!(
            completed = stats.completed,
            panicked = stats.panicked,
            "server resources released"
        );
        stats
    }
}
