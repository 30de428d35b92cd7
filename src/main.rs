//! # Pool Server - Entry Point
//! src/main.rs
//!
//! Arranca el servidor y lo apaga ordenadamente con Ctrl+C o SIGTERM.
//! Una segunda señal termina el proceso sin esperar a los clientes.

use pool_server::config::Config;
use pool_server::server::Server;
use pool_server::{signal, telemetry};
use std::thread;
use tracing::{error, info, warn};

/// Código de salida al abortar con una segunda señal (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

fn main() {
    println!("=================================");
    println!("  Pool Server");
    println!("  Press Ctrl+C to stop the server");
    println!("=================================\n");

    let config = Config::new();
    telemetry::init();
    config.print_summary();

    if let Err(e) = run(config) {
        error!(error = %e, "server failed");
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> pool_server::Result<()> {
    let server = Server::bind(config)?;
    let handle = server.shutdown_handle();

    // El dueño del servidor es `main`; el watcher solo tiene el handle
    thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            let second = signal::watch(|name| {
                info!(signal = name, "interrupt received, draining connections");
                handle.shutdown();
            });

            match second {
                Ok(name) => {
                    warn!(signal = name, "second interrupt, exiting without draining");
                    std::process::exit(FORCED_EXIT_CODE);
                }
                Err(e) => error!(error = %e, "could not install signal handlers"),
            }
        })?;

    server.run()?;
    server.shutdown();
    Ok(())
}
