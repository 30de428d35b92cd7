//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Secuencia completa para un cliente: leer, parsear, responder, cerrar.
//! Se ejecuta como tarea dentro del pool de workers.

use crate::http::{page, request::has_header_terminator, ParseError, Request, Response};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::debug;

/// Path al que se responde 404 (los navegadores lo piden solos)
pub const FAVICON_PATH: &str = "/favicon.ico";

/// Parámetros compartidos por todas las conexiones
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Bytes por llamada a `read`
    pub read_chunk: usize,

    /// Límite de bytes leídos antes de dejar de esperar los headers
    pub max_request_bytes: usize,

    /// Tiempo máximo de espera por cada `read` (`None` = sin límite)
    pub read_timeout: Option<Duration>,

    /// Página HTML ya renderizada
    pub page: String,
}

impl ConnectionSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            read_chunk: config.read_chunk,
            max_request_bytes: config.max_request_bytes,
            read_timeout: config.read_timeout(),
            page: page::render(&config.title, &config.message),
        }
    }
}

/// Lee del stream hasta encontrar `\r\n\r\n`, superar `max_bytes` o EOF
pub fn read_request<R: Read>(stream: &mut R, chunk: usize, max_bytes: usize) -> io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buffer = vec![0u8; chunk];

    loop {
        let n = match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        request.extend_from_slice(&buffer[..n]);

        if has_header_terminator(&request) || request.len() > max_bytes {
            break;
        }
    }

    Ok(request)
}

/// Decide la respuesta para un request
pub fn respond(request: &Request, page: &str) -> Response {
    if request.path() == FAVICON_PATH {
        Response::not_found()
    } else {
        Response::html(page)
    }
}

/// `read` con timeout reporta `WouldBlock` en unix y `TimedOut` en windows
fn is_read_timeout(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Atiende una conexión completa
///
/// Un error de lectura cierra la conexión sin responder. Un cliente que
/// cierra sin enviar nada, o que se queda callado hasta el timeout de
/// lectura, no es un error.
pub fn handle_connection<S: Read + Write>(mut stream: S, settings: &ConnectionSettings) -> io::Result<()> {
    let raw = match read_request(&mut stream, settings.read_chunk, settings.max_request_bytes) {
        Ok(raw) => raw,
        Err(e) if is_read_timeout(&e) => {
            debug!("read timed out, closing idle connection");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let request = match Request::parse(&raw) {
        Ok(request) => request,
        Err(ParseError::EmptyRequest) => {
            debug!("client closed without sending a request");
            return Ok(());
        }
    };

    debug!(request_line = %request.request_line(), bytes = raw.len(), "request received");

    let response = respond(&request, &settings.page);
    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    debug!(status = %response.status(), "response sent, closing connection");
    Ok(())
}
