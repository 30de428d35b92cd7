//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser tolerante: solo se interpreta la request line y los headers
//! bien formados. El servidor responde lo mismo a casi cualquier cosa, así
//! que un request raro no es un error.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /path HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! ```

use std::collections::HashMap;

/// Marca el fin de los headers
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// El cliente cerró sin enviar nada
    #[error("Empty request")]
    EmptyRequest,
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método tal como llegó (ej: "GET")
    method: String,

    /// Path de la petición (ej: "/favicon.ico")
    path: String,

    /// Versión HTTP (ej: "HTTP/1.1")
    version: String,

    headers: HashMap<String, String>,
}

impl Request {
    /// Parsea un request desde bytes
    ///
    /// Los tokens faltantes de la request line quedan como strings vacíos.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use pool_server::http::Request;
    ///
    /// let raw = b"GET /favicon.ico HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/favicon.ico");
    /// assert_eq!(request.header("Host"), Some("x"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let text = String::from_utf8_lossy(buffer);

        // Sin "\r\n" todo el buffer es la request line
        let mut lines = text.split("\r\n");
        let first_line = lines.next().unwrap_or_default();

        let mut parts = first_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();
        let version = parts.next().unwrap_or_default().to_string();

        let headers = Self::parse_headers(lines);

        Ok(Request {
            method,
            path,
            version,
            headers,
        })
    }

    /// Parsea los headers hasta la línea vacía
    ///
    /// Las líneas sin ':' se ignoran.
    fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.is_empty() {
                break;
            }

            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_string(), value.trim().to_string());
            }
        }

        headers
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// La request line reconstruida, útil para logs
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.path, self.version)
            .trim()
            .to_string()
    }
}

/// Verifica si el buffer ya contiene el fin de los headers
pub fn has_header_terminator(buffer: &[u8]) -> bool {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .any(|window| window == HEADER_TERMINATOR)
}
