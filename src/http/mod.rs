//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Lo mínimo de HTTP que necesita el servidor:
//!
//! - Parsing tolerante de la request line y los headers
//! - Construcción de responses
//! - La página HTML estática
//!
//! No hay routing, keep-alive ni chunked encoding: una conexión, un
//! request, una respuesta.

pub mod page;
pub mod request;
pub mod response;
pub mod status;

// Permite usar `http::Request` en vez de `http::request::Request`
pub use request::{ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
