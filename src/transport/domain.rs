//! Contrato del transporte HTTP y taxonomía de errores de la API.
//!
//! Todas las operaciones de los controladores terminan en uno de los errores
//! de `ApiError`. El backend envuelve las respuestas en `{code, message, data}`
//! y puede reportar fallos con HTTP 200 y un `code` distinto de 200, por lo que
//! el código del sobre se traduce con la misma tabla que el estado HTTP.


use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;


/// Errores de la API tal como los ven los controladores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Entrada mal formada o incompleta, recuperable editando el formulario.
    #[error("validación: {0}")]
    Validation(String),

    /// Credencial expirada o inválida. Provoca el cierre de la sesión.
    #[error("autenticación: {0}")]
    Auth(String),

    /// Referencia obsoleta (ej. borrar un registro ya borrado).
    #[error("no encontrado: {0}")]
    NotFound(String),

    /// Conflicto con el estado del servidor (ej. código duplicado).
    #[error("conflicto: {0}")]
    Conflict(String),

    /// Falla a nivel de transporte, recuperable reintentando.
    #[error("red: {0}")]
    Network(String),

    #[error("error desconocido: {0}")]
    Unknown(String),
}


impl ApiError {
    /// Traduce un código de estado (HTTP o del sobre) a la taxonomía.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => ApiError::Validation(message),
            401 | 403 => ApiError::Auth(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Unknown(format!("{status}: {message}")),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}


impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return ApiError::from_status(status.as_u16(), e.to_string());
        }
        ApiError::Network(e.to_string())
    }
}


/// Sobre estándar de respuesta del backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}


/// Código que el backend usa para indicar éxito dentro del sobre.
pub const ENVELOPE_SUCCESS: u16 = 200;


/// Interpreta el cuerpo de una respuesta 2xx.
///
/// Si el cuerpo es un sobre `{code, message, data}` se devuelve `data` (o `null`)
/// cuando `code` indica éxito, y el error correspondiente en caso contrario.
/// Cualquier otro cuerpo se devuelve tal cual.
pub fn unwrap_envelope(body: Value) -> Result<Value, ApiError> {
    let is_envelope = body
        .as_object()
        .map(|obj| obj.get("code").is_some_and(Value::is_u64))
        .unwrap_or(false);

    if !is_envelope {
        return Ok(body);
    }

    let envelope: Envelope = serde_json::from_value(body)
        .map_err(|e| ApiError::Unknown(format!("sobre inválido: {e}")))?;

    if envelope.code == ENVELOPE_SUCCESS || envelope.code == 0 {
        Ok(envelope.data.unwrap_or(Value::Null))
    } else {
        Err(ApiError::from_status(envelope.code, envelope.message))
    }
}


/// Extrae el mensaje de error de un cuerpo no-2xx, si es un sobre.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) if !envelope.message.is_empty() => envelope.message,
        _ => body.trim().to_string(),
    }
}


/// Petición genérica hacia la API REST.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}


impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}


/// Capacidad de transporte consumida por los controladores.
///
/// Las implementaciones deben adjuntar el token de la sesión cuando exista,
/// aplicar un timeout que termine en `ApiError::Network` y traducir los estados
/// no-2xx a la taxonomía de `ApiError`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError>;
}
