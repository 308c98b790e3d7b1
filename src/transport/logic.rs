//! Transporte HTTP basado en `reqwest`.
//!
//! Une la URL base configurada con la ruta de cada petición, adjunta el token
//! de la sesión como credencial `Bearer` y traduce las respuestas al contrato
//! de `Transport`.


use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use crate::session::logic::SessionReader;
use crate::system::domain::System;
use super::domain::{error_message, unwrap_envelope, ApiError, ApiRequest, Transport};


/// Cliente REST del backend del MES.
///
/// Comparte con la sesión una `SessionReader`: cada petición lee el token
/// vigente en ese momento, así un login o logout se refleja sin reconstruir el
/// transporte. Clonarlo reutiliza el mismo pool de conexiones.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session: SessionReader,
}


impl HttpTransport {
    /// Construye el cliente `reqwest` con el timeout configurado.
    ///
    /// # Argumentos
    /// * `system`: aporta `api_base_url` y `request_timeout`.
    /// * `session`: lectura del token que se adjunta como `Bearer`.
    ///
    /// # Errores
    /// `ApiError::Network` si el backend TLS no se puede inicializar.
    pub fn new(system: &System, session: SessionReader) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(system.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("no se pudo crear el cliente HTTP: {e}")))?;

        Ok(Self {
            client,
            base_url: system.api_base_url.clone(),
            session,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}


#[async_trait]
impl Transport for HttpTransport {
    /// Ejecuta una petición y devuelve el `data` del sobre.
    ///
    /// # Flujo de Trabajo
    /// 1. Une la ruta con la URL base y agrega query, token y cuerpo JSON.
    /// 2. Un fallo de conexión o timeout es `ApiError::Network`.
    /// 3. Un estado HTTP no exitoso se traduce con `ApiError::from_status`,
    ///    usando el `message` del cuerpo si lo hay.
    /// 4. Un cuerpo vacío es `Value::Null`; si no, se desenvuelve
    ///    `{code, message, data}` y un `code` de error también se traduce.
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.path);
        debug!("Debug: {} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.session.token().await {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Warning: petición {} {} falló: {}", request.method, url, e);
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Warning: {} {} respondió {}", request.method, url, status);
            return Err(ApiError::from_status(status.as_u16(), error_message(&text)));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::Network(format!("respuesta no decodificable: {e}")))?;

        unwrap_envelope(body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::logic::SessionCell;

    fn transport(base: &str) -> HttpTransport {
        let system = System::from_lookup(|key| match key {
            "MES_API_BASE_URL" => Some(base.to_string()),
            _ => None,
        }).unwrap();
        HttpTransport::new(&system, SessionCell::new().reader()).unwrap()
    }

    #[test]
    fn paths_are_joined_to_the_base_url() {
        let t = transport("http://mes.local/api/v1/");
        assert_eq!(t.url_for("/equipment"), "http://mes.local/api/v1/equipment");
        assert_eq!(t.url_for("production/orders/3"), "http://mes.local/api/v1/production/orders/3");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let t = transport("http://127.0.0.1:1");
        let err = t.request(ApiRequest::get("/equipment")).await.unwrap_err();
        assert!(err.is_network(), "{err:?}");
    }
}
