//! Controlador de sesión.
//!
//! Dueño exclusivo del token y del perfil del usuario. El transporte sólo
//! recibe un `SessionReader` de lectura; las únicas escrituras pasan por las
//! operaciones de `SessionController`.
//!
//! # Máquina de estados
//! * `Anonymous` → (login ok) → `Authenticated`
//! * `Authenticated` → (logout | fallo de perfil | fallo de autenticación) → `Anonymous`
//! * `Anonymous` con token persistido → (resume) → `TokenPresentUnverified`
//!   → (perfil ok) → `Authenticated`, o → `Anonymous` si falla.


use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};
use crate::config::http::{LOGIN_PATH, PROFILE_PATH};
use crate::transport::domain::{ApiError, ApiRequest, Transport};
use super::domain::{AuthError, AuthErrorKind, LoginRequest, LoginResponse, Session, SessionStatus, User};
use super::storage::TokenStore;


/// Celda compartida con el estado de la sesión.
#[derive(Clone, Debug, Default)]
pub struct SessionCell {
    inner: Arc<RwLock<Session>>,
}


impl SessionCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Referencia de sólo lectura para el transporte.
    pub fn reader(&self) -> SessionReader {
        SessionReader { inner: Arc::clone(&self.inner) }
    }
}


#[derive(Clone, Debug)]
pub struct SessionReader {
    inner: Arc<RwLock<Session>>,
}


impl SessionReader {
    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    pub async fn session(&self) -> Session {
        self.inner.read().await.clone()
    }
}


/// Receptor de fallos de autenticación detectados fuera de la sesión.
///
/// Los controladores de listas reenvían aquí cada `ApiError::Auth`; nunca
/// limpian la sesión por su cuenta.
#[async_trait]
pub trait AuthObserver: Send + Sync {
    async fn on_auth_failure(&self);
}


/// Dueño de la sesión del usuario.
///
/// Escribe la `SessionCell` que lee el transporte, persiste el token en el
/// `TokenStore` y publica cada cambio de `SessionStatus` en un canal `watch`.
/// Es también el `AuthObserver` de todos los listados: un `ApiError::Auth`
/// en cualquier recurso termina aquí y vuelve la sesión a `Anonymous`.
pub struct SessionController {
    cell: SessionCell,
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    status_tx: watch::Sender<SessionStatus>,
}


impl SessionController {
    /// Crea el controlador en estado `Anonymous`; no lee el almacenamiento.
    ///
    /// # Argumentos
    /// * `cell`: celda compartida con el transporte (ver `SessionCell::reader`).
    /// * `store`: destino del token entre ejecuciones.
    /// * `transport`: el mismo transporte que usan los listados.
    pub fn new(cell: SessionCell,
               store: Arc<dyn TokenStore>,
               transport: Arc<dyn Transport>) -> Self {

        let (status_tx, _) = watch::channel(SessionStatus::Anonymous);
        Self { cell, store, transport, status_tx }
    }

    pub fn reader(&self) -> SessionReader {
        self.cell.reader()
    }

    /// Canal con cada cambio de estado, incluido el retorno forzado a `Anonymous`.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub async fn session(&self) -> Session {
        self.cell.inner.read().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.cell.inner.read().await.status()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.cell.inner.read().await.is_authenticated()
    }

    pub async fn user(&self) -> Option<User> {
        self.cell.inner.read().await.user.clone()
    }

    /// Inicia sesión con usuario y contraseña.
    ///
    /// # Flujo de Trabajo
    /// 1. Rechaza sin petición un usuario en blanco o una contraseña vacía.
    /// 2. `POST /users/login` con `{username, password}`.
    /// 3. Persiste el token; si falla sólo se registra el error.
    /// 4. Pasa a `Authenticated` y lo publica en `subscribe`.
    ///
    /// # Errores
    /// `AuthError` con `InvalidCredentials` o `Network`. Ante cualquier fallo
    /// la sesión previa queda intacta.
    #[instrument(name = "session_login", skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::new(AuthErrorKind::InvalidCredentials, "usuario y contraseña son obligatorios"));
        }

        let credentials = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let body = serde_json::to_value(&credentials)
            .map_err(|e| AuthError::new(AuthErrorKind::InvalidCredentials, e.to_string()))?;

        let data = self.transport
            .request(ApiRequest::post(LOGIN_PATH).with_body(body))
            .await
            .map_err(|e| {
                warn!("Warning: login rechazado: {}", e);
                AuthError::from_login(e)
            })?;

        let response: LoginResponse = serde_json::from_value(data)
            .map_err(|e| AuthError::new(AuthErrorKind::Network, format!("respuesta de login inválida: {e}")))?;

        if response.token.trim().is_empty() {
            return Err(AuthError::new(AuthErrorKind::InvalidCredentials, "el servidor no devolvió token"));
        }

        if let Err(e) = self.store.save(&response.token).await {
            error!("Error: no se pudo persistir el token: {}", e);
        }

        let session = Session::authenticated(response.token, response.user_info);
        self.commit(session.clone()).await;
        info!("Info: sesión iniciada");
        Ok(session)
    }

    /// Recupera el token persistido sin validarlo contra el servidor.
    ///
    /// Con token queda en `TokenPresentUnverified` hasta `fetch_profile`; sin
    /// token, o si no se puede leer, queda `Anonymous`. Nunca falla.
    #[instrument(name = "session_resume", skip(self))]
    pub async fn resume_from_storage(&self) -> Session {
        let token = match self.store.load().await {
            Ok(token) => token,
            Err(e) => {
                error!("Error: no se pudo leer el token persistido: {}", e);
                None
            }
        };

        let session = match token {
            Some(token) => {
                debug!("Debug: token persistido encontrado");
                Session::resumed(token)
            }
            None => Session::anonymous(),
        };
        self.commit(session.clone()).await;
        session
    }

    /// Consulta el perfil con el token actual.
    ///
    /// # Flujo de Trabajo
    /// 1. Sin token devuelve `Expired` sin emitir petición.
    /// 2. `GET /users/profile`.
    /// 3. Si el token no cambió mientras tanto, guarda el usuario y pasa a
    ///    `Authenticated`.
    ///
    /// # Errores
    /// Cualquier fallo limpia la sesión y el token persistido (salvo que la
    /// sesión haya cambiado durante la consulta): es la única vía de
    /// recuperación ante un token vencido.
    #[instrument(name = "session_fetch_profile", skip(self))]
    pub async fn fetch_profile(&self) -> Result<User, AuthError> {
        let Some(token) = self.cell.reader().token().await else {
            return Err(AuthError::new(AuthErrorKind::Expired, "no hay token de sesión"));
        };

        let result = self.transport
            .request(ApiRequest::get(PROFILE_PATH))
            .await
            .and_then(decode_profile);

        match result {
            Ok(user) => {
                let mut guard = self.cell.inner.write().await;
                if guard.token.as_deref() == Some(token.as_str()) {
                    *guard = std::mem::take(&mut *guard).with_profile(user.clone());
                    let status = guard.status();
                    drop(guard);
                    self.status_tx.send_replace(status);
                    info!("Info: perfil verificado para {}", user.username);
                } else {
                    debug!("Debug: la sesión cambió durante la consulta de perfil, se descarta");
                }
                Ok(user)
            }
            Err(e) => {
                warn!("Warning: consulta de perfil falló, cerrando sesión: {}", e);
                let still_current = self.cell.reader().token().await.as_deref() == Some(token.as_str());
                if still_current {
                    self.clear("perfil rechazado").await;
                }
                Err(AuthError::from_profile(e))
            }
        }
    }

    /// Cierra la sesión y borra el token persistido. Idempotente.
    #[instrument(name = "session_logout", skip(self))]
    pub async fn logout(&self) {
        self.clear("logout").await;
    }

    async fn clear(&self, reason: &str) {
        self.commit(Session::anonymous()).await;
        if let Err(e) = self.store.clear().await {
            error!("Error: no se pudo borrar el token persistido: {}", e);
        }
        info!("Info: sesión cerrada ({})", reason);
    }

    async fn commit(&self, session: Session) {
        let status = session.status();
        *self.cell.inner.write().await = session;
        self.status_tx.send_replace(status);
    }
}


fn decode_profile(data: Value) -> Result<User, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::Unknown(format!("perfil inválido: {e}")))
}


#[async_trait]
impl AuthObserver for SessionController {
    async fn on_auth_failure(&self) {
        warn!("Warning: credencial rechazada por el servidor");
        self.clear("credencial expirada").await;
    }
}


/// Registra en el log cada cambio de estado de la sesión.
async fn watch_session(mut rx: watch::Receiver<SessionStatus>) {
    info!("Info: vigilancia de sesión creada");
    while rx.changed().await.is_ok() {
        let status = *rx.borrow_and_update();
        match status {
            SessionStatus::Anonymous => warn!("Warning: sesión anónima"),
            SessionStatus::TokenPresentUnverified => debug!("Debug: token recuperado, pendiente de verificar"),
            SessionStatus::Authenticated => info!("Info: sesión autenticada"),
        }
    }
    debug!("Debug: controlador de sesión liberado, fin de la vigilancia");
}


pub fn start_session_watch(session: &SessionController) {
    let rx = session.subscribe();
    tokio::spawn(async move {
        watch_session(rx).await;
    });
}
