//! Dominio de la sesión de usuario.
//!
//! Define el estado de la sesión y sus transiciones puras. Los efectos sobre
//! el almacenamiento durable los ejecuta `SessionController`, nunca estas
//! transiciones.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::transport::domain::ApiError;


/// Perfil del usuario autenticado.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}


impl User {
    /// Nombre a mostrar: el nombre real si existe, si no el usuario.
    pub fn display_name(&self) -> &str {
        if self.real_name.trim().is_empty() {
            &self.username
        } else {
            &self.real_name
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub user_info: User,
}


/// Estado observable de la sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Anonymous,
    /// Hay un token persistido pero aún no fue validado contra el servidor.
    TokenPresentUnverified,
    Authenticated,
}


/// Estado de la sesión en memoria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    verified: bool,
}


impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Sesión con un token recuperado del almacenamiento, sin verificar.
    pub fn resumed(token: String) -> Self {
        Self {
            token: Some(token),
            user: None,
            verified: false,
        }
    }

    pub fn authenticated(token: String, user: User) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            verified: true,
        }
    }

    /// Marca la sesión como verificada con el perfil recibido.
    pub fn with_profile(self, user: User) -> Self {
        Self {
            token: self.token,
            user: Some(user),
            verified: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.verified
    }

    pub fn status(&self) -> SessionStatus {
        match (&self.token, self.verified) {
            (None, _) => SessionStatus::Anonymous,
            (Some(_), false) => SessionStatus::TokenPresentUnverified,
            (Some(_), true) => SessionStatus::Authenticated,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    InvalidCredentials,
    /// El token fue rechazado o no existe.
    Expired,
    Network,
}


#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}


impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Clasifica el fallo de un login.
    pub fn from_login(err: ApiError) -> Self {
        match err {
            ApiError::Network(message) => Self::new(AuthErrorKind::Network, message),
            other => Self::new(AuthErrorKind::InvalidCredentials, other.to_string()),
        }
    }

    /// Clasifica el fallo de una consulta de perfil.
    pub fn from_profile(err: ApiError) -> Self {
        match err {
            ApiError::Network(message) => Self::new(AuthErrorKind::Network, message),
            other => Self::new(AuthErrorKind::Expired, other.to_string()),
        }
    }
}
