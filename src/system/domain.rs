//! Módulo de configuración central y gestión del entorno de ejecución.
//!
//! Este módulo actúa como la fuente única de verdad para la configuración del cliente.
//! Se encarga de leer las variables de entorno, establecer valores por defecto seguros
//! y proveer las estructuras necesarias para iniciar los subsistemas (HTTP, Sesión, Logging).
//!
//! # Funcionalidades Principales
//! * **Carga de Configuración:** Lee de `.env` en desarrollo y variables de sistema en producción.
//! * **Observabilidad:** Configura `tracing_subscriber` para logs estructurados o legibles.


use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use crate::config::http::{DEFAULT_BASE_URL, TIMEOUT};
use crate::config::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::config::storage::DEFAULT_TOKEN_PATH;


/// Errores al interpretar la configuración del entorno.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} debe ser un número, se recibió '{value}'")]
    NotANumber { key: &'static str, value: String },

    #[error("{key} no puede estar vacía")]
    Empty { key: &'static str },

    #[error("{key} fuera de rango: {value}")]
    OutOfRange { key: &'static str, value: u64 },
}


/// Representa la configuración global del cliente y el estado del entorno.
///
/// Esta estructura centraliza todas las variables de entorno necesarias para
/// construir el transporte HTTP, el almacenamiento del token y el logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct System {
    /// URL base de la API REST (ej. `http://localhost:8080/api/v1`).
    /// Por defecto: `http://localhost:8080/api/v1`.
    pub api_base_url: String,

    /// Tiempo máximo de espera de cada petición HTTP.
    /// Por defecto: `10` segundos.
    pub request_timeout: Duration,

    /// Ruta del archivo donde se persiste el token de sesión.
    /// Por defecto: `.mes_token.json`.
    pub token_path: PathBuf,

    /// Tamaño de página inicial de los listados.
    /// Por defecto: `10`.
    pub default_page_size: u32,

    /// Entorno de ejecución actual (`development`, `staging`, `production`).
    /// Afecta el formato de logs y la carga de archivos `.env`.
    pub environment: String,

    /// Nivel de detalle de los logs (ej. `info`, `debug`, `warn`).
    /// Se autoconfigura según el `environment` si no se especifica.
    pub rust_log: String,
}


impl System {

    /// Carga la configuración desde las variables de entorno.
    ///
    /// # Comportamiento
    /// * Si `ENVIRONMENT` es "development", intenta cargar un archivo `.env`.
    /// * Establece valores por defecto para variables opcionales.
    ///
    /// # Errores
    /// * `ConfigError::NotANumber` si `MES_REQUEST_TIMEOUT_SECS` o `MES_DEFAULT_PAGE_SIZE`
    ///   no son números válidos.
    pub fn new() -> Result<Self, ConfigError> {

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".into());

        if environment == "development" {
            dotenv::dotenv().ok();
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string());

        let api_base_url = lookup("MES_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if api_base_url.is_empty() {
            return Err(ConfigError::Empty { key: "MES_API_BASE_URL" });
        }

        let request_timeout = match lookup("MES_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("MES_REQUEST_TIMEOUT_SECS", &raw)?),
            None => TIMEOUT,
        };
        if request_timeout.is_zero() {
            return Err(ConfigError::OutOfRange { key: "MES_REQUEST_TIMEOUT_SECS", value: 0 });
        }

        let default_page_size = match lookup("MES_DEFAULT_PAGE_SIZE") {
            Some(raw) => {
                let value = parse_number("MES_DEFAULT_PAGE_SIZE", &raw)?;
                if value == 0 || value > u64::from(MAX_PAGE_SIZE) {
                    return Err(ConfigError::OutOfRange { key: "MES_DEFAULT_PAGE_SIZE", value });
                }
                value as u32
            }
            None => DEFAULT_PAGE_SIZE,
        };

        let token_path = lookup("MES_TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH));

        let rust_log = lookup("RUST_LOG")
            .unwrap_or_else(|| {
                match environment.as_str() {
                    "development" => "debug".to_string(),
                    "staging" => "info".to_string(),
                    _ => "warn".to_string(),
                }
            });

        Ok(System {
            api_base_url,
            request_timeout,
            token_path,
            default_page_size,
            rust_log,
            environment,
        })
    }
}


fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::NotANumber { key, value: raw.to_string() })
}


/// Inicializa el sistema de trazabilidad y logs (Tracing).
///
/// Configura el formato de salida basándose en el entorno:
/// * **Production**: Salida JSON (para logs estructurados en la nube).
/// * **Development/Otros**: Salida "Pretty" (colores y formato legible).
///
/// # Argumentos
/// * `system`: Referencia a la configuración cargada para leer el nivel de log (`rust_log`).
pub fn init_tracing(system: &System) {

    let filter = EnvFilter::try_new(&system.rust_log)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(false);

    if system.environment == "production" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}


/// Registra la configuración efectiva. Debe llamarse después de `init_tracing`.
pub fn log_startup(system: &System) {
    info!("Info: configuración cargada para entorno {}", system.environment);
    info!("Info: API en {}, timeout {:?}, token en {}",
          system.api_base_url, system.request_timeout, system.token_path.display());
}
