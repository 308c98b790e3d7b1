//! Cliente del sistema MES.
//!
//! * `session`: login, recuperación del token persistido, perfil y logout.
//! * `resource`: controlador genérico de listados paginados y el catálogo de recursos.
//! * `transport`: cliente HTTP y taxonomía de errores de la API.
//! * `context`: ensamblado de las piezas a partir de la configuración.

pub mod config;
pub mod context;
pub mod resource;
pub mod session;
pub mod system;
pub mod transport;
