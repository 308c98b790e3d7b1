//! Catálogo de recursos del MES.
//!
//! Un archivo por recurso: cargas de creación y actualización, representación
//! del servidor y validación pura del borrador.

pub mod equipment;
pub mod maintenance;
pub mod material;
pub mod production;
pub mod quality;

use serde::{Deserialize, Serialize};

pub use equipment::Equipment;
pub use maintenance::MaintenanceRecord;
pub use material::Material;
pub use production::ProductionOrder;
pub use quality::QualityInspection;


/// Resumen de producto embebido en otras respuestas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSummary {
    pub id: u64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
}


/// Resumen de usuario embebido en otras respuestas (creador, inspector).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub real_name: String,
}
