//! Materiales e inventario.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use crate::resource::domain::{require_non_negative, require_text, Resource, ValidationError};
use crate::resource::logic::ResourceListController;
use crate::transport::domain::{ApiError, ApiRequest};


pub struct Material;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MaterialRequest {
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub unit: String,
    pub price: f64,
    pub current_stock: i64,
    pub min_stock: i64,
    pub max_stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MaterialPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


impl From<MaterialRequest> for MaterialPatch {
    fn from(r: MaterialRequest) -> Self {
        Self {
            code: Some(r.code),
            name: Some(r.name),
            kind: Some(r.kind),
            unit: Some(r.unit),
            price: Some(r.price),
            current_stock: Some(r.current_stock),
            min_stock: Some(r.min_stock),
            max_stock: Some(r.max_stock),
            supplier: r.supplier,
            description: r.description,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialRecord {
    pub id: u64,
    pub code: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub current_stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub max_stock: i64,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}


impl MaterialRecord {
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}


impl Resource for Material {
    type Request = MaterialRequest;
    type Patch = MaterialPatch;
    type Response = MaterialRecord;

    const NAME: &'static str = "material";
    const PATH: &'static str = "/materials";
    const FILTER_KEYS: &'static [&'static str] = &["keyword", "type"];

    fn id(record: &MaterialRecord) -> u64 {
        record.id
    }

    fn validate(draft: &MaterialRequest) -> Result<(), ValidationError> {
        require_text("code", &draft.code)?;
        require_text("name", &draft.name)?;
        require_text("type", &draft.kind)?;
        require_text("unit", &draft.unit)?;
        require_non_negative("price", draft.price)?;
        for (field, value) in [
            ("current_stock", draft.current_stock),
            ("min_stock", draft.min_stock),
            ("max_stock", draft.max_stock),
        ] {
            if value < 0 {
                return Err(ValidationError::new(field, "no puede ser negativo"));
            }
        }
        // max_stock = 0 significa sin tope.
        if draft.max_stock > 0 && draft.min_stock > draft.max_stock {
            return Err(ValidationError::new("min_stock", "no puede superar max_stock"));
        }
        Ok(())
    }
}


const LOW_STOCK_PATH: &str = "/materials/low-stock";
const TYPES_PATH: &str = "/materials/types";


impl ResourceListController<Material> {

    /// Materiales con `current_stock <= min_stock`, sin paginar.
    ///
    /// No modifica la página mostrada. Un `ApiError::Auth` cierra la sesión
    /// igual que en `fetch`.
    #[instrument(name = "material_low_stock", skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<MaterialRecord>, ApiError> {
        let records: Vec<MaterialRecord> = self.read_list(ApiRequest::get(LOW_STOCK_PATH)).await?;
        if !records.is_empty() {
            warn!("Warning: {} materiales con stock bajo", records.len());
        }
        Ok(records)
    }

    /// Tipos de material distintos ya registrados, para el filtro `type`.
    pub async fn types(&self) -> Result<Vec<String>, ApiError> {
        self.read_list(ApiRequest::get(TYPES_PATH)).await
    }
}
