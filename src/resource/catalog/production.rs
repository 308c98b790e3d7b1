//! Órdenes de producción.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::resource::domain::{require_id, Resource, ValidationError};
use super::{ProductSummary, UserSummary};


pub const STATUSES: &[&str] = &["pending", "processing", "completed", "cancelled"];
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 1..=5;


pub struct ProductionOrder;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionOrderRequest {
    pub product_id: u64,
    pub quantity: i64,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


/// Actualización parcial. A diferencia de la creación admite `produced` y `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProductionOrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produced: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}


impl From<ProductionOrderRequest> for ProductionOrderPatch {
    fn from(r: ProductionOrderRequest) -> Self {
        Self {
            quantity: Some(r.quantity),
            priority: Some(r.priority),
            start_date: r.start_date,
            end_date: r.end_date,
            ..Default::default()
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductionOrderRecord {
    pub id: u64,
    #[serde(default)]
    pub order_no: String,
    pub product_id: u64,
    #[serde(default)]
    pub product: Option<ProductSummary>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub produced: i64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: u64,
    #[serde(default)]
    pub creator: Option<UserSummary>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}


impl ProductionOrderRecord {
    /// Avance en porcentaje (0–100).
    pub fn progress_percent(&self) -> u8 {
        if self.quantity <= 0 {
            return 0;
        }
        let produced = self.produced.clamp(0, self.quantity);
        (produced * 100 / self.quantity) as u8
    }
}


impl Resource for ProductionOrder {
    type Request = ProductionOrderRequest;
    type Patch = ProductionOrderPatch;
    type Response = ProductionOrderRecord;

    const NAME: &'static str = "production_order";
    const PATH: &'static str = "/production/orders";
    const FILTER_KEYS: &'static [&'static str] = &["status", "product_id"];

    fn id(record: &ProductionOrderRecord) -> u64 {
        record.id
    }

    fn validate(draft: &ProductionOrderRequest) -> Result<(), ValidationError> {
        require_id("product_id", draft.product_id)?;
        if draft.quantity < 1 {
            return Err(ValidationError::new("quantity", "debe ser al menos 1"));
        }
        if !PRIORITY_RANGE.contains(&draft.priority) {
            return Err(ValidationError::new("priority", "debe estar entre 1 y 5"));
        }
        if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
            if end < start {
                return Err(ValidationError::new("end_date", "no puede ser anterior al inicio"));
            }
        }
        Ok(())
    }
}
