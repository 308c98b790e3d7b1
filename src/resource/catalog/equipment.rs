//! Equipos de planta.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use crate::resource::domain::{require_one_of, require_text, Resource, ValidationError};
use crate::resource::logic::ResourceListController;
use crate::transport::domain::{ApiError, ApiRequest};


pub const STATUSES: &[&str] = &["running", "stopped", "maintenance", "fault"];


pub struct Equipment;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EquipmentRequest {
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EquipmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}


impl From<EquipmentRequest> for EquipmentPatch {
    fn from(r: EquipmentRequest) -> Self {
        Self {
            code: Some(r.code),
            name: Some(r.name),
            kind: Some(r.kind),
            status: Some(r.status),
            model: r.model,
            manufacturer: r.manufacturer,
            location: r.location,
            purchase_date: r.purchase_date,
            warranty_date: r.warranty_date,
            description: r.description,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EquipmentRecord {
    pub id: u64,
    pub code: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub warranty_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}


impl Resource for Equipment {
    type Request = EquipmentRequest;
    type Patch = EquipmentPatch;
    type Response = EquipmentRecord;

    const NAME: &'static str = "equipment";
    const PATH: &'static str = "/equipment";
    const FILTER_KEYS: &'static [&'static str] = &["keyword", "type", "status"];

    fn id(record: &EquipmentRecord) -> u64 {
        record.id
    }

    fn validate(draft: &EquipmentRequest) -> Result<(), ValidationError> {
        require_text("code", &draft.code)?;
        require_text("name", &draft.name)?;
        require_text("type", &draft.kind)?;
        require_one_of("status", &draft.status, STATUSES)?;
        if let (Some(purchase), Some(warranty)) = (draft.purchase_date, draft.warranty_date) {
            if warranty < purchase {
                return Err(ValidationError::new("warranty_date", "no puede ser anterior a la compra"));
            }
        }
        Ok(())
    }
}


const STATISTICS_PATH: &str = "/equipment/statistics";


/// Conteo de equipos por estado. Las tasas vienen en porcentaje (0 a 100).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EquipmentStatistics {
    pub total_equipment: u64,
    pub running_count: u64,
    pub stopped_count: u64,
    pub maintenance_count: u64,
    pub fault_count: u64,
    pub running_rate: f64,
    pub maintenance_rate: f64,
    pub fault_rate: f64,
}


impl ResourceListController<Equipment> {

    /// Resumen del parque de equipos. No depende de los filtros activos.
    #[instrument(name = "equipment_statistics", skip(self))]
    pub async fn statistics(&self) -> Result<EquipmentStatistics, ApiError> {
        self.read(ApiRequest::get(STATISTICS_PATH)).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> EquipmentRequest {
        EquipmentRequest {
            code: "EQ-001".into(),
            name: "Torno CNC".into(),
            kind: "production".into(),
            status: "running".into(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(Equipment::validate(&draft()), Ok(()));
    }

    #[test]
    fn required_fields_and_status() {
        let mut d = draft();
        d.code = " ".into();
        assert_eq!(Equipment::validate(&d).unwrap_err().field, "code");

        let mut d = draft();
        d.status = "broken".into();
        assert_eq!(Equipment::validate(&d).unwrap_err().field, "status");
    }

    #[test]
    fn warranty_cannot_precede_purchase() {
        let mut d = draft();
        d.purchase_date = Some("2024-06-01T00:00:00Z".parse().unwrap());
        d.warranty_date = Some("2024-01-01T00:00:00Z".parse().unwrap());
        assert_eq!(Equipment::validate(&d).unwrap_err().field, "warranty_date");
    }

    #[test]
    fn type_field_uses_wire_name() {
        let value = serde_json::to_value(draft()).unwrap();
        assert_eq!(value, json!({"code": "EQ-001", "name": "Torno CNC", "type": "production", "status": "running"}));

        let patch = EquipmentPatch { status: Some("fault".into()), ..Default::default() };
        assert_eq!(serde_json::to_value(patch).unwrap(), json!({"status": "fault"}));
    }

    #[test]
    fn record_decodes_backend_shape() {
        let record: EquipmentRecord = serde_json::from_value(json!({
            "id": 4, "code": "EQ-004", "name": "Prensa", "type": "production",
            "model": "", "manufacturer": "ACME", "location": "Nave 2", "status": "maintenance",
            "purchase_date": null, "warranty_date": null,
            "created_at": "2024-01-10T09:30:00+08:00", "updated_at": "2024-01-10T09:30:00+08:00"
        })).unwrap();
        assert_eq!(Equipment::id(&record), 4);
        assert_eq!(record.kind, "production");
        assert_eq!(record.purchase_date, None);
        assert_eq!(Equipment::item_path(4), "/equipment/4");
    }
}
