//! Registros de mantenimiento de equipos.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use crate::resource::domain::{require_id, require_non_negative, require_one_of, require_text, Resource, ValidationError};
use crate::resource::logic::ResourceListController;
use crate::transport::domain::{ApiError, ApiRequest};


pub const KINDS: &[&str] = &["preventive", "corrective", "emergency"];


pub struct MaintenanceRecord;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceRequest {
    pub equipment_id: u64,
    pub maintainer_id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts_replaced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_maintenance: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MaintenancePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_id: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts_replaced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_maintenance: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}


impl From<MaintenanceRequest> for MaintenancePatch {
    fn from(r: MaintenanceRequest) -> Self {
        Self {
            equipment_id: Some(r.equipment_id),
            maintainer_id: Some(r.maintainer_id),
            kind: Some(r.kind),
            description: Some(r.description),
            start_time: Some(r.start_time),
            end_time: r.end_time,
            cost: r.cost,
            parts_replaced: r.parts_replaced,
            result: r.result,
            next_maintenance: r.next_maintenance,
            remark: r.remark,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceEntry {
    pub id: u64,
    pub equipment_id: u64,
    #[serde(default)]
    pub equipment_code: String,
    #[serde(default)]
    pub equipment_name: String,
    #[serde(default)]
    pub maintainer_id: u64,
    #[serde(default)]
    pub maintainer_name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Duración en minutos.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub parts_replaced: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub next_maintenance: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}


impl MaintenanceEntry {
    /// Duración informada por el servidor o calculada desde las horas.
    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration.or_else(|| {
            self.end_time.map(|end| (end - self.start_time).num_minutes())
        })
    }
}


impl Resource for MaintenanceRecord {
    type Request = MaintenanceRequest;
    type Patch = MaintenancePatch;
    type Response = MaintenanceEntry;

    const NAME: &'static str = "maintenance_record";
    const PATH: &'static str = "/equipment/maintenance";
    const FILTER_KEYS: &'static [&'static str] = &["equipment_id", "type", "maintainer_id", "start_date", "end_date"];

    fn id(record: &MaintenanceEntry) -> u64 {
        record.id
    }

    fn validate(draft: &MaintenanceRequest) -> Result<(), ValidationError> {
        require_id("equipment_id", draft.equipment_id)?;
        require_id("maintainer_id", draft.maintainer_id)?;
        require_one_of("type", &draft.kind, KINDS)?;
        require_text("description", &draft.description)?;
        if let Some(cost) = draft.cost {
            require_non_negative("cost", cost)?;
        }
        if let Some(end) = draft.end_time {
            if end < draft.start_time {
                return Err(ValidationError::new("end_time", "no puede ser anterior al inicio"));
            }
        }
        Ok(())
    }
}


const UPCOMING_PATH: &str = "/equipment/upcoming-maintenance";

/// Ventana usada por el servidor cuando `days` es 0.
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;


impl ResourceListController<MaintenanceRecord> {

    /// Mantenimientos cuya próxima fecha cae dentro de los próximos `days` días,
    /// ordenados por fecha.
    ///
    /// # Argumentos
    /// * `days`: tamaño de la ventana; `0` usa `DEFAULT_UPCOMING_DAYS`.
    ///
    /// # Errores
    /// Los del transporte. Un `ApiError::Auth` también cierra la sesión.
    #[instrument(name = "maintenance_upcoming", skip(self))]
    pub async fn upcoming(&self, days: u32) -> Result<Vec<MaintenanceEntry>, ApiError> {
        let days = if days == 0 { DEFAULT_UPCOMING_DAYS } else { days };
        let request = ApiRequest::get(UPCOMING_PATH)
            .with_query(vec![("days".to_string(), days.to_string())]);
        self.read_list(request).await
    }
}
