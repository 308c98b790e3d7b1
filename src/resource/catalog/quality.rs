//! Inspecciones de calidad.


use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use crate::resource::domain::{require_id, require_one_of, Resource, ValidationError};
use crate::resource::logic::ResourceListController;
use crate::transport::domain::{ApiError, ApiRequest};
use super::{ProductSummary, UserSummary};


pub const RESULTS: &[&str] = &["pass", "fail"];


pub struct QualityInspection;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionRequest {
    pub production_order_id: u64,
    pub quality_standard_id: u64,
    pub inspector_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_no: Option<String>,
    pub sample_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured_value: Option<f64>,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InspectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_order_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_standard_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspector_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}


impl From<InspectionRequest> for InspectionPatch {
    fn from(r: InspectionRequest) -> Self {
        Self {
            production_order_id: Some(r.production_order_id),
            quality_standard_id: Some(r.quality_standard_id),
            inspector_id: Some(r.inspector_id),
            batch_no: r.batch_no,
            sample_size: Some(r.sample_size),
            measured_value: r.measured_value,
            result: Some(r.result),
            notes: r.notes,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderSummary {
    pub id: u64,
    #[serde(default)]
    pub order_no: String,
    #[serde(default)]
    pub product: Option<ProductSummary>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandardSummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionRecord {
    pub id: u64,
    pub production_order_id: u64,
    #[serde(default)]
    pub production_order: Option<OrderSummary>,
    pub quality_standard_id: u64,
    #[serde(default)]
    pub quality_standard: Option<StandardSummary>,
    #[serde(default)]
    pub inspector_id: u64,
    #[serde(default)]
    pub inspector: Option<UserSummary>,
    #[serde(default)]
    pub batch_no: Option<String>,
    #[serde(default)]
    pub sample_size: u32,
    #[serde(default)]
    pub measured_value: Option<f64>,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub inspected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}


impl InspectionRecord {
    pub fn passed(&self) -> bool {
        self.result == "pass"
    }
}


impl Resource for QualityInspection {
    type Request = InspectionRequest;
    type Patch = InspectionPatch;
    type Response = InspectionRecord;

    const NAME: &'static str = "quality_inspection";
    const PATH: &'static str = "/quality/inspections";
    const FILTER_KEYS: &'static [&'static str] = &["production_order_id", "result", "start_date", "end_date"];

    fn id(record: &InspectionRecord) -> u64 {
        record.id
    }

    fn validate(draft: &InspectionRequest) -> Result<(), ValidationError> {
        require_id("production_order_id", draft.production_order_id)?;
        require_id("quality_standard_id", draft.quality_standard_id)?;
        require_id("inspector_id", draft.inspector_id)?;
        if draft.sample_size < 1 {
            return Err(ValidationError::new("sample_size", "debe ser al menos 1"));
        }
        require_one_of("result", &draft.result, RESULTS)?;
        Ok(())
    }
}


const STATISTICS_PATH: &str = "/quality/statistics";


/// Recorte opcional de las estadísticas de calidad. Los campos vacíos no se
/// envían.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualityStatisticsQuery {
    pub start_date: Option<NaiveDate>,
    /// Inclusiva: el servidor cuenta hasta el final de ese día.
    pub end_date: Option<NaiveDate>,
    pub production_order_id: Option<u64>,
    pub quality_standard_id: Option<u64>,
}


impl QualityStatisticsQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let dates = [("start_date", self.start_date), ("end_date", self.end_date)]
            .into_iter()
            .filter_map(|(key, date)| date.map(|d| (key.to_string(), d.format("%Y-%m-%d").to_string())));
        let ids = [("production_order_id", self.production_order_id), ("quality_standard_id", self.quality_standard_id)]
            .into_iter()
            .filter_map(|(key, id)| id.filter(|id| *id > 0).map(|id| (key.to_string(), id.to_string())));
        dates.chain(ids).collect()
    }
}


/// Resultado agregado de inspecciones. Las tasas vienen en porcentaje.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct QualityStatistics {
    pub total_inspections: u64,
    pub passed_count: u64,
    pub failed_count: u64,
    pub pass_rate: f64,
    pub fail_rate: f64,
}


impl ResourceListController<QualityInspection> {

    /// Estadísticas de aprobación, opcionalmente recortadas por fechas,
    /// orden de producción o estándar.
    ///
    /// # Errores
    /// * `ApiError::Validation` si `start_date` es posterior a `end_date`; no
    ///   se emite ninguna petición.
    /// * Los del transporte. Un `ApiError::Auth` también cierra la sesión.
    #[instrument(name = "quality_statistics", skip(self))]
    pub async fn statistics(&self, query: &QualityStatisticsQuery) -> Result<QualityStatistics, ApiError> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(ApiError::Validation("start_date no puede ser posterior a end_date".into()));
            }
        }
        self.read(ApiRequest::get(STATISTICS_PATH).with_query(query.to_query())).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> InspectionRequest {
        InspectionRequest {
            production_order_id: 9,
            quality_standard_id: 2,
            inspector_id: 5,
            batch_no: Some("B-0601".into()),
            sample_size: 20,
            measured_value: Some(9.98),
            result: "pass".into(),
            notes: None,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(QualityInspection::validate(&draft()), Ok(()));
    }

    #[test]
    fn rejects_bad_drafts() {
        let mut d = draft();
        d.sample_size = 0;
        assert_eq!(QualityInspection::validate(&d).unwrap_err().field, "sample_size");

        let mut d = draft();
        d.result = "pending".into();
        assert_eq!(QualityInspection::validate(&d).unwrap_err().field, "result");

        let mut d = draft();
        d.inspector_id = 0;
        assert_eq!(QualityInspection::validate(&d).unwrap_err().field, "inspector_id");
    }

    #[test]
    fn record_with_nested_order() {
        let record: InspectionRecord = serde_json::from_value(json!({
            "id": 1, "production_order_id": 9, "quality_standard_id": 2,
            "production_order": {"id": 9, "order_no": "PO-9", "product": {"id": 3, "code": "P-3", "name": "Eje"}},
            "inspector": {"id": 5, "username": "qa", "real_name": "Inspectora"},
            "sample_size": 20, "result": "fail", "inspected_at": "2024-06-02T10:00:00Z"
        })).unwrap();
        assert!(!record.passed());
        assert_eq!(record.production_order.unwrap().product.unwrap().code, "P-3");
    }

    #[test]
    fn statistics_query_skips_empty_bounds() {
        assert!(QualityStatisticsQuery::default().to_query().is_empty());

        let query = QualityStatisticsQuery {
            end_date: NaiveDate::from_ymd_opt(2026, 2, 28),
            quality_standard_id: Some(3),
            ..Default::default()
        };
        assert_eq!(query.to_query(), vec![
            ("end_date".to_string(), "2026-02-28".to_string()),
            ("quality_standard_id".to_string(), "3".to_string()),
        ]);
    }
}
