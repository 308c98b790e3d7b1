//! Dominio de los listados paginados.
//!
//! Define el contrato `Resource` que cada tipo de recurso implementa, el
//! conjunto de filtros, el cursor de paginación y el `Snapshot` con el que se
//! etiqueta cada consulta para detectar respuestas obsoletas.


use std::collections::BTreeMap;
use std::fmt::Debug;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::config::pagination::{FIRST_PAGE, MAX_PAGE_SIZE};
use crate::transport::domain::ApiError;


/// Error de validación local de un borrador de formulario.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}


impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}


impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e.to_string())
    }
}


/// Contrato de un tipo de recurso servido por la API REST.
///
/// * `Request`: carga de creación.
/// * `Patch`: carga de actualización parcial; todo `Request` es un `Patch` completo.
/// * `Response`: representación del servidor, con id y marcas de tiempo.
pub trait Resource: Send + Sync + 'static {
    type Request: Serialize + Clone + Send + Sync;
    type Patch: Serialize + From<Self::Request> + Send + Sync;
    type Response: DeserializeOwned + Clone + Debug + Send + Sync;

    /// Nombre legible, usado en los logs.
    const NAME: &'static str;

    /// Ruta base relativa a la URL de la API (ej. `/equipment`).
    const PATH: &'static str;

    /// Claves de filtro que acepta el listado.
    const FILTER_KEYS: &'static [&'static str];

    fn id(record: &Self::Response) -> u64;

    /// Validación pura del borrador antes de enviarlo.
    fn validate(draft: &Self::Request) -> Result<(), ValidationError>;

    fn item_path(id: u64) -> String {
        format!("{}/{}", Self::PATH, id)
    }
}


/// Valor escalar de un filtro.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterValue {
    Text(String),
    Id(u64),
    Date(NaiveDate),
}


impl FilterValue {
    /// Un texto vacío equivale a "sin restricción".
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(text) => text.trim().is_empty(),
            FilterValue::Id(_) | FilterValue::Date(_) => false,
        }
    }

    pub fn to_query_value(&self) -> String {
        match self {
            FilterValue::Text(text) => text.trim().to_string(),
            FilterValue::Id(id) => id.to_string(),
            FilterValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}


impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        FilterValue::Id(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}


/// Cambios parciales sobre un `FilterSet`.
///
/// `None` (o un texto vacío) elimina la restricción de esa clave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    changes: Vec<(String, Option<FilterValue>)>,
}


impl FilterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let value = match value.into() {
            FilterValue::Text(text) => FilterValue::Text(text.trim().to_string()),
            other => other,
        };
        let value = if value.is_empty() { None } else { Some(value) };
        self.changes.push((key.into(), value));
        self
    }

    pub fn set_optional<V: Into<FilterValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self.clear(key),
        }
    }

    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.changes.push((key.into(), None));
        self
    }

    /// Rango de fechas como las claves `start_date` / `end_date`.
    pub fn date_range(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.set_optional("start_date", start)
            .set_optional("end_date", end)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|(key, _)| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}


/// Filtros activos de un listado. Nunca contiene valores vacíos, de modo que
/// dos conjuntos que sólo difieren en valores vacíos son iguales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSet {
    values: BTreeMap<String, FilterValue>,
}


impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: FilterUpdate) {
        for (key, value) in update.changes {
            match value {
                Some(value) => {
                    self.values.insert(key, value);
                }
                None => {
                    self.values.remove(&key);
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_query_value()))
            .collect()
    }
}


/// Cursor de paginación. Invariante: `page >= 1` y `1 <= page_size <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageCursor {
    page: u32,
    page_size: u32,
    total: u64,
}


impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: FIRST_PAGE,
            page_size: clamp_page_size(page_size),
            total: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Mueve el cursor. Una página `0` se ajusta a `1`. Cambiar el tamaño de
    /// página vuelve a la primera página, ignorando `page`.
    pub fn set(&mut self, page: u32, page_size: Option<u32>) {
        let new_size = page_size.map(clamp_page_size).unwrap_or(self.page_size);
        if new_size != self.page_size {
            self.page_size = new_size;
            self.page = FIRST_PAGE;
            return;
        }
        self.page = page.max(FIRST_PAGE);
    }

    /// Retrocede una página, sin bajar de la primera. Devuelve si se movió.
    pub fn rewind(&mut self) -> bool {
        if self.page > FIRST_PAGE {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Cantidad de páginas según el último total conocido.
    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size))
    }
}


fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}


/// Triple `(filtros, página, tamaño)` con el que se emitió una consulta.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot {
    pub filters: FilterSet,
    pub page: u32,
    pub page_size: u32,
}


impl Snapshot {
    pub fn new(filters: &FilterSet, cursor: &PageCursor) -> Self {
        Self {
            filters: filters.clone(),
            page: cursor.page(),
            page_size: cursor.page_size(),
        }
    }

    /// Parámetros de consulta: `page`, `page_size` y luego los filtros.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ];
        query.extend(self.filters.to_query());
        query
    }
}


/// Página devuelta por el servidor: `{list, total, page, page_size}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty", bound(deserialize = "T: Deserialize<'de>"))]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}


// El backend serializa una lista vacía como `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}


/// Resultado de `fetch`.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// La respuesta correspondía al estado actual y se aplicó.
    Applied(Page<T>),
    /// La respuesta quedó obsoleta antes de llegar y se descartó.
    Discarded,
}


impl<T> FetchOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied(_))
    }

    pub fn into_page(self) -> Option<Page<T>> {
        match self {
            FetchOutcome::Applied(page) => Some(page),
            FetchOutcome::Discarded => None,
        }
    }
}


/// Confirmación de un borrado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteAck {
    pub id: u64,
    /// El registro era el único de la página y el cursor retrocedió una página.
    pub page_rewound: bool,
}


// Validaciones compartidas por el catálogo.

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "es obligatorio"));
    }
    Ok(())
}

pub(crate) fn require_id(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::new(field, "es obligatorio"));
    }
    Ok(())
}

pub(crate) fn require_one_of(field: &'static str, value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if !allowed.contains(&value) {
        return Err(ValidationError::new(field, format!("debe ser uno de {}", allowed.join(", "))));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(field, "no puede ser negativo"));
    }
    Ok(())
}
