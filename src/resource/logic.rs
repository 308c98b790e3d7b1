//! Controlador genérico de listados paginados.
//!
//! Una instancia por tipo de recurso. Es dueño de la página visible, los
//! filtros, el cursor y el registro en edición; la capa de presentación sólo
//! lee ese estado y despacha intenciones.
//!
//! # Respuestas obsoletas
//! Cada consulta se etiqueta con el `Snapshot` vigente al emitirla. Al
//! resolverse sólo se aplica si ese snapshot sigue siendo el actual y ninguna
//! consulta posterior con el mismo snapshot se aplicó antes. Las consultas
//! obsoletas no se cancelan: terminan y se descartan.
//!
//! # Mutaciones
//! `create`, `update` y `delete` nunca tocan `items`. El llamador vuelve a
//! ejecutar `fetch` para obtener ids, totales y orden del servidor.


use std::marker::PhantomData;
use std::sync::Arc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use crate::session::logic::AuthObserver;
use crate::transport::domain::{ApiError, ApiRequest, Transport};
use super::domain::{DeleteAck, FetchOutcome, FilterSet, FilterUpdate, Page, PageCursor, Resource, Snapshot};


struct ListState<T> {
    items: Vec<T>,
    filters: FilterSet,
    cursor: PageCursor,
    editing: Option<T>,
    in_flight: usize,
    issued: u64,
    last_applied: Option<(Snapshot, u64)>,
}


impl<T> ListState<T> {
    fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            filters: FilterSet::new(),
            cursor: PageCursor::new(page_size),
            editing: None,
            in_flight: 0,
            issued: 0,
            last_applied: None,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(&self.filters, &self.cursor)
    }

    /// `items` corresponde a los filtros y la página actuales.
    fn showing_current(&self) -> bool {
        self.last_applied
            .as_ref()
            .is_some_and(|(applied, _)| *applied == self.snapshot())
    }

    fn is_current(&self, snapshot: &Snapshot, seq: u64) -> bool {
        if self.snapshot() != *snapshot {
            return false;
        }
        match &self.last_applied {
            Some((applied, applied_seq)) if applied == snapshot => *applied_seq < seq,
            _ => true,
        }
    }
}


/// Dueño del estado de un listado paginado de `R`.
///
/// Todas las operaciones toman `&self`: varias consultas pueden estar en
/// vuelo a la vez y el estado vive detrás de un `RwLock` que nunca se retiene
/// mientras se espera al transporte.
pub struct ResourceListController<R: Resource> {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthObserver>,
    state: RwLock<ListState<R::Response>>,
    _resource: PhantomData<fn() -> R>,
}


impl<R: Resource> ResourceListController<R> {

    /// Crea un controlador vacío, en la primera página y sin filtros.
    ///
    /// # Argumentos
    /// * `transport`: transporte compartido con el resto de los controladores.
    /// * `auth`: receptor de los `ApiError::Auth` (normalmente la sesión).
    /// * `page_size`: tamaño de página inicial; se ajusta a `1..=100`.
    pub fn new(transport: Arc<dyn Transport>,
               auth: Arc<dyn AuthObserver>,
               page_size: u32) -> Self {
        Self {
            transport,
            auth,
            state: RwLock::new(ListState::new(page_size)),
            _resource: PhantomData,
        }
    }

    // Estado observable.

    /// Copia de la última página aplicada.
    pub async fn items(&self) -> Vec<R::Response> {
        self.state.read().await.items.clone()
    }

    pub async fn total(&self) -> u64 {
        self.state.read().await.cursor.total()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.in_flight > 0
    }

    pub async fn editing(&self) -> Option<R::Response> {
        self.state.read().await.editing.clone()
    }

    pub async fn filters(&self) -> FilterSet {
        self.state.read().await.filters.clone()
    }

    pub async fn cursor(&self) -> PageCursor {
        self.state.read().await.cursor
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot()
    }

    // Intenciones sin E/S.

    /// Combina `update` con los filtros activos. No dispara una consulta.
    ///
    /// # Errores
    /// * `ApiError::Validation` si alguna clave no pertenece al recurso; en ese
    ///   caso los filtros no cambian.
    pub async fn set_filters(&self, update: FilterUpdate) -> Result<(), ApiError> {
        if let Some(key) = update.keys().find(|key| !R::FILTER_KEYS.iter().any(|allowed| allowed == key)) {
            return Err(ApiError::Validation(format!("filtro desconocido para {}: {}", R::NAME, key)));
        }
        self.state.write().await.filters.apply(update);
        Ok(())
    }

    pub async fn clear_filters(&self) {
        self.state.write().await.filters.clear();
    }

    /// Mueve el cursor. `page = 0` se ajusta a `1`; un cambio de tamaño vuelve
    /// a la primera página.
    pub async fn set_page(&self, page: u32, page_size: Option<u32>) {
        self.state.write().await.cursor.set(page, page_size);
    }

    pub async fn begin_edit(&self, record: Option<R::Response>) {
        self.state.write().await.editing = record;
    }

    pub async fn cancel_edit(&self) {
        self.state.write().await.editing = None;
    }

    // Operaciones con E/S.

    /// Consulta la página actual con los filtros actuales.
    ///
    /// # Flujo de Trabajo
    /// 1. Toma el `Snapshot` vigente y le asigna un número de secuencia.
    /// 2. Emite `GET <PATH>?page&page_size&<filtros>` sin retener el estado.
    /// 3. Al volver, aplica la página sólo si el snapshot sigue vigente y no
    ///    se aplicó ya una consulta posterior con el mismo snapshot.
    ///
    /// # Errores
    /// Cualquier `ApiError` del transporte; `Unknown` si la página no se puede
    /// decodificar. Un error nunca modifica `items` ni `total`.
    #[instrument(name = "list_fetch", skip(self), fields(resource = R::NAME))]
    pub async fn fetch(&self) -> Result<FetchOutcome<R::Response>, ApiError> {
        let (snapshot, seq) = {
            let mut state = self.state.write().await;
            state.in_flight += 1;
            state.issued += 1;
            (state.snapshot(), state.issued)
        };

        let request = ApiRequest::get(R::PATH).with_query(snapshot.to_query());
        let result = self.send(request).await.and_then(decode_page::<R>);

        let mut state = self.state.write().await;
        state.in_flight = state.in_flight.saturating_sub(1);

        let page = result?;
        if !state.is_current(&snapshot, seq) {
            debug!("Debug: respuesta obsoleta de {} descartada (consulta #{})", R::NAME, seq);
            return Ok(FetchOutcome::Discarded);
        }

        state.items = page.list.clone();
        state.cursor.set_total(page.total);
        state.last_applied = Some((snapshot, seq));
        debug!("Debug: {} items de {} aplicados, total {}", page.list.len(), R::NAME, page.total);
        Ok(FetchOutcome::Applied(page))
    }

    /// Detalle de un registro (`GET <PATH>/{id}`). No modifica el estado.
    ///
    /// # Errores
    /// `ApiError::NotFound` si el id no existe; un `Auth` cierra la sesión.
    #[instrument(name = "list_get", skip(self), fields(resource = R::NAME))]
    pub async fn get(&self, id: u64) -> Result<R::Response, ApiError> {
        let data = self.send(ApiRequest::get(R::item_path(id))).await?;
        decode_record::<R>(data)
    }

    /// Crea un registro. El llamador debe volver a consultar la lista.
    ///
    /// # Argumentos
    /// * `payload`: borrador completo; se valida con `R::validate` antes de
    ///   emitir `POST <PATH>`.
    ///
    /// # Errores
    /// * `ApiError::Validation` local o del servidor.
    /// * `ApiError::Conflict` si el código ya existe.
    #[instrument(name = "list_create", skip(self, payload), fields(resource = R::NAME))]
    pub async fn create(&self, payload: &R::Request) -> Result<R::Response, ApiError> {
        R::validate(payload)?;
        let body = to_body(payload)?;
        let data = self.send(ApiRequest::post(R::PATH).with_body(body)).await?;
        let record = decode_record::<R>(data)?;
        info!("Info: {} {} creado", R::NAME, R::id(&record));
        Ok(record)
    }

    /// Actualiza un registro. El llamador debe volver a consultar la lista.
    ///
    /// # Argumentos
    /// * `id`: registro a modificar.
    /// * `patch`: sólo los campos presentes se envían en `PUT <PATH>/{id}`.
    #[instrument(name = "list_update", skip(self, patch), fields(resource = R::NAME))]
    pub async fn update(&self, id: u64, patch: &R::Patch) -> Result<R::Response, ApiError> {
        let body = to_body(patch)?;
        let data = self.send(ApiRequest::put(R::item_path(id)).with_body(body)).await?;
        let record = decode_record::<R>(data)?;
        info!("Info: {} {} actualizado", R::NAME, id);
        Ok(record)
    }

    /// Borra un registro. El llamador debe volver a consultar la lista.
    ///
    /// Si el registro era el único de la página mostrada, esa página es la
    /// actual y no es la primera, el cursor retrocede una página para que la
    /// siguiente consulta no quede vacía.
    #[instrument(name = "list_delete", skip(self), fields(resource = R::NAME))]
    pub async fn delete(&self, id: u64) -> Result<DeleteAck, ApiError> {
        self.send(ApiRequest::delete(R::item_path(id))).await?;

        let mut state = self.state.write().await;
        let emptied = state.showing_current()
            && !state.items.is_empty()
            && state.items.iter().all(|item| R::id(item) == id);
        let page_rewound = emptied && state.cursor.rewind();
        if page_rewound {
            debug!("Debug: página vaciada, retrocediendo a la página {}", state.cursor.page());
        }
        info!("Info: {} {} borrado", R::NAME, id);
        Ok(DeleteAck { id, page_rewound })
    }

    /// Envía el borrador del formulario: actualiza el registro en edición o
    /// crea uno nuevo. Al terminar bien, sale del modo edición.
    ///
    /// # Errores
    /// * `ApiError::Validation` si el borrador no pasa `R::validate`; en ese
    ///   caso no se emite ninguna petición.
    /// * Los errores de `update` o `create`; el registro sigue en edición.
    pub async fn submit(&self, draft: R::Request) -> Result<R::Response, ApiError> {
        R::validate(&draft)?;
        let editing_id = self.state.read().await.editing.as_ref().map(R::id);

        let record = match editing_id {
            Some(id) => self.update(id, &R::Patch::from(draft)).await?,
            None => self.create(&draft).await?,
        };

        let mut state = self.state.write().await;
        if state.editing.as_ref().map(R::id) == editing_id {
            state.editing = None;
        }
        Ok(record)
    }

    /// Lectura auxiliar del listado (estadísticas, alertas, catálogos). No
    /// modifica el estado, pero un `Auth` también cierra la sesión.
    pub(crate) async fn read<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let data = self.send(request).await?;
        serde_json::from_value(data)
            .map_err(|e| ApiError::Unknown(format!("respuesta auxiliar de {} inválida: {e}", R::NAME)))
    }

    /// Como `read`, para listas: el backend envía `null` en lugar de `[]`.
    pub(crate) async fn read_list<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<T>, ApiError> {
        self.read::<Option<Vec<T>>>(request).await.map(Option::unwrap_or_default)
    }

    // Toda petición pasa por aquí para reenviar los fallos de autenticación.
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        match self.transport.request(request).await {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_auth() {
                    warn!("Warning: {} recibió un error de autenticación, se avisa a la sesión", R::NAME);
                    self.auth.on_auth_failure().await;
                }
                Err(e)
            }
        }
    }
}


fn to_body<S: Serialize>(payload: &S) -> Result<Value, ApiError> {
    serde_json::to_value(payload)
        .map_err(|e| ApiError::Validation(format!("carga no serializable: {e}")))
}


fn decode_page<R: Resource>(data: Value) -> Result<Page<R::Response>, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::Unknown(format!("página de {} inválida: {e}", R::NAME)))
}


fn decode_record<R: Resource>(data: Value) -> Result<R::Response, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::Unknown(format!("registro de {} inválido: {e}", R::NAME)))
}
