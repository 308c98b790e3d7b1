//! Contexto de aplicación (estado compartido).
//!
//! `AppContext` agrupa las piezas que las tareas concurrentes comparten: la
//! configuración, el transporte HTTP y el controlador de sesión. Los
//! controladores de listas se crean a demanda y reciben el mismo transporte y
//! la sesión como observador de fallos de autenticación.


use std::sync::Arc;
use crate::resource::domain::Resource;
use crate::resource::logic::ResourceListController;
use crate::session::logic::{AuthObserver, SessionCell, SessionController};
use crate::session::storage::{FileTokenStore, TokenStore};
use crate::system::domain::System;
use crate::transport::domain::{ApiError, Transport};
use crate::transport::logic::HttpTransport;


#[derive(Clone)]
pub struct AppContext {
    pub system: Arc<System>,
    pub session: Arc<SessionController>,
    pub transport: Arc<dyn Transport>,
}


impl AppContext {
    /// Ensambla el contexto con el transporte HTTP y el token en disco.
    pub fn new(system: System) -> Result<Self, ApiError> {
        let cell = SessionCell::new();
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&system, cell.reader())?);
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(system.token_path.clone()));
        Ok(Self::with_parts(system, cell, store, transport))
    }

    /// Ensambla el contexto con piezas provistas por el llamador.
    ///
    /// `cell` debe ser la misma celda de la que el transporte lee el token.
    pub fn with_parts(system: System,
                      cell: SessionCell,
                      store: Arc<dyn TokenStore>,
                      transport: Arc<dyn Transport>) -> Self {

        let session = Arc::new(SessionController::new(cell, store, Arc::clone(&transport)));
        Self {
            system: Arc::new(system),
            session,
            transport,
        }
    }

    /// Nuevo controlador de listado para `R`, con el tamaño de página configurado.
    pub fn list_controller<R: Resource>(&self) -> ResourceListController<R> {
        let auth: Arc<dyn AuthObserver> = self.session.clone();
        ResourceListController::new(Arc::clone(&self.transport), auth, self.system.default_page_size)
    }
}
