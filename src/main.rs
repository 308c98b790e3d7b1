use std::env;
use tracing::{error, info, warn};
use mes_client::context::domain::AppContext;
use mes_client::resource::catalog::{Equipment, MaintenanceRecord, Material, ProductionOrder, QualityInspection};
use mes_client::resource::domain::Resource;
use mes_client::session::logic::start_session_watch;
use mes_client::system::domain::{init_tracing, log_startup, System};


#[tokio::main]
async fn main() {

    let system = match System::new() {
        Ok(system) => system,
        Err(e) => {
            eprintln!("Error: configuración inválida: {e}");
            return;
        }
    };
    init_tracing(&system);
    log_startup(&system);

    let app_context = match AppContext::new(system) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error: no se pudo crear el contexto: {}", e);
            return;
        }
    };

    start_session_watch(&app_context.session);

    if !open_session(&app_context).await {
        warn!("Warning: sin sesión válida; definir MES_USERNAME y MES_PASSWORD para iniciarla");
        return;
    }

    report::<Equipment>(&app_context).await;
    report::<MaintenanceRecord>(&app_context).await;
    report::<Material>(&app_context).await;
    report::<ProductionOrder>(&app_context).await;
    report::<QualityInspection>(&app_context).await;
}


/// Reanuda el token persistido y, si no sirve, inicia sesión con las
/// credenciales del entorno.
async fn open_session(ctx: &AppContext) -> bool {
    let resumed = ctx.session.resume_from_storage().await;
    if resumed.token.is_some() {
        match ctx.session.fetch_profile().await {
            Ok(user) => {
                info!("Info: sesión reanudada como {}", user.display_name());
                return true;
            }
            Err(e) => warn!("Warning: token persistido descartado: {}", e),
        }
    }

    let (Ok(username), Ok(password)) = (env::var("MES_USERNAME"), env::var("MES_PASSWORD")) else {
        return false;
    };

    match ctx.session.login(&username, &password).await {
        Ok(session) => {
            if let Some(user) = session.user {
                info!("Info: sesión iniciada como {}", user.display_name());
            }
            true
        }
        Err(e) => {
            error!("Error: login fallido: {}", e);
            false
        }
    }
}


async fn report<R: Resource>(ctx: &AppContext) {
    let list = ctx.list_controller::<R>();
    match list.fetch().await {
        Ok(outcome) if outcome.is_applied() => {
            info!("Info: {}: {} registros en total, {} en la primera página",
                  R::NAME, list.total().await, list.items().await.len());
        }
        Ok(_) => warn!("Warning: {}: respuesta descartada", R::NAME),
        Err(e) => error!("Error: {}: {}", R::NAME, e),
    }
}
