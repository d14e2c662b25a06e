//! # Módulo API
//!
//! Este módulo contiene todas las rutas y controladores de la API REST.
//!
//! ## Módulos principales
//!
//! - [`restaurant`] - Gestión de restaurantes (registro, login, tokens)
//! - [`table`] - Gestión de mesas (crear, listar, estado, sentar walk-ins)
//! - [`reservation`] - Gestión de reservas (crear, check-in, cancelar, completar)
//! - [`visual`] - Plano visual del salón
//! - [`errors`] - Manejo de errores de la aplicación

pub mod errors;
mod middleware;
pub mod reservation;
pub mod restaurant;
pub mod table;
pub mod visual;

// Re-exportar tipos comunes para facilitar su uso
pub use errors::{AppError, AppResult, ErrorResponse};

use actix_web::{get, web, HttpResponse, Responder};

/// Sonda de liveness
#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": crate::db::MongoRepo::current_timestamp(),
    }))
}

/// Configura todas las rutas de la API
///
/// Esta función centraliza la configuración de todas las rutas disponibles:
///
/// ## Rutas configuradas
///
/// - `/health` - Sonda de liveness
/// - `/restaurants/*` - Ver [`restaurant::routes`]
/// - `/tables/*` - Ver [`table::routes`]
/// - `/reservations/*` - Ver [`reservation::routes`]
/// - `/visual` - Ver [`visual::routes`]
///
/// # Parámetros
///
/// - `cfg`: Configuración del servicio Actix Web donde se registran las rutas
///
/// # Ejemplo
///
/// ```no_run
/// use actix_web::{web, App};
/// use pispas_salon::api;
///
/// let app = App::new()
///     .configure(api::init_routes);
/// ```
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
    reservation::routes(cfg);
    restaurant::routes(cfg);
    table::routes(cfg);
    visual::routes(cfg);
}
