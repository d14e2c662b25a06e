//! # API del plano visual
//!
//! Vista de solo lectura del salón: cada mesa con su sesión activa y su
//! próxima reserva, más el panel de las cinco reservas más cercanas. La
//! selección y el orden los hace [`crate::domain::floor`]; aquí solo se
//! cargan los datos y se da forma a la respuesta.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use mongodb::bson::{doc, Bson};
use serde::Serialize;

use super::middleware::extract_token;
use super::reservation::ReservaResponse;
use super::restaurant::validate_access_token;
use super::table::{MesaResponse, SesionResponse};
use super::{AppError, AppResult};
use crate::db::{Mesa, MongoRepo, Reserva, Sesion};
use crate::domain::{self, EstadoReserva};

/// Una mesa del plano con su contexto en vivo
#[derive(Serialize)]
struct MesaPlanoResponse {
    mesa: MesaResponse,
    sesion_actual: Option<SesionResponse>,
    proxima_reserva: Option<ReservaResponse>,
}

/// Respuesta completa del plano del salón
#[derive(Serialize)]
struct PlanoResponse {
    mesas: Vec<MesaPlanoResponse>,
    /// Las cinco reservas más cercanas de todo el salón, ascendentes por fecha
    proximas_reservas: Vec<ReservaResponse>,
}

async fn load_mesas(repo: &MongoRepo, filter: mongodb::bson::Document) -> AppResult<Vec<Mesa>> {
    let mut cursor = repo
        .mesas()
        .find(filter)
        .sort(doc! { "nombre": 1 })
        .await
        .map_err(|e| AppError::database("visual_mesas", e))?;

    let mut mesas = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::Internal(format!("Error iterando cursor: {}", e)))?
    {
        mesas.push(
            cursor
                .deserialize_current()
                .map_err(|e| AppError::Internal(format!("Error deserializando mesa: {}", e)))?,
        );
    }
    Ok(mesas)
}

async fn load_sesiones_activas(
    repo: &MongoRepo,
    filter: mongodb::bson::Document,
) -> AppResult<Vec<Sesion>> {
    let mut cursor = repo
        .sesiones()
        .find(filter)
        .await
        .map_err(|e| AppError::database("visual_sesiones", e))?;

    let mut sesiones = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::Internal(format!("Error iterando cursor: {}", e)))?
    {
        sesiones.push(
            cursor
                .deserialize_current()
                .map_err(|e| AppError::Internal(format!("Error deserializando sesión: {}", e)))?,
        );
    }
    Ok(sesiones)
}

async fn load_reservas(
    repo: &MongoRepo,
    filter: mongodb::bson::Document,
) -> AppResult<Vec<Reserva>> {
    let mut cursor = repo
        .reservas()
        .find(filter)
        .sort(doc! { "fecha_hora": 1 })
        .await
        .map_err(|e| AppError::database("visual_reservas", e))?;

    let mut reservas = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::Internal(format!("Error iterando cursor: {}", e)))?
    {
        reservas.push(
            cursor
                .deserialize_current()
                .map_err(|e| AppError::Internal(format!("Error deserializando reserva: {}", e)))?,
        );
    }
    Ok(reservas)
}

/// Plano del salón en vivo
///
/// # Autenticación
/// Requiere token Bearer válido del restaurante.
///
/// # Respuesta
/// ```json
/// {
///   "mesas": [
///     {
///       "mesa": { "id": "...", "nombre": "T01", "estado": "ocupada", ... },
///       "sesion_actual": { "inicio": 1700000000, "numero_personas": 3, ... },
///       "proxima_reserva": { "fecha": "2026-08-07", "hora": "21:00", ... }
///     }
///   ],
///   "proximas_reservas": [ ... ]
/// }
/// ```
///
/// # Errores
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `500 Internal Server Error`: Error de base de datos
#[get("/visual")]
async fn get_visual(repo: web::Data<MongoRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;
    let ahora = MongoRepo::current_timestamp();

    let mesas = load_mesas(repo.get_ref(), doc! { "id_restaurante": restaurante_id }).await?;
    let sesiones = load_sesiones_activas(
        repo.get_ref(),
        doc! { "id_restaurante": restaurante_id, "fin": Bson::Null },
    )
    .await?;
    let reservas = load_reservas(
        repo.get_ref(),
        doc! {
            "id_restaurante": restaurante_id,
            "fecha_hora": { "$gte": ahora },
            "estado": { "$nin": [
                EstadoReserva::Cancelada.as_str(),
                EstadoReserva::Completada.as_str(),
            ] },
        },
    )
    .await?;

    let plano = domain::build_floor_plan(mesas, sesiones, reservas, ahora);

    let respuesta = PlanoResponse {
        mesas: plano
            .mesas
            .into_iter()
            .map(|p| MesaPlanoResponse {
                mesa: MesaResponse::from(p.mesa),
                sesion_actual: p.sesion_actual.map(SesionResponse::from),
                proxima_reserva: p.proxima_reserva.map(ReservaResponse::from),
            })
            .collect(),
        proximas_reservas: plano
            .proximas_reservas
            .into_iter()
            .map(ReservaResponse::from)
            .collect(),
    };

    Ok(HttpResponse::Ok().json(respuesta))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_visual);
}
