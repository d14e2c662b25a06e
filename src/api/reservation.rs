//! # API de Reservas
//!
//! Este módulo maneja todas las operaciones relacionadas con reservas:
//! - Crear nuevas reservas (quedan confirmadas y retienen la mesa)
//! - Listar reservas con filtros opcionales
//! - Check-in cuando el cliente llega
//! - Confirmar, completar y cancelar reservas
//!
//! Todas las operaciones requieren autenticación mediante token Bearer.
//! Las transiciones de estado se validan contra la tabla de
//! [`crate::domain::EstadoReserva`]; las que tocan también la mesa corren en
//! una transacción vía [`crate::db::lifecycle`].

use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::{NaiveDate, NaiveTime};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::middleware::extract_token;
use super::restaurant::validate_access_token;
use super::{AppError, AppResult};
use crate::db::lifecycle::{self, NuevaReserva};
use crate::db::{MongoRepo, Reserva};
use crate::domain::EstadoReserva;

/// Estructura para crear una nueva reserva
///
/// Contiene toda la información necesaria para realizar una reserva:
/// mesa, datos del cliente, fecha/hora y número de comensales.
#[derive(Deserialize)]
struct MakeReservation {
    /// ID de la mesa a reservar (ObjectId como string)
    id_mesa: String,
    /// Nombre completo del cliente
    nombre_cliente: String,
    /// Teléfono del cliente
    telefono_cliente: String,
    /// Número de comensales
    numero_personas: i32,
    /// Fecha de la reserva (formato YYYY-MM-DD)
    fecha: String,
    /// Hora de la reserva (formato HH:MM)
    hora: String,
}

/// Estructura de respuesta para una reserva
///
/// Versión simplificada del modelo Reserva para envío al frontend,
/// con ObjectIds convertidos a strings y la fecha en dos campos legibles.
#[derive(Serialize)]
pub(crate) struct ReservaResponse {
    /// ID único de la reserva (ObjectId convertido a string)
    pub id: String,
    /// ID de la mesa reservada (ObjectId convertido a string)
    pub id_mesa: String,
    /// Nombre del cliente
    pub nombre_cliente: String,
    /// Teléfono del cliente
    pub telefono_cliente: String,
    /// Número de comensales
    pub numero_personas: i32,
    /// Fecha de la reserva (YYYY-MM-DD, UTC)
    pub fecha: String,
    /// Hora de la reserva (HH:MM, UTC)
    pub hora: String,
    /// Momento de la reserva como timestamp unix
    pub fecha_hora: i64,
    /// Estado actual ("pendiente", "confirmada", "llegada", "cancelada", "completada")
    pub estado: String,
}

/// Parámetros de consulta para listar reservas
#[derive(Deserialize)]
struct ReservationQuery {
    /// Filtrar por estado ("pendiente", "confirmada", "llegada", "cancelada", "completada")
    estado: Option<String>,
    /// Si es `true`, solo reservas próximas (fecha futura y estado vivo)
    proximas: Option<bool>,
}

/// Valida y parsea una fecha en formato YYYY-MM-DD
///
/// # Errores
/// - `Validation`: Si el formato de fecha es incorrecto
fn validate_date(date_str: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Formato de fecha inválido, use YYYY-MM-DD".to_string()))
}

/// Valida y parsea una hora en formato HH:MM
///
/// # Errores
/// - `Validation`: Si el formato de hora es incorrecto
fn validate_time(time_str: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .map_err(|_| AppError::Validation("Formato de hora inválido, use HH:MM".to_string()))
}

/// Combina fecha y hora validadas en un timestamp unix (UTC)
fn combine_fecha_hora(fecha: NaiveDate, hora: NaiveTime) -> i64 {
    fecha.and_time(hora).and_utc().timestamp()
}

/// Convierte un modelo Reserva interno a la respuesta del API
impl From<Reserva> for ReservaResponse {
    fn from(reserva: Reserva) -> Self {
        let momento = chrono::DateTime::from_timestamp(reserva.fecha_hora, 0)
            .unwrap_or_else(|| chrono::DateTime::UNIX_EPOCH);
        ReservaResponse {
            id: reserva.id.unwrap().to_hex(),
            id_mesa: reserva.id_mesa.to_hex(),
            nombre_cliente: reserva.nombre_cliente,
            telefono_cliente: reserva.telefono_cliente,
            numero_personas: reserva.numero_personas,
            fecha: momento.format("%Y-%m-%d").to_string(),
            hora: momento.format("%H:%M").to_string(),
            fecha_hora: reserva.fecha_hora,
            estado: reserva.estado.to_string(),
        }
    }
}

fn parse_reserva_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw)
        .map_err(|_| AppError::Validation("ID de reserva inválido".to_string()))
}

/// Crea una nueva reserva
///
/// La reserva queda en estado `confirmada` y, si la mesa asignada estaba
/// `disponible`, la mesa pasa a `reservada` dentro de la misma transacción.
///
/// # Autenticación
/// Requiere token Bearer válido del restaurante.
///
/// # Validaciones
/// - Nombre del cliente no puede estar vacío
/// - Teléfono no puede estar vacío
/// - Número de personas entre 1 y 20
/// - Fecha debe ser válida (YYYY-MM-DD)
/// - Hora debe ser válida (HH:MM)
/// - El momento de la reserva debe ser estrictamente futuro
/// - La mesa debe existir y pertenecer al restaurante
///
/// A propósito no se comprueba ni la capacidad de la mesa ni el solape con
/// otras reservas: ambas decisiones quedan a criterio del personal.
///
/// # Respuesta
/// ```json
/// {
///   "message": "Reserva creada correctamente",
///   "id": "507f1f77bcf86cd799439011",
///   "estado": "confirmada"
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: Datos de validación incorrectos
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Mesa no encontrada
/// - `500 Internal Server Error`: Error de base de datos
#[post("/reservations")]
async fn make_reservation(
    repo: web::Data<MongoRepo>,
    data: web::Json<MakeReservation>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;

    // Validaciones de entrada
    if data.nombre_cliente.trim().is_empty() {
        return Err(AppError::Validation(
            "El nombre del cliente es requerido".to_string(),
        ));
    }

    if data.telefono_cliente.trim().is_empty() {
        return Err(AppError::Validation(
            "El teléfono del cliente es requerido".to_string(),
        ));
    }

    if data.numero_personas < 1 || data.numero_personas > 20 {
        return Err(AppError::Validation(
            "El número de personas debe estar entre 1 y 20".to_string(),
        ));
    }

    // Validar formato de fecha y hora
    let fecha = validate_date(&data.fecha)?;
    let hora = validate_time(&data.hora)?;
    let fecha_hora = combine_fecha_hora(fecha, hora);

    if fecha_hora <= MongoRepo::current_timestamp() {
        return Err(AppError::Validation(
            "La reserva debe ser para un momento futuro".to_string(),
        ));
    }

    // Convertir id_mesa a ObjectId
    let id_mesa = ObjectId::parse_str(&data.id_mesa)
        .map_err(|_| AppError::Validation("ID de mesa inválido".to_string()))?;

    let reserva = lifecycle::create_reservation(
        repo.get_ref(),
        restaurante_id,
        NuevaReserva {
            id_mesa,
            nombre_cliente: data.nombre_cliente.trim().to_string(),
            telefono_cliente: data.telefono_cliente.trim().to_string(),
            numero_personas: data.numero_personas,
            fecha_hora,
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Reserva creada correctamente",
        "id": reserva.id.unwrap().to_hex(),
        "estado": reserva.estado.as_str()
    })))
}

/// Lista las reservas de un restaurante con filtros opcionales
///
/// # Autenticación
/// Requiere token Bearer válido del restaurante.
///
/// # Filtros disponibles
/// - `estado`: Filtrar por estado de la reserva
/// - `proximas=true`: Solo reservas con fecha futura y estado vivo
///
/// Las reservas se devuelven ascendentes por fecha (las más cercanas
/// primero).
///
/// # Errores
/// - `400 Bad Request`: Filtro de estado inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `500 Internal Server Error`: Error de base de datos
#[get("/reservations")]
async fn get_reservations(
    repo: web::Data<MongoRepo>,
    query: web::Query<ReservationQuery>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let user_id = validate_access_token(repo.get_ref(), &token).await?;

    // Construir filtro dinámico basado en parámetros
    let mut filter = doc! { "id_restaurante": user_id };

    if query.proximas.unwrap_or(false) {
        filter.insert("fecha_hora", doc! { "$gte": MongoRepo::current_timestamp() });
        filter.insert(
            "estado",
            doc! { "$nin": [
                EstadoReserva::Cancelada.as_str(),
                EstadoReserva::Completada.as_str(),
            ] },
        );
    }

    // Un filtro de estado explícito gana sobre el de "próximas"
    if let Some(estado) = &query.estado {
        let estado: EstadoReserva = estado
            .parse()
            .map_err(|e: String| AppError::validation_field("estado", &e))?;
        filter.insert("estado", estado.as_str());
    }

    let reservas = repo.reservas();
    let mut cursor = reservas
        .find(filter)
        .sort(doc! { "fecha_hora": 1 })
        .await
        .map_err(|e| AppError::database("list_reservations", e))?;

    let mut results = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::Internal(format!("Error iterando cursor: {}", e)))?
    {
        let reserva = cursor
            .deserialize_current()
            .map_err(|e| AppError::Internal(format!("Error deserializando reserva: {}", e)))?;
        results.push(ReservaResponse::from(reserva));
    }

    Ok(HttpResponse::Ok().json(results))
}

/// Detalle de una reserva
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Reserva no encontrada en este restaurante
#[get("/reservations/{id}")]
async fn get_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let user_id = validate_access_token(repo.get_ref(), &token).await?;
    let reservation_id = parse_reserva_id(&path.into_inner())?;

    let reserva = repo
        .reservas()
        .find_one(doc! { "_id": reservation_id, "id_restaurante": user_id })
        .await
        .map_err(|e| AppError::database("get_reservation", e))?
        .ok_or_else(|| AppError::not_found_id("Reserva", &reservation_id.to_hex()))?;

    Ok(HttpResponse::Ok().json(ReservaResponse::from(reserva)))
}

/// Check-in: marca que el cliente de la reserva llegó
///
/// La reserva pasa a `llegada` y su mesa a `ocupada` en una sola
/// transacción. Este paso no abre sesión de comida; eso lo decide el
/// personal al sentar al grupo desde el plano.
///
/// # Respuesta
/// ```json
/// {
///   "message": "Cliente marcado como llegado",
///   "id": "507f1f77bcf86cd799439011",
///   "estado": "llegada"
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Reserva no encontrada
/// - `409 Conflict`: La reserva no admite check-in (cancelada/completada)
#[post("/reservations/{id}/checkin")]
async fn checkin_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let user_id = validate_access_token(repo.get_ref(), &token).await?;
    let reservation_id = parse_reserva_id(&path.into_inner())?;

    let reserva = lifecycle::checkin_reservation(repo.get_ref(), user_id, reservation_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Cliente marcado como llegado",
        "id": reservation_id.to_hex(),
        "estado": reserva.estado.as_str()
    })))
}

/// Confirma una reserva pendiente
///
/// Cambia el estado de una reserva de "pendiente" a "confirmada".
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Reserva no encontrada
/// - `409 Conflict`: La reserva no está pendiente
#[post("/reservations/{id}/confirm")]
async fn confirm_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let user_id = validate_access_token(repo.get_ref(), &token).await?;
    let reservation_id = parse_reserva_id(&path.into_inner())?;

    let reserva = lifecycle::transition_reservation(
        repo.get_ref(),
        user_id,
        reservation_id,
        EstadoReserva::Confirmada,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Reserva confirmada correctamente",
        "id": reservation_id.to_hex(),
        "estado": reserva.estado.as_str()
    })))
}

/// Completa una reserva cuya visita terminó
///
/// Cambia el estado de "llegada" a "completada"; la reserva deja de contar
/// como próxima.
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Reserva no encontrada
/// - `409 Conflict`: La reserva no está en estado "llegada"
#[post("/reservations/{id}/complete")]
async fn complete_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let user_id = validate_access_token(repo.get_ref(), &token).await?;
    let reservation_id = parse_reserva_id(&path.into_inner())?;

    let reserva = lifecycle::transition_reservation(
        repo.get_ref(),
        user_id,
        reservation_id,
        EstadoReserva::Completada,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Reserva completada",
        "id": reservation_id.to_hex(),
        "estado": reserva.estado.as_str()
    })))
}

/// Cancela una reserva
///
/// La reserva pasa a `cancelada`. Si su mesa estaba `reservada` y ninguna
/// otra reserva próxima la retiene, la mesa vuelve a `disponible` en la
/// misma transacción.
///
/// # Respuesta
/// ```json
/// {
///   "message": "Reserva cancelada correctamente",
///   "id": "507f1f77bcf86cd799439011",
///   "estado": "cancelada"
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: ID de reserva inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Reserva no encontrada
/// - `409 Conflict`: La reserva ya estaba cancelada o completada
#[post("/reservations/{id}/cancel")]
async fn cancel_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let user_id = validate_access_token(repo.get_ref(), &token).await?;
    let reservation_id = parse_reserva_id(&path.into_inner())?;

    let reserva = lifecycle::cancel_reservation(repo.get_ref(), user_id, reservation_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Reserva cancelada correctamente",
        "id": reservation_id.to_hex(),
        "estado": reserva.estado.as_str()
    })))
}

/// Configura las rutas relacionadas con reservas
///
/// # Rutas disponibles
/// - `POST /reservations` - Crear nueva reserva (queda confirmada)
/// - `GET /reservations` - Listar reservas con filtros opcionales
/// - `GET /reservations/{id}` - Detalle de una reserva
/// - `POST /reservations/{id}/checkin` - Check-in del cliente
/// - `POST /reservations/{id}/confirm` - Confirmar reserva pendiente
/// - `POST /reservations/{id}/complete` - Completar la visita
/// - `POST /reservations/{id}/cancel` - Cancelar reserva
///
/// # Autenticación
/// Todas las rutas requieren autenticación Bearer token.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(make_reservation);
    cfg.service(get_reservations);
    cfg.service(checkin_reservation);
    cfg.service(confirm_reservation);
    cfg.service(complete_reservation);
    cfg.service(cancel_reservation);
    cfg.service(get_reservation);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fecha_valida_se_parsea() {
        assert!(validate_date("2026-12-25").is_ok());
        assert!(validate_date("25/12/2026").is_err());
        assert!(validate_date("2026-13-01").is_err());
    }

    #[test]
    fn hora_valida_se_parsea() {
        assert!(validate_time("20:30").is_ok());
        assert!(validate_time("24:00").is_err());
        assert!(validate_time("ocho y media").is_err());
    }

    #[test]
    fn fecha_y_hora_combinan_en_utc() {
        let fecha = validate_date("2026-01-01").unwrap();
        let hora = validate_time("00:00").unwrap();
        // 2026-01-01T00:00:00Z
        assert_eq!(combine_fecha_hora(fecha, hora), 1_767_225_600);
    }
}
