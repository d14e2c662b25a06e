//! # API de Mesas
//!
//! Alta y consulta de mesas del salón, cambio de estado y sentado de
//! walk-ins. Los cambios de estado con efectos laterales (cerrar la sesión
//! al liberar la mesa, abrir una al sentar) se delegan en
//! [`crate::db::lifecycle`].

use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use mongodb::bson::{doc, oid::ObjectId, Bson};
use serde::{Deserialize, Serialize};

use super::middleware::extract_token;
use super::reservation::ReservaResponse;
use super::restaurant::validate_access_token;
use super::{AppError, AppResult};
use crate::db::{lifecycle, Mesa, MongoRepo, Sesion};
use crate::domain::{EstadoMesa, EstadoReserva};

#[derive(Deserialize)]
struct NewTable {
    nombre: String,
    capacidad: i32,
    pos_x: f32,
    pos_y: f32,
}

#[derive(Deserialize)]
struct SetStatusPayload {
    estado: String,
}

#[derive(Deserialize)]
struct SeatWalkinPayload {
    numero_personas: i32,
    nombre_cliente: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct MesaResponse {
    pub id: String,
    pub nombre: String,
    pub capacidad: i32,
    pub estado: String,
    pub pos_x: f32,
    pub pos_y: f32,
    pub id_sesion_actual: Option<String>,
}

impl From<Mesa> for MesaResponse {
    fn from(mesa: Mesa) -> Self {
        MesaResponse {
            id: mesa.id.unwrap().to_hex(),
            nombre: mesa.nombre,
            capacidad: mesa.capacidad,
            estado: mesa.estado.to_string(),
            pos_x: mesa.pos_x,
            pos_y: mesa.pos_y,
            id_sesion_actual: mesa.id_sesion_actual.map(|id| id.to_hex()),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct SesionResponse {
    pub id: String,
    pub id_mesa: String,
    pub inicio: i64,
    pub fin: Option<i64>,
    pub numero_personas: i32,
    pub nombre_cliente: Option<String>,
}

impl From<Sesion> for SesionResponse {
    fn from(sesion: Sesion) -> Self {
        SesionResponse {
            id: sesion.id.unwrap().to_hex(),
            id_mesa: sesion.id_mesa.to_hex(),
            inicio: sesion.inicio,
            fin: sesion.fin,
            numero_personas: sesion.numero_personas,
            nombre_cliente: sesion.nombre_cliente,
        }
    }
}

/// Detalle de una mesa con su contexto en vivo
#[derive(Serialize)]
struct TableDetailResponse {
    mesa: MesaResponse,
    sesion_actual: Option<SesionResponse>,
    proximas_reservas: Vec<ReservaResponse>,
}

fn parse_mesa_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::Validation("ID de mesa inválido".to_string()))
}

#[post("/tables")]
async fn create_table(
    repo: web::Data<MongoRepo>,
    data: web::Json<NewTable>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;

    if data.nombre.trim().is_empty() {
        return Err(AppError::Validation("El nombre de la mesa es requerido".to_string()));
    }

    if data.capacidad < 1 || data.capacidad > 20 {
        return Err(AppError::Validation(
            "La capacidad debe estar entre 1 y 20".to_string(),
        ));
    }

    let mesas = repo.mesas();

    // El nombre es único dentro del restaurante
    let existing = mesas
        .find_one(doc! { "id_restaurante": restaurante_id, "nombre": &data.nombre })
        .await
        .map_err(|e| AppError::database("check_mesa_exists", e))?;

    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "Ya existe una mesa llamada '{}'",
            data.nombre
        )));
    }

    let ahora = MongoRepo::current_timestamp();
    let mesa = Mesa {
        id: None,
        id_restaurante: restaurante_id,
        nombre: data.nombre.clone(),
        capacidad: data.capacidad,
        estado: EstadoMesa::Disponible,
        pos_x: data.pos_x,
        pos_y: data.pos_y,
        id_sesion_actual: None,
        created_at: ahora,
        updated_at: ahora,
    };

    let result = mesas
        .insert_one(mesa)
        .await
        .map_err(|e| AppError::database("create_table", e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Mesa creada correctamente",
        "id": result.inserted_id.as_object_id().unwrap().to_hex(),
        "estado": EstadoMesa::Disponible.as_str()
    })))
}

#[get("/tables")]
async fn get_tables(repo: web::Data<MongoRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;

    let mesas = repo.mesas();
    let mut cursor = mesas
        .find(doc! { "id_restaurante": restaurante_id })
        .sort(doc! { "nombre": 1 })
        .await
        .map_err(|e| AppError::database("list_tables", e))?;

    let mut results = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::Internal(format!("Error iterando cursor: {}", e)))?
    {
        let mesa = cursor
            .deserialize_current()
            .map_err(|e| AppError::Internal(format!("Error deserializando mesa: {}", e)))?;
        results.push(MesaResponse::from(mesa));
    }

    Ok(HttpResponse::Ok().json(results))
}

/// Detalle de una mesa: la mesa, su sesión activa y sus reservas próximas
///
/// # Errores
/// - `400 Bad Request`: ID de mesa inválido
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Mesa no encontrada en este restaurante
#[get("/tables/{id}")]
async fn get_table(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;
    let id_mesa = parse_mesa_id(&path.into_inner())?;

    let mesa = repo
        .mesas()
        .find_one(doc! { "_id": id_mesa, "id_restaurante": restaurante_id })
        .await
        .map_err(|e| AppError::database("get_table", e))?
        .ok_or_else(|| AppError::not_found_id("Mesa", &id_mesa.to_hex()))?;

    let sesion_actual = repo
        .sesiones()
        .find_one(doc! { "id_mesa": id_mesa, "fin": Bson::Null })
        .await
        .map_err(|e| AppError::database("get_sesion_activa", e))?;

    let ahora = MongoRepo::current_timestamp();
    let mut cursor = repo
        .reservas()
        .find(doc! {
            "id_mesa": id_mesa,
            "fecha_hora": { "$gte": ahora },
            "estado": { "$nin": [
                EstadoReserva::Cancelada.as_str(),
                EstadoReserva::Completada.as_str(),
            ] },
        })
        .sort(doc! { "fecha_hora": 1 })
        .await
        .map_err(|e| AppError::database("get_reservas_mesa", e))?;

    let mut proximas_reservas = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| AppError::Internal(format!("Error iterando cursor: {}", e)))?
    {
        let reserva = cursor
            .deserialize_current()
            .map_err(|e| AppError::Internal(format!("Error deserializando reserva: {}", e)))?;
        proximas_reservas.push(ReservaResponse::from(reserva));
    }

    Ok(HttpResponse::Ok().json(TableDetailResponse {
        mesa: MesaResponse::from(mesa),
        sesion_actual: sesion_actual.map(SesionResponse::from),
        proximas_reservas,
    }))
}

/// Cambia el estado de una mesa
///
/// Si el destino es `disponible` y la mesa tiene una sesión abierta, la
/// sesión se cierra y el puntero de la mesa se limpia en la misma
/// transacción. El resto de estados se aplican directamente.
///
/// # Respuesta
/// ```json
/// {
///   "message": "Estado de mesa actualizado",
///   "id": "...",
///   "estado": "disponible"
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: ID o estado inválido (estados válidos: disponible,
///   ocupada, reservada, limpieza, cobrando)
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Mesa no encontrada en este restaurante
#[post("/tables/{id}/status")]
async fn set_table_status(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    data: web::Json<SetStatusPayload>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;
    let id_mesa = parse_mesa_id(&path.into_inner())?;

    let destino: EstadoMesa = data
        .estado
        .parse()
        .map_err(|e: String| AppError::validation_field("estado", &e))?;

    let mesa = lifecycle::set_table_status(repo.get_ref(), restaurante_id, id_mesa, destino).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Estado de mesa actualizado",
        "id": id_mesa.to_hex(),
        "estado": mesa.estado.as_str()
    })))
}

/// Sienta un grupo walk-in en una mesa
///
/// Abre una sesión de comida (inicio = ahora) y marca la mesa como
/// `ocupada`, todo en una transacción. Si la mesa tenía una sesión abierta,
/// esa sesión se cierra primero.
///
/// # Validaciones
/// - El número de personas debe estar entre 1 y 20
/// - La mesa debe existir y pertenecer al restaurante
///
/// # Respuesta
/// ```json
/// {
///   "message": "Clientes sentados correctamente",
///   "id_sesion": "...",
///   "estado_mesa": "ocupada"
/// }
/// ```
///
/// # Errores
/// - `400 Bad Request`: Datos de validación incorrectos
/// - `401 Unauthorized`: Token inválido o falta autorización
/// - `404 Not Found`: Mesa no encontrada en este restaurante
#[post("/tables/{id}/seat")]
async fn seat_walkin(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    data: web::Json<SeatWalkinPayload>,
    req: HttpRequest,
) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;
    let id_mesa = parse_mesa_id(&path.into_inner())?;

    if data.numero_personas < 1 || data.numero_personas > 20 {
        return Err(AppError::Validation(
            "El número de personas debe estar entre 1 y 20".to_string(),
        ));
    }

    let nombre_cliente = data
        .nombre_cliente
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let sesion = lifecycle::seat_walkin(
        repo.get_ref(),
        restaurante_id,
        id_mesa,
        data.numero_personas,
        nombre_cliente,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Clientes sentados correctamente",
        "id_sesion": sesion.id.unwrap().to_hex(),
        "estado_mesa": EstadoMesa::Ocupada.as_str()
    })))
}

#[delete("/tables/clear")]
async fn clear_tables(repo: web::Data<MongoRepo>, req: HttpRequest) -> AppResult<impl Responder> {
    let token = extract_token(&req)?;
    let restaurante_id = validate_access_token(repo.get_ref(), &token).await?;

    // Reset del plano: las sesiones y reservas del restaurante caen con sus mesas
    repo.reservas()
        .delete_many(doc! { "id_restaurante": restaurante_id })
        .await
        .map_err(|e| AppError::database("clear_reservas", e))?;
    repo.sesiones()
        .delete_many(doc! { "id_restaurante": restaurante_id })
        .await
        .map_err(|e| AppError::database("clear_sesiones", e))?;
    repo.mesas()
        .delete_many(doc! { "id_restaurante": restaurante_id })
        .await
        .map_err(|e| AppError::database("clear_mesas", e))?;

    Ok(HttpResponse::Ok().body("Todas las mesas eliminadas correctamente"))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_table);
    cfg.service(get_tables);
    cfg.service(clear_tables);
    cfg.service(set_table_status);
    cfg.service(seat_walkin);
    cfg.service(get_table);
}
