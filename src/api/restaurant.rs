//! # API de Restaurantes
//!
//! Este módulo maneja todas las operaciones relacionadas con restaurantes:
//! - Registro de nuevos restaurantes
//! - Login y autenticación
//! - Validación de tokens de acceso
//!
//! El token de acceso identifica al personal del restaurante en el resto de
//! la API: toda mesa, sesión o reserva queda ligada al restaurante del token.

use actix_web::{post, web, HttpResponse, Responder};
use mongodb::bson::{doc, oid::ObjectId};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::middleware::ErrorLogExt;
use super::{AppError, AppResult};
use crate::db::{MongoRepo, Restaurant};

/// Estructura para el registro de restaurantes
#[derive(Deserialize)]
struct RegisterRestaurant {
    /// Nombre del restaurante
    name: String,
    /// Contraseña (debería estar hasheada en producción)
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    name: String,
    password: String,
}

/// Registra un nuevo restaurante en el sistema
///
/// # Parámetros
///
/// - `repo`: Referencia al repositorio MongoDB
/// - `data`: Datos del restaurante a registrar
///
/// # Respuesta
///
/// ```json
/// {
///   "access_token": "uuid-token",
///   "message": "Restaurante registrado correctamente",
///   "id": "mongodb-object-id"
/// }
/// ```
///
/// # Errores
///
/// - `400 Bad Request`: Datos de validación incorrectos
/// - `409 Conflict`: El restaurante ya existe
/// - `500 Internal Server Error`: Error de base de datos
#[post("/restaurants/register")]
async fn register_restaurant(
    repo: web::Data<MongoRepo>,
    data: web::Json<RegisterRestaurant>,
) -> AppResult<impl Responder> {
    // Validación básica
    if data.name.is_empty() {
        return Err(AppError::Validation(
            "El nombre del restaurante es requerido".to_string(),
        ));
    }

    if data.password.len() < 6 {
        return Err(AppError::Validation(
            "La contraseña debe tener al menos 6 caracteres".to_string(),
        ));
    }

    // Verificar si el restaurante ya existe
    let restaurants = repo.restaurants();

    let existing = restaurants
        .find_one(doc! { "nombre": &data.name })
        .await
        .log_error_context("checking if restaurant exists")
        .map_err(|e| AppError::database("check_restaurant_exists", e))?;

    if existing.is_some() {
        return Err(AppError::Conflict("El restaurante ya existe".to_string()));
    }

    let access_token = Uuid::new_v4().to_string();

    let restaurant = Restaurant {
        id: None,
        nombre: data.name.clone(),
        password: data.password.clone(),
        access_token: access_token.clone(),
        created_at: MongoRepo::current_timestamp(),
    };

    let result = restaurants
        .insert_one(restaurant)
        .await
        .log_error_context("inserting new restaurant")
        .map_err(|e| AppError::database("register_restaurant", e))?;

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "message": "Restaurante registrado correctamente",
        "id": result.inserted_id.as_object_id().unwrap().to_hex()
    })))
}

#[post("/restaurants/login")]
async fn login_restaurant(
    repo: web::Data<MongoRepo>,
    data: web::Json<LoginRequest>,
) -> AppResult<impl Responder> {
    // Validación básica
    if data.name.is_empty() || data.password.is_empty() {
        return Err(AppError::Validation(
            "Nombre y contraseña son requeridos".to_string(),
        ));
    }

    let restaurants = repo.restaurants();

    let restaurant = restaurants
        .find_one(doc! {
            "nombre": &data.name,
            "password": &data.password
        })
        .await
        .map_err(|e| AppError::Internal(format!("Error buscando restaurante: {}", e)))?;

    match restaurant {
        Some(restaurant) => Ok(HttpResponse::Ok().json(json!({
            "access_token": restaurant.access_token,
            "id_restaurante": restaurant.id.unwrap().to_hex(),
            "message": "Login exitoso"
        }))),
        None => Err(AppError::Unauthorized("Credenciales incorrectas".to_string())),
    }
}

/// Valida un token de acceso y devuelve el restaurante al que pertenece
pub async fn validate_access_token(repo: &MongoRepo, token: &str) -> AppResult<ObjectId> {
    let restaurants = repo.restaurants();

    let restaurant = restaurants
        .find_one(doc! { "access_token": token })
        .await
        .log_error_context("validating access token")
        .map_err(|e| AppError::database("validate_token", e))?;

    match restaurant {
        Some(restaurant) => Ok(restaurant.id.unwrap()),
        None => Err(AppError::Unauthorized("Token inválido".to_string())),
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register_restaurant);
    cfg.service(login_restaurant);
}
