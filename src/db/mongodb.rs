use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use std::env;

use crate::api::AppError;
use crate::domain::{EstadoMesa, EstadoReserva};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Restaurant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    pub nombre: String,
    pub password: String,
    pub access_token: String,
    pub created_at: i64, // timestamp unix
}

/// Una mesa física del salón, con su posición en el plano
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Mesa {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    pub id_restaurante: mongodb::bson::oid::ObjectId,
    pub nombre: String,
    pub capacidad: i32,
    pub estado: EstadoMesa,
    pub pos_x: f32,
    pub pos_y: f32,
    /// Sesión de comida en curso; `Some` solo mientras la mesa está ocupada
    pub id_sesion_actual: Option<mongodb::bson::oid::ObjectId>,
    pub created_at: i64, // timestamp unix
    pub updated_at: i64, // timestamp unix
}

/// Un periodo de ocupación continua de una mesa por un grupo
///
/// La sesión está activa mientras `fin` sea `None`. Cada mesa tiene como
/// máximo una sesión activa; `db::lifecycle` lo garantiza cerrando la
/// anterior dentro de la misma transacción que abre la nueva.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sesion {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    pub id_restaurante: mongodb::bson::oid::ObjectId,
    pub id_mesa: mongodb::bson::oid::ObjectId,
    pub inicio: i64, // timestamp unix
    pub fin: Option<i64>,
    pub numero_personas: i32,
    pub nombre_cliente: Option<String>,
    pub created_at: i64, // timestamp unix
}

/// Una reserva futura de una mesa para un grupo
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reserva {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<mongodb::bson::oid::ObjectId>,
    pub id_restaurante: mongodb::bson::oid::ObjectId,
    pub id_mesa: mongodb::bson::oid::ObjectId,
    pub nombre_cliente: String,
    pub telefono_cliente: String,
    pub numero_personas: i32,
    /// Momento de la reserva como timestamp unix (UTC)
    pub fecha_hora: i64,
    pub estado: EstadoReserva,
    pub created_at: i64, // timestamp unix
    pub updated_at: i64, // timestamp unix
}

impl Reserva {
    /// ¿Sigue contando como próxima en el instante `ahora`?
    pub fn es_proxima(&self, ahora: i64) -> bool {
        self.fecha_hora >= ahora && self.estado.cuenta_como_proxima()
    }
}

#[derive(Debug, Clone)]
pub struct MongoRepo {
    pub client: Client,
    pub database: Database,
}

impl MongoRepo {
    pub async fn init() -> Result<MongoRepo> {
        let mongo_uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let client = Client::with_uri_str(&mongo_uri)
            .await
            .map_err(|e| AppError::Internal(format!("Error conectando a MongoDB: {}", e)))?;

        let database_name =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| "pispas_salon".to_string());

        let database = client.database(&database_name);

        // Test connection
        database
            .run_command(mongodb::bson::doc! {"ping": 1})
            .await
            .map_err(|e| AppError::Internal(format!("Error validando conexión MongoDB: {}", e)))?;

        tracing::info!("Conexión a MongoDB establecida exitosamente");

        Ok(MongoRepo { client, database })
    }

    pub fn restaurants(&self) -> Collection<Restaurant> {
        self.database.collection("restaurants")
    }

    pub fn mesas(&self) -> Collection<Mesa> {
        self.database.collection("mesas")
    }

    pub fn sesiones(&self) -> Collection<Sesion> {
        self.database.collection("sesiones")
    }

    pub fn reservas(&self) -> Collection<Reserva> {
        self.database.collection("reservas")
    }

    // Método para crear índices si es necesario
    pub async fn create_indexes(&self) -> Result<()> {
        use mongodb::bson::doc;
        use mongodb::{options::IndexOptions, IndexModel};

        // Índices para restaurants
        let restaurants = self.restaurants();
        let restaurant_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "nombre": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "access_token": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        ];

        restaurants
            .create_indexes(restaurant_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices: {}", e)))?;

        // Índices para mesas
        let mesas = self.mesas();
        let mesa_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "id_restaurante": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "id_restaurante": 1, "nombre": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        ];

        mesas
            .create_indexes(mesa_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices mesas: {}", e)))?;

        // Índices para sesiones: búsqueda de la sesión activa por mesa
        let sesiones = self.sesiones();
        let sesion_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "id_restaurante": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "id_mesa": 1, "fin": 1 })
                .build(),
        ];

        sesiones
            .create_indexes(sesion_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices sesiones: {}", e)))?;

        // Índices para reservas: listados "próximas" por restaurante y por mesa.
        // A propósito NO hay índice único por (mesa, fecha_hora): el solape de
        // reservas queda a criterio del personal.
        let reservas = self.reservas();
        let reserva_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "id_restaurante": 1, "estado": 1, "fecha_hora": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "id_mesa": 1, "fecha_hora": 1 })
                .build(),
        ];

        reservas
            .create_indexes(reserva_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices reservas: {}", e)))?;

        tracing::info!("Índices MongoDB creados exitosamente");
        Ok(())
    }

    // Función auxiliar para obtener timestamp actual
    pub fn current_timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }
}
