//! # Pispas Salón Server
//!
//! Servidor web para la gestión del salón de restaurantes construido con Rust,
//! Actix Web y MongoDB.
//!
//! ## Características principales
//!
//! - **Plano de mesas**: estado en vivo de cada mesa (disponible, ocupada,
//!   reservada, limpieza, cobrando) con su posición en el salón
//! - **Walk-ins**: sentar clientes sin reserva abriendo una sesión de comida
//! - **Sistema de reservas**: alta, check-in, cancelación y cierre de reservas
//! - **API REST**: API completa con autenticación por tokens
//!
//! ## Configuración
//!
//! El servidor se configura mediante variables de entorno (archivo `.env`):
//!
//! ```env
//! # Base de datos MongoDB
//! MONGODB_URI=mongodb://localhost:27017
//! MONGODB_DATABASE=pispas_salon
//!
//! # Servidor
//! BIND_ADDRESS=0.0.0.0:8080
//!
//! # Logging
//! RUST_LOG=debug,mongodb=info
//! ```
//!
//! ## Ejecución
//!
//! ```bash
//! # 1. Instalar y ejecutar MongoDB como replica set (las mutaciones
//! #    multi-entidad usan transacciones)
//! # Docker: docker run -d --name mongo -p 27017:27017 mongo:latest --replSet rs0
//! #         docker exec mongo mongosh --eval "rs.initiate()"
//!
//! # 2. Configurar variables de entorno
//! cp .env.example .env
//!
//! # 3. Compilar y ejecutar
//! cargo run
//!
//! # 4. Acceder al servidor
//! # http://localhost:8080
//! ```
//!
//! ## Arquitectura
//!
//! ```text
//! Frontend (plano del salón)
//!     ↓ HTTP/JSON
//! API REST (Actix Web)
//!     ↓ domain (máquina de estados) + db::lifecycle (transacciones)
//! MongoDB Database
//! ```

use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::env;

use pispas_salon::{api, db};

/// Función principal que inicia el servidor web
///
/// # Funcionalidad
///
/// 1. Carga variables de entorno desde `.env`
/// 2. Configura el sistema de logging con tracing
/// 3. Establece conexión con MongoDB
/// 4. Crea índices en la base de datos
/// 5. Configura el servidor HTTP con:
///    - Middleware de logging
///    - Rutas de la API
///    - Servicio de archivos estáticos
///    - Redirección de la ruta raíz
/// 6. Inicia el servidor en la dirección especificada
///
/// # Errores
///
/// Retorna `std::io::Error` si:
/// - No se puede conectar a MongoDB
/// - No se puede bindear al puerto especificado
/// - Error general al inicializar el servidor
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Configurar sistema de logging con tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pispas_salon=debug".parse().unwrap())
                .add_directive("mongodb=info".parse().unwrap()),
        )
        .init();

    tracing::info!("Iniciando Pispas Salón Server con MongoDB...");

    // Inicializar conexión a MongoDB
    let mongo_repo = match db::MongoRepo::init().await {
        Ok(repo) => {
            // Intentar crear índices para optimizar consultas
            if let Err(e) = repo.create_indexes().await {
                tracing::warn!("Advertencia creando índices: {}", e);
                // No es un error fatal, continuamos sin índices
            }

            repo
        }
        Err(e) => {
            tracing::error!("Error conectando a MongoDB: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Error de MongoDB: {}", e),
            ));
        }
    };

    // Obtener dirección de bind desde variables de entorno
    let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Servidor iniciando en {}", bind_address);

    // Crear y configurar el servidor HTTP
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(mongo_repo.clone()))
            .wrap(Logger::default())
            .configure(api::init_routes)
            .service(Files::new("/static", "./static").show_files_listing())
            .route(
                "/",
                web::get().to(|| async {
                    actix_web::HttpResponse::PermanentRedirect()
                        .append_header(("Location", "/static/index.html"))
                        .finish()
                }),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
