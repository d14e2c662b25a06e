//! Tests de integración del ciclo de vida del salón contra MongoDB.
//!
//! Requieren un MongoDB desplegado como replica set (las mutaciones usan
//! transacciones), por eso van marcados con `#[ignore]`:
//!
//! ```bash
//! docker run -d --name mongo -p 27017:27017 mongo:latest --replSet rs0
//! docker exec mongo mongosh --eval "rs.initiate()"
//! cargo test -- --ignored
//! ```

use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::Client;

use pispas_salon::db::lifecycle::{self, NuevaReserva};
use pispas_salon::db::{Mesa, MongoRepo};
use pispas_salon::domain::{EstadoMesa, EstadoReserva};

/// Repo apuntando a una base de datos única por test, para poder
/// ejecutarlos en paralelo y tirarla al final.
async fn repo_de_prueba() -> MongoRepo {
    let uri = std::env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let client = Client::with_uri_str(&uri)
        .await
        .expect("MongoDB no disponible");
    let database = client.database(&format!("pispas_salon_test_{}", ObjectId::new().to_hex()));
    MongoRepo { client, database }
}

async fn crear_mesa(repo: &MongoRepo, id_restaurante: ObjectId, nombre: &str) -> ObjectId {
    let ahora = MongoRepo::current_timestamp();
    let mesa = Mesa {
        id: None,
        id_restaurante,
        nombre: nombre.to_string(),
        capacidad: 4,
        estado: EstadoMesa::Disponible,
        pos_x: 100.0,
        pos_y: 100.0,
        id_sesion_actual: None,
        created_at: ahora,
        updated_at: ahora,
    };
    repo.mesas()
        .insert_one(mesa)
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap()
}

async fn buscar_mesa(repo: &MongoRepo, id_mesa: ObjectId) -> Mesa {
    repo.mesas()
        .find_one(doc! { "_id": id_mesa })
        .await
        .unwrap()
        .expect("mesa desaparecida")
}

fn reserva_en(id_mesa: ObjectId, horas: i64) -> NuevaReserva {
    NuevaReserva {
        id_mesa,
        nombre_cliente: "John Doe".to_string(),
        telefono_cliente: "+34 612 345 678".to_string(),
        numero_personas: 2,
        fecha_hora: MongoRepo::current_timestamp() + horas * 3600,
    }
}

#[tokio::test]
#[ignore = "requiere MongoDB replica set en ejecución"]
async fn walkin_abre_sesion_y_liberar_la_cierra() {
    let repo = repo_de_prueba().await;
    let rid = ObjectId::new();
    let id_mesa = crear_mesa(&repo, rid, "T02").await;

    // Sentar un walk-in de 3 personas
    let sesion = lifecycle::seat_walkin(&repo, rid, id_mesa, 3, Some("Jane Smith".to_string()))
        .await
        .unwrap();
    assert_eq!(sesion.numero_personas, 3);
    assert!(sesion.fin.is_none());

    let mesa = buscar_mesa(&repo, id_mesa).await;
    assert_eq!(mesa.estado, EstadoMesa::Ocupada);
    assert_eq!(mesa.id_sesion_actual, sesion.id);

    // Liberar la mesa cierra la sesión y limpia el puntero
    let mesa = lifecycle::set_table_status(&repo, rid, id_mesa, EstadoMesa::Disponible)
        .await
        .unwrap();
    assert_eq!(mesa.estado, EstadoMesa::Disponible);
    assert!(mesa.id_sesion_actual.is_none());

    let cerrada = repo
        .sesiones()
        .find_one(doc! { "_id": sesion.id.unwrap() })
        .await
        .unwrap()
        .unwrap();
    let fin = cerrada.fin.expect("la sesión debería estar cerrada");
    assert!(fin >= cerrada.inicio);

    repo.database.drop().await.ok();
}

#[tokio::test]
#[ignore = "requiere MongoDB replica set en ejecución"]
async fn reservar_retiene_y_cancelar_libera() {
    let repo = repo_de_prueba().await;
    let rid = ObjectId::new();
    let id_mesa = crear_mesa(&repo, rid, "T01").await;

    // Reserva para dentro de dos horas: la mesa queda retenida
    let reserva = lifecycle::create_reservation(&repo, rid, reserva_en(id_mesa, 2))
        .await
        .unwrap();
    assert_eq!(reserva.estado, EstadoReserva::Confirmada);
    assert_eq!(buscar_mesa(&repo, id_mesa).await.estado, EstadoMesa::Reservada);

    // Cancelar la única reserva próxima devuelve la mesa a disponible
    let cancelada = lifecycle::cancel_reservation(&repo, rid, reserva.id.unwrap())
        .await
        .unwrap();
    assert_eq!(cancelada.estado, EstadoReserva::Cancelada);
    assert_eq!(buscar_mesa(&repo, id_mesa).await.estado, EstadoMesa::Disponible);

    repo.database.drop().await.ok();
}

#[tokio::test]
#[ignore = "requiere MongoDB replica set en ejecución"]
async fn cancelar_no_libera_si_otra_reserva_retiene() {
    let repo = repo_de_prueba().await;
    let rid = ObjectId::new();
    let id_mesa = crear_mesa(&repo, rid, "T03").await;

    let primera = lifecycle::create_reservation(&repo, rid, reserva_en(id_mesa, 2))
        .await
        .unwrap();
    let _segunda = lifecycle::create_reservation(&repo, rid, reserva_en(id_mesa, 4))
        .await
        .unwrap();

    lifecycle::cancel_reservation(&repo, rid, primera.id.unwrap())
        .await
        .unwrap();

    // La segunda reserva sigue reteniendo la mesa
    assert_eq!(buscar_mesa(&repo, id_mesa).await.estado, EstadoMesa::Reservada);

    repo.database.drop().await.ok();
}

#[tokio::test]
#[ignore = "requiere MongoDB replica set en ejecución"]
async fn checkin_ocupa_la_mesa_sin_abrir_sesion() {
    let repo = repo_de_prueba().await;
    let rid = ObjectId::new();
    let id_mesa = crear_mesa(&repo, rid, "T04").await;

    let reserva = lifecycle::create_reservation(&repo, rid, reserva_en(id_mesa, 1))
        .await
        .unwrap();

    let llegada = lifecycle::checkin_reservation(&repo, rid, reserva.id.unwrap())
        .await
        .unwrap();
    assert_eq!(llegada.estado, EstadoReserva::Llegada);
    assert_eq!(buscar_mesa(&repo, id_mesa).await.estado, EstadoMesa::Ocupada);

    // El check-in no abre sesión de comida
    let sesiones = repo
        .sesiones()
        .count_documents(doc! { "id_mesa": id_mesa })
        .await
        .unwrap();
    assert_eq!(sesiones, 0);

    // Un segundo check-in es una transición ilegal
    let repetido = lifecycle::checkin_reservation(&repo, rid, reserva.id.unwrap()).await;
    assert!(repetido.is_err());

    repo.database.drop().await.ok();
}

#[tokio::test]
#[ignore = "requiere MongoDB replica set en ejecución"]
async fn sentar_sobre_mesa_ocupada_cierra_la_sesion_previa() {
    let repo = repo_de_prueba().await;
    let rid = ObjectId::new();
    let id_mesa = crear_mesa(&repo, rid, "T05").await;

    let primera = lifecycle::seat_walkin(&repo, rid, id_mesa, 2, None).await.unwrap();
    let segunda = lifecycle::seat_walkin(&repo, rid, id_mesa, 4, None).await.unwrap();

    // La primera sesión quedó cerrada, nunca huérfana
    let previa = repo
        .sesiones()
        .find_one(doc! { "_id": primera.id.unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert!(previa.fin.is_some());

    // Solo una sesión activa por mesa
    let activas = repo
        .sesiones()
        .count_documents(doc! { "id_mesa": id_mesa, "fin": Bson::Null })
        .await
        .unwrap();
    assert_eq!(activas, 1);

    let mesa = buscar_mesa(&repo, id_mesa).await;
    assert_eq!(mesa.id_sesion_actual, segunda.id);

    repo.database.drop().await.ok();
}

#[tokio::test]
#[ignore = "requiere MongoDB replica set en ejecución"]
async fn reserva_sobre_mesa_no_disponible_no_cambia_su_estado() {
    let repo = repo_de_prueba().await;
    let rid = ObjectId::new();
    let id_mesa = crear_mesa(&repo, rid, "T06").await;

    lifecycle::seat_walkin(&repo, rid, id_mesa, 2, None).await.unwrap();

    // Reservar una mesa ocupada no la pasa a reservada
    lifecycle::create_reservation(&repo, rid, reserva_en(id_mesa, 3))
        .await
        .unwrap();
    assert_eq!(buscar_mesa(&repo, id_mesa).await.estado, EstadoMesa::Ocupada);

    repo.database.drop().await.ok();
}
