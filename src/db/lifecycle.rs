//! # Ciclo de vida del salón
//!
//! Mutaciones multi-entidad sobre mesas, sesiones y reservas. Cada operación
//! que toca más de un documento corre dentro de una transacción de MongoDB
//! (sesión de cliente), de modo que un fallo a mitad de camino no deja el
//! salón en un estado inconsistente (mesa ocupada sin sesión, sesión abierta
//! huérfana, etc.).
//!
//! Las reglas de qué transición es legal y qué efecto tiene viven en
//! [`crate::domain::status`]; aquí solo se ejecutan.
//!
//! Requiere MongoDB desplegado como replica set; con un `mongod` suelto las
//! transacciones fallan al iniciarse.

use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::ClientSession;

use crate::api::{AppError, AppResult};
use crate::db::{Mesa, MongoRepo, Reserva, Sesion};
use crate::domain::{EfectoMesa, EstadoMesa, EstadoReserva};

/// Datos validados para crear una reserva
///
/// La capa HTTP valida formato y rangos antes de llegar aquí.
#[derive(Debug, Clone)]
pub struct NuevaReserva {
    pub id_mesa: ObjectId,
    pub nombre_cliente: String,
    pub telefono_cliente: String,
    pub numero_personas: i32,
    pub fecha_hora: i64, // timestamp unix
}

/// Cambia el estado de una mesa aplicando sus efectos laterales
///
/// Si el destino es `disponible` y la mesa tiene sesión activa, la sesión se
/// cierra (fin = ahora) y se limpia `id_sesion_actual` en la misma
/// transacción, antes de persistir el estado. Cualquier otro destino solo
/// actualiza el estado.
///
/// # Errores
/// - `NotFound`: la mesa no existe o no pertenece al restaurante
pub async fn set_table_status(
    repo: &MongoRepo,
    id_restaurante: ObjectId,
    id_mesa: ObjectId,
    destino: EstadoMesa,
) -> AppResult<Mesa> {
    let mut session = start_transaction(repo, "set_table_status").await?;

    let resultado = set_table_status_tx(repo, &mut session, id_restaurante, id_mesa, destino).await;

    finish_transaction(session, resultado, "set_table_status").await
}

async fn set_table_status_tx(
    repo: &MongoRepo,
    session: &mut ClientSession,
    id_restaurante: ObjectId,
    id_mesa: ObjectId,
    destino: EstadoMesa,
) -> AppResult<Mesa> {
    let mesas = repo.mesas();
    let ahora = MongoRepo::current_timestamp();

    let mut mesa = mesas
        .find_one(doc! { "_id": id_mesa, "id_restaurante": id_restaurante })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("buscar_mesa", e))?
        .ok_or_else(|| AppError::not_found_id("Mesa", &id_mesa.to_hex()))?;

    let cierra_sesion = destino.efecto_al_entrar() == EfectoMesa::CerrarSesionActiva
        && mesa.id_sesion_actual.is_some();

    if cierra_sesion {
        repo.sesiones()
            .update_many(
                doc! { "id_mesa": id_mesa, "fin": Bson::Null },
                doc! { "$set": { "fin": ahora } },
            )
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("cerrar_sesion_activa", e))?;
    }

    let mut cambios = doc! { "estado": destino.as_str(), "updated_at": ahora };
    if cierra_sesion {
        cambios.insert("id_sesion_actual", Bson::Null);
    }

    mesas
        .update_one(doc! { "_id": id_mesa }, doc! { "$set": cambios })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("actualizar_estado_mesa", e))?;

    mesa.estado = destino;
    if cierra_sesion {
        mesa.id_sesion_actual = None;
    }
    mesa.updated_at = ahora;
    Ok(mesa)
}

/// Sienta un walk-in: abre una sesión y ocupa la mesa
///
/// Garantiza una única sesión activa por mesa: si la mesa ya tenía una
/// sesión abierta, esa sesión se cierra dentro de la misma transacción antes
/// de crear la nueva (y queda registrado con un warning).
///
/// # Errores
/// - `NotFound`: la mesa no existe o no pertenece al restaurante
pub async fn seat_walkin(
    repo: &MongoRepo,
    id_restaurante: ObjectId,
    id_mesa: ObjectId,
    numero_personas: i32,
    nombre_cliente: Option<String>,
) -> AppResult<Sesion> {
    let mut session = start_transaction(repo, "seat_walkin").await?;

    let resultado = seat_walkin_tx(
        repo,
        &mut session,
        id_restaurante,
        id_mesa,
        numero_personas,
        nombre_cliente,
    )
    .await;

    finish_transaction(session, resultado, "seat_walkin").await
}

async fn seat_walkin_tx(
    repo: &MongoRepo,
    session: &mut ClientSession,
    id_restaurante: ObjectId,
    id_mesa: ObjectId,
    numero_personas: i32,
    nombre_cliente: Option<String>,
) -> AppResult<Sesion> {
    let mesas = repo.mesas();
    let sesiones = repo.sesiones();
    let ahora = MongoRepo::current_timestamp();

    let mesa = mesas
        .find_one(doc! { "_id": id_mesa, "id_restaurante": id_restaurante })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("buscar_mesa", e))?
        .ok_or_else(|| AppError::not_found_id("Mesa", &id_mesa.to_hex()))?;

    // Una sola sesión activa por mesa: cerrar cualquiera que siga abierta.
    let cerradas = sesiones
        .update_many(
            doc! { "id_mesa": id_mesa, "fin": Bson::Null },
            doc! { "$set": { "fin": ahora } },
        )
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("cerrar_sesiones_previas", e))?;

    if cerradas.modified_count > 0 {
        tracing::warn!(
            mesa = %mesa.nombre,
            estado_previo = %mesa.estado,
            sesiones_cerradas = cerradas.modified_count,
            "Se sentó un walk-in en una mesa con sesión abierta; la sesión previa se cerró"
        );
    }

    let mut sesion = Sesion {
        id: None,
        id_restaurante,
        id_mesa,
        inicio: ahora,
        fin: None,
        numero_personas,
        nombre_cliente,
        created_at: ahora,
    };

    let insertada = sesiones
        .insert_one(&sesion)
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("crear_sesion", e))?;
    let id_sesion = insertada.inserted_id.as_object_id().unwrap();

    mesas
        .update_one(
            doc! { "_id": id_mesa },
            doc! { "$set": {
                "estado": EstadoMesa::Ocupada.as_str(),
                "id_sesion_actual": id_sesion,
                "updated_at": ahora,
            } },
        )
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("ocupar_mesa", e))?;

    sesion.id = Some(id_sesion);
    Ok(sesion)
}

/// Crea una reserva confirmada y retiene la mesa si estaba disponible
///
/// A propósito no comprueba capacidad de la mesa ni solapes de horario: esa
/// decisión queda en manos del personal.
///
/// # Errores
/// - `NotFound`: la mesa no existe o no pertenece al restaurante
pub async fn create_reservation(
    repo: &MongoRepo,
    id_restaurante: ObjectId,
    datos: NuevaReserva,
) -> AppResult<Reserva> {
    let mut session = start_transaction(repo, "create_reservation").await?;

    let resultado = create_reservation_tx(repo, &mut session, id_restaurante, datos).await;

    finish_transaction(session, resultado, "create_reservation").await
}

async fn create_reservation_tx(
    repo: &MongoRepo,
    session: &mut ClientSession,
    id_restaurante: ObjectId,
    datos: NuevaReserva,
) -> AppResult<Reserva> {
    let mesas = repo.mesas();
    let reservas = repo.reservas();
    let ahora = MongoRepo::current_timestamp();

    let mesa = mesas
        .find_one(doc! { "_id": datos.id_mesa, "id_restaurante": id_restaurante })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("buscar_mesa", e))?
        .ok_or_else(|| AppError::not_found_id("Mesa", &datos.id_mesa.to_hex()))?;

    let mut reserva = Reserva {
        id: None,
        id_restaurante,
        id_mesa: datos.id_mesa,
        nombre_cliente: datos.nombre_cliente,
        telefono_cliente: datos.telefono_cliente,
        numero_personas: datos.numero_personas,
        fecha_hora: datos.fecha_hora,
        estado: EstadoReserva::Confirmada,
        created_at: ahora,
        updated_at: ahora,
    };

    let insertada = reservas
        .insert_one(&reserva)
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("crear_reserva", e))?;
    reserva.id = Some(insertada.inserted_id.as_object_id().unwrap());

    if mesa.estado == EstadoMesa::Disponible {
        mesas
            .update_one(
                doc! { "_id": datos.id_mesa },
                doc! { "$set": {
                    "estado": EstadoMesa::Reservada.as_str(),
                    "updated_at": ahora,
                } },
            )
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("retener_mesa", e))?;
    }

    Ok(reserva)
}

/// Check-in de una reserva: el cliente llegó
///
/// La reserva pasa a `llegada` y su mesa a `ocupada`, sin abrir sesión (ese
/// paso lo decide el personal desde el plano). Ambos cambios en una sola
/// transacción.
///
/// # Errores
/// - `NotFound`: la reserva o su mesa no existen en este restaurante
/// - `Conflict`: la reserva no admite pasar a `llegada`
pub async fn checkin_reservation(
    repo: &MongoRepo,
    id_restaurante: ObjectId,
    id_reserva: ObjectId,
) -> AppResult<Reserva> {
    let mut session = start_transaction(repo, "checkin_reservation").await?;

    let resultado = checkin_reservation_tx(repo, &mut session, id_restaurante, id_reserva).await;

    finish_transaction(session, resultado, "checkin_reservation").await
}

async fn checkin_reservation_tx(
    repo: &MongoRepo,
    session: &mut ClientSession,
    id_restaurante: ObjectId,
    id_reserva: ObjectId,
) -> AppResult<Reserva> {
    let reservas = repo.reservas();
    let mesas = repo.mesas();
    let ahora = MongoRepo::current_timestamp();

    let mut reserva = reservas
        .find_one(doc! { "_id": id_reserva, "id_restaurante": id_restaurante })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("buscar_reserva", e))?
        .ok_or_else(|| AppError::not_found_id("Reserva", &id_reserva.to_hex()))?;

    if !reserva.estado.puede_transicionar(EstadoReserva::Llegada) {
        return Err(AppError::Conflict(format!(
            "La reserva está '{}' y no admite check-in",
            reserva.estado
        )));
    }

    reservas
        .update_one(
            doc! { "_id": id_reserva },
            doc! { "$set": {
                "estado": EstadoReserva::Llegada.as_str(),
                "updated_at": ahora,
            } },
        )
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("marcar_llegada", e))?;

    let ocupada = mesas
        .update_one(
            doc! { "_id": reserva.id_mesa, "id_restaurante": id_restaurante },
            doc! { "$set": {
                "estado": EstadoMesa::Ocupada.as_str(),
                "updated_at": ahora,
            } },
        )
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("ocupar_mesa_reserva", e))?;

    if ocupada.matched_count == 0 {
        return Err(AppError::not_found_id("Mesa", &reserva.id_mesa.to_hex()));
    }

    reserva.estado = EstadoReserva::Llegada;
    reserva.updated_at = ahora;
    Ok(reserva)
}

/// Cancela una reserva y libera la mesa si nadie más la retiene
///
/// Si la mesa estaba `reservada` y ninguna *otra* reserva próxima apunta a
/// ella, la mesa vuelve a `disponible`. La reserva pasa a `cancelada` en
/// cualquier caso.
///
/// # Errores
/// - `NotFound`: la reserva no existe en este restaurante
/// - `Conflict`: la reserva ya estaba cancelada o completada
pub async fn cancel_reservation(
    repo: &MongoRepo,
    id_restaurante: ObjectId,
    id_reserva: ObjectId,
) -> AppResult<Reserva> {
    let mut session = start_transaction(repo, "cancel_reservation").await?;

    let resultado = cancel_reservation_tx(repo, &mut session, id_restaurante, id_reserva).await;

    finish_transaction(session, resultado, "cancel_reservation").await
}

async fn cancel_reservation_tx(
    repo: &MongoRepo,
    session: &mut ClientSession,
    id_restaurante: ObjectId,
    id_reserva: ObjectId,
) -> AppResult<Reserva> {
    let reservas = repo.reservas();
    let mesas = repo.mesas();
    let ahora = MongoRepo::current_timestamp();

    let mut reserva = reservas
        .find_one(doc! { "_id": id_reserva, "id_restaurante": id_restaurante })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("buscar_reserva", e))?
        .ok_or_else(|| AppError::not_found_id("Reserva", &id_reserva.to_hex()))?;

    if !reserva.estado.puede_transicionar(EstadoReserva::Cancelada) {
        return Err(AppError::Conflict(format!(
            "La reserva ya está '{}' y no se puede cancelar",
            reserva.estado
        )));
    }

    let mesa = mesas
        .find_one(doc! { "_id": reserva.id_mesa, "id_restaurante": id_restaurante })
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("buscar_mesa", e))?;

    // Liberar la mesa solo si estaba retenida y esta era su única reserva próxima
    if let Some(mesa) = mesa {
        if mesa.estado == EstadoMesa::Reservada {
            let otras = reservas
                .count_documents(doc! {
                    "id_mesa": reserva.id_mesa,
                    "_id": { "$ne": id_reserva },
                    "fecha_hora": { "$gte": ahora },
                    "estado": { "$nin": ["cancelada", "completada"] },
                })
                .session(&mut *session)
                .await
                .map_err(|e| AppError::database("contar_otras_reservas", e))?;

            if otras == 0 {
                mesas
                    .update_one(
                        doc! { "_id": reserva.id_mesa },
                        doc! { "$set": {
                            "estado": EstadoMesa::Disponible.as_str(),
                            "updated_at": ahora,
                        } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("liberar_mesa", e))?;
            }
        }
    }

    reservas
        .update_one(
            doc! { "_id": id_reserva },
            doc! { "$set": {
                "estado": EstadoReserva::Cancelada.as_str(),
                "updated_at": ahora,
            } },
        )
        .session(&mut *session)
        .await
        .map_err(|e| AppError::database("cancelar_reserva", e))?;

    reserva.estado = EstadoReserva::Cancelada;
    reserva.updated_at = ahora;
    Ok(reserva)
}

/// Transición simple de reserva sin efectos sobre la mesa
///
/// Cubre confirmar (`pendiente -> confirmada`) y completar
/// (`llegada -> completada`). Un solo documento, sin transacción.
///
/// # Errores
/// - `NotFound`: la reserva no existe en este restaurante
/// - `Conflict`: la transición no es legal
pub async fn transition_reservation(
    repo: &MongoRepo,
    id_restaurante: ObjectId,
    id_reserva: ObjectId,
    destino: EstadoReserva,
) -> AppResult<Reserva> {
    let reservas = repo.reservas();
    let ahora = MongoRepo::current_timestamp();

    let mut reserva = reservas
        .find_one(doc! { "_id": id_reserva, "id_restaurante": id_restaurante })
        .await
        .map_err(|e| AppError::database("buscar_reserva", e))?
        .ok_or_else(|| AppError::not_found_id("Reserva", &id_reserva.to_hex()))?;

    if !reserva.estado.puede_transicionar(destino) {
        return Err(AppError::Conflict(format!(
            "La reserva no puede pasar de '{}' a '{}'",
            reserva.estado, destino
        )));
    }

    reservas
        .update_one(
            doc! { "_id": id_reserva },
            doc! { "$set": { "estado": destino.as_str(), "updated_at": ahora } },
        )
        .await
        .map_err(|e| AppError::database("transicionar_reserva", e))?;

    reserva.estado = destino;
    reserva.updated_at = ahora;
    Ok(reserva)
}

async fn start_transaction(repo: &MongoRepo, operation: &str) -> AppResult<ClientSession> {
    let mut session = repo
        .client
        .start_session()
        .await
        .map_err(|e| AppError::database(operation, e))?;

    session
        .start_transaction()
        .await
        .map_err(|e| AppError::database(operation, e))?;

    Ok(session)
}

async fn finish_transaction<T>(
    mut session: ClientSession,
    resultado: AppResult<T>,
    operation: &str,
) -> AppResult<T> {
    match resultado {
        Ok(valor) => {
            session
                .commit_transaction()
                .await
                .map_err(|e| AppError::database(operation, e))?;
            Ok(valor)
        }
        Err(e) => {
            if let Err(abort_err) = session.abort_transaction().await {
                tracing::warn!(
                    operation = %operation,
                    error = %abort_err,
                    "No se pudo abortar la transacción"
                );
            }
            Err(e)
        }
    }
}
