//! # Composición del plano del salón
//!
//! Agregación de solo lectura: cada mesa con su sesión activa y su próxima
//! reserva, más las próximas reservas globales del restaurante. Trabaja
//! sobre datos ya cargados, sin tocar la base de datos, para poder probar
//! el orden y la selección de forma aislada.

use crate::db::{Mesa, Reserva, Sesion};

/// Cuántas reservas próximas se muestran en el panel global del plano
pub const LIMITE_PROXIMAS: usize = 5;

/// Una mesa del plano con su contexto en vivo
#[derive(Debug, Clone)]
pub struct PlanoMesa {
    pub mesa: Mesa,
    pub sesion_actual: Option<Sesion>,
    /// La reserva próxima más cercana en el tiempo para esta mesa
    pub proxima_reserva: Option<Reserva>,
}

/// El plano completo del salón
#[derive(Debug, Clone)]
pub struct PlanoSalon {
    pub mesas: Vec<PlanoMesa>,
    /// Las [`LIMITE_PROXIMAS`] reservas más cercanas de todo el salón,
    /// ascendentes por fecha
    pub proximas_reservas: Vec<Reserva>,
}

/// Compone el plano del salón a partir del estado cargado
///
/// # Parámetros
/// - `mesas`: todas las mesas del restaurante
/// - `sesiones_activas`: sesiones con `fin == None` del restaurante
/// - `reservas`: reservas del restaurante; las que no sean próximas en el
///   instante `ahora` se descartan aquí
///
/// El orden de entrada no importa: las reservas se ordenan por `fecha_hora`
/// ascendente antes de seleccionar.
pub fn build_floor_plan(
    mesas: Vec<Mesa>,
    sesiones_activas: Vec<Sesion>,
    reservas: Vec<Reserva>,
    ahora: i64,
) -> PlanoSalon {
    let mut proximas: Vec<Reserva> = reservas.into_iter().filter(|r| r.es_proxima(ahora)).collect();
    proximas.sort_by_key(|r| r.fecha_hora);

    let mesas = mesas
        .into_iter()
        .map(|mesa| {
            let id_mesa = mesa.id;
            let sesion_actual = id_mesa.and_then(|id| {
                sesiones_activas
                    .iter()
                    .find(|s| s.id_mesa == id)
                    .cloned()
            });
            let proxima_reserva = id_mesa.and_then(|id| {
                proximas.iter().find(|r| r.id_mesa == id).cloned()
            });
            PlanoMesa {
                mesa,
                sesion_actual,
                proxima_reserva,
            }
        })
        .collect();

    proximas.truncate(LIMITE_PROXIMAS);

    PlanoSalon {
        mesas,
        proximas_reservas: proximas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EstadoMesa, EstadoReserva};
    use mongodb::bson::oid::ObjectId;

    const AHORA: i64 = 1_700_000_000;

    fn mesa(id: ObjectId, id_restaurante: ObjectId, nombre: &str) -> Mesa {
        Mesa {
            id: Some(id),
            id_restaurante,
            nombre: nombre.to_string(),
            capacidad: 4,
            estado: EstadoMesa::Disponible,
            pos_x: 0.0,
            pos_y: 0.0,
            id_sesion_actual: None,
            created_at: AHORA,
            updated_at: AHORA,
        }
    }

    fn sesion(id_mesa: ObjectId, id_restaurante: ObjectId) -> Sesion {
        Sesion {
            id: Some(ObjectId::new()),
            id_restaurante,
            id_mesa,
            inicio: AHORA - 600,
            fin: None,
            numero_personas: 2,
            nombre_cliente: None,
            created_at: AHORA - 600,
        }
    }

    fn reserva(
        id_mesa: ObjectId,
        id_restaurante: ObjectId,
        fecha_hora: i64,
        estado: EstadoReserva,
    ) -> Reserva {
        Reserva {
            id: Some(ObjectId::new()),
            id_restaurante,
            id_mesa,
            nombre_cliente: "Cliente".to_string(),
            telefono_cliente: "+34 600 000 000".to_string(),
            numero_personas: 2,
            fecha_hora,
            estado,
            created_at: AHORA,
            updated_at: AHORA,
        }
    }

    #[test]
    fn proximas_ordenadas_ascendente() {
        let rid = ObjectId::new();
        let mid = ObjectId::new();
        // Entran desordenadas: t3, t1, t2
        let reservas = vec![
            reserva(mid, rid, AHORA + 3600 * 3, EstadoReserva::Confirmada),
            reserva(mid, rid, AHORA + 3600, EstadoReserva::Confirmada),
            reserva(mid, rid, AHORA + 3600 * 2, EstadoReserva::Confirmada),
        ];

        let plano = build_floor_plan(vec![mesa(mid, rid, "T01")], vec![], reservas, AHORA);

        let tiempos: Vec<i64> = plano
            .proximas_reservas
            .iter()
            .map(|r| r.fecha_hora)
            .collect();
        assert_eq!(tiempos, vec![AHORA + 3600, AHORA + 3600 * 2, AHORA + 3600 * 3]);
    }

    #[test]
    fn panel_global_limita_a_cinco() {
        let rid = ObjectId::new();
        let mid = ObjectId::new();
        let reservas = (1..=8)
            .map(|i| reserva(mid, rid, AHORA + i * 900, EstadoReserva::Confirmada))
            .collect();

        let plano = build_floor_plan(vec![mesa(mid, rid, "T01")], vec![], reservas, AHORA);

        assert_eq!(plano.proximas_reservas.len(), LIMITE_PROXIMAS);
        assert_eq!(plano.proximas_reservas[0].fecha_hora, AHORA + 900);
    }

    #[test]
    fn cada_mesa_recibe_su_reserva_mas_cercana() {
        let rid = ObjectId::new();
        let m1 = ObjectId::new();
        let m2 = ObjectId::new();
        let reservas = vec![
            reserva(m1, rid, AHORA + 7200, EstadoReserva::Confirmada),
            reserva(m1, rid, AHORA + 3600, EstadoReserva::Confirmada),
            reserva(m2, rid, AHORA + 5400, EstadoReserva::Confirmada),
        ];

        let plano = build_floor_plan(
            vec![mesa(m1, rid, "T01"), mesa(m2, rid, "T02")],
            vec![],
            reservas,
            AHORA,
        );

        let por_mesa: Vec<Option<i64>> = plano
            .mesas
            .iter()
            .map(|p| p.proxima_reserva.as_ref().map(|r| r.fecha_hora))
            .collect();
        assert_eq!(por_mesa, vec![Some(AHORA + 3600), Some(AHORA + 5400)]);
    }

    #[test]
    fn canceladas_completadas_y_pasadas_no_cuentan() {
        let rid = ObjectId::new();
        let mid = ObjectId::new();
        let reservas = vec![
            reserva(mid, rid, AHORA + 3600, EstadoReserva::Cancelada),
            reserva(mid, rid, AHORA + 3600, EstadoReserva::Completada),
            reserva(mid, rid, AHORA - 3600, EstadoReserva::Confirmada),
        ];

        let plano = build_floor_plan(vec![mesa(mid, rid, "T01")], vec![], reservas, AHORA);

        assert!(plano.proximas_reservas.is_empty());
        assert!(plano.mesas[0].proxima_reserva.is_none());
    }

    #[test]
    fn sesion_activa_se_asigna_a_su_mesa() {
        let rid = ObjectId::new();
        let m1 = ObjectId::new();
        let m2 = ObjectId::new();
        let sesiones = vec![sesion(m1, rid)];

        let plano = build_floor_plan(
            vec![mesa(m1, rid, "T01"), mesa(m2, rid, "T02")],
            sesiones,
            vec![],
            AHORA,
        );

        assert!(plano.mesas[0].sesion_actual.is_some());
        assert!(plano.mesas[1].sesion_actual.is_none());
    }
}
