//! # Estados del salón
//!
//! Máquina de estados explícita para mesas y reservas. Todas las
//! transiciones legales y sus efectos viven aquí, independientes de la capa
//! HTTP y de MongoDB, para poder probarlas de forma aislada.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estado de una mesa en el plano del salón
///
/// Se persiste como string en minúsculas ("disponible", "ocupada", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoMesa {
    /// Libre para sentar clientes o asignar reservas
    Disponible,
    /// Con una sesión de comida en curso
    Ocupada,
    /// Retenida por una reserva próxima
    Reservada,
    /// Pendiente de limpieza tras una sesión
    Limpieza,
    /// La cuenta está en proceso de cobro
    Cobrando,
}

impl EstadoMesa {
    /// Representación persistida del estado
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoMesa::Disponible => "disponible",
            EstadoMesa::Ocupada => "ocupada",
            EstadoMesa::Reservada => "reservada",
            EstadoMesa::Limpieza => "limpieza",
            EstadoMesa::Cobrando => "cobrando",
        }
    }

    /// Todos los estados válidos, para mensajes de validación
    pub fn valores() -> &'static [&'static str] {
        &["disponible", "ocupada", "reservada", "limpieza", "cobrando"]
    }

    /// Efecto lateral de entrar en este estado
    ///
    /// Cualquier estado es alcanzable desde cualquier otro (el salón lo
    /// opera el personal directamente), pero entrar en `disponible` exige
    /// cerrar la sesión activa de la mesa antes de persistir el estado.
    pub fn efecto_al_entrar(&self) -> EfectoMesa {
        match self {
            EstadoMesa::Disponible => EfectoMesa::CerrarSesionActiva,
            _ => EfectoMesa::Ninguno,
        }
    }
}

/// Efecto que una transición de mesa impone sobre su sesión activa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfectoMesa {
    /// Cerrar la sesión activa (fin = ahora) y limpiar `id_sesion_actual`
    CerrarSesionActiva,
    Ninguno,
}

impl FromStr for EstadoMesa {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disponible" => Ok(EstadoMesa::Disponible),
            "ocupada" => Ok(EstadoMesa::Ocupada),
            "reservada" => Ok(EstadoMesa::Reservada),
            "limpieza" => Ok(EstadoMesa::Limpieza),
            "cobrando" => Ok(EstadoMesa::Cobrando),
            otro => Err(format!(
                "Estado de mesa inválido '{}', use uno de: {}",
                otro,
                EstadoMesa::valores().join(", ")
            )),
        }
    }
}

impl fmt::Display for EstadoMesa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado de una reserva
///
/// Se persiste como string en minúsculas ("pendiente", "confirmada", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoReserva {
    /// Registrada pero aún sin confirmar por el restaurante
    Pendiente,
    /// Confirmada, la mesa queda retenida
    Confirmada,
    /// El cliente ya llegó y fue sentado
    Llegada,
    /// Anulada por el cliente o el restaurante
    Cancelada,
    /// La visita terminó
    Completada,
}

impl EstadoReserva {
    /// Representación persistida del estado
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoReserva::Pendiente => "pendiente",
            EstadoReserva::Confirmada => "confirmada",
            EstadoReserva::Llegada => "llegada",
            EstadoReserva::Cancelada => "cancelada",
            EstadoReserva::Completada => "completada",
        }
    }

    /// Estados que ya no admiten ninguna transición
    pub fn es_terminal(&self) -> bool {
        matches!(self, EstadoReserva::Cancelada | EstadoReserva::Completada)
    }

    /// Una reserva en este estado cuenta como "próxima" si su fecha no pasó
    pub fn cuenta_como_proxima(&self) -> bool {
        !self.es_terminal()
    }

    /// Tabla de transiciones legales
    ///
    /// ```text
    /// pendiente  -> confirmada | llegada | cancelada
    /// confirmada -> llegada | cancelada
    /// llegada    -> completada | cancelada
    /// cancelada  -> (terminal)
    /// completada -> (terminal)
    /// ```
    pub fn puede_transicionar(&self, destino: EstadoReserva) -> bool {
        use EstadoReserva::*;
        matches!(
            (self, destino),
            (Pendiente, Confirmada)
                | (Pendiente, Llegada)
                | (Pendiente, Cancelada)
                | (Confirmada, Llegada)
                | (Confirmada, Cancelada)
                | (Llegada, Completada)
                | (Llegada, Cancelada)
        )
    }
}

impl FromStr for EstadoReserva {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(EstadoReserva::Pendiente),
            "confirmada" => Ok(EstadoReserva::Confirmada),
            "llegada" => Ok(EstadoReserva::Llegada),
            "cancelada" => Ok(EstadoReserva::Cancelada),
            "completada" => Ok(EstadoReserva::Completada),
            otro => Err(format!(
                "Estado de reserva inválido '{}', use uno de: \
                 pendiente, confirmada, llegada, cancelada, completada",
                otro
            )),
        }
    }
}

impl fmt::Display for EstadoReserva {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estado_mesa_parse_roundtrip() {
        for nombre in EstadoMesa::valores() {
            let estado: EstadoMesa = nombre.parse().unwrap();
            assert_eq!(estado.as_str(), *nombre);
        }
    }

    #[test]
    fn estado_mesa_rechaza_desconocidos() {
        let err = "fregona".parse::<EstadoMesa>().unwrap_err();
        assert!(err.contains("fregona"));
        assert!(err.contains("disponible"));
    }

    #[test]
    fn solo_disponible_cierra_sesion() {
        assert_eq!(
            EstadoMesa::Disponible.efecto_al_entrar(),
            EfectoMesa::CerrarSesionActiva
        );
        for estado in [
            EstadoMesa::Ocupada,
            EstadoMesa::Reservada,
            EstadoMesa::Limpieza,
            EstadoMesa::Cobrando,
        ] {
            assert_eq!(estado.efecto_al_entrar(), EfectoMesa::Ninguno);
        }
    }

    #[test]
    fn reserva_flujo_normal() {
        // pendiente -> confirmada -> llegada -> completada
        assert!(EstadoReserva::Pendiente.puede_transicionar(EstadoReserva::Confirmada));
        assert!(EstadoReserva::Confirmada.puede_transicionar(EstadoReserva::Llegada));
        assert!(EstadoReserva::Llegada.puede_transicionar(EstadoReserva::Completada));
    }

    #[test]
    fn reserva_cancelable_desde_estados_vivos() {
        for estado in [
            EstadoReserva::Pendiente,
            EstadoReserva::Confirmada,
            EstadoReserva::Llegada,
        ] {
            assert!(estado.puede_transicionar(EstadoReserva::Cancelada));
        }
    }

    #[test]
    fn estados_terminales_no_transicionan() {
        for terminal in [EstadoReserva::Cancelada, EstadoReserva::Completada] {
            assert!(terminal.es_terminal());
            for destino in [
                EstadoReserva::Pendiente,
                EstadoReserva::Confirmada,
                EstadoReserva::Llegada,
                EstadoReserva::Cancelada,
                EstadoReserva::Completada,
            ] {
                assert!(!terminal.puede_transicionar(destino));
            }
        }
    }

    #[test]
    fn transiciones_ilegales_rechazadas() {
        // No se puede sentar una reserva cancelada ni "desconfirmar"
        assert!(!EstadoReserva::Cancelada.puede_transicionar(EstadoReserva::Llegada));
        assert!(!EstadoReserva::Confirmada.puede_transicionar(EstadoReserva::Pendiente));
        assert!(!EstadoReserva::Confirmada.puede_transicionar(EstadoReserva::Completada));
    }

    #[test]
    fn terminales_no_cuentan_como_proximas() {
        assert!(EstadoReserva::Confirmada.cuenta_como_proxima());
        assert!(EstadoReserva::Pendiente.cuenta_como_proxima());
        assert!(EstadoReserva::Llegada.cuenta_como_proxima());
        assert!(!EstadoReserva::Cancelada.cuenta_como_proxima());
        assert!(!EstadoReserva::Completada.cuenta_como_proxima());
    }
}
