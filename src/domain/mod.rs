//! # Módulo de dominio
//!
//! Reglas del ciclo de vida del salón, independientes de HTTP y de MongoDB:
//!
//! - [`status`] - Estados de mesas y reservas con su tabla de transiciones
//! - [`floor`] - Composición pura del plano del salón

pub mod floor;
pub mod status;

pub use floor::{build_floor_plan, PlanoMesa, PlanoSalon, LIMITE_PROXIMAS};
pub use status::{EfectoMesa, EstadoMesa, EstadoReserva};
