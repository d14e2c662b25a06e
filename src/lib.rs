//! # Pispas Salón
//!
//! Gestión en vivo del salón de un restaurante: plano de mesas, sentado de
//! walk-ins, sesiones de comida y ciclo de vida de reservas.
//!
//! La lógica de transiciones de estado vive en [`domain`], independiente de
//! la capa HTTP, y las mutaciones multi-entidad se ejecutan dentro de
//! transacciones de MongoDB en [`db::lifecycle`].

pub mod api;
pub mod db;
pub mod domain;
