//! Core Module
//!
//! Serviços centrais independentes de arquitetura sobre os quais o
//! scheduler é construído: logging, parada fatal, tempo, SMP e processos.

#[macro_use]
pub mod logging;
pub mod panic;
pub mod process;
pub mod smp;
pub mod time;
