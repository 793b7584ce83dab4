//! Forge Sched Library.
//!
//! Núcleo de escalonamento SMP do kernel Forge.
//! Define a estrutura hierárquica do subsistema: HAL, primitivas de
//! sincronização, threads, sleep/block e bring-up de CPUs.
//!
//! Em alvos bare-metal (`target_os = "none"`) o backend é `arch::x86_64`.
//! Em qualquer outro alvo o backend é `arch::sim`, usado pelos testes.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (necessário para Vec/Box/Arc)
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
#[macro_use]
pub mod core; // Logging, Panic, Tempo, SMP, Processo
pub mod arch; // HAL (CPU, Contexto, Espaço de Endereçamento)

// --- Módulos Centrais ---
pub mod klib; // Utilitários Internos (Bitmap, Testes)
pub mod sync; // Primitivas de Sincronização (Spinlock, Semáforo)
pub mod sys; // Definições de Sistema (Erros, Tipos)

// --- Subsistemas ---
pub mod sched; // Scheduler e Threads

pub use crate::sched::core::Scheduler;
pub use crate::sys::{Errno, Pid, Tid};
