//! Traits do Hardware Abstraction Layer (HAL).
//! Interfaces públicas que o núcleo de escalonamento usa para falar com o hardware.
//!
//! - `CpuOps`: interrupções, halt e `current_cpu_id()` (dispatch estático).
//! - `ContextOps`: preparar e trocar o contexto salvo de uma thread.
//! - `AddressSpaceOps`: trocar espaço de endereçamento e alocar stacks.
//! - `LocalController`: controlador de interrupções local (LAPIC no x86_64).

pub mod context;
pub mod cpu;
pub mod irq;
pub mod mmu;

pub use context::ContextOps;
pub use cpu::CpuOps;
pub use irq::LocalController;
pub use mmu::AddressSpaceOps;

use crate::core::time::ClockSource;

/// Conjunto de capacidades que o scheduler consome de uma plataforma.
///
/// Implementado automaticamente para qualquer tipo que ofereça as três
/// interfaces; o scheduler guarda um `&dyn Platform`.
pub trait Platform: ContextOps + AddressSpaceOps + ClockSource {}

impl<T: ContextOps + AddressSpaceOps + ClockSource> Platform for T {}
