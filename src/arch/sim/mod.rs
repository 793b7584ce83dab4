//! Backend hospedado (simulação).
//!
//! Permite executar o núcleo de escalonamento fora do bare-metal:
//! - `SimCpu`: ID de CPU e flag de interrupção simulados (thread-local nos testes);
//! - `SimPlatform`: contexto, CR3, stacks e relógio registrados em memória;
//! - `SimController`: controlador local que pode ser configurado para falhar.
//!
//! `SimPlatform::switch` retorna imediatamente: depois de `reschedule`, o
//! chamador observa a nova thread em `Scheduler::current`.

pub mod controller;
pub mod cpu;
pub mod platform;

pub use controller::SimController;
pub use cpu::{set_current_cpu, SimCpu};
pub use platform::SimPlatform;

/// CPU da plataforma simulada
pub type Cpu = SimCpu;
