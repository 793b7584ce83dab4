//! # Hardware Abstraction Layer (HAL)
//!
//! O módulo `arch` é a **única** ponte entre o núcleo de escalonamento (lógica
//! agnóstica) e o hardware real.
//!
//! ## 🏗️ Arquitetura e Fluxo
//! 1. O núcleo importa `crate::arch::Cpu` (dispatch estático via `CpuOps`).
//! 2. `Cpu` é um *type alias* para a implementação concreta:
//!    - `x86_64::cpu::X64Cpu` em bare-metal (`target_os = "none"`);
//!    - `sim::SimCpu` em qualquer alvo hospedado (testes de host).
//! 3. Troca de contexto, CR3 e stacks chegam ao scheduler como `&dyn Platform`
//!    (`traits::Platform`), de modo que os testes instanciam `sim::SimPlatform`.
//!
//! ## ⚠️ Pontos de Atenção
//! - Apenas x86_64 é suportado em bare-metal. Outro alvo `none` falha na
//!   seleção de `platform` abaixo.

pub mod stack_arena;
pub mod traits;

// Seleção de Arquitetura: x86_64 bare-metal
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod x86_64;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use self::x86_64 as platform;

// Simulação hospedada (testes de host)
#[cfg(not(target_os = "none"))]
pub mod sim;

#[cfg(not(target_os = "none"))]
pub use self::sim as platform;

// Re-exports globais para o kernel usar
pub use platform::Cpu;
pub use traits::*;
