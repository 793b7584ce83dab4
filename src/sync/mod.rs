//! # Synchronization Primitives
//!
//! Primitivas de sincronização para ambiente SMP.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! RawSpinlock → Flag + dono; acquire/release explícitos (sem guard)
//! Spinlock    → Seções críticas curtas (não pode dormir), desabilita IRQs
//! Semaphore   → Controle de recursos contáveis; bloqueia via Blocker
//! ```
//!
//! ## Regras
//!
//! - **Spinlock**: nunca dormir segurando. Nunca readquirir na mesma CPU.
//! - **Semaphore**: `wait` só a partir de contexto de thread (pode bloquear).
//! - **Ordem de Lock**: Sempre adquirir na mesma ordem para evitar deadlock.
//!   No scheduler: slot da CPU → sleep queue → run queues → zumbis.

/// Spinlock (busy-wait, não dorme)
pub mod spinlock;

/// Semáforo (contagem de recursos)
pub mod semaphore;


// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use semaphore::{Blocker, Semaphore};
pub use spinlock::{RawSpinlock, Spinlock, SpinlockGuard};
