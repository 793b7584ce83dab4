//! Threads: estrutura, estado, contabilidade e ciclo de vida

pub mod accounting;
pub mod context;
pub mod entity;
pub mod lifecycle;
pub mod state;

pub use accounting::Accounting;
pub use context::CpuContext;
pub use entity::{PinnedThread, Thread, ThreadStack};
pub use state::{Priority, ThreadFlags, ThreadStatus, WakeReason};
