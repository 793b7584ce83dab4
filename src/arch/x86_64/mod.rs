//! Backend x86_64 (bare-metal).
//!
//! - `cpu`: CLI/STI/HLT, MSRs, CPUID e o ID lógico via IA32_TSC_AUX.
//! - `context`: assembly de troca de contexto (callee-saved + RSP + RIP).
//! - `lapic`: Local APIC via MMIO (`volatile`).
//! - `serial`: sink de log na COM1.
//! - `platform`: `X64Platform` (ContextOps + AddressSpaceOps + relógio).

pub mod context;
pub mod cpu;
pub mod lapic;
pub mod platform;
pub mod serial;

pub use cpu::X64Cpu as Cpu;
pub use lapic::LocalApic;
pub use platform::X64Platform;
