//! CPU simulada.

use crate::arch::traits::CpuOps;
use crate::core::smp::topology::CpuId;

pub struct SimCpu;

// Nos testes cada thread do host representa uma CPU lógica independente.
#[cfg(test)]
mod state {
    use core::cell::Cell;

    std::thread_local! {
        static CPU_ID: Cell<u32> = const { Cell::new(0) };
        static IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
    }

    pub fn cpu_id() -> u32 {
        CPU_ID.with(|c| c.get())
    }

    pub fn set_cpu_id(id: u32) {
        CPU_ID.with(|c| c.set(id));
    }

    pub fn irq_enabled() -> bool {
        IRQ_ENABLED.with(|c| c.get())
    }

    pub fn set_irq_enabled(on: bool) {
        IRQ_ENABLED.with(|c| c.set(on));
    }
}

#[cfg(not(test))]
mod state {
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    static CPU_ID: AtomicU32 = AtomicU32::new(0);
    static IRQ_ENABLED: AtomicBool = AtomicBool::new(true);

    pub fn cpu_id() -> u32 {
        CPU_ID.load(Ordering::Relaxed)
    }

    pub fn set_cpu_id(id: u32) {
        CPU_ID.store(id, Ordering::Relaxed);
    }

    pub fn irq_enabled() -> bool {
        IRQ_ENABLED.load(Ordering::Relaxed)
    }

    pub fn set_irq_enabled(on: bool) {
        IRQ_ENABLED.store(on, Ordering::Relaxed);
    }
}

/// Define qual CPU lógica o contexto atual representa.
pub fn set_current_cpu(id: CpuId) {
    state::set_cpu_id(id);
}

impl CpuOps for SimCpu {
    fn current_cpu_id() -> CpuId {
        state::cpu_id()
    }

    fn halt() {
        core::hint::spin_loop();
    }

    fn disable_interrupts() {
        state::set_irq_enabled(false);
    }

    fn enable_interrupts() {
        state::set_irq_enabled(true);
    }

    fn are_interrupts_enabled() -> bool {
        state::irq_enabled()
    }
}
