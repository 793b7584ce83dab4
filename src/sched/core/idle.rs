//! Loop ocioso
//!
//! Sem thread pronta a CPU fica sem thread corrente: o contexto salvo nessa
//! situação é o `idle_context` do slot, e a CPU espera a próxima interrupção.

use super::scheduler::Scheduler;
use crate::arch::traits::CpuOps;
use crate::arch::Cpu;

impl Scheduler<'_> {
    /// Uma volta do loop ocioso: coleta zumbis, espera uma interrupção e
    /// tenta escalonar.
    pub fn idle(&self) {
        self.reap_zombies();

        Cpu::enable_interrupts();
        Cpu::halt();
        Cpu::disable_interrupts();

        if self.current().is_none() && self.get().is_some() {
            self.reschedule();
        }
    }
}
