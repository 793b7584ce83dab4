//! Interface Abstrata de CPU (HAL).
//! Define as operações que qualquer arquitetura (ou a simulação hospedada) deve implementar.

use crate::core::smp::topology::CpuId;

pub trait CpuOps {
    /// ID lógico da CPU em execução (índice na tabela de processadores).
    ///
    /// Única forma do núcleo descobrir "em qual CPU estou". O mecanismo
    /// (MSR, segmento GS, thread-local na simulação) fica no backend.
    fn current_cpu_id() -> CpuId;

    /// Para a execução da CPU até a próxima interrupção (instrução HLT).
    fn halt();

    /// Desabilita interrupções localmente (CLI).
    fn disable_interrupts();

    /// Habilita interrupções localmente (STI).
    fn enable_interrupts();

    /// Verifica se as interrupções estão habilitadas.
    fn are_interrupts_enabled() -> bool;

    /// Entra em loop infinito de halt com interrupções desabilitadas.
    /// Usado em pânicos irrecuperáveis.
    fn hang() -> ! {
        Self::disable_interrupts();
        loop {
            Self::halt();
        }
    }
}
