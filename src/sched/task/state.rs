//! Estados, flags e prioridade de thread

use bitflags::bitflags;

bitflags! {
    /// Estado de escalonamento de uma thread.
    ///
    /// `RUNNING` significa "executável": rodando numa CPU ou esperando na
    /// run queue. `STOPPED` é uma thread que não está em fila nenhuma
    /// (recém-criada ou removida).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadStatus: u32 {
        /// Thread de kernel (espelho de `ThreadFlags::KERNEL`)
        const KERNEL   = 1 << 0;
        const STOPPED  = 1 << 1;
        const RUNNING  = 1 << 2;
        /// Tem um descritor de sono; sai da CPU no próximo reschedule
        const SLEEPING = 1 << 3;
        /// Terminando; vai para a lista de zumbis
        const STOPPING = 1 << 4;
    }
}

bitflags! {
    /// Flags de criação
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadFlags: u32 {
        const KERNEL     = 1 << 0;
        /// Não sofre preempção por timeslice (só threads de kernel)
        const NO_PREEMPT = 1 << 1;
        /// Criada como filha de outra thread do mesmo processo
        const CHILD      = 1 << 2;
    }
}

impl ThreadStatus {
    /// Executável e sem sono/término pendente
    pub fn is_runnable(self) -> bool {
        self.contains(ThreadStatus::RUNNING)
            && !self.intersects(ThreadStatus::SLEEPING | ThreadStatus::STOPPING)
    }

    /// Troca os bits de estado preservando `KERNEL`
    pub fn with_state(self, state: ThreadStatus) -> ThreadStatus {
        (self & ThreadStatus::KERNEL) | state
    }
}

/// Nível de prioridade (três filas)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High = 0,
    Medium = 1,
    Low = 2,
}

impl Priority {
    pub const COUNT: usize = 3;

    /// Do mais urgente ao menos urgente
    pub const ALL: [Priority; Priority::COUNT] = [Priority::High, Priority::Medium, Priority::Low];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MED",
            Priority::Low => "LOW",
        }
    }
}

/// Por que a última espera da thread terminou
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WakeReason {
    /// Nunca dormiu (ou ainda dorme)
    #[default]
    None,
    /// `wakeup` explícito
    Forced,
    /// Deadline atingido
    Time,
    /// Predicado ficou verdadeiro
    Condition,
}
