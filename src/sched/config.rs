//! Constantes de configuração do Scheduler

use super::task::state::Priority;

/// Timeslice (em ticks) de cada nível de prioridade
pub const TIMESLICE_HIGH: u32 = 20;
pub const TIMESLICE_MEDIUM: u32 = 10;
pub const TIMESLICE_LOW: u32 = 5;

/// Ticks na fila sem rodar até uma thread MED/LOW ser promovida para HIGH.
/// Zero desliga o aging.
pub const AGING_THRESHOLD_TICKS: u64 = 100;

/// Tamanho padrão da Stack de Kernel (em bytes)
pub const KERNEL_STACK_SIZE: usize = 64 * 1024;

/// Tamanho padrão da Stack de usuário (em bytes)
pub const USER_STACK_SIZE: usize = 64 * 1024;

/// Parâmetros de uma instância do scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Indexado por `Priority::index()`
    pub timeslices: [u32; Priority::COUNT],
    pub aging_threshold: u64,
    pub kernel_stack_size: usize,
    pub user_stack_size: usize,
}

impl SchedConfig {
    pub const fn new() -> Self {
        Self {
            timeslices: [TIMESLICE_HIGH, TIMESLICE_MEDIUM, TIMESLICE_LOW],
            aging_threshold: AGING_THRESHOLD_TICKS,
            kernel_stack_size: KERNEL_STACK_SIZE,
            user_stack_size: USER_STACK_SIZE,
        }
    }

    /// Timeslice de um nível (nunca zero)
    pub const fn timeslice(&self, priority: Priority) -> u32 {
        let slice = self.timeslices[priority.index()];
        if slice == 0 {
            1
        } else {
            slice
        }
    }

    pub const fn without_aging(mut self) -> Self {
        self.aging_threshold = 0;
        self
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::new()
    }
}
