//! Contabilidade de Recursos (Accounting)
//!
//! Rastreia o consumo de CPU de cada thread: ticks restantes na fatia
//! atual, ticks acumulados e trocas de contexto.

/// Estatísticas de uso de uma thread (em ticks do scheduler)
#[derive(Debug, Clone, Copy, Default)]
pub struct Accounting {
    /// Ticks restantes até a preempção
    pub ticks_left: u32,

    /// Ticks acumulados rodando
    pub total_ticks: u64,

    /// Tick em que a thread rodou pela primeira vez
    pub first_run: Option<u64>,

    /// Tick em que a fatia atual começou
    pub last_start: u64,

    /// Tick em que a thread entrou na run queue (base do aging)
    pub enqueued_at: u64,

    /// Número de trocas de contexto voluntárias (yield, sleep, exit)
    pub voluntary_switches: u64,

    /// Número de trocas de contexto involuntárias (preempção)
    pub involuntary_switches: u64,
}

impl Accounting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra o início da execução (chamado quando a thread ganha a CPU)
    pub fn start_exec(&mut self, now: u64) {
        self.last_start = now;
        self.first_run.get_or_insert(now);
    }

    /// Reinicia a fatia de tempo
    pub fn reset_slice(&mut self, slice: u32) {
        self.ticks_left = slice;
    }

    /// Consome um tick. Retorna `true` quando a fatia acabou.
    pub fn tick(&mut self) -> bool {
        self.total_ticks += 1;
        self.ticks_left = self.ticks_left.saturating_sub(1);
        self.ticks_left == 0
    }

    /// Registra o fim da execução. Retorna a duração da fatia em ticks.
    pub fn end_exec(&mut self, now: u64) -> u64 {
        now.saturating_sub(self.last_start)
    }

    /// Incrementa contadores de troca de contexto
    pub fn account_switch(&mut self, voluntary: bool) {
        if voluntary {
            self.voluntary_switches += 1;
        } else {
            self.involuntary_switches += 1;
        }
    }

    /// Ticks esperando na fila desde o enqueue
    pub fn waiting_for(&self, now: u64) -> u64 {
        now.saturating_sub(self.enqueued_at)
    }
}

#[cfg(test)]
mod tests {
    use super::Accounting;

    #[test]
    fn slice_expires_after_exact_ticks() {
        let mut acc = Accounting::new();
        acc.reset_slice(3);
        assert!(!acc.tick());
        assert!(!acc.tick());
        assert!(acc.tick());
        // Continua expirada sem dar underflow
        assert!(acc.tick());
        assert_eq!(acc.total_ticks, 4);
        assert_eq!(acc.ticks_left, 0);
    }

    #[test]
    fn first_run_is_sticky() {
        let mut acc = Accounting::new();
        acc.start_exec(5);
        acc.start_exec(9);
        assert_eq!(acc.first_run, Some(5));
        assert_eq!(acc.last_start, 9);
        assert_eq!(acc.end_exec(12), 3);
    }
}
