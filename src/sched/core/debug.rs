//! Ferramentas de Debug para o Scheduler

use super::scheduler::Scheduler;

impl Scheduler<'_> {
    /// Imprime o estado de todas as threads conhecidas.
    ///
    /// Usa `try_lock`: pode ser chamado de qualquer contexto, inclusive com
    /// alguma fila já travada (estruturas travadas aparecem como `[Locked]`).
    pub fn dump(&self) {
        crate::ktrace!("--- [TRACE] SCHEDULER: LISTA COMPLETA ---");
        crate::ktrace!("  - Ticks:", self.ticks());

        // 1. Threads correntes
        for record in self.processors.online_records() {
            let cpu = record.cpu_id();
            match self.slot(cpu).try_lock() {
                Some(slot) => {
                    crate::ktrace!("  - CPU:", cpu);
                    crate::ktrace!("    Trocas de contexto:", slot.switches);
                    match slot.current.as_ref() {
                        Some(thread) => {
                            crate::ktrace!("    Running TID:", thread.tid().as_u32());
                            crate::ktrace!("    Prioridade:", thread.priority().index());
                            crate::ktrace!("    Ticks restantes:", thread.accounting().ticks_left);
                        }
                        None => crate::ktrace!("    Ociosa. Ticks ociosos:", slot.idle_ticks),
                    }
                }
                None => crate::ktrace!("  - CPU [Locked]:", cpu),
            }
        }

        // 2. Threads prontas
        if let Some(queues) = self.queues.try_lock() {
            for priority in crate::sched::task::state::Priority::ALL {
                let tier = queues.tier(priority);
                crate::ktrace!(priority.name());
                crate::ktrace!("  - READY count:", tier.len());
                for thread in tier.iter() {
                    crate::ktrace!("    -> TID:", thread.tid().as_u32());
                }
            }
        } else {
            crate::ktrace!("  - RUN QUEUES: [Locked]");
        }

        // 3. Threads dormindo
        if let Some(sleepers) = self.sleepers.try_lock() {
            crate::ktrace!("  - SLEEPING count:", sleepers.len());
            for thread in sleepers.iter() {
                crate::ktrace!("    -> TID:", thread.tid().as_u32());
            }
        } else {
            crate::ktrace!("  - SLEEP QUEUE: [Locked]");
        }

        // 4. Zumbis
        if let Some(zombies) = self.zombies.try_lock() {
            crate::ktrace!("  - ZOMBIE count:", zombies.len());
            for thread in zombies.iter() {
                crate::ktrace!("    -> TID:", thread.tid().as_u32());
            }
        } else {
            crate::ktrace!("  - ZOMBIES: [Locked]");
        }

        crate::ktrace!("--- [TRACE] FIM DO DUMP ---");
    }
}
