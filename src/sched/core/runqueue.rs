//! Filas de threads prontas
//!
//! Uma `RunQueue` FIFO por nível de prioridade. A seleção percorre os níveis
//! do mais urgente para o menos urgente e, dentro do nível, pega a primeira
//! thread que não esteja ainda saindo de outra CPU (`on_cpu`).

use alloc::collections::VecDeque;

use crate::sched::task::entity::{PinnedThread, Thread};
use crate::sched::task::state::Priority;
use crate::sys::Tid;

/// Fila de execução de um nível (FIFO)
pub struct RunQueue {
    queue: VecDeque<PinnedThread>,
}

impl RunQueue {
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adiciona thread ao fim da fila
    pub fn push(&mut self, thread: PinnedThread) {
        self.queue.push_back(thread);
    }

    /// Posição da primeira thread selecionável
    fn first_eligible(&self) -> Option<usize> {
        self.queue.iter().position(|t| !t.is_on_cpu())
    }

    /// Remove a primeira thread selecionável
    pub fn pop(&mut self) -> Option<PinnedThread> {
        let pos = self.first_eligible()?;
        self.queue.remove(pos)
    }

    pub fn peek(&self) -> Option<&Thread> {
        self.first_eligible().map(|pos| &*self.queue[pos])
    }

    pub fn remove(&mut self, tid: Tid) -> Option<PinnedThread> {
        let pos = self.queue.iter().position(|t| t.tid() == tid)?;
        self.queue.remove(pos)
    }

    /// Número de threads na fila
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Verifica se está vazia
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.queue.iter().map(|t| &**t)
    }
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Conjunto das filas, uma por nível
pub struct RunQueues {
    tiers: [RunQueue; Priority::COUNT],
}

impl RunQueues {
    pub const fn new() -> Self {
        Self {
            tiers: [RunQueue::new(), RunQueue::new(), RunQueue::new()],
        }
    }

    /// Enfileira no fim do nível efetivo da thread
    pub fn push(&mut self, thread: PinnedThread) {
        let tier = thread.priority().index();
        self.tiers[tier].push(thread);
    }

    /// Próxima thread a rodar: primeira selecionável do nível mais urgente
    pub fn pop_next(&mut self) -> Option<PinnedThread> {
        self.tiers.iter_mut().find_map(RunQueue::pop)
    }

    /// Mesma escolha de `pop_next`, sem alterar a ordem
    pub fn peek(&self) -> Option<&Thread> {
        self.tiers.iter().find_map(RunQueue::peek)
    }

    /// Nível da próxima thread selecionável
    pub fn best_priority(&self) -> Option<Priority> {
        self.peek().map(Thread::priority)
    }

    pub fn remove(&mut self, tid: Tid) -> Option<PinnedThread> {
        self.tiers.iter_mut().find_map(|q| q.remove(tid))
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.iter().any(|t| t.tid() == tid)
    }

    pub fn tier(&self, priority: Priority) -> &RunQueue {
        &self.tiers[priority.index()]
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(RunQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(RunQueue::is_empty)
    }

    /// Todas as threads, do nível mais urgente ao menos urgente
    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.tiers.iter().flat_map(RunQueue::iter)
    }

    /// Aging: threads MED/LOW esperando há `threshold` ticks ou mais vão para
    /// o fim da fila HIGH. Retorna quantas foram promovidas.
    pub fn age(&mut self, now: u64, threshold: u64) -> usize {
        if threshold == 0 {
            return 0;
        }

        let mut promoted = 0;
        let (high, lower) = self.tiers.split_at_mut(1);
        let high = &mut high[0];
        for queue in lower.iter_mut().map(|q| &mut q.queue) {
            let mut i = 0;
            while i < queue.len() {
                if queue[i].accounting.waiting_for(now) < threshold {
                    i += 1;
                    continue;
                }
                if let Some(mut thread) = queue.remove(i) {
                    crate::kdebug!("(Sched) Aging: promovendo TID=", thread.tid().as_u32());
                    thread.boost();
                    high.push(thread);
                    promoted += 1;
                }
            }
        }
        promoted
    }
}

impl Default for RunQueues {
    fn default() -> Self {
        Self::new()
    }
}
