//! Sleep Queue - Threads suspensas e suas condições de despertar
//!
//! Cada thread dormindo carrega um `SleepDescriptor`. O wake-pass do tick
//! percorre a fila em ordem de chegada, testa deadlines e predicados e
//! devolve as threads prontas para o scheduler recolocá-las na run queue.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::core::time::Timestamp;
use crate::sched::task::entity::{PinnedThread, Thread};
use crate::sched::task::state::{ThreadStatus, WakeReason};
use crate::sync::RawSpinlock;
use crate::sys::Tid;

/// Predicado de despertar. Recebe o contexto opaco registrado junto.
///
/// Roda com o lock da sleep queue travado: não pode tocar locks do scheduler.
pub type WakePredicate = Box<dyn Fn(usize) -> bool + Send>;

/// Quando uma thread dormindo pode acordar
pub enum WakeCondition {
    /// Só por `wakeup` explícito
    Never,
    /// No deadline absoluto (ou depois)
    Deadline(Timestamp),
    /// Quando `test(context)` retornar verdadeiro
    Predicate { test: WakePredicate, context: usize },
}

impl WakeCondition {
    pub fn predicate(test: impl Fn(usize) -> bool + Send + 'static, context: usize) -> Self {
        WakeCondition::Predicate {
            test: Box::new(test),
            context,
        }
    }

    /// Acorda quando `lock` estiver livre
    pub fn unlocked(lock: &'static RawSpinlock) -> Self {
        Self::predicate(move |_| !lock.is_locked(), 0)
    }

    /// `Some(motivo)` se a condição já foi satisfeita
    fn evaluate(&self, now: Timestamp) -> Option<WakeReason> {
        match self {
            WakeCondition::Never => None,
            WakeCondition::Deadline(deadline) if now >= *deadline => Some(WakeReason::Time),
            WakeCondition::Deadline(_) => None,
            WakeCondition::Predicate { test, context } => {
                test(*context).then_some(WakeReason::Condition)
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            WakeCondition::Never => "NEVER",
            WakeCondition::Deadline(_) => "TIME",
            WakeCondition::Predicate { .. } => "CONDITION",
        }
    }
}

/// Descritor de sono. Criado ao bloquear, consumido uma única vez ao acordar.
pub struct SleepDescriptor {
    owner: Tid,
    condition: WakeCondition,
}

impl SleepDescriptor {
    pub fn new(owner: Tid, condition: WakeCondition) -> Box<Self> {
        Box::new(Self { owner, condition })
    }

    pub fn owner(&self) -> Tid {
        self.owner
    }

    pub fn condition(&self) -> &WakeCondition {
        &self.condition
    }

    pub fn kind(&self) -> &'static str {
        self.condition.kind()
    }
}

/// Anexa o descritor e marca a thread como SLEEPING
pub(crate) fn put_to_sleep(thread: &mut Thread, condition: WakeCondition) {
    thread.sleep = Some(SleepDescriptor::new(thread.tid(), condition));
    thread.status = thread.status.with_state(ThreadStatus::SLEEPING);
    thread.last_wake = WakeReason::None;
}

/// Consome o descritor e deixa a thread executável
pub(crate) fn wake_thread(thread: &mut Thread, reason: WakeReason) {
    thread.sleep = None;
    thread.last_wake = reason;
    thread.status = thread.status.with_state(ThreadStatus::RUNNING);
}

/// Fila de threads dormindo, em ordem de chegada
pub struct SleepQueue {
    sleepers: VecDeque<PinnedThread>,
}

impl SleepQueue {
    pub const fn new() -> Self {
        Self {
            sleepers: VecDeque::new(),
        }
    }

    pub fn push(&mut self, thread: PinnedThread) {
        debug_assert!(thread.has_sleep_descriptor());
        self.sleepers.push_back(thread);
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.sleepers.iter().any(|t| t.tid() == tid)
    }

    /// Remove `tid` da fila (sem acordar)
    pub fn remove(&mut self, tid: Tid) -> Option<PinnedThread> {
        let pos = self.sleepers.iter().position(|t| t.tid() == tid)?;
        self.sleepers.remove(pos)
    }

    /// Remove e acorda `tid` com motivo FORCED
    pub fn force_wake(&mut self, tid: Tid) -> Option<PinnedThread> {
        let mut thread = self.remove(tid)?;
        wake_thread(&mut thread, WakeReason::Forced);
        Some(thread)
    }

    /// Retira da fila todas as threads cuja condição foi satisfeita
    pub fn collect_ready(&mut self, now: Timestamp) -> Vec<PinnedThread> {
        let mut ready = Vec::new();

        // Contador manual: remover enquanto percorre
        let mut i = 0;
        while i < self.sleepers.len() {
            let reason = self.sleepers[i]
                .sleep
                .as_ref()
                .and_then(|d| d.condition.evaluate(now));

            match reason {
                Some(reason) => {
                    if let Some(mut thread) = self.sleepers.remove(i) {
                        crate::ktrace!("(Sleep) Acordando TID=", thread.tid().as_u32());
                        wake_thread(&mut thread, reason);
                        ready.push(thread);
                    }
                    // Não incrementa i: o próximo item agora está nesta posição
                }
                None => i += 1,
            }
        }

        ready
    }

    pub fn len(&self) -> usize {
        self.sleepers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sleepers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.sleepers.iter().map(|t| &**t)
    }
}

impl Default for SleepQueue {
    fn default() -> Self {
        Self::new()
    }
}
