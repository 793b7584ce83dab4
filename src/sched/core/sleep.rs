//! Sleep/Block Manager
//!
//! Suspende threads com uma condição de despertar e as devolve à run queue.
//!
//! Uma thread corrente que dorme continua no slot da CPU, marcada SLEEPING,
//! até a próxima troca movê-la para a sleep queue. Um `wakeup` nessa janela
//! encontra a thread ainda no slot e apenas desfaz a marca, então o aviso
//! nunca se perde.

use super::scheduler::{Scheduler, MODULE};
use super::sleep_queue::{put_to_sleep, wake_thread, WakeCondition};
use crate::core::panic::{kernel_stop, StopCode};
use crate::sched::task::state::WakeReason;
use crate::sync::{Blocker, RawSpinlock};
use crate::sys::Tid;

impl Scheduler<'_> {
    /// Suspende `tid` até um `wakeup` explícito
    pub fn sleep_until_never(&self, tid: Tid) {
        self.sleep(tid, WakeCondition::Never);
    }

    /// Suspende `tid` até `test(context)` retornar verdadeiro no wake-pass
    pub fn sleep_until_condition(
        &self,
        tid: Tid,
        test: impl Fn(usize) -> bool + Send + 'static,
        context: usize,
    ) {
        self.sleep(tid, WakeCondition::predicate(test, context));
    }

    /// Suspende `tid` por um intervalo relativo ao relógio da plataforma
    pub fn sleep_until_time(&self, tid: Tid, seconds: u64, subseconds: u32) {
        let deadline = self.platform.relative(seconds, subseconds);
        self.sleep(tid, WakeCondition::Deadline(deadline));
    }

    /// Suspende `tid` até `lock` ser liberado
    pub fn sleep_until_unlocked(&self, tid: Tid, lock: &'static RawSpinlock) {
        self.sleep(tid, WakeCondition::unlocked(lock));
    }

    fn sleep(&self, tid: Tid, condition: WakeCondition) {
        self.with_census(|census| {
            // 1. Corrente em alguma CPU: marca no lugar, a troca move depois
            if let Some(thread) = census.current_mut(tid) {
                if thread.is_sleeping() {
                    crate::kerror!("(Sleep) Thread já dormindo TID=", tid.as_u32());
                    kernel_stop(StopCode::InvalidThreadState, MODULE);
                }
                crate::ktrace!("(Sleep) Corrente vai dormir TID=", tid.as_u32());
                put_to_sleep(thread, condition);
                return;
            }

            // 2. Pronta na run queue
            if let Some(mut thread) = census.queues.remove(tid) {
                crate::ktrace!("(Sleep) Thread pronta vai dormir TID=", tid.as_u32());
                thread.revert_boost();
                put_to_sleep(&mut thread, condition);
                census.sleepers.push(thread);
                return;
            }

            if census.sleepers.contains(tid) {
                crate::kerror!("(Sleep) Thread já dormindo TID=", tid.as_u32());
            } else {
                crate::kerror!("(Sleep) TID desconhecido: ", tid.as_u32());
            }
            kernel_stop(StopCode::InvalidThreadState, MODULE);
        })
    }

    /// Acorda `tid` (motivo FORCED). Idempotente: `false` se ele não estava
    /// dormindo.
    pub fn wakeup(&self, tid: Tid) -> bool {
        let now = self.ticks();
        self.with_census(|census| {
            if let Some(thread) = census.current_mut(tid) {
                if !thread.is_sleeping() {
                    return false;
                }
                crate::ktrace!("(Sleep) Wakeup antes da troca TID=", tid.as_u32());
                wake_thread(thread, WakeReason::Forced);
                return true;
            }

            match census.sleepers.force_wake(tid) {
                Some(mut thread) => {
                    crate::ktrace!("(Sleep) Wakeup TID=", tid.as_u32());
                    self.make_ready(&mut thread, now);
                    census.queues.push(thread);
                    true
                }
                None => false,
            }
        })
    }

    /// Wake-pass: move para a run queue toda thread cuja condição foi
    /// satisfeita. Retorna quantas acordaram.
    pub fn wake_sleepers(&self) -> usize {
        let now = self.platform.now();
        let ticks = self.ticks();

        // Sleep queue e run queues juntas: a thread acordada nunca fica fora
        // das duas
        let mut sleepers = self.sleepers.lock();
        let ready = sleepers.collect_ready(now);
        if ready.is_empty() {
            return 0;
        }

        let woken = ready.len();
        let mut queues = self.queues.lock();
        for mut thread in ready {
            self.make_ready(&mut thread, ticks);
            queues.push(thread);
        }
        woken
    }

    /// Bloqueia a thread corrente com `condition` e troca de thread.
    ///
    /// Retorna quando ela for acordada e escolhida de novo.
    pub fn block_current_and_reschedule(&self, condition: WakeCondition) {
        let cpu = self.this_cpu();
        {
            let mut slot = self.slot(cpu).lock();
            let Some(thread) = slot.current.as_mut() else {
                kernel_stop(StopCode::NoCurrentThread, MODULE);
            };
            put_to_sleep(thread, condition);
        }
        self.reschedule();
    }
}

impl Blocker for Scheduler<'_> {
    fn prepare_block(&self) -> Tid {
        let cpu = self.this_cpu();
        let mut slot = self.slot(cpu).lock();
        let Some(thread) = slot.current.as_mut() else {
            kernel_stop(StopCode::NoCurrentThread, MODULE);
        };
        if !thread.is_sleeping() {
            put_to_sleep(thread, WakeCondition::Never);
        }
        thread.tid()
    }

    fn block_current(&self) {
        self.reschedule();
    }

    fn wake(&self, tid: Tid) {
        self.wakeup(tid);
    }
}
