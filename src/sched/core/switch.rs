//! Lógica de Troca de Contexto (Context Switching)
//!
//! `switch_cpu` decide o destino da thread que sai (fila, sleep queue ou
//! zumbis), escolhe a próxima, ajusta o CR3 e só então chama o backend.
//!
//! A thread que sai continua com `on_cpu` ligado até o contexto dela estar
//! salvo. Quem retoma execução depois do `switch` chama `finish_switch`, que
//! desliga a flag; uma thread nova passa antes pelo trampolim do backend, que
//! faz o mesmo. Até lá nenhuma outra CPU pode selecioná-la. Um handoff ainda
//! pendente na próxima troca desta CPU é liberado por `prepare_switch`.

use core::ptr::NonNull;
use core::sync::atomic::Ordering;

use super::scheduler::{Handoff, Scheduler};
use crate::arch::traits::CpuOps;
use crate::arch::Cpu;
use crate::core::smp::CpuId;
use crate::sched::task::context::CpuContext;
use crate::sched::task::state::ThreadStatus;
use crate::sys::AddressSpace;

/// Para onde vai a thread que sai da CPU
#[derive(Clone, Copy, PartialEq, Eq)]
enum Departure {
    Requeue,
    Sleep,
    Exit,
}

impl Departure {
    fn of(status: ThreadStatus) -> Self {
        if status.contains(ThreadStatus::STOPPING) {
            Departure::Exit
        } else if status.contains(ThreadStatus::SLEEPING) {
            Departure::Sleep
        } else {
            Departure::Requeue
        }
    }
}

impl Scheduler<'_> {
    /// Cede a CPU voluntariamente. Sem outra thread pronta de nível igual ou
    /// mais urgente, a corrente continua.
    pub fn reschedule(&self) {
        let cpu = self.this_cpu();
        self.switch_cpu(cpu, true);
    }

    /// Troca pedida pelo tick (fatia esgotada ou nível mais urgente pronto)
    pub(super) fn reschedule_involuntary(&self) {
        let cpu = self.this_cpu();
        self.switch_cpu(cpu, false);
    }

    fn switch_cpu(&self, cpu: CpuId, voluntary: bool) {
        let irq = Cpu::are_interrupts_enabled();
        Cpu::disable_interrupts();

        if let Some((old, new)) = self.prepare_switch(cpu, voluntary) {
            // SAFETY: interrupções desabilitadas; `old` e `new` são o contexto
            // ocioso da CPU ou pertencem a threads pinadas que não podem ser
            // destruídas enquanto `on_cpu` estiver ligado.
            unsafe { self.platform.switch(old, new) };
            self.finish_switch();
        }

        if irq {
            Cpu::enable_interrupts();
        }
    }

    /// Move as threads entre slot e filas. Retorna os contextos a trocar, ou
    /// `None` se a corrente continua (ou a CPU segue ociosa).
    pub(crate) fn prepare_switch(
        &self,
        cpu: CpuId,
        voluntary: bool,
    ) -> Option<(*mut CpuContext, *const CpuContext)> {
        let now = self.ticks();

        let mut slot = self.slot(cpu).lock();
        let mut sleepers = self.sleepers.lock();
        let mut queues = self.queues.lock();

        // Estamos de novo nesta CPU: o contexto da troca anterior já foi salvo,
        // mesmo que a thread nova não tenha chamado `finish_switch`.
        if let Some(stale) = slot.handoff.take() {
            crate::kwarn!("(Sched) Handoff pendente liberado na CPU: ", cpu);
            release_handoff(stale);
        }

        let mut prev = slot.current.take();
        let departure = prev.as_ref().map(|t| Departure::of(t.status()));

        // 1. A corrente continua se ninguém pronto é tão urgente quanto ela
        if let Some(thread) = prev.as_mut() {
            if departure == Some(Departure::Requeue) {
                let keep = queues
                    .best_priority()
                    .map_or(true, |best| best > thread.priority());
                if keep {
                    if thread.accounting.ticks_left == 0 {
                        let slice = self.config.timeslice(thread.priority());
                        thread.accounting.reset_slice(slice);
                    }
                    slot.current = prev;
                    return None;
                }
            }
        }

        // 2. Próxima thread
        let mut next = queues.pop_next();
        if prev.is_none() && next.is_none() {
            return None;
        }

        let old: *mut CpuContext = match prev.as_mut() {
            Some(thread) => &mut thread.context,
            None => &mut slot.idle_context,
        };
        slot.handoff = prev
            .as_ref()
            .map(|thread| Handoff(NonNull::from(&thread.on_cpu)));

        // 3. Destino da thread que sai
        if let (Some(mut thread), Some(departure)) = (prev, departure) {
            thread.revert_boost();
            thread.accounting.end_exec(now);
            thread.accounting.account_switch(voluntary);

            match departure {
                Departure::Requeue => {
                    self.make_ready(&mut thread, now);
                    queues.push(thread);
                }
                Departure::Sleep => sleepers.push(thread),
                Departure::Exit => {
                    crate::kdebug!("(Sched) Thread saiu TID=", thread.tid().as_u32());
                    self.zombies.lock().push_back(thread);
                }
            }
        }

        // 4. Preparar a próxima
        let new: *const CpuContext = match next.as_mut() {
            Some(thread) => {
                crate::ktrace!("(Sched) Mudando para TID=", thread.tid().as_u32());
                thread.status = thread.status.with_state(ThreadStatus::RUNNING);
                thread.on_cpu.store(true, Ordering::Release);
                thread.accounting.start_exec(now);
                let slice = self.config.timeslice(thread.priority());
                thread.accounting.reset_slice(slice);
                self.activate_space(cpu, thread.address_space());
                &thread.context
            }
            None => {
                crate::ktrace!("(Sched) CPU ociosa: ", cpu);
                &slot.idle_context
            }
        };

        slot.current = next;
        slot.switches += 1;
        Some((old, new))
    }

    /// Troca o CR3 se a CPU ainda não está no espaço da próxima thread
    fn activate_space(&self, cpu: CpuId, space: AddressSpace) {
        let Some(record) = self.processors.record(cpu) else {
            return;
        };
        if record.active_space() != space {
            self.platform.switch_address_space(space);
            record.set_active_space(space);
        }
    }

    /// Fecha uma troca: libera a thread que saiu desta CPU para ser escolhida
    /// por outras. Chamado logo após o retorno de `switch` e como primeira
    /// ação de uma thread nova.
    pub fn finish_switch(&self) {
        let cpu = self.this_cpu();
        let handoff = self.slot(cpu).lock().handoff.take();
        if let Some(handoff) = handoff {
            release_handoff(handoff);
        }
    }
}

/// Desliga o `on_cpu` da thread que saiu: ela volta a ser selecionável.
fn release_handoff(Handoff(on_cpu): Handoff) {
    // SAFETY: a thread só é destruída depois de `on_cpu` desligar, então o
    // ponteiro ainda é válido aqui.
    unsafe { on_cpu.as_ref() }.store(false, Ordering::Release);
}
