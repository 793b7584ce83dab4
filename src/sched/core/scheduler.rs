//! # Orquestrador de Agendamento (High-Level Scheduler)
//!
//! Este arquivo contém o estado do agendador e suas decisões de alto nível:
//! inserção e remoção de threads, consulta da próxima a rodar e o tratamento
//! do tick do timer.
//!
//! ## Mecanismos de Execução:
//! - **Preemptivo:** o tick consome a fatia da thread corrente; ao zerar, ou
//!   quando um nível mais urgente tem threads esperando, a CPU troca de thread.
//! - **Voluntário:** a thread sai da CPU ao dormir (`sleep_until_*`,
//!   `block_current_and_reschedule`), ao ceder (`yield_now`) ou ao terminar.
//!
//! ## Sincronização:
//! - Um slot por CPU guarda a thread corrente. Filas e zumbis são globais.
//! - Ordem de lock: slot da CPU → sleep queue → run queues → zumbis.
//! - Cada thread pertence a exatamente um lugar (slot, run queue, sleep queue
//!   ou zumbis): o `Pin<Box<Thread>>` é movido, nunca copiado.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::runqueue::RunQueues;
use super::sleep_queue::SleepQueue;
use crate::arch::traits::{CpuOps, Platform};
use crate::arch::Cpu;
use crate::core::panic::{kernel_stop, StopCode};
use crate::core::smp::{CpuId, ProcessorTable, BSP_CPU, MAX_CPUS};
use crate::sched::config::SchedConfig;
use crate::sched::task::context::CpuContext;
use crate::sched::task::entity::{PinnedThread, Thread};
use crate::sched::task::state::ThreadStatus;
use crate::sync::{Spinlock, SpinlockGuard};
use crate::sys::Tid;

pub(super) const MODULE: &str = "sched::core";

/// Ponteiro para o `on_cpu` da thread que acabou de sair da CPU.
pub(crate) struct Handoff(pub(crate) NonNull<AtomicBool>);

// SAFETY: a thread apontada está pinada e não pode ser destruída enquanto
// `on_cpu` estiver ligado (destroy e reap verificam a flag).
unsafe impl Send for Handoff {}

/// Estado de uma CPU no scheduler
pub(crate) struct CpuSlot {
    pub(crate) current: Option<PinnedThread>,
    /// Contexto do loop ocioso desta CPU
    pub(crate) idle_context: CpuContext,
    pub(crate) handoff: Option<Handoff>,
    pub(crate) idle_ticks: u64,
    pub(crate) switches: u64,
}

impl CpuSlot {
    const fn new() -> Self {
        Self {
            current: None,
            idle_context: CpuContext::new(),
            handoff: None,
            idle_ticks: 0,
            switches: 0,
        }
    }
}

/// Todas as estruturas que podem guardar uma thread viva, travadas juntas na
/// ordem de lock (slots por ID de CPU, sleep queue, run queues). Enquanto ela
/// existe nenhuma thread está em trânsito entre elas.
pub(crate) struct Census<'a> {
    pub(crate) slots: Vec<SpinlockGuard<'a, CpuSlot>>,
    pub(crate) sleepers: SpinlockGuard<'a, SleepQueue>,
    pub(crate) queues: SpinlockGuard<'a, RunQueues>,
}

impl Census<'_> {
    /// Thread `tid` se ela for a corrente de alguma CPU
    pub(crate) fn current_mut(&mut self, tid: Tid) -> Option<&mut PinnedThread> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.current.as_mut())
            .find(|t| t.tid() == tid)
    }
}

/// Scheduler SMP com três níveis de prioridade.
///
/// O kernel usa uma instância global (`sched::init`); os testes criam
/// instâncias próprias sobre a plataforma simulada.
pub struct Scheduler<'k> {
    pub(crate) platform: &'k dyn Platform,
    pub(crate) processors: &'k ProcessorTable,
    pub(crate) config: SchedConfig,
    pub(crate) cpus: [Spinlock<CpuSlot>; MAX_CPUS],
    pub(crate) sleepers: Spinlock<SleepQueue>,
    pub(crate) queues: Spinlock<RunQueues>,
    pub(crate) zombies: Spinlock<VecDeque<PinnedThread>>,
    ticks: AtomicU64,
}

impl<'k> Scheduler<'k> {
    pub fn new(
        platform: &'k dyn Platform,
        processors: &'k ProcessorTable,
        config: SchedConfig,
    ) -> Self {
        crate::kinfo!("(Sched) Inicializando scheduler...");
        Self {
            platform,
            processors,
            config,
            cpus: core::array::from_fn(|_| Spinlock::named("cpu_slot", CpuSlot::new())),
            sleepers: Spinlock::named("sleep_queue", SleepQueue::new()),
            queues: Spinlock::named("run_queues", RunQueues::new()),
            zombies: Spinlock::named("zombies", VecDeque::new()),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn processors(&self) -> &ProcessorTable {
        self.processors
    }

    /// Ticks do scheduler (avançam na CPU de boot)
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// CPU que está executando, validada contra a tabela de processadores
    pub(crate) fn this_cpu(&self) -> CpuId {
        let cpu = Cpu::current_cpu_id();
        if !self.processors.is_online(cpu) {
            crate::kerror!("(Sched) CPU fora da tabela: ", cpu);
            kernel_stop(StopCode::InvalidCpu, MODULE);
        }
        cpu
    }

    pub(crate) fn slot(&self, cpu: CpuId) -> &Spinlock<CpuSlot> {
        &self.cpus[cpu as usize]
    }

    /// Executa `f` com todas as CPUs online, a sleep queue e as run queues
    /// travadas. As interrupções ficam desabilitadas do primeiro lock até o
    /// último ser solto.
    pub(crate) fn with_census<R>(&self, f: impl FnOnce(&mut Census<'_>) -> R) -> R {
        let irq = Cpu::are_interrupts_enabled();
        Cpu::disable_interrupts();

        let result = {
            let mut census = Census {
                slots: self
                    .processors
                    .online_records()
                    .map(|record| self.slot(record.cpu_id()).lock())
                    .collect(),
                sleepers: self.sleepers.lock(),
                queues: self.queues.lock(),
            };
            f(&mut census)
        };

        if irq {
            Cpu::enable_interrupts();
        }
        result
    }

    /// Prepara `thread` para a fila: executável, com fatia nova
    pub(crate) fn make_ready(&self, thread: &mut Thread, now: u64) {
        thread.status = thread.status.with_state(ThreadStatus::RUNNING);
        thread
            .accounting
            .reset_slice(self.config.timeslice(thread.priority()));
        thread.accounting.enqueued_at = now;
    }

    // =========================================================================
    // RUN QUEUES
    // =========================================================================

    /// Coloca a thread no fim da fila do seu nível. O(1).
    pub fn insert_thread(&self, mut thread: PinnedThread) {
        if thread.has_sleep_descriptor()
            || thread
                .status()
                .intersects(ThreadStatus::SLEEPING | ThreadStatus::STOPPING)
        {
            crate::kerror!("(Sched) insert de thread não executável TID=", thread.tid().as_u32());
            kernel_stop(StopCode::InvalidThreadState, MODULE);
        }

        crate::ktrace!("(Sched) Nova thread na RunQueue TID=", thread.tid().as_u32());
        let now = self.ticks();
        self.make_ready(&mut thread, now);
        self.queues.lock().push(thread);
    }

    /// Retira `tid` da run queue ou da sleep queue e devolve ao chamador.
    ///
    /// A thread volta como STOPPED e sem descritor de sono. Threads correntes
    /// ou ainda saindo de uma CPU não são removíveis (`None`).
    pub fn remove_thread(&self, tid: Tid) -> Option<PinnedThread> {
        let mut thread = {
            let mut sleepers = self.sleepers.lock();
            let mut queues = self.queues.lock();
            let thread = match sleepers.remove(tid) {
                Some(t) => t,
                None => queues.remove(tid)?,
            };

            if thread.is_on_cpu() {
                // Ainda saindo de uma CPU: devolve para onde estava
                crate::kwarn!("(Sched) remove_thread: thread ainda em CPU TID=", tid.as_u32());
                if thread.has_sleep_descriptor() {
                    sleepers.push(thread);
                } else {
                    queues.push(thread);
                }
                return None;
            }
            thread
        };

        thread.sleep = None;
        thread.revert_boost();
        thread.status = thread.status.with_state(ThreadStatus::STOPPED);
        crate::ktrace!("(Sched) Thread removida TID=", tid.as_u32());
        Some(thread)
    }

    /// Próxima thread que seria escolhida, sem alterar a ordem
    pub fn get(&self) -> Option<Tid> {
        self.queues.lock().peek().map(Thread::tid)
    }

    /// Thread corrente na CPU que executa
    pub fn current(&self) -> Option<Tid> {
        let cpu = self.this_cpu();
        self.current_on(cpu)
    }

    /// Thread corrente em `cpu`
    pub fn current_on(&self, cpu: CpuId) -> Option<Tid> {
        if !self.processors.is_online(cpu) {
            return None;
        }
        self.slot(cpu).lock().current.as_ref().map(|t| t.tid())
    }

    /// Executa `f` sobre a thread `tid`, onde quer que ela esteja
    pub fn with_thread<R>(&self, tid: Tid, f: impl FnOnce(&Thread) -> R) -> Option<R> {
        self.with_census(|census| {
            if let Some(t) = census.current_mut(tid) {
                return Some(f(t));
            }
            if let Some(t) = census.sleepers.iter().find(|t| t.tid() == tid) {
                return Some(f(t));
            }
            if let Some(t) = census.queues.iter().find(|t| t.tid() == tid) {
                return Some(f(t));
            }
            self.zombies
                .lock()
                .iter()
                .find(|t| t.tid() == tid)
                .map(|t| f(t))
        })
    }

    /// Threads prontas em todas as filas
    pub fn ready_count(&self) -> usize {
        self.queues.lock().len()
    }

    pub fn sleeping_count(&self) -> usize {
        self.sleepers.lock().len()
    }

    pub fn zombie_count(&self) -> usize {
        self.zombies.lock().len()
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Entrada do timer: contabiliza, acorda, aplica aging e troca se preciso.
    pub fn timer_tick(&self) {
        if self.tick_from_user() {
            self.reschedule_involuntary();
        }
    }

    /// Mesmo trabalho de `timer_tick` sem trocar de thread. Retorna se uma
    /// troca é devida (o caminho de retorno ao usuário chama `reschedule`).
    pub fn tick_from_user(&self) -> bool {
        let cpu = self.this_cpu();
        if cpu == BSP_CPU {
            self.ticks.fetch_add(1, Ordering::AcqRel);
        }
        let now = self.ticks();

        // 1. Contabilizar a thread corrente
        let (mut need_switch, running) = {
            let mut slot = self.slot(cpu).lock();
            match slot.current.as_mut() {
                Some(thread) => {
                    let expired = thread.accounting.tick();
                    let runnable = thread.status().is_runnable();
                    let preemptible = thread.is_preemptible();
                    let due = !runnable || (expired && preemptible);
                    (due, preemptible.then_some(thread.priority()))
                }
                None => {
                    slot.idle_ticks += 1;
                    (true, None)
                }
            }
        };

        // 2. Wake-pass
        self.wake_sleepers();

        // 3. Aging (uma vez por tick global)
        if cpu == BSP_CPU {
            self.queues.lock().age(now, self.config.aging_threshold);
        }

        // 4. Nível mais urgente esperando
        if !need_switch {
            if let Some(priority) = running {
                let best = self.queues.lock().best_priority();
                need_switch = best.is_some_and(|b| b < priority);
            }
        }

        need_switch
    }
}
