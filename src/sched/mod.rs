//! # Multitasking & Scheduler Subsystem
//!
//! O módulo `sched` é o motor de execução do Forge. Ele multiplexa threads
//! de kernel e de usuário sobre todas as CPUs online.
//!
//! ## 🎯 Propósito e Responsabilidade
//! - **Threads:** estrutura (`task::Thread`), estados e ciclo de vida.
//! - **Escalonamento:** três níveis de prioridade (HIGH/MED/LOW), round-robin
//!   dentro do nível, preempção no tick e aging contra starvation.
//! - **Sleep/Block:** suspensão por tempo, condição, lock ou indefinida.
//!
//! ## 🏗️ Arquitetura: Cooperative + Preemptive
//! 1. **Preemptivo:** o timer de cada CPU chama `timer_tick()`.
//! 2. **Cooperativo:** threads cedem via `yield_now()` ou dormindo.
//!
//! O estado vive em `core::Scheduler`. O kernel usa a instância global
//! criada por `init`; as funções livres deste módulo são atalhos para ela.
//!
//! ## ⚠️ Pontos de Atenção
//! - Sem a feature `smp` só a CPU de boot escalona: as demais ficam em halt.
//! - Toda thread nova passa por `finish_switch()` antes do seu `entry`: no
//!   x86_64 o trampolim `thread_entry_trampoline` faz isso e habilita IRQs.

pub mod config;
pub mod core;
pub mod task;
pub mod test;

pub use self::config::SchedConfig;
pub use self::core::{Scheduler, WakeCondition};
pub use self::task::{PinnedThread, Priority, Thread, ThreadFlags, ThreadStatus, WakeReason};

use spin::Once;

use crate::arch::traits::{CpuOps, Platform};
use crate::arch::Cpu;
use crate::core::smp::BSP_CPU;
use crate::core::time::jiffies;

static KERNEL: Once<Scheduler<'static>> = Once::new();

/// Cria o scheduler global sobre a tabela de processadores do kernel.
/// Chamadas seguintes retornam a mesma instância.
pub fn init(platform: &'static dyn Platform, config: SchedConfig) -> &'static Scheduler<'static> {
    KERNEL.call_once(|| Scheduler::new(platform, crate::core::smp::processors(), config))
}

/// Scheduler global, se já inicializado
pub fn kernel() -> Option<&'static Scheduler<'static>> {
    KERNEL.get()
}

/// Esta CPU participa do escalonamento?
fn schedules_here() -> bool {
    cfg!(feature = "smp") || Cpu::current_cpu_id() == BSP_CPU
}

/// Handler do timer (IRQ 0 no BSP, timer do LAPIC nas APs)
pub fn timer_tick() {
    if Cpu::current_cpu_id() == BSP_CPU {
        jiffies::inc_jiffies();
    }
    if !schedules_here() {
        return;
    }
    if let Some(sched) = kernel() {
        sched.timer_tick();
    }
}

/// Primeira ação de toda thread nova
pub fn finish_switch() {
    if let Some(sched) = kernel() {
        sched.finish_switch();
    }
}

/// Yield: cede CPU voluntariamente
pub fn yield_now() {
    if let Some(sched) = kernel() {
        sched.reschedule();
    }
}

/// Termina a thread corrente. Nunca retorna.
pub fn exit(code: i32) -> ! {
    if let Some(sched) = kernel() {
        sched.exit_current(code);
    }
    // Só chega aqui sem scheduler ou se nada retomou a CPU
    crate::kerror!("(Sched) exit retornou");
    Cpu::hang()
}

/// Loop principal de cada CPU (nunca retorna)
pub fn run() -> ! {
    let Some(sched) = kernel() else {
        crate::kerror!("(Sched) run() sem scheduler inicializado");
        Cpu::hang()
    };

    if !schedules_here() {
        crate::kinfo!("(Sched) CPU fora do escalonamento: ", Cpu::current_cpu_id());
        loop {
            Cpu::enable_interrupts();
            Cpu::halt();
        }
    }

    crate::kinfo!("(Sched) Loop principal na CPU: ", Cpu::current_cpu_id());
    Cpu::disable_interrupts();
    sched.reschedule();
    loop {
        sched.idle();
    }
}

/// Executa as suites de self-test de todo o núcleo
#[cfg(feature = "self_test")]
pub fn run_self_tests() -> bool {
    let reports = [
        crate::sync::test::run_sync_tests(),
        crate::core::smp::test::run_smp_tests(),
        crate::core::process::test::run_process_tests(),
        test::run_sched_tests(),
    ];
    let ok = reports.iter().all(|r| r.all_passed());
    if ok {
        crate::kok!("(Sched) Self-tests OK");
    } else {
        crate::kfail!("(Sched) Self-tests falharam");
    }
    ok
}
