//! Ciclo de vida de threads: criação, saída, coleta de zumbis e destruição.
//!
//! CREATED → RUNNING ⇄ SLEEPING → STOPPING → destruída.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::entity::{PinnedThread, Thread, ThreadStack};
use super::state::{ThreadFlags, ThreadStatus};
use crate::core::panic::{kernel_stop, StopCode};
use crate::core::process::Process;
use crate::sched::core::Scheduler;
use crate::sys::{AddressSpace, VirtAddr};

const MODULE: &str = "sched::lifecycle";

impl Scheduler<'_> {
    /// Cria uma thread pronta para ser inserida (não é enfileirada aqui).
    ///
    /// - Threads de usuário ganham uma stack privada mapeada dentro de
    ///   `space` (o CR3 é trocado só durante a alocação).
    /// - Threads de kernel usam a stack de kernel do processo; sem ela,
    ///   recebem uma stack de kernel privada.
    ///
    /// `space` e `entry` não são validados.
    pub fn create_thread(
        &self,
        parent: &Arc<Process>,
        space: AddressSpace,
        entry: VirtAddr,
        mut flags: ThreadFlags,
    ) -> PinnedThread {
        let kernel = flags.contains(ThreadFlags::KERNEL);
        if !kernel && flags.contains(ThreadFlags::NO_PREEMPT) {
            crate::kwarn!("(Task) NO_PREEMPT ignorado em thread de usuário");
            flags.remove(ThreadFlags::NO_PREEMPT);
        }

        let stack = if kernel {
            match parent.kernel_stack() {
                Some(top) => ThreadStack::Shared { top },
                None => self.allocate_private_stack(self.config.kernel_stack_size),
            }
        } else {
            let restore = self.processors.current().active_space();
            self.platform.switch_address_space(space);
            let stack = self.allocate_private_stack(self.config.user_stack_size);
            self.platform.switch_address_space(restore);
            stack
        };

        let mut thread = Thread::new(parent, space, flags, stack);
        self.platform
            .initialize(&mut thread.context, entry, stack.top(), kernel);
        parent.attach_thread();

        crate::kdebug!("(Task) Thread criada TID=", thread.tid().as_u32());
        Box::pin(thread)
    }

    fn allocate_private_stack(&self, size: usize) -> ThreadStack {
        match self.platform.allocate_stack(size) {
            Some(base) => ThreadStack::Private { base, size },
            None => {
                crate::kerror!("(Task) Sem memória para stack de bytes: ", size);
                kernel_stop(StopCode::OutOfMemory, MODULE);
            }
        }
    }

    /// Libera a stack privada e a estrutura.
    ///
    /// Só vale para threads que nunca mais podem rodar: destruir uma thread
    /// dormindo ou ainda em uma CPU para o kernel.
    pub fn destroy_thread(&self, thread: PinnedThread) {
        if thread.is_on_cpu() || thread.is_sleeping() || thread.has_sleep_descriptor() {
            crate::kerror!("(Task) destroy de thread viva TID=", thread.tid().as_u32());
            kernel_stop(StopCode::DestroyLiveThread, MODULE);
        }

        if let ThreadStack::Private { base, size } = thread.stack() {
            if thread.is_kernel() {
                self.platform.free_stack(base, size);
            } else {
                let restore = self.processors.current().active_space();
                self.platform.switch_address_space(thread.address_space());
                self.platform.free_stack(base, size);
                self.platform.switch_address_space(restore);
            }
        }

        if let Some(process) = thread.process() {
            if process.detach_thread() == 0 {
                crate::kdebug!("(Task) Última thread do PID=", process.pid().as_u32());
            }
        }

        crate::ktrace!("(Task) Thread destruída TID=", thread.tid().as_u32());
    }

    /// Termina a thread corrente: ela vira zumbi na próxima troca.
    ///
    /// No hardware não retorna. Na simulação retorna após a troca.
    pub fn exit_current(&self, code: i32) {
        let cpu = self.this_cpu();
        {
            let mut slot = self.slot(cpu).lock();
            let Some(thread) = slot.current.as_mut() else {
                kernel_stop(StopCode::NoCurrentThread, MODULE);
            };
            crate::kinfo!("(Task) exit() chamado. Code=", code);
            thread.exit_code = Some(code);
            thread.sleep = None;
            thread.status = thread.status.with_state(ThreadStatus::STOPPING);
        }
        self.reschedule();
    }

    /// Destrói os zumbis que já saíram de todas as CPUs. Retorna quantos.
    pub fn reap_zombies(&self) -> usize {
        let dead: Vec<PinnedThread> = {
            let mut zombies = self.zombies.lock();
            let mut dead = Vec::new();
            let mut i = 0;
            while i < zombies.len() {
                if zombies[i].is_on_cpu() {
                    i += 1;
                    continue;
                }
                if let Some(thread) = zombies.remove(i) {
                    dead.push(thread);
                }
            }
            dead
        };

        let count = dead.len();
        if count > 0 {
            crate::kdebug!("(Task) Limpando zumbis. Count:", count);
        }
        for thread in dead {
            self.destroy_thread(thread);
        }
        count
    }
}
