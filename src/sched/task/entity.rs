//! Thread Control Block

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::accounting::Accounting;
use super::context::CpuContext;
use super::state::{Priority, ThreadFlags, ThreadStatus, WakeReason};
use crate::arch::stack_arena::STACK_ALIGN;
use crate::core::process::Process;
use crate::klib::align_down;
use crate::sched::core::sleep_queue::SleepDescriptor;
use crate::sys::{AddressSpace, Pid, Tid, VirtAddr};

/// Thread ID counter
static NEXT_TID: AtomicU32 = AtomicU32::new(1);

/// Thread em memória estável. O contexto salvo é apontado pelo backend
/// durante a troca, então a thread nunca muda de endereço.
pub type PinnedThread = Pin<Box<Thread>>;

/// Stack de execução da thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStack {
    /// Alocada para esta thread; liberada no destroy
    Private { base: VirtAddr, size: usize },
    /// Stack de kernel do processo, compartilhada
    Shared { top: VirtAddr },
}

impl ThreadStack {
    pub fn top(&self) -> VirtAddr {
        match *self {
            ThreadStack::Private { base, size } => {
                VirtAddr::new(align_down(base.as_u64() + size as u64, STACK_ALIGN as u64))
            }
            ThreadStack::Shared { top } => top,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, ThreadStack::Private { .. })
    }
}

/// Thread Control Block
pub struct Thread {
    tid: Tid,
    pid: Pid,
    process: Weak<Process>,
    /// Estado atual
    pub(crate) status: ThreadStatus,
    flags: ThreadFlags,
    /// Nível de origem
    base_priority: Priority,
    /// Nível efetivo (difere do base enquanto promovido por aging)
    pub(crate) priority: Priority,
    /// Estatísticas de contabilidade
    pub(crate) accounting: Accounting,
    /// Presente apenas enquanto SLEEPING
    pub(crate) sleep: Option<Box<SleepDescriptor>>,
    pub(crate) last_wake: WakeReason,
    /// Contexto de CPU salvo
    pub(crate) context: CpuContext,
    address_space: AddressSpace,
    stack: ThreadStack,
    /// Selecionada por uma CPU e contexto ainda não salvo
    pub(crate) on_cpu: AtomicBool,
    pub(crate) exit_code: Option<i32>,
    /// Nome (debug)
    name: [u8; 32],
}

impl Thread {
    pub(crate) fn new(
        process: &Arc<Process>,
        address_space: AddressSpace,
        flags: ThreadFlags,
        stack: ThreadStack,
    ) -> Self {
        let tid = Tid::new(NEXT_TID.fetch_add(1, Ordering::Relaxed));

        let mut status = ThreadStatus::STOPPED;
        if flags.contains(ThreadFlags::KERNEL) {
            status |= ThreadStatus::KERNEL;
        }

        Self {
            tid,
            pid: process.pid(),
            process: Arc::downgrade(process),
            status,
            flags,
            base_priority: Priority::Medium,
            priority: Priority::Medium,
            accounting: Accounting::new(),
            sleep: None,
            last_wake: WakeReason::None,
            context: CpuContext::new(),
            address_space,
            stack,
            on_cpu: AtomicBool::new(false),
            exit_code: None,
            name: [0; 32],
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Processo dono, se ainda existe
    pub fn process(&self) -> Option<Arc<Process>> {
        self.process.upgrade()
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn flags(&self) -> ThreadFlags {
        self.flags
    }

    pub fn is_kernel(&self) -> bool {
        self.flags.contains(ThreadFlags::KERNEL)
    }

    /// NO_PREEMPT só vale para threads de kernel
    pub fn is_preemptible(&self) -> bool {
        !(self.is_kernel() && self.flags.contains(ThreadFlags::NO_PREEMPT))
    }

    /// Nível efetivo
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn base_priority(&self) -> Priority {
        self.base_priority
    }

    /// Promovida por aging até a próxima rotação
    pub fn is_boosted(&self) -> bool {
        self.priority != self.base_priority
    }

    /// Define o nível. Só tem efeito em fila na próxima inserção.
    pub fn set_priority(&mut self, priority: Priority) {
        self.base_priority = priority;
        self.priority = priority;
    }

    pub(crate) fn boost(&mut self) {
        self.priority = Priority::High;
    }

    pub(crate) fn revert_boost(&mut self) {
        self.priority = self.base_priority;
    }

    pub fn accounting(&self) -> &Accounting {
        &self.accounting
    }

    pub fn is_sleeping(&self) -> bool {
        self.status.contains(ThreadStatus::SLEEPING)
    }

    pub fn has_sleep_descriptor(&self) -> bool {
        self.sleep.is_some()
    }

    /// Motivo do último despertar
    pub fn last_wake_reason(&self) -> WakeReason {
        self.last_wake
    }

    pub fn address_space(&self) -> AddressSpace {
        self.address_space
    }

    pub fn stack(&self) -> ThreadStack {
        self.stack
    }

    pub fn is_on_cpu(&self) -> bool {
        self.on_cpu.load(Ordering::Acquire)
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn context(&self) -> &CpuContext {
        &self.context
    }

    pub fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(self.name.len() - 1);
        self.name = [0; 32];
        self.name[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..end]).unwrap_or("?")
    }
}
