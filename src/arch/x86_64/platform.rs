//! Plataforma x86_64: capacidades consumidas pelo scheduler.

use core::sync::atomic::{AtomicU64, Ordering};

use super::context;
use super::cpu::X64Cpu;
use crate::arch::stack_arena::StackArena;
use crate::arch::traits::{AddressSpaceOps, ContextOps};
use crate::core::time::{ClockSource, MonotonicClock, Timestamp};
use crate::sched::task::context::CpuContext;
use crate::sys::{AddressSpace, VirtAddr};

pub struct X64Platform {
    stacks: StackArena,
    clock: MonotonicClock,
    /// PML4 do kernel, carregada para `AddressSpace::KERNEL`. Zero até a
    /// primeira troca de espaço.
    kernel_root: AtomicU64,
}

impl X64Platform {
    pub const fn new() -> Self {
        Self {
            stacks: StackArena::empty(),
            clock: MonotonicClock,
            kernel_root: AtomicU64::new(0),
        }
    }

    /// PML4 física que `space` representa.
    ///
    /// Só `switch_address_space` escreve no CR3, então na primeira chamada
    /// ele ainda contém a PML4 do boot, que passa a ser a do kernel.
    fn root_of(&self, space: AddressSpace) -> u64 {
        let kernel = match self.kernel_root.load(Ordering::Acquire) {
            0 => {
                let boot = X64Cpu::read_cr3();
                match self
                    .kernel_root
                    .compare_exchange(0, boot, Ordering::AcqRel, Ordering::Acquire)
                {
                    Ok(_) => boot,
                    Err(adopted) => adopted,
                }
            }
            adopted => adopted,
        };
        if space == AddressSpace::KERNEL {
            kernel
        } else {
            space.as_u64()
        }
    }

    /// Entrega a região de onde saem as stacks de thread.
    ///
    /// # Safety
    /// Região mapeada, exclusiva e permanente. Chamar uma vez no boot.
    pub unsafe fn init_stacks(&self, base: *mut u8, size: usize) {
        self.stacks.init(base, size);
    }
}

impl ContextOps for X64Platform {
    fn initialize(&self, ctx: &mut CpuContext, entry: VirtAddr, stack_top: VirtAddr, _kernel: bool) {
        // Threads de usuário: `entry` é o trampolim de kernel que faz o IRETQ
        context::initialize(ctx, entry, stack_top);
    }

    unsafe fn switch(&self, old: *mut CpuContext, new: *const CpuContext) {
        context::switch(old, new);
    }
}

impl AddressSpaceOps for X64Platform {
    /// `AddressSpace::KERNEL` carrega a PML4 do boot, então o CR3
    /// real sempre corresponde ao `active_space` do registro da CPU.
    fn switch_address_space(&self, space: AddressSpace) {
        let root = self.root_of(space);
        if X64Cpu::read_cr3() != root {
            // SAFETY: handles de espaço são PML4 válidas criadas pela VMM e
            // a do kernel foi lida do próprio CR3 no boot
            unsafe { X64Cpu::write_cr3(root) };
        }
    }

    fn allocate_stack(&self, size: usize) -> Option<VirtAddr> {
        self.stacks.allocate(size)
    }

    fn free_stack(&self, base: VirtAddr, size: usize) {
        self.stacks.free(base, size);
    }
}

impl ClockSource for X64Platform {
    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
