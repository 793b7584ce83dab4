//! Plataforma simulada: contexto, espaço de endereçamento, stacks e relógio.

use alloc::boxed::Box;
use alloc::vec;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::arch::stack_arena::StackArena;
use crate::arch::traits::{AddressSpaceOps, ContextOps};
use crate::core::time::{ClockSource, Timestamp, SUBSECONDS_PER_SECOND};
use crate::sched::task::context::CpuContext;
use crate::sys::{AddressSpace, VirtAddr};

// Layout do contexto simulado
const W_ENTRY: usize = 0;
const W_STACK: usize = 1;
const W_KERNEL: usize = 2;
const W_SAVES: usize = 3;

/// Tamanho padrão da região de stacks simulada
pub const SIM_ARENA_SIZE: usize = 8 * 1024 * 1024;

pub struct SimPlatform {
    now_micros: AtomicU64,
    active_space: AtomicU64,
    space_switches: AtomicUsize,
    switches: AtomicUsize,
    last_entry: AtomicU64,
    stacks: StackArena,
    // Mantém viva a região entregue para `stacks`
    _region: Box<[u8]>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::with_arena_size(SIM_ARENA_SIZE)
    }

    pub fn with_arena_size(bytes: usize) -> Self {
        let mut region = vec![0u8; bytes].into_boxed_slice();
        let stacks = StackArena::empty();
        // SAFETY: a região pertence a esta plataforma e vive tanto quanto ela
        unsafe { stacks.init(region.as_mut_ptr(), region.len()) };

        Self {
            now_micros: AtomicU64::new(0),
            active_space: AtomicU64::new(AddressSpace::KERNEL.as_u64()),
            space_switches: AtomicUsize::new(0),
            switches: AtomicUsize::new(0),
            last_entry: AtomicU64::new(0),
            stacks,
            _region: region,
        }
    }

    /// Avança o relógio simulado
    pub fn advance(&self, seconds: u64, subseconds: u32) {
        let delta = seconds * SUBSECONDS_PER_SECOND as u64 + subseconds as u64;
        self.now_micros.fetch_add(delta, Ordering::SeqCst);
    }

    /// Número de trocas de contexto efetuadas
    pub fn switch_count(&self) -> usize {
        self.switches.load(Ordering::SeqCst)
    }

    /// Entry point do último contexto retomado
    pub fn last_entry(&self) -> VirtAddr {
        VirtAddr::new(self.last_entry.load(Ordering::SeqCst))
    }

    /// Espaço de endereçamento ativo
    pub fn active_space(&self) -> AddressSpace {
        AddressSpace::new(self.active_space.load(Ordering::SeqCst))
    }

    /// Quantas vezes o CR3 simulado foi trocado
    pub fn space_switch_count(&self) -> usize {
        self.space_switches.load(Ordering::SeqCst)
    }

    /// Bytes livres na região de stacks
    pub fn free_stack_bytes(&self) -> usize {
        self.stacks.free_bytes()
    }

    /// Quantas vezes um contexto foi salvo por `switch`
    pub fn saves_of(ctx: &CpuContext) -> u64 {
        ctx.words()[W_SAVES]
    }

    /// Entry e topo de stack gravados por `initialize`
    pub fn initial_frame(ctx: &CpuContext) -> (VirtAddr, VirtAddr) {
        let w = ctx.words();
        (VirtAddr::new(w[W_ENTRY]), VirtAddr::new(w[W_STACK]))
    }
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextOps for SimPlatform {
    fn initialize(&self, ctx: &mut CpuContext, entry: VirtAddr, stack_top: VirtAddr, kernel: bool) {
        let w = ctx.words_mut();
        w[W_ENTRY] = entry.as_u64();
        w[W_STACK] = stack_top.as_u64();
        w[W_KERNEL] = kernel as u64;
        w[W_SAVES] = 0;
    }

    unsafe fn switch(&self, old: *mut CpuContext, new: *const CpuContext) {
        // "Salvar" o contexto atual; o load é apenas registrado
        (*old).words_mut()[W_SAVES] += 1;
        self.last_entry
            .store((*new).words()[W_ENTRY], Ordering::SeqCst);
        self.switches.fetch_add(1, Ordering::SeqCst);
    }
}

impl AddressSpaceOps for SimPlatform {
    fn switch_address_space(&self, space: AddressSpace) {
        self.active_space.store(space.as_u64(), Ordering::SeqCst);
        self.space_switches.fetch_add(1, Ordering::SeqCst);
    }

    fn allocate_stack(&self, size: usize) -> Option<VirtAddr> {
        self.stacks.allocate(size)
    }

    fn free_stack(&self, base: VirtAddr, size: usize) {
        self.stacks.free(base, size);
    }
}

impl ClockSource for SimPlatform {
    fn now(&self) -> Timestamp {
        let micros = self.now_micros.load(Ordering::SeqCst);
        Timestamp::new(
            micros / SUBSECONDS_PER_SECOND as u64,
            (micros % SUBSECONDS_PER_SECOND as u64) as u32,
        )
    }
}
