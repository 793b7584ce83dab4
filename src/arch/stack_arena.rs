//! Pool de stacks de thread.
//!
//! Um `linked_list_allocator::Heap` sobre uma região fixa, protegido por
//! Spinlock. Usado pelos backends de `AddressSpaceOps` para atender
//! `allocate_stack`/`free_stack`.

use core::alloc::Layout;
use core::ptr::NonNull;

use linked_list_allocator::Heap;

use crate::sync::Spinlock;
use crate::sys::VirtAddr;

/// Alinhamento exigido pela ABI para o topo da stack
pub const STACK_ALIGN: usize = 16;

struct ArenaHeap(Heap);

// SAFETY: Heap só guarda ponteiros para a região que administra e todo
// acesso passa pelo Spinlock da arena.
unsafe impl Send for ArenaHeap {}

pub struct StackArena {
    heap: Spinlock<ArenaHeap>,
}

impl StackArena {
    /// Arena vazia; toda alocação falha até `init`.
    pub const fn empty() -> Self {
        Self {
            heap: Spinlock::named("stack_arena", ArenaHeap(Heap::empty())),
        }
    }

    /// Entrega a região `[base, base + size)` para a arena.
    ///
    /// # Safety
    ///
    /// A região deve ser válida, não usada por mais ninguém e viver tanto
    /// quanto a arena. Chamar apenas uma vez.
    pub unsafe fn init(&self, base: *mut u8, size: usize) {
        self.heap.lock().0.init(base, size);
    }

    /// Reserva `size` bytes e retorna a base da stack.
    pub fn allocate(&self, size: usize) -> Option<VirtAddr> {
        let layout = Layout::from_size_align(size, STACK_ALIGN).ok()?;
        let ptr = self.heap.lock().0.allocate_first_fit(layout).ok()?;
        Some(VirtAddr::new(ptr.as_ptr() as u64))
    }

    /// Devolve uma stack obtida de `allocate` com o mesmo `size`.
    pub fn free(&self, base: VirtAddr, size: usize) {
        let Ok(layout) = Layout::from_size_align(size, STACK_ALIGN) else {
            return;
        };
        if let Some(ptr) = NonNull::new(base.as_u64() as *mut u8) {
            // SAFETY: ptr/layout vieram de `allocate` desta mesma arena
            unsafe { self.heap.lock().0.deallocate(ptr, layout) };
        }
    }

    /// Bytes ainda livres
    pub fn free_bytes(&self) -> usize {
        self.heap.lock().0.free()
    }
}
