//! Capacidades de memória virtual consumidas pelo scheduler.

use crate::sys::{AddressSpace, VirtAddr};

pub trait AddressSpaceOps: Sync {
    /// Ativa `space` na CPU atual (CR3 no x86_64).
    fn switch_address_space(&self, space: AddressSpace);

    /// Aloca uma stack de `size` bytes no espaço ativo e retorna a base.
    /// `None` indica falta de memória.
    fn allocate_stack(&self, size: usize) -> Option<VirtAddr>;

    /// Libera uma stack obtida de `allocate_stack`.
    fn free_stack(&self, base: VirtAddr, size: usize);
}
