/// Arquivo: core/smp/percpu.rs
///
/// Propósito: Registro por processador (`ProcessorRecord`) e a tabela que os
/// agrupa (`ProcessorTable`).
///
/// Detalhes de Implementação:
/// - Abordagem baseada em Array: `[ProcessorRecord; MAX_CPUS]`, indexado
///   pelo ID lógico retornado por `Cpu::current_cpu_id()` (O(1)).
/// - Todos os campos são atômicos ou `Once`: qualquer CPU pode ler qualquer
///   registro sem lock.
/// - `active_space` é escrito apenas pela própria CPU (troca de contexto).
/// - Antes do bring-up só a CPU de boot (0) é considerada online.
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use spin::Once;

use super::topology::{CpuId, BSP_CPU};
use crate::arch::traits::CpuOps;
use crate::arch::Cpu;
use crate::core::panic::{kernel_stop, StopCode};
use crate::sys::AddressSpace;

/// Número máximo de CPUs suportadas.
pub const MAX_CPUS: usize = 32;

/// Identidade da CPU reportada pelo CPUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuIdentity {
    vendor: [u8; 12],
    brand: [u8; 48],
}

impl CpuIdentity {
    pub const fn new(vendor: [u8; 12], brand: [u8; 48]) -> Self {
        Self { vendor, brand }
    }

    /// Constrói a partir de strings (trunca o que não couber)
    pub fn from_strs(vendor: &str, brand: &str) -> Self {
        let mut v = [0u8; 12];
        let mut b = [0u8; 48];
        for (dst, src) in v.iter_mut().zip(vendor.bytes()) {
            *dst = src;
        }
        for (dst, src) in b.iter_mut().zip(brand.bytes()) {
            *dst = src;
        }
        Self::new(v, b)
    }

    pub fn vendor(&self) -> &str {
        trim_ascii(&self.vendor)
    }

    pub fn brand(&self) -> &str {
        trim_ascii(&self.brand)
    }
}

/// Corta NULs finais e espaços nas pontas (o brand do CPUID vem com padding)
fn trim_ascii(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).unwrap_or("").trim()
}

/// Estado de uma CPU lógica
pub struct ProcessorRecord {
    cpu_id: AtomicU32,
    /// Espaço de endereçamento carregado agora nesta CPU
    active_space: AtomicU64,
    /// ID do controlador local (APIC ID)
    controller_id: AtomicU32,
    online: AtomicBool,
    identity: Once<CpuIdentity>,
}

impl ProcessorRecord {
    const fn new(cpu_id: CpuId, online: bool) -> Self {
        Self {
            cpu_id: AtomicU32::new(cpu_id),
            active_space: AtomicU64::new(AddressSpace::KERNEL.as_u64()),
            controller_id: AtomicU32::new(0),
            online: AtomicBool::new(online),
            identity: Once::new(),
        }
    }

    pub fn cpu_id(&self) -> CpuId {
        self.cpu_id.load(Ordering::Relaxed)
    }

    pub fn active_space(&self) -> AddressSpace {
        AddressSpace::new(self.active_space.load(Ordering::Acquire))
    }

    /// Atualiza o espaço ativo. Só a própria CPU escreve este campo.
    pub(crate) fn set_active_space(&self, space: AddressSpace) {
        debug_assert_eq!(Cpu::current_cpu_id(), self.cpu_id());
        self.active_space.store(space.as_u64(), Ordering::Release);
    }

    pub fn controller_id(&self) -> u32 {
        self.controller_id.load(Ordering::Relaxed)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn identity(&self) -> Option<&CpuIdentity> {
        self.identity.get()
    }

    pub(super) fn bring_online(&self, controller_id: u32) {
        self.controller_id.store(controller_id, Ordering::Relaxed);
        self.online.store(true, Ordering::Release);
    }

    pub(super) fn set_identity(&self, identity: CpuIdentity) {
        self.identity.call_once(|| identity);
    }
}

/// Tabela de processadores. A instância global vem de `smp::processors()`;
/// os testes criam as suas.
pub struct ProcessorTable {
    records: [ProcessorRecord; MAX_CPUS],
    online: AtomicUsize,
    pub(super) initialized: AtomicBool,
}

impl ProcessorTable {
    pub fn new() -> Self {
        Self {
            records: core::array::from_fn(|i| {
                ProcessorRecord::new(i as CpuId, i as CpuId == BSP_CPU)
            }),
            online: AtomicUsize::new(1),
            initialized: AtomicBool::new(false),
        }
    }

    /// Registro da CPU que está executando
    pub fn current(&self) -> &ProcessorRecord {
        let cpu = Cpu::current_cpu_id();
        match self.records.get(cpu as usize) {
            Some(record) => record,
            None => kernel_stop(StopCode::InvalidCpu, "smp::percpu"),
        }
    }

    pub fn record(&self, cpu: CpuId) -> Option<&ProcessorRecord> {
        self.records.get(cpu as usize)
    }

    pub fn is_online(&self, cpu: CpuId) -> bool {
        self.record(cpu).is_some_and(|r| r.is_online())
    }

    /// Quantas CPUs estão online
    pub fn online_count(&self) -> usize {
        self.online.load(Ordering::Acquire)
    }

    pub(super) fn set_online_count(&self, n: usize) {
        self.online.store(n, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Itera sobre os registros das CPUs online
    pub fn online_records(&self) -> impl Iterator<Item = &ProcessorRecord> {
        self.records.iter().filter(|r| r.is_online())
    }
}

impl Default for ProcessorTable {
    fn default() -> Self {
        Self::new()
    }
}
