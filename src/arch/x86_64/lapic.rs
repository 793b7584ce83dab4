//! Driver mínimo do Local APIC (LAPIC) para o bring-up SMP.
//!
//! Funções:
//! - Habilitar o LAPIC globalmente (MSR `IA32_APIC_BASE`).
//! - Habilitar por software (Spurious Interrupt Vector, bit 8).
//! - Ler o ID de hardware e sinalizar EOI.
//!
//! Acesso MMIO via `volatile::VolatilePtr` sobre a janela mapeada em `map`.

use core::ptr::NonNull;

use volatile::VolatilePtr;

use super::cpu::X64Cpu;
use crate::arch::traits::LocalController;
use crate::sys::Errno;

// --- Registradores e Constantes ---
const IA32_APIC_BASE_MSR: u32 = 0x1B;

// Offsets MMIO
const REG_ID: usize = 0x020;
const REG_VER: usize = 0x030;
const REG_EOI: usize = 0x0B0;
const REG_SVR: usize = 0x0F0; // Spurious Interrupt Vector
const REG_ESR: usize = 0x280; // Error Status Register
const REG_LVT_TIMER: usize = 0x320;

// Bits e Flags
const APIC_ENABLE_BIT: u64 = 1 << 11; // MSR Enable
const SVR_SOFT_ENABLE: u32 = 1 << 8; // Software Enable no registro SVR
const SPURIOUS_VECTOR: u32 = 0xFF;
const LVT_MASKED: u32 = 1 << 16;

pub struct LocalApic {
    /// Offset do mapeamento direto da memória física (HHDM)
    hhdm_offset: u64,
    base: Option<NonNull<u32>>,
}

// SAFETY: a janela MMIO é por-CPU e só é tocada pela CPU dona
unsafe impl Send for LocalApic {}

impl LocalApic {
    pub const fn new(hhdm_offset: u64) -> Self {
        Self {
            hhdm_offset,
            base: None,
        }
    }

    fn reg(&self, offset: usize) -> Option<VolatilePtr<'_, u32>> {
        let base = self.base?;
        // SAFETY: `base` aponta para a página MMIO validada em `map` e
        // `offset` é um registrador de 32 bits dentro dela.
        Some(unsafe { VolatilePtr::new(NonNull::new_unchecked(base.as_ptr().add(offset / 4))) })
    }

    fn read(&self, offset: usize) -> u32 {
        self.reg(offset).map(|r| r.read()).unwrap_or(0)
    }

    fn write(&self, offset: usize, value: u32) {
        if let Some(r) = self.reg(offset) {
            r.write(value);
        }
    }

    /// Envia o sinal de End of Interrupt (EOI).
    #[inline]
    pub fn eoi(&self) {
        self.write(REG_EOI, 0);
    }
}

impl LocalController for LocalApic {
    fn map(&mut self, phys_base: u64) -> Result<(), Errno> {
        if phys_base == 0 || phys_base & 0xFFF != 0 {
            return Err(Errno::EINVAL);
        }
        self.base = NonNull::new((phys_base + self.hhdm_offset) as *mut u32);
        self.base.map(|_| ()).ok_or(Errno::ENXIO)
    }

    fn enable(&mut self) -> bool {
        if self.base.is_none() {
            return false;
        }

        // 1. Habilitar LAPIC globalmente via MSR
        // SAFETY: IA32_APIC_BASE existe em toda CPU x86_64 com APIC
        unsafe {
            let msr = X64Cpu::read_msr(IA32_APIC_BASE_MSR);
            if msr & APIC_ENABLE_BIT == 0 {
                X64Cpu::write_msr(IA32_APIC_BASE_MSR, msr | APIC_ENABLE_BIT);
            }
        }

        // 2. Spurious vector + software enable
        self.write(REG_SVR, SVR_SOFT_ENABLE | SPURIOUS_VECTOR);

        // 3. Timer mascarado até alguém programá-lo
        self.write(REG_LVT_TIMER, LVT_MASKED);

        // 4. ESR precisa de duas escritas em hardware antigo
        self.write(REG_ESR, 0);
        self.write(REG_ESR, 0);
        self.write(REG_EOI, 0);

        // Barramento flutuante lê 0xFFFFFFFF
        let version = self.read(REG_VER);
        let svr = self.read(REG_SVR);
        version != 0 && version != u32::MAX && svr & SVR_SOFT_ENABLE != 0
    }

    fn id(&self) -> u32 {
        self.read(REG_ID) >> 24
    }
}
