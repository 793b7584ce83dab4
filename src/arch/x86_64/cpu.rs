//! Implementação x86_64 das operações de CPU (HAL).
//!
//! Usa Assembly inline para controle de interrupções e leitura de
//! registradores específicos de modelo (MSR).
//!
//! # Segurança
//! Assume modo longo (64-bit) e Ring 0.

use core::arch::asm;

use crate::arch::traits::cpu::CpuOps;
use crate::core::smp::topology::CpuId;

/// MSR: IA32_TSC_AUX. Guarda o ID lógico da CPU (lido via RDTSCP).
const IA32_TSC_AUX: u32 = 0xC000_0103;

pub struct X64Cpu;

/// Resultado de uma execução do CPUID (EAX, EBX, ECX, EDX).
#[derive(Debug, Clone, Copy)]
pub struct CpuidResult {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl X64Cpu {
    /// Executa a instrução CPUID.
    pub fn cpuid(leaf: u32, subleaf: u32) -> CpuidResult {
        let eax: u32;
        let ebx: u32;
        let ecx: u32;
        let edx: u32;

        // O LLVM reserva RBX, então preservamos manualmente.
        unsafe {
            asm!(
                "push rbx",
                "cpuid",
                "mov {0:e}, ebx",
                "pop rbx",
                out(reg) ebx,
                inout("eax") leaf => eax,
                inout("ecx") subleaf => ecx,
                out("edx") edx,
                options(nomem, preserves_flags),
            );
        }
        CpuidResult { eax, ebx, ecx, edx }
    }

    /// Lê um Model Specific Register (MSR).
    ///
    /// # Safety
    /// Ler um MSR reservado ou inválido causa #GP.
    #[inline]
    pub unsafe fn read_msr(msr: u32) -> u64 {
        let (high, low): (u32, u32);
        asm!(
            "rdmsr",
            in("ecx") msr,
            out("eax") low,
            out("edx") high,
            options(nomem, nostack, preserves_flags),
        );
        ((high as u64) << 32) | (low as u64)
    }

    /// Escreve um Model Specific Register (MSR).
    ///
    /// # Safety
    /// Escrever um MSR inválido causa #GP; alguns MSRs mudam o modo da CPU.
    #[inline]
    pub unsafe fn write_msr(msr: u32, value: u64) {
        asm!(
            "wrmsr",
            in("ecx") msr,
            in("eax") value as u32,
            in("edx") (value >> 32) as u32,
            options(nostack, preserves_flags),
        );
    }

    /// Publica o ID lógico desta CPU para `current_cpu_id`.
    ///
    /// # Safety
    /// Chamar uma única vez por CPU, durante o bring-up da própria CPU.
    pub unsafe fn set_cpu_id(id: CpuId) {
        Self::write_msr(IA32_TSC_AUX, id as u64);
    }

    /// Raiz de paginação ativa (CR3 sem os bits de flags).
    #[inline]
    pub fn read_cr3() -> u64 {
        let root: u64;
        // SAFETY: leitura de CR3 não tem efeitos colaterais em ring 0
        unsafe { asm!("mov {}, cr3", out(reg) root, options(nomem, nostack, preserves_flags)) };
        root & !0xFFF
    }

    /// Carrega um novo CR3.
    ///
    /// # Safety
    /// `root` deve ser uma PML4 válida que mapeia o kernel.
    #[inline]
    pub unsafe fn write_cr3(root: u64) {
        asm!("mov cr3, {}", in(reg) root, options(nostack, preserves_flags));
    }

    /// String do fabricante (CPUID folha 0), 12 bytes ASCII.
    pub fn vendor() -> [u8; 12] {
        let r = Self::cpuid(0, 0);
        let mut out = [0u8; 12];
        out[0..4].copy_from_slice(&r.ebx.to_le_bytes());
        out[4..8].copy_from_slice(&r.edx.to_le_bytes());
        out[8..12].copy_from_slice(&r.ecx.to_le_bytes());
        out
    }

    /// Nome do modelo (CPUID 0x80000002..=0x80000004), 48 bytes ASCII.
    pub fn brand() -> [u8; 48] {
        let mut out = [0u8; 48];
        if Self::cpuid(0x8000_0000, 0).eax < 0x8000_0004 {
            return out;
        }
        for (i, leaf) in (0x8000_0002u32..=0x8000_0004).enumerate() {
            let r = Self::cpuid(leaf, 0);
            let base = i * 16;
            out[base..base + 4].copy_from_slice(&r.eax.to_le_bytes());
            out[base + 4..base + 8].copy_from_slice(&r.ebx.to_le_bytes());
            out[base + 8..base + 12].copy_from_slice(&r.ecx.to_le_bytes());
            out[base + 12..base + 16].copy_from_slice(&r.edx.to_le_bytes());
        }
        out
    }
}

impl CpuOps for X64Cpu {
    /// Lê o ID lógico publicado em IA32_TSC_AUX (0 antes do bring-up).
    #[inline]
    fn current_cpu_id() -> CpuId {
        let aux: u32;
        unsafe {
            asm!(
                "rdtscp",
                out("eax") _,
                out("edx") _,
                out("ecx") aux,
                options(nomem, nostack, preserves_flags),
            );
        }
        aux
    }

    #[inline]
    fn halt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn disable_interrupts() {
        unsafe {
            asm!("cli", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn enable_interrupts() {
        unsafe {
            asm!("sti", options(nomem, nostack, preserves_flags));
        }
    }

    /// Verifica RFLAGS.IF (bit 9).
    #[inline]
    fn are_interrupts_enabled() -> bool {
        let rflags: u64;
        unsafe {
            asm!("pushfq; pop {}", out(reg) rflags, options(nomem, preserves_flags));
        }
        (rflags & (1 << 9)) != 0
    }
}
