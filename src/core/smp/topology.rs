/// Arquivo: core/smp/topology.rs
///
/// Propósito: Topologia de processadores descoberta pelo firmware.
/// Lista as CPUs (IDs lógico, de hardware e ACPI) e a base física do
/// controlador de interrupções local, que `bring_up` precisa mapear.
///
/// Detalhes de Implementação:
/// - Quem faz o parse da MADT/Device Tree monta um `CpuTopology` e o entrega
///   a `smp::init`. Este módulo não lê firmware.
/// - IDs lógicos são densos (0..N-1) e indexam a `ProcessorTable`.
use alloc::vec::Vec;

/// Identificador lógico de CPU (0 a N-1)
pub type CpuId = u32;

/// CPU de boot (Bootstrap Processor)
pub const BSP_CPU: CpuId = 0;

/// Informações sobre uma CPU detectada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuInfo {
    /// ID lógico atribuído pelo kernel (índice no vetor)
    pub logical_id: CpuId,

    /// ID de Hardware (APIC ID em x86)
    pub hw_id: u32,

    /// ID do Processador na ACPI
    pub acpi_id: u32,

    /// Indica se é o Bootstrap Processor (BSP)
    pub is_bsp: bool,
}

/// Topologia descoberta no boot
#[derive(Debug, Clone, Default)]
pub struct CpuTopology {
    cpus: Vec<CpuInfo>,
    bsp_id: Option<CpuId>,
    /// Endereço físico do controlador local (LAPIC). Zero = desconhecido.
    controller_base: u64,
}

impl CpuTopology {
    pub const fn new() -> Self {
        Self {
            cpus: Vec::new(),
            bsp_id: None,
            controller_base: 0,
        }
    }

    /// Registra uma nova CPU descoberta
    pub fn register_cpu(&mut self, hw_id: u32, acpi_id: u32, is_bsp: bool) -> CpuId {
        let logical_id = self.cpus.len() as CpuId;

        if is_bsp {
            self.bsp_id = Some(logical_id);
        }

        self.cpus.push(CpuInfo {
            logical_id,
            hw_id,
            acpi_id,
            is_bsp,
        });
        logical_id
    }

    pub fn set_controller_base(&mut self, phys: u64) {
        self.controller_base = phys;
    }

    pub fn controller_base(&self) -> u64 {
        self.controller_base
    }

    /// Retorna o número total de CPUs detectadas
    pub fn count(&self) -> usize {
        self.cpus.len()
    }

    pub fn bsp(&self) -> Option<&CpuInfo> {
        self.bsp_id.and_then(|id| self.cpus.get(id as usize))
    }

    /// Itera sobre as CPUs
    pub fn iter(&self) -> core::slice::Iter<'_, CpuInfo> {
        self.cpus.iter()
    }

    /// Topologia utilizável: ao menos uma CPU e controlador conhecido
    pub fn is_usable(&self) -> bool {
        !self.cpus.is_empty() && self.controller_base != 0
    }
}
