/// Arquivo: core/smp/mod.rs
///
/// Propósito: Módulo de Multiprocessamento Simétrico (SMP).
/// Descoberta, bring-up e registro por CPU consumidos pelo scheduler.
///
/// Módulos contidos:
/// - `topology`: CPUs descobertas e base do controlador local.
/// - `percpu`: `ProcessorRecord`/`ProcessorTable` (identidade, espaço ativo).
/// - `bringup`: Inicialização no BSP e seus erros.
pub mod bringup;
pub mod percpu;
pub mod topology;


pub use bringup::SmpError;
pub use percpu::{CpuIdentity, ProcessorRecord, ProcessorTable, MAX_CPUS};
pub use topology::{CpuId, CpuInfo, CpuTopology, BSP_CPU};

use spin::Once;

use crate::arch::traits::LocalController;

static PROCESSORS: Once<ProcessorTable> = Once::new();

/// Tabela global de processadores (criada no primeiro acesso)
pub fn processors() -> &'static ProcessorTable {
    PROCESSORS.call_once(ProcessorTable::new)
}

/// Registro da CPU atual
pub fn current() -> &'static ProcessorRecord {
    processors().current()
}

/// Bring-up SMP do kernel. Só pode rodar uma vez, no BSP.
pub fn init(
    topology: &CpuTopology,
    controller: &mut dyn LocalController,
    bsp_identity: CpuIdentity,
) -> Result<usize, SmpError> {
    processors().bring_up(topology, controller, bsp_identity)
}
