//! CPU Bringup - Inicialização SMP no BSP
//!
//! Executado uma única vez, na CPU de boot, depois que a topologia foi
//! descoberta e antes de qualquer scheduling multi-CPU:
//! 1. valida a topologia (CPUs e base do controlador);
//! 2. mapeia e liga o controlador local;
//! 3. registra identidade e ID de controlador do BSP;
//! 4. marca as CPUs descobertas como online na `ProcessorTable`.
//!
//! Uma falha deixa o sistema em modo single-CPU (só o BSP online) e não
//! consome a única execução: a tabela só fica travada após sucesso.

use core::sync::atomic::Ordering;

use super::percpu::{CpuIdentity, ProcessorTable, MAX_CPUS};
use super::topology::{CpuTopology, BSP_CPU};
use crate::arch::traits::LocalController;
use crate::sys::Errno;

/// Motivo de falha do bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmpError {
    /// Nenhuma CPU ou nenhum controlador local descoberto
    NoTopology,
    /// Mais CPUs do que `MAX_CPUS`
    TooManyCpus,
    /// Não foi possível mapear os registradores do controlador
    MapFailed(Errno),
    /// Controlador mapeado mas não ficou online
    ControllerOffline,
    /// `bring_up` já rodou
    AlreadyInitialized,
}

impl SmpError {
    /// Código de erro negativo exposto ao chamador (`-errno`)
    pub fn errno(self) -> Errno {
        match self {
            SmpError::NoTopology => Errno::ENODEV,
            SmpError::TooManyCpus => Errno::EINVAL,
            SmpError::MapFailed(e) => e,
            SmpError::ControllerOffline => Errno::EIO,
            SmpError::AlreadyInitialized => Errno::EBUSY,
        }
    }

    pub fn as_isize(self) -> isize {
        self.errno().as_isize()
    }
}

impl ProcessorTable {
    /// Sobe o SMP a partir da topologia. Retorna quantas CPUs ficaram online.
    ///
    /// Só um bring-up bem-sucedido trava a tabela; depois de uma falha o
    /// chamador pode tentar de novo com outra topologia ou controlador.
    pub fn bring_up(
        &self,
        topology: &CpuTopology,
        controller: &mut dyn LocalController,
        bsp_identity: CpuIdentity,
    ) -> Result<usize, SmpError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            crate::kwarn!("(SMP) bring_up chamado mais de uma vez");
            return Err(SmpError::AlreadyInitialized);
        }

        let result = self.try_bring_up(topology, controller, bsp_identity);
        if result.is_err() {
            self.initialized.store(false, Ordering::Release);
        }
        result
    }

    fn try_bring_up(
        &self,
        topology: &CpuTopology,
        controller: &mut dyn LocalController,
        bsp_identity: CpuIdentity,
    ) -> Result<usize, SmpError> {
        if !topology.is_usable() {
            crate::kerror!("(SMP) Topologia ausente, seguindo com 1 CPU");
            return Err(SmpError::NoTopology);
        }

        let count = topology.count();
        if count > MAX_CPUS {
            crate::kerror!("(SMP) CPUs demais na topologia: ", count);
            return Err(SmpError::TooManyCpus);
        }

        crate::kdebug!("(SMP) Mapeando controlador local em ", topology.controller_base());
        if let Err(e) = controller.map(topology.controller_base()) {
            crate::kerror!("(SMP) Falha ao mapear controlador local: ", e.as_usize());
            return Err(SmpError::MapFailed(e));
        }

        if !controller.enable() {
            crate::kerror!("(SMP) Controlador local não ficou online");
            return Err(SmpError::ControllerOffline);
        }

        for info in topology.iter() {
            let Some(record) = self.record(info.logical_id) else {
                continue;
            };
            let hw_id = if info.is_bsp || info.logical_id == BSP_CPU {
                controller.id()
            } else {
                info.hw_id
            };
            record.bring_online(hw_id);
        }

        if let Some(bsp) = self.record(BSP_CPU) {
            bsp.set_identity(bsp_identity);
            crate::kinfo!("(SMP) BSP:");
            crate::kinfo!(bsp_identity.vendor());
            crate::kinfo!(bsp_identity.brand());
        }

        self.set_online_count(count);
        crate::kok!("(SMP) Processadores online");
        crate::kinfo!("(SMP) Total de CPUs: ", count);
        Ok(count)
    }
}
