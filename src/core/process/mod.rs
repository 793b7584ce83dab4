//! Gerenciamento de Processos
//!
//! O processo é o dono dos recursos compartilhados pelas suas threads:
//! espaço de endereçamento, stack de kernel (para threads de kernel) e a
//! tabela de descritores de arquivo.
//!
//! Threads apontam para o processo por `Weak`: o processo não é mantido vivo
//! por elas, apenas contado (`thread_count`).

pub mod fd_table;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

pub use fd_table::{Fd, FdTable, FileNode};

use crate::sync::Spinlock;
use crate::sys::{AddressSpace, Errno, Pid, VirtAddr};

/// Processo
pub struct Process {
    pid: Pid,
    address_space: AddressSpace,
    /// Topo da stack de kernel do processo, compartilhada pelas threads de kernel
    kernel_stack: Option<VirtAddr>,
    live_threads: AtomicUsize,
    fd_table: Spinlock<Option<Arc<FdTable>>>,
}

impl Process {
    /// Cria processo com tabela de arquivos vazia
    pub fn new(pid: Pid, address_space: AddressSpace) -> Arc<Self> {
        Arc::new(Self::build(pid, address_space, None, Arc::new(FdTable::new())))
    }

    /// Processo do kernel (PID 0). `kernel_stack` é compartilhada pelas threads de kernel.
    pub fn kernel(kernel_stack: Option<VirtAddr>) -> Arc<Self> {
        Arc::new(Self::build(
            Pid::KERNEL,
            AddressSpace::KERNEL,
            kernel_stack,
            Arc::new(FdTable::new()),
        ))
    }

    fn build(
        pid: Pid,
        address_space: AddressSpace,
        kernel_stack: Option<VirtAddr>,
        table: Arc<FdTable>,
    ) -> Self {
        Self {
            pid,
            address_space,
            kernel_stack,
            live_threads: AtomicUsize::new(0),
            fd_table: Spinlock::named("process_fds", Some(table)),
        }
    }

    /// Cria um filho. Com `share_files` o filho usa a mesma tabela de
    /// descritores (mesma contagem de referências); senão recebe uma cópia.
    pub fn fork(&self, pid: Pid, address_space: AddressSpace, share_files: bool) -> Arc<Self> {
        let table = match self.fd_table() {
            Some(table) if share_files => table,
            Some(table) => Arc::new(table.duplicate()),
            None => Arc::new(FdTable::new()),
        };
        crate::kdebug!("(Proc) fork: novo PID=", pid.as_u32());
        Arc::new(Self::build(pid, address_space, self.kernel_stack, table))
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn address_space(&self) -> AddressSpace {
        self.address_space
    }

    pub fn kernel_stack(&self) -> Option<VirtAddr> {
        self.kernel_stack
    }

    /// Threads ainda não destruídas
    pub fn thread_count(&self) -> usize {
        self.live_threads.load(Ordering::Acquire)
    }

    pub(crate) fn attach_thread(&self) {
        self.live_threads.fetch_add(1, Ordering::AcqRel);
    }

    /// Retorna quantas threads restam
    pub(crate) fn detach_thread(&self) -> usize {
        let previous = self.live_threads.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0);
        previous - 1
    }

    /// Tabela de descritores (None depois de `destroy_table`)
    pub fn fd_table(&self) -> Option<Arc<FdTable>> {
        self.fd_table.lock().clone()
    }

    /// Instala um arquivo na tabela do processo
    pub fn add_file(&self, node: Arc<dyn FileNode>) -> Result<Fd, Errno> {
        match self.fd_table() {
            Some(table) => table.add(node),
            None => Err(Errno::EBADF),
        }
    }

    /// Solta a referência deste processo à tabela de descritores.
    ///
    /// Retorna `true` se esta era a última referência (os arquivos foram
    /// fechados agora). Chamadas repetidas retornam `false`.
    pub fn destroy_table(&self) -> bool {
        let table = self.fd_table.lock().take();
        match table.and_then(Arc::into_inner) {
            Some(last) => {
                drop(last);
                crate::ktrace!("(Proc) Última referência da tabela: PID=", self.pid.as_u32());
                true
            }
            None => false,
        }
    }

    /// Pode ser liberado: sem threads vivas e sem tabela de arquivos
    pub fn is_reapable(&self) -> bool {
        self.thread_count() == 0 && self.fd_table.lock().is_none()
    }
}
