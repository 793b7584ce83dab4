//! File Descriptor Table - Tabela de arquivos abertos por processo
//!
//! Mapeia descritores (índices pequenos) para nós de arquivo.
//!
//! # Modelo
//!
//! - Um bitmap marca os slots ocupados; `add` pega sempre o menor livre.
//! - A capacidade começa pequena e dobra sob demanda até `MAX_CAPACITY`.
//! - A tabela é compartilhada por `Arc` (processos que herdam a tabela).
//!   Quando a última referência cai, todos os arquivos ainda abertos são
//!   fechados e o armazenamento é liberado.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::klib::bitmap::Bitmap;
use crate::sync::Spinlock;
use crate::sys::Errno;

/// Descritor de arquivo (o que o processo vê)
pub type Fd = usize;

/// Nó de arquivo aberto. O VFS implementa; aqui só precisamos fechar.
pub trait FileNode: Send + Sync {
    /// Chamado uma vez por descritor quando ele é fechado.
    fn close(&self);
}

struct Slots {
    entries: Vec<Option<Arc<dyn FileNode>>>,
    used: Bitmap,
}

impl Slots {
    fn with_capacity(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self {
            entries,
            used: Bitmap::new(capacity),
        }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Dobra a capacidade respeitando o teto
    fn grow(&mut self) -> Result<(), Errno> {
        let current = self.capacity();
        if current >= FdTable::MAX_CAPACITY {
            return Err(Errno::EMFILE);
        }
        let new_cap = (current * 2).clamp(FdTable::INITIAL_CAPACITY, FdTable::MAX_CAPACITY);
        self.entries.resize_with(new_cap, || None);
        self.used.grow(new_cap);
        crate::kdebug!("(FD) Tabela cresceu para ", new_cap);
        Ok(())
    }
}

/// Tabela de descritores de um processo.
pub struct FdTable {
    slots: Spinlock<Slots>,
}

impl FdTable {
    /// Capacidade inicial.
    pub const INITIAL_CAPACITY: usize = 8;
    /// Capacidade máxima.
    pub const MAX_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::INITIAL_CAPACITY)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Spinlock::named("fd_table", Slots::with_capacity(capacity)),
        }
    }

    /// Instala `node` no menor descritor livre, crescendo se preciso.
    pub fn add(&self, node: Arc<dyn FileNode>) -> Result<Fd, Errno> {
        let mut slots = self.slots.lock();

        let fd = match slots.used.find_first_zero() {
            Some(fd) => fd,
            None => {
                let old_cap = slots.capacity();
                slots.grow()?;
                old_cap
            }
        };

        slots.used.set(fd);
        slots.entries[fd] = Some(node);
        Ok(fd)
    }

    /// Nó associado ao descritor
    pub fn get(&self, fd: Fd) -> Option<Arc<dyn FileNode>> {
        self.slots.lock().entries.get(fd).and_then(|e| e.clone())
    }

    /// Fecha o descritor `fd`.
    pub fn remove(&self, fd: Fd) -> Result<(), Errno> {
        let node = {
            let mut slots = self.slots.lock();
            let node = slots.entries.get_mut(fd).and_then(Option::take);
            if node.is_some() {
                slots.used.clear(fd);
            }
            node
        };

        match node {
            // Fora do lock: close pode ser lento
            Some(node) => {
                node.close();
                Ok(())
            }
            None => Err(Errno::EBADF),
        }
    }

    /// Cópia independente: mesmos nós, mesmos números de descritor.
    pub fn duplicate(&self) -> FdTable {
        let slots = self.slots.lock();
        let copy = Slots {
            entries: slots.entries.clone(),
            used: slots.used.clone(),
        };
        FdTable {
            slots: Spinlock::named("fd_table", copy),
        }
    }

    /// Número de descritores abertos.
    pub fn open_count(&self) -> usize {
        self.slots.lock().used.count_ones()
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().capacity()
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FdTable {
    fn drop(&mut self) {
        let slots = self.slots.get_mut();
        let mut closed = 0usize;
        for entry in slots.entries.iter_mut() {
            if let Some(node) = entry.take() {
                node.close();
                closed += 1;
            }
        }
        if closed > 0 {
            crate::ktrace!("(FD) Tabela destruída, arquivos fechados: ", closed);
        }
    }
}
