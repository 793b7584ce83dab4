//! Controlador local simulado.

use crate::arch::traits::LocalController;
use crate::sys::Errno;

pub struct SimController {
    id: u32,
    fail_map: bool,
    fail_enable: bool,
    mapped_at: Option<u64>,
    online: bool,
}

impl SimController {
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            fail_map: false,
            fail_enable: false,
            mapped_at: None,
            online: false,
        }
    }

    /// O mapeamento dos registradores falha
    pub const fn failing_map(mut self) -> Self {
        self.fail_map = true;
        self
    }

    /// O controlador mapeia mas não fica online
    pub const fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    pub fn mapped_at(&self) -> Option<u64> {
        self.mapped_at
    }

    pub fn is_online(&self) -> bool {
        self.online
    }
}

impl LocalController for SimController {
    fn map(&mut self, phys_base: u64) -> Result<(), Errno> {
        if self.fail_map || phys_base == 0 {
            return Err(Errno::ENXIO);
        }
        self.mapped_at = Some(phys_base);
        Ok(())
    }

    fn enable(&mut self) -> bool {
        self.online = self.mapped_at.is_some() && !self.fail_enable;
        self.online
    }

    fn id(&self) -> u32 {
        self.id
    }
}
