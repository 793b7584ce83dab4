//! Controlador de interrupções local (um por CPU).

use crate::sys::Errno;

pub trait LocalController {
    /// Mapeia os registradores do controlador a partir do endereço físico
    /// informado pela topologia.
    fn map(&mut self, phys_base: u64) -> Result<(), Errno>;

    /// Liga o controlador. `false` se ele não ficou online.
    fn enable(&mut self) -> bool;

    /// ID de hardware do controlador da CPU atual.
    fn id(&self) -> u32;
}
