//! System Definitions.
//!
//! Contém as constantes e tipos compartilhados entre o scheduler e o resto do kernel.

pub mod error;
pub mod types;

pub use error::Errno;
pub use types::{AddressSpace, Pid, Tid, VirtAddr};
