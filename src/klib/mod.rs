//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno do núcleo.

pub mod bitmap;
pub mod test_framework;

/// Alinha um endereço para baixo.
///
/// # Exemplo
/// `align_down(10, 4) -> 8`
#[inline]
pub const fn align_down(addr: u64, align: u64) -> u64 {
    addr & !(align - 1)
}
