//! Contexto de CPU salvo de uma thread
//!
//! Opaco para o núcleo: o backend (`arch`) decide o significado de cada
//! palavra. No x86_64 são os callee-saved, RSP e RIP.

/// Número de palavras de 64 bits reservadas para o contexto
pub const CONTEXT_WORDS: usize = 8;

#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct CpuContext {
    words: [u64; CONTEXT_WORDS],
}

impl CpuContext {
    pub const fn new() -> Self {
        Self {
            words: [0; CONTEXT_WORDS],
        }
    }

    pub(crate) fn words(&self) -> &[u64; CONTEXT_WORDS] {
        &self.words
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u64; CONTEXT_WORDS] {
        &mut self.words
    }
}
