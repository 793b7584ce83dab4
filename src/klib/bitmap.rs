//! Bitmap de slots livres/ocupados

use alloc::vec;
use alloc::vec::Vec;

/// Bitmap crescível: bit 1 = ocupado.
#[derive(Debug, Clone)]
pub struct Bitmap {
    words: Vec<u64>,
    len: usize,
}

impl Bitmap {
    /// Cria bitmap com `bits` bits, todos livres
    pub fn new(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64)],
            len: bits,
        }
    }

    /// Número de bits endereçáveis
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Aumenta para `bits` bits (novos bits livres). Nunca encolhe.
    pub fn grow(&mut self, bits: usize) {
        if bits <= self.len {
            return;
        }
        self.words.resize(bits.div_ceil(64), 0);
        self.len = bits;
    }

    /// Define um bit
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// Limpa um bit
    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    /// Testa um bit
    pub fn test(&self, index: usize) -> bool {
        index < self.len && (self.words[index / 64] & (1u64 << (index % 64))) != 0
    }

    /// Encontra primeiro bit livre (0), pulando palavras cheias
    pub fn find_first_zero(&self) -> Option<usize> {
        for (i, &word) in self.words.iter().enumerate() {
            if word != u64::MAX {
                let index = i * 64 + word.trailing_ones() as usize;
                if index < self.len {
                    return Some(index);
                }
            }
        }
        None
    }

    /// Quantidade de bits ocupados
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
