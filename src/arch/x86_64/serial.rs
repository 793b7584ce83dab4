//! Sink de log na porta serial COM1 (16550).

use core::arch::asm;

use crate::core::logging::LogSink;

const COM1: u16 = 0x3F8;

#[inline]
fn outb(port: u16, value: u8) {
    // SAFETY: portas de I/O não tocam memória
    unsafe {
        asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack));
    }
}

#[inline]
fn inb(port: u16) -> u8 {
    let value: u8;
    // SAFETY: idem
    unsafe {
        asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack));
    }
    value
}

pub struct Com1;

pub static COM1_SINK: Com1 = Com1;

impl Com1 {
    /// Programa 38400 8N1 com FIFO habilitada.
    pub fn init(&self) {
        outb(COM1 + 1, 0x00);
        outb(COM1 + 3, 0x80);
        outb(COM1, 0x03);
        outb(COM1 + 1, 0x00);
        outb(COM1 + 3, 0x03);
        outb(COM1 + 2, 0xC7);
        outb(COM1 + 4, 0x0B);
    }

    fn emit(&self, byte: u8) {
        while inb(COM1 + 5) & 0x20 == 0 {
            core::hint::spin_loop();
        }
        outb(COM1, byte);
    }
}

impl LogSink for Com1 {
    fn write_str(&self, s: &str) {
        for b in s.bytes() {
            if b == b'\n' {
                self.emit(b'\r');
            }
            self.emit(b);
        }
    }
}
