//! Troca de contexto x86_64.
//!
//! Layout das palavras de `CpuContext` usado por este backend:
//! 0:rbx, 1:rbp, 2:r12, 3:r13, 4:r14, 5:r15, 6:rsp, 7:rip
//!
//! Uma thread nova não começa em `entry`: o primeiro `switch` cai em
//! `thread_entry_trampoline`, que fecha o handoff, habilita interrupções e só
//! então salta para `entry` (guardado em r12).

use super::cpu::X64Cpu;
use crate::arch::traits::CpuOps;
use crate::sched::task::context::CpuContext;
use crate::sys::VirtAddr;

const W_RBP: usize = 1;
const W_R12: usize = 2;
const W_RSP: usize = 6;
const W_RIP: usize = 7;

/// Prepara o contexto de uma thread nova.
///
/// A stack começa com um slot de retorno reservado, que o `ret` do
/// `context_switch_asm` consome ao saltar para o trampolim. Depois do `ret`,
/// RSP fica em `topo - 8`, o alinhamento que a SysV ABI espera na entrada.
pub fn initialize(ctx: &mut CpuContext, entry: VirtAddr, stack_top: VirtAddr) {
    let aligned_top = stack_top.as_u64() & !0xF;
    let w = ctx.words_mut();
    *w = [0; crate::sched::task::context::CONTEXT_WORDS];
    w[W_RBP] = 0;
    w[W_R12] = entry.as_u64();
    w[W_RSP] = aligned_top - 16;
    w[W_RIP] = thread_entry_trampoline as usize as u64;
}

/// Primeiro código Rust de toda thread nova (chamado pelo trampolim).
///
/// `switch_cpu` deixou as interrupções desabilitadas e não vai restaurá-las
/// para esta thread, que nunca passou por ele.
extern "C" fn thread_start() {
    crate::sched::finish_switch();
    X64Cpu::enable_interrupts();
}

/// Salva callee-saved/RSP/RIP em `old` e retoma `new`.
///
/// # Safety
/// Interrupções desabilitadas; ponteiros válidos e estáveis.
pub unsafe fn switch(old: *mut CpuContext, new: *const CpuContext) {
    context_switch_asm(old as u64, new as u64);
}

// RDI = old (mut ptr), RSI = new (ptr)
core::arch::global_asm!(
    r#"
.global context_switch_asm
context_switch_asm:
    mov [rdi + 0x00], rbx
    mov [rdi + 0x08], rbp
    mov [rdi + 0x10], r12
    mov [rdi + 0x18], r13
    mov [rdi + 0x20], r14
    mov [rdi + 0x28], r15
    mov [rdi + 0x30], rsp
    mov rax, [rsp]
    mov [rdi + 0x38], rax

    mov rbx, [rsi + 0x00]
    mov rbp, [rsi + 0x08]
    mov r12, [rsi + 0x10]
    mov r13, [rsi + 0x18]
    mov r14, [rsi + 0x20]
    mov r15, [rsi + 0x28]
    mov rsp, [rsi + 0x30]

    // Sobrescreve o slot de retorno em vez de push (não vaza 8 bytes)
    mov rax, [rsi + 0x38]
    mov [rsp], rax
    ret
"#
);

// Entrada: RSP ≡ 8 (mod 16), r12 = entry
core::arch::global_asm!(
    r#"
.global thread_entry_trampoline
thread_entry_trampoline:
    xor rbp, rbp
    sub rsp, 8
    call {start}
    add rsp, 8
    jmp r12
"#,
    start = sym thread_start,
);

extern "C" {
    fn context_switch_asm(old: u64, new: u64);
    fn thread_entry_trampoline();
}
