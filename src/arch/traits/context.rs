//! Capacidade de troca de contexto.
//!
//! O conteúdo de `CpuContext` pertence ao backend: o núcleo só o aloca
//! dentro da `Thread` e repassa ponteiros para cá.

use crate::sched::task::context::CpuContext;
use crate::sys::VirtAddr;

pub trait ContextOps: Sync {
    /// Prepara o contexto de uma thread que nunca executou, para que o
    /// primeiro `switch` para ela comece em `entry` com a stack em `stack_top`.
    ///
    /// O backend garante que `sched::finish_switch` rode antes de `entry`,
    /// exatamente como no retorno de `switch`.
    fn initialize(&self, ctx: &mut CpuContext, entry: VirtAddr, stack_top: VirtAddr, kernel: bool);

    /// Salva o contexto atual em `old` e retoma `new`.
    ///
    /// Retorna apenas quando algum outro `switch` retomar `old`.
    ///
    /// # Safety
    ///
    /// - Interrupções desabilitadas.
    /// - `old` e `new` apontam para contextos vivos e estáveis (Thread pinada
    ///   ou contexto ocioso da CPU).
    unsafe fn switch(&self, old: *mut CpuContext, new: *const CpuContext);
}
