//! Panic e Parada Fatal do Kernel.
//!
//! O "Airbag" do sistema. Erros de contrato do scheduler (destruir uma
//! thread ainda alcançável, estouro de semáforo, CPU inexistente) não são
//! recuperáveis: corromper filas entre CPUs silenciosamente é pior que parar.
//!
//! # Comportamento
//! 1. `kernel_stop` loga código e módulo na serial.
//! 2. Dispara `panic!` com a mensagem `"<módulo>: <código>"`.
//! 3. No bare-metal o `#[panic_handler]` desabilita interrupções e trava a CPU.
//!    Nos testes (host) o panic é observável via `#[should_panic]`.

/// Código de diagnóstico de uma parada fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StopCode {
    /// Thread destruída enquanto ainda alcançável (fila, sleep ou CPU)
    DestroyLiveThread = 0x01,
    /// `signal` levaria o semáforo acima do máximo
    SemaphoreOverflow = 0x02,
    /// `wait` pediu mais itens do que o semáforo pode conter
    SemaphoreUnderflow = 0x03,
    /// ID de CPU fora da tabela de processadores
    InvalidCpu = 0x04,
    /// Estado de thread incompatível com a operação pedida
    InvalidThreadState = 0x05,
    /// Operação que exige thread corrente chamada em CPU ociosa
    NoCurrentThread = 0x06,
    /// Falha de alocação reportada pelo colaborador de memória
    OutOfMemory = 0x07,
}

impl StopCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopCode::DestroyLiveThread => "DESTROY_LIVE_THREAD",
            StopCode::SemaphoreOverflow => "SEMAPHORE_OVERFLOW",
            StopCode::SemaphoreUnderflow => "SEMAPHORE_UNDERFLOW",
            StopCode::InvalidCpu => "INVALID_CPU",
            StopCode::InvalidThreadState => "INVALID_THREAD_STATE",
            StopCode::NoCurrentThread => "NO_CURRENT_THREAD",
            StopCode::OutOfMemory => "OUT_OF_MEMORY",
        }
    }
}

/// Para o kernel com um código de diagnóstico e o nome do módulo.
#[cold]
#[track_caller]
pub fn kernel_stop(code: StopCode, module: &'static str) -> ! {
    crate::kerror!("================ KERNEL STOP ================");
    crate::kerror!("Code: ", code as u32);
    crate::kerror!(code.as_str());
    crate::kerror!(module);
    crate::kerror!("=============================================");

    panic!("{}: {}", module, code.as_str());
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use crate::arch::traits::CpuOps;
    use crate::arch::Cpu;

    // 1. Segurança imediata: parar interrupções
    Cpu::disable_interrupts();

    crate::kerror!("================ KERNEL PANIC ================");
    if let Some(location) = info.location() {
        crate::kerror!(location.file());
        crate::kerror!("Line: ", location.line());
    } else {
        crate::kerror!("Location: Unknown");
    }
    crate::kerror!("==============================================");

    // 2. Morrer com dignidade
    Cpu::hang();
}
