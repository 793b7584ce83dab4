//! # Standard Error Codes (Errno)
//!
//! Define os códigos de erro retornados pelo kernel.
//! Segue a numeração POSIX/Linux; valores negativos são usados como status
//! de retorno (isize), por exemplo pelo bring-up SMP.
//!
//! Erros de contrato (destruir thread viva, estouro de semáforo) NÃO passam
//! por aqui: eles param o kernel via `core::panic::kernel_stop`.

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    Success = 0,
    EPERM = 1,    // Operation not permitted
    ESRCH = 3,    // No such process
    EIO = 5,      // I/O error
    ENXIO = 6,    // No such device or address
    EBADF = 9,    // Bad file number
    EAGAIN = 11,  // Try again
    ENOMEM = 12,  // Out of memory
    EBUSY = 16,   // Device or resource busy
    ENODEV = 19,  // No such device
    EINVAL = 22,  // Invalid argument
    EMFILE = 24,  // Too many open files
    ENOSYS = 38,  // Function not implemented
}

impl Errno {
    pub fn as_usize(self) -> usize {
        self as usize
    }

    pub fn as_isize(self) -> isize {
        -(self as i32) as isize
    }

    /// Nome curto para logs
    pub const fn name(self) -> &'static str {
        match self {
            Errno::Success => "Success",
            Errno::EPERM => "EPERM",
            Errno::ESRCH => "ESRCH",
            Errno::EIO => "EIO",
            Errno::ENXIO => "ENXIO",
            Errno::EBADF => "EBADF",
            Errno::EAGAIN => "EAGAIN",
            Errno::ENOMEM => "ENOMEM",
            Errno::EBUSY => "EBUSY",
            Errno::ENODEV => "ENODEV",
            Errno::EINVAL => "EINVAL",
            Errno::EMFILE => "EMFILE",
            Errno::ENOSYS => "ENOSYS",
        }
    }
}

impl core::fmt::Display for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
