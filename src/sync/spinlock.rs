//! Spinlock - bloqueio com busy-wait

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::arch::traits::CpuOps;
use crate::arch::Cpu;
use crate::core::smp::topology::CpuId;

/// Valor de `owner` quando ninguém segura o lock
const NO_OWNER: u32 = u32::MAX;

/// Lock cru: apenas a flag atômica, o dono e um nome opcional.
///
/// `acquire`/`release` explícitos, sem guard e sem mexer em interrupções.
/// Não é recursivo: adquirir duas vezes na mesma CPU trava para sempre.
pub struct RawSpinlock {
    locked: AtomicBool,
    owner: AtomicU32,
    name: Option<&'static str>,
}

impl RawSpinlock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            owner: AtomicU32::new(NO_OWNER),
            name: None,
        }
    }

    /// Lock com nome de diagnóstico
    pub const fn named(name: &'static str) -> Self {
        Self {
            locked: AtomicBool::new(false),
            owner: AtomicU32::new(NO_OWNER),
            name: Some(name),
        }
    }

    /// Gira até a flag passar de livre para ocupada (Acquire).
    pub fn acquire(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            // Espera em leitura para não martelar a linha de cache com CAS
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
        self.owner.store(Cpu::current_cpu_id(), Ordering::Relaxed);
    }

    /// Tenta adquirir sem girar
    pub fn try_acquire(&self) -> bool {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.owner.store(Cpu::current_cpu_id(), Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Libera (Release): escritas protegidas ficam visíveis ao próximo dono.
    pub fn release(&self) {
        self.owner.store(NO_OWNER, Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);
    }

    /// Snapshot do estado (pode mudar logo depois)
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// CPU que segura o lock, válido apenas enquanto ele está ocupado
    pub fn owner_cpu(&self) -> Option<CpuId> {
        match self.owner.load(Ordering::Relaxed) {
            NO_OWNER => None,
            cpu => Some(cpu),
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        self.name
    }
}

impl Default for RawSpinlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinlock - usa busy-wait, NÃO pode dormir
///
/// # Quando usar
///
/// - Seções críticas MUITO curtas
/// - Dentro de handlers de interrupção
/// - Filas do scheduler
///
/// # Quando NÃO usar
///
/// - Seções que podem demorar
/// - Quando pode chamar funções que dormem
///
/// Interrupções ficam desabilitadas na CPU enquanto o guard existe e são
/// restauradas ao estado anterior no drop.
pub struct Spinlock<T> {
    raw: RawSpinlock,
    data: UnsafeCell<T>,
}

// SAFETY: Spinlock protege acesso com lock atômico
unsafe impl<T: Send> Send for Spinlock<T> {}
unsafe impl<T: Send> Sync for Spinlock<T> {}

impl<T> Spinlock<T> {
    /// Cria novo spinlock
    pub const fn new(data: T) -> Self {
        Self {
            raw: RawSpinlock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Cria spinlock com nome de diagnóstico
    pub const fn named(name: &'static str, data: T) -> Self {
        Self {
            raw: RawSpinlock::named(name),
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock
    pub fn lock(&self) -> SpinlockGuard<'_, T> {
        // Desabilitar interrupções antes de adquirir
        let interrupts_enabled = Cpu::are_interrupts_enabled();
        Cpu::disable_interrupts();

        self.raw.acquire();

        SpinlockGuard {
            lock: self,
            interrupts_were_enabled: interrupts_enabled,
        }
    }

    /// Tenta adquirir sem bloquear
    pub fn try_lock(&self) -> Option<SpinlockGuard<'_, T>> {
        let interrupts_enabled = Cpu::are_interrupts_enabled();
        Cpu::disable_interrupts();

        if self.raw.try_acquire() {
            Some(SpinlockGuard {
                lock: self,
                interrupts_were_enabled: interrupts_enabled,
            })
        } else {
            // Não conseguiu, restaurar interrupções
            if interrupts_enabled {
                Cpu::enable_interrupts();
            }
            None
        }
    }

    /// Força o desbloqueio do spinlock.
    ///
    /// # Safety
    ///
    /// Só deve ser usado quando quem segura o lock nunca vai soltá-lo
    /// (ex: a thread dona foi destruída) e nenhum guard vivo existe.
    pub unsafe fn force_unlock(&self) {
        self.raw.release();
    }

    /// Lock cru, para quem só precisa observar o estado (ex: `sleep_until_unlocked`)
    pub fn raw(&self) -> &RawSpinlock {
        &self.raw
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Acesso exclusivo sem travar (já temos `&mut`)
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

/// Guard do spinlock - libera ao sair do escopo
pub struct SpinlockGuard<'a, T> {
    lock: &'a Spinlock<T>,
    interrupts_were_enabled: bool,
}

impl<T> Deref for SpinlockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinlockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinlockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.release();

        // Restaurar interrupções se estavam habilitadas
        if self.interrupts_were_enabled {
            Cpu::enable_interrupts();
        }
    }
}
