//! Semáforo de contagem limitado (0 ≤ count ≤ max).
//!
//! `wait` bloqueia de verdade quando não há itens suficientes: o chamador é
//! suspenso pelo Sleep/Block Manager (via `Blocker`) e acordado por `signal`,
//! que já reserva para ele os itens pedidos.
//! Estourar `max` com `signal` é erro de programação e para o kernel.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::spinlock::Spinlock;
use crate::core::panic::{kernel_stop, StopCode};
use crate::sys::Tid;

const MODULE: &str = "sync::semaphore";

/// Quem sabe suspender e acordar threads.
///
/// O scheduler implementa este trait; o semáforo não conhece filas.
///
/// Protocolo sem perda de wakeup:
/// 1. com o lock do recurso travado, `prepare_block` marca a thread corrente
///    como "prestes a dormir" e ela se registra como esperando;
/// 2. o lock do recurso é solto;
/// 3. `block_current` dorme, exceto se um `wake` chegou depois do passo 1
///    (nesse caso a marca já foi desfeita e a thread segue rodando).
///
/// Wakeups espúrios são permitidos: o chamador sempre revalida a condição.
pub trait Blocker {
    /// Prepara a thread corrente para bloquear e retorna seu TID.
    fn prepare_block(&self) -> Tid;

    /// Suspende a thread corrente até um `wake`.
    fn block_current(&self);

    /// Acorda `tid`. Sem efeito se ele já está rodando e não preparou bloqueio.
    fn wake(&self, tid: Tid);
}

/// Pedido pendente de um waiter
pub(super) struct Waiter {
    pub(super) tid: Tid,
    pub(super) wanted: usize,
    /// `signal` já descontou `wanted` de `count` para este waiter
    pub(super) granted: bool,
}

/// Semáforo de contagem
///
/// A fila é FIFO estrita: `signal` reserva os itens para o waiter da frente
/// antes de acordá-lo, e ninguém que chega depois passa na frente de um
/// waiter ainda não atendido.
pub struct Semaphore {
    /// Itens livres (sem reserva). Só muda com `waiters` travado; lido sem
    /// lock por `get_items`
    count: AtomicUsize,
    max: usize,
    pub(super) waiters: Spinlock<VecDeque<Waiter>>,
}

impl Semaphore {
    pub const fn new(initial: usize, max: usize) -> Self {
        assert!(initial <= max, "semaphore: initial > max");
        Self {
            count: AtomicUsize::new(initial),
            max,
            waiters: Spinlock::named("semaphore", VecDeque::new()),
        }
    }

    /// Remove `n` itens, bloqueando enquanto não houver itens suficientes.
    pub fn wait(&self, n: usize, blocker: &dyn Blocker) {
        if n == 0 {
            return;
        }
        if n > self.max {
            // Nunca poderia ser atendido
            kernel_stop(StopCode::SemaphoreUnderflow, MODULE);
        }

        let mut registered: Option<Tid> = None;
        loop {
            {
                let mut waiters = self.waiters.lock();
                match registered {
                    Some(tid) => {
                        let pos = waiters.iter().position(|w| w.tid == tid);
                        if let Some(pos) = pos.filter(|&i| waiters[i].granted) {
                            waiters.remove(pos);
                            return;
                        }
                    }
                    None => {
                        if self.take_if_unclaimed(&waiters, n) {
                            return;
                        }
                    }
                }

                let tid = blocker.prepare_block();
                if !waiters.iter().any(|w| w.tid == tid) {
                    waiters.push_back(Waiter { tid, wanted: n, granted: false });
                }
                registered = Some(tid);
                crate::ktrace!("(Sem) wait: bloqueando TID=", tid.as_u32());
            }

            blocker.block_current();
        }
    }

    /// Tenta remover `n` itens sem bloquear
    pub fn try_wait(&self, n: usize) -> bool {
        let waiters = self.waiters.lock();
        self.take_if_unclaimed(&waiters, n)
    }

    /// Desconta `n` itens se nenhum waiter está na fila esperando por eles.
    /// Chamado com `waiters` travado.
    fn take_if_unclaimed(&self, waiters: &VecDeque<Waiter>, n: usize) -> bool {
        if n == 0 {
            return true;
        }
        if waiters.iter().any(|w| !w.granted) {
            return false;
        }
        let count = self.count.load(Ordering::Relaxed);
        if count < n {
            return false;
        }
        self.count.store(count - n, Ordering::Relaxed);
        true
    }

    /// Adiciona `n` itens e acorda, em ordem FIFO, os waiters que cabem.
    pub fn signal(&self, n: usize, blocker: &dyn Blocker) {
        let mut woken: Vec<Tid> = Vec::new();
        {
            let mut waiters = self.waiters.lock();
            let count = self.count.load(Ordering::Relaxed);
            let mut total = match count.checked_add(n) {
                Some(total) if total <= self.max => total,
                _ => {
                    drop(waiters);
                    kernel_stop(StopCode::SemaphoreOverflow, MODULE);
                }
            };

            // O primeiro não atendido tem precedência; ninguém passa na frente
            for waiter in waiters.iter_mut().filter(|w| !w.granted) {
                if waiter.wanted > total {
                    break;
                }
                total -= waiter.wanted;
                waiter.granted = true;
                woken.push(waiter.tid);
            }
            self.count.store(total, Ordering::Relaxed);
        }

        for tid in woken {
            blocker.wake(tid);
        }
    }

    /// Snapshot racy da contagem (diagnóstico)
    pub fn get_items(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Número de threads esperando itens ainda não reservados para elas
    pub fn waiting(&self) -> usize {
        self.waiters.lock().iter().filter(|w| !w.granted).count()
    }
}
