//! Arquivo: core/time/clock.rs
//!
//! Propósito: Relógio consumido pelo Sleep Manager.
//! Deadlines de `sleep_until_time` são absolutos (segundos + fração),
//! calculados com o helper relativo `ClockSource::relative`.
//!
//! Detalhes de Implementação:
//! - A fração é expressa em microssegundos (`SUBSECONDS_PER_SECOND`).
//! - `MonotonicClock` deriva o tempo dos jiffies; a granularidade é 1 tick.

use super::jiffies;

/// Número de subsegundos em um segundo (microssegundos)
pub const SUBSECONDS_PER_SECOND: u32 = 1_000_000;

/// Instante absoluto: segundos + subsegundos desde o boot.
///
/// A ordem derivada compara `seconds` e depois `subseconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub seconds: u64,
    pub subseconds: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp::new(0, 0);

    pub const fn new(seconds: u64, subseconds: u32) -> Self {
        Self {
            seconds,
            subseconds,
        }
    }

    /// Soma um intervalo, normalizando o carry dos subsegundos.
    pub fn add(self, seconds: u64, subseconds: u32) -> Self {
        let total_sub = self.subseconds as u64 + subseconds as u64;
        let carry = total_sub / SUBSECONDS_PER_SECOND as u64;
        Self {
            seconds: self
                .seconds
                .saturating_add(seconds)
                .saturating_add(carry),
            subseconds: (total_sub % SUBSECONDS_PER_SECOND as u64) as u32,
        }
    }

    /// Converte um número de ticks em instante.
    pub const fn from_ticks(ticks: u64) -> Self {
        Self {
            seconds: ticks / jiffies::HZ,
            subseconds: ((ticks % jiffies::HZ) * jiffies::MICROS_PER_TICK) as u32,
        }
    }
}

/// Fonte de tempo (colaborador externo do scheduler).
pub trait ClockSource: Sync {
    /// Instante atual
    fn now(&self) -> Timestamp;

    /// "N segundos/subsegundos a partir de agora"
    fn relative(&self, seconds: u64, subseconds: u32) -> Timestamp {
        self.now().add(seconds, subseconds)
    }
}

/// Relógio monotônico baseado em jiffies.
pub struct MonotonicClock;

impl ClockSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_ticks(jiffies::get_jiffies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_carries_subseconds() {
        let t = Timestamp::new(1, 900_000).add(2, 200_000);
        assert_eq!(t, Timestamp::new(4, 100_000));
    }

    #[test]
    fn ordering_is_seconds_first() {
        assert!(Timestamp::new(2, 0) > Timestamp::new(1, 999_999));
        assert!(Timestamp::new(1, 5) > Timestamp::new(1, 4));
    }

    #[test]
    fn ticks_map_to_microseconds() {
        assert_eq!(Timestamp::from_ticks(250), Timestamp::new(2, 500_000));
    }
}
