//! Tempo
//!
//! - `jiffies`: contador monotônico de ticks do timer.
//! - `clock`: `Timestamp` (segundos + microssegundos) e a interface de relógio
//!   consumida pelo Sleep Manager para deadlines.

pub mod clock;
pub mod jiffies;

pub use clock::{ClockSource, MonotonicClock, Timestamp, SUBSECONDS_PER_SECOND};
