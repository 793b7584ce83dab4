//! Núcleo do scheduler
//!
//! - `runqueue`: uma fila FIFO por nível de prioridade;
//! - `sleep_queue`: descritores de sono e a fila de threads suspensas;
//! - `scheduler`: estado global, inserção/remoção e tick;
//! - `switch`: troca de contexto e handoff entre CPUs;
//! - `sleep`: Sleep/Block Manager (e o `Blocker` do semáforo);
//! - `idle` e `debug`: loop ocioso e dump de estado.

pub mod runqueue;
pub mod scheduler;
pub mod sleep_queue;

mod debug;
mod idle;
mod sleep;
mod switch;

pub use runqueue::{RunQueue, RunQueues};
pub use scheduler::Scheduler;
pub use sleep_queue::{SleepDescriptor, SleepQueue, WakeCondition, WakePredicate};
