/*!
 * Core Module
 * Shared types, errors, configuration and the simulation clock
 */

pub mod clock;
pub mod config;
pub mod errors;
pub mod types;

pub use clock::{halt_channel, HaltHandle, HaltSignal, Halted, SimClock};
pub use config::SimConfig;
pub use errors::*;
pub use types::*;
