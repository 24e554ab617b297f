//! Bit-exact DShot protocol engine: frame codec, pulse encode/decode, and
//! bidirectional GCR telemetry for driving an ESC over a single wire.
//!
//! The engine is hardware-agnostic: [`transmit::PulseTransmitter`] and
//! [`receive::PulseReceiver`] are the seams a concrete MCU binding
//! implements (see `hal::stm32` behind the `stm32-hal2` feature). Everything
//! else — timing derivation, frame construction, symbol encoding, GCR
//! demodulation, telemetry interpretation, and the transceiver coordinator
//! — is pure, allocation-free and fully host-testable.
#![no_std]

pub mod command;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gcr;
mod mailbox;
pub mod mode;
pub mod receive;
pub mod symbol;
pub mod telemetry;
pub mod timing;
pub mod transmit;

#[cfg(feature = "stm32-hal2")]
pub mod hal;

pub use command::Command;
pub use engine::{Engine, EngineConfig, EngineStateKind, Statistics};
pub use error::Error;
pub use frame::OutboundFrame;
pub use mode::DShotMode;
pub use receive::{InboundBurst, PulseReceiver};
pub use symbol::PulseSymbol;
pub use telemetry::TelemetryReading;
pub use timing::TimingProfile;
pub use transmit::{PulseTransmitter, TxOutcome};
