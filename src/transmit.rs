//! Pulse transmitter (C4): drives the wire with an encoded symbol stream
//! through a dedicated hardware channel, and enforces inter-frame spacing.
//!
//! The concrete hardware is behind the [`PulseTransmitter`] trait rather
//! than a concrete peripheral type, per spec.md §9's redesign note on
//! replacing hardware-specific dispatch with a narrow, compile-time-checked
//! seam. `hal::stm32` provides a `stm32-hal2`-backed implementation built
//! the way the teacher drove its motor timer over DMA.

use crate::error::Error;
use crate::symbol::{PulseSymbol, FRAME_SYMBOLS};

/// Result of a single [`Transmitter::send`] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, defmt::Format)]
pub enum TxOutcome {
    /// The symbol buffer was handed to the hardware channel.
    Transmitted,
    /// The call arrived before the inter-frame gap elapsed; the frame was
    /// silently dropped. Not an error (spec.md §7).
    Throttled,
}

/// The hardware seam C4 drives. One dedicated channel per wire; one engine
/// owns one transmitter exclusively (spec.md §3 Ownership).
///
/// Implementations must treat `dispatch` as fire-and-forget: queue or start
/// the symbol stream and return immediately, signalling completion (for
/// bidirectional engines) through whatever completion callback the
/// concrete hardware offers — the engine's coordinator doesn't block
/// waiting for transmit-complete.
pub trait PulseTransmitter {
    /// Enable the underlying hardware channel and set its idle line level.
    /// Called once from [`crate::engine::Engine::begin`]; a failure here is
    /// fatal (`Err(TxInitFailed)` from the caller's point of view).
    fn init(&mut self) -> Result<(), Error>;

    /// Dispatch the 17-symbol buffer exactly once. Returns `Err` only if
    /// the hardware channel refuses the buffer outright (busy DMA
    /// controller, peripheral not enabled, etc).
    fn dispatch(&mut self, symbols: &[PulseSymbol; FRAME_SYMBOLS]) -> Result<(), Error>;

    /// Idle/end-of-transmission line level for this transmitter's wiring.
    /// Standard mode returns to low; bidirectional mode returns to high so
    /// the line floats ready for the ESC's open-drain reply (spec.md §4.4).
    fn line_idle_high(&self) -> bool;
}

/// Wraps a [`PulseTransmitter`] with the inter-frame gap throttle spec.md
/// §4.4 and §5 require: no new transmission starts until
/// `last_transmit_us + frame_gap_us` has elapsed, and the throttled case is
/// reported as success, never an error.
pub struct Transmitter<T> {
    hw: T,
    last_transmit_us: u32,
    has_sent: bool,
}

impl<T: PulseTransmitter> Transmitter<T> {
    pub fn new(hw: T) -> Self {
        Self {
            hw,
            last_transmit_us: 0,
            has_sent: false,
        }
    }

    /// Attempt to send `symbols` at wall-clock time `now_us`, respecting
    /// `frame_gap_us`. Updates `last_transmit_us` only when a frame is
    /// actually dispatched.
    pub fn send(
        &mut self,
        symbols: &[PulseSymbol; FRAME_SYMBOLS],
        now_us: u32,
        frame_gap_us: u32,
    ) -> Result<TxOutcome, Error> {
        if self.has_sent && now_us.wrapping_sub(self.last_transmit_us) < frame_gap_us {
            return Ok(TxOutcome::Throttled);
        }

        self.hw.dispatch(symbols)?;
        self.last_transmit_us = now_us;
        self.has_sent = true;
        Ok(TxOutcome::Transmitted)
    }

    pub fn line_idle_high(&self) -> bool {
        self.hw.line_idle_high()
    }

    /// Access to the underlying hardware handle, for test harnesses that
    /// need to inspect or mutate fake hardware state directly.
    pub fn hw_mut(&mut self) -> &mut T {
        &mut self.hw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTx {
        dispatched: u32,
        refuse: bool,
    }

    impl PulseTransmitter for FakeTx {
        fn init(&mut self) -> Result<(), Error> {
            Ok(())
        }

        fn dispatch(&mut self, _symbols: &[PulseSymbol; FRAME_SYMBOLS]) -> Result<(), Error> {
            if self.refuse {
                return Err(Error::TransmissionFailed);
            }
            self.dispatched += 1;
            Ok(())
        }

        fn line_idle_high(&self) -> bool {
            false
        }
    }

    fn symbols() -> [PulseSymbol; FRAME_SYMBOLS] {
        [PulseSymbol {
            high_ticks: 1,
            low_ticks: 1,
        }; FRAME_SYMBOLS]
    }

    #[test]
    fn s6_two_sends_within_the_gap_yield_one_frame() {
        let mut tx = Transmitter::new(FakeTx {
            dispatched: 0,
            refuse: false,
        });
        let gap = 100;

        assert_eq!(tx.send(&symbols(), 0, gap).unwrap(), TxOutcome::Transmitted);
        assert_eq!(
            tx.send(&symbols(), gap - 1, gap).unwrap(),
            TxOutcome::Throttled
        );
        assert_eq!(
            tx.send(&symbols(), gap, gap).unwrap(),
            TxOutcome::Transmitted
        );
        assert_eq!(tx.hw.dispatched, 2);
    }

    #[test]
    fn hardware_refusal_surfaces_as_an_error() {
        let mut tx = Transmitter::new(FakeTx {
            dispatched: 0,
            refuse: true,
        });
        assert_eq!(
            tx.send(&symbols(), 0, 100),
            Err(Error::TransmissionFailed)
        );
    }
}
