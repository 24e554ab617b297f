//! Symbol encoder (C3): converts a serialized 16-bit frame into a
//! fixed-length array of pulse symbols at the pulse generator's tick
//! resolution.

use crate::timing::TimingProfile;

/// One `(high, low)` duration pair, in pulse-generator ticks. The first
/// level is "active" and the second is "idle"; which physical level each
/// represents depends on wiring polarity and is resolved by
/// [`crate::transmit::PulseTransmitter`] implementations, not here (spec.md
/// §4.3/§4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq, defmt::Format)]
pub struct PulseSymbol {
    pub high_ticks: u32,
    pub low_ticks: u32,
}

/// Sixteen data symbols plus one trailing idle-gap symbol — one whole
/// transmitted DShot frame.
pub const FRAME_SYMBOLS: usize = 17;

/// Encode `word` (the output of [`crate::frame::OutboundFrame::serialize`])
/// against `timing` into a fixed 17-symbol buffer: allocation-free,
/// deterministic, MSB first.
///
/// Bit `i` (MSB first, `i` from 15 down to 0) maps to
/// `(one_high_ticks, one_low_ticks)` if set, `(zero_high_ticks,
/// zero_low_ticks)` otherwise. The 17th symbol is a trailing idle gap of
/// at least 21 bit-times, enforcing the frame boundary ahead of any
/// telemetry reply.
pub fn encode(word: u16, timing: &TimingProfile) -> [PulseSymbol; FRAME_SYMBOLS] {
    let mut symbols = [PulseSymbol {
        high_ticks: 0,
        low_ticks: 0,
    }; FRAME_SYMBOLS];

    for (i, slot) in symbols.iter_mut().take(16).enumerate() {
        let bit_position = 15 - i;
        let bit = (word >> bit_position) & 1 != 0;

        *slot = if bit {
            PulseSymbol {
                high_ticks: timing.one_high_ticks,
                low_ticks: timing.one_low_ticks,
            }
        } else {
            PulseSymbol {
                high_ticks: timing.zero_high_ticks,
                low_ticks: timing.zero_low_ticks,
            }
        };
    }

    symbols[16] = PulseSymbol {
        high_ticks: 0,
        low_ticks: timing.bit_period_ticks * 21,
    };

    symbols
}
