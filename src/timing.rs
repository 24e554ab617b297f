//! Timing table (C1): derives per-mode bit timing in pulse-generator ticks.
//!
//! The reference clock is 8 MHz (8 ticks/µs), matching the resolution the
//! teacher's reference implementation configured its RMT peripheral at.
//! Ticks, not microseconds, are the unit the symbol encoder and GCR
//! demodulator operate on, so everything here is computed once at
//! construction and cached.

use crate::mode::DShotMode;

/// Pulse-generator clock resolution, in ticks per microsecond.
pub const TICKS_PER_US: u32 = 8;

/// Minimum quiet time added to the bidirectional frame gap, in microseconds.
pub const FRAME_GAP_PAD_US: u32 = 20;

/// Bit period and "1"-bit high time, in whole microseconds x100 (centi-µs),
/// to keep the table integer and exact (6.67µs -> 667).
const TIMING_CENTI_US: [(u32, u32); 4] = [
    (667, 500), // DSHOT150
    (333, 250), // DSHOT300
    (167, 125), // DSHOT600
    (83, 67),   // DSHOT1200
];

/// Derived, immutable timing parameters for one [`DShotMode`].
///
/// All fields are in pulse-generator ticks except `frame_gap_us`, which is
/// a wall-clock quantity used to throttle successive `send_*` calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct TimingProfile {
    pub bit_period_ticks: u32,
    pub one_high_ticks: u32,
    pub zero_high_ticks: u32,
    pub one_low_ticks: u32,
    pub zero_low_ticks: u32,
    /// Minimum quiet period between successive outbound frames, in µs.
    pub frame_gap_us: u32,
    /// Single GCR bit-time window, in ticks, used by the demodulator to
    /// recover a bit count from a measured pulse duration.
    pub gcr_bit_time_ticks: u32,
    /// Shortest pulse width the receiver should accept, in ticks.
    pub min_pulse_ticks: u32,
    /// Longest pulse width the receiver should accept, in ticks.
    pub max_pulse_ticks: u32,
}

impl TimingProfile {
    /// Longest run of identical GCR bits the demodulator needs to
    /// discriminate by pulse width alone. DShot's nibble table never
    /// produces a run longer than this within one 21-bit burst.
    const MAX_GCR_RUN_BITS: u32 = 3;

    /// Derive the timing profile for `mode`, or `None` for [`DShotMode::Off`]
    /// (which has no timing at all — transmission is always a no-op).
    ///
    /// `bidirectional` widens the inter-frame gap to leave room for the
    /// ESC's telemetry reply; callers should pass the engine's *effective*
    /// bidirectional flag (`requested && mode.supports_bidirectional()`),
    /// not the raw request, since DSHOT150 never carries telemetry
    /// (spec.md §9(b)).
    pub const fn for_mode(mode: DShotMode, bidirectional: bool) -> Option<Self> {
        let idx = match mode {
            DShotMode::Off => return None,
            DShotMode::DShot150 => 0,
            DShotMode::DShot300 => 1,
            DShotMode::DShot600 => 2,
            DShotMode::DShot1200 => 3,
        };

        let (bit_centi_us, one_high_centi_us) = TIMING_CENTI_US[idx];

        let bit_period_ticks = bit_centi_us * TICKS_PER_US / 100;
        let one_high_ticks = one_high_centi_us * TICKS_PER_US / 100;
        let zero_high_ticks = one_high_ticks / 2;
        let one_low_ticks = bit_period_ticks - one_high_ticks;
        let zero_low_ticks = bit_period_ticks - zero_high_ticks;

        // bit_time = round(one_high_ticks * 0.9); done in fixed point as
        // (one_high_ticks * 9 + 5) / 10 to round-to-nearest.
        let gcr_bit_time_ticks = (one_high_ticks * 9 + 5) / 10;

        // 0.9x shortest (one bit-time) .. 1.1x longest (MAX_GCR_RUN_BITS
        // bit-times) expected pulse, per spec.md §4.1.
        let shortest = gcr_bit_time_ticks;
        let longest = gcr_bit_time_ticks * Self::MAX_GCR_RUN_BITS;
        let min_pulse_ticks = shortest * 9 / 10;
        let max_pulse_ticks = longest * 11 / 10;

        // Bidirectional frame gap is double the frame time plus padding;
        // unidirectional is frame time plus padding (spec.md §4.1).
        let frame_us = bit_centi_us * 16 / 100;
        let frame_gap_us = if bidirectional {
            frame_us * 2 + FRAME_GAP_PAD_US
        } else {
            frame_us + FRAME_GAP_PAD_US
        };

        Some(Self {
            bit_period_ticks,
            one_high_ticks,
            zero_high_ticks,
            one_low_ticks,
            zero_low_ticks,
            frame_gap_us,
            gcr_bit_time_ticks,
            min_pulse_ticks,
            max_pulse_ticks,
        })
    }
}
