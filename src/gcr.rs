//! GCR demodulator (C6): reconstructs a 20-bit word from pulse-level
//! transitions, unscrambles it, decodes four 5-to-4-bit groups through a
//! fixed lookup table, and validates the bidirectional CRC.
//!
//! The 32-entry decode table is carried over verbatim from the original
//! driver's `GCR_DECODE_LOOKUP_TABLE` (`dshot_definitions.h`) — DShot's GCR
//! alphabet isn't something this engine derives, it's a fixed standard.

use crate::error::Error;
use crate::frame::calc_crc;
use crate::receive::InboundBurst;
use crate::timing::TimingProfile;

const INVALID: u8 = 0xFF;

/// Index: 5-bit GCR code. Value: decoded 4-bit nibble, or `INVALID` for
/// the 17 codes DShot's alphabet never produces. Nibble `0x0` has no
/// assigned code at all — only 15 of the 16 possible nibbles round-trip
/// through this table.
const GCR_DECODE_TABLE: [u8; 32] = [
    INVALID, INVALID, INVALID, INVALID, INVALID, INVALID, INVALID, INVALID, INVALID, 0x1, 0x4,
    0x5, INVALID, INVALID, 0x6, 0x7, INVALID, INVALID, 0x8, 0x9, 0x2, 0x3, 0xA, 0xB, INVALID,
    INVALID, INVALID, INVALID, 0xC, 0xD, 0xE, 0xF,
];

/// Fewer than 5 captured symbols can't possibly hold a complete 20-bit GCR
/// frame (4 nibbles x 5 bits each, minimum); spec.md §8 invariant 6 treats
/// any such burst as corrupt outright.
const MIN_SYMBOLS_FOR_A_FRAME: usize = 5;

/// Demodulate `burst` against `timing`, returning the validated 12-bit
/// payload and its 4-bit CRC (both present so the caller doesn't need to
/// re-split). All arithmetic is integer, side-effect free and
/// allocation-free, so this is safe to call from ISR or consumer context
/// (spec.md §4.6 leaves that choice to the implementer; this engine calls
/// it from [`crate::engine::Engine::poll_telemetry`]. See DESIGN.md).
pub fn demodulate(burst: &InboundBurst, timing: &TimingProfile) -> Result<(u16, u16), Error> {
    if burst.len() < MIN_SYMBOLS_FOR_A_FRAME {
        return Err(Error::ChecksumFail);
    }

    let bit_time = timing.gcr_bit_time_ticks.max(1);

    // Step 2: walk the burst, advancing a 21-bit shift position from bit
    // 20 down to bit 0, setting bits where the captured level was "mark".
    // A pulse shorter than one bit-time contributes `n = 0`: it doesn't
    // advance `pos` at all, per spec.md §4.6 step 2's plain `floor`, so a
    // sub-bit-time glitch desyncs the accumulator and the frame fails
    // nibble lookup or CRC downstream rather than being forced into
    // consuming a bit position it didn't earn.
    let mut acc: u32 = 0;
    let mut pos: i32 = 20;
    for pulse in burst.pulses() {
        let n = pulse.duration_ticks / bit_time;
        for _ in 0..n {
            if pos < 0 {
                break;
            }
            if pulse.is_mark {
                acc |= 1 << pos;
            }
            pos -= 1;
        }
    }

    // Step 3: the top bit (position 20) is the implicit leading mark and
    // isn't part of the 20-bit transmission-coded value.
    let raw20 = acc & 0x000F_FFFF;

    // Step 4: DShot's unscrambling step.
    let frame = raw20 ^ (raw20 >> 1);

    // Step 5: four 5-bit groups, LSB first, each looked up independently.
    let mut word: u16 = 0;
    for group in 0..4 {
        let code = ((frame >> (group * 5)) & 0x1F) as usize;
        let nibble = GCR_DECODE_TABLE[code];
        if nibble == INVALID {
            return Err(Error::ChecksumFail);
        }
        word |= (nibble as u16) << (group * 4);
    }

    // Step 6/7: split into payload and CRC, validate against the
    // bidirectional CRC variant (telemetry replies always use it).
    let payload = word >> 4;
    let crc = word & 0x0F;
    if calc_crc(payload, true) != crc {
        return Err(Error::ChecksumFail);
    }

    Ok((payload, crc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DShotMode;
    use crate::receive::CapturedPulse;

    fn timing() -> TimingProfile {
        TimingProfile::for_mode(DShotMode::DShot600, true).unwrap()
    }

    /// Build a burst that encodes `frame20` (the pre-unscrambled 20-bit
    /// transmission-coded value) as a run-length pulse train, the way a
    /// real ESC's GCR signal would look on the wire: consecutive bits of
    /// the same level coalesce into one pulse, with the level alternating
    /// starting mark (since the line idles high / "mark").
    fn burst_for(frame20: u32, timing: &TimingProfile) -> InboundBurst {
        let bit_time = timing.gcr_bit_time_ticks;
        let mut pulses = [CapturedPulse {
            is_mark: false,
            duration_ticks: 0,
        }; 22];
        let mut count = 0;

        // bits[p] is the line level the demodulator reads into acc bit p.
        // Position 20 is the implicit leading mark bit, always 1; positions
        // 19..0 carry frame20 (bit 19 transmitted first, bit 0 last).
        let mut bits = [false; 21];
        bits[20] = true;
        for p in 0..20 {
            bits[p] = (frame20 >> p) & 1 != 0;
        }

        // Walk in transmission order: position 20 down to position 0,
        // matching the demodulator's `pos` sweep.
        let mut idx: i32 = 20;
        while idx >= 0 {
            let level = bits[idx as usize];
            let mut run = 1;
            while idx - run >= 0 && bits[(idx - run) as usize] == level {
                run += 1;
            }
            pulses[count] = CapturedPulse {
                is_mark: level,
                duration_ticks: bit_time * run as u32,
            };
            count += 1;
            idx -= run;
        }

        InboundBurst::from_pulses(&pulses[..count])
    }

    #[test]
    fn decode_table_matches_the_known_valid_gcr_alphabet() {
        // Every 5-bit code DShot's GCR alphabet assigns a nibble to,
        // cross-checked against the table entries directly.
        let valid_codes: [(u8, u8); 15] = [
            (0x09, 0x1),
            (0x0A, 0x4),
            (0x0B, 0x5),
            (0x0E, 0x6),
            (0x0F, 0x7),
            (0x12, 0x8),
            (0x13, 0x9),
            (0x14, 0x2),
            (0x15, 0x3),
            (0x16, 0xA),
            (0x17, 0xB),
            (0x1C, 0xC),
            (0x1D, 0xD),
            (0x1E, 0xE),
            (0x1F, 0xF),
        ];
        for (code, nibble) in valid_codes {
            assert_eq!(GCR_DECODE_TABLE[code as usize], nibble);
        }
    }

    #[test]
    fn table_has_exactly_fifteen_valid_codes() {
        // The original alphabet never assigns a code to nibble 0x0 — every
        // ESC reply containing a literal zero nibble encodes it some other
        // way upstream of this table, not through GCR code 0.
        let valid = GCR_DECODE_TABLE.iter().filter(|&&v| v != INVALID).count();
        assert_eq!(valid, 15);
        let invalid = GCR_DECODE_TABLE.iter().filter(|&&v| v == INVALID).count();
        assert_eq!(invalid, 17);
    }

    #[test]
    fn fewer_than_five_symbols_is_always_a_checksum_failure() {
        let t = timing();
        for n in 0..MIN_SYMBOLS_FOR_A_FRAME {
            let pulses = [CapturedPulse {
                is_mark: true,
                duration_ticks: t.gcr_bit_time_ticks,
            }; 4];
            let burst = InboundBurst::from_pulses(&pulses[..n]);
            assert_eq!(demodulate(&burst, &t), Err(Error::ChecksumFail));
        }
    }

    #[test]
    fn a_burst_containing_the_all_zero_group_is_rejected() {
        // GCR code 0b00000 is never valid (spec.md §8 invariant 4 / S5).
        // Build the post-unscramble `frame` with its first 5-bit group
        // zeroed and the rest set to a valid code (0x09), then invert
        // `x ^ (x >> 1)` to get the pre-scramble wire value `burst_for`
        // expects.
        let t = timing();
        let frame: u32 = 0b01001_01001_01001_00000;

        let mut raw: u32 = 0;
        for bit in (0..20).rev() {
            let prev = if bit == 19 { 0 } else { (raw >> (bit + 1)) & 1 };
            let scrambled_bit = (frame >> bit) & 1;
            raw |= (scrambled_bit ^ prev) << bit;
        }

        let burst = burst_for(raw, &t);
        assert_eq!(demodulate(&burst, &t), Err(Error::ChecksumFail));
    }

    /// Encode `payload<<4 | crc` as 4 GCR nibbles (inverse lookup), then
    /// invert the unscrambling step to recover the pre-scramble 20-bit
    /// value `burst_for` expects. Shared by every test that needs a
    /// known-good burst for a chosen payload.
    fn raw20_for(payload: u16, crc: u16) -> u32 {
        let word = (payload << 4) | crc;

        let mut encode_table = [0u8; 16];
        for (code, &nibble) in GCR_DECODE_TABLE.iter().enumerate() {
            if nibble != INVALID {
                encode_table[nibble as usize] = code as u8;
            }
        }

        let mut frame: u32 = 0;
        for group in 0..4 {
            let nibble = (word >> (group * 4)) & 0xF;
            let code = encode_table[nibble as usize] as u32;
            frame |= code << (group * 5);
        }

        // Inverse of `x ^ (x >> 1)`: recover the pre-scramble 20-bit value.
        let mut raw: u32 = 0;
        for bit in (0..20).rev() {
            let prev = if bit == 19 { 0 } else { (raw >> (bit + 1)) & 1 };
            let scrambled_bit = (frame >> bit) & 1;
            raw |= (scrambled_bit ^ prev) << bit;
        }
        raw
    }

    #[test]
    fn valid_payload_round_trips_through_encode_and_demodulate() {
        let t = timing();
        // Pick a payload whose CRC we compute ourselves, then encode it as
        // 4 GCR nibbles (inverse lookup), scramble, and demodulate back.
        let payload: u16 = 0x2D1;
        let crc = calc_crc(payload, true);

        let burst = burst_for(raw20_for(payload, crc), &t);
        let (decoded_payload, decoded_crc) = demodulate(&burst, &t).unwrap();
        assert_eq!(decoded_payload, payload);
        assert_eq!(decoded_crc, crc);
    }

    #[test]
    fn a_sub_bit_time_glitch_pulse_is_ignored_rather_than_forced_into_a_bit() {
        // A pulse shorter than one bit-time must contribute n=0 (spec.md
        // §4.6 step 2's plain `floor`), not be clamped up to n=1 like a
        // real bit. Splice such a glitch pulse into an otherwise-valid
        // burst; if it were wrongly forced to consume a bit position,
        // every bit after it would desync and decoding would fail. Since
        // it's correctly skipped, the frame must still decode cleanly.
        let t = timing();
        let payload: u16 = 0x2D1;
        let crc = calc_crc(payload, true);
        let clean = burst_for(raw20_for(payload, crc), &t);
        let clean_pulses = clean.pulses();

        let mut spliced = [CapturedPulse {
            is_mark: false,
            duration_ticks: 0,
        }; 32];
        spliced[0] = clean_pulses[0];
        spliced[1] = CapturedPulse {
            is_mark: !clean_pulses[0].is_mark,
            duration_ticks: t.gcr_bit_time_ticks / 4,
        };
        let mut n = 2;
        for p in &clean_pulses[1..] {
            spliced[n] = *p;
            n += 1;
        }

        let glitched = InboundBurst::from_pulses(&spliced[..n]);
        let (decoded_payload, decoded_crc) = demodulate(&glitched, &t).unwrap();
        assert_eq!(decoded_payload, payload);
        assert_eq!(decoded_crc, crc);
    }
}
