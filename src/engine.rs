//! Transceiver coordinator (C8): the engine's public API. Orchestrates the
//! C4→C5 handoff on a single wire and owns every other component.

use embedded_hal::delay::DelayNs;
use num_enum::TryFromPrimitive;

use crate::command::Command;
use crate::error::Error;
use crate::frame::OutboundFrame;
use crate::gcr;
use crate::mailbox::Mailbox;
use crate::mode::DShotMode;
use crate::receive::{InboundBurst, PulseReceiver};
use crate::symbol::encode;
use crate::telemetry::{self, TelemetryReading};
use crate::timing::TimingProfile;
use crate::transmit::{PulseTransmitter, Transmitter, TxOutcome};

/// Construction-time engine configuration (spec.md §3 `EngineState`'s
/// static half).
#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct EngineConfig {
    pub mode: DShotMode,
    /// Whether bidirectional telemetry was requested. The engine's
    /// *effective* setting (exposed by [`Engine::is_bidirectional`]) also
    /// requires `mode.supports_bidirectional()` (spec.md §9(b)).
    pub bidirectional_requested: bool,
    /// ESC magnet pole count, used only to resolve eRPM into motor RPM.
    pub magnet_count: u8,
}

/// Running totals since [`Engine::begin`] (spec.md §6's `statistics`).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, defmt::Format)]
pub struct Statistics {
    pub frames_sent: u32,
    pub frames_throttled: u32,
    pub transmission_failures: u32,
    pub checksum_failures: u32,
}

/// Per-wire state machine (spec.md §4.8).
#[derive(Clone, Copy, Debug, Eq, PartialEq, defmt::Format)]
pub enum EngineStateKind {
    Idle,
    Transmitting,
    Listening,
    Decoding,
}

/// The DShot engine. `T` is the pulse transmitter, `R` the pulse receiver
/// (use `()` for unidirectional engines), `D` a delay source for
/// [`Engine::send_command`]'s inter-repeat pacing.
pub struct Engine<T: PulseTransmitter, R: PulseReceiver, D: DelayNs> {
    mode: DShotMode,
    bidirectional: bool,
    magnet_count: u8,
    timing: Option<TimingProfile>,
    transmitter: Transmitter<T>,
    receiver: Option<R>,
    delay: D,
    state: EngineStateKind,
    burst_mailbox: Mailbox<InboundBurst>,
    last_encoded_frame: Option<u16>,
    stats: Statistics,
}

impl<T: PulseTransmitter, R: PulseReceiver, D: DelayNs> Engine<T, R, D> {
    /// Allocate hardware channels and bring the engine to `Idle`.
    ///
    /// `receiver` must be `Some` whenever `config.mode.supports_bidirectional()
    /// && config.bidirectional_requested` — otherwise `Err(RxInitFailed)`.
    /// `DShotMode::Off` and `DShotMode::DShot150` silently force
    /// `is_bidirectional() == false` regardless of the request (spec.md
    /// §9(b)), so a receiver is optional (and unused) for those modes even
    /// if `bidirectional_requested` was `true`.
    pub fn begin(
        config: EngineConfig,
        mut transmitter: T,
        mut receiver: Option<R>,
        delay: D,
    ) -> Result<Self, Error> {
        transmitter.init()?;

        let bidirectional = config.bidirectional_requested && config.mode.supports_bidirectional();
        if bidirectional {
            match &mut receiver {
                Some(rx) => rx.init()?,
                None => return Err(Error::RxInitFailed),
            }
        }

        let timing = TimingProfile::for_mode(config.mode, bidirectional);

        Ok(Self {
            mode: config.mode,
            bidirectional,
            magnet_count: config.magnet_count,
            timing,
            transmitter: Transmitter::new(transmitter),
            receiver,
            delay,
            state: EngineStateKind::Idle,
            burst_mailbox: Mailbox::new(),
            last_encoded_frame: None,
            stats: Statistics::default(),
        })
    }

    /// Send a raw throttle value. `0` is motor-stop; values above 2047 are
    /// rejected outright (spec.md §4.8, §9(a)).
    pub fn send_throttle(&mut self, value: u16, now_us: u32) -> Result<TxOutcome, Error> {
        if value > crate::command::THROTTLE_MAX {
            return Err(Error::ThrottleOutOfRange);
        }
        self.transmit_value(value, now_us)
    }

    /// Send `cmd` (the raw wire value, `0..=47`) `repeat` times, pausing
    /// `delay_us` between repeats. Commands that mutate persistent ESC
    /// state enforce their own minimum repeat count (spec.md §4.8's "MUST
    /// be sent with `repeat >= 10`"); unassigned codes in `0..=47`
    /// (spec.md §6's reserved block, `36..=41`) are rejected the same as
    /// out-of-vocabulary values.
    ///
    /// `delay_us` paces the real-world busy-wait between repeats and stays
    /// within spec.md §5's `delay_us * (repeat - 1)` cap, but a repeat can
    /// only actually reach the wire once `frame_gap_us` has elapsed since
    /// the last transmission. `Command::recommended_delay_us()` returns
    /// 5µs for settings commands, well under DShot600's ~46µs
    /// unidirectional gap, so advancing the simulated clock by `delay_us`
    /// alone would silently throttle away nearly every repeat — exactly
    /// the frames spec.md §9(c)'s repeat-count guarantee exists to
    /// protect. Advance by whichever of `delay_us`/`frame_gap_us` is
    /// larger so every repeat actually lands on the wire.
    pub fn send_command(&mut self, cmd: u8, repeat: u32, delay_us: u32, now_us: u32) -> Result<(), Error> {
        let cmd = Command::try_from_primitive(cmd).map_err(|_| Error::InvalidCommand)?;
        if repeat < cmd.min_repeat() {
            return Err(Error::InsufficientRepeat);
        }

        let frame_gap_us = self.timing.map_or(0, |timing| timing.frame_gap_us);
        let advance = delay_us.max(frame_gap_us).max(1);

        let mut t = now_us;
        for i in 0..repeat {
            self.transmit_value(cmd as u16, t)?;
            if i + 1 < repeat {
                self.delay.delay_us(delay_us);
                t = t.wrapping_add(advance);
            }
        }
        Ok(())
    }

    /// Non-blocking: return the most recently decoded telemetry reading if
    /// one has arrived since the last call. Runs the GCR demodulator (C6)
    /// and telemetry interpreter (C7) synchronously here rather than in the
    /// ISR, keeping the ISR's own job (capture + publish) allocation-free
    /// and branch-free (spec.md §4.6 leaves this choice to the
    /// implementer).
    pub fn poll_telemetry(&mut self) -> Result<TelemetryReading, Error> {
        if !self.bidirectional {
            return Err(Error::BidirNotEnabled);
        }
        let Some(burst) = self.burst_mailbox.take_fresh() else {
            return Err(Error::TelemetryUnavailable);
        };
        let Some(timing) = self.timing else {
            return Err(Error::BidirNotEnabled);
        };

        self.state = EngineStateKind::Decoding;
        let result = gcr::demodulate(&burst, &timing)
            .and_then(|(payload, _crc)| telemetry::interpret(payload, self.magnet_count));
        self.state = EngineStateKind::Idle;

        if result.is_err() {
            self.stats.checksum_failures += 1;
        }
        result
    }

    /// Disable and release every hardware channel. Safe to call at any
    /// time, including mid-transmission.
    pub fn shutdown(&mut self) {
        if let Some(rx) = &mut self.receiver {
            rx.disarm();
        }
        self.state = EngineStateKind::Idle;
    }

    /// Called from the transmit-complete ISR. Arms the receiver in
    /// bidirectional mode (`Transmitting -> Listening`); otherwise returns
    /// straight to `Idle`.
    pub fn on_transmit_complete(&mut self) {
        if let (true, Some(timing), Some(rx)) = (self.bidirectional, self.timing, &mut self.receiver) {
            let _ = rx.arm(timing.min_pulse_ticks, timing.max_pulse_ticks);
            self.state = EngineStateKind::Listening;
        } else {
            self.state = EngineStateKind::Idle;
        }
    }

    /// Called from the receive-complete ISR with the raw captured burst.
    /// Disarms the receiver, publishes the burst to the single-slot
    /// mailbox, and transitions to `Decoding` — the actual GCR/telemetry
    /// work happens on the next [`Engine::poll_telemetry`] call.
    pub fn on_receive_complete(&mut self, burst: InboundBurst) {
        if let Some(rx) = &mut self.receiver {
            rx.disarm();
        }
        self.burst_mailbox.publish(burst);
        self.state = EngineStateKind::Decoding;
    }

    pub fn mode(&self) -> DShotMode {
        self.mode
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    pub fn last_encoded_frame(&self) -> Option<u16> {
        self.last_encoded_frame
    }

    pub fn state(&self) -> EngineStateKind {
        self.state
    }

    fn transmit_value(&mut self, value: u16, now_us: u32) -> Result<TxOutcome, Error> {
        let Some(timing) = self.timing else {
            // DShotMode::Off: every send is a benign no-op (spec.md §3).
            return Ok(TxOutcome::Throttled);
        };

        let frame = OutboundFrame::build(value, self.bidirectional, self.bidirectional);
        let word = frame.serialize();
        let symbols = encode(word, &timing);
        self.last_encoded_frame = Some(word);

        match self.transmitter.send(&symbols, now_us, timing.frame_gap_us) {
            Ok(TxOutcome::Transmitted) => {
                self.stats.frames_sent += 1;
                self.state = EngineStateKind::Transmitting;
                Ok(TxOutcome::Transmitted)
            }
            Ok(TxOutcome::Throttled) => {
                self.stats.frames_throttled += 1;
                Ok(TxOutcome::Throttled)
            }
            Err(e) => {
                self.stats.transmission_failures += 1;
                Err(e)
            }
        }
    }
}
