//! DShot command vocabulary (values 0..=47), multiplexed into the throttle
//! field. See spec.md §6 for the full table; this module also carries the
//! per-command repeat/delay defaults the original C++ driver
//! (`dshot_definitions.h`) hard-codes, since spec.md §4.8 only states the
//! *minimum* repeat count for state-mutating commands.

use num_enum::TryFromPrimitive;

/// Default repeat count for commands that don't mutate persistent ESC
/// state (sent once and forgotten).
pub const DEFAULT_CMD_REPEAT_COUNT: u32 = 1;
/// Default inter-repeat delay, in microseconds, for one-shot commands.
pub const DEFAULT_CMD_DELAY_US: u32 = 10;
/// Repeat count BLHeli_32/Betaflight require for commands that persist
/// ESC configuration (spin direction, 3D mode, save settings, telemetry
/// enable/disable). spec.md §9(c) mandates >= 10 to be safe.
pub const SETTINGS_COMMAND_REPEATS: u32 = 10;
/// Inter-repeat delay, in microseconds, for settings commands.
pub const SETTINGS_COMMAND_DELAY_US: u32 = 5;
/// Repeat count spec.md §6 assigns to the signal-line telemetry command
/// range (32..=47): these aren't persistent-state mutations, but ESCs in
/// the field are unreliable about latching them on a single frame.
pub const SIGNAL_LINE_TELEMETRY_REPEATS: u32 = 6;
/// Minimum pause after `SaveSettings`, in milliseconds, before the ESC is
/// guaranteed to have committed the write.
pub const SAVE_SETTINGS_PAUSE_MS: u32 = 40;
/// Minimum pause between repeated `Beacon*` commands, in milliseconds.
pub const BEACON_PAUSE_MS: u32 = 100;

/// One entry of the DShot command vocabulary (spec.md §6). Values 48..=2047
/// are throttle, not commands, and aren't represented here.
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive, defmt::Format)]
#[repr(u8)]
pub enum Command {
    MotorStop = 0,
    Beacon1 = 1,
    Beacon2 = 2,
    Beacon3 = 3,
    Beacon4 = 4,
    Beacon5 = 5,
    EscInfo = 6,
    SpinDirection1 = 7,
    SpinDirection2 = 8,
    ThreeDModeOff = 9,
    ThreeDModeOn = 10,
    SettingsRequest = 11,
    SaveSettings = 12,
    ExtendedTelemetryEnable = 13,
    ExtendedTelemetryDisable = 14,
    SpinDirectionNormal = 20,
    SpinDirectionReversed = 21,
    Led0On = 22,
    Led1On = 23,
    Led2On = 24,
    Led3On = 25,
    Led0Off = 26,
    Led1Off = 27,
    Led2Off = 28,
    Led3Off = 29,
    AudioStreamModeToggle = 30,
    SilentModeToggle = 31,
    SignalLineTelemetryEnable = 32,
    SignalLineTelemetryDisable = 33,
    SignalLineContinuousErpmTelemetry = 34,
    SignalLineContinuousErpmPeriodTelemetry = 35,
    // 36..=41 are reserved (spec.md §6): no ESC in the field assigns them,
    // so they aren't represented as enum values, but they round-trip
    // through `try_from_primitive` as `Err` like any other unassigned code.
    SignalLineTemperatureTelemetry = 42,
    SignalLineVoltageTelemetry = 43,
    SignalLineCurrentTelemetry = 44,
    SignalLineConsumptionTelemetry = 45,
    SignalLineErpmTelemetry = 46,
    SignalLineErpmPeriodTelemetry = 47,
}

impl Command {
    /// Minimum repeat count BLHeli_32/Betaflight require to reliably latch
    /// this command. Commands that only request information or fire once
    /// (stop, beacons, ESC info, settings request, LEDs, KISS toggles)
    /// default to 1; commands that change persistent ESC configuration
    /// require [`SETTINGS_COMMAND_REPEATS`].
    pub const fn min_repeat(self) -> u32 {
        match self {
            Command::SpinDirection1
            | Command::SpinDirection2
            | Command::ThreeDModeOff
            | Command::ThreeDModeOn
            | Command::SaveSettings
            | Command::ExtendedTelemetryEnable
            | Command::ExtendedTelemetryDisable
            | Command::SpinDirectionNormal
            | Command::SpinDirectionReversed => SETTINGS_COMMAND_REPEATS,
            Command::SignalLineTelemetryEnable
            | Command::SignalLineTelemetryDisable
            | Command::SignalLineContinuousErpmTelemetry
            | Command::SignalLineContinuousErpmPeriodTelemetry
            | Command::SignalLineTemperatureTelemetry
            | Command::SignalLineVoltageTelemetry
            | Command::SignalLineCurrentTelemetry
            | Command::SignalLineConsumptionTelemetry
            | Command::SignalLineErpmTelemetry
            | Command::SignalLineErpmPeriodTelemetry => SIGNAL_LINE_TELEMETRY_REPEATS,
            _ => DEFAULT_CMD_REPEAT_COUNT,
        }
    }

    /// Whether this command mutates persistent ESC configuration, ie.
    /// survives a power cycle without `SaveSettings`. The signal-line
    /// telemetry range repeats like a settings command but only affects the
    /// current session.
    pub const fn mutates_persistent_state(self) -> bool {
        matches!(
            self,
            Command::SpinDirection1
                | Command::SpinDirection2
                | Command::ThreeDModeOff
                | Command::ThreeDModeOn
                | Command::SaveSettings
                | Command::ExtendedTelemetryEnable
                | Command::ExtendedTelemetryDisable
                | Command::SpinDirectionNormal
                | Command::SpinDirectionReversed
        )
    }

    /// Recommended delay between repeats, in microseconds.
    pub const fn recommended_delay_us(self) -> u32 {
        if self.min_repeat() > DEFAULT_CMD_REPEAT_COUNT {
            SETTINGS_COMMAND_DELAY_US
        } else {
            DEFAULT_CMD_DELAY_US
        }
    }
}

/// Throttle values 48..=2047 are motion commands; a throttle of 0 is a stop
/// equivalent (spec.md §6, and the Open Question resolved in spec.md §9(a):
/// this engine clamps to `[0, 2047]` with 0 remapped to `Command::MotorStop`
/// rather than clamping the floor to 48).
pub const THROTTLE_MIN: u16 = 48;
pub const THROTTLE_MAX: u16 = 2047;
