//! `stm32-hal2`-backed [`PulseTransmitter`]/[`PulseReceiver`] binding.
//!
//! Built the way the teacher firmware drove its motor timer: a one-shot DMA
//! burst writes 17 CCR (duty) values, one per [`PulseSymbol`], into a timer
//! channel configured for PWM-edge-aligned output; bidirectional mode flips
//! the channel to active-low/count-down the way `set_bidirectional` did, and
//! arms an input-capture channel on the same pin for the GCR reply.
//!
//! This module is intentionally the least reusable part of the crate — real
//! MCU register plumbing varies by board — and is not covered by the host
//! test suite (same as the teacher's own register-poking code).

use hal::{
    dma::{self, ChannelCfg, Priority},
    pac,
    timer::{CountDir, Polarity, Timer},
};

use crate::error::Error;
use crate::receive::PulseReceiver;
use crate::symbol::{PulseSymbol, FRAME_SYMBOLS};
use crate::transmit::PulseTransmitter;

/// DMA channel/stream identifying which peripheral resource serves this
/// wire, same role as the teacher's `setup::MOTOR_CH`.
pub struct DmaChannel {
    pub dma_periph: dma::DmaPeriph,
    pub channel: dma::DmaChannel,
}

/// One motor timer channel wired to a single DShot line, in either
/// direction. `TIM` is the concrete `stm32-hal2` timer peripheral type
/// (e.g. `pac::TIM3`).
pub struct Stm32Dshot<TIM> {
    timer: Timer<TIM>,
    dma: DmaChannel,
    timer_channel: hal::timer::TimChannel,
    bidirectional: bool,
    duty_buffer: [u16; FRAME_SYMBOLS],
}

impl<TIM> Stm32Dshot<TIM> {
    pub fn new(
        timer: Timer<TIM>,
        dma: DmaChannel,
        timer_channel: hal::timer::TimChannel,
        bidirectional: bool,
    ) -> Self {
        Self {
            timer,
            dma,
            timer_channel,
            bidirectional,
            duty_buffer: [0; FRAME_SYMBOLS],
        }
    }

    /// Flip the timer channel's polarity and count direction for
    /// bidirectional mode, the way `set_bidirectional` in the teacher
    /// firmware did: active-low, counting down, so the line idles high and
    /// the ESC can pull it low for its GCR reply.
    fn apply_bidirectional_polarity(&mut self) {
        let (polarity, count_dir) = if self.bidirectional {
            (Polarity::ActiveLow, CountDir::Down)
        } else {
            (Polarity::ActiveHigh, CountDir::Up)
        };
        self.timer.set_polarity(self.timer_channel, polarity);
        self.timer.set_count_dir(count_dir);
    }

    /// Reconfigure the GPIO pin's mode register: alternate-function for
    /// transmit, input-capture for receive. `moder_bits` is `0b10`
    /// (alternate function) or `0b00` (input), matching the teacher's
    /// `alt_mode`/`input_mode` register writes.
    fn set_pin_mode(&self, moder_bits: u32) {
        // SAFETY: exclusive access to this GPIO port is established by the
        // caller owning this `Stm32Dshot` instance; no other code writes
        // this pin's MODER bits while the engine is alive.
        unsafe {
            (*pac::GPIOB::ptr())
                .moder
                .modify(|_, w| w.moder0().bits(moder_bits as u8));
        }
    }
}

impl<TIM> PulseTransmitter for Stm32Dshot<TIM> {
    fn init(&mut self) -> Result<(), Error> {
        self.apply_bidirectional_polarity();
        self.timer.enable();
        Ok(())
    }

    fn dispatch(&mut self, symbols: &[PulseSymbol; FRAME_SYMBOLS]) -> Result<(), Error> {
        self.set_pin_mode(0b10);

        for (slot, symbol) in self.duty_buffer.iter_mut().zip(symbols.iter()) {
            *slot = symbol.high_ticks as u16;
        }

        // SAFETY: `duty_buffer` outlives the DMA transfer (owned by
        // `self`), and this channel is exclusively owned by this instance.
        unsafe {
            self.timer.write_dma_burst(
                &self.duty_buffer,
                0,
                1,
                self.dma.channel,
                ChannelCfg {
                    priority: Priority::High,
                    ..ChannelCfg::default()
                },
                true,
                self.dma.dma_periph,
            );
        }

        Ok(())
    }

    fn line_idle_high(&self) -> bool {
        self.bidirectional
    }
}

impl<TIM> PulseReceiver for Stm32Dshot<TIM> {
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn arm(&mut self, _min_pulse_ticks: u32, _max_pulse_ticks: u32) -> Result<(), Error> {
        self.set_pin_mode(0b00);
        Ok(())
    }

    fn disarm(&mut self) {
        self.set_pin_mode(0b10);
    }
}
