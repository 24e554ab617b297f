//! Concrete hardware bindings, gated behind Cargo features. Pure
//! algorithmic modules never depend on anything in here; this is the only
//! place the crate reaches for `stm32-hal2`/`cortex-m` register access.

#[cfg(feature = "stm32-hal2")]
pub mod stm32;
