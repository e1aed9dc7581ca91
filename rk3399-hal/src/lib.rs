//! # HAL for the DRAM subsystem of the Rockchip RK3399 SoC
//!
//! This crate brings up the two DDR channels of the RK3399 during early boot. It builds on the
//! [rk3399] peripheral access crate and uses the [embedded-hal](https://github.com/rust-embedded/embedded-hal)
//! delay trait for the few fixed settle times of the sequence.
//!
//! The entry point is [ddr::sdram_init]. After a warm reset, [ddr::SdramTopology] recovers the
//! DRAM size from the persistent topology word without re-running the initialization.
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod ddr;
pub mod poll;
pub mod time;

pub use rk3399 as pac;
