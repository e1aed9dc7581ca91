//! # DDR SDRAM initialization
//!
//! Brings up the DDR controllers, PHYs and DRAM devices of both channels for DDR3, LPDDR3 and
//! LPDDR4 memory. The sequence per channel is:
//!
//! 1. Reset the controller and PHY and select the DLL bypass mode for the DRAM clock.
//! 2. Load the register images and start the controller ([pctl::pctl_cfg],
//!    [pctl::pctl_start]).
//! 3. Run the data training ([training::data_training]).
//! 4. Program the memory scheduler address decoding ([topology::set_ddrconfig]).
//!
//! Afterwards the topology is published ([topology::dram_all_config]) and the DDR clock is
//! switched to the PHY frequency index 1, which requires a second training.
//!
//! Hardware failures can not be recovered locally. They are logged and the board is reset,
//! after which the boot firmware runs the whole initialization again. Invalid configuration
//! data halts with a panic.
use arbitrary_int::{u2, u5};
use embedded_hal::delay::DelayNs;
use rk3399::{
    CHANNEL_COUNT, Peripherals,
    cic::{
        CTRL0_FREQ_CHANGE_DONE, CTRL0_FREQ_CHANGE_EN, CTRL0_FREQ_CHANGE_REQ,
        CTRL0_FREQ_INDEX_MASK, CTRL0_FREQ_INDEX_SHIFT,
    },
    clrsetbits_masked,
    ddrc::phy::PhyFreqSel,
};

use crate::{
    poll::{Deadline, TimeoutError, wait_until},
    time::{Duration, Hertz, Monotonic},
};

pub mod ll;
pub mod params;
pub mod pctl;
#[cfg(test)]
mod sim;
pub mod topology;
pub mod training;

pub use params::{ChannelGeometry, ConfigError, DramType, MschTimings, SdramParams};
pub use topology::SdramTopology;
pub use training::{TrainingError, TrainingFlags};

/// Board services required by the DRAM initialization.
pub trait Board: DelayNs + Monotonic {
    /// Sets the DDR PLL to the given DRAM clock.
    fn configure_ddr_clock(&mut self, frequency: Hertz);

    /// Resets the whole system.
    fn reset(&mut self) -> !;
}

/// Bound for each handshake step of the frequency change.
pub const FREQ_SWITCH_TIMEOUT: Duration = Duration::millis(100);

/// Settle time for the LPDDR3 device auto initialization after the controller start.
pub const LPDDR3_DAI_SETTLE_US: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum FrequencySwitchError {
    #[error("frequency change request not acknowledged")]
    RequestTimeout(#[source] TimeoutError),
    #[error("frequency change did not complete")]
    DoneTimeout(#[source] TimeoutError),
    #[error("retraining of channel {channel} failed")]
    Training {
        channel: usize,
        #[source]
        source: TrainingError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    BringUp(#[from] pctl::BringUpError),
    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// Switches the DDR clock to PHY frequency index 1 through the CIC and retrains all active
/// channels.
pub fn switch_to_phy_index1(
    regs: &mut Peripherals,
    clock: &mut dyn Monotonic,
    params: &SdramParams,
) -> Result<(), FrequencySwitchError> {
    regs.cic.write_ctrl0(clrsetbits_masked(
        CTRL0_FREQ_INDEX_MASK | CTRL0_FREQ_CHANGE_EN | CTRL0_FREQ_CHANGE_REQ,
        1 << CTRL0_FREQ_INDEX_SHIFT | CTRL0_FREQ_CHANGE_EN | CTRL0_FREQ_CHANGE_REQ,
    ));
    wait_until(Some(Deadline::after(clock, FREQ_SWITCH_TIMEOUT)), || {
        regs.cic.read_status0().freq_change_ack()
    })
    .map_err(FrequencySwitchError::RequestTimeout)?;

    regs.cic.write_ctrl0(clrsetbits_masked(
        CTRL0_FREQ_CHANGE_DONE,
        CTRL0_FREQ_CHANGE_DONE,
    ));
    wait_until(Some(Deadline::after(clock, FREQ_SWITCH_TIMEOUT)), || {
        regs.cic.read_status0().freq_change_done()
    })
    .map_err(FrequencySwitchError::DoneTimeout)?;

    for channel in params.active_channels() {
        let chan = &mut regs.channels[channel];
        chan.phy
            .modify::<PhyFreqSel>(|val| val.with_index(u2::new(1)).with_multicast_en(false));
        training::data_training(
            chan,
            params.dram_type,
            params.channels[channel].rank,
            TrainingFlags::FULL,
        )
        .map_err(|source| FrequencySwitchError::Training { channel, source })?;
    }
    Ok(())
}

fn init_channel<B: Board>(
    regs: &mut Peripherals,
    board: &mut B,
    params: &SdramParams,
    channel: usize,
) -> Result<(), ChannelInitError> {
    let bring_up = pctl::pctl_cfg(&mut regs.channels[channel], channel, params)?;
    pctl::pctl_start(
        &mut regs.channels[channel],
        &mut regs.grf_ddrc,
        board,
        channel,
        bring_up,
    )?;
    if params.dram_type == DramType::Lpddr3 {
        board.delay_us(LPDDR3_DAI_SETTLE_US);
    }

    let geometry = &params.channels[channel];
    training::data_training(
        &mut regs.channels[channel],
        params.dram_type,
        geometry.rank,
        TrainingFlags::FULL,
    )?;
    topology::set_ddrconfig(&mut regs.channels[channel].msch, geometry);
    log::debug!("DDR channel {} initialized", channel);
    Ok(())
}

/// Initializes the DRAM of all configured channels and returns the channel interleaving
/// stride.
///
/// # Panics
///
/// Panics before touching the hardware if the DRAM clock exceeds the maximum of the DRAM
/// type, and if the pad configuration derived from the register images is invalid.
///
/// Hardware failures reset the board through [Board::reset].
pub fn sdram_init<B: Board>(regs: &mut Peripherals, board: &mut B, params: &SdramParams) -> u5 {
    log::info!("Starting SDRAM initialization");
    if let Err(e) = params.check_frequency() {
        panic!("{}", e);
    }
    board.configure_ddr_clock(params.frequency);

    for channel in 0..CHANNEL_COUNT {
        pctl::phy_pctrl_reset(&mut regs.cru, board, channel);
        ll::set_dll_bypass(&mut regs.channels[channel].phy, params.frequency);
        if !params.active_channels().any(|active| active == channel) {
            continue;
        }
        match init_channel(regs, board, params, channel) {
            Ok(()) => (),
            Err(ChannelInitError::Config(e)) => panic!("DDR channel {}: {}", channel, e),
            Err(e) => {
                log::error!("DDR channel {} initialization failed: {}, reset", channel, e);
                board.reset();
            }
        }
    }

    let stride = topology::calculate_stride(params);
    topology::dram_all_config(regs, params, stride);
    if let Err(e) = switch_to_phy_index1(regs, board, params) {
        log::error!("switch to frequency index 1 failed: {}, reset", e);
        board.reset();
    }

    log::info!("Finished SDRAM initialization");
    stride
}
