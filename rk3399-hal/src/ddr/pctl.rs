//! Controller bring-up of a single DDR channel.
//!
//! [pctl_cfg] loads the register images and starts the PI and controller state machines,
//! [pctl_start] lets the controller run the DRAM initialization.
use core::ops::RangeInclusive;

use arbitrary_int::u2;
use embedded_hal::delay::DelayNs;
use rk3399::{
    ChannelPeripherals, clrsetbits_masked,
    cru::{MmioCru, SOFTRST_CON_DDR, ddr_soft_reset},
    ddrc::{
        CTL_REG_COUNT, MmioDenaliPhy, PHY_DATA_SLICES, PI_REG_COUNT,
        ctl::{CtlInterruptStatus, CtlPowerUpConfig, CtlStart},
        phy::{
            EARLY_GLOBAL_REGS, PhyDllResetEnable, PhyDqTselWrTiming, PhyDqsTselWrTiming,
            PhyInitStatus0, PhyInitStatus1, PhyInitStatus2, RDDQS_SLAVE_DELAY_FIRST,
            RDDQS_SLAVE_DELAY_LAST,
        },
        pi::PiStart,
    },
    grf::{DDRC_CON0_DFI_INIT_START, MmioGrfDdrc},
};

use super::{
    ll,
    params::{ConfigError, SdramParams},
};
use crate::{
    poll::{Deadline, TimeoutError, wait_forever, wait_until},
    time::{Duration, Monotonic},
};

/// PHY register windows which are loaded from the image once the PHY is running.
pub const PHY_IMAGE_WINDOWS: [RangeInclusive<usize>; 8] = [
    896..=958,
    0..=90,
    128..=218,
    256..=346,
    384..=474,
    512..=549,
    640..=677,
    768..=805,
];

/// Bound for the controller initialization after the DFI init start was released.
pub const CTL_INIT_TIMEOUT: Duration = Duration::millis(1);

/// Reset value of the read DQS slave delays.
pub const RDDQS_SLAVE_DELAY_DEFAULT: u32 = 0x0820;

/// Half a clock cycle in the units of the termination write timing fields.
pub const TSEL_WR_TIMING_HALF_CYCLE: u8 = 0x10;

/// Settle time after each reset step.
pub const RESET_SETTLE_US: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum BringUpError {
    #[error("controller initialization of channel {channel} timed out")]
    InitTimeout {
        channel: usize,
        #[source]
        source: TimeoutError,
    },
}

/// Controller state captured by [pctl_cfg] which [pctl_start] restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ChannelBringUp {
    pub pwrup_srefresh_exit: bool,
}

/// Cycles the controller and PHY resets of a channel.
pub fn phy_pctrl_reset(cru: &mut MmioCru<'_>, delay: &mut impl DelayNs, channel: usize) {
    for (ctrl, phy) in [(true, true), (true, false), (false, false)] {
        // Safety: The DDR soft reset register index is in range.
        unsafe {
            cru.write_softrst_con_unchecked(SOFTRST_CON_DDR, ddr_soft_reset(channel, ctrl, phy));
        }
        delay.delay_us(RESET_SETTLE_US);
    }
}

fn phy_init_done(phy: &mut MmioDenaliPhy<'_>) -> bool {
    let status1 = phy.read::<PhyInitStatus1>();
    phy.read::<PhyInitStatus0>().done()
        && status1.done_hi()
        && status1.done_lo()
        && phy.read::<PhyInitStatus2>().done()
}

/// Loads the register images into the controller, PI and PHY of one channel and starts the
/// PI and controller.
///
/// Returns an error if the pad configuration derived from the register images is invalid.
pub fn pctl_cfg(
    regs: &mut ChannelPeripherals,
    channel: usize,
    params: &SdramParams,
) -> Result<ChannelBringUp, ConfigError> {
    let geometry = &params.channels[channel];

    // DRAM_CLASS in CTL_0 must not be written before NO_PHY_IND_TRAIN_INT is programmed.
    regs.ctl
        .copy_from_image(&params.ctl_regs, 1..=CTL_REG_COUNT - 1);
    regs.ctl.write_raw(0, params.ctl_regs[0]);
    regs.pi.copy_from_image(&params.pi_regs, 0..=PI_REG_COUNT - 1);
    // The rank count is required by the PI initialization.
    ll::set_memory_map(regs, geometry, params.dram_type);
    regs.phy
        .copy_from_image(&params.phy_regs, EARLY_GLOBAL_REGS);

    let bring_up = ChannelBringUp {
        pwrup_srefresh_exit: regs.ctl.read::<CtlPowerUpConfig>().pwrup_srefresh_exit(),
    };
    regs.ctl
        .modify::<CtlPowerUpConfig>(|val| val.with_pwrup_srefresh_exit(false));

    regs.phy
        .modify::<PhyDllResetEnable>(|val| val.with_dll_rst_en(u2::new(1)));
    regs.pi.modify::<PiStart>(|val| val.with_start(true));
    regs.ctl.modify::<CtlStart>(|val| val.with_start(true));

    wait_forever(|| phy_init_done(&mut regs.phy));
    log::debug!("DDR channel {} PHY running", channel);

    for window in PHY_IMAGE_WINDOWS {
        regs.phy.copy_from_image(&params.phy_regs, window);
    }
    ll::set_ds_odt(&mut regs.phy, params.dram_type, params.odt);

    regs.phy.modify_all_slices::<PhyDqsTselWrTiming>(|val| {
        val.with_dqs_tsel_wr_timing(
            val.dqs_tsel_wr_timing()
                .wrapping_add(TSEL_WR_TIMING_HALF_CYCLE),
        )
    });
    regs.phy.modify_all_slices::<PhyDqTselWrTiming>(|val| {
        val.with_dq_tsel_wr_timing(
            val.dq_tsel_wr_timing()
                .wrapping_add(TSEL_WR_TIMING_HALF_CYCLE),
        )
    });

    ll::phy_io_config(
        &mut regs.phy,
        params.dram_type,
        params.odt,
        params.frequency,
    )?;
    Ok(bring_up)
}

/// Releases the DFI initialization of a configured channel and waits for the controller to
/// finish the DRAM initialization.
pub fn pctl_start(
    regs: &mut ChannelPeripherals,
    grf: &mut MmioGrfDdrc<'_>,
    clock: &mut dyn Monotonic,
    channel: usize,
    bring_up: ChannelBringUp,
) -> Result<(), BringUpError> {
    grf.write_con0(channel, clrsetbits_masked(DDRC_CON0_DFI_INIT_START, 0));
    regs.phy
        .modify::<PhyDllResetEnable>(|val| val.with_dll_rst_en(u2::new(2)));

    wait_until(Some(Deadline::after(clock, CTL_INIT_TIMEOUT)), || {
        regs.ctl.read::<CtlInterruptStatus>().init_done()
    })
    .map_err(|source| BringUpError::InitTimeout { channel, source })?;

    grf.write_con0(
        channel,
        clrsetbits_masked(DDRC_CON0_DFI_INIT_START, DDRC_CON0_DFI_INIT_START),
    );

    let delay_pair = (RDDQS_SLAVE_DELAY_DEFAULT << 16) | RDDQS_SLAVE_DELAY_DEFAULT;
    for slice in 0..PHY_DATA_SLICES {
        for reg in RDDQS_SLAVE_DELAY_FIRST..RDDQS_SLAVE_DELAY_LAST {
            regs.phy
                .write_raw(MmioDenaliPhy::data_slice_index(reg, slice), delay_pair);
        }
        regs.phy.clrsetbits_raw(
            MmioDenaliPhy::data_slice_index(RDDQS_SLAVE_DELAY_LAST, slice),
            0xffff,
            RDDQS_SLAVE_DELAY_DEFAULT,
        );
    }

    regs.ctl.modify::<CtlPowerUpConfig>(|val| {
        val.with_pwrup_srefresh_exit(bring_up.pwrup_srefresh_exit)
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddr::sim::{MockBoard, SimulatedChannel, SimulatedSoc, test_params};
    use crate::ddr::params::DramType;

    #[test]
    fn reset_sequence() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let mut board = MockBoard::new();
        phy_pctrl_reset(&mut regs.cru, &mut board, 1);
        assert_eq!(soc.cru.read(0x400 / 4 + 4), ddr_soft_reset(1, false, false));
        assert_eq!(board.delayed_us(), 30);
    }

    #[test]
    fn cfg_loads_images_and_starts() {
        let sim = SimulatedChannel::new();
        sim.preset_phy_init_done();
        let mut regs = sim.peripherals();
        let mut params = test_params(DramType::Lpddr4);
        params.ctl_regs[68] = 1 << 16 | 0x5;
        params.ctl_regs[100] = 0xdead_beef;
        params.pi_regs[10] = 0x1234;
        params.phy_regs[911] = 0x42;
        params.phy_regs[700] = 0x77;
        for slice in 0..4 {
            params.phy_regs[slice * 128 + 84] = 0x20 << 8;
            params.phy_regs[slice * 128 + 83] = 0xf8 << 16;
        }

        let bring_up = pctl_cfg(&mut regs, 0, &params).unwrap();
        assert!(bring_up.pwrup_srefresh_exit);
        assert_eq!(sim.ctl(68), 0x5);
        assert_eq!(sim.ctl(100), 0xdead_beef);
        assert_eq!(sim.ctl(0) & 1, 1);
        assert_eq!(sim.pi(0) & 1, 1);
        assert_eq!(sim.pi(10), 0x1234);
        assert_eq!(sim.phy(911), 0x42);
        // Not part of any window.
        assert_eq!(sim.phy(700), 0);
        for slice in 0..4 {
            assert_eq!(sim.phy(slice * 128 + 84), 0x30 << 8);
            assert_eq!(sim.phy(slice * 128 + 83), 0x08 << 16);
        }
    }

    #[test]
    fn start_waits_for_init_done() {
        let soc = SimulatedSoc::new();
        soc.channels[1].ctl.write(203, 1 << 3);
        let mut regs = soc.peripherals();
        let mut board = MockBoard::new();
        let bring_up = ChannelBringUp {
            pwrup_srefresh_exit: true,
        };
        pctl_start(
            &mut regs.channels[1],
            &mut regs.grf_ddrc,
            &mut board,
            1,
            bring_up,
        )
        .unwrap();
        assert_eq!(soc.grf_ddrc.read(2), 0x0100_0100);
        assert_eq!(soc.grf_ddrc.read(0), 0);
        assert_eq!(soc.channels[1].phy(957), 2 << 24);
        assert_eq!(soc.channels[1].ctl(68), 1 << 16);
        for slice in 0..4 {
            for reg in 53..58 {
                assert_eq!(soc.channels[1].phy(slice * 128 + reg), 0x0820_0820);
            }
            assert_eq!(soc.channels[1].phy(slice * 128 + 58), 0x0820);
        }
    }

    #[test]
    fn start_times_out() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let mut board = MockBoard::new();
        let result = pctl_start(
            &mut regs.channels[0],
            &mut regs.grf_ddrc,
            &mut board,
            0,
            ChannelBringUp {
                pwrup_srefresh_exit: false,
            },
        );
        assert!(matches!(
            result,
            Err(BringUpError::InitTimeout { channel: 0, .. })
        ));
        assert_eq!(soc.grf_ddrc.read(0), 0x0100_0000);
    }
}
