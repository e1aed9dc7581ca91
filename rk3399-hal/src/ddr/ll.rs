//! Low-level helper functions for the DDR controller and PHY configuration.
//!
//! These functions program the register fields which can not be copied from the register
//! images because they depend on the DRAM type, the geometry or on values read back from the
//! PHY.
use arbitrary_int::{u2, u3, u4};
use rk3399::{
    ChannelPeripherals,
    ddrc::{
        MmioDenaliPhy,
        ctl::{CtlAddrDiff, CtlColDiff, CtlCsMap},
        phy::{
            DriveOdt, PadModeSpeed, PadTerm, PadTselSelect, PadVrefCtrl, PhyAdrTselEnable,
            PhyAdrTselSelect, PhyAdrctlSwMasterMode, PhyDqTselEnable, PhyDqTselSelect,
            PhyDqsTselSelect, PhyPadAddrDrive, PhyPadAddrTerm, PhyPadCkeDrive, PhyPadCkeTerm,
            PhyPadClkDrive, PhyPadClkTerm, PhyPadCsDrive, PhyPadCsTerm, PhyPadDataDrive,
            PhyPadDqsDrive, PhyPadFdbkDrive, PhyPadFdbkReadTsel, PhyPadFdbkTerm,
            PhyPadRstDrive, PhyPadRstTerm, PhyPadVrefCtrlDq0, PhyPadVrefCtrlDq3Ac,
            PhyPadVrefCtrlDq12, PhySwMasterMode, SW_MASTER_MODE_BYPASS,
        },
        pi::{PiAddrDiff, PiColDiff, PiTrainingCsMap},
    },
};

use super::params::{ChannelGeometry, ConfigError, DramType};
use crate::time::Hertz;

/// DLL bypass is required for DRAM clocks up to this frequency.
pub const DLL_BYPASS_MAX_FREQ: Hertz = Hertz::MHz(125);

/// Raw value of `PI_34` for single rank DDR3.
pub const PI_34_DDR3_SINGLE_RANK: u32 = 0x2EC7_FFFF;

pub fn set_dll_bypass(phy: &mut MmioDenaliPhy<'_>, frequency: Hertz) {
    let bypass = frequency <= DLL_BYPASS_MAX_FREQ;
    let apply = |mode: u4| {
        if bypass {
            mode | SW_MASTER_MODE_BYPASS
        } else {
            mode & !SW_MASTER_MODE_BYPASS
        }
    };
    phy.modify_all_slices::<PhySwMasterMode>(|val| {
        val.with_sw_master_mode(apply(val.sw_master_mode()))
    });
    phy.modify_all_slices::<PhyAdrctlSwMasterMode>(|val| {
        val.with_sw_master_mode(apply(val.sw_master_mode()))
    });
}

/// Row address bits implied by the memory scheduler address decoding pattern.
pub const fn row_bits_for_ddrconfig(ddrconfig: u8) -> u8 {
    match ddrconfig {
        0 | 1 | 4 => 16,
        3 => 14,
        _ => 15,
    }
}

/// Programs the address map differences and the chip select map into the controller and the
/// PI. The chip select map must be set before the PI is started.
pub fn set_memory_map(
    channel: &mut ChannelPeripherals,
    geometry: &ChannelGeometry,
    dram_type: DramType,
) {
    let row = row_bits_for_ddrconfig(geometry.ddrconfig);
    let col_diff = u4::new(12 - geometry.col);
    let bank_diff = u2::new(3 - geometry.bk);
    let row_diff = u3::new(16 - row);
    let cs_map = if geometry.rank > 1 { 0b11 } else { 0b01 };

    channel
        .ctl
        .modify::<CtlColDiff>(|val| val.with_col_diff(col_diff));
    channel.ctl.modify::<CtlAddrDiff>(|val| {
        val.with_bank_diff(bank_diff).with_row_diff(row_diff)
    });
    channel.ctl.modify::<CtlCsMap>(|val| {
        val.with_cs_map(u2::new(cs_map))
            .with_reduc(geometry.bw != 2)
    });

    channel
        .pi
        .modify::<PiColDiff>(|val| val.with_col_diff(col_diff));
    channel.pi.modify::<PiAddrDiff>(|val| {
        val.with_bank_diff(bank_diff).with_row_diff(row_diff)
    });
    channel
        .pi
        .modify::<PiTrainingCsMap>(|val| val.with_cs_map(u4::new(cs_map)));
    if geometry.rank == 1 && dram_type == DramType::Ddr3 {
        channel.pi.write_raw(34, PI_34_DDR3_SINGLE_RANK);
    }
}

/// Drive strength and termination of the data and command/address pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOdtSettings {
    pub rd_p: DriveOdt,
    pub rd_n: DriveOdt,
    pub wr_p: DriveOdt,
    pub wr_n: DriveOdt,
    pub idle_p: DriveOdt,
    pub idle_n: DriveOdt,
    pub ca_p: DriveOdt,
    pub ca_n: DriveOdt,
}

impl DriveOdtSettings {
    pub const fn for_dram_type(dram_type: DramType) -> Self {
        match dram_type {
            DramType::Lpddr4 => Self {
                rd_p: DriveOdt::HiZ,
                rd_n: DriveOdt::Ohm240,
                wr_p: DriveOdt::Ohm40,
                wr_n: DriveOdt::Ohm40,
                idle_p: DriveOdt::HiZ,
                idle_n: DriveOdt::Ohm240,
                ca_p: DriveOdt::Ohm40,
                ca_n: DriveOdt::Ohm40,
            },
            DramType::Lpddr3 => Self {
                rd_p: DriveOdt::Ohm240,
                rd_n: DriveOdt::HiZ,
                wr_p: DriveOdt::Ohm34_3,
                wr_n: DriveOdt::Ohm34_3,
                idle_p: DriveOdt::Ohm240,
                idle_n: DriveOdt::HiZ,
                ca_p: DriveOdt::Ohm48,
                ca_n: DriveOdt::Ohm48,
            },
            DramType::Ddr3 => Self {
                rd_p: DriveOdt::Ohm240,
                rd_n: DriveOdt::Ohm240,
                wr_p: DriveOdt::Ohm34_3,
                wr_n: DriveOdt::Ohm34_3,
                idle_p: DriveOdt::Ohm240,
                idle_n: DriveOdt::Ohm240,
                ca_p: DriveOdt::Ohm34_3,
                ca_n: DriveOdt::Ohm34_3,
            },
        }
    }
}

/// DQ and DQS share the select layout.
macro_rules! with_tsel_select {
    ($val:expr, $settings:expr) => {
        $val.with_rd_n($settings.rd_n.raw())
            .with_rd_p($settings.rd_p.raw())
            .with_wr_n($settings.wr_n.raw())
            .with_wr_p($settings.wr_p.raw())
            .with_idle_n($settings.idle_n.raw())
            .with_idle_p($settings.idle_p.raw())
    };
}

fn set_ca_tsel<R: PadTselSelect + rk3399::ddrc::Register>(
    phy: &mut MmioDenaliPhy<'_>,
    n: DriveOdt,
    p: DriveOdt,
) {
    phy.modify::<R>(|val| val.with_tsel(n, p));
}

fn set_pad_term<R: PadTerm + rk3399::ddrc::Register>(phy: &mut MmioDenaliPhy<'_>, enable: bool) {
    phy.modify::<R>(|val| val.with_term_enable(enable));
}

/// Sets drive strength and on-die termination of all pads. Every lane gets the same values.
pub fn set_ds_odt(phy: &mut MmioDenaliPhy<'_>, dram_type: DramType, odt: bool) {
    let settings = DriveOdtSettings::for_dram_type(dram_type);
    let rd_en = odt;
    let wr_en = false;
    let idle_en = false;

    phy.modify_all_slices::<PhyDqTselSelect>(|val| with_tsel_select!(val, settings));
    phy.modify_all_slices::<PhyDqsTselSelect>(|val| with_tsel_select!(val, settings));

    phy.modify_all_slices::<PhyAdrTselSelect>(|val| {
        val.with_tsel_n(settings.ca_n.raw())
            .with_tsel_p(settings.ca_p.raw())
    });
    set_ca_tsel::<PhyPadAddrDrive>(phy, settings.ca_n, settings.ca_p);
    set_ca_tsel::<PhyPadRstDrive>(phy, settings.ca_n, settings.ca_p);
    set_ca_tsel::<PhyPadCkeDrive>(phy, settings.ca_n, settings.ca_p);
    set_ca_tsel::<PhyPadCsDrive>(phy, settings.ca_n, settings.ca_p);
    set_ca_tsel::<PhyPadClkDrive>(phy, settings.ca_n, settings.ca_p);

    set_ca_tsel::<PhyPadFdbkDrive>(phy, settings.wr_n, settings.wr_p);
    set_ca_tsel::<PhyPadFdbkReadTsel>(phy, settings.rd_n, settings.rd_p);

    phy.modify_all_slices::<PhyDqTselEnable>(|val| {
        val.with_rd_en(rd_en)
            .with_wr_en(wr_en)
            .with_idle_en(idle_en)
    });
    let dqs_tsel_enable = u3::new(rd_en as u8 | (wr_en as u8) << 1 | (idle_en as u8) << 2);
    phy.modify_all_slices::<PhyDqTselSelect>(|val| val.with_dqs_tsel_enable(dqs_tsel_enable));

    phy.modify_all_slices::<PhyAdrTselEnable>(|val| val.with_tsel_en(wr_en));
    set_pad_term::<PhyPadAddrTerm>(phy, wr_en);
    set_pad_term::<PhyPadRstTerm>(phy, wr_en);
    set_pad_term::<PhyPadCkeTerm>(phy, wr_en);
    set_pad_term::<PhyPadCsTerm>(phy, wr_en);
    set_pad_term::<PhyPadClkTerm>(phy, wr_en);
    set_pad_term::<PhyPadFdbkTerm>(phy, wr_en);
}

/// Data reference voltage for LPDDR3 with read termination, depending on the write drive
/// strength and the termination of the data pads.
pub fn lpddr3_odt_vref(drive: u4, odt: u4) -> Result<u8, ConfigError> {
    let drive_odt = DriveOdt::from_raw(drive).ok_or(ConfigError::InvalidDrive(drive.value()))?;
    let odt_value = DriveOdt::from_raw(odt).ok_or(ConfigError::InvalidOdt(odt.value()))?;
    let vref = match (drive_odt, odt_value) {
        (DriveOdt::Ohm48, DriveOdt::Ohm240) => 0x16,
        (DriveOdt::Ohm48, DriveOdt::Ohm120) => 0x26,
        (DriveOdt::Ohm48, DriveOdt::Ohm60) => 0x36,
        (DriveOdt::Ohm40, DriveOdt::Ohm240) => 0x19,
        (DriveOdt::Ohm40, DriveOdt::Ohm120) => 0x23,
        (DriveOdt::Ohm40, DriveOdt::Ohm60) => 0x31,
        (DriveOdt::Ohm34_3, DriveOdt::Ohm240) => 0x17,
        (DriveOdt::Ohm34_3, DriveOdt::Ohm120) => 0x20,
        (DriveOdt::Ohm34_3, DriveOdt::Ohm60) => 0x2e,
        (DriveOdt::Ohm48 | DriveOdt::Ohm40 | DriveOdt::Ohm34_3, _) => {
            return Err(ConfigError::InvalidOdt(odt.value()));
        }
        _ => return Err(ConfigError::InvalidDrive(drive.value())),
    };
    Ok(vref)
}

/// I/O mode of the pads.
pub const fn pad_mode(dram_type: DramType) -> u3 {
    match dram_type {
        DramType::Lpddr4 => u3::new(0x6),
        DramType::Lpddr3 => u3::new(0x0),
        DramType::Ddr3 => u3::new(0x1),
    }
}

/// Pad speed setting for the DRAM clock.
pub fn pad_speed(frequency: Hertz) -> u2 {
    if frequency < Hertz::MHz(400) {
        u2::new(0x0)
    } else if frequency < Hertz::MHz(800) {
        u2::new(0x1)
    } else if frequency < Hertz::MHz(1200) {
        u2::new(0x2)
    } else {
        u2::new(0x3)
    }
}

fn vref_ctrl(mode: u8, value: u8) -> PadVrefCtrl {
    PadVrefCtrl::new_with_raw_value(0)
        .with_mode(u3::new(mode))
        .with_enable(true)
        .with_value(value)
}

fn set_pad_mode_speed<R: PadModeSpeed + rk3399::ddrc::Register>(
    phy: &mut MmioDenaliPhy<'_>,
    mode: u3,
    speed: u2,
) {
    phy.modify::<R>(|val| val.with_pad_mode(mode).with_pad_speed(speed));
}

/// Configures the pad reference voltages, the I/O mode and the pad speed.
///
/// Must run after [set_ds_odt], the LPDDR3 reference voltage depends on the drive strength and
/// termination programmed there.
pub fn phy_io_config(
    phy: &mut MmioDenaliPhy<'_>,
    dram_type: DramType,
    odt: bool,
    frequency: Hertz,
) -> Result<(), ConfigError> {
    let (vref_dq, vref_ac) = match dram_type {
        DramType::Lpddr4 => (vref_ctrl(0x6, 0x1f), vref_ctrl(0x6, 0x1f)),
        DramType::Lpddr3 => {
            let vref_dq = if odt {
                let dq_tsel = phy.read_slice::<PhyDqTselSelect>(0);
                vref_ctrl(0x5, lpddr3_odt_vref(dq_tsel.wr_p(), dq_tsel.rd_p())?)
            } else {
                vref_ctrl(0x2, 0x1f)
            };
            (vref_dq, vref_ctrl(0x2, 0x1f))
        }
        DramType::Ddr3 => (vref_ctrl(0x1, 0x1f), vref_ctrl(0x1, 0x1f)),
    };
    log::debug!(
        "pad vref dq {:#05x}, ac {:#05x}",
        vref_dq.raw_value(),
        vref_ac.raw_value()
    );

    phy.modify::<PhyPadVrefCtrlDq0>(|val| val.with_dq0(vref_dq.as_u12()));
    phy.modify::<PhyPadVrefCtrlDq12>(|val| {
        val.with_dq1(vref_dq.as_u12()).with_dq2(vref_dq.as_u12())
    });
    phy.modify::<PhyPadVrefCtrlDq3Ac>(|val| {
        val.with_dq3(vref_dq.as_u12()).with_ac(vref_ac.as_u12())
    });

    let mode = pad_mode(dram_type);
    let speed = pad_speed(frequency);
    set_pad_mode_speed::<PhyPadFdbkDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadDataDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadDqsDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadAddrDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadClkDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadCkeDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadRstDrive>(phy, mode, speed);
    set_pad_mode_speed::<PhyPadCsDrive>(phy, mode, speed);
    Ok(())
}
