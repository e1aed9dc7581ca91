//! Denali PHY registers.
//!
//! The PHY has four data slices (one per byte lane) starting at word 0 and three
//! address/control slices starting at word 512, each replicated with a stride of
//! [PHY_SLICE_STRIDE](super::PHY_SLICE_STRIDE) words. The global pad configuration starts at
//! word 896.
use arbitrary_int::{u2, u3, u4, u12};

use super::{PHY_ADDR_SLICES, PHY_DATA_SLICES};

/// Word offset of the first address/control slice.
pub const ADDR_SLICE_BASE: usize = 512;

/// Drive strength or termination code of a PHY pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DriveOdt {
    HiZ = 0x0,
    Ohm240 = 0x1,
    Ohm120 = 0x8,
    Ohm80 = 0x9,
    Ohm60 = 0xc,
    Ohm48 = 0xd,
    Ohm40 = 0xe,
    Ohm34_3 = 0xf,
}

impl DriveOdt {
    #[inline]
    pub const fn raw(self) -> u4 {
        u4::new(self as u8)
    }

    pub const fn from_raw(raw: u4) -> Option<Self> {
        Some(match raw.value() {
            0x0 => Self::HiZ,
            0x1 => Self::Ohm240,
            0x8 => Self::Ohm120,
            0x9 => Self::Ohm80,
            0xc => Self::Ohm60,
            0xd => Self::Ohm48,
            0xe => Self::Ohm40,
            0xf => Self::Ohm34_3,
            _ => return None,
        })
    }
}

/// Pads with a drive strength selection for the pull-down (`n`) and pull-up (`p`) side.
pub trait PadTselSelect: Copy {
    fn with_tsel(self, n: DriveOdt, p: DriveOdt) -> Self;
}

/// Pads with an I/O mode and a speed setting.
pub trait PadModeSpeed: Copy {
    fn with_pad_mode(self, mode: u3) -> Self;
    fn with_pad_speed(self, speed: u2) -> Self;
}

/// Pad termination registers.
pub trait PadTerm: Copy {
    fn with_term_enable(self, enable: bool) -> Self;
}

// Data slice registers.

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyDqTselEnable {
    #[bit(18, rw)]
    idle_en: bool,
    #[bit(17, rw)]
    wr_en: bool,
    #[bit(16, rw)]
    rd_en: bool,
}
slice_register!(PhyDqTselEnable, 5, PHY_DATA_SLICES);

/// Termination and drive strength of the DQ/DM pads. Also holds the DQS termination
/// enable bits.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyDqTselSelect {
    #[bits(24..=26, rw)]
    dqs_tsel_enable: u3,
    #[bits(20..=23, rw)]
    idle_p: u4,
    #[bits(16..=19, rw)]
    idle_n: u4,
    #[bits(12..=15, rw)]
    wr_p: u4,
    #[bits(8..=11, rw)]
    wr_n: u4,
    #[bits(4..=7, rw)]
    rd_p: u4,
    #[bits(0..=3, rw)]
    rd_n: u4,
}
slice_register!(PhyDqTselSelect, 6, PHY_DATA_SLICES);

/// Termination and drive strength of the DQS pads.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyDqsTselSelect {
    #[bits(20..=23, rw)]
    idle_p: u4,
    #[bits(16..=19, rw)]
    idle_n: u4,
    #[bits(12..=15, rw)]
    wr_p: u4,
    #[bits(8..=11, rw)]
    wr_n: u4,
    #[bits(4..=7, rw)]
    rd_p: u4,
    #[bits(0..=3, rw)]
    rd_n: u4,
}
slice_register!(PhyDqsTselSelect, 7, PHY_DATA_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPerCsTraining {
    #[bit(24, rw)]
    index: bool,
    #[bit(16, rw)]
    multicast_en: bool,
}
slice_register!(PhyPerCsTraining, 8, PHY_DATA_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyWrlvlStatusObs {
    #[bit(12, r)]
    error: bool,
}
slice_register!(PhyWrlvlStatusObs, 40, PHY_DATA_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyGtlvlStatusObs {
    #[bits(22..=23, r)]
    error: u2,
}
slice_register!(PhyGtlvlStatusObs, 43, PHY_DATA_SLICES);

/// First of the six read DQS slave delay registers of a data slice.
pub const RDDQS_SLAVE_DELAY_FIRST: usize = 53;
/// Last of the read DQS slave delay registers. Only its lower half belongs to the delays.
pub const RDDQS_SLAVE_DELAY_LAST: usize = 58;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyWrlvlDelay {
    #[bits(16..=31, rw)]
    delay: u16,
}
slice_register!(PhyWrlvlDelay, 63, PHY_DATA_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyDqTselWrTiming {
    #[bits(16..=23, rw)]
    dq_tsel_wr_timing: u8,
}
slice_register!(PhyDqTselWrTiming, 83, PHY_DATA_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyDqsTselWrTiming {
    #[bit(16, rw)]
    per_cs_training_en: bool,
    #[bits(8..=15, rw)]
    dqs_tsel_wr_timing: u8,
}
slice_register!(PhyDqsTselWrTiming, 84, PHY_DATA_SLICES);

/// Master delay line mode. Setting both upper bits bypasses the DLL.
pub const SW_MASTER_MODE_BYPASS: u4 = u4::new(0b1100);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhySwMasterMode {
    #[bits(8..=11, rw)]
    sw_master_mode: u4,
}
slice_register!(PhySwMasterMode, 86, PHY_DATA_SLICES);

// Address/control slice registers.

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyAdrTselEnable {
    #[bit(8, rw)]
    tsel_en: bool,
}
slice_register!(PhyAdrTselEnable, ADDR_SLICE_BASE + 6, PHY_ADDR_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyAdrCalvlObs {
    #[bits(30..=31, r)]
    error: u2,
}
slice_register!(PhyAdrCalvlObs, ADDR_SLICE_BASE + 20, PHY_ADDR_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyAdrTselSelect {
    #[bits(4..=7, rw)]
    tsel_p: u4,
    #[bits(0..=3, rw)]
    tsel_n: u4,
}
slice_register!(PhyAdrTselSelect, ADDR_SLICE_BASE + 32, PHY_ADDR_SLICES);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyAdrctlSwMasterMode {
    #[bits(16..=19, rw)]
    sw_master_mode: u4,
}
slice_register!(PhyAdrctlSwMasterMode, ADDR_SLICE_BASE + 35, PHY_ADDR_SLICES);

// Global registers.

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyFreqSel {
    #[bits(8..=9, rw)]
    index: u2,
    #[bit(0, rw)]
    multicast_en: bool,
}
register!(PhyFreqSel, 896);

/// Registers of the global block which are written before the PHY is started.
pub const EARLY_GLOBAL_REGS: core::ops::RangeInclusive<usize> = 910..=912;

/// 12-bit pad reference voltage control value.
#[bitbybit::bitfield(u16, default = 0x0, debug)]
pub struct PadVrefCtrl {
    #[bits(9..=11, rw)]
    mode: u3,
    #[bit(8, rw)]
    enable: bool,
    #[bits(0..=7, rw)]
    value: u8,
}

impl PadVrefCtrl {
    #[inline]
    pub const fn as_u12(self) -> u12 {
        u12::new(self.raw_value() & 0xfff)
    }
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadVrefCtrlDq0 {
    #[bits(8..=19, rw)]
    dq0: u12,
}
register!(PhyPadVrefCtrlDq0, 913);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadVrefCtrlDq12 {
    #[bits(16..=27, rw)]
    dq2: u12,
    #[bits(0..=11, rw)]
    dq1: u12,
}
register!(PhyPadVrefCtrlDq12, 914);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadVrefCtrlDq3Ac {
    #[bits(16..=27, rw)]
    ac: u12,
    #[bits(0..=11, rw)]
    dq3: u12,
}
register!(PhyPadVrefCtrlDq3Ac, 915);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyInitStatus0 {
    #[bit(16, r)]
    done: bool,
}
register!(PhyInitStatus0, 920);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyInitStatus1 {
    #[bit(16, r)]
    done_hi: bool,
    #[bit(0, r)]
    done_lo: bool,
}
register!(PhyInitStatus1, 921);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyInitStatus2 {
    #[bit(0, r)]
    done: bool,
}
register!(PhyInitStatus2, 922);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadFdbkDrive {
    #[bits(21..=22, rw)]
    speed: u2,
    #[bits(15..=17, rw)]
    mode: u3,
    #[bits(4..=7, rw)]
    tsel_p: u4,
    #[bits(0..=3, rw)]
    tsel_n: u4,
}
register!(PhyPadFdbkDrive, 924);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadFdbkReadTsel {
    #[bits(4..=7, rw)]
    tsel_p: u4,
    #[bits(0..=3, rw)]
    tsel_n: u4,
}
register!(PhyPadFdbkReadTsel, 925);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadDataDrive {
    #[bits(9..=10, rw)]
    speed: u2,
    #[bits(6..=8, rw)]
    mode: u3,
}
register!(PhyPadDataDrive, 926);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyPadDqsDrive {
    /// Pulls the differential DQS pair to a defined level.
    #[bit(22, rw)]
    rpull: bool,
    #[bits(9..=10, rw)]
    speed: u2,
    #[bits(6..=8, rw)]
    mode: u3,
}
register!(PhyPadDqsDrive, 927);

impl PadModeSpeed for PhyPadFdbkDrive {
    fn with_pad_mode(self, mode: u3) -> Self {
        self.with_mode(mode)
    }
    fn with_pad_speed(self, speed: u2) -> Self {
        self.with_speed(speed)
    }
}

impl PadModeSpeed for PhyPadDataDrive {
    fn with_pad_mode(self, mode: u3) -> Self {
        self.with_mode(mode)
    }
    fn with_pad_speed(self, speed: u2) -> Self {
        self.with_speed(speed)
    }
}

impl PadModeSpeed for PhyPadDqsDrive {
    fn with_pad_mode(self, mode: u3) -> Self {
        self.with_mode(mode)
    }
    fn with_pad_speed(self, speed: u2) -> Self {
        self.with_speed(speed)
    }
}

impl PadTselSelect for PhyPadFdbkDrive {
    fn with_tsel(self, n: DriveOdt, p: DriveOdt) -> Self {
        self.with_tsel_n(n.raw()).with_tsel_p(p.raw())
    }
}

impl PadTselSelect for PhyPadFdbkReadTsel {
    fn with_tsel(self, n: DriveOdt, p: DriveOdt) -> Self {
        self.with_tsel_n(n.raw()).with_tsel_p(p.raw())
    }
}

impl PadTselSelect for PhyAdrTselSelect {
    fn with_tsel(self, n: DriveOdt, p: DriveOdt) -> Self {
        self.with_tsel_n(n.raw()).with_tsel_p(p.raw())
    }
}

/// Address, clock, CKE, reset and chip select pads share one drive register layout.
macro_rules! pad_drive {
    ($(#[$meta:meta])* $name:ident, $offset:expr) => {
        $(#[$meta])*
        #[bitbybit::bitfield(u32, default = 0x0, debug)]
        pub struct $name {
            #[bits(17..=18, rw)]
            speed: u2,
            #[bits(14..=16, rw)]
            mode: u3,
            #[bits(4..=7, rw)]
            tsel_p: u4,
            #[bits(0..=3, rw)]
            tsel_n: u4,
        }
        register!($name, $offset);

        impl PadModeSpeed for $name {
            fn with_pad_mode(self, mode: u3) -> Self {
                self.with_mode(mode)
            }
            fn with_pad_speed(self, speed: u2) -> Self {
                self.with_speed(speed)
            }
        }

        impl PadTselSelect for $name {
            fn with_tsel(self, n: DriveOdt, p: DriveOdt) -> Self {
                self.with_tsel_n(n.raw()).with_tsel_p(p.raw())
            }
        }
    };
}

macro_rules! pad_term {
    ($name:ident, $offset:expr) => {
        #[bitbybit::bitfield(u32, default = 0x0, debug)]
        pub struct $name {
            #[bit(17, rw)]
            tsel_en: bool,
        }
        register!($name, $offset);

        impl PadTerm for $name {
            fn with_term_enable(self, enable: bool) -> Self {
                self.with_tsel_en(enable)
            }
        }
    };
}

pad_drive!(PhyPadAddrDrive, 928);
pad_drive!(PhyPadClkDrive, 929);
pad_drive!(PhyPadCkeDrive, 935);
pad_drive!(PhyPadRstDrive, 937);
pad_drive!(PhyPadCsDrive, 939);

pad_term!(PhyPadFdbkTerm, 930);
pad_term!(PhyPadAddrTerm, 933);
pad_term!(PhyPadClkTerm, 934);
pad_term!(PhyPadCkeTerm, 936);
pad_term!(PhyPadRstTerm, 938);
pad_term!(PhyPadCsTerm, 940);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PhyDllResetEnable {
    #[bits(24..=25, rw)]
    dll_rst_en: u2,
}
register!(PhyDllResetEnable, 957);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_odt_codes() {
        assert_eq!(DriveOdt::Ohm34_3.raw().value(), 0xf);
        assert_eq!(DriveOdt::from_raw(u4::new(0xd)), Some(DriveOdt::Ohm48));
        assert_eq!(DriveOdt::from_raw(u4::new(0x2)), None);
    }

    #[test]
    fn vref_ctrl_layout() {
        let vref = PadVrefCtrl::new_with_raw_value(0)
            .with_mode(u3::new(0x5))
            .with_enable(true)
            .with_value(0x26);
        assert_eq!(vref.as_u12().value(), (0x5 << 9) | (1 << 8) | 0x26);
    }

    #[test]
    fn pad_drive_layout() {
        let drive = PhyPadAddrDrive::new_with_raw_value(0)
            .with_tsel(DriveOdt::Ohm34_3, DriveOdt::Ohm48)
            .with_pad_mode(u3::new(1))
            .with_pad_speed(u2::new(2));
        assert_eq!(drive.raw_value(), 0xdf | (1 << 14) | (2 << 17));
    }
}
