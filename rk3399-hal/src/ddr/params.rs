//! Board specific DRAM configuration.
//!
//! The configuration is plain data which a board crate usually provides as a `const` value. The
//! three register images are generated by the vendor tooling for the target frequency and are
//! copied verbatim into the Denali blocks.
use arbitrary_int::{u3, u5};
use rk3399::{
    CHANNEL_COUNT,
    ddrc::{CTL_REG_COUNT, PHY_REG_COUNT, PI_REG_COUNT},
    msch::regs::{DdrMode, DdrTimingA0, DdrTimingB0, DdrTimingC0, DevToDev0},
};

use crate::time::Hertz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DramType {
    Ddr3,
    Lpddr3,
    Lpddr4,
}

impl DramType {
    /// Type code used in the persistent topology word.
    pub const fn sys_reg_code(self) -> u3 {
        match self {
            DramType::Ddr3 => u3::new(3),
            DramType::Lpddr3 => u3::new(6),
            DramType::Lpddr4 => u3::new(7),
        }
    }

    pub const fn from_sys_reg_code(code: u3) -> Result<Self, ConfigError> {
        match code.value() {
            3 => Ok(DramType::Ddr3),
            6 => Ok(DramType::Lpddr3),
            7 => Ok(DramType::Lpddr4),
            code => Err(ConfigError::UnknownDramType(code)),
        }
    }

    /// Highest supported DRAM clock.
    pub const fn max_frequency(self) -> Hertz {
        match self {
            DramType::Ddr3 => Hertz::MHz(800),
            DramType::Lpddr3 => Hertz::MHz(933),
            DramType::Lpddr4 => Hertz::MHz(800),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{dram_type:?} frequency {frequency_mhz} MHz exceeds maximum of {max_mhz} MHz")]
    FrequencyTooHigh {
        dram_type: DramType,
        frequency_mhz: u32,
        max_mhz: u32,
    },
    #[error("unknown DRAM type code {0}")]
    UnknownDramType(u8),
    #[error("invalid drive strength code {0:#x}")]
    InvalidDrive(u8),
    #[error("invalid ODT code {0:#x}")]
    InvalidOdt(u8),
}

/// Memory scheduler timing registers of one channel.
#[derive(Debug, Clone, Copy)]
pub struct MschTimings {
    pub ddr_timing_a0: DdrTimingA0,
    pub ddr_timing_b0: DdrTimingB0,
    pub ddr_timing_c0: DdrTimingC0,
    pub dev_to_dev0: DevToDev0,
    pub ddr_mode: DdrMode,
}

impl MschTimings {
    pub const ZERO: Self = Self {
        ddr_timing_a0: DdrTimingA0::new_with_raw_value(0),
        ddr_timing_b0: DdrTimingB0::new_with_raw_value(0),
        ddr_timing_c0: DdrTimingC0::new_with_raw_value(0),
        dev_to_dev0: DevToDev0::new_with_raw_value(0),
        ddr_mode: DdrMode::new_with_raw_value(0),
    };
}

/// Geometry of the DRAM devices attached to one channel.
///
/// All address widths are given in bits. The bus widths are given as the base two logarithm
/// of the width in bytes, so 2 is a 32 bit bus and 1 is a 16 bit bus.
#[derive(Debug, Clone, Copy)]
pub struct ChannelGeometry {
    pub rank: u8,
    /// Column address bits. A value of 0 marks an unpopulated channel.
    pub col: u8,
    pub bk: u8,
    pub cs0_row: u8,
    pub cs1_row: u8,
    pub bw: u8,
    pub dbw: u8,
    /// The row count is not a power of two and only 3/4 of the address space is populated.
    pub row_3_4: bool,
    /// Address decoding pattern selector of the memory scheduler.
    pub ddrconfig: u8,
    pub msch_timings: MschTimings,
}

impl ChannelGeometry {
    /// An unpopulated channel.
    pub const ABSENT: Self = Self {
        rank: 0,
        col: 0,
        bk: 0,
        cs0_row: 0,
        cs1_row: 0,
        bw: 0,
        dbw: 0,
        row_3_4: false,
        ddrconfig: 0,
        msch_timings: MschTimings::ZERO,
    };

    #[inline]
    pub const fn is_populated(&self) -> bool {
        self.col != 0
    }
}

/// Complete DRAM configuration of a board.
#[derive(Debug, Clone)]
pub struct SdramParams {
    pub dram_type: DramType,
    pub frequency: Hertz,
    /// Enables the read termination of the data pads.
    pub odt: bool,
    /// Number of channels to initialize, 1 or 2.
    pub num_channels: u8,
    /// Interleaving stride used when no better value can be derived from the capacity.
    pub default_stride: u5,
    pub channels: [ChannelGeometry; CHANNEL_COUNT],
    pub ctl_regs: [u32; CTL_REG_COUNT],
    pub pi_regs: [u32; PI_REG_COUNT],
    pub phy_regs: [u32; PHY_REG_COUNT],
}

impl SdramParams {
    /// Checks the DRAM clock against the maximum of the DRAM type.
    pub fn check_frequency(&self) -> Result<(), ConfigError> {
        let max = self.dram_type.max_frequency();
        if self.frequency > max {
            return Err(ConfigError::FrequencyTooHigh {
                dram_type: self.dram_type,
                frequency_mhz: self.frequency.to_MHz(),
                max_mhz: max.to_MHz(),
            });
        }
        Ok(())
    }

    /// Populated channel slots in ascending order, limited to the configured channel count.
    ///
    /// These are the channels which are trained and published in the topology word.
    pub fn active_channels(&self) -> impl Iterator<Item = usize> + '_ {
        (0..CHANNEL_COUNT)
            .filter(|&channel| self.channels[channel].is_populated())
            .take(self.num_channels as usize)
    }
}
