//! # DRAM topology
//!
//! Capacity and interleaving computations and the persistent topology word in PMUGRF
//! `os_reg2`. Later boot stages decode the word to learn the DRAM size without repeating the
//! training.
use arbitrary_int::{u2, u3, u5, u12};
use once_cell::unsync::OnceCell;
use rk3399::{
    CHANNEL_COUNT, Peripherals, clrsetbits_masked,
    cru::rstnhold,
    ddrc::ctl::CtlDfiClockControl,
    grf::{MmioPmuGrfOsRegs, SOC_CON4_DDR_STRIDE_MASK, SOC_CON4_DDR_STRIDE_SHIFT},
    msch::{
        MmioMsch,
        regs::{DdrConf, DdrSize},
    },
};

use super::params::{ChannelGeometry, ConfigError, DramType, SdramParams};

/// Highest usable DRAM size. The address space above is occupied by SoC registers.
pub const MAX_SIZE_MB: u32 = 0xF800_0000 / (1024 * 1024);

/// Stride for a single populated channel 0.
pub const SINGLE_CHANNEL_STRIDE: u5 = u5::new(0x17);

/// Geometry fields of one channel inside the topology word.
#[bitbybit::bitfield(u16, default = 0x0, debug)]
pub struct ChannelSysReg {
    /// Rank count minus one.
    #[bit(11, rw)]
    rank: bool,
    /// Column bits minus 9.
    #[bits(9..=10, rw)]
    col: u2,
    /// 0 for 8 banks, 1 for 4 banks.
    #[bit(8, rw)]
    bk: bool,
    /// Row bits minus 13.
    #[bits(6..=7, rw)]
    cs0_row: u2,
    #[bits(4..=5, rw)]
    cs1_row: u2,
    #[bits(2..=3, rw)]
    bw: u2,
    #[bits(0..=1, rw)]
    dbw: u2,
}

/// Persistent topology word.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct SysReg {
    #[bit(31, rw)]
    row_3_4_ch1: bool,
    #[bit(30, rw)]
    row_3_4_ch0: bool,
    /// Bit mask of the populated channels.
    #[bits(28..=29, rw)]
    chinfo: u2,
    #[bits(16..=27, rw)]
    ch1: u12,
    #[bits(13..=15, rw)]
    dram_type: u3,
    /// Channel count minus one.
    #[bit(12, rw)]
    num_channels: bool,
    #[bits(0..=11, rw)]
    ch0: u12,
}

impl SysReg {
    fn channel(&self, channel: usize) -> ChannelSysReg {
        let raw = match channel {
            0 => self.ch0(),
            _ => self.ch1(),
        };
        ChannelSysReg::new_with_raw_value(raw.value())
    }

    fn with_channel(self, channel: usize, value: ChannelSysReg, row_3_4: bool) -> Self {
        let raw = u12::new(value.raw_value() & 0xFFF);
        let chinfo = u2::new(self.chinfo().value() | (1 << channel));
        let this = self.with_chinfo(chinfo);
        match channel {
            0 => this.with_ch0(raw).with_row_3_4_ch0(row_3_4),
            _ => this.with_ch1(raw).with_row_3_4_ch1(row_3_4),
        }
    }

    fn row_3_4(&self, channel: usize) -> bool {
        match channel {
            0 => self.row_3_4_ch0(),
            _ => self.row_3_4_ch1(),
        }
    }

    #[inline]
    pub fn is_populated(&self, channel: usize) -> bool {
        self.chinfo().value() & (1 << channel) != 0
    }
}

/// Channel geometry as stored in the topology word.
///
/// `cs1_row` is only stored for dual rank channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub rank: u8,
    pub col: u8,
    pub bk: u8,
    pub cs0_row: u8,
    pub cs1_row: Option<u8>,
    pub bw: u8,
    pub dbw: u8,
    pub row_3_4: bool,
}

impl From<&ChannelGeometry> for ChannelInfo {
    fn from(geometry: &ChannelGeometry) -> Self {
        Self {
            rank: geometry.rank,
            col: geometry.col,
            bk: geometry.bk,
            cs0_row: geometry.cs0_row,
            cs1_row: (geometry.rank > 1).then_some(geometry.cs1_row),
            bw: geometry.bw,
            dbw: geometry.dbw,
            row_3_4: geometry.row_3_4,
        }
    }
}

const fn encode_bus_width(width: u8) -> u2 {
    u2::new((2 >> width) & 0b11)
}

impl ChannelInfo {
    fn encode(&self) -> ChannelSysReg {
        let row = |bits: u8| u2::new(bits.wrapping_sub(13) & 0b11);
        ChannelSysReg::new_with_raw_value(0)
            .with_rank(self.rank > 1)
            .with_col(u2::new(self.col.wrapping_sub(9) & 0b11))
            .with_bk(self.bk != 3)
            .with_cs0_row(row(self.cs0_row))
            .with_cs1_row(self.cs1_row.map_or(u2::new(0), row))
            .with_bw(encode_bus_width(self.bw))
            .with_dbw(encode_bus_width(self.dbw))
    }

    fn decode(value: ChannelSysReg, row_3_4: bool) -> Self {
        let rank = value.rank() as u8 + 1;
        Self {
            rank,
            col: value.col().value() + 9,
            bk: 3 - value.bk() as u8,
            cs0_row: value.cs0_row().value() + 13,
            cs1_row: (rank > 1).then(|| value.cs1_row().value() + 13),
            bw: 2 >> value.bw().value(),
            dbw: 2 >> value.dbw().value(),
            row_3_4,
        }
    }

    /// Capacity of both chip selects in MiB.
    pub fn rank_capacities_mb(&self) -> (u32, u32) {
        let bits = (self.cs0_row + self.col + self.bk + self.bw) as u32;
        let mut cs0 = 1u32 << bits.saturating_sub(20);
        let mut cs1 = match self.cs1_row {
            Some(cs1_row) => cs0 >> self.cs0_row.saturating_sub(cs1_row),
            None => 0,
        };
        if self.row_3_4 {
            cs0 = cs0 * 3 / 4;
            cs1 = cs1 * 3 / 4;
        }
        (cs0, cs1)
    }

    #[inline]
    pub fn capacity_mb(&self) -> u32 {
        let (cs0, cs1) = self.rank_capacities_mb();
        cs0 + cs1
    }
}

/// Decoded contents of the topology word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramTopology {
    pub dram_type: DramType,
    pub num_channels: u8,
    pub channels: [Option<ChannelInfo>; CHANNEL_COUNT],
}

impl DramTopology {
    /// Topology of the populated channels which take part in the bring-up.
    pub fn from_params(params: &SdramParams) -> Self {
        let mut channels = [None; CHANNEL_COUNT];
        for channel in params.active_channels() {
            channels[channel] = Some(ChannelInfo::from(&params.channels[channel]));
        }
        Self {
            dram_type: params.dram_type,
            num_channels: params.num_channels,
            channels,
        }
    }

    pub fn encode(&self) -> SysReg {
        let mut sys_reg = SysReg::new_with_raw_value(0)
            .with_dram_type(self.dram_type.sys_reg_code())
            .with_num_channels(self.num_channels > 1);
        for (channel, info) in self.channels.iter().enumerate() {
            if let Some(info) = info {
                sys_reg = sys_reg.with_channel(channel, info.encode(), info.row_3_4);
            }
        }
        sys_reg
    }

    pub fn decode(sys_reg: SysReg) -> Result<Self, ConfigError> {
        let mut channels = [None; CHANNEL_COUNT];
        for (channel, slot) in channels.iter_mut().enumerate() {
            if sys_reg.is_populated(channel) {
                *slot = Some(ChannelInfo::decode(
                    sys_reg.channel(channel),
                    sys_reg.row_3_4(channel),
                ));
            }
        }
        Ok(Self {
            dram_type: DramType::from_sys_reg_code(sys_reg.dram_type())?,
            num_channels: sys_reg.num_channels() as u8 + 1,
            channels,
        })
    }
}

/// Total usable capacity in MiB encoded in a topology word.
pub fn capacity_mb(sys_reg: SysReg) -> u32 {
    (0..CHANNEL_COUNT)
        .filter(|&channel| sys_reg.is_populated(channel))
        .map(|channel| {
            ChannelInfo::decode(sys_reg.channel(channel), sys_reg.row_3_4(channel)).capacity_mb()
        })
        .sum()
}

/// Derives the channel interleaving stride from the channel capacities.
///
/// Returns the default stride of the parameters if the capacity has no matching stride.
pub fn calculate_stride(params: &SdramParams) -> u5 {
    let mut capacities = [0u32; CHANNEL_COUNT];
    for (channel, capacity) in capacities.iter_mut().enumerate() {
        let geometry = &params.channels[channel];
        if geometry.is_populated() {
            *capacity = ChannelInfo::from(geometry).capacity_mb();
        }
    }

    if params.num_channels == 1 && params.channels[0].is_populated() {
        return SINGLE_CHANNEL_STRIDE;
    }
    if capacities[0] != capacities[1] {
        return params.default_stride;
    }
    let total = capacities[0] + capacities[1];
    match total {
        512 => u5::new(0),
        1024 => u5::new(0x5),
        1536 | 2048 => u5::new(0x9),
        3072 => u5::new(0x11),
        4096 => u5::new(0xD),
        _ => {
            log::warn!(
                "no stride for {} MiB capacity, using default {:#x}",
                total,
                params.default_stride.value()
            );
            params.default_stride
        }
    }
}

/// Programs the address decoding pattern and the rank sizes into the memory scheduler.
pub fn set_ddrconfig(msch: &mut MmioMsch<'_>, geometry: &ChannelGeometry) {
    let (cs0, cs1) = ChannelInfo::from(geometry).rank_capacities_mb();
    msch.write_ddrconf(
        DdrConf::new_with_raw_value(0)
            .with_ddrconf(geometry.ddrconfig)
            .with_ddrconf_hi(geometry.ddrconfig),
    );
    msch.write_ddrsize(
        DdrSize::new_with_raw_value(0)
            .with_cs0_size_32mb(((cs0 / 32) & 0xFF) as u8)
            .with_cs1_size_32mb(((cs1 / 32) & 0xFF) as u8),
    );
}

/// Publishes the topology: memory scheduler timings, topology word, interleaving stride and
/// the reset configuration for warm reboots.
pub fn dram_all_config(regs: &mut Peripherals, params: &SdramParams, stride: u5) {
    for channel in params.active_channels() {
        let geometry = &params.channels[channel];
        let timings = &geometry.msch_timings;
        let chan = &mut regs.channels[channel];
        chan.msch.write_ddr_timing_a0(timings.ddr_timing_a0);
        chan.msch.write_ddr_timing_b0(timings.ddr_timing_b0);
        chan.msch.write_ddr_timing_c0(timings.ddr_timing_c0);
        chan.msch.write_dev_to_dev0(timings.dev_to_dev0);
        chan.msch.write_ddr_mode(timings.ddr_mode);

        if geometry.rank == 1 {
            chan.ctl
                .modify::<CtlDfiClockControl>(|val| val.with_dfi_dram_clk_disable(true));
        }
    }

    let sys_reg = DramTopology::from_params(params).encode();
    log::debug!("DRAM topology word {:#010x}", sys_reg.raw_value());
    regs.pmugrf_os.write_os_reg2(sys_reg.raw_value());

    regs.pmusgrf_soc.write_soc_con4(clrsetbits_masked(
        SOC_CON4_DDR_STRIDE_MASK,
        (stride.value() as u16) << SOC_CON4_DDR_STRIDE_SHIFT,
    ));

    // Safety: PMUCRU has two reset hold registers.
    unsafe {
        regs.pmucru.write_rstnhold_con_unchecked(
            1,
            clrsetbits_masked(
                rstnhold::PRESET_SGRF | rstnhold::PRESET_GPIO0 | rstnhold::PRESET_GPIO1,
                rstnhold::PRESET_GPIO0 | rstnhold::PRESET_GPIO1,
            ),
        );
    }
    regs.cru
        .modify_glb_rst_con(|val| val.with_pmu_srst_ctrl(u2::new(0b11)));
}

/// Lazily decoded DRAM size.
///
/// The topology word is read on the first query only. The handle lives for the whole boot
/// stage and is never reset.
#[derive(Debug, Default)]
pub struct SdramTopology {
    size_mb: OnceCell<u32>,
}

impl SdramTopology {
    pub const fn new() -> Self {
        Self {
            size_mb: OnceCell::new(),
        }
    }

    /// Usable DRAM size in MiB, clamped to [MAX_SIZE_MB].
    pub fn size_mb(&self, pmugrf: &mut MmioPmuGrfOsRegs<'_>) -> u32 {
        *self.size_mb.get_or_init(|| {
            let sys_reg = SysReg::new_with_raw_value(pmugrf.read_os_reg2());
            capacity_mb(sys_reg).min(MAX_SIZE_MB)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddr::sim::{SimulatedSoc, test_params};

    fn geometry(rank: u8, cs0_row: u8, cs1_row: u8) -> ChannelGeometry {
        ChannelGeometry {
            rank,
            col: 10,
            bk: 3,
            cs0_row,
            cs1_row,
            bw: 2,
            dbw: 1,
            ..ChannelGeometry::ABSENT
        }
    }

    #[test]
    fn topology_word_round_trip() {
        let mut params = test_params(DramType::Lpddr4);
        params.channels[0] = ChannelGeometry {
            row_3_4: true,
            ..geometry(2, 16, 15)
        };
        params.channels[1] = ChannelGeometry {
            bk: 2,
            col: 9,
            bw: 1,
            dbw: 0,
            ..geometry(1, 14, 0)
        };
        let topology = DramTopology::from_params(&params);
        let decoded = DramTopology::decode(topology.encode()).unwrap();
        assert_eq!(decoded, topology);
        assert_eq!(
            decoded.channels[0],
            Some(ChannelInfo {
                rank: 2,
                col: 10,
                bk: 3,
                cs0_row: 16,
                cs1_row: Some(15),
                bw: 2,
                dbw: 1,
                row_3_4: true,
            })
        );
        assert_eq!(decoded.channels[1].unwrap().cs1_row, None);
    }

    #[test]
    fn topology_word_round_trip_all_geometries() {
        let mut params = test_params(DramType::Ddr3);
        for rank in 1..=2 {
            for col in 9..=12 {
                for bk in 2..=3 {
                    for cs0_row in 13..=16 {
                        for cs1_row in 13..=16 {
                            for bw in 0..=2 {
                                for dbw in 0..=2 {
                                    for row_3_4 in [false, true] {
                                        let geometry = ChannelGeometry {
                                            rank,
                                            col,
                                            bk,
                                            cs0_row,
                                            cs1_row,
                                            bw,
                                            dbw,
                                            row_3_4,
                                            ..ChannelGeometry::ABSENT
                                        };
                                        params.channels[0] = geometry;
                                        params.channels[1] = ChannelGeometry {
                                            row_3_4: !row_3_4,
                                            ..geometry
                                        };
                                        let topology = DramTopology::from_params(&params);
                                        assert_eq!(
                                            DramTopology::decode(topology.encode()).unwrap(),
                                            topology,
                                            "{:?}",
                                            geometry
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn topology_word_layout() {
        let mut params = test_params(DramType::Lpddr3);
        params.num_channels = 1;
        params.channels[0] = geometry(2, 15, 15);
        params.channels[1] = ChannelGeometry::ABSENT;
        let sys_reg = DramTopology::from_params(&params).encode();
        // Type 6, one channel, rank 2, col 10, 8 banks, rows 15, 32 bit bus, 16 bit device.
        let ch0 = 1 << 11 | 1 << 9 | 2 << 6 | 2 << 4 | 1;
        assert_eq!(sys_reg.raw_value(), 1 << 28 | 6 << 13 | ch0);
    }

    #[test]
    fn unknown_dram_type_is_rejected() {
        let sys_reg = SysReg::new_with_raw_value(5 << 13);
        assert_eq!(
            DramTopology::decode(sys_reg),
            Err(ConfigError::UnknownDramType(5))
        );
    }

    #[test]
    fn rank_capacities() {
        let info = ChannelInfo::from(&geometry(2, 15, 14));
        assert_eq!(info.rank_capacities_mb(), (1024, 512));
        let info = ChannelInfo::from(&ChannelGeometry {
            row_3_4: true,
            ..geometry(1, 16, 16)
        });
        assert_eq!(info.rank_capacities_mb(), (1536, 0));
    }

    #[test]
    fn stride_table() {
        let mut params = test_params(DramType::Lpddr4);
        params.num_channels = 2;
        params.default_stride = u5::new(0x1F);
        for (cs0_row, rank, stride) in [
            (13, 1, 0x0),
            (14, 1, 0x5),
            (15, 1, 0x9),
            (15, 2, 0xD),
        ] {
            params.channels = [geometry(rank, cs0_row, cs0_row); 2];
            assert_eq!(calculate_stride(&params), u5::new(stride));
        }
        // 768 MiB per channel.
        params.channels = [ChannelGeometry {
            row_3_4: true,
            ..geometry(1, 15, 15)
        }; 2];
        assert_eq!(calculate_stride(&params), u5::new(0x9));
        // 1536 MiB per channel.
        params.channels = [ChannelGeometry {
            row_3_4: true,
            ..geometry(1, 16, 16)
        }; 2];
        assert_eq!(calculate_stride(&params), u5::new(0x11));
    }

    #[test]
    fn stride_default() {
        let mut params = test_params(DramType::Lpddr4);
        params.num_channels = 2;
        params.default_stride = u5::new(0x1F);
        // Unequal capacities.
        params.channels = [geometry(1, 15, 15), geometry(1, 14, 14)];
        assert_eq!(calculate_stride(&params), u5::new(0x1F));
        // Equal capacities without table entry, 8 GiB total.
        params.channels = [geometry(2, 16, 16); 2];
        assert_eq!(calculate_stride(&params), u5::new(0x1F));
    }

    #[test]
    fn single_channel_stride() {
        let mut params = test_params(DramType::Lpddr3);
        params.num_channels = 1;
        params.channels[1] = ChannelGeometry::ABSENT;
        assert_eq!(calculate_stride(&params), SINGLE_CHANNEL_STRIDE);
    }

    #[test]
    fn ddrconfig() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let geometry = ChannelGeometry {
            ddrconfig: 3,
            ..geometry(2, 15, 14)
        };
        set_ddrconfig(&mut regs.channels[0].msch, &geometry);
        assert_eq!(soc.channels[0].msch.read(2), 0x0303);
        assert_eq!(soc.channels[0].msch.read(3), (512 / 32) << 8 | 1024 / 32);
    }

    #[test]
    fn all_config_single_channel() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let mut params = test_params(DramType::Lpddr3);
        params.num_channels = 1;
        params.channels[0] = geometry(1, 15, 15);
        params.channels[0].msch_timings.ddr_timing_a0 =
            rk3399::msch::regs::DdrTimingA0::new_with_raw_value(0x1234);
        params.channels[1] = ChannelGeometry::ABSENT;
        dram_all_config(&mut regs, &params, u5::new(0x17));

        let sys_reg = SysReg::new_with_raw_value(soc.pmugrf_os.read(2));
        assert!(sys_reg.is_populated(0));
        assert!(!sys_reg.is_populated(1));
        assert_eq!(sys_reg.ch1().value(), 0);
        assert_eq!(soc.channels[0].msch.read(4), 0x1234);
        assert_eq!(soc.channels[0].ctl(276), 1 << 17);
        assert_eq!(soc.channels[1].ctl(276), 0);
        assert!(soc.channels[1].is_untouched());
        assert_eq!(soc.pmusgrf_soc.read(0), 0x7C00_0000 | 0x17 << 10);
        assert_eq!(soc.pmucru.read(0x48 + 1), 0x01C0_0180);
        assert_eq!(soc.cru.read(0x140 + 4) & 0b11, 0b11);
    }

    #[test]
    fn all_config_skips_unpopulated_channel_slot() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let mut params = test_params(DramType::Lpddr4);
        params.num_channels = 1;
        params.channels[0] = ChannelGeometry::ABSENT;
        params.channels[1] = geometry(2, 15, 15);
        dram_all_config(&mut regs, &params, u5::new(0));
        let sys_reg = SysReg::new_with_raw_value(soc.pmugrf_os.read(2));
        assert_eq!(sys_reg.chinfo().value(), 0b10);
        assert_eq!(capacity_mb(sys_reg), 2048);
        assert_eq!(soc.channels[1].ctl(276), 0);
    }

    #[test]
    fn size_is_cached() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let mut params = test_params(DramType::Lpddr4);
        params.channels = [geometry(1, 15, 15); 2];
        soc.pmugrf_os
            .write(2, DramTopology::from_params(&params).encode().raw_value());

        let topology = SdramTopology::new();
        assert_eq!(topology.size_mb(&mut regs.pmugrf_os), 2048);
        soc.pmugrf_os.write(2, 0);
        assert_eq!(topology.size_mb(&mut regs.pmugrf_os), 2048);
        assert_eq!(SdramTopology::new().size_mb(&mut regs.pmugrf_os), 0);
    }

    #[test]
    fn size_is_clamped() {
        let soc = SimulatedSoc::new();
        let mut regs = soc.peripherals();
        let mut params = test_params(DramType::Lpddr4);
        params.channels = [geometry(2, 16, 16); 2];
        soc.pmugrf_os
            .write(2, DramTopology::from_params(&params).encode().raw_value());
        assert_eq!(capacity_mb(SysReg::new_with_raw_value(soc.pmugrf_os.read(2))), 8192);
        assert_eq!(SdramTopology::new().size_mb(&mut regs.pmugrf_os), MAX_SIZE_MB);
        assert_eq!(MAX_SIZE_MB, 3968);
    }
}
