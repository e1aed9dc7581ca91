//! Memory scheduler (MSCH) of the NoC. One instance per DDR channel.
pub const MSCH0_BASE_ADDR: usize = 0xFFA8_4000;
pub const MSCH1_BASE_ADDR: usize = 0xFFA8_C000;

pub mod regs {
    use arbitrary_int::{u2, u3, u4, u5, u6};

    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DdrTimingA0 {
        #[bits(24..=31, rw)]
        read_latency: u8,
        #[bits(16..=21, rw)]
        wr_to_miss: u6,
        #[bits(8..=13, rw)]
        rd_to_miss: u6,
        #[bits(0..=5, rw)]
        act_to_act: u6,
    }

    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DdrTimingB0 {
        #[bits(24..=29, rw)]
        faw: u6,
        #[bits(16..=19, rw)]
        rrd: u4,
        #[bits(8..=12, rw)]
        wr_to_rd: u5,
        #[bits(0..=4, rw)]
        rd_to_wr: u5,
    }

    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DdrTimingC0 {
        #[bits(8..=13, rw)]
        wr_to_mwr: u6,
        #[bits(0..=3, rw)]
        burst_penalty: u4,
    }

    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DevToDev0 {
        #[bits(8..=10, rw)]
        bus_wr_to_rd: u3,
        #[bits(4..=6, rw)]
        bus_rd_to_wr: u3,
        #[bits(0..=2, rw)]
        bus_rd_to_rd: u3,
    }

    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DdrMode {
        #[bits(16..=23, rw)]
        force_order_state: u8,
        #[bits(8..=15, rw)]
        force_order: u8,
        #[bits(5..=6, rw)]
        mwr_size: u2,
        #[bits(3..=4, rw)]
        burst_size: u2,
        #[bit(2, rw)]
        faw_bank: bool,
        #[bit(1, rw)]
        bypass_filtering: bool,
        #[bit(0, rw)]
        auto_precharge: bool,
    }

    /// Address decoding pattern. The same selector is programmed for both halves.
    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DdrConf {
        #[bits(8..=15, rw)]
        ddrconf_hi: u8,
        #[bits(0..=7, rw)]
        ddrconf: u8,
    }

    /// Rank sizes in units of 32 MiB.
    #[bitbybit::bitfield(u32, default = 0x0, debug)]
    pub struct DdrSize {
        #[bits(8..=15, rw)]
        cs1_size_32mb: u8,
        #[bits(0..=7, rw)]
        cs0_size_32mb: u8,
    }
}

use regs::*;

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Msch {
    #[mmio(PureRead)]
    core_id: u32,
    #[mmio(PureRead)]
    revision_id: u32,
    ddrconf: DdrConf,
    ddrsize: DdrSize,
    ddr_timing_a0: DdrTimingA0,
    ddr_timing_b0: DdrTimingB0,
    ddr_timing_c0: DdrTimingC0,
    dev_to_dev0: DevToDev0,
    _reserved0: [u32; 0x3C],
    ddr_mode: DdrMode,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Msch>(), 0x114);

impl Msch {
    /// Create a new MSCH MMIO instance for the given DDR channel.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed(channel: usize) -> MmioMsch<'static> {
        let addr = match channel {
            0 => MSCH0_BASE_ADDR,
            _ => MSCH1_BASE_ADDR,
        };
        unsafe { Self::new_mmio_at(addr) }
    }
}
