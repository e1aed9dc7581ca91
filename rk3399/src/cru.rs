//! Reset related registers of the clock and reset units (CRU and PMUCRU).
//!
//! The clock configuration itself is not part of this crate.
use arbitrary_int::u2;

pub const CRU_BASE_ADDR: usize = 0xFF76_0000;
pub const PMUCRU_BASE_ADDR: usize = 0xFF75_0000;

/// Index of the soft reset register holding the DDR controller and PHY resets.
pub const SOFTRST_CON_DDR: usize = 4;

/// Value for `softrst_con[4]` which asserts (`true`) or releases the controller and PHY
/// resets of one DDR channel. Only the bits of that channel are write-enabled.
#[inline]
pub const fn ddr_soft_reset(channel: usize, ctrl: bool, phy: bool) -> u32 {
    let ctrl_bit = 8 + channel * 4;
    let phy_bit = 9 + channel * 4;
    (1 << (ctrl_bit + 16))
        | ((ctrl as u32) << ctrl_bit)
        | (1 << (phy_bit + 16))
        | ((phy as u32) << phy_bit)
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct GlobalResetControl {
    /// Reset the PMU and the DDR related blocks on a first or second global soft reset.
    #[bits(0..=1, rw)]
    pmu_srst_ctrl: u2,
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Cru {
    _reserved0: [u32; 0x100],
    softrst_con: [u32; 21],
    _reserved1: [u32; 0x2b],
    glb_srst_fst_value: u32,
    glb_srst_snd_value: u32,
    glb_cnt_th: u32,
    misc_con: u32,
    glb_rst_con: GlobalResetControl,
    #[mmio(PureRead)]
    glb_rst_st: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Cru>(), 0x518);

impl Cru {
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioCru<'static> {
        unsafe { Self::new_mmio_at(CRU_BASE_ADDR) }
    }
}

/// Reset hold bits of PMUCRU `rstnhold_con[1]`, written with a write-enable mask.
pub mod rstnhold {
    pub const PRESET_SGRF: u16 = 1 << 6;
    pub const PRESET_GPIO0: u16 = 1 << 7;
    pub const PRESET_GPIO1: u16 = 1 << 8;
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct PmuCru {
    _reserved0: [u32; 0x48],
    rstnhold_con: [u32; 2],
}

static_assertions::const_assert_eq!(core::mem::size_of::<PmuCru>(), 0x128);

impl PmuCru {
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioPmuCru<'static> {
        unsafe { Self::new_mmio_at(PMUCRU_BASE_ADDR) }
    }
}
