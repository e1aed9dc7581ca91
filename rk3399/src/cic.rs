//! DDR clock-and-interface controller (CIC). Handles the handshake for switching between
//! the PHY frequency sets.
pub const CIC_BASE_ADDR: usize = 0xFF62_0000;

/// Frequency set index field of `ctrl0`, bits 4 and 5.
pub const CTRL0_FREQ_INDEX_SHIFT: u32 = 4;
pub const CTRL0_FREQ_INDEX_MASK: u16 = 0b11 << CTRL0_FREQ_INDEX_SHIFT;
pub const CTRL0_FREQ_CHANGE_EN: u16 = 1 << 2;
pub const CTRL0_FREQ_CHANGE_DONE: u16 = 1 << 1;
pub const CTRL0_FREQ_CHANGE_REQ: u16 = 1 << 0;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Status0 {
    #[bit(2, r)]
    freq_change_ack: bool,
    #[bit(0, r)]
    freq_change_done: bool,
}

/// All registers are write-masked: the upper half selects which bits of the lower half are
/// written. See [crate::clrsetbits_masked].
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Cic {
    ctrl0: u32,
    ctrl1: u32,
    idle_th: u32,
    cg_wait_th: u32,
    #[mmio(PureRead)]
    status0: Status0,
    #[mmio(PureRead)]
    status1: u32,
    ctrl2: u32,
    ctrl3: u32,
    ctrl4: u32,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Cic>(), 0x24);

impl Cic {
    /// Create a new CIC MMIO instance at the fixed base address.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioCic<'static> {
        unsafe { Self::new_mmio_at(CIC_BASE_ADDR) }
    }
}
