//! DRAM related parts of the general register files (GRF, PMUGRF and PMUSGRF).
//!
//! Only the sub-blocks used by the DRAM driver are mapped. The registers are write-masked,
//! see [crate::clrsetbits_masked].
pub const GRF_BASE_ADDR: usize = 0xFF77_0000;
pub const PMUGRF_BASE_ADDR: usize = 0xFF32_0000;
pub const PMUSGRF_BASE_ADDR: usize = 0xFF33_0000;

pub const GRF_DDRC_OFFSET: usize = 0xE380;
pub const PMUGRF_OS_REG_OFFSET: usize = 0x300;
pub const PMUSGRF_SOC_CON4_OFFSET: usize = 0xE010;

/// Bit of `ddrcX_con0` which lets the controller start the DFI initialization.
pub const DDRC_CON0_DFI_INIT_START: u16 = 1 << 8;

/// Channel interleaving stride field of PMUSGRF `soc_con4`.
pub const SOC_CON4_DDR_STRIDE_SHIFT: u32 = 10;
pub const SOC_CON4_DDR_STRIDE_MASK: u16 = 0x1F << SOC_CON4_DDR_STRIDE_SHIFT;

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct GrfDdrc {
    ddrc0_con0: u32,
    ddrc0_con1: u32,
    ddrc1_con0: u32,
    ddrc1_con1: u32,
}

impl GrfDdrc {
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioGrfDdrc<'static> {
        unsafe { Self::new_mmio_at(GRF_BASE_ADDR + GRF_DDRC_OFFSET) }
    }
}

impl MmioGrfDdrc<'_> {
    /// Writes `con0` of the given DDR channel.
    #[inline]
    pub fn write_con0(&mut self, channel: usize, value: u32) {
        match channel {
            0 => self.write_ddrc0_con0(value),
            _ => self.write_ddrc1_con0(value),
        }
    }
}

/// OS registers of the PMU GRF. They survive a warm reset and are used to hand data to the
/// next boot stage.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct PmuGrfOsRegs {
    os_reg0: u32,
    os_reg1: u32,
    /// Persistent DRAM topology word.
    os_reg2: u32,
    os_reg3: u32,
}

impl PmuGrfOsRegs {
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioPmuGrfOsRegs<'static> {
        unsafe { Self::new_mmio_at(PMUGRF_BASE_ADDR + PMUGRF_OS_REG_OFFSET) }
    }
}

#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct PmuSgrfSocCon4 {
    soc_con4: u32,
}

impl PmuSgrfSocCon4 {
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new_mmio_fixed() -> MmioPmuSgrfSocCon4<'static> {
        unsafe { Self::new_mmio_at(PMUSGRF_BASE_ADDR + PMUSGRF_SOC_CON4_OFFSET) }
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<GrfDdrc>(), 0x10);
static_assertions::const_assert_eq!(core::mem::size_of::<PmuGrfOsRegs>(), 0x10);
