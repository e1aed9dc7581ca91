//! # Rockchip RK3399 DRAM subsystem PAC
//!
//! Register definitions for the blocks touched during DRAM bring-up: the Denali DDR
//! controller (CTL), its protocol interface (PI) and PHY, the memory scheduler (MSCH), the
//! DDR clock-and-interface controller (CIC) and the parts of the GRF and CRU blocks which
//! hold DRAM related bits.
#![no_std]

use core::sync::atomic::{AtomicBool, Ordering};

pub mod cic;
pub mod cru;
pub mod ddrc;
pub mod grf;
pub mod msch;

/// Number of DDR channels on the RK3399.
pub const CHANNEL_COUNT: usize = 2;

static PERIPHERALS_TAKEN: AtomicBool = AtomicBool::new(false);

/// Builds a Rockchip write-masked register value.
///
/// Many Rockchip registers use the upper 16 bits as a write-enable mask for the lower 16 bits.
/// Only bits which are set in `clear` or `set` are modified by the hardware.
#[inline]
pub const fn clrsetbits_masked(clear: u16, set: u16) -> u32 {
    (((clear | set) as u32) << 16) | set as u32
}

/// MMIO handles for all DRAM related register blocks of one channel.
pub struct ChannelPeripherals {
    pub ctl: ddrc::MmioDenaliCtl<'static>,
    pub pi: ddrc::MmioDenaliPi<'static>,
    pub phy: ddrc::MmioDenaliPhy<'static>,
    pub msch: msch::MmioMsch<'static>,
}

impl ChannelPeripherals {
    /// # Safety
    ///
    /// Creates handles to the fixed register addresses of the channel. The caller must ensure
    /// that no other handles to the same registers are used concurrently.
    pub const unsafe fn steal(channel: usize) -> Self {
        unsafe {
            Self {
                ctl: ddrc::DenaliCtl::new_mmio_fixed(channel),
                pi: ddrc::DenaliPi::new_mmio_fixed(channel),
                phy: ddrc::DenaliPhy::new_mmio_fixed(channel),
                msch: msch::Msch::new_mmio_fixed(channel),
            }
        }
    }
}

/// All register blocks required for DRAM initialization.
pub struct Peripherals {
    pub channels: [ChannelPeripherals; CHANNEL_COUNT],
    pub cic: cic::MmioCic<'static>,
    pub grf_ddrc: grf::MmioGrfDdrc<'static>,
    pub pmugrf_os: grf::MmioPmuGrfOsRegs<'static>,
    pub pmusgrf_soc: grf::MmioPmuSgrfSocCon4<'static>,
    pub cru: cru::MmioCru<'static>,
    pub pmucru: cru::MmioPmuCru<'static>,
}

impl Peripherals {
    /// Returns the peripheral singleton once. Subsequent calls return [None].
    pub fn take() -> Option<Self> {
        if PERIPHERALS_TAKEN.swap(true, Ordering::Relaxed) {
            return None;
        }
        // Safety: The singleton was not taken yet.
        Some(unsafe { Self::steal() })
    }

    /// Unconditionally creates the peripheral singleton.
    ///
    /// # Safety
    ///
    /// This allows creating multiple handles to the same registers. The caller must ensure
    /// that they are not used concurrently.
    pub unsafe fn steal() -> Self {
        unsafe {
            Self {
                channels: [ChannelPeripherals::steal(0), ChannelPeripherals::steal(1)],
                cic: cic::Cic::new_mmio_fixed(),
                grf_ddrc: grf::GrfDdrc::new_mmio_fixed(),
                pmugrf_os: grf::PmuGrfOsRegs::new_mmio_fixed(),
                pmusgrf_soc: grf::PmuSgrfSocCon4::new_mmio_fixed(),
                cru: cru::Cru::new_mmio_fixed(),
                pmucru: cru::PmuCru::new_mmio_fixed(),
            }
        }
    }
}
