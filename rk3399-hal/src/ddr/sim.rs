//! Simulated register blocks for the DRAM driver tests.
//!
//! Every block is backed by a leaked word buffer which the MMIO handles are mapped onto. The
//! buffers behave like plain memory, status bits which the driver polls must be preset.
extern crate std;

use std::{boxed::Box, vec};

use arbitrary_int::u5;
use embedded_hal::delay::DelayNs;
use rk3399::{
    ChannelPeripherals, Peripherals, cic, cru,
    ddrc::{self, CTL_REG_COUNT, PHY_REG_COUNT, PI_REG_COUNT},
    grf, msch,
};

use super::{
    Board,
    params::{ChannelGeometry, DramType, MschTimings, SdramParams},
};
use crate::time::{Hertz, Instant, Monotonic};

const MSCH_REG_COUNT: usize = core::mem::size_of::<msch::Msch>() / 4;
const CIC_REG_COUNT: usize = core::mem::size_of::<cic::Cic>() / 4;
const CRU_REG_COUNT: usize = core::mem::size_of::<cru::Cru>() / 4;
const PMUCRU_REG_COUNT: usize = core::mem::size_of::<cru::PmuCru>() / 4;

/// Word buffer standing in for a register block.
pub struct Buffer {
    ptr: *mut u32,
    len: usize,
}

impl Buffer {
    pub fn new(len: usize) -> Self {
        let words: &'static mut [u32] = Box::leak(vec![0u32; len].into_boxed_slice());
        Self {
            ptr: words.as_mut_ptr(),
            len,
        }
    }

    pub fn addr(&self) -> usize {
        self.ptr as usize
    }

    pub fn read(&self, index: usize) -> u32 {
        assert!(index < self.len);
        // Safety: Index is in range of the leaked buffer.
        unsafe { self.ptr.add(index).read_volatile() }
    }

    pub fn write(&self, index: usize, value: u32) {
        assert!(index < self.len);
        // Safety: Index is in range of the leaked buffer.
        unsafe { self.ptr.add(index).write_volatile(value) }
    }

    pub fn is_zeroed(&self) -> bool {
        (0..self.len).all(|index| self.read(index) == 0)
    }
}

pub struct SimulatedChannel {
    pub ctl: Buffer,
    pub pi: Buffer,
    pub phy: Buffer,
    pub msch: Buffer,
}

impl SimulatedChannel {
    pub fn new() -> Self {
        Self {
            ctl: Buffer::new(CTL_REG_COUNT),
            pi: Buffer::new(PI_REG_COUNT),
            phy: Buffer::new(PHY_REG_COUNT),
            msch: Buffer::new(MSCH_REG_COUNT),
        }
    }

    pub fn peripherals(&self) -> ChannelPeripherals {
        // Safety: The buffers are leaked and large enough for the register blocks.
        unsafe {
            ChannelPeripherals {
                ctl: ddrc::DenaliCtl::new_mmio_at(self.ctl.addr()),
                pi: ddrc::DenaliPi::new_mmio_at(self.pi.addr()),
                phy: ddrc::DenaliPhy::new_mmio_at(self.phy.addr()),
                msch: msch::Msch::new_mmio_at(self.msch.addr()),
            }
        }
    }

    pub fn ctl(&self, index: usize) -> u32 {
        self.ctl.read(index)
    }

    pub fn pi(&self, index: usize) -> u32 {
        self.pi.read(index)
    }

    pub fn phy(&self, index: usize) -> u32 {
        self.phy.read(index)
    }

    /// Sets the PHY initialization done bits.
    pub fn preset_phy_init_done(&self) {
        self.phy.write(920, 1 << 16);
        self.phy.write(921, 1 << 16 | 1);
        self.phy.write(922, 1);
    }

    pub fn is_untouched(&self) -> bool {
        self.ctl.is_zeroed() && self.pi.is_zeroed() && self.phy.is_zeroed() && self.msch.is_zeroed()
    }
}

pub struct SimulatedSoc {
    pub channels: [SimulatedChannel; 2],
    pub cic: Buffer,
    pub grf_ddrc: Buffer,
    pub pmugrf_os: Buffer,
    pub pmusgrf_soc: Buffer,
    pub cru: Buffer,
    pub pmucru: Buffer,
}

impl SimulatedSoc {
    pub fn new() -> Self {
        Self {
            channels: [SimulatedChannel::new(), SimulatedChannel::new()],
            cic: Buffer::new(CIC_REG_COUNT),
            grf_ddrc: Buffer::new(4),
            pmugrf_os: Buffer::new(4),
            pmusgrf_soc: Buffer::new(1),
            cru: Buffer::new(CRU_REG_COUNT),
            pmucru: Buffer::new(PMUCRU_REG_COUNT),
        }
    }

    /// Presets the status bits polled during a complete initialization.
    pub fn preset_status(&self) {
        for channel in &self.channels {
            channel.preset_phy_init_done();
        }
        // Frequency change acknowledged and done.
        self.cic.write(4, 1 << 2 | 1);
    }

    pub fn peripherals(&self) -> Peripherals {
        // Safety: The buffers are leaked and large enough for the register blocks.
        unsafe {
            Peripherals {
                channels: [self.channels[0].peripherals(), self.channels[1].peripherals()],
                cic: cic::Cic::new_mmio_at(self.cic.addr()),
                grf_ddrc: grf::GrfDdrc::new_mmio_at(self.grf_ddrc.addr()),
                pmugrf_os: grf::PmuGrfOsRegs::new_mmio_at(self.pmugrf_os.addr()),
                pmusgrf_soc: grf::PmuSgrfSocCon4::new_mmio_at(self.pmusgrf_soc.addr()),
                cru: cru::Cru::new_mmio_at(self.cru.addr()),
                pmucru: cru::PmuCru::new_mmio_at(self.pmucru.addr()),
            }
        }
    }

    pub fn is_untouched(&self) -> bool {
        self.channels.iter().all(SimulatedChannel::is_untouched)
            && [
                &self.cic,
                &self.grf_ddrc,
                &self.pmugrf_os,
                &self.pmusgrf_soc,
                &self.cru,
                &self.pmucru,
            ]
            .iter()
            .all(|buffer| buffer.is_zeroed())
    }
}

/// Board whose clock advances by one microsecond per read and whose reset panics.
#[derive(Default)]
pub struct MockBoard {
    delayed_ns: u64,
    ticks: u64,
    pub ddr_clock: Option<Hertz>,
}

impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delayed_us(&self) -> u64 {
        self.delayed_ns / 1000
    }
}

impl DelayNs for MockBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.delayed_ns += ns as u64;
    }
}

impl Monotonic for MockBoard {
    fn now(&mut self) -> Instant {
        self.ticks += 1;
        Instant::from_ticks(self.ticks)
    }
}

impl Board for MockBoard {
    fn configure_ddr_clock(&mut self, frequency: Hertz) {
        self.ddr_clock = Some(frequency);
    }

    fn reset(&mut self) -> ! {
        panic!("board reset");
    }
}

/// Dual channel, dual rank configuration with 1 GiB per rank.
///
/// The register images preset the controller init done and all PI training done bits.
pub fn test_params(dram_type: DramType) -> SdramParams {
    let geometry = ChannelGeometry {
        rank: 2,
        col: 10,
        bk: 3,
        cs0_row: 15,
        cs1_row: 15,
        bw: 2,
        dbw: 1,
        row_3_4: false,
        ddrconfig: 2,
        msch_timings: MschTimings::ZERO,
    };
    let mut params = SdramParams {
        dram_type,
        frequency: Hertz::MHz(800),
        odt: true,
        num_channels: 2,
        default_stride: u5::new(0x1F),
        channels: [geometry; 2],
        ctl_regs: [0; CTL_REG_COUNT],
        pi_regs: [0; PI_REG_COUNT],
        phy_regs: [0; PHY_REG_COUNT],
    };
    params.ctl_regs[203] = 1 << 3;
    params.pi_regs[174] = 0b11_1111 << 16;
    params
}
