//! # Data training
//!
//! The PI runs the training state machines, software only requests a phase per rank and
//! polls the interrupt status. Each phase is requested the same way:
//!
//!  1. Acknowledge all pending training interrupts.
//!  2. Select the per chip select training index of the PHY, if enabled.
//!  3. Enable the phase and request it for one rank with a single register write.
//!  4. Poll the interrupt status and the observation registers of the phase until the phase
//!     is done or reports an error.
//!
//! After the last rank the phase enable is cleared again.
use core::task::Poll;

use arbitrary_int::{u2, u3};
use rk3399::{
    ChannelPeripherals,
    ddrc::{
        PHY_ADDR_SLICES, PHY_DATA_SLICES,
        ctl::CtlUpdateRequest,
        phy::{
            PhyAdrCalvlObs, PhyDqTselSelect, PhyDqsTselWrTiming, PhyFreqSel, PhyGtlvlStatusObs,
            PhyPadDqsDrive, PhyPerCsTraining, PhyWrlvlDelay, PhyWrlvlStatusObs,
        },
        pi::{
            PiCaTrainingEnable, PiCaTrainingRequest, PiInterruptAck, PiInterruptStatus,
            PiReadLevelingEnable, PiReadLevelingRequest, PiWdqLevelingEnable,
            PiWdqLevelingRequest, PiWdqLevelingVref, PiWriteLevelingEnable,
            PiWriteLevelingRequest, TRAINING_SUPPORT_ENABLE,
        },
    },
};

use super::params::DramType;
use crate::poll::poll_forever;

/// Highest number of chip selects a training phase can address.
pub const MAX_RANKS_PER_CHANNEL: u8 = 4;

/// Write leveling delay forced into all data slices after write leveling.
pub const WRLVL_OVERRIDE_DELAY: u16 = 0x200;

bitflags::bitflags! {
    /// Selection of training phases.
    #[derive(Debug, Eq, PartialEq, Clone, Copy)]
    pub struct TrainingFlags: u8 {
        /// Command/address training.
        const CA = 1 << 0;
        const WRITE_LEVELING = 1 << 1;
        const READ_GATE = 1 << 2;
        const READ_LEVELING = 1 << 3;
        /// Write DQ leveling.
        const WDQ_LEVELING = 1 << 4;
        /// All phases supported by the DRAM type, see [TrainingFlags::expand].
        const FULL = 1 << 7;
    }
}

impl TrainingFlags {
    /// Phases making up a full training for a DRAM type.
    pub const fn full_training(dram_type: DramType) -> Self {
        match dram_type {
            DramType::Lpddr4 => Self::CA
                .union(Self::WRITE_LEVELING)
                .union(Self::READ_GATE)
                .union(Self::READ_LEVELING)
                .union(Self::WDQ_LEVELING),
            DramType::Lpddr3 => Self::CA
                .union(Self::WRITE_LEVELING)
                .union(Self::READ_GATE),
            DramType::Ddr3 => Self::WRITE_LEVELING
                .union(Self::READ_GATE)
                .union(Self::READ_LEVELING),
        }
    }

    /// Replaces the [TrainingFlags::FULL] selection with the phases of the DRAM type.
    pub const fn expand(self, dram_type: DramType) -> Self {
        if self.contains(Self::FULL) {
            Self::full_training(dram_type)
        } else {
            self
        }
    }
}

/// Chip selects to train for phases which train per (pseudo) chip select.
///
/// LPDDR4 devices have two channels per die, so each rank consists of two chip selects.
pub const fn rank_mask(dram_type: DramType, rank: u8) -> u8 {
    match (dram_type, rank) {
        (DramType::Lpddr4, 1) => 0b0101,
        (DramType::Lpddr4, _) => 0b1111,
        (_, 1) => 0b01,
        _ => 0b11,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ca,
    WriteLeveling,
    ReadGate,
    ReadLeveling,
    WdqLeveling,
}

impl Phase {
    /// Execution order of the phases.
    pub const ALL: [Phase; 5] = [
        Phase::Ca,
        Phase::WriteLeveling,
        Phase::ReadGate,
        Phase::ReadLeveling,
        Phase::WdqLeveling,
    ];

    pub const fn flag(self) -> TrainingFlags {
        match self {
            Phase::Ca => TrainingFlags::CA,
            Phase::WriteLeveling => TrainingFlags::WRITE_LEVELING,
            Phase::ReadGate => TrainingFlags::READ_GATE,
            Phase::ReadLeveling => TrainingFlags::READ_LEVELING,
            Phase::WdqLeveling => TrainingFlags::WDQ_LEVELING,
        }
    }

    /// Chip selects which are trained. CA training and write DQ leveling use the rank mask,
    /// the other phases only train the plain rank count.
    pub const fn chip_selects(self, dram_type: DramType, rank: u8) -> u8 {
        match self {
            Phase::Ca | Phase::WdqLeveling => rank_mask(dram_type, rank),
            _ => (1 << rank) - 1,
        }
    }

    fn set_enable(self, regs: &mut ChannelPeripherals, enable: bool) {
        let value = if enable {
            TRAINING_SUPPORT_ENABLE
        } else {
            u2::new(0)
        };
        match self {
            Phase::Ca => regs
                .pi
                .modify::<PiCaTrainingEnable>(|val| val.with_enable(value)),
            Phase::WriteLeveling => regs
                .pi
                .modify::<PiWriteLevelingEnable>(|val| val.with_enable(value)),
            Phase::ReadGate => regs
                .pi
                .modify::<PiReadLevelingEnable>(|val| val.with_gate_enable(value)),
            Phase::ReadLeveling => regs
                .pi
                .modify::<PiReadLevelingEnable>(|val| val.with_rdlvl_enable(value)),
            Phase::WdqLeveling => regs
                .pi
                .modify::<PiWdqLevelingEnable>(|val| val.with_enable(value)),
        }
    }

    /// Requests the phase for one chip select. Request and target are set with one write.
    fn request(self, regs: &mut ChannelPeripherals, cs: u8) {
        let cs = u2::new(cs);
        match self {
            Phase::Ca => regs
                .pi
                .modify::<PiCaTrainingRequest>(|val| val.with_req(true).with_cs(cs)),
            Phase::WriteLeveling => regs
                .pi
                .modify::<PiWriteLevelingRequest>(|val| val.with_req(true).with_cs(cs)),
            Phase::ReadGate => regs
                .pi
                .modify::<PiReadLevelingRequest>(|val| val.with_gate_req(true).with_cs(cs)),
            Phase::ReadLeveling => regs
                .pi
                .modify::<PiReadLevelingRequest>(|val| val.with_rdlvl_req(true).with_cs(cs)),
            Phase::WdqLeveling => regs
                .pi
                .modify::<PiWdqLevelingRequest>(|val| val.with_req(true).with_cs(cs)),
        }
    }

    fn done(self, status: PiInterruptStatus) -> bool {
        let phase_done = match self {
            Phase::Ca => status.calvl_done(),
            Phase::WriteLeveling => status.wrlvl_done(),
            Phase::ReadGate => status.gate_done(),
            Phase::ReadLeveling => status.rdlvl_done(),
            Phase::WdqLeveling => status.wdqlvl_done(),
        };
        phase_done && status.done()
    }

    fn error(self, status: PiInterruptStatus) -> bool {
        match self {
            Phase::Ca => status.calvl_error(),
            Phase::WriteLeveling => status.wrlvl_error(),
            Phase::ReadGate => status.gate_error(),
            Phase::ReadLeveling => status.rdlvl_error(),
            Phase::WdqLeveling => status.wdqlvl_error(),
        }
    }

    /// Checks the PHY observation registers of the phase for an error.
    ///
    /// Read leveling and write DQ leveling have no observation check.
    fn observation_error(self, regs: &mut ChannelPeripherals) -> bool {
        match self {
            Phase::Ca => (0..PHY_ADDR_SLICES)
                .any(|slice| regs.phy.read_slice::<PhyAdrCalvlObs>(slice).error().value() != 0),
            Phase::WriteLeveling => (0..PHY_DATA_SLICES)
                .any(|slice| regs.phy.read_slice::<PhyWrlvlStatusObs>(slice).error()),
            Phase::ReadGate => (0..PHY_DATA_SLICES)
                .any(|slice| regs.phy.read_slice::<PhyGtlvlStatusObs>(slice).error().value() != 0),
            Phase::ReadLeveling | Phase::WdqLeveling => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingFault {
    /// The PI reported a training error.
    Status,
    /// A PHY observation register reported an error.
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{phase:?} training failed for chip select {cs}: {fault:?}")]
pub struct TrainingError {
    pub phase: Phase,
    pub cs: u8,
    pub fault: TrainingFault,
}

fn ack_interrupts(regs: &mut ChannelPeripherals) {
    regs.pi.write(PiInterruptAck::ALL);
}

/// Selects the chip select which the PHY stores the training results for.
fn select_per_cs_training_index(regs: &mut ChannelPeripherals, cs: u8) {
    if regs
        .phy
        .read_slice::<PhyDqsTselWrTiming>(0)
        .per_cs_training_en()
    {
        regs.phy
            .modify_all_slices::<PhyPerCsTraining>(|val| val.with_index(cs & 1 != 0));
    }
}

/// Forces a fixed write leveling delay into all data slices and lets the controller pick up
/// the new value.
fn override_write_leveling_value(regs: &mut ChannelPeripherals) {
    regs.phy
        .modify::<PhyFreqSel>(|val| val.with_multicast_en(true));
    regs.phy
        .modify_all_slices::<PhyPerCsTraining>(|val| val.with_multicast_en(true));
    regs.phy
        .modify_all_slices::<PhyWrlvlDelay>(|val| val.with_delay(WRLVL_OVERRIDE_DELAY));
    regs.phy
        .modify::<PhyFreqSel>(|val| val.with_multicast_en(false));
    regs.ctl
        .modify::<CtlUpdateRequest>(|val| val.with_ctrlupd_req(true));
}

/// Runs one training phase for all chip selects of the channel.
pub fn train_phase(
    regs: &mut ChannelPeripherals,
    phase: Phase,
    dram_type: DramType,
    rank: u8,
) -> Result<(), TrainingError> {
    let chip_selects = phase.chip_selects(dram_type, rank);
    ack_interrupts(regs);
    for cs in (0..MAX_RANKS_PER_CHANNEL).filter(|cs| chip_selects & (1 << cs) != 0) {
        select_per_cs_training_index(regs, cs);
        if phase == Phase::WdqLeveling {
            regs.pi
                .modify::<PiWdqLevelingVref>(|val| val.with_vref_en(false));
        }
        phase.set_enable(regs, true);
        phase.request(regs, cs);

        poll_forever(|| {
            if phase.observation_error(regs) {
                return Poll::Ready(Err(TrainingFault::Observation));
            }
            let status = regs.pi.read::<PiInterruptStatus>();
            if phase.error(status) {
                Poll::Ready(Err(TrainingFault::Status))
            } else if phase.done(status) {
                Poll::Ready(Ok(()))
            } else {
                Poll::Pending
            }
        })
        .map_err(|fault| TrainingError { phase, cs, fault })?;
        ack_interrupts(regs);
    }
    if phase == Phase::WriteLeveling {
        override_write_leveling_value(regs);
    }
    phase.set_enable(regs, false);
    Ok(())
}

/// Forces a register state while `body` runs and restores the saved state afterwards, also
/// when `body` fails.
fn with_saved<S, T>(
    regs: &mut ChannelPeripherals,
    save: impl FnOnce(&mut ChannelPeripherals) -> S,
    restore: impl FnOnce(&mut ChannelPeripherals, S),
    body: impl FnOnce(&mut ChannelPeripherals) -> T,
) -> T {
    let saved = save(regs);
    let result = body(regs);
    restore(regs, saved);
    result
}

/// Read gate training with the PHY side DQS termination disabled.
///
/// The DQS pull resistors hold the differential DQS signal low before the gate training, an
/// enabled termination changes that level. LPDDR4 has no termination on the DQS lane.
fn train_read_gate(
    regs: &mut ChannelPeripherals,
    dram_type: DramType,
    rank: u8,
) -> Result<(), TrainingError> {
    if dram_type == DramType::Lpddr4 {
        return train_phase(regs, Phase::ReadGate, dram_type, rank);
    }
    with_saved(
        regs,
        |regs| {
            let saved = regs.phy.read_slice::<PhyDqTselSelect>(0).dqs_tsel_enable();
            regs.phy
                .modify_all_slices::<PhyDqTselSelect>(|val| val.with_dqs_tsel_enable(u3::new(0)));
            saved
        },
        |regs, saved| {
            regs.phy
                .modify_all_slices::<PhyDqTselSelect>(|val| val.with_dqs_tsel_enable(saved))
        },
        |regs| train_phase(regs, Phase::ReadGate, dram_type, rank),
    )
}

/// Runs the selected training phases on one channel.
///
/// The DQS pull-up/pull-down is enabled for the whole sequence. The first failing phase
/// aborts the training.
pub fn data_training(
    regs: &mut ChannelPeripherals,
    dram_type: DramType,
    rank: u8,
    flags: TrainingFlags,
) -> Result<(), TrainingError> {
    let flags = flags.expand(dram_type);
    with_saved(
        regs,
        |regs| regs.phy.modify::<PhyPadDqsDrive>(|val| val.with_rpull(true)),
        |regs, _| regs.phy.modify::<PhyPadDqsDrive>(|val| val.with_rpull(false)),
        |regs| {
            for phase in Phase::ALL {
                if !flags.contains(phase.flag()) {
                    continue;
                }
                log::debug!("{:?} training", phase);
                let result = match phase {
                    Phase::ReadGate => train_read_gate(regs, dram_type, rank),
                    _ => train_phase(regs, phase, dram_type, rank),
                };
                if let Err(e) = result {
                    log::error!("{}", e);
                    return Err(e);
                }
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::ddr::sim::SimulatedChannel;

    /// Raw PI interrupt status with the done bits of all phases set.
    const ALL_DONE: u32 = 0b11_1111 << 16;

    fn phases_run(dram_type: DramType, flags: TrainingFlags) -> Vec<Phase> {
        let flags = flags.expand(dram_type);
        Phase::ALL
            .into_iter()
            .filter(|phase| flags.contains(phase.flag()))
            .collect()
    }

    #[test]
    fn rank_masks() {
        assert_eq!(rank_mask(DramType::Lpddr4, 1), 0b0101);
        assert_eq!(rank_mask(DramType::Lpddr4, 2), 0b1111);
        assert_eq!(rank_mask(DramType::Lpddr3, 1), 0b01);
        assert_eq!(rank_mask(DramType::Lpddr3, 2), 0b11);
        assert_eq!(rank_mask(DramType::Ddr3, 1), 0b01);
        assert_eq!(rank_mask(DramType::Ddr3, 2), 0b11);
    }

    #[test]
    fn chip_select_iteration() {
        assert_eq!(Phase::Ca.chip_selects(DramType::Lpddr4, 1), 0b0101);
        assert_eq!(Phase::WdqLeveling.chip_selects(DramType::Lpddr4, 2), 0b1111);
        assert_eq!(Phase::WriteLeveling.chip_selects(DramType::Lpddr4, 1), 0b01);
        assert_eq!(Phase::ReadGate.chip_selects(DramType::Lpddr4, 2), 0b11);
        assert_eq!(Phase::ReadLeveling.chip_selects(DramType::Ddr3, 1), 0b01);
    }

    #[test]
    fn full_training_expansion() {
        assert_eq!(
            phases_run(DramType::Lpddr4, TrainingFlags::FULL),
            [
                Phase::Ca,
                Phase::WriteLeveling,
                Phase::ReadGate,
                Phase::ReadLeveling,
                Phase::WdqLeveling
            ]
        );
        assert_eq!(
            phases_run(DramType::Lpddr3, TrainingFlags::FULL),
            [Phase::Ca, Phase::WriteLeveling, Phase::ReadGate]
        );
        assert_eq!(
            phases_run(DramType::Ddr3, TrainingFlags::FULL),
            [Phase::WriteLeveling, Phase::ReadGate, Phase::ReadLeveling]
        );
        assert_eq!(
            phases_run(DramType::Ddr3, TrainingFlags::CA),
            [Phase::Ca]
        );
    }

    #[test]
    fn full_training_lpddr4_succeeds() {
        let sim = SimulatedChannel::new();
        sim.pi.write(174, ALL_DONE);
        let mut regs = sim.peripherals();
        data_training(&mut regs, DramType::Lpddr4, 2, TrainingFlags::FULL).unwrap();

        assert_eq!(sim.pi(175), 0x3F7C);
        // Enables are cleared after each phase.
        assert_eq!(sim.pi(100), 0);
        assert_eq!(sim.pi(60), 0);
        assert_eq!(sim.pi(80), 0);
        assert_eq!(sim.pi(124), 0);
        // Last requests target the last chip select.
        assert_eq!(sim.pi(92), 1 << 16 | 3 << 24);
        assert_eq!(sim.pi(121), 1 << 8 | 3 << 16);
        assert_eq!(sim.pi(59), 1 << 8 | 1 << 16);
        assert_eq!(sim.pi(74), 1 << 8 | 1 << 16 | 1 << 24);
        // DQS pull released.
        assert_eq!(sim.phy(927) & (1 << 22), 0);
        // Write leveling override.
        for slice in 0..4 {
            assert_eq!(sim.phy(slice * 128 + 63), 0x200 << 16);
            assert_eq!(sim.phy(slice * 128 + 8), 1 << 16);
        }
        assert_eq!(sim.phy(896) & 1, 0);
        assert_eq!(sim.ctl(200), 1 << 8);
    }

    #[test]
    fn per_cs_training_index() {
        let sim = SimulatedChannel::new();
        sim.pi.write(174, ALL_DONE);
        sim.phy.write(84, 1 << 16);
        let mut regs = sim.peripherals();
        train_phase(&mut regs, Phase::ReadLeveling, DramType::Ddr3, 2).unwrap();
        for slice in 0..4 {
            assert_eq!(sim.phy(slice * 128 + 8), 1 << 24);
        }
    }

    #[test]
    fn status_error_aborts_phase() {
        let sim = SimulatedChannel::new();
        // Write leveling error, all done bits set.
        sim.pi.write(174, ALL_DONE | 1 << 12);
        let mut regs = sim.peripherals();
        let result = train_phase(&mut regs, Phase::WriteLeveling, DramType::Ddr3, 1);
        assert_eq!(
            result,
            Err(TrainingError {
                phase: Phase::WriteLeveling,
                cs: 0,
                fault: TrainingFault::Status
            })
        );
        // Enable stays set, the override is not applied.
        assert_eq!(sim.pi(60), 0b10 << 8);
        assert_eq!(sim.phy(63), 0);
    }

    #[test]
    fn observation_error_aborts_without_done() {
        let sim = SimulatedChannel::new();
        sim.phy.write(640 + 20, 0b01 << 30);
        let mut regs = sim.peripherals();
        let result = train_phase(&mut regs, Phase::Ca, DramType::Lpddr3, 1);
        assert_eq!(
            result,
            Err(TrainingError {
                phase: Phase::Ca,
                cs: 0,
                fault: TrainingFault::Observation
            })
        );
    }

    #[test]
    fn read_leveling_ignores_observation_registers() {
        let sim = SimulatedChannel::new();
        sim.pi.write(174, ALL_DONE);
        for slice in 0..4 {
            sim.phy.write(slice * 128 + 40, 1 << 12);
            sim.phy.write(slice * 128 + 43, 0b11 << 22);
        }
        let mut regs = sim.peripherals();
        assert!(train_phase(&mut regs, Phase::ReadLeveling, DramType::Ddr3, 1).is_ok());
        assert!(train_phase(&mut regs, Phase::WdqLeveling, DramType::Lpddr4, 1).is_ok());
    }

    #[test]
    fn wdq_leveling_disables_vref_training() {
        let sim = SimulatedChannel::new();
        sim.pi.write(174, ALL_DONE);
        sim.pi.write(181, 1 << 8 | 1);
        let mut regs = sim.peripherals();
        train_phase(&mut regs, Phase::WdqLeveling, DramType::Lpddr4, 1).unwrap();
        assert_eq!(sim.pi(181), 1);
        assert_eq!(sim.pi(121), 1 << 8 | 2 << 16);
    }

    #[test]
    fn read_gate_restores_dqs_termination_on_failure() {
        let sim = SimulatedChannel::new();
        for slice in 0..4 {
            sim.phy.write(slice * 128 + 6, 0b001 << 24 | 0x11ff11);
        }
        // Gate training error.
        sim.pi.write(174, 1 << 11);
        let mut regs = sim.peripherals();
        let result = data_training(&mut regs, DramType::Ddr3, 1, TrainingFlags::READ_GATE);
        assert_eq!(result.unwrap_err().fault, TrainingFault::Status);
        for slice in 0..4 {
            assert_eq!(sim.phy(slice * 128 + 6), 0b001 << 24 | 0x11ff11);
        }
        assert_eq!(sim.phy(927) & (1 << 22), 0);
    }
}
