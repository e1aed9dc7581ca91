//! Denali protocol interface (PI) registers. The PI drives the DRAM initialization and the
//! training state machines.
use arbitrary_int::{u2, u3, u4};

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiStart {
    #[bit(0, rw)]
    start: bool,
}
register!(PiStart, 0);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiTrainingCsMap {
    #[bits(24..=27, rw)]
    cs_map: u4,
}
register!(PiTrainingCsMap, 41);

/// Enable value of all `*_en` training fields. The PI only supports this "support" mode
/// during software requested training.
pub const TRAINING_SUPPORT_ENABLE: u2 = u2::new(0b10);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiWriteLevelingRequest {
    #[bits(16..=17, rw)]
    cs: u2,
    #[bit(8, rw)]
    req: bool,
}
register!(PiWriteLevelingRequest, 59);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiWriteLevelingEnable {
    #[bits(8..=9, rw)]
    enable: u2,
}
register!(PiWriteLevelingEnable, 60);

/// Shared request register of read-gate training and read leveling.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiReadLevelingRequest {
    #[bits(24..=25, rw)]
    cs: u2,
    #[bit(16, rw)]
    gate_req: bool,
    #[bit(8, rw)]
    rdlvl_req: bool,
}
register!(PiReadLevelingRequest, 74);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiReadLevelingEnable {
    #[bits(24..=25, rw)]
    gate_enable: u2,
    #[bits(16..=17, rw)]
    rdlvl_enable: u2,
}
register!(PiReadLevelingEnable, 80);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiCaTrainingRequest {
    #[bits(24..=25, rw)]
    cs: u2,
    #[bit(16, rw)]
    req: bool,
}
register!(PiCaTrainingRequest, 92);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiCaTrainingEnable {
    #[bits(8..=9, rw)]
    enable: u2,
}
register!(PiCaTrainingEnable, 100);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiWdqLevelingRequest {
    #[bits(16..=17, rw)]
    cs: u2,
    #[bit(8, rw)]
    req: bool,
}
register!(PiWdqLevelingRequest, 121);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiWdqLevelingEnable {
    #[bits(16..=17, rw)]
    enable: u2,
}
register!(PiWdqLevelingEnable, 124);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiAddrDiff {
    #[bits(24..=26, rw)]
    row_diff: u3,
    #[bits(16..=17, rw)]
    bank_diff: u2,
}
register!(PiAddrDiff, 155);

/// Training interrupt status. The status bits start at bit 8 of the register.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiInterruptStatus {
    #[bit(21, r)]
    done: bool,
    #[bit(20, r)]
    wdqlvl_done: bool,
    #[bit(19, r)]
    calvl_done: bool,
    #[bit(18, r)]
    wrlvl_done: bool,
    #[bit(17, r)]
    gate_done: bool,
    #[bit(16, r)]
    rdlvl_done: bool,
    #[bit(14, r)]
    wdqlvl_error: bool,
    #[bit(13, r)]
    calvl_error: bool,
    #[bit(12, r)]
    wrlvl_error: bool,
    #[bit(11, r)]
    gate_error: bool,
    #[bit(10, r)]
    rdlvl_error: bool,
}
register!(PiInterruptStatus, 174);

/// Acknowledge register of [PiInterruptStatus].
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiInterruptAck {
    #[bits(0..=31, rw)]
    ack: u32,
}
register!(PiInterruptAck, 175);

impl PiInterruptAck {
    /// Acknowledges every training interrupt.
    pub const ALL: Self = Self::new_with_raw_value(0x3F7C);
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiWdqLevelingVref {
    #[bit(8, rw)]
    vref_en: bool,
}
register!(PiWdqLevelingVref, 181);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PiColDiff {
    #[bits(0..=3, rw)]
    col_diff: u4,
}
register!(PiColDiff, 199);
