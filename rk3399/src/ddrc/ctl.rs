//! Denali DDR controller registers which are modified at run-time.
use arbitrary_int::{u2, u3, u4};

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlStart {
    #[bit(0, rw)]
    start: bool,
}
register!(CtlStart, 0);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlPowerUpConfig {
    /// Exit self-refresh when the controller is started.
    #[bit(16, rw)]
    pwrup_srefresh_exit: bool,
}
register!(CtlPowerUpConfig, 68);

/// Address map differences relative to the maximum geometry of the controller.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlAddrDiff {
    #[bits(24..=26, rw)]
    row_diff: u3,
    #[bits(16..=17, rw)]
    bank_diff: u2,
}
register!(CtlAddrDiff, 190);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlColDiff {
    #[bits(0..=3, rw)]
    col_diff: u4,
}
register!(CtlColDiff, 191);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlCsMap {
    /// Set for any data bus narrower than 32 bit.
    #[bit(16, rw)]
    reduc: bool,
    #[bits(0..=1, rw)]
    cs_map: u2,
}
register!(CtlCsMap, 196);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlUpdateRequest {
    #[bit(8, rw)]
    ctrlupd_req: bool,
}
register!(CtlUpdateRequest, 200);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlInterruptStatus {
    #[bit(3, r)]
    init_done: bool,
}
register!(CtlInterruptStatus, 203);

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct CtlDfiClockControl {
    #[bit(17, rw)]
    dfi_dram_clk_disable: bool,
}
register!(CtlDfiClockControl, 276);
