//! HLE BIOS Dispatch
//!
//! When the guest program counter lands on one of the fixed HLE vector
//! addresses, the interpreter hands control here instead of executing BIOS
//! code. The three group dispatchers pull an 8-bit call selector out of
//! `t1` and index the machine's replacement tables; the remaining vectors
//! are the hand-written bootstrap and exec-return routines. Every vector
//! ends with the scheduler's branch test so pending events keep running.

use log::{debug, info};

use crate::runtime::context::reg;
use crate::runtime::machine::Machine;

/// A native BIOS replacement routine. The guest register file is the whole
/// calling convention; there are no typed parameters.
pub type HleHandler = fn(&mut Machine);

/// One entry in a BIOS call table: a native routine or an explicit no-op.
#[derive(Debug, Clone, Copy)]
pub enum HleCall {
    Handler(HleHandler),
    Nop,
}

/// A 256-entry BIOS call group, indexed by the `t1` selector.
pub type HleTable = [HleCall; 256];

/// A call table with every selector unregistered.
pub const fn empty_table() -> HleTable {
    [HleCall::Nop; 256]
}

/// Placeholder vector: return to the caller and let pending events run. A
/// BIOS call with no registered replacement resolves to this.
pub fn hle_dummy(m: &mut Machine) {
    m.cpu.pc = m.cpu.gpr[reg::RA];
    m.branch_test();
}

pub fn hle_a0(m: &mut Machine) {
    let call = (m.cpu.gpr[reg::T1] & 0xff) as usize;
    if let HleCall::Handler(f) = m.bios_a0[call] {
        f(m);
    }
    m.branch_test();
}

pub fn hle_b0(m: &mut Machine) {
    let call = (m.cpu.gpr[reg::T1] & 0xff) as usize;
    if let HleCall::Handler(f) = m.bios_b0[call] {
        f(m);
    }
    m.branch_test();
}

pub fn hle_c0(m: &mut Machine) {
    let call = (m.cpu.gpr[reg::T1] & 0xff) as usize;
    if let HleCall::Handler(f) = m.bios_c0[call] {
        f(m);
    }
    m.branch_test();
}

/// Reset vector replacement: discover and load the inserted medium, then
/// log where the loader left the guest.
pub fn hle_bootstrap(m: &mut Machine) {
    info!("hle bootstrap");
    m.media.check_disc();
    m.media.load_disc();
    info!(
        "disc label {:?}: pc = {:08x} (sp = {:08x})",
        m.media.disc_label(),
        m.cpu.pc,
        m.cpu.gpr[reg::SP]
    );
}

/// Executable header left in guest memory by the BIOS Exec call. Field
/// order matches the on-disc layout; the trailing five words hold the
/// caller context restored on return.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecHeader {
    pub pc0: u32,
    pub gp0: u32,
    pub t_addr: u32,
    pub t_size: u32,
    pub d_addr: u32,
    pub d_size: u32,
    pub b_addr: u32,
    pub b_size: u32,
    pub s_addr: u32,
    pub s_size: u32,
    pub sp: u32,
    pub fp: u32,
    pub gp: u32,
    pub ret: u32,
    pub base: u32,
}

impl ExecHeader {
    /// Read the header out of guest memory. Fields on unmapped pages read
    /// as zero, like every other guest load.
    pub fn read(m: &Machine, address: u32) -> Self {
        let word = |i: u32| m.load_word(address.wrapping_add(i * 4));
        Self {
            pc0: word(0),
            gp0: word(1),
            t_addr: word(2),
            t_size: word(3),
            d_addr: word(4),
            d_size: word(5),
            b_addr: word(6),
            b_size: word(7),
            s_addr: word(8),
            s_size: word(9),
            sp: word(10),
            fp: word(11),
            gp: word(12),
            ret: word(13),
            base: word(14),
        }
    }
}

/// Return-from-executable vector: restore the caller context saved in the
/// header `s0` points at, flag success in `v0`, and resume at the restored
/// return address.
pub fn hle_exec_ret(m: &mut Machine) {
    let header_addr = m.cpu.gpr[reg::S0];
    let header = ExecHeader::read(m, header_addr);
    debug!("exec return {:08x}: ret = {:08x}", header_addr, header.ret);

    m.cpu.gpr[reg::RA] = header.ret;
    m.cpu.gpr[reg::SP] = header.sp;
    m.cpu.gpr[reg::S8] = header.fp;
    m.cpu.gpr[reg::GP] = header.gp;
    m.cpu.gpr[reg::S0] = header.base;

    m.cpu.gpr[reg::V0] = 1;
    m.cpu.pc = m.cpu.gpr[reg::RA];
}

/// Vector table indexed by the low bits of the HLE opcode the interpreter
/// fabricates at the fixed vector addresses. Unpopulated slots fall through
/// to the placeholder.
pub const VECTORS: [HleCall; 256] = {
    let mut table = [HleCall::Nop; 256];
    table[0] = HleCall::Handler(hle_dummy);
    table[1] = HleCall::Handler(hle_a0);
    table[2] = HleCall::Handler(hle_b0);
    table[3] = HleCall::Handler(hle_c0);
    table[4] = HleCall::Handler(hle_bootstrap);
    table[5] = HleCall::Handler(hle_exec_ret);
    table[6] = HleCall::Handler(hle_dummy);
    table[7] = HleCall::Handler(hle_dummy);
    table
};

/// Dispatch an HLE vector by number.
pub fn execute(m: &mut Machine, vector: u32) {
    match VECTORS[(vector & 0xff) as usize] {
        HleCall::Handler(f) => f(m),
        HleCall::Nop => hle_dummy(m),
    }
}
