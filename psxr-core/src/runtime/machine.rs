//! Machine Context
//!
//! One [`Machine`] owns everything a single emulated console needs: the CPU
//! register file, guest memory with its translation tables, the HLE BIOS
//! call tables, the BIOS mode decision, and the collaborator hooks the
//! interpreter/recompiler plugs in. Lifecycle is `new` / `reset` /
//! `shutdown`; nothing here blocks or runs on another thread.
//!
//! # Access Facade
//! `read{8,16,32}` / `write{8,16,32}` are the only sanctioned way for the
//! interpreter to touch guest memory. Each access first checks for the
//! scratch-pad/hardware page, then consults the translation tables. Writes
//! through a mapped entry notify the code cache about the touched
//! instruction word; writes that miss the write table while RAM writes are
//! trapped notify the code cache instead of storing. The 32-bit write path
//! additionally intercepts the guest's cache-control register.

use log::{debug, info};

use crate::config::Config;
use crate::runtime::bios::{self, BiosMode};
use crate::runtime::context::CpuContext;
use crate::runtime::hle::{empty_table, HleTable};
use crate::runtime::memory::{map, Memory, PageMap, ProtectChange};

/// Compiled-code cache maintained by the recompiler. The write path calls
/// in whenever a store may touch translated code; both calls must be
/// idempotent and are made synchronously, before the write returns.
pub trait CodeCache {
    /// Drop translations overlapping `count` instruction words at `address`.
    fn clear(&mut self, address: u32, count: u32);
    /// Drop every cached decoded instruction.
    fn invalidate_all(&mut self);
}

/// Hardware-register window (DMA, timers, CD-ROM, ...), emulated outside
/// this core. Receives every access to the scratch/hw page at or above the
/// register split.
pub trait HwBus {
    fn read8(&mut self, address: u32) -> u8;
    fn read16(&mut self, address: u32) -> u16;
    fn read32(&mut self, address: u32) -> u32;
    fn write8(&mut self, address: u32, value: u8);
    fn write16(&mut self, address: u32, value: u16);
    fn write32(&mut self, address: u32, value: u32);
}

/// Pending-event check ("branch test") run after every HLE call so timers
/// and interrupts get a chance to fire.
pub trait EventScheduler {
    fn branch_test(&mut self, cpu: &mut CpuContext);
}

/// Disc/medium discovery driven by the HLE bootstrap vector.
pub trait MediaLoader {
    /// Probe for an inserted medium and read its label.
    fn check_disc(&mut self);
    /// Load the boot executable from the medium.
    fn load_disc(&mut self);
    fn disc_label(&self) -> String;
}

/// Code cache stub for hosts running pure interpretation.
#[derive(Debug, Default)]
pub struct NullCodeCache;

impl CodeCache for NullCodeCache {
    fn clear(&mut self, _address: u32, _count: u32) {}
    fn invalidate_all(&mut self) {}
}

/// Hardware bus stub: registers read as zero, writes are discarded.
#[derive(Debug, Default)]
pub struct NullHwBus;

impl HwBus for NullHwBus {
    fn read8(&mut self, _address: u32) -> u8 {
        0
    }
    fn read16(&mut self, _address: u32) -> u16 {
        0
    }
    fn read32(&mut self, _address: u32) -> u32 {
        0
    }
    fn write8(&mut self, _address: u32, _value: u8) {}
    fn write16(&mut self, _address: u32, _value: u16) {}
    fn write32(&mut self, _address: u32, _value: u32) {}
}

/// Scheduler stub with no pending events.
#[derive(Debug, Default)]
pub struct NullScheduler;

impl EventScheduler for NullScheduler {
    fn branch_test(&mut self, _cpu: &mut CpuContext) {}
}

/// Media stub for a drive with no disc.
#[derive(Debug, Default)]
pub struct NullMedia;

impl MediaLoader for NullMedia {
    fn check_disc(&mut self) {}
    fn load_disc(&mut self) {}
    fn disc_label(&self) -> String {
        String::new()
    }
}

/// A single emulated console.
pub struct Machine {
    pub cpu: CpuContext,
    pub mem: Memory,
    pub config: Config,
    /// How BIOS calls are serviced this session; decided on reset.
    pub bios_mode: BiosMode,
    /// Replacement routines for the three BIOS jump-table groups.
    pub bios_a0: HleTable,
    pub bios_b0: HleTable,
    pub bios_c0: HleTable,
    pub code_cache: Box<dyn CodeCache>,
    pub hw: Box<dyn HwBus>,
    pub events: Box<dyn EventScheduler>,
    pub media: Box<dyn MediaLoader>,
}

impl Machine {
    /// Create a machine with stub collaborators. Real hosts replace
    /// `code_cache`, `hw`, `events` and `media` before running guest code.
    pub fn new(config: Config) -> Self {
        debug!("machine created ({:?})", config.bios_device);
        Self {
            cpu: CpuContext::new(),
            mem: Memory::new(),
            config,
            bios_mode: BiosMode::Hle,
            bios_a0: empty_table(),
            bios_b0: empty_table(),
            bios_c0: empty_table(),
            code_cache: Box::new(NullCodeCache),
            hw: Box::new(NullHwBus),
            events: Box::new(NullScheduler),
            media: Box::new(NullMedia),
        }
    }

    /// Power-on reset: zero the CPU and every backing buffer, then decide
    /// the BIOS mode for this session. The decision is not revisited until
    /// the next reset.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.mem.reset();
        self.bios_mode = bios::select_mode(&self.config, &mut self.mem);
        info!("reset complete: bios mode {:?}", self.bios_mode);
    }

    /// Session teardown. Buffers are freed when the machine is dropped.
    pub fn shutdown(&mut self) {
        debug!("machine shutdown");
    }

    /// Run the pending-event check against the CPU state.
    #[inline]
    pub fn branch_test(&mut self) {
        self.events.branch_test(&mut self.cpu);
    }

    pub fn read8(&mut self, address: u32) -> u8 {
        // 8-bit reads charge no cycle
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_read8(address)
            } else {
                self.hw.read8(address)
            }
        } else {
            match self.mem.read_lut(page) {
                Some(entry) => self.mem.read_mapped_u8(entry, address),
                None => 0,
            }
        }
    }

    pub fn read16(&mut self, address: u32) -> u16 {
        self.cpu.cycle = self.cpu.cycle.wrapping_add(1);
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_read16(address)
            } else {
                self.hw.read16(address)
            }
        } else {
            match self.mem.read_lut(page) {
                Some(entry) => self.mem.read_mapped_u16(entry, address),
                None => 0,
            }
        }
    }

    pub fn read32(&mut self, address: u32) -> u32 {
        self.cpu.cycle = self.cpu.cycle.wrapping_add(1);
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_read32(address)
            } else {
                self.hw.read32(address)
            }
        } else {
            match self.mem.read_lut(page) {
                Some(entry) => self.mem.read_mapped_u32(entry, address),
                None => 0,
            }
        }
    }

    pub fn write8(&mut self, address: u32, value: u8) {
        self.cpu.cycle = self.cpu.cycle.wrapping_add(1);
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_write8(address, value);
            } else {
                self.hw.write8(address, value);
            }
        } else {
            match self.mem.write_lut(page) {
                Some(entry) => {
                    self.mem.write_mapped_u8(entry, address, value);
                    self.code_cache.clear(address & !3, 1);
                }
                None => self.notify_blocked_write(address),
            }
        }
    }

    pub fn write16(&mut self, address: u32, value: u16) {
        self.cpu.cycle = self.cpu.cycle.wrapping_add(1);
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_write16(address, value);
            } else {
                self.hw.write16(address, value);
            }
        } else {
            match self.mem.write_lut(page) {
                Some(entry) => {
                    self.mem.write_mapped_u16(entry, address, value);
                    self.code_cache.clear(address & !3, 1);
                }
                None => self.notify_blocked_write(address),
            }
        }
    }

    pub fn write32(&mut self, address: u32, value: u32) {
        self.cpu.cycle = self.cpu.cycle.wrapping_add(1);
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_write32(address, value);
            } else {
                self.hw.write32(address, value);
            }
        } else {
            match self.mem.write_lut(page) {
                Some(entry) => {
                    self.mem.write_mapped_u32(entry, address, value);
                    self.code_cache.clear(address, 1);
                }
                None => {
                    if address == map::CACHE_CTRL {
                        self.cache_control(value);
                    } else {
                        self.notify_blocked_write(address);
                    }
                }
            }
        }
    }

    /// A write missed the write table. While RAM writes are trapped the
    /// store is skipped; the recompiler only needs to drop code translated
    /// from that address, and the interpreter re-reads memory on the next
    /// fetch.
    fn notify_blocked_write(&mut self, address: u32) {
        if !self.mem.write_ok() && matches!(self.mem.read_lut(address >> 16), Some(PageMap::Ram(_)))
        {
            self.code_cache.clear(address, 1);
        }
    }

    fn cache_control(&mut self, value: u32) {
        if let ProtectChange::Withdrawn = self.mem.cache_control(value) {
            self.code_cache.invalidate_all();
        }
    }

    /// Direct guest-memory word load used by HLE routines: no cycle
    /// accounting, no hardware dispatch, unmapped reads as zero.
    pub fn load_word(&self, address: u32) -> u32 {
        match self.mem.read_lut(address >> 16) {
            Some(entry) => self.mem.read_mapped_u32(entry, address),
            None => 0,
        }
    }

    // Reduced facade for recompiled code. The recompiler inlines directly
    // mapped accesses and only calls here for the special page, so these
    // charge no cycle cost.

    /// Read for addresses already known to be in the scratch/hw page.
    pub fn dyna_read8(&mut self, address: u32) -> u8 {
        if address < map::HW_REG_BASE {
            self.mem.scratch_read8(address)
        } else {
            self.hw.read8(address)
        }
    }

    pub fn dyna_read16(&mut self, address: u32) -> u16 {
        if address < map::HW_REG_BASE {
            self.mem.scratch_read16(address)
        } else {
            self.hw.read16(address)
        }
    }

    pub fn dyna_read32(&mut self, address: u32) -> u32 {
        if address < map::HW_REG_BASE {
            self.mem.scratch_read32(address)
        } else {
            self.hw.read32(address)
        }
    }

    /// Write for addresses already known to be in the scratch/hw page.
    pub fn dyna_write8(&mut self, address: u32, value: u8) {
        if address < map::HW_REG_BASE {
            self.mem.scratch_write8(address, value);
        } else {
            self.hw.write8(address, value);
        }
    }

    /// Write for an address in the scratch/hw page, or one whose write-table
    /// lookup already failed in inlined code.
    pub fn dyna_write32(&mut self, address: u32, value: u32) {
        let page = address >> 16;
        if page == map::SCRATCH_HW_PAGE {
            if address < map::HW_REG_BASE {
                self.mem.scratch_write32(address, value);
            } else {
                self.hw.write32(address, value);
            }
        } else if address == map::CACHE_CTRL {
            self.cache_control(value);
        } else {
            self.notify_blocked_write(address);
        }
    }
}
