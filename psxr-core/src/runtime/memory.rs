//! Guest Memory and Address Translation
//!
//! This module owns the backing buffers for guest memory and the per-page
//! lookup tables that translate the 4 GB guest address space onto them.
//!
//! # Memory Map
//! - **0x00000000 - 0x001FFFFF**: Kernel + user RAM (2MB, mirrored four times
//!   across an 8MB window)
//! - **0x1F000000 - 0x1F00FFFF**: Parallel port (64KB)
//! - **0x1F800000 - 0x1F8003FF**: Scratch pad (1KB)
//! - **0x1F801000 - 0x1F802FFF**: Hardware registers (8KB)
//! - **0x1FC00000 - 0x1FC7FFFF**: BIOS ROM (512KB)
//! - **0x80000000 / 0xA0000000**: Cached / uncached mirrors of RAM
//! - **0x9FC00000 / 0xBFC00000**: Cached / uncached mirrors of the BIOS
//!
//! # Address Translation
//! A guest address splits as `{page:16, offset:16}`. Each 64KB page has one
//! entry per lookup table, tagging which backing buffer the page resolves to
//! and at what base offset. An unmapped page reads as zero and discards
//! writes. Only the write table's RAM entries are ever toggled after
//! initialization; that toggle is how the guest's cache-control convention
//! forces RAM writes onto the slow path so the recompiler can watch for
//! self-modifying code.

/// PSX memory map constants.
pub mod map {
    /// Main RAM size (2MB)
    pub const RAM_SIZE: usize = 0x0020_0000;
    /// BIOS ROM size (512KB)
    pub const ROM_SIZE: usize = 0x0008_0000;
    /// Parallel port window size (one full page)
    pub const PARALLEL_SIZE: usize = 0x1_0000;
    /// Scratch pad + hardware register window size (one full page)
    pub const SCRATCH_HW_SIZE: usize = 0x1_0000;
    /// Number of 64KB pages in the 4GB guest space
    pub const PAGE_COUNT: usize = 0x1_0000;
    /// Offset-within-page mask
    pub const OFFSET_MASK: u32 = 0xffff;
    /// Pages per RAM mirror block (8MB window over the 2MB of physical RAM)
    pub const RAM_PAGES: u32 = 0x80;
    /// Physical RAM wraps every 32 pages inside a mirror block
    pub const RAM_PAGE_MASK: u32 = 0x1f;
    /// Pages backing the BIOS ROM
    pub const ROM_PAGES: u32 = 0x08;
    /// Cached (kseg0) and uncached (kseg1) mirror base pages for RAM
    pub const RAM_MIRROR_PAGES: [u32; 3] = [0x0000, 0x8000, 0xa000];
    /// BIOS base page and its cached/uncached mirrors
    pub const ROM_MIRROR_PAGES: [u32; 3] = [0x1fc0, 0x9fc0, 0xbfc0];
    /// Page holding the parallel port window
    pub const PARALLEL_PAGE: u32 = 0x1f00;
    /// Page holding the scratch pad and hardware registers
    pub const SCRATCH_HW_PAGE: u32 = 0x1f80;
    /// First hardware-register address inside the scratch/hw page
    pub const HW_REG_BASE: u32 = 0x1f80_1000;
    /// Guest reset vector (start of the BIOS uncached mirror)
    pub const RESET_VECTOR: u32 = 0xbfc0_0000;
    /// Cache-control pseudo address intercepted by the write path
    pub const CACHE_CTRL: u32 = 0xfffe_0130;
}

/// One lookup-table entry: which backing buffer a 64KB guest page resolves
/// to, and the byte offset of that page within the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMap {
    /// Main RAM at the given byte offset.
    Ram(u32),
    /// BIOS ROM at the given byte offset.
    Rom(u32),
    /// Parallel port window.
    Parallel,
    /// Scratch pad / hardware register window.
    ScratchHw,
}

/// Outcome of a cache-control register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectChange {
    /// RAM write entries were just cleared; the caller must drop all cached
    /// decoded-instruction state.
    Withdrawn,
    /// RAM write entries were just restored.
    Restored,
    /// The request was redundant or the value is not a recognized command.
    Unchanged,
}

/// Guest memory: backing buffers plus the read/write translation tables.
///
/// Buffers are allocated once, zeroed on every [`Memory::reset`], and freed
/// on drop. Guests read little-endian regardless of host byte order.
pub struct Memory {
    /// Main RAM (2MB)
    ram: Vec<u8>,
    /// BIOS ROM (512KB)
    rom: Vec<u8>,
    /// Parallel port window
    parallel: Vec<u8>,
    /// Scratch pad (first 1KB) and hardware register shadow
    scratch_hw: Vec<u8>,
    /// Read lookup table, one entry per guest page
    rlut: Vec<Option<PageMap>>,
    /// Write lookup table; RAM entries toggled by the protection controller
    wlut: Vec<Option<PageMap>>,
    /// False while the guest has RAM writes trapped for cache coherency
    write_ok: bool,
}

impl Memory {
    /// Allocate the backing buffers and build both lookup tables.
    pub fn new() -> Self {
        let mut mem = Self {
            ram: vec![0u8; map::RAM_SIZE],
            rom: vec![0u8; map::ROM_SIZE],
            parallel: vec![0u8; map::PARALLEL_SIZE],
            scratch_hw: vec![0u8; map::SCRATCH_HW_SIZE],
            rlut: vec![None; map::PAGE_COUNT],
            wlut: vec![None; map::PAGE_COUNT],
            write_ok: true,
        };
        mem.build_luts();
        mem
    }

    /// Build both lookup tables from scratch.
    ///
    /// RAM pages 0x00-0x7F map to `(page & 0x1F) << 16`, repeating the 2MB of
    /// physical RAM across the 8MB window, and the whole block is duplicated
    /// at the cached (0x8000) and uncached (0xA000) mirror bases in both
    /// tables. ROM pages appear in the read table only, at 0x1FC0 and its two
    /// mirrors. The parallel and scratch/hw pages map in both tables and stay
    /// out of the mirror and protection-toggle logic.
    fn build_luts(&mut self) {
        self.rlut.fill(None);
        self.wlut.fill(None);

        for base in map::RAM_MIRROR_PAGES {
            for page in 0..map::RAM_PAGES {
                let entry = Some(PageMap::Ram((page & map::RAM_PAGE_MASK) << 16));
                self.rlut[(base + page) as usize] = entry;
                self.wlut[(base + page) as usize] = entry;
            }
        }

        self.rlut[map::PARALLEL_PAGE as usize] = Some(PageMap::Parallel);
        self.wlut[map::PARALLEL_PAGE as usize] = Some(PageMap::Parallel);
        self.rlut[map::SCRATCH_HW_PAGE as usize] = Some(PageMap::ScratchHw);
        self.wlut[map::SCRATCH_HW_PAGE as usize] = Some(PageMap::ScratchHw);

        for base in map::ROM_MIRROR_PAGES {
            for page in 0..map::ROM_PAGES {
                self.rlut[(base + page) as usize] = Some(PageMap::Rom(page << 16));
            }
        }
    }

    /// Zero-fill every backing buffer. The tables are left as they are; ROM
    /// reloading is the BIOS loader's job.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.rom.fill(0);
        self.parallel.fill(0);
        self.scratch_hw.fill(0);
    }

    /// Read lookup table entry for a page.
    #[inline(always)] // Hot path - always inline for performance
    pub fn read_lut(&self, page: u32) -> Option<PageMap> {
        self.rlut[(page & map::OFFSET_MASK) as usize]
    }

    /// Write lookup table entry for a page.
    #[inline(always)] // Hot path - always inline for performance
    pub fn write_lut(&self, page: u32) -> Option<PageMap> {
        self.wlut[(page & map::OFFSET_MASK) as usize]
    }

    #[inline(always)]
    fn backing(&self, entry: PageMap) -> (&[u8], usize) {
        match entry {
            PageMap::Ram(base) => (self.ram.as_slice(), base as usize),
            PageMap::Rom(base) => (self.rom.as_slice(), base as usize),
            PageMap::Parallel => (self.parallel.as_slice(), 0),
            PageMap::ScratchHw => (self.scratch_hw.as_slice(), 0),
        }
    }

    #[inline(always)]
    fn backing_mut(&mut self, entry: PageMap) -> (&mut [u8], usize) {
        match entry {
            PageMap::Ram(base) => (self.ram.as_mut_slice(), base as usize),
            PageMap::Rom(base) => (self.rom.as_mut_slice(), base as usize),
            PageMap::Parallel => (self.parallel.as_mut_slice(), 0),
            PageMap::ScratchHw => (self.scratch_hw.as_mut_slice(), 0),
        }
    }

    /// Read a byte through a resolved page mapping.
    #[inline]
    pub fn read_mapped_u8(&self, entry: PageMap, address: u32) -> u8 {
        let (buf, base) = self.backing(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        buf.get(i).copied().unwrap_or(0)
    }

    /// Read a little-endian halfword through a resolved page mapping.
    #[inline]
    pub fn read_mapped_u16(&self, entry: PageMap, address: u32) -> u16 {
        let (buf, base) = self.backing(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        u16::from_le_bytes([
            buf.get(i).copied().unwrap_or(0),
            buf.get(i + 1).copied().unwrap_or(0),
        ])
    }

    /// Read a little-endian word through a resolved page mapping.
    #[inline]
    pub fn read_mapped_u32(&self, entry: PageMap, address: u32) -> u32 {
        let (buf, base) = self.backing(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        u32::from_le_bytes([
            buf.get(i).copied().unwrap_or(0),
            buf.get(i + 1).copied().unwrap_or(0),
            buf.get(i + 2).copied().unwrap_or(0),
            buf.get(i + 3).copied().unwrap_or(0),
        ])
    }

    /// Write a byte through a resolved page mapping. Bytes past the end of
    /// the backing buffer are dropped.
    #[inline]
    pub fn write_mapped_u8(&mut self, entry: PageMap, address: u32, value: u8) {
        let (buf, base) = self.backing_mut(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        if let Some(b) = buf.get_mut(i) {
            *b = value;
        }
    }

    /// Write a little-endian halfword through a resolved page mapping.
    #[inline]
    pub fn write_mapped_u16(&mut self, entry: PageMap, address: u32, value: u16) {
        let (buf, base) = self.backing_mut(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        for (k, byte) in value.to_le_bytes().into_iter().enumerate() {
            if let Some(b) = buf.get_mut(i + k) {
                *b = byte;
            }
        }
    }

    /// Write a little-endian word through a resolved page mapping.
    #[inline]
    pub fn write_mapped_u32(&mut self, entry: PageMap, address: u32, value: u32) {
        let (buf, base) = self.backing_mut(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        for (k, byte) in value.to_le_bytes().into_iter().enumerate() {
            if let Some(b) = buf.get_mut(i + k) {
                *b = byte;
            }
        }
    }

    /// Scratch pad read (addresses below the hardware-register split).
    #[inline(always)]
    pub fn scratch_read8(&self, address: u32) -> u8 {
        self.scratch_hw[(address & map::OFFSET_MASK) as usize]
    }

    #[inline(always)]
    pub fn scratch_read16(&self, address: u32) -> u16 {
        self.read_mapped_u16(PageMap::ScratchHw, address)
    }

    #[inline(always)]
    pub fn scratch_read32(&self, address: u32) -> u32 {
        self.read_mapped_u32(PageMap::ScratchHw, address)
    }

    /// Scratch pad write.
    #[inline(always)]
    pub fn scratch_write8(&mut self, address: u32, value: u8) {
        self.scratch_hw[(address & map::OFFSET_MASK) as usize] = value;
    }

    #[inline(always)]
    pub fn scratch_write16(&mut self, address: u32, value: u16) {
        self.write_mapped_u16(PageMap::ScratchHw, address, value);
    }

    #[inline(always)]
    pub fn scratch_write32(&mut self, address: u32, value: u32) {
        self.write_mapped_u32(PageMap::ScratchHw, address, value);
    }

    /// Whether RAM pages are currently writable through the write table.
    #[inline]
    pub fn write_ok(&self) -> bool {
        self.write_ok
    }

    /// Service a write to the cache-control register.
    ///
    /// `0x800`/`0x804` withdraw the RAM write mappings (all three mirror
    /// blocks); `0x00`/`0x1e988` restore them. Redundant requests and
    /// unrecognized values change nothing, so repeating a command is
    /// idempotent. The caller is responsible for dropping cached decoded
    /// instructions when `Withdrawn` is returned.
    pub fn cache_control(&mut self, value: u32) -> ProtectChange {
        match value {
            0x800 | 0x804 => {
                if !self.write_ok {
                    return ProtectChange::Unchanged;
                }
                self.write_ok = false;
                for base in map::RAM_MIRROR_PAGES {
                    for page in 0..map::RAM_PAGES {
                        self.wlut[(base + page) as usize] = None;
                    }
                }
                ProtectChange::Withdrawn
            }
            0x00 | 0x1e988 => {
                if self.write_ok {
                    return ProtectChange::Unchanged;
                }
                self.write_ok = true;
                for base in map::RAM_MIRROR_PAGES {
                    for page in 0..map::RAM_PAGES {
                        self.wlut[(base + page) as usize] =
                            Some(PageMap::Ram((page & map::RAM_PAGE_MASK) << 16));
                    }
                }
                ProtectChange::Restored
            }
            _ => ProtectChange::Unchanged,
        }
    }

    /// Fast-path read resolution for the recompiler: the slice from the
    /// addressed byte to the end of the page's backing, or `None` for an
    /// unmapped page.
    pub fn resolve_read(&self, address: u32) -> Option<&[u8]> {
        let entry = self.read_lut(address >> 16)?;
        let (buf, base) = self.backing(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        buf.get(i..)
    }

    /// Fast-path write resolution. The result must be revalidated whenever
    /// the protection state changes: withdrawn RAM pages resolve to `None`.
    pub fn resolve_write(&mut self, address: u32) -> Option<&mut [u8]> {
        let entry = self.write_lut(address >> 16)?;
        let (buf, base) = self.backing_mut(entry);
        let i = base + (address & map::OFFSET_MASK) as usize;
        buf.get_mut(i..)
    }

    /// Copy a full image into ROM. The BIOS loader stages the image first,
    /// so a truncated read never reaches this point.
    pub fn load_rom(&mut self, image: &[u8]) {
        debug_assert_eq!(image.len(), map::ROM_SIZE);
        self.rom[..image.len()].copy_from_slice(image);
    }

    /// Direct view of ROM, used by tests and the CLI.
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
