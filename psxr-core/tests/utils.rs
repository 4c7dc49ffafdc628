//! Test Utilities
//!
//! Recording collaborator implementations and machine builders shared by
//! the integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use psxr_core::error::BiosError;
use psxr_core::runtime::bios::BiosImage;
use psxr_core::runtime::machine::{CodeCache, EventScheduler, HwBus, MediaLoader};
use psxr_core::{Config, CpuContext, Machine};

/// Shared log of code-cache notifications.
#[derive(Default)]
pub struct CacheLog {
    pub clears: Vec<(u32, u32)>,
    pub full_invalidations: u32,
}

#[derive(Clone, Default)]
pub struct RecordingCache(pub Rc<RefCell<CacheLog>>);

impl CodeCache for RecordingCache {
    fn clear(&mut self, address: u32, count: u32) {
        self.0.borrow_mut().clears.push((address, count));
    }

    fn invalidate_all(&mut self) {
        self.0.borrow_mut().full_invalidations += 1;
    }
}

/// Counts branch-test invocations.
#[derive(Clone, Default)]
pub struct CountingScheduler(pub Rc<RefCell<u32>>);

impl EventScheduler for CountingScheduler {
    fn branch_test(&mut self, _cpu: &mut CpuContext) {
        *self.0.borrow_mut() += 1;
    }
}

/// Hardware bus that records writes and serves a canned read value.
#[derive(Clone, Default)]
pub struct RecordingHwBus {
    pub reads: Rc<RefCell<Vec<u32>>>,
    pub writes: Rc<RefCell<Vec<(u32, u32)>>>,
    pub read_value: u32,
}

impl HwBus for RecordingHwBus {
    fn read8(&mut self, address: u32) -> u8 {
        self.reads.borrow_mut().push(address);
        self.read_value as u8
    }
    fn read16(&mut self, address: u32) -> u16 {
        self.reads.borrow_mut().push(address);
        self.read_value as u16
    }
    fn read32(&mut self, address: u32) -> u32 {
        self.reads.borrow_mut().push(address);
        self.read_value
    }
    fn write8(&mut self, address: u32, value: u8) {
        self.writes.borrow_mut().push((address, value as u32));
    }
    fn write16(&mut self, address: u32, value: u16) {
        self.writes.borrow_mut().push((address, value as u32));
    }
    fn write32(&mut self, address: u32, value: u32) {
        self.writes.borrow_mut().push((address, value));
    }
}

/// Media loader recording the bootstrap call order.
#[derive(Clone, Default)]
pub struct RecordingMedia {
    pub calls: Rc<RefCell<Vec<&'static str>>>,
}

impl MediaLoader for RecordingMedia {
    fn check_disc(&mut self) {
        self.calls.borrow_mut().push("check");
    }
    fn load_disc(&mut self) {
        self.calls.borrow_mut().push("load");
    }
    fn disc_label(&self) -> String {
        "TESTDISC".to_string()
    }
}

/// In-memory BIOS image source.
pub struct VecBiosImage(pub Vec<u8>);

impl BiosImage for VecBiosImage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BiosError> {
        let start = (offset as usize).min(self.0.len());
        let n = (self.0.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&self.0[start..start + n]);
        Ok(n)
    }
}

/// Fresh HLE-mode machine after a reset.
pub fn fresh_machine() -> Machine {
    let mut m = Machine::new(Config::default());
    m.reset();
    m
}

/// Machine with a recording code cache installed, plus the log handle.
pub fn machine_with_recording_cache() -> (Machine, Rc<RefCell<CacheLog>>) {
    let mut m = fresh_machine();
    let cache = RecordingCache::default();
    let log = cache.0.clone();
    m.code_cache = Box::new(cache);
    (m, log)
}

/// Machine with a counting scheduler installed, plus the counter handle.
pub fn machine_with_counting_scheduler() -> (Machine, Rc<RefCell<u32>>) {
    let mut m = fresh_machine();
    let scheduler = CountingScheduler::default();
    let count = scheduler.0.clone();
    m.events = Box::new(scheduler);
    (m, count)
}
