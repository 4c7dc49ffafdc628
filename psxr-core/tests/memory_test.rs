//! Unit tests for the memory access facade and address translation

mod utils;

use utils::{fresh_machine, machine_with_recording_cache, RecordingHwBus};

#[test]
fn test_ram_visible_through_all_mirrors() {
    let mut m = fresh_machine();
    m.write32(0x0000_1000, 0xdead_beef);
    assert_eq!(m.read32(0x0000_1000), 0xdead_beef);
    assert_eq!(m.read32(0x8000_1000), 0xdead_beef);
    assert_eq!(m.read32(0xa000_1000), 0xdead_beef);
}

#[test]
fn test_ram_wraps_every_two_megabytes() {
    // Pages 0x20-0x7f repeat the 2MB of physical RAM across the 8MB window.
    let mut m = fresh_machine();
    m.write32(0x8000_0040, 0x1234_5678);
    assert_eq!(m.read32(0x8020_0040), 0x1234_5678);
    assert_eq!(m.read32(0x8040_0040), 0x1234_5678);
}

#[test]
fn test_unmapped_read_returns_zero() {
    let mut m = fresh_machine();
    assert_eq!(m.read32(0x1f90_0000), 0);
    assert_eq!(m.read16(0x7000_0000), 0);
    assert_eq!(m.read8(0xfffe_0000), 0);
}

#[test]
fn test_unmapped_write_is_discarded() {
    let mut m = fresh_machine();
    m.write32(0x7000_0000, 0xffff_ffff);
    assert_eq!(m.read32(0x7000_0000), 0);
}

#[test]
fn test_endianness_round_trip() {
    let mut m = fresh_machine();
    for v in [0u32, 1, 0x7fff_ffff, 0x8000_0000, 0xffff_ffff] {
        m.write32(0x8001_0000, v);
        assert_eq!(m.read32(0x8001_0000), v);
    }
}

#[test]
fn test_guest_memory_is_little_endian() {
    let mut m = fresh_machine();
    m.write32(0x8001_0000, 0x1234_5678);
    assert_eq!(m.read8(0x8001_0000), 0x78);
    assert_eq!(m.read8(0x8001_0003), 0x12);
    assert_eq!(m.read16(0x8001_0002), 0x1234);
}

#[test]
fn test_cycle_accounting() {
    let mut m = fresh_machine();
    let start = m.cpu.cycle;
    m.read8(0x8000_0000);
    assert_eq!(m.cpu.cycle, start); // byte reads are free
    m.read16(0x8000_0000);
    m.read32(0x8000_0000);
    m.write8(0x8000_0000, 0);
    m.write16(0x8000_0000, 0);
    m.write32(0x8000_0000, 0);
    assert_eq!(m.cpu.cycle, start + 5);
}

#[test]
fn test_scratch_pad_round_trip() {
    let mut m = fresh_machine();
    m.write32(0x1f80_0100, 0xcafe_f00d);
    assert_eq!(m.read32(0x1f80_0100), 0xcafe_f00d);
    assert_eq!(m.read8(0x1f80_0100), 0x0d);
}

#[test]
fn test_hardware_registers_route_to_bus() {
    let mut m = fresh_machine();
    let bus = RecordingHwBus {
        read_value: 0xabad_1dea,
        ..Default::default()
    };
    let reads = bus.reads.clone();
    let writes = bus.writes.clone();
    m.hw = Box::new(bus);

    assert_eq!(m.read32(0x1f80_1070), 0xabad_1dea);
    m.write32(0x1f80_1074, 0xffff_ffff);
    assert_eq!(reads.borrow().as_slice(), &[0x1f80_1070]);
    assert_eq!(writes.borrow().as_slice(), &[(0x1f80_1074, 0xffff_ffff)]);
}

#[test]
fn test_scratch_pad_does_not_touch_bus() {
    let mut m = fresh_machine();
    let bus = RecordingHwBus::default();
    let reads = bus.reads.clone();
    m.hw = Box::new(bus);
    m.read32(0x1f80_0000);
    assert!(reads.borrow().is_empty());
}

#[test]
fn test_rom_not_writable_through_facade() {
    let mut m = fresh_machine();
    m.write32(0xbfc0_0000, 0xffff_ffff);
    assert_eq!(m.read32(0xbfc0_0000), 0);
}

#[test]
fn test_mapped_write_notifies_code_cache() {
    let (mut m, log) = machine_with_recording_cache();
    m.write32(0x8000_2000, 1);
    assert_eq!(log.borrow().clears.as_slice(), &[(0x8000_2000, 1)]);
}

#[test]
fn test_narrow_writes_notify_the_containing_word() {
    let (mut m, log) = machine_with_recording_cache();
    m.write8(0x8000_2003, 1);
    m.write16(0x8000_2006, 1);
    assert_eq!(
        log.borrow().clears.as_slice(),
        &[(0x8000_2000, 1), (0x8000_2004, 1)]
    );
}

#[test]
fn test_resolve_read_sees_ram_bytes() {
    let mut m = fresh_machine();
    m.write32(0x8000_3000, 0x0403_0201);
    let slice = m.mem.resolve_read(0x8000_3000).unwrap();
    assert_eq!(&slice[..4], &[0x01, 0x02, 0x03, 0x04]);
    assert!(m.mem.resolve_read(0x7000_0000).is_none());
}

#[test]
fn test_resolve_write_follows_protection_state() {
    let mut m = fresh_machine();
    assert!(m.mem.resolve_write(0x8000_3000).is_some());
    m.write32(0xfffe_0130, 0x800);
    assert!(m.mem.resolve_write(0x8000_3000).is_none());
    m.write32(0xfffe_0130, 0x00);
    assert!(m.mem.resolve_write(0x8000_3000).is_some());
}

#[test]
fn test_reset_zeroes_ram() {
    let mut m = fresh_machine();
    m.write32(0x8000_4000, 0x5555_5555);
    m.reset();
    assert_eq!(m.read32(0x8000_4000), 0);
}

#[test]
fn test_dyna_paths_match_facade() {
    let mut m = fresh_machine();
    m.write32(0x1f80_0200, 0x0102_0304);
    assert_eq!(m.dyna_read32(0x1f80_0200), 0x0102_0304);
    assert_eq!(m.dyna_read16(0x1f80_0200), 0x0304);
    assert_eq!(m.dyna_read8(0x1f80_0203), 0x01);

    m.dyna_write8(0x1f80_0300, 0x7f);
    assert_eq!(m.read8(0x1f80_0300), 0x7f);
    m.dyna_write32(0x1f80_0304, 0x0a0b_0c0d);
    assert_eq!(m.read32(0x1f80_0304), 0x0a0b_0c0d);
}
