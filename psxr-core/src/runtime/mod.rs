pub mod bios;
pub mod context;
pub mod hle;
pub mod machine;
pub mod memory;

pub use bios::BiosMode;
pub use context::CpuContext;
pub use machine::Machine;
pub use memory::Memory;
