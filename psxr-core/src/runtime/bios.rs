//! BIOS Image Loader / Mode Selector
//!
//! Once per reset, decide whether a real BIOS image backs ROM or the HLE
//! tables substitute for every BIOS entry point. A missing, unreadable or
//! truncated image is never fatal: the machine falls back to HLE mode with
//! a log note and ROM stays zeroed. The image format is an opaque 512KB
//! blob; only its length is validated.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::{info, warn};

use crate::config::{BiosDevice, Config};
use crate::error::BiosError;
use crate::runtime::memory::{map, Memory};

/// How BIOS calls are serviced for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosMode {
    /// No usable image; the HLE tables substitute for every BIOS call.
    Hle,
    /// A user-provided image backs ROM. HLE vectors may still intercept.
    UserDefinedImage,
}

/// Source of BIOS image bytes. Reads are positioned; callers treat any read
/// shorter than requested as a failure.
pub trait BiosImage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BiosError>;
}

/// File-backed BIOS image.
pub struct FileBiosImage {
    file: File,
}

impl FileBiosImage {
    pub fn open(path: &Path) -> Result<Self, BiosError> {
        Ok(Self {
            file: File::open(path)?,
        })
    }
}

impl BiosImage for FileBiosImage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BiosError> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            let n = self.file.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }
}

/// Probe the image, then read exactly one ROM's worth of bytes into a
/// staging buffer. A short read at either step is an error, so a truncated
/// image can never be partially applied.
pub fn read_rom(image: &mut dyn BiosImage) -> Result<Vec<u8>, BiosError> {
    let mut probe = [0u8; 4];
    let n = image.read_at(0, &mut probe)?;
    if n != probe.len() {
        return Err(BiosError::ShortRead {
            expected: probe.len(),
            actual: n,
        });
    }

    let mut rom = vec![0u8; map::ROM_SIZE];
    let n = image.read_at(0, &mut rom)?;
    if n != map::ROM_SIZE {
        return Err(BiosError::ShortRead {
            expected: map::ROM_SIZE,
            actual: n,
        });
    }
    Ok(rom)
}

/// Stage a full image from the source and copy it into ROM.
pub fn apply_image(image: &mut dyn BiosImage, mem: &mut Memory) -> Result<(), BiosError> {
    let rom = read_rom(image)?;
    mem.load_rom(&rom);
    Ok(())
}

/// Decide the BIOS mode for this session, loading ROM on success. The
/// decision is one-directional: it holds until the next reset.
pub fn select_mode(config: &Config, mem: &mut Memory) -> BiosMode {
    let path = match (&config.bios_path, config.bios_device) {
        (Some(path), BiosDevice::Image) => path,
        _ => return BiosMode::Hle,
    };

    let result = FileBiosImage::open(path).and_then(|mut image| apply_image(&mut image, mem));
    match result {
        Ok(()) => {
            info!("using BIOS image {}", path.display());
            BiosMode::UserDefinedImage
        }
        Err(err) => {
            warn!(
                "BIOS image {} unusable ({}); falling back to HLE",
                path.display(),
                err
            );
            BiosMode::Hle
        }
    }
}
