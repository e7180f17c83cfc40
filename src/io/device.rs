use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::models::BlockDeviceInfo;
use crate::{BlkBenchError, Result};

/// Read-only access to a block device opened for unbuffered I/O
pub trait BlockDevice {
    /// Smallest unit the device reports as its native block
    fn physical_block_size(&self) -> Result<u32>;

    /// Total addressable bytes
    fn size_bytes(&self) -> Result<u64>;

    /// Transfer alignment recommended by the system, `None` if it has no
    /// recommendation
    fn recommended_alignment(&self) -> Result<Option<usize>>;

    /// Fill `buf` with the bytes starting at `offset`
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()>;
}

/// Query the capabilities the benchmarks need from an open device.
///
/// Alignment falls back to the physical block size when the system has no
/// recommendation or recommends zero.
pub fn probe<D: BlockDevice + ?Sized>(device: &D) -> Result<BlockDeviceInfo> {
    let physical_block_size = device.physical_block_size()?;
    if physical_block_size == 0 {
        return Err(BlkBenchError::CapabilityError(
            "device reports a physical block size of 0".to_string(),
        ));
    }

    let device_size_bytes = device.size_bytes()?;

    let required_alignment = match device.recommended_alignment()? {
        Some(alignment) if alignment > 0 => alignment,
        other => {
            warn!(
                "No usable transfer alignment reported ({:?}), using block size {}",
                other, physical_block_size
            );
            physical_block_size as usize
        }
    };

    if device_size_bytes < u64::from(physical_block_size) {
        return Err(BlkBenchError::CapabilityError(format!(
            "block size ({}) is greater than device itself ({})",
            physical_block_size, device_size_bytes
        )));
    }

    let info = BlockDeviceInfo {
        device_size_bytes,
        block_count: device_size_bytes / u64::from(physical_block_size),
        physical_block_size,
        required_alignment,
    };
    debug!("Probed device: {:?}", info);

    Ok(info)
}

/// A raw block device opened read-only with `O_DIRECT | O_SYNC`
pub struct RawBlockDevice {
    path: PathBuf,
    file: File,
}

impl RawBlockDevice {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RawBlockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBlockDevice")
            .field("path", &self.path)
            .finish()
    }
}

fn read_file_at(file: &mut File, path: &Path, buf: &mut [u8], offset: u64) -> Result<()> {
    file.seek(SeekFrom::Start(offset)).map_err(|e| {
        BlkBenchError::io(format!("seek to {} on {}", offset, path.display()), e)
    })?;
    file.read_exact(buf).map_err(|e| {
        BlkBenchError::io(
            format!(
                "read of {} bytes at {} on {}",
                buf.len(),
                offset,
                path.display()
            ),
            e,
        )
    })
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    // <linux/fs.h> ioctl numbers, built the way _IO/_IOR build them.
    const fn ioc(dir: u64, ty: u64, nr: u64, size: u64) -> u64 {
        (dir << 30) | (size << 16) | (ty << 8) | nr
    }
    const IOC_NONE: u64 = 0;
    const IOC_READ: u64 = 2;
    const BLKPBSZGET: u64 = ioc(IOC_NONE, 0x12, 123, 0);
    const BLKGETSIZE64: u64 = ioc(IOC_READ, 0x12, 114, std::mem::size_of::<usize>() as u64);

    impl RawBlockDevice {
        /// Open `path` read-only, bypassing the page cache
        pub fn open(path: &Path) -> Result<Self> {
            let file = OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_DIRECT | libc::O_SYNC)
                .open(path)
                .map_err(|e| BlkBenchError::io(format!("open {}", path.display()), e))?;

            debug!("Opened {} with O_DIRECT | O_SYNC", path.display());
            Ok(Self {
                path: path.to_path_buf(),
                file,
            })
        }

        fn capability_error(&self, what: &str) -> BlkBenchError {
            BlkBenchError::CapabilityError(format!(
                "{} on {}: {}",
                what,
                self.path.display(),
                std::io::Error::last_os_error()
            ))
        }
    }

    impl BlockDevice for RawBlockDevice {
        fn physical_block_size(&self) -> Result<u32> {
            let mut block_size: libc::c_uint = 0;
            // SAFETY: BLKPBSZGET writes one unsigned int through the pointer.
            let retval = unsafe {
                libc::ioctl(self.file.as_raw_fd(), BLKPBSZGET as _, &mut block_size as *mut libc::c_uint)
            };
            if retval == -1 {
                return Err(self.capability_error("ioctl(BLKPBSZGET)"));
            }
            Ok(block_size)
        }

        fn size_bytes(&self) -> Result<u64> {
            let mut size: u64 = 0;
            // SAFETY: BLKGETSIZE64 writes one u64 through the pointer.
            let retval = unsafe {
                libc::ioctl(self.file.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64)
            };
            if retval == -1 {
                return Err(self.capability_error("ioctl(BLKGETSIZE64)"));
            }
            Ok(size)
        }

        fn recommended_alignment(&self) -> Result<Option<usize>> {
            // fpathconf returns -1 both for "no limit" and for errors; only
            // errno tells them apart.
            // SAFETY: errno is thread-local.
            unsafe { *libc::__errno_location() = 0 };
            // SAFETY: plain query on a valid descriptor.
            let align =
                unsafe { libc::fpathconf(self.file.as_raw_fd(), libc::_PC_REC_XFER_ALIGN) };

            if align == -1 {
                let err = std::io::Error::last_os_error();
                return match err.raw_os_error() {
                    Some(0) | None => Ok(None),
                    Some(_) => Err(BlkBenchError::CapabilityError(format!(
                        "fpathconf(_PC_REC_XFER_ALIGN) on {}: {}",
                        self.path.display(),
                        err
                    ))),
                };
            }

            Ok(Some(align as usize))
        }

        fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
            read_file_at(&mut self.file, &self.path, buf, offset)
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod unsupported_impl {
    use super::*;

    fn unsupported() -> BlkBenchError {
        BlkBenchError::CapabilityError(
            "raw block device queries are only implemented for Linux".to_string(),
        )
    }

    impl RawBlockDevice {
        pub fn open(path: &Path) -> Result<Self> {
            let file = File::open(path)
                .map_err(|e| BlkBenchError::io(format!("open {}", path.display()), e))?;
            Ok(Self {
                path: path.to_path_buf(),
                file,
            })
        }
    }

    impl BlockDevice for RawBlockDevice {
        fn physical_block_size(&self) -> Result<u32> {
            Err(unsupported())
        }

        fn size_bytes(&self) -> Result<u64> {
            Err(unsupported())
        }

        fn recommended_alignment(&self) -> Result<Option<usize>> {
            Err(unsupported())
        }

        fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
            read_file_at(&mut self.file, &self.path, buf, offset)
        }
    }
}
