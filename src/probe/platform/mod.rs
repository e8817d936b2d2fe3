//! Per-domain OS sources. Each probe record owns one source instance; the
//! concrete type is selected at compile time, so shared probe logic never
//! branches on the platform.

use once_cell::unsync::OnceCell;

/// Raw CPU identity as the platform reports it, before normalization.
#[derive(Clone, Debug)]
pub struct RawModel {
    pub model: String,
    /// Resolved maximum clock in GHz, when the platform exposes one
    /// separately from the model string.
    pub speed_ghz: Option<f64>,
}

/// One filesystem-statistics sample for a mount point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FsStats {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// One swap-usage sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapSample {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

pub trait CpuSource {
    fn core_count(&mut self) -> Option<u32>;
    fn model(&mut self) -> Option<RawModel>;
    fn load_avg(&mut self) -> Option<[f64; 3]>;
    fn fan_rpm(&mut self) -> Option<u32>;
    fn temp_celsius(&mut self) -> Option<f64>;
    fn uptime_seconds(&mut self) -> Option<u64>;
}

pub trait MemSource {
    fn used_bytes(&mut self) -> Option<u64>;
    fn total_bytes(&mut self) -> Option<u64>;
}

pub trait SwapSource {
    /// `total_bytes` is the record's already-resolved total; sources that
    /// derive used space from a free-space reading subtract from it.
    fn used_bytes(&mut self, total_bytes: u64) -> Option<u64>;
    fn total_bytes(&mut self) -> Option<u64>;
}

/// Disk resolution follows the record's chain: `device` is keyed by mount
/// point, everything after by the resolved device string.
pub trait DiskSource {
    fn device(&mut self, mount_point: &str) -> Option<String>;
    fn device_name(&mut self, device: &str) -> Option<String>;
    fn mount_dir(&mut self, device: &str) -> Option<String>;
    fn fs_type(&mut self, device: &str) -> Option<String>;
    fn fs_stats(&mut self, mount_point: &str) -> Option<FsStats>;
}

/// Query-once cell for kernel reads that return every field in one shot
/// (the sysctl swap-usage struct, a mount-table snapshot, statvfs). The
/// outcome is cached either way: a failed query is not retried within the
/// process, and a fresh process starts empty.
#[derive(Debug)]
pub struct SampleCache<T: Clone> {
    cell: OnceCell<Option<T>>,
}

impl<T: Clone> Default for SampleCache<T> {
    fn default() -> Self {
        SampleCache {
            cell: OnceCell::new(),
        }
    }
}

impl<T: Clone> SampleCache<T> {
    pub fn get_or_query(&self, query: impl FnOnce() -> Option<T>) -> Option<T> {
        self.cell.get_or_init(query).clone()
    }

    /// The cached value, without querying. `None` until the first
    /// [`get_or_query`](Self::get_or_query) call.
    pub fn cached(&self) -> Option<T> {
        self.cell.get().cloned().flatten()
    }
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{CpuProbe, DiskProbe, MemProbe, SwapProbe};

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{CpuProbe, DiskProbe, MemProbe, SwapProbe};

#[cfg(target_os = "freebsd")]
mod freebsd;
#[cfg(target_os = "freebsd")]
pub use freebsd::{CpuProbe, DiskProbe, MemProbe, SwapProbe};
