//! Darwin sources: `sysctlbyname` for scalar and struct parameters, a
//! spawned `vm_stat` for page counts, `getmntinfo` for the mount table.

use std::ffi::{CStr, CString, c_void};
use std::mem::{self, MaybeUninit};
use std::process::Command;
use std::ptr;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use super::{CpuSource, DiskSource, FsStats, MemSource, RawModel, SampleCache, SwapSample, SwapSource};

/// Pages reported by `vm_stat` are 4 KiB.
const PAGE_SHIFT: u32 = 12;

#[derive(Debug, Default)]
pub struct CpuProbe;

impl CpuSource for CpuProbe {
    fn core_count(&mut self) -> Option<u32> {
        let cores: libc::c_int = sysctl_copy("hw.logicalcpu_max")?;
        u32::try_from(cores).ok()
    }

    fn model(&mut self) -> Option<RawModel> {
        // Brand strings already carry a textual clock speed; there is no
        // separate frequency lookup.
        let model = sysctl_string("machdep.cpu.brand_string")?;
        Some(RawModel {
            model,
            speed_ghz: None,
        })
    }

    fn load_avg(&mut self) -> Option<[f64; 3]> {
        load_from_sysctl()
    }

    fn fan_rpm(&mut self) -> Option<u32> {
        None
    }

    fn temp_celsius(&mut self) -> Option<f64> {
        None
    }

    fn uptime_seconds(&mut self) -> Option<u64> {
        let boot: libc::timeval = sysctl_copy("kern.boottime")?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        now.checked_sub(boot.tv_sec as u64)
    }
}

#[derive(Debug, Default)]
pub struct MemProbe;

impl MemSource for MemProbe {
    fn used_bytes(&mut self) -> Option<u64> {
        let output = Command::new("vm_stat").output().ok()?;
        let listing = String::from_utf8_lossy(&output.stdout);
        vm_stat_used_pages(&listing).map(|pages| pages << PAGE_SHIFT)
    }

    fn total_bytes(&mut self) -> Option<u64> {
        sysctl_copy::<u64>("hw.memsize")
    }
}

#[derive(Debug, Default)]
pub struct SwapProbe {
    usage: SampleCache<SwapSample>,
}

impl SwapSource for SwapProbe {
    fn used_bytes(&mut self, _total_bytes: u64) -> Option<u64> {
        self.sample().map(|sample| sample.used_bytes)
    }

    fn total_bytes(&mut self) -> Option<u64> {
        self.sample().map(|sample| sample.total_bytes)
    }
}

impl SwapProbe {
    /// Used and total come from the one `vm.swapusage` struct; the query is
    /// single-shot per process, so both getters share a cached sample.
    fn sample(&mut self) -> Option<SwapSample> {
        self.usage.get_or_query(|| {
            let usage: libc::xsw_usage = sysctl_copy("vm.swapusage")?;
            Some(SwapSample {
                used_bytes: usage.xsu_used,
                total_bytes: usage.xsu_total,
            })
        })
    }
}

/// One row of the `getmntinfo` mount table, plus the block counts needed
/// for the statistics getters.
#[derive(Clone, Debug)]
struct MountSnapshot {
    device: String,
    dir: String,
    fs_type: String,
    block_size: u64,
    blocks: u64,
    blocks_free: u64,
}

#[derive(Debug, Default)]
pub struct DiskProbe {
    entry: SampleCache<MountSnapshot>,
}

impl DiskSource for DiskProbe {
    fn device(&mut self, mount_point: &str) -> Option<String> {
        self.entry
            .get_or_query(|| lookup_mount(mount_point))
            .map(|snapshot| snapshot.device)
    }

    fn device_name(&mut self, _device: &str) -> Option<String> {
        // No sysfs equivalent to read a partition label from.
        None
    }

    fn mount_dir(&mut self, _device: &str) -> Option<String> {
        // device() has already pinned the snapshot for the record's target.
        self.entry.cached().map(|snapshot| snapshot.dir)
    }

    fn fs_type(&mut self, _device: &str) -> Option<String> {
        self.entry.cached().map(|snapshot| snapshot.fs_type)
    }

    fn fs_stats(&mut self, _mount_point: &str) -> Option<FsStats> {
        let snapshot = self.entry.cached()?;
        Some(FsStats {
            used_bytes: snapshot.blocks.saturating_sub(snapshot.blocks_free) * snapshot.block_size,
            total_bytes: snapshot.blocks * snapshot.block_size,
        })
    }
}

fn lookup_mount(mount_point: &str) -> Option<MountSnapshot> {
    let mut entries: *mut libc::statfs = ptr::null_mut();
    // SAFETY: getmntinfo hands back a kernel-owned array; it must not be
    // freed by the caller.
    let count = unsafe { libc::getmntinfo(&mut entries, libc::MNT_NOWAIT) };
    if count <= 0 || entries.is_null() {
        return None;
    }
    let table = unsafe { std::slice::from_raw_parts(entries, count as usize) };
    table
        .iter()
        .find(|fs| cstr_field(&fs.f_mntonname) == mount_point)
        .map(|fs| MountSnapshot {
            device: cstr_field(&fs.f_mntfromname),
            dir: cstr_field(&fs.f_mntonname),
            fs_type: cstr_field(&fs.f_fstypename),
            block_size: u64::from(fs.f_bsize),
            blocks: fs.f_blocks,
            blocks_free: fs.f_bfree,
        })
}

fn cstr_field(raw: &[libc::c_char]) -> String {
    // SAFETY: mount-table name fields are NUL-terminated by the kernel.
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// The kernel's fixed-point load-average struct.
#[repr(C)]
struct LoadAvg {
    ldavg: [u32; 3],
    fscale: libc::c_long,
}

fn load_from_sysctl() -> Option<[f64; 3]> {
    let load: LoadAvg = sysctl_copy("vm.loadavg")?;
    if load.fscale == 0 {
        return None;
    }
    let scale = load.fscale as f64;
    Some([
        f64::from(load.ldavg[0]) / scale,
        f64::from(load.ldavg[1]) / scale,
        f64::from(load.ldavg[2]) / scale,
    ])
}

/// Sums the page counts of `vm_stat` lines whose label reads wired, active
/// or occupied. Success is the listing itself; a sum of zero still counts.
/// The leading space keeps "inactive" out of the active set.
fn vm_stat_used_pages(listing: &str) -> Option<u64> {
    let pattern = Regex::new(r" (wired|active|occupied)[^0-9]+([0-9]+)").ok()?;
    let mut pages: u64 = 0;
    for caps in pattern.captures_iter(listing) {
        if let Ok(count) = caps[2].parse::<u64>() {
            pages += count;
        }
    }
    Some(pages)
}

/// Reads a fixed-size sysctl value. T must be exactly the kernel's binary
/// layout for the named parameter.
fn sysctl_copy<T: Copy>(name: &str) -> Option<T> {
    let c_name = CString::new(name).ok()?;
    let mut value = MaybeUninit::<T>::uninit();
    let mut len = mem::size_of::<T>();
    // SAFETY: value has room for exactly len bytes; sysctlbyname fails
    // rather than overrunning the provided length.
    let rc = unsafe {
        libc::sysctlbyname(
            c_name.as_ptr(),
            value.as_mut_ptr().cast::<c_void>(),
            &mut len,
            ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return None;
    }
    Some(unsafe { value.assume_init() })
}

/// Reads a string sysctl, sized by a first length-only query.
fn sysctl_string(name: &str) -> Option<String> {
    let c_name = CString::new(name).ok()?;
    let mut len: usize = 0;
    // SAFETY: a null buffer with a zero length asks only for the size.
    let rc = unsafe {
        libc::sysctlbyname(c_name.as_ptr(), ptr::null_mut(), &mut len, ptr::null_mut(), 0)
    };
    if rc != 0 || len == 0 {
        return None;
    }
    let mut buf = vec![0u8; len];
    // SAFETY: buf holds len bytes, matching the length passed in.
    let rc = unsafe {
        libc::sysctlbyname(
            c_name.as_ptr(),
            buf.as_mut_ptr().cast::<c_void>(),
            &mut len,
            ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return None;
    }
    buf.truncate(len);
    while buf.last() == Some(&0) {
        buf.pop();
    }
    String::from_utf8(buf).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM_STAT_FIXTURE: &str = "\
Mach Virtual Memory Statistics: (page size of 4096 bytes)\n\
Pages free:                              155584.\n\
Pages active:                            511334.\n\
Pages inactive:                          489008.\n\
Pages speculative:                        22446.\n\
Pages wired down:                        198667.\n\
Pages occupied by compressor:            383286.\n";

    #[test]
    fn vm_stat_sums_used_page_classes() {
        let pages = vm_stat_used_pages(VM_STAT_FIXTURE).unwrap();
        assert_eq!(pages, 511_334 + 198_667 + 383_286);
    }

    #[test]
    fn vm_stat_empty_listing_sums_to_zero() {
        assert_eq!(vm_stat_used_pages(""), Some(0));
    }
}
