//! FreeBSD sources, a partial variant: named parameters come from the
//! `sysctl` utility, swap usage from `pstat`, the mount table from
//! `getmntinfo`. Fan speed and the partition-name lookup have no FreeBSD
//! data source and stay unset.

use std::ffi::CStr;
use std::process::Command;
use std::ptr;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use super::{CpuSource, DiskSource, FsStats, MemSource, RawModel, SampleCache, SwapSource};

#[derive(Debug, Default)]
pub struct CpuProbe;

impl CpuSource for CpuProbe {
    fn core_count(&mut self) -> Option<u32> {
        sysctl_value("hw.ncpu")?.parse().ok()
    }

    fn model(&mut self) -> Option<RawModel> {
        let model = sysctl_value("hw.model")?;
        Some(RawModel {
            model,
            speed_ghz: clock_mhz().map(|mhz| mhz / 1000.0),
        })
    }

    fn load_avg(&mut self) -> Option<[f64; 3]> {
        // Printed as "{ 0.12 0.34 0.56 }"; the braces are dropped by the
        // numeric parse.
        let raw = sysctl_value("vm.loadavg")?;
        let loads: Vec<f64> = raw
            .split_whitespace()
            .filter_map(|field| field.parse().ok())
            .collect();
        match loads[..] {
            [one, five, fifteen] => Some([one, five, fifteen]),
            _ => None,
        }
    }

    fn fan_rpm(&mut self) -> Option<u32> {
        None
    }

    fn temp_celsius(&mut self) -> Option<f64> {
        // Reported like "45.0C".
        let raw = sysctl_value("dev.cpu.0.temperature")?;
        raw.trim_end_matches('C').parse().ok()
    }

    fn uptime_seconds(&mut self) -> Option<u64> {
        // kern.boottime prints "{ sec = 1690000000, usec = 123456 } ...".
        let raw = sysctl_value("kern.boottime")?;
        let pattern = Regex::new(r"sec = ([0-9]+)").ok()?;
        let boot: u64 = pattern.captures(&raw)?[1].parse().ok()?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        now.checked_sub(boot)
    }
}

fn clock_mhz() -> Option<f64> {
    sysctl_value("hw.cpuspeed")
        .or_else(|| sysctl_value("hw.clockrate"))?
        .parse()
        .ok()
}

#[derive(Debug, Default)]
pub struct MemProbe;

impl MemSource for MemProbe {
    fn used_bytes(&mut self) -> Option<u64> {
        let page_size: u64 = sysctl_value("hw.pagesize")?.parse().ok()?;
        let mut pages: u64 = 0;
        for counter in ["vm.stats.vm.v_active_count", "vm.stats.vm.v_wire_count"] {
            pages += sysctl_value(counter)?.parse::<u64>().ok()?;
        }
        Some(pages * page_size)
    }

    fn total_bytes(&mut self) -> Option<u64> {
        sysctl_value("hw.realmem")?.parse().ok()
    }
}

#[derive(Debug, Default)]
pub struct SwapProbe;

impl SwapSource for SwapProbe {
    fn used_bytes(&mut self, _total_bytes: u64) -> Option<u64> {
        let output = Command::new("pstat").arg("-s").output().ok()?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Some(pstat_used_kib(&listing) << 10)
    }

    fn total_bytes(&mut self) -> Option<u64> {
        sysctl_value("vm.swap_total")?.parse().ok()
    }
}

/// Sums the used column (KiB) of every device row in `pstat -s` output.
fn pstat_used_kib(listing: &str) -> u64 {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(2))
        .filter_map(|used| used.parse::<u64>().ok())
        .sum()
}

/// One row of the `getmntinfo` mount table.
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
        None
    }

    fn mount_dir(&mut self, _device: &str) -> Option<String> {
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
            block_size: fs.f_bsize,
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

/// One value from the `sysctl` utility, trimmed.
fn sysctl_value(name: &str) -> Option<String> {
    let output = Command::new("sysctl").args(["-n", name]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pstat_sums_used_column() {
        let listing = "\
Device          1K-blocks     Used    Avail Capacity\n\
/dev/ada0p3       2097152   131072  1966080     6%\n\
/dev/ada1p2       1048576    65536   983040     6%\n";
        assert_eq!(pstat_used_kib(listing), 131_072 + 65_536);
    }

    #[test]
    fn pstat_empty_listing_sums_to_zero() {
        assert_eq!(pstat_used_kib(""), 0);
    }
}
