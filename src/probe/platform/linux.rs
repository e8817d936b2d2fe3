//! Linux sources: `/proc` pseudo-files, sysfs subtrees, `/etc/mtab`, and
//! `statvfs` for filesystem statistics.

use std::ffi::CString;
use std::fs;
use std::mem::MaybeUninit;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::walk;

use super::{CpuSource, DiskSource, FsStats, MemSource, RawModel, SampleCache, SwapSource};

const CPUINFO: &str = "/proc/cpuinfo";
const LOADAVG: &str = "/proc/loadavg";
const UPTIME: &str = "/proc/uptime";
const MEMINFO: &str = "/proc/meminfo";
const MTAB: &str = "/etc/mtab";

const CPU_SYSFS: &str = "/sys/devices/system/cpu/";
const PLATFORM_SYSFS: &str = "/sys/devices/platform/";

/// Per-core frequency limit files, whichever the kernel exposes first.
const FREQ_PATTERN: &str = r"(bios_limit|(scaling|cpuinfo)_max_freq)$";
/// How many sysfs candidates a frequency or sensor search will look at
/// before giving up.
const SEARCH_CAP: usize = 512;

/// Labels whose KiB values add to used memory, and those that subtract.
const MEM_ADD: [&str; 2] = ["MemTotal", "Shmem"];
const MEM_SUB: [&str; 4] = ["MemFree", "Buffers", "Cached", "SReclaimable"];

#[derive(Debug, Default)]
pub struct CpuProbe;

impl CpuSource for CpuProbe {
    fn core_count(&mut self) -> Option<u32> {
        let cpuinfo = fs::read_to_string(CPUINFO).ok()?;
        Some(count_processors(&cpuinfo))
    }

    fn model(&mut self) -> Option<RawModel> {
        let cpuinfo = fs::read_to_string(CPUINFO).ok()?;
        let model = parse_model_name(&cpuinfo)?;
        Some(RawModel {
            model,
            speed_ghz: max_freq_ghz(Path::new(CPU_SYSFS)),
        })
    }

    fn load_avg(&mut self) -> Option<[f64; 3]> {
        let loadavg = fs::read_to_string(LOADAVG).ok()?;
        parse_load(&loadavg)
    }

    fn fan_rpm(&mut self) -> Option<u32> {
        let pattern = Regex::new(r"fan1_input$").ok()?;
        let path = walk::find_first(Path::new(PLATFORM_SYSFS), &pattern)?;
        read_integer(&path).map(|rpm| rpm as u32)
    }

    fn temp_celsius(&mut self) -> Option<f64> {
        hwmon_temp(Path::new(PLATFORM_SYSFS))
    }

    fn uptime_seconds(&mut self) -> Option<u64> {
        let uptime = fs::read_to_string(UPTIME).ok()?;
        parse_uptime(&uptime)
    }
}

#[derive(Debug, Default)]
pub struct MemProbe;

impl MemSource for MemProbe {
    fn used_bytes(&mut self) -> Option<u64> {
        let meminfo = fs::read_to_string(MEMINFO).ok()?;
        parse_mem_used(&meminfo)
    }

    fn total_bytes(&mut self) -> Option<u64> {
        let meminfo = fs::read_to_string(MEMINFO).ok()?;
        meminfo_field(&meminfo, "MemTotal").map(|kib| kib << 10)
    }
}

#[derive(Debug, Default)]
pub struct SwapProbe;

impl SwapSource for SwapProbe {
    fn used_bytes(&mut self, total_bytes: u64) -> Option<u64> {
        let meminfo = fs::read_to_string(MEMINFO).ok()?;
        let free = meminfo_field(&meminfo, "SwapFree").map(|kib| kib << 10)?;
        // A free reading above the known total means the total never
        // resolved; report failure rather than an underflowed value.
        total_bytes.checked_sub(free)
    }

    fn total_bytes(&mut self) -> Option<u64> {
        let meminfo = fs::read_to_string(MEMINFO).ok()?;
        meminfo_field(&meminfo, "SwapTotal").map(|kib| kib << 10)
    }
}

#[derive(Debug, Default)]
pub struct DiskProbe {
    stats: SampleCache<FsStats>,
}

impl DiskSource for DiskProbe {
    fn device(&mut self, mount_point: &str) -> Option<String> {
        let mtab = fs::read_to_string(MTAB).ok()?;
        mount_entries(&mtab)
            .find(|entry| entry.dir == mount_point)
            .map(|entry| entry.device.to_string())
    }

    fn device_name(&mut self, device: &str) -> Option<String> {
        let uevent = fs::read_to_string(sysfs_uevent_path(device)?).ok()?;
        parse_partname(&uevent)
    }

    fn mount_dir(&mut self, device: &str) -> Option<String> {
        let mtab = fs::read_to_string(MTAB).ok()?;
        mount_entries(&mtab)
            .find(|entry| entry.device == device)
            .map(|entry| entry.dir.to_string())
    }

    fn fs_type(&mut self, device: &str) -> Option<String> {
        let mtab = fs::read_to_string(MTAB).ok()?;
        mount_entries(&mtab)
            .find(|entry| entry.device == device)
            .map(|entry| entry.fs_type.to_string())
    }

    fn fs_stats(&mut self, mount_point: &str) -> Option<FsStats> {
        // statvfs output cannot change meaningfully within one run, so one
        // sample serves both the used and total getters.
        self.stats.get_or_query(|| statvfs_stats(mount_point))
    }
}

fn count_processors(cpuinfo: &str) -> u32 {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("processor"))
        .count() as u32
}

fn parse_model_name(cpuinfo: &str) -> Option<String> {
    let pattern = Regex::new(r"model name\s+: (.*)").ok()?;
    Some(pattern.captures(cpuinfo)?[1].to_string())
}

/// First nonzero frequency-limit value under the cpufreq sysfs tree,
/// reported by the kernel in kHz, as GHz.
fn max_freq_ghz(base: &Path) -> Option<f64> {
    let pattern = Regex::new(FREQ_PATTERN).ok()?;
    for path in walk::find_all(base, &pattern, SEARCH_CAP) {
        match read_integer(&path) {
            Some(khz) if khz > 0 => return Some(khz as f64 / 1e6),
            _ => {}
        }
    }
    None
}

/// Two-stage hwmon search: find a sensor directory whose `name` file reads
/// like a temperature sensor, then the first nonzero `temp[0-9]_input`
/// below it, in millidegrees.
fn hwmon_temp(base: &Path) -> Option<f64> {
    let name_pattern = Regex::new("name$").ok()?;
    let input_pattern = Regex::new(r"temp[0-9]_input").ok()?;

    let name_file = walk::find_all(base, &name_pattern, SEARCH_CAP)
        .into_iter()
        .find(|path| fs::read_to_string(path).is_ok_and(|contents| contents.contains("temp")))?;
    let sensor_dir = name_file.parent()?.to_path_buf();

    for path in walk::find_all(&sensor_dir, &input_pattern, SEARCH_CAP) {
        match read_integer(&path) {
            Some(milli) if milli > 0 => return Some(milli as f64 / 1000.0),
            _ => {}
        }
    }
    None
}

fn parse_load(loadavg: &str) -> Option<[f64; 3]> {
    let mut fields = loadavg.split_whitespace();
    let one = fields.next()?.parse().ok()?;
    let five = fields.next()?.parse().ok()?;
    let fifteen = fields.next()?.parse().ok()?;
    Some([one, five, fifteen])
}

fn parse_uptime(uptime: &str) -> Option<u64> {
    let seconds: f64 = uptime.split_whitespace().next()?.parse().ok()?;
    Some(seconds as u64)
}

/// Sums the add-set and subtracts the free-set of `/proc/meminfo` lines,
/// scaling KiB to bytes.
fn parse_mem_used(meminfo: &str) -> Option<u64> {
    let mut used: i64 = 0;
    for line in meminfo.lines() {
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kib) = rest
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<i64>().ok())
        else {
            continue;
        };
        if MEM_ADD.contains(&label) {
            used += kib << 10;
        } else if MEM_SUB.contains(&label) {
            used -= kib << 10;
        }
    }
    u64::try_from(used).ok()
}

/// The KiB value of one exact `/proc/meminfo` label.
fn meminfo_field(meminfo: &str, label: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let (key, rest) = line.split_once(':')?;
        if key != label {
            return None;
        }
        rest.split_whitespace().next()?.parse().ok()
    })
}

struct MountEntry<'a> {
    device: &'a str,
    dir: &'a str,
    fs_type: &'a str,
}

fn mount_entries(mtab: &str) -> impl Iterator<Item = MountEntry<'_>> {
    mtab.lines().filter_map(|line| {
        let mut columns = line.split_whitespace();
        Some(MountEntry {
            device: columns.next()?,
            dir: columns.next()?,
            fs_type: columns.next()?,
        })
    })
}

/// Splits a partition device like `/dev/sda1` into its base name and
/// partition number, yielding the sysfs uevent path
/// `/sys/block/sda/sda1/uevent`.
fn sysfs_uevent_path(device: &str) -> Option<String> {
    let pattern = Regex::new(r"/dev/([^0-9]+)([0-9]+)").ok()?;
    let caps = pattern.captures(device)?;
    Some(format!("/sys/block/{}/{}{}/uevent", &caps[1], &caps[1], &caps[2]))
}

fn parse_partname(uevent: &str) -> Option<String> {
    uevent
        .lines()
        .find_map(|line| line.strip_prefix("PARTNAME="))
        .map(str::to_string)
}

/// First whitespace-delimited integer in a sysfs value file.
fn read_integer(path: &Path) -> Option<u64> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), %err, "unreadable sysfs value");
            return None;
        }
    };
    contents.split_whitespace().next()?.parse().ok()
}

fn statvfs_stats(mount_point: &str) -> Option<FsStats> {
    let c_path = CString::new(mount_point).ok()?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: c_path is a valid NUL-terminated string and stat points at
    // uninitialized memory of the exact type statvfs fills in.
    if unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) } != 0 {
        return None;
    }
    let stat = unsafe { stat.assume_init() };
    let fragment = stat.f_frsize as u64;
    let blocks = stat.f_blocks as u64;
    let free = stat.f_bfree as u64;
    Some(FsStats {
        used_bytes: blocks.saturating_sub(free) * fragment,
        total_bytes: blocks * fragment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO_FIXTURE: &str = "\
processor\t: 0\n\
vendor_id\t: GenuineIntel\n\
model name\t: Intel(R) Core(TM) i5-7200U CPU @ 2.50GHz\n\
processor\t: 1\n\
model name\t: Intel(R) Core(TM) i5-7200U CPU @ 2.50GHz\n";

    const MEMINFO_FIXTURE: &str = "\
MemTotal:        8000000 kB\n\
MemFree:         2000000 kB\n\
MemAvailable:    4000000 kB\n\
Buffers:          100000 kB\n\
Cached:           500000 kB\n\
SwapCached:         4000 kB\n\
SReclaimable:      50000 kB\n\
Shmem:             10000 kB\n\
SwapTotal:       2097148 kB\n\
SwapFree:        2000000 kB\n";

    const MTAB_FIXTURE: &str = "\
/dev/sda1 / ext4 rw,relatime 0 0\n\
tmpfs /tmp tmpfs rw,nosuid 0 0\n\
/dev/sda2 /home ext4 rw,relatime 0 0\n";

    #[test]
    fn counts_processor_lines() {
        assert_eq!(count_processors(CPUINFO_FIXTURE), 2);
        assert_eq!(count_processors(""), 0);
    }

    #[test]
    fn extracts_first_model_name() {
        assert_eq!(
            parse_model_name(CPUINFO_FIXTURE).unwrap(),
            "Intel(R) Core(TM) i5-7200U CPU @ 2.50GHz"
        );
        assert!(parse_model_name("flags\t: fpu vme\n").is_none());
    }

    #[test]
    fn load_parses_three_floats() {
        assert_eq!(
            parse_load("0.52 0.58 0.59 1/257 8142\n").unwrap(),
            [0.52, 0.58, 0.59]
        );
        assert!(parse_load("0.52 0.58\n").is_none());
    }

    #[test]
    fn uptime_truncates_to_whole_seconds() {
        assert_eq!(parse_uptime("85516.72 334511.83\n").unwrap(), 85516);
        assert!(parse_uptime("").is_none());
    }

    #[test]
    fn mem_used_sums_contributors() {
        // (8000000 + 10000 - 2000000 - 100000 - 500000 - 50000) KiB
        let expected = 5_360_000 * 1024;
        assert_eq!(parse_mem_used(MEMINFO_FIXTURE).unwrap(), expected);
    }

    #[test]
    fn mem_used_ignores_swap_cached() {
        // "SwapCached" must not match the "Cached" subtract set.
        let with = parse_mem_used(MEMINFO_FIXTURE).unwrap();
        let without = parse_mem_used(&MEMINFO_FIXTURE.replace("SwapCached:         4000 kB\n", ""));
        assert_eq!(Some(with), without);
    }

    #[test]
    fn meminfo_field_is_exact_label_match() {
        assert_eq!(
            meminfo_field(MEMINFO_FIXTURE, "MemTotal").unwrap(),
            8_000_000
        );
        assert_eq!(
            meminfo_field(MEMINFO_FIXTURE, "SwapTotal").unwrap(),
            2_097_148
        );
        assert!(meminfo_field(MEMINFO_FIXTURE, "Mem").is_none());
    }

    #[test]
    fn swap_used_subtracts_free_from_total() {
        let total = meminfo_field(MEMINFO_FIXTURE, "SwapTotal").unwrap() << 10;
        let free = meminfo_field(MEMINFO_FIXTURE, "SwapFree").unwrap() << 10;
        assert_eq!(total - free, (2_097_148 - 2_000_000) * 1024);
    }

    #[test]
    fn mount_lookup_by_dir_and_device() {
        let device = mount_entries(MTAB_FIXTURE)
            .find(|entry| entry.dir == "/")
            .map(|entry| entry.device.to_string());
        assert_eq!(device.as_deref(), Some("/dev/sda1"));

        let fs_type = mount_entries(MTAB_FIXTURE)
            .find(|entry| entry.device == "/dev/sda2")
            .map(|entry| entry.fs_type.to_string());
        assert_eq!(fs_type.as_deref(), Some("ext4"));

        assert!(
            mount_entries(MTAB_FIXTURE)
                .find(|entry| entry.dir == "/nonexistent")
                .is_none()
        );
    }

    #[test]
    fn uevent_path_splits_partition_number() {
        assert_eq!(
            sysfs_uevent_path("/dev/sda1").unwrap(),
            "/sys/block/sda/sda1/uevent"
        );
        // No trailing partition number means no sysfs mapping.
        assert!(sysfs_uevent_path("tmpfs").is_none());
    }

    #[test]
    fn partname_comes_from_uevent() {
        let uevent = "MAJOR=8\nMINOR=1\nDEVNAME=sda1\nDEVTYPE=partition\nPARTNAME=root\n";
        assert_eq!(parse_partname(uevent).as_deref(), Some("root"));
        assert!(parse_partname("DEVTYPE=disk\n").is_none());
    }

    #[test]
    fn freq_search_takes_first_nonzero_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let cpu0 = dir.path().join("cpu0/cpufreq");
        let cpu1 = dir.path().join("cpu1/cpufreq");
        fs::create_dir_all(&cpu0).unwrap();
        fs::create_dir_all(&cpu1).unwrap();
        fs::write(cpu0.join("scaling_max_freq"), "0\n").unwrap();
        fs::write(cpu1.join("cpuinfo_max_freq"), "3500000\n").unwrap();
        assert_eq!(max_freq_ghz(dir.path()).unwrap(), 3.5);
    }

    #[test]
    fn hwmon_temp_skips_non_temperature_sensors() {
        let dir = tempfile::tempdir().unwrap();
        let fan = dir.path().join("hwmon0");
        let core = dir.path().join("hwmon1");
        fs::create_dir_all(&fan).unwrap();
        fs::create_dir_all(&core).unwrap();
        fs::write(fan.join("name"), "fanctl\n").unwrap();
        fs::write(core.join("name"), "coretemp\n").unwrap();
        fs::write(core.join("temp1_input"), "47500\n").unwrap();
        assert_eq!(hwmon_temp(dir.path()).unwrap(), 47.5);
    }

    #[test]
    fn hwmon_temp_without_sensors_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(hwmon_temp(dir.path()).is_none());
    }
}
