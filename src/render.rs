//! Status-line output: one `domain.field:\t<value>` line per field, string
//! values quote-wrapped. Unresolved fields print their sentinel so a bar
//! script always sees every key it asked for. The exact shapes here are
//! presentation, not API.

use std::fmt::Write;

use crate::probe::{CpuInfo, DiskInfo, MemInfo, SwapInfo};

pub fn cpu_report(cpu: &CpuInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "cpu.cores:\t{}", cpu.cores);
    let _ = writeln!(out, "cpu.model:\t\"{}\"", cpu.model);
    let _ = writeln!(
        out,
        "cpu.load:\t{:.2} {:.2} {:.2}",
        cpu.load[0], cpu.load[1], cpu.load[2]
    );
    let _ = writeln!(out, "cpu.usage:\t{:.1}", cpu.usage_percent);
    let _ = writeln!(out, "cpu.fan:\t{}", cpu.fan_rpm);
    let _ = writeln!(out, "cpu.temp:\t{:.1}", cpu.temp_celsius);
    let _ = writeln!(out, "cpu.uptime:\t{}", cpu.uptime_seconds);
    out
}

pub fn mem_report(mem: &MemInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mem.used:\t{}", mem.used_bytes);
    let _ = writeln!(out, "mem.total:\t{}", mem.total_bytes);
    let _ = writeln!(out, "mem.percent:\t{:.1}", mem.percent);
    out
}

pub fn swap_report(swap: &SwapInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "swap.used:\t{}", swap.used_bytes);
    let _ = writeln!(out, "swap.total:\t{}", swap.total_bytes);
    let _ = writeln!(out, "swap.percent:\t{:.1}", swap.percent);
    out
}

pub fn disk_report(disk: &DiskInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "disk.device:\t\"{}\"", disk.device);
    let _ = writeln!(out, "disk.name:\t\"{}\"", disk.name);
    let _ = writeln!(out, "disk.mount:\t\"{}\"", disk.mount_point);
    let _ = writeln!(out, "disk.type:\t\"{}\"", disk.fs_type);
    let _ = writeln!(out, "disk.used:\t{}", disk.used_bytes);
    let _ = writeln!(out, "disk.total:\t{}", disk.total_bytes);
    let _ = writeln!(out, "disk.percent:\t{:.1}", disk.percent);
    out
}
