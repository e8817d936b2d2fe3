use std::process::Command;

use regex::Regex;
use tracing::debug;

use crate::text;

use super::platform::{self, CpuSource};

/// Longest model string the normalization pipeline will grow to.
pub const MAX_MODEL_LEN: usize = 256;

/// CPU identity and instantaneous readings. All fields start unset and are
/// populated getter by getter.
#[derive(Debug, Default)]
pub struct CpuInfo {
    pub cores: u32,
    pub model: String,
    pub load: [f64; 3],
    pub usage_percent: f64,
    pub fan_rpm: u32,
    pub temp_celsius: f64,
    pub uptime_seconds: u64,
    source: platform::CpuProbe,
}

impl CpuInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_cores(&mut self) -> bool {
        match self.source.core_count() {
            Some(cores) => {
                self.cores = cores;
                true
            }
            None => {
                debug!("core count unavailable");
                self.cores = 0;
                false
            }
        }
    }

    /// Reads the raw model string and runs it through the normalization
    /// pipeline. Uses whatever core count is currently stored, so callers
    /// wanting `(N)` in the output resolve cores first.
    pub fn resolve_model(&mut self) -> bool {
        match self.source.model() {
            Some(raw) => {
                self.model = normalize_model(raw.model, self.cores, raw.speed_ghz);
                true
            }
            None => {
                debug!("model name unavailable");
                self.model.clear();
                false
            }
        }
    }

    pub fn resolve_load(&mut self) -> bool {
        match self.source.load_avg() {
            Some(load) => {
                self.load = load;
                true
            }
            None => {
                self.load = [0.0; 3];
                false
            }
        }
    }

    /// Aggregate utilization: the sum of every process's %CPU share divided
    /// by the core count. Shares are sampled per process, not against an
    /// idle baseline, so the result can exceed 100% under measurement skew.
    pub fn resolve_usage(&mut self) -> bool {
        if self.cores == 0 {
            self.resolve_cores();
        }
        if self.cores == 0 {
            self.usage_percent = 0.0;
            return false;
        }
        match process_cpu_sum() {
            Some(sum) => {
                self.usage_percent = sum / f64::from(self.cores);
                true
            }
            None => {
                debug!("process listing unavailable");
                self.usage_percent = 0.0;
                false
            }
        }
    }

    pub fn resolve_fan(&mut self) -> bool {
        match self.source.fan_rpm() {
            Some(rpm) => {
                self.fan_rpm = rpm;
                true
            }
            None => {
                self.fan_rpm = 0;
                false
            }
        }
    }

    pub fn resolve_temp(&mut self) -> bool {
        match self.source.temp_celsius() {
            Some(celsius) => {
                self.temp_celsius = celsius;
                true
            }
            None => {
                self.temp_celsius = 0.0;
                false
            }
        }
    }

    pub fn resolve_uptime(&mut self) -> bool {
        match self.source.uptime_seconds() {
            Some(seconds) => {
                self.uptime_seconds = seconds;
                true
            }
            None => {
                self.uptime_seconds = 0;
                false
            }
        }
    }
}

/// Rewrites the frequency clause with the resolved speed and core count,
/// strips vendor noise, and collapses whitespace.
fn normalize_model(mut model: String, cores: u32, speed_ghz: Option<f64>) -> String {
    match speed_ghz {
        Some(ghz) if ghz > 0.0 => {
            if let Ok(clause) = Regex::new(r"@ ([0-9]+\.)?[0-9]+GHz") {
                text::replace_first(
                    &clause,
                    &format!("({cores}) @ {ghz:.1}GHz"),
                    &mut model,
                    MAX_MODEL_LEN,
                );
            }
        }
        _ => {
            if let Ok(at) = Regex::new("@") {
                text::replace_first(&at, &format!("({cores}) @"), &mut model, MAX_MODEL_LEN);
            }
        }
    }
    if let Ok(noise) = Regex::new(r"CPU|\((R|TM)\)") {
        text::replace_all(&noise, "", &mut model, MAX_MODEL_LEN);
    }
    text::trim_in_place(&mut model);
    model
}

/// Spawns the process listing restricted to the %CPU column and sums it.
/// Fails only when the listing cannot be started.
fn process_cpu_sum() -> Option<f64> {
    let output = Command::new("ps").args(["-e", "-o", "%cpu"]).output().ok()?;
    Some(sum_percent_column(&String::from_utf8_lossy(&output.stdout)))
}

fn sum_percent_column(listing: &str) -> f64 {
    listing
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_with_resolved_speed() {
        let out = normalize_model(
            "Intel(R) Core(TM) CPU @ 2.3GHz".to_string(),
            4,
            Some(3.5),
        );
        assert_eq!(out, "Intel Core (4) @ 3.5GHz");
    }

    #[test]
    fn normalizes_bare_at_without_speed() {
        let out = normalize_model("AMD Ryzen 5 3600 @ 3.6GHz".to_string(), 12, None);
        // No resolved speed: only the "@" itself gains the core count.
        assert_eq!(out, "AMD Ryzen 5 3600 (12) @ 3.6GHz");
    }

    #[test]
    fn keeps_models_without_frequency_clause() {
        let out = normalize_model("Apple M2".to_string(), 8, Some(3.5));
        assert_eq!(out, "Apple M2");
    }

    #[test]
    fn strips_vendor_noise_everywhere() {
        let out = normalize_model(
            "Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz".to_string(),
            28,
            Some(2.4),
        );
        assert_eq!(out, "Intel Xeon E5-2680 v4 (28) @ 2.4GHz");
    }

    #[test]
    fn sums_only_numeric_rows() {
        let listing = "%CPU\n 0.0\n 1.5\n10.0\n 0.2\n";
        assert!((sum_percent_column(listing) - 11.7).abs() < 1e-9);
    }

    #[test]
    fn empty_listing_sums_to_zero() {
        assert_eq!(sum_percent_column("%CPU\n"), 0.0);
    }
}
