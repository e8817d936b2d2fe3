use tracing::debug;

use super::platform::{self, DiskSource};
use super::percent;

/// Storage telemetry for one mount point. Resolution is a chain: the
/// backing device is the join key into the mount table, so `device` must
/// resolve before name, mount point, filesystem type or the size getters.
/// Each getter resolves its upstream automatically when it is still unset,
/// and fails cleanly when the upstream fails.
#[derive(Debug)]
pub struct DiskInfo {
    pub device: String,
    pub name: String,
    pub mount_point: String,
    pub fs_type: String,
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
    target: String,
    source: platform::DiskProbe,
}

impl Default for DiskInfo {
    fn default() -> Self {
        Self::new("/")
    }
}

impl DiskInfo {
    /// A record probing the filesystem mounted at `target`.
    pub fn new(target: impl Into<String>) -> Self {
        DiskInfo {
            device: String::new(),
            name: String::new(),
            mount_point: String::new(),
            fs_type: String::new(),
            used_bytes: 0,
            total_bytes: 0,
            percent: 0.0,
            target: target.into(),
            source: platform::DiskProbe::default(),
        }
    }

    pub fn resolve_device(&mut self) -> bool {
        match self.source.device(&self.target) {
            Some(device) => {
                self.device = device;
                true
            }
            None => {
                debug!(target = %self.target, "mount point not in the mount table");
                self.device.clear();
                false
            }
        }
    }

    pub fn resolve_name(&mut self) -> bool {
        if self.device.is_empty() && !self.resolve_device() {
            self.name.clear();
            return false;
        }
        match self.source.device_name(&self.device) {
            Some(name) => {
                self.name = name;
                true
            }
            None => {
                self.name.clear();
                false
            }
        }
    }

    pub fn resolve_mount(&mut self) -> bool {
        if self.device.is_empty() && !self.resolve_device() {
            self.mount_point.clear();
            return false;
        }
        match self.source.mount_dir(&self.device) {
            Some(dir) => {
                self.mount_point = dir;
                true
            }
            None => {
                self.mount_point.clear();
                false
            }
        }
    }

    pub fn resolve_fs_type(&mut self) -> bool {
        if self.device.is_empty() && !self.resolve_device() {
            self.fs_type.clear();
            return false;
        }
        match self.source.fs_type(&self.device) {
            Some(fs_type) => {
                self.fs_type = fs_type;
                true
            }
            None => {
                self.fs_type.clear();
                false
            }
        }
    }

    pub fn resolve_used(&mut self) -> bool {
        if self.mount_point.is_empty() && !self.resolve_mount() {
            self.used_bytes = 0;
            return false;
        }
        match self.source.fs_stats(&self.mount_point) {
            Some(stats) => {
                self.used_bytes = stats.used_bytes;
                true
            }
            None => {
                self.used_bytes = 0;
                false
            }
        }
    }

    pub fn resolve_total(&mut self) -> bool {
        if self.mount_point.is_empty() && !self.resolve_mount() {
            self.total_bytes = 0;
            return false;
        }
        match self.source.fs_stats(&self.mount_point) {
            Some(stats) => {
                self.total_bytes = stats.total_bytes;
                true
            }
            None => {
                self.total_bytes = 0;
                false
            }
        }
    }

    pub fn resolve_percent(&mut self) -> bool {
        if self.used_bytes == 0 {
            self.resolve_used();
        }
        if self.used_bytes == 0 {
            self.percent = 0.0;
            return false;
        }
        if self.total_bytes == 0 {
            self.resolve_total();
        }
        if self.total_bytes == 0 {
            self.percent = 0.0;
            return false;
        }
        self.percent = percent(self.used_bytes, self.total_bytes);
        true
    }
}
