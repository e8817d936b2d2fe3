use tracing::debug;

use super::platform::{self, MemSource};
use super::percent;

/// Physical memory usage in bytes, plus the derived percentage.
#[derive(Debug, Default)]
pub struct MemInfo {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
    source: platform::MemProbe,
}

impl MemInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_used(&mut self) -> bool {
        match self.source.used_bytes() {
            Some(used) => {
                self.used_bytes = used;
                true
            }
            None => {
                debug!("used memory unavailable");
                self.used_bytes = 0;
                false
            }
        }
    }

    pub fn resolve_total(&mut self) -> bool {
        match self.source.total_bytes() {
            Some(total) => {
                self.total_bytes = total;
                true
            }
            None => {
                debug!("total memory unavailable");
                self.total_bytes = 0;
                false
            }
        }
    }

    /// Resolves whichever operand is still unset, then derives. Fails while
    /// either operand is zero rather than produce a division artifact.
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
