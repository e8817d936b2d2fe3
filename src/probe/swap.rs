use tracing::debug;

use super::platform::{self, SwapSource};
use super::percent;

/// Swap usage in bytes, plus the derived percentage.
#[derive(Debug, Default)]
pub struct SwapInfo {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
    source: platform::SwapProbe,
}

impl SwapInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Used space needs the total first on platforms that derive it from a
    /// free-space reading, so an unresolved total is resolved on the way.
    pub fn resolve_used(&mut self) -> bool {
        if self.total_bytes == 0 {
            self.resolve_total();
        }
        match self.source.used_bytes(self.total_bytes) {
            Some(used) => {
                self.used_bytes = used;
                true
            }
            None => {
                debug!("used swap unavailable");
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
                debug!("total swap unavailable");
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
