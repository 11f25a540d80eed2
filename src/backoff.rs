use std::time::Duration;

/// Capped exponential backoff for the push channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the delay applied as +/- jitter.
    pub jitter_pct: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_pct: 0.1,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (1-based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        let ms = self
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::random::<f64>())
    }

    /// `unit` is a sample in `[0, 1)`; 0.5 means no jitter.
    pub fn delay_with(&self, attempt: u32, unit: f64) -> Duration {
        let capped = self.base_delay(attempt).as_millis() as f64;
        let jitter = (unit.clamp(0.0, 1.0) * 2.0 - 1.0) * capped * self.jitter_pct;
        let ms = (capped + jitter).clamp(0.0, self.max_delay_ms as f64);
        Duration::from_millis(ms as u64)
    }
}
