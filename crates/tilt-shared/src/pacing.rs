//! Thinking-delay pacing for displayed replies.

use crate::config::PacingConfig;
use rand::Rng;
use std::time::Duration;

/// Delay before a reply appears: a base plus time per character,
/// jittered and clamped to `[min_ms, max_ms]`.
pub fn thinking_delay<R: Rng>(reply: &str, config: &PacingConfig, rng: &mut R) -> Duration {
    let min = config.min_ms;
    let max = config.max_ms.max(min);

    let chars = reply.chars().count() as u64;
    let base = min.saturating_add(chars.saturating_mul(config.per_char_ms)) as f64;

    let jitter = f64::from(config.jitter_pct.min(100)) / 100.0;
    let factor = if jitter > 0.0 {
        rng.gen_range(1.0 - jitter..=1.0 + jitter)
    } else {
        1.0
    };

    let ms = (base * factor).round().clamp(min as f64, max as f64) as u64;
    Duration::from_millis(ms)
}
