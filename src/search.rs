use std::time::Duration;

use tokio::time::{sleep_until, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Normalize a settled query before it is sent to the service.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_string()
}

/// Collapses bursts of raw search input into a single settled value.
///
/// A value settles once no newer value has been pushed for `window`.
/// Pushing again before that discards the pending value.
#[derive(Debug)]
pub struct QueryDebouncer {
    window: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    value: String,
    since: Instant,
}

impl QueryDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn push(&mut self, raw: impl Into<String>, now: Instant) {
        self.pending = Some(Pending {
            value: raw.into(),
            since: now,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value will settle.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.since + self.window)
    }

    /// Take the settled value, if the window has elapsed. Each burst yields
    /// at most one value.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.pending.take().map(|p| p.value)
    }

    /// Forget the pending value without emitting it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_query_trims() {
        assert_eq!(normalize_query("  ana "), "ana");
        assert_eq!(normalize_query("   "), "");
    }

    #[tokio::test(start_paused = true)]
    async fn value_settles_after_quiet_window() {
        let mut debouncer = QueryDebouncer::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        debouncer.push("a", t0);

        assert_eq!(debouncer.poll(t0 + Duration::from_millis(299)), None);
        assert_eq!(
            debouncer.poll(t0 + Duration::from_millis(300)).as_deref(),
            Some("a")
        );
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(900)), None);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_value_restarts_the_window() {
        let mut debouncer = QueryDebouncer::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        debouncer.push("a", t0);
        debouncer.push("an", t0 + Duration::from_millis(200));

        assert_eq!(debouncer.poll(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(t0 + Duration::from_millis(500))
        );
        assert_eq!(
            debouncer.poll(t0 + Duration::from_millis(500)).as_deref(),
            Some("an")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_value() {
        let mut debouncer = QueryDebouncer::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        debouncer.push("zzz", t0);
        debouncer.cancel();
        assert_eq!(debouncer.poll(t0 + Duration::from_secs(5)), None);
    }
}
