//! Process-wide operational counters.
//!
//! Each counter is an independent atomic; there is no lock that serializes
//! unrelated counters, and no counter's value depends on another's. The
//! snapshot read is therefore point-in-time per counter rather than
//! linearizable across the set, which is all `/server-status` needs.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic counters mutated by every request and read by the status page.
///
/// Created once at process start; never reset.
#[derive(Debug, Default)]
pub struct HttpStats {
    received: AtomicI64,
    inflight: AtomicI64,
    ok: AtomicI64,
    thumb_error: AtomicI64,
    upstream_error: AtomicI64,
    arg_error: AtomicI64,
    total_time_us: AtomicI64,
}

/// Point-in-time read of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub received: i64,
    pub inflight: i64,
    pub ok: i64,
    pub thumb_error: i64,
    pub upstream_error: i64,
    pub arg_error: i64,
    pub total_time_us: i64,
}

impl HttpStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new request: one received, one in flight.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.inflight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ok(&self) {
        self.ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_thumb_error(&self) {
        self.thumb_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_arg_error(&self) {
        self.arg_error.fetch_add(1, Ordering::Relaxed);
    }

    /// Close out a request: drop it from the in-flight gauge and accumulate
    /// its wall-clock time in microseconds.
    pub fn record_finished(&self, elapsed: Duration) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
        self.total_time_us
            .fetch_add(elapsed.as_micros() as i64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            inflight: self.inflight.load(Ordering::Relaxed),
            ok: self.ok.load(Ordering::Relaxed),
            thumb_error: self.thumb_error.load(Ordering::Relaxed),
            upstream_error: self.upstream_error.load(Ordering::Relaxed),
            arg_error: self.arg_error.load(Ordering::Relaxed),
            total_time_us: self.total_time_us.load(Ordering::Relaxed),
        }
    }

    /// Render the status page body: a version line followed by one
    /// `name value` line per counter.
    pub fn render(&self) -> String {
        self.snapshot().render()
    }
}

impl StatsSnapshot {
    pub fn render(&self) -> String {
        format!(
            "version {}\n\
             received {}\n\
             inflight {}\n\
             ok {}\n\
             thumb_error {}\n\
             upstream_error {}\n\
             arg_error {}\n\
             total_time_us {}\n",
            env!("CARGO_PKG_VERSION"),
            self.received,
            self.inflight,
            self.ok,
            self.thumb_error,
            self.upstream_error,
            self.arg_error,
            self.total_time_us,
        )
    }
}

/// Per-request timer that guarantees the in-flight decrement and elapsed
/// time accumulation on every exit path.
///
/// Construction counts the request as received and in flight; Drop closes
/// it out. Because Drop also runs when the request task is cancelled (the
/// caller abandoned the connection), the in-flight gauge can never leak.
pub struct RequestTimer {
    stats: Arc<HttpStats>,
    start: Instant,
}

impl RequestTimer {
    pub fn start(stats: Arc<HttpStats>) -> Self {
        stats.record_received();
        Self {
            stats,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.stats.record_finished(self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_starts_at_zero() {
        let stats = HttpStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.received, 0);
        assert_eq!(snap.inflight, 0);
        assert_eq!(snap.ok, 0);
        assert_eq!(snap.total_time_us, 0);
    }

    #[test]
    fn render_is_newline_delimited_name_value() {
        let stats = HttpStats::new();
        stats.record_received();
        stats.record_ok();
        let body = stats.render();

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("version "));
        assert!(lines.contains(&"received 1"));
        assert!(lines.contains(&"inflight 1"));
        assert!(lines.contains(&"ok 1"));
        assert!(lines.contains(&"arg_error 0"));
    }

    #[test]
    fn request_timer_closes_out_on_drop() {
        let stats = Arc::new(HttpStats::new());
        {
            let _timer = RequestTimer::start(Arc::clone(&stats));
            assert_eq!(stats.snapshot().inflight, 1);
            assert_eq!(stats.snapshot().received, 1);
        }
        let snap = stats.snapshot();
        assert_eq!(snap.inflight, 0);
        assert_eq!(snap.received, 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(HttpStats::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    stats.record_received();
                    stats.record_ok();
                    stats.record_finished(Duration::from_micros(5));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.received, 8000);
        assert_eq!(snap.ok, 8000);
        assert_eq!(snap.inflight, 0);
        assert_eq!(snap.total_time_us, 8000 * 5);
    }
}
