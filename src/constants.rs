pub const MINUTE_WINDOW_SECS: u64 = 60;
pub const HOUR_WINDOW_SECS: u64 = 3_600;
pub const DAY_WINDOW_SECS: u64 = 86_400;

pub const DEFAULT_HEALTH_CHECK_URLS: &[&str] = &[
    "http://cp.cloudflare.com/generate_204",
    "https://httpbin.org/ip",
];

pub const HEALTH_PROBE_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Upper bound on simultaneous outbound probes during a background sweep.
pub const HEALTH_SWEEP_CONCURRENCY: usize = 20;

// Per-resource rotation history ring size.
pub const ROTATION_HISTORY_CAP: usize = 1_000;
