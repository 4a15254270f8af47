pub const DEFAULT_PORT: u16 = 8080;

/// Folds a client-supplied seed into the engine's 32-bit seed space; a
/// missing seed falls back to `fallback`.
pub fn normalize_seed(value: Option<i64>, fallback: u32) -> u32 {
    match value {
        None => fallback,
        Some(seed) => (seed as u64 & u64::from(u32::MAX)) as u32,
    }
}

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_PORT)
}

pub fn session_label(id: u64) -> String {
    format!("session_{id}")
}
