/// Display names are single-line, trimmed and capped at 16 characters.
pub fn sanitize_name(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

pub fn parse_leaderboard_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.parse::<usize>().ok())
}

/// A single weight message may move the heuristic by at most ±1.00.
pub fn normalize_weight_steps(value: i64) -> i32 {
    value.clamp(-20, 20) as i32
}

pub fn parse_seed(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Accepts `1.75`-style weights and stores them in hundredths, rounded.
pub fn parse_weight_hundredths(raw: Option<&str>) -> Option<u32> {
    let value = raw?.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * 100.0).round().min(1_000.0) as u32)
}
