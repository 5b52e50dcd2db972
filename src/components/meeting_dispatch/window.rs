use super::models::BotConfig;

/// How far back a cycle looks for meetings, in seconds
pub const LOOKBACK_SECS: i64 = 600;

/// How far ahead a cycle looks for meetings, in seconds
pub const LOOKAHEAD_SECS: i64 = 1800;

/// Effective fetch window for one user's calendar, epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: i64,
    pub end: i64,
}

impl FetchWindow {
    /// The unclipped base window around `now`
    pub fn base(now: i64) -> Self {
        Self {
            start: now - LOOKBACK_SECS,
            end: now + LOOKAHEAD_SECS,
        }
    }
}

/// Compute the effective fetch window for a user, honoring the per-user
/// disabled override. Returns `None` when the base window is strictly
/// contained in the disabled interval and the user is skipped outright.
///
/// Clipping is one-sided per boundary: a disabled interval starting inside
/// the window caps `end`, one ending inside the window raises `start`. The
/// window is never split in two.
pub fn compute_fetch_window(now: i64, bot_config: &BotConfig) -> Option<FetchWindow> {
    let mut window = FetchWindow::base(now);

    if !bot_config.is_disabled {
        return Some(window);
    }

    let (disable_start, disable_end) = match (bot_config.start_time, bot_config.end_time) {
        (Some(s), Some(e)) => (s, e),
        // Disabled flag without an interval is treated as not disabled
        _ => return Some(window),
    };

    if window.start > disable_start && window.end < disable_end {
        return None;
    }

    // Both clips test against the unmutated base bounds, so an interval
    // fully inside the window applies both
    let (base_start, base_end) = (window.start, window.end);

    if base_start < disable_start && base_end > disable_start {
        window.end = disable_start;
    }

    if base_start < disable_end && base_end > disable_end {
        window.start = disable_end;
    }

    Some(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled(start: i64, end: i64) -> BotConfig {
        BotConfig {
            bot_name: None,
            is_disabled: true,
            start_time: Some(start),
            end_time: Some(end),
        }
    }

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_no_override_returns_base_window() {
        let config = BotConfig::default();
        let window = compute_fetch_window(NOW, &config).unwrap();
        assert_eq!(window.start, NOW - LOOKBACK_SECS);
        assert_eq!(window.end, NOW + LOOKAHEAD_SECS);
    }

    #[test]
    fn test_disabled_flag_without_interval_returns_base_window() {
        let config = BotConfig {
            is_disabled: true,
            ..Default::default()
        };
        let window = compute_fetch_window(NOW, &config).unwrap();
        assert_eq!(window, FetchWindow::base(NOW));
    }

    #[test]
    fn test_interval_containing_base_window_skips_user() {
        // Interval strictly wider than the base window on both sides
        let config = disabled(NOW - LOOKBACK_SECS - 60, NOW + LOOKAHEAD_SECS + 60);
        assert_eq!(compute_fetch_window(NOW, &config), None);
    }

    #[test]
    fn test_interval_overlapping_tail_caps_fetch_end() {
        // Disable interval starts inside the window and runs past its end
        let disable_start = NOW + 900;
        let config = disabled(disable_start, NOW + LOOKAHEAD_SECS + 3600);
        let window = compute_fetch_window(NOW, &config).unwrap();
        assert_eq!(window.start, NOW - LOOKBACK_SECS);
        assert_eq!(window.end, disable_start);
    }

    #[test]
    fn test_interval_overlapping_head_raises_fetch_start() {
        // Disable interval ends inside the window after starting before it
        let disable_end = NOW - 300;
        let config = disabled(NOW - LOOKBACK_SECS - 3600, disable_end);
        let window = compute_fetch_window(NOW, &config).unwrap();
        assert_eq!(window.start, disable_end);
        assert_eq!(window.end, NOW + LOOKAHEAD_SECS);
    }

    #[test]
    fn test_interval_inside_window_clips_both_bounds() {
        // Interval fully inside the base window: both clips apply and the
        // result is the single clipped window, not a two-sided split
        let config = disabled(NOW - 60, NOW + 60);
        let window = compute_fetch_window(NOW, &config).unwrap();
        assert_eq!(window.start, NOW + 60);
        assert_eq!(window.end, NOW - 60);
    }

    #[test]
    fn test_interval_entirely_outside_window_leaves_it_unclipped() {
        let config = disabled(NOW + LOOKAHEAD_SECS + 60, NOW + LOOKAHEAD_SECS + 7200);
        let window = compute_fetch_window(NOW, &config).unwrap();
        assert_eq!(window, FetchWindow::base(NOW));
    }
}
