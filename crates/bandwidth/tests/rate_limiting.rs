//! Pacing behaviour observed through the recorded-sleep hooks.
//!
//! Outside unit tests the limiter still sleeps for real, so every scenario
//! here keeps requested sleeps to a few milliseconds.

use std::time::{Duration, Instant};

use bandwidth::{RateLimiter, parse_speed, recorded_sleep_session};
use proptest::prelude::*;

#[test]
fn parsed_speed_drives_limiter() {
    let limit = parse_speed("1K").expect("speed");
    let start = Instant::now();
    let mut limiter = RateLimiter::starting_at(limit, start);
    assert!(limiter.is_enabled());
    assert_eq!(limiter.limit(), 1024);

    let mut session = recorded_sleep_session();
    session.clear();

    limiter.record(512);
    assert!(limiter.throttle_at(start + Duration::from_millis(100)).is_noop());
    limiter.record(512);
    let slept = limiter.throttle_at(start + Duration::from_millis(995));

    assert_eq!(slept.requested(), Duration::from_millis(5));
    assert_eq!(session.take(), [Duration::from_millis(5)]);
}

#[test]
fn each_window_admits_one_burst() {
    let start = Instant::now();
    let mut limiter = RateLimiter::starting_at(4096, start);

    let mut session = recorded_sleep_session();
    session.clear();

    // Four windows, each filled just before its end.
    for window in 0..4u64 {
        let at = start + Duration::from_millis(window * 1000 + 998);
        limiter.record(4096);
        let slept = limiter.throttle_at(at);
        assert_eq!(slept.requested(), Duration::from_millis(2));
    }
    assert_eq!(session.len(), 4);
    assert_eq!(session.total_duration(), Duration::from_millis(8));
}

#[test]
fn idle_gap_resets_the_window() {
    let start = Instant::now();
    let mut limiter = RateLimiter::starting_at(100, start);

    let mut session = recorded_sleep_session();
    session.clear();

    limiter.record(100);
    assert!(limiter.throttle_at(start + Duration::from_secs(5)).is_noop());
    assert_eq!(limiter.window_bytes(), 0);
    assert!(session.is_empty());
}

#[test]
fn disabled_limiter_ignores_records() {
    let mut limiter = RateLimiter::disabled();
    limiter.record(1 << 40);
    assert!(limiter.throttle().is_noop());
    assert_eq!(limiter.window_bytes(), 0);
}

proptest! {
    #[test]
    fn kibibyte_suffix_scales_exactly(value in 0u32..=u32::MAX) {
        let text = format!("{value}K");
        prop_assert_eq!(parse_speed(&text), Ok(u64::from(value) * 1024));
    }

    #[test]
    fn bare_numbers_are_mebibytes(value in 0u32..=1_000_000u32) {
        prop_assert_eq!(parse_speed(&value.to_string()), Ok(u64::from(value) << 20));
    }
}
