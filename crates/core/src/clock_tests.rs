// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_plausible() {
    let clock = SystemClock;
    // Well after 2020-01-01 in epoch milliseconds.
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}

#[test]
fn fake_clock_starts_at_fixed_epoch() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_ms(), 1_000_000);
}

#[test]
fn fake_clock_advance_moves_both_views() {
    let clock = FakeClock::new();
    let before = clock.now();
    clock.advance(Duration::from_millis(2_500));
    assert_eq!(clock.epoch_ms(), 1_002_500);
    assert_eq!(clock.now() - before, Duration::from_millis(2_500));
}

#[test]
fn fake_clock_set_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(1));
    assert_eq!(other.epoch_ms(), 1_001_000);
}
