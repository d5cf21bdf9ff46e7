use std::f32::consts::PI;

use glam::Vec4;

/// Phase of `elapsed` within a repeating cycle, always in `[0, 1)`.
pub fn cycle_phase(elapsed: f64, cycle_seconds: f64) -> f32 {
    if cycle_seconds <= 0.0 {
        return 0.0;
    }
    let t = (elapsed.rem_euclid(cycle_seconds) / cycle_seconds) as f32;
    // Narrowing to f32 can round values just below one up to exactly one.
    if t < 1.0 { t } else { 0.0 }
}

/// Parabolic bounce height in `[0, 1]`; eighteen bounces per cycle.
pub fn bob_height(t: f32) -> f32 {
    let h = (36.0 * t).rem_euclid(2.0) - 1.0;
    1.0 - h * h
}

/// Angle about the vertical axis for instance `index` of `count`.
pub fn rotation_angle(t: f32, index: u32, count: u32) -> f32 {
    let count = count.max(1) as f32;
    PI * (2.0 * index as f32 / count - 4.0 * t)
}

/// Fixed per-instance color picked from the low three bits of `index`.
pub fn instance_color(index: u32) -> Vec4 {
    Vec4::new(
        (index & 1) as f32 * 0.4 + 0.4,
        (index & 2) as f32 * 0.2 + 0.4,
        (index & 4) as f32 * 0.1 + 0.4,
        1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn phase_wraps_at_cycle_length() {
        assert_eq!(cycle_phase(0.0, 10.0), 0.0);
        assert!((cycle_phase(2.5, 10.0) - 0.25).abs() < EPS);
        assert!((cycle_phase(12.5, 10.0) - 0.25).abs() < EPS);
        assert_eq!(cycle_phase(3.0, 10.0), cycle_phase(13.0, 10.0));
    }

    #[test]
    fn phase_stays_below_one() {
        let t = cycle_phase(10.0 - 1e-12, 10.0);
        assert!((0.0..1.0).contains(&t), "phase {t} escaped [0, 1)");
        assert_eq!(cycle_phase(5.0, 0.0), 0.0);
    }

    #[test]
    fn bob_height_stays_in_unit_range() {
        for step in 0..10_000 {
            let t = step as f32 / 10_000.0;
            let y = bob_height(t);
            assert!((0.0..=1.0).contains(&y), "height {y} at t={t}");
        }
    }

    #[test]
    fn bob_peaks_on_odd_thirty_sixths() {
        for k in (1..36).step_by(2) {
            let y = bob_height(k as f32 / 36.0);
            assert!((y - 1.0).abs() < EPS, "expected apex at k={k}, got {y}");
        }
        for k in (0..36).step_by(2) {
            let y = bob_height(k as f32 / 36.0);
            assert!(y.abs() < EPS, "expected floor contact at k={k}, got {y}");
        }
    }

    #[test]
    fn rotation_repeats_every_half_cycle() {
        for step in 0..50 {
            let t = step as f32 / 100.0;
            let a = rotation_angle(t, 3, 6);
            let b = rotation_angle(t + 0.5, 3, 6);
            assert!((a.sin() - b.sin()).abs() < EPS);
            assert!((a.cos() - b.cos()).abs() < EPS);
        }
    }

    #[test]
    fn instances_are_evenly_spaced() {
        let count = 6;
        let spacing = 2.0 * PI / count as f32;
        for step in 0..20 {
            let t = step as f32 / 20.0;
            for index in 1..count {
                let delta = rotation_angle(t, index + 1, count) - rotation_angle(t, index, count);
                assert!((delta - spacing).abs() < EPS);
            }
        }
    }

    #[test]
    fn instance_colors_follow_index_bits() {
        assert_eq!(instance_color(1), Vec4::new(0.8, 0.4, 0.4, 1.0));
        assert_eq!(instance_color(2), Vec4::new(0.4, 0.8, 0.4, 1.0));
        assert_eq!(instance_color(4), Vec4::new(0.4, 0.4, 0.8, 1.0));
        assert_eq!(instance_color(6), Vec4::new(0.4, 0.8, 0.8, 1.0));
        assert_eq!(instance_color(7), instance_color(7));
    }
}
