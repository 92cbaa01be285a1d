//! Volume ramps for track transitions.
//!
//! Fade-out eases out (fast drop, long tail), fade-in eases in (quiet start,
//! fast finish). Both take a normalized position in 0..=1.

use rand::Rng;

/// `lerp(start, 0, 1 - (1 - t)^2)`
pub fn fade_out_volume(start_volume: f32, progress: f32) -> f32 {
    let t = progress.clamp(0.0, 1.0);
    let eased = 1.0 - (1.0 - t) * (1.0 - t);
    start_volume * (1.0 - eased)
}

/// `lerp(0, target, t^2)`
pub fn fade_in_volume(target_volume: f32, progress: f32) -> f32 {
    let t = progress.clamp(0.0, 1.0);
    target_volume * t * t
}

/// Moves a fade forward by `dt` seconds. A non-positive duration finishes at once.
pub fn step_progress(progress: f32, dt: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (progress + dt.max(0.0) / duration).clamp(0.0, 1.0)
}

/// Uniform silence length in `[min, max]` seconds
pub fn roll_silence<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    let min = min.max(0.0);
    let max = max.max(min);
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_out_endpoints_and_shape() {
        assert_eq!(fade_out_volume(0.8, 0.0), 0.8);
        assert_eq!(fade_out_volume(0.8, 1.0), 0.0);
        // ease-out: half way through, three quarters of the drop is done
        assert!((fade_out_volume(1.0, 0.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_fade_in_endpoints_and_shape() {
        assert_eq!(fade_in_volume(0.6, 0.0), 0.0);
        assert!((fade_in_volume(0.6, 1.0) - 0.6).abs() < 1e-6);
        assert!((fade_in_volume(1.0, 0.5) - 0.25).abs() < 1e-6);
        assert!((fade_in_volume(1.0, 7.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_step_never_overshoots() {
        assert_eq!(step_progress(0.2, 1_000.0, 2.0), 1.0);
        assert!((step_progress(0.0, 0.5, 2.0) - 0.25).abs() < 1e-6);
        assert_eq!(step_progress(0.0, 0.0, 0.0), 1.0);
        assert_eq!(step_progress(0.3, -1.0, 2.0), 0.3);
    }

    #[test]
    fn test_silence_rolls_stay_in_bounds_and_spread_evenly() {
        let mut rng = rand::thread_rng();
        let (min, max) = (2.0_f32, 25.0_f32);
        let mut buckets = [0usize; 5];

        for _ in 0..10_000 {
            let roll = roll_silence(&mut rng, min, max);
            assert!((min..=max).contains(&roll), "roll {} out of range", roll);
            let bucket = (((roll - min) / (max - min)) * 5.0).min(4.0) as usize;
            buckets[bucket] += 1;
        }

        // 2000 expected per bucket; this margin is many standard deviations wide
        for count in buckets {
            assert!((1_600..=2_400).contains(&count), "skewed buckets: {:?}", buckets);
        }
    }

    #[test]
    fn test_degenerate_silence_range() {
        let mut rng = rand::thread_rng();
        assert_eq!(roll_silence(&mut rng, 5.0, 5.0), 5.0);
        assert_eq!(roll_silence(&mut rng, 5.0, 1.0), 5.0);
    }
}
