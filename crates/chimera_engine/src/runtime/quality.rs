use std::time::Duration;

use serde::Serialize;
use tracing::info;

pub const DEFAULT_QUALITY_FLOOR: f32 = 0.5;
pub const DEFAULT_QUALITY_STEP: f32 = 0.1;
const LOWER_THRESHOLD: f32 = 0.8;
const RAISE_THRESHOLD: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityAdjustment {
    Lowered,
    Raised,
    Held,
}

/// Hysteresis controller over observed frame rate. Drops the scale one step
/// below 80% of target, raises it one step above 95%, holds in between.
#[derive(Debug, Clone)]
pub struct QualityController {
    target_fps: f32,
    floor: f32,
    step: f32,
    scale: f32,
    window_frames: u32,
    window_time: Duration,
    lowered_total: u32,
    raised_total: u32,
}

impl QualityController {
    pub fn new(target_fps: f32, floor: f32, step: f32) -> Self {
        let floor = floor.clamp(0.0, 1.0);
        Self {
            target_fps: target_fps.max(1.0),
            floor,
            step: step.abs().max(0.001),
            scale: 1.0,
            window_frames: 0,
            window_time: Duration::ZERO,
            lowered_total: 0,
            raised_total: 0,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    pub fn lowered_total(&self) -> u32 {
        self.lowered_total
    }

    pub fn raised_total(&self) -> u32 {
        self.raised_total
    }

    pub fn record_frame(&mut self, frame_dt: Duration) {
        self.window_frames = self.window_frames.saturating_add(1);
        self.window_time = self.window_time.saturating_add(frame_dt);
    }

    /// Averages the frames recorded since the last evaluation and adjusts.
    /// An empty window holds the current scale.
    pub fn evaluate(&mut self) -> QualityAdjustment {
        if self.window_frames == 0 || self.window_time.is_zero() {
            return QualityAdjustment::Held;
        }
        let fps = self.window_frames as f32 / self.window_time.as_secs_f32();
        self.window_frames = 0;
        self.window_time = Duration::ZERO;
        self.observe_fps(fps)
    }

    pub fn observe_fps(&mut self, fps: f32) -> QualityAdjustment {
        let previous = self.scale;
        let adjustment = if fps < self.target_fps * LOWER_THRESHOLD {
            self.scale = quantize((self.scale - self.step).max(self.floor));
            QualityAdjustment::Lowered
        } else if fps > self.target_fps * RAISE_THRESHOLD {
            self.scale = quantize((self.scale + self.step).min(1.0));
            QualityAdjustment::Raised
        } else {
            QualityAdjustment::Held
        };

        if (self.scale - previous).abs() < f32::EPSILON {
            return QualityAdjustment::Held;
        }
        match adjustment {
            QualityAdjustment::Lowered => self.lowered_total = self.lowered_total.saturating_add(1),
            QualityAdjustment::Raised => self.raised_total = self.raised_total.saturating_add(1),
            QualityAdjustment::Held => {}
        }
        info!(
            fps,
            target_fps = self.target_fps,
            previous,
            scale = self.scale,
            "quality_scale_changed"
        );
        adjustment
    }
}

/// Scales a concurrency ceiling, never below one.
pub fn scaled_ceiling(base: usize, scale: f32) -> usize {
    ((base as f32 * scale + 1e-4).floor() as usize).max(1)
}

fn quantize(scale: f32) -> f32 {
    (scale * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustained_low_fps_stops_at_floor() {
        let mut quality = QualityController::new(60.0, 0.5, 0.1);
        for _ in 0..100 {
            quality.observe_fps(5.0);
            assert!(quality.scale() >= 0.5);
        }
        assert!((quality.scale() - 0.5).abs() < 1e-6);
        assert_eq!(quality.lowered_total(), 5);
        assert_eq!(quality.observe_fps(5.0), QualityAdjustment::Held);
    }

    #[test]
    fn sustained_high_fps_stops_at_one() {
        let mut quality = QualityController::new(60.0, 0.5, 0.1);
        quality.observe_fps(10.0);
        quality.observe_fps(10.0);
        for _ in 0..100 {
            quality.observe_fps(240.0);
            assert!(quality.scale() <= 1.0);
        }
        assert!((quality.scale() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn band_between_thresholds_holds() {
        let mut quality = QualityController::new(60.0, 0.5, 0.1);
        quality.observe_fps(30.0);
        let lowered = quality.scale();
        // 48..=57 fps is inside the hysteresis band.
        assert_eq!(quality.observe_fps(50.0), QualityAdjustment::Held);
        assert_eq!(quality.observe_fps(56.0), QualityAdjustment::Held);
        assert!((quality.scale() - lowered).abs() < 1e-6);
        assert_eq!(quality.observe_fps(58.0), QualityAdjustment::Raised);
    }

    #[test]
    fn evaluate_averages_recorded_frames() {
        let mut quality = QualityController::new(60.0, 0.5, 0.1);
        assert_eq!(quality.evaluate(), QualityAdjustment::Held);
        for _ in 0..30 {
            quality.record_frame(Duration::from_millis(50));
        }
        assert_eq!(quality.evaluate(), QualityAdjustment::Lowered);
        assert_eq!(quality.evaluate(), QualityAdjustment::Held);
    }

    #[test]
    fn scaled_ceiling_never_reaches_zero() {
        assert_eq!(scaled_ceiling(10, 0.5), 5);
        assert_eq!(scaled_ceiling(1, 0.5), 1);
        assert_eq!(scaled_ceiling(3, 0.0), 1);
    }
}
