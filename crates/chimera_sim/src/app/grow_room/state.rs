use chimera_engine::runtime::{InstanceId, Vec3};
use chimera_engine::PlantStage;

pub(super) fn stage_template(stage: PlantStage) -> &'static str {
    match stage {
        PlantStage::Seedling => "plant_seedling",
        PlantStage::Vegetative => "plant_vegetative",
        PlantStage::Flowering | PlantStage::Harvestable => "plant_flowering",
    }
}

pub(super) fn next_stage(stage: PlantStage) -> Option<PlantStage> {
    match stage {
        PlantStage::Seedling => Some(PlantStage::Vegetative),
        PlantStage::Vegetative => Some(PlantStage::Flowering),
        PlantStage::Flowering => Some(PlantStage::Harvestable),
        PlantStage::Harvestable => None,
    }
}

#[derive(Debug, Clone)]
pub(super) struct Plant {
    pub(super) id: u32,
    pub(super) position: Vec3,
    pub(super) stage: PlantStage,
    pub(super) stage_elapsed: f32,
    pub(super) instance: Option<InstanceId>,
}

impl Plant {
    pub(super) fn seedling(id: u32, position: Vec3) -> Self {
        Self {
            id,
            position,
            stage: PlantStage::Seedling,
            stage_elapsed: 0.0,
            instance: None,
        }
    }

    pub(super) fn yield_grams(&self, base: f32) -> f32 {
        base + (self.id % 5) as f32 * 3.0
    }
}

/// Deterministic drift around a room setpoint.
#[derive(Debug, Clone, Copy)]
pub(super) struct ClimateModel {
    pub(super) temperature_c: f32,
    pub(super) humidity_pct: f32,
    pub(super) co2_ppm: f32,
}

impl Default for ClimateModel {
    fn default() -> Self {
        Self {
            temperature_c: 24.0,
            humidity_pct: 55.0,
            co2_ppm: 900.0,
        }
    }
}

impl ClimateModel {
    pub(super) fn sample(&self, elapsed_seconds: f32) -> (f32, f32, f32) {
        let phase = elapsed_seconds / 20.0;
        (
            self.temperature_c + 3.0 * phase.sin(),
            (self.humidity_pct + 8.0 * (phase * 0.7).cos()).clamp(0.0, 100.0),
            (self.co2_ppm + 150.0 * (phase * 1.3).sin()).max(0.0),
        )
    }
}

#[derive(Debug, Clone)]
pub(super) struct ConstructionSite {
    pub(super) id: u32,
    pub(super) position: Vec3,
    pub(super) progress: f32,
    pub(super) step: f32,
}

impl ConstructionSite {
    /// Returns the new progress, or `None` once the site is finished.
    pub(super) fn advance(&mut self) -> Option<f32> {
        if self.progress >= 1.0 {
            return None;
        }
        self.progress = (self.progress + self.step).min(1.0);
        Some(self.progress)
    }
}
