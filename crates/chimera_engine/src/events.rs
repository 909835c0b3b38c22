use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::catalog::TemplateCategory;
use crate::runtime::{Placement, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlantStage {
    Seedling,
    Vegetative,
    Flowering,
    Harvestable,
}

impl PlantStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seedling => "Seedling",
            Self::Vegetative => "Vegetative",
            Self::Flowering => "Flowering",
            Self::Harvestable => "Harvestable",
        }
    }
}

impl fmt::Display for PlantStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change notifications raised by the simulation managers.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    PlantStageChanged {
        plant_id: u32,
        stage: PlantStage,
        position: Vec3,
    },
    ConditionsChanged {
        room_id: u32,
        temperature_c: f32,
        humidity_pct: f32,
        co2_ppm: f32,
        position: Vec3,
    },
    ConstructionProgress {
        site_id: u32,
        /// 0.0 to 1.0.
        progress: f32,
        position: Vec3,
    },
    HarvestCompleted {
        plant_id: u32,
        yield_grams: f32,
        position: Vec3,
    },
    EquipmentToggled {
        equipment_id: u32,
        template_id: String,
        enabled: bool,
        position: Vec3,
    },
}

/// Key into the cue table. Finished construction and equipment switching
/// off get their own keys so they can be cued differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKey {
    PlantStageChanged,
    ConditionsChanged,
    ConstructionProgress,
    ConstructionCompleted,
    HarvestCompleted,
    EquipmentOn,
    EquipmentOff,
}

impl DomainEvent {
    pub fn position(&self) -> Vec3 {
        match self {
            Self::PlantStageChanged { position, .. }
            | Self::ConditionsChanged { position, .. }
            | Self::ConstructionProgress { position, .. }
            | Self::HarvestCompleted { position, .. }
            | Self::EquipmentToggled { position, .. } => *position,
        }
    }

    pub fn cue_key(&self) -> CueKey {
        match self {
            Self::PlantStageChanged { .. } => CueKey::PlantStageChanged,
            Self::ConditionsChanged { .. } => CueKey::ConditionsChanged,
            Self::ConstructionProgress { progress, .. } if *progress >= 1.0 => {
                CueKey::ConstructionCompleted
            }
            Self::ConstructionProgress { .. } => CueKey::ConstructionProgress,
            Self::HarvestCompleted { .. } => CueKey::HarvestCompleted,
            Self::EquipmentToggled { enabled: true, .. } => CueKey::EquipmentOn,
            Self::EquipmentToggled { enabled: false, .. } => CueKey::EquipmentOff,
        }
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<DomainEvent>,
    published_total: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: DomainEvent) {
        self.published_total = self.published_total.saturating_add(1);
        self.pending.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<DomainEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn published_total(&self) -> u64 {
        self.published_total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CueTarget {
    Category(TemplateCategory),
    Template(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectCue {
    pub target: CueTarget,
    /// `None` plays for the template's own duration.
    pub duration: Option<Duration>,
}

impl EffectCue {
    pub fn template(template_id: &str) -> Self {
        Self {
            target: CueTarget::Template(template_id.to_string()),
            duration: None,
        }
    }

    pub fn category(category: TemplateCategory) -> Self {
        Self {
            target: CueTarget::Category(category),
            duration: None,
        }
    }

    pub fn for_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedCue {
    pub cue: EffectCue,
    pub placement: Placement,
}

#[derive(Debug, Clone, Default)]
pub struct EffectRouter {
    cues: HashMap<CueKey, Vec<EffectCue>>,
}

impl EffectRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut router = Self::new();
        router.set_cues(
            CueKey::PlantStageChanged,
            vec![
                EffectCue::template("plant_growth_sparkles"),
                EffectCue::template("sfx_stage_chime"),
            ],
        );
        router.set_cues(
            CueKey::ConditionsChanged,
            vec![EffectCue::category(TemplateCategory::Environment)
                .for_duration(Duration::from_secs(10))],
        );
        router.set_cues(
            CueKey::ConstructionProgress,
            vec![EffectCue::template("construction_dust")],
        );
        router.set_cues(
            CueKey::ConstructionCompleted,
            vec![EffectCue::template("construction_complete")],
        );
        router.set_cues(
            CueKey::HarvestCompleted,
            vec![EffectCue::template("harvest_burst")],
        );
        router.set_cues(
            CueKey::EquipmentOn,
            vec![
                EffectCue::template("equipment_sparks"),
                EffectCue::template("sfx_equipment_click"),
            ],
        );
        router.set_cues(
            CueKey::EquipmentOff,
            vec![EffectCue::template("sfx_equipment_click")],
        );
        router
    }

    pub fn set_cues(&mut self, key: CueKey, cues: Vec<EffectCue>) {
        self.cues.insert(key, cues);
    }

    pub fn clear_cues(&mut self, key: CueKey) -> bool {
        self.cues.remove(&key).is_some()
    }

    /// Cues to play for `event`, placed at the event's position. Keys with
    /// no cues route to nothing.
    pub fn route(&self, event: &DomainEvent) -> Vec<RoutedCue> {
        let key = event.cue_key();
        let Some(cues) = self.cues.get(&key) else {
            debug!(cue_key = ?key, "effect_cue_unmapped");
            return Vec::new();
        };
        let placement = Placement::at(event.position());
        cues.iter()
            .map(|cue| RoutedCue {
                cue: cue.clone(),
                placement,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PrefabCatalog;

    fn harvest(plant_id: u32) -> DomainEvent {
        DomainEvent::HarvestCompleted {
            plant_id,
            yield_grams: 42.0,
            position: Vec3::new(1.0, 0.0, 2.0),
        }
    }

    #[test]
    fn queue_drains_in_publish_order() {
        let mut queue = EventQueue::new();
        queue.publish(harvest(1));
        queue.publish(harvest(2));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![harvest(1), harvest(2)]);
        assert!(queue.is_empty());
        assert_eq!(queue.published_total(), 2);
    }

    #[test]
    fn construction_completion_has_its_own_key() {
        let site = |progress| DomainEvent::ConstructionProgress {
            site_id: 3,
            progress,
            position: Vec3::ZERO,
        };
        assert_eq!(site(0.4).cue_key(), CueKey::ConstructionProgress);
        assert_eq!(site(1.0).cue_key(), CueKey::ConstructionCompleted);
    }

    #[test]
    fn route_places_cues_at_event_position() {
        let router = EffectRouter::with_defaults();
        let routed = router.route(&harvest(7));
        assert_eq!(routed.len(), 1);
        assert_eq!(
            routed[0].cue.target,
            CueTarget::Template("harvest_burst".to_string())
        );
        assert_eq!(routed[0].placement.position, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn cleared_key_routes_to_nothing() {
        let mut router = EffectRouter::with_defaults();
        assert!(router.clear_cues(CueKey::HarvestCompleted));
        assert!(router.route(&harvest(1)).is_empty());
        assert!(!router.clear_cues(CueKey::HarvestCompleted));
    }

    #[test]
    fn default_cue_templates_exist_in_builtin_catalog() {
        let catalog = PrefabCatalog::with_defaults();
        let router = EffectRouter::with_defaults();
        for cues in router.cues.values() {
            for cue in cues {
                match &cue.target {
                    CueTarget::Template(id) => {
                        assert!(catalog.contains(id), "missing template {id}")
                    }
                    CueTarget::Category(category) => {
                        assert!(catalog.first_in_category(*category).is_some())
                    }
                }
            }
        }
    }
}
