use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{PrefabCatalog, TemplateCategory, TemplateEntry};

use super::backend::{EffectParams, PresentationBackend};
use super::math::{Placement, Vec3};
use super::pool::{Instance, InstancePool};
use super::quality::scaled_ceiling;
use super::timers::TimerQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Inactive,
    Playing,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Playing(EffectId),
    /// Beyond the cull radius from the viewer.
    Culled,
    /// The concurrent-effect ceiling was already reached.
    Saturated,
    NotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub played: u64,
    pub culled: u64,
    pub saturated: u64,
    pub not_found: u64,
    pub expired: u64,
    pub stopped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectTick {
    pub expired: usize,
    pub reclaimed: usize,
}

#[derive(Debug)]
struct ActiveEffect {
    instance: Instance,
    state: EffectState,
    ends_at: Duration,
}

#[derive(Debug)]
pub struct EffectDispatcher {
    pool: InstancePool,
    timers: TimerQueue<EffectId>,
    active: BTreeMap<EffectId, ActiveEffect>,
    bindings: HashMap<TemplateCategory, String>,
    viewer: Vec3,
    cull_radius: f32,
    base_max_concurrent: usize,
    quality_scale: f32,
    next_effect_id: u64,
    stats: DispatchStats,
}

impl EffectDispatcher {
    pub fn new(base_max_concurrent: usize, cull_radius: f32, default_pool_capacity: usize) -> Self {
        Self {
            pool: InstancePool::new(default_pool_capacity),
            timers: TimerQueue::new(),
            active: BTreeMap::new(),
            bindings: HashMap::new(),
            viewer: Vec3::ZERO,
            cull_radius,
            base_max_concurrent: base_max_concurrent.max(1),
            quality_scale: 1.0,
            next_effect_id: 0,
            stats: DispatchStats::default(),
        }
    }

    /// Routes `category` to a specific template instead of the first
    /// catalog entry of that category.
    pub fn bind(&mut self, category: TemplateCategory, template_id: &str) {
        self.bindings.insert(category, template_id.to_string());
    }

    pub fn set_viewer(&mut self, position: Vec3) {
        self.viewer = position;
    }

    pub fn viewer(&self) -> Vec3 {
        self.viewer
    }

    pub fn set_cull_radius(&mut self, radius: f32) {
        self.cull_radius = radius;
    }

    pub fn set_quality_scale(&mut self, scale: f32) {
        self.quality_scale = scale.clamp(0.0, 1.0);
    }

    pub fn quality_scale(&self) -> f32 {
        self.quality_scale
    }

    pub fn max_concurrent(&self) -> usize {
        scaled_ceiling(self.base_max_concurrent, self.quality_scale)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn playing_count(&self) -> usize {
        self.active
            .values()
            .filter(|effect| effect.state == EffectState::Playing)
            .count()
    }

    pub fn state(&self, id: EffectId) -> EffectState {
        self.active
            .get(&id)
            .map_or(EffectState::Inactive, |effect| effect.state)
    }

    pub fn ends_at(&self, id: EffectId) -> Option<Duration> {
        self.active.get(&id).map(|effect| effect.ends_at)
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn pool(&self) -> &InstancePool {
        &self.pool
    }

    pub fn preload(&mut self, catalog: &PrefabCatalog, template_id: &str, count: usize) -> usize {
        self.pool.preload(catalog, template_id, count)
    }

    pub fn bound_template<'a>(
        &self,
        catalog: &'a PrefabCatalog,
        category: TemplateCategory,
    ) -> Option<&'a TemplateEntry> {
        match self.bindings.get(&category) {
            Some(template_id) => catalog.lookup(template_id),
            None => catalog.first_in_category(category),
        }
    }

    pub fn play_effect(
        &mut self,
        catalog: &PrefabCatalog,
        category: TemplateCategory,
        placement: Placement,
        duration: Duration,
        now: Duration,
        backend: &mut dyn PresentationBackend,
    ) -> PlayOutcome {
        let Some(entry) = self.bound_template(catalog, category) else {
            warn!(category = %category, "effect_category_unbound");
            self.stats.not_found = self.stats.not_found.saturating_add(1);
            return PlayOutcome::NotFound;
        };
        self.play_entry(catalog, entry, placement, duration, now, backend)
    }

    pub fn play_template(
        &mut self,
        catalog: &PrefabCatalog,
        template_id: &str,
        placement: Placement,
        duration: Duration,
        now: Duration,
        backend: &mut dyn PresentationBackend,
    ) -> PlayOutcome {
        let Some(entry) = catalog.lookup(template_id) else {
            warn!(template_id, "effect_template_not_found");
            self.stats.not_found = self.stats.not_found.saturating_add(1);
            return PlayOutcome::NotFound;
        };
        self.play_entry(catalog, entry, placement, duration, now, backend)
    }

    /// Moves a playing effect to `Stopping`. The instance goes back to the
    /// pool on the next `tick`.
    pub fn stop(&mut self, id: EffectId, backend: &mut dyn PresentationBackend) -> bool {
        let Some(effect) = self.active.get_mut(&id) else {
            return false;
        };
        if effect.state != EffectState::Playing {
            return false;
        }
        effect.state = EffectState::Stopping;
        backend.stop_presentation(id);
        self.stats.stopped = self.stats.stopped.saturating_add(1);
        debug!(effect_id = id.0, "effect_stopped");
        true
    }

    pub fn stop_all(&mut self, backend: &mut dyn PresentationBackend) -> usize {
        let playing = self
            .active
            .iter()
            .filter(|(_, effect)| effect.state == EffectState::Playing)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for id in &playing {
            self.stop(*id, backend);
        }
        playing.len()
    }

    /// Expires effects whose duration has elapsed, then returns every
    /// stopping instance to the pool.
    pub fn tick(&mut self, now: Duration, backend: &mut dyn PresentationBackend) -> EffectTick {
        let mut report = EffectTick::default();

        for id in self.timers.drain_due(now) {
            // Timers outlive effects that were stopped early.
            let Some(effect) = self.active.get_mut(&id) else {
                continue;
            };
            if effect.state != EffectState::Playing {
                continue;
            }
            effect.state = EffectState::Stopping;
            backend.stop_presentation(id);
            report.expired += 1;
        }
        self.stats.expired = self.stats.expired.saturating_add(report.expired as u64);

        let stopping = self
            .active
            .iter()
            .filter(|(_, effect)| effect.state == EffectState::Stopping)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for id in stopping {
            if let Some(effect) = self.active.remove(&id) {
                self.pool.release(effect.instance);
                report.reclaimed += 1;
            }
        }

        if report.expired > 0 || report.reclaimed > 0 {
            debug!(
                expired = report.expired,
                reclaimed = report.reclaimed,
                active = self.active.len(),
                "effect_tick"
            );
        }
        report
    }

    fn play_entry(
        &mut self,
        catalog: &PrefabCatalog,
        entry: &TemplateEntry,
        placement: Placement,
        duration: Duration,
        now: Duration,
        backend: &mut dyn PresentationBackend,
    ) -> PlayOutcome {
        if self.cull_radius > 0.0
            && placement.position.distance_squared(self.viewer) > self.cull_radius * self.cull_radius
        {
            self.stats.culled = self.stats.culled.saturating_add(1);
            debug!(
                template_id = %entry.id,
                distance = placement.position.distance(self.viewer),
                cull_radius = self.cull_radius,
                "effect_culled"
            );
            return PlayOutcome::Culled;
        }

        let ceiling = self.max_concurrent();
        if self.playing_count() >= ceiling {
            self.stats.saturated = self.stats.saturated.saturating_add(1);
            debug!(template_id = %entry.id, ceiling, "effect_saturated");
            return PlayOutcome::Saturated;
        }

        let Some(mut instance) = self.pool.acquire(catalog, &entry.id) else {
            warn!(template_id = %entry.id, "effect_template_not_found");
            self.stats.not_found = self.stats.not_found.saturating_add(1);
            return PlayOutcome::NotFound;
        };
        instance.set_placement(placement);

        let id = EffectId(self.next_effect_id);
        self.next_effect_id = self.next_effect_id.saturating_add(1);
        let params = EffectParams {
            intensity: self.scaled_intensity(entry),
            duration,
            tint: None,
        };
        for asset in &entry.presentation_assets {
            backend.spawn_presentation(id, asset, placement, &params);
        }

        let ends_at = now.saturating_add(duration);
        self.timers.schedule(ends_at, id);
        self.active.insert(
            id,
            ActiveEffect {
                instance,
                state: EffectState::Playing,
                ends_at,
            },
        );
        self.stats.played = self.stats.played.saturating_add(1);
        debug!(
            effect_id = id.0,
            template_id = %entry.id,
            assets = entry.presentation_assets.len(),
            intensity = params.intensity,
            duration_ms = duration.as_millis() as u64,
            "effect_playing"
        );
        PlayOutcome::Playing(id)
    }

    fn scaled_intensity(&self, entry: &TemplateEntry) -> f32 {
        let peak = if entry.params.intensity_max > 0.0 {
            entry.params.intensity_max
        } else {
            1.0
        };
        (peak * self.quality_scale).max(entry.params.intensity_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssetKind, TemplateParams};
    use crate::runtime::backend::{BackendCall, RecordingBackend};

    fn origin() -> Placement {
        Placement::at(Vec3::ZERO)
    }

    fn small_catalog() -> PrefabCatalog {
        PrefabCatalog::from_entries(vec![
            TemplateEntry::new("sparkles", TemplateCategory::Particle, "Sparkles")
                .with_params(TemplateParams {
                    intensity_min: 0.2,
                    intensity_max: 2.0,
                    duration_secs: 3.0,
                    ..TemplateParams::default()
                })
                .with_asset(AssetKind::Particle, "fx_sparkles")
                .with_asset(AssetKind::AudioClip, "sfx_twinkle"),
            TemplateEntry::new("dust", TemplateCategory::Particle, "Dust")
                .with_asset(AssetKind::Particle, "fx_dust"),
        ])
    }

    #[test]
    fn growth_sparkles_play_then_expire() {
        let catalog = PrefabCatalog::with_defaults();
        assert!(catalog
            .lookup_by_category(TemplateCategory::Particle)
            .iter()
            .any(|entry| entry.id == "plant_growth_sparkles"));

        let mut dispatcher = EffectDispatcher::new(16, 50.0, 8);
        let mut backend = RecordingBackend::new();
        let outcome = dispatcher.play_effect(
            &catalog,
            TemplateCategory::Particle,
            origin(),
            Duration::from_secs(3),
            Duration::ZERO,
            &mut backend,
        );
        let PlayOutcome::Playing(id) = outcome else {
            panic!("expected playing, got {outcome:?}");
        };
        assert_eq!(dispatcher.active_count(), 1);
        assert_eq!(dispatcher.state(id), EffectState::Playing);

        dispatcher.tick(Duration::from_secs(3), &mut backend);
        assert_eq!(dispatcher.active_count(), 0);
        assert_eq!(dispatcher.state(id), EffectState::Inactive);
        assert_eq!(dispatcher.pool().available_count("plant_growth_sparkles"), 1);
    }

    #[test]
    fn plays_every_asset_and_stops_once() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(16, 0.0, 8);
        let mut backend = RecordingBackend::new();
        let log = backend.log();
        let PlayOutcome::Playing(id) = dispatcher.play_template(
            &catalog,
            "sparkles",
            origin(),
            Duration::from_secs(1),
            Duration::ZERO,
            &mut backend,
        ) else {
            panic!("expected playing");
        };
        assert_eq!(log.spawn_count(), 2);

        dispatcher.tick(Duration::from_millis(500), &mut backend);
        assert_eq!(dispatcher.state(id), EffectState::Playing);
        dispatcher.tick(Duration::from_secs(1), &mut backend);
        assert_eq!(log.stop_count(), 1);
        assert_eq!(log.calls().last(), Some(&BackendCall::Stop { effect: id }));
    }

    #[test]
    fn effects_beyond_cull_radius_are_dropped() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(16, 10.0, 8);
        dispatcher.set_viewer(Vec3::new(100.0, 0.0, 0.0));
        let mut backend = RecordingBackend::new();
        let log = backend.log();

        let far = dispatcher.play_template(
            &catalog,
            "dust",
            origin(),
            Duration::from_secs(1),
            Duration::ZERO,
            &mut backend,
        );
        assert_eq!(far, PlayOutcome::Culled);
        let near = dispatcher.play_template(
            &catalog,
            "dust",
            Placement::at(Vec3::new(95.0, 0.0, 0.0)),
            Duration::from_secs(1),
            Duration::ZERO,
            &mut backend,
        );
        assert!(matches!(near, PlayOutcome::Playing(_)));
        assert_eq!(log.spawn_count(), 1);
        assert_eq!(dispatcher.stats().culled, 1);
    }

    #[test]
    fn ceiling_follows_quality_scale() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(4, 0.0, 8);
        let mut backend = RecordingBackend::new();
        dispatcher.set_quality_scale(0.5);
        assert_eq!(dispatcher.max_concurrent(), 2);

        let outcomes = (0..3)
            .map(|_| {
                dispatcher.play_template(
                    &catalog,
                    "dust",
                    origin(),
                    Duration::from_secs(5),
                    Duration::ZERO,
                    &mut backend,
                )
            })
            .collect::<Vec<_>>();
        assert!(matches!(outcomes[0], PlayOutcome::Playing(_)));
        assert!(matches!(outcomes[1], PlayOutcome::Playing(_)));
        assert_eq!(outcomes[2], PlayOutcome::Saturated);
    }

    #[test]
    fn intensity_is_scaled_but_not_below_minimum() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(16, 0.0, 8);
        let mut backend = RecordingBackend::new();
        let log = backend.log();
        dispatcher.set_quality_scale(0.5);
        let first = dispatcher.play_template(
            &catalog,
            "sparkles",
            origin(),
            Duration::from_secs(1),
            Duration::ZERO,
            &mut backend,
        );
        assert!(matches!(first, PlayOutcome::Playing(_)));
        dispatcher.stop_all(&mut backend);
        dispatcher.tick(Duration::ZERO, &mut backend);
        assert_eq!(dispatcher.active_count(), 0);

        dispatcher.set_quality_scale(0.05);
        assert_eq!(dispatcher.max_concurrent(), 1);
        let second = dispatcher.play_template(
            &catalog,
            "sparkles",
            origin(),
            Duration::from_secs(1),
            Duration::ZERO,
            &mut backend,
        );
        assert!(matches!(second, PlayOutcome::Playing(_)));

        let intensities = log
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Spawn { intensity, .. } => Some(intensity),
                BackendCall::Stop { .. } => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(intensities.len(), 4);
        assert!((intensities[0] - 1.0).abs() < 1e-6);
        assert!((intensities[2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn explicit_stop_ignores_the_later_timer() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(16, 0.0, 8);
        let mut backend = RecordingBackend::new();
        let log = backend.log();
        let PlayOutcome::Playing(first) = dispatcher.play_template(
            &catalog,
            "dust",
            origin(),
            Duration::from_secs(5),
            Duration::ZERO,
            &mut backend,
        ) else {
            panic!("expected playing");
        };
        assert!(dispatcher.stop(first, &mut backend));
        assert_eq!(dispatcher.state(first), EffectState::Stopping);
        assert!(!dispatcher.stop(first, &mut backend));
        dispatcher.tick(Duration::from_secs(1), &mut backend);
        assert_eq!(dispatcher.state(first), EffectState::Inactive);

        // The pooled instance is reused by a new effect.
        let PlayOutcome::Playing(second) = dispatcher.play_template(
            &catalog,
            "dust",
            origin(),
            Duration::from_secs(10),
            Duration::from_secs(1),
            &mut backend,
        ) else {
            panic!("expected playing");
        };
        dispatcher.tick(Duration::from_secs(5), &mut backend);
        assert_eq!(dispatcher.state(second), EffectState::Playing);
        assert_eq!(log.stop_count(), 1);
    }

    #[test]
    fn binding_overrides_first_in_category() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(16, 0.0, 8);
        assert_eq!(
            dispatcher
                .bound_template(&catalog, TemplateCategory::Particle)
                .map(|entry| entry.id.as_str()),
            Some("sparkles")
        );
        dispatcher.bind(TemplateCategory::Particle, "dust");
        assert_eq!(
            dispatcher
                .bound_template(&catalog, TemplateCategory::Particle)
                .map(|entry| entry.id.as_str()),
            Some("dust")
        );

        let mut backend = RecordingBackend::new();
        let outcome = dispatcher.play_effect(
            &catalog,
            TemplateCategory::Audio,
            origin(),
            Duration::from_secs(1),
            Duration::ZERO,
            &mut backend,
        );
        assert_eq!(outcome, PlayOutcome::NotFound);
    }

    #[test]
    fn stop_all_drains_on_next_tick() {
        let catalog = small_catalog();
        let mut dispatcher = EffectDispatcher::new(16, 0.0, 8);
        let mut backend = RecordingBackend::new();
        for _ in 0..3 {
            dispatcher.play_template(
                &catalog,
                "dust",
                origin(),
                Duration::from_secs(30),
                Duration::ZERO,
                &mut backend,
            );
        }
        assert_eq!(dispatcher.stop_all(&mut backend), 3);
        assert_eq!(dispatcher.playing_count(), 0);
        let report = dispatcher.tick(Duration::from_millis(16), &mut backend);
        assert_eq!(report.reclaimed, 3);
        assert_eq!(dispatcher.active_count(), 0);
    }
}
