use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::metrics::{LoopMetricsSnapshot, MetricsAccumulator};
use crate::catalog::{PrefabCatalog, TemplateCategory};
use crate::config::ChimeraConfig;
use crate::events::{CueTarget, DomainEvent, EffectRouter, EventQueue, RoutedCue};
use crate::ui::{UiBindingController, UiSurface, WidgetTree};

use super::backend::PresentationBackend;
use super::effects::{DispatchStats, EffectDispatcher, EffectId, PlayOutcome};
use super::instantiate::{CompletionCallback, InstantiationFacade, Instantiation, RequestId};
use super::math::{Placement, Vec3};
use super::pool::{InstanceId, ReleaseOutcome};
use super::quality::{QualityAdjustment, QualityController};
use super::timers::TimerQueue;

const DEFAULT_CUE_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostTask {
    SweepIdle,
    EvaluateQuality,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub frame_index: u64,
    pub now: Duration,
    pub fulfilled_requests: usize,
    pub queued_requests: usize,
    pub events_handled: usize,
    pub effects_started: usize,
    pub effects_expired: usize,
    pub effects_reclaimed: usize,
    pub idle_reclaimed: usize,
    pub quality: Option<QualityAdjustment>,
    pub metrics: Option<LoopMetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RuntimeSummary {
    pub frames: u64,
    pub simulated_secs: f32,
    pub events_handled: u64,
    pub instances_active: usize,
    pub instances_queued: usize,
    pub instances_allocated: u64,
    pub idle_reclaimed: u64,
    pub effects: DispatchStats,
    pub effects_active: usize,
    pub quality_scale: f32,
    pub quality_lowered: u32,
    pub quality_raised: u32,
    pub ui_skipped_updates: u64,
}

/// Owns every presentation subsystem and advances them once per frame.
/// Collaborators are handed in at construction.
pub struct PresentationRuntime<S: UiSurface = WidgetTree> {
    catalog: PrefabCatalog,
    facade: InstantiationFacade,
    dispatcher: EffectDispatcher,
    quality: QualityController,
    ui: UiBindingController,
    surface: S,
    events: EventQueue,
    router: EffectRouter,
    backend: Box<dyn PresentationBackend>,
    tasks: TimerQueue<HostTask>,
    metrics: MetricsAccumulator,
    idle_timeout: Duration,
    sweep_interval: Duration,
    quality_interval: Duration,
    now: Duration,
    frame_index: u64,
    events_handled: u64,
    idle_reclaimed: u64,
}

impl<S: UiSurface> PresentationRuntime<S> {
    pub fn new(
        catalog: PrefabCatalog,
        config: &ChimeraConfig,
        backend: Box<dyn PresentationBackend>,
        surface: S,
    ) -> Self {
        let instantiation = &config.instantiation;
        let effects = &config.effects;
        let sweep_interval =
            normalize_non_zero_duration(instantiation.idle_sweep_interval(), Duration::from_secs(30));
        let quality_interval =
            normalize_non_zero_duration(config.quality.evaluation_interval(), Duration::from_secs(1));

        let mut tasks = TimerQueue::new();
        tasks.schedule(sweep_interval, HostTask::SweepIdle);
        tasks.schedule(quality_interval, HostTask::EvaluateQuality);

        Self {
            catalog,
            facade: InstantiationFacade::new(
                instantiation.max_instances_per_frame,
                instantiation.default_pool_capacity,
            ),
            dispatcher: EffectDispatcher::new(
                effects.max_concurrent_effects,
                effects.cull_radius,
                effects.default_pool_capacity,
            ),
            quality: QualityController::new(
                config.quality.target_fps,
                config.quality.floor,
                config.quality.step,
            ),
            ui: UiBindingController::with_default_hud(),
            surface,
            events: EventQueue::new(),
            router: EffectRouter::with_defaults(),
            backend,
            tasks,
            metrics: MetricsAccumulator::new(normalize_non_zero_duration(
                config.run_loop.metrics_log_interval(),
                Duration::from_secs(1),
            )),
            idle_timeout: instantiation.idle_timeout(),
            sweep_interval,
            quality_interval,
            now: Duration::ZERO,
            frame_index: 0,
            events_handled: 0,
            idle_reclaimed: 0,
        }
    }

    pub fn with_router(mut self, router: EffectRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_ui(mut self, ui: UiBindingController) -> Self {
        self.ui = ui;
        self
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn catalog(&self) -> &PrefabCatalog {
        &self.catalog
    }

    pub fn facade(&self) -> &InstantiationFacade {
        &self.facade
    }

    pub fn dispatcher(&self) -> &EffectDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EffectDispatcher {
        &mut self.dispatcher
    }

    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    pub fn ui(&self) -> &UiBindingController {
        &self.ui
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn set_viewer(&mut self, position: Vec3) {
        self.dispatcher.set_viewer(position);
    }

    pub fn publish(&mut self, event: DomainEvent) {
        self.events.publish(event);
    }

    pub fn preload(&mut self, template_id: &str, count: usize) -> usize {
        self.facade.preload(&self.catalog, template_id, count)
    }

    pub fn instantiate(&mut self, template_id: &str, placement: Placement) -> Instantiation {
        self.facade
            .instantiate(&self.catalog, template_id, placement, self.now)
    }

    pub fn instantiate_async(
        &mut self,
        template_id: &str,
        placement: Placement,
        callback: CompletionCallback,
    ) -> RequestId {
        self.facade.instantiate_async(template_id, placement, callback)
    }

    pub fn touch(&mut self, id: InstanceId) -> bool {
        self.facade.touch(id, self.now)
    }

    pub fn move_instance(&mut self, id: InstanceId, placement: Placement) -> bool {
        self.facade.move_instance(id, placement, self.now)
    }

    pub fn release(&mut self, id: InstanceId) -> Option<ReleaseOutcome> {
        self.facade.release(id)
    }

    pub fn destroy(&mut self, id: InstanceId) -> bool {
        self.facade.destroy(id)
    }

    pub fn play_effect(
        &mut self,
        category: TemplateCategory,
        placement: Placement,
        duration: Duration,
    ) -> PlayOutcome {
        self.dispatcher.play_effect(
            &self.catalog,
            category,
            placement,
            duration,
            self.now,
            self.backend.as_mut(),
        )
    }

    pub fn play_template(
        &mut self,
        template_id: &str,
        placement: Placement,
        duration: Duration,
    ) -> PlayOutcome {
        self.dispatcher.play_template(
            &self.catalog,
            template_id,
            placement,
            duration,
            self.now,
            self.backend.as_mut(),
        )
    }

    pub fn stop_effect(&mut self, id: EffectId) -> bool {
        self.dispatcher.stop(id, self.backend.as_mut())
    }

    /// Counts one fixed simulation step toward the tick rate in metrics.
    pub fn record_sim_tick(&mut self) {
        self.metrics.record_tick();
    }

    /// Advances the simulated clock by `frame_dt` and runs one frame:
    /// deferred instantiations, queued domain events, effect expiry, then
    /// any periodic task that has come due.
    pub fn tick(&mut self, frame_dt: Duration) -> TickReport {
        self.now = self.now.saturating_add(frame_dt);
        self.frame_index = self.frame_index.saturating_add(1);
        self.metrics.record_frame(frame_dt);
        self.quality.record_frame(frame_dt);

        let now = self.now;
        let mut report = TickReport {
            frame_index: self.frame_index,
            now,
            ..TickReport::default()
        };

        let drain = self.facade.begin_frame(&self.catalog, now);
        report.fulfilled_requests = drain.fulfilled.len();
        report.queued_requests = drain.remaining;

        for event in self.events.drain() {
            self.ui.handle_event(&event, &mut self.surface);
            for routed in self.router.route(&event) {
                if matches!(self.play_cue(routed), PlayOutcome::Playing(_)) {
                    report.effects_started += 1;
                }
            }
            report.events_handled += 1;
        }
        self.events_handled = self
            .events_handled
            .saturating_add(report.events_handled as u64);

        let effect_tick = self.dispatcher.tick(now, self.backend.as_mut());
        report.effects_expired = effect_tick.expired;
        report.effects_reclaimed = effect_tick.reclaimed;

        while let Some((_, task)) = self.tasks.pop_due(now) {
            match task {
                HostTask::SweepIdle => {
                    let reclaimed = self.facade.sweep_idle(now, self.idle_timeout);
                    report.idle_reclaimed += reclaimed;
                    self.idle_reclaimed = self.idle_reclaimed.saturating_add(reclaimed as u64);
                    self.tasks
                        .schedule(now.saturating_add(self.sweep_interval), HostTask::SweepIdle);
                }
                HostTask::EvaluateQuality => {
                    let adjustment = self.quality.evaluate();
                    self.dispatcher.set_quality_scale(self.quality.scale());
                    report.quality = Some(adjustment);
                    self.tasks.schedule(
                        now.saturating_add(self.quality_interval),
                        HostTask::EvaluateQuality,
                    );
                }
            }
        }

        report.metrics = self.metrics.maybe_snapshot(now);
        report
    }

    /// Stops every playing effect and returns all stopping instances to
    /// their pools.
    pub fn shutdown(&mut self) -> RuntimeSummary {
        let stopped = self.dispatcher.stop_all(self.backend.as_mut());
        self.dispatcher.tick(self.now, self.backend.as_mut());
        let summary = self.summary();
        info!(
            stopped_effects = stopped,
            frames = summary.frames,
            events_handled = summary.events_handled,
            "runtime_shutdown"
        );
        summary
    }

    pub fn summary(&self) -> RuntimeSummary {
        RuntimeSummary {
            frames: self.frame_index,
            simulated_secs: self.now.as_secs_f32(),
            events_handled: self.events_handled,
            instances_active: self.facade.active_count(),
            instances_queued: self.facade.queued_len(),
            instances_allocated: self.facade.pool().stats().allocated_total,
            idle_reclaimed: self.idle_reclaimed,
            effects: self.dispatcher.stats(),
            effects_active: self.dispatcher.active_count(),
            quality_scale: self.quality.scale(),
            quality_lowered: self.quality.lowered_total(),
            quality_raised: self.quality.raised_total(),
            ui_skipped_updates: self.ui.skipped_updates(),
        }
    }

    fn play_cue(&mut self, routed: RoutedCue) -> PlayOutcome {
        let entry = match &routed.cue.target {
            CueTarget::Template(template_id) => self.catalog.lookup(template_id),
            CueTarget::Category(category) => {
                self.dispatcher.bound_template(&self.catalog, *category)
            }
        };
        let duration = routed.cue.duration.unwrap_or_else(|| {
            let Some(entry) = entry.filter(|entry| entry.params.duration_secs > 0.0) else {
                return DEFAULT_CUE_DURATION;
            };
            Duration::try_from_secs_f32(entry.params.duration_secs).unwrap_or_else(|_| {
                warn!(
                    template_id = %entry.id,
                    duration_secs = entry.params.duration_secs,
                    "effect_cue_duration_out_of_range"
                );
                DEFAULT_CUE_DURATION
            })
        });
        let outcome = match routed.cue.target {
            CueTarget::Template(template_id) => {
                self.play_template(&template_id, routed.placement, duration)
            }
            CueTarget::Category(category) => {
                self.play_effect(category, routed.placement, duration)
            }
        };
        debug!(outcome = ?outcome, "effect_cue_played");
        outcome
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
