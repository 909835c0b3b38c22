mod state;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use chimera_engine::runtime::{InstanceId, Placement, PlayOutcome, RequestId, Vec3};
use chimera_engine::{
    DomainEvent, Instantiation, PlantStage, PresentationRuntime, Scenario, ScenarioCommand,
};
use tracing::{debug, info, warn};

use state::{next_stage, stage_template, ClimateModel, ConstructionSite, Plant};

const ROOM_ID: u32 = 1;
const EQUIPMENT_ID: u32 = 1;
const EQUIPMENT_TEMPLATE: &str = "led_grow_light";
const FLOWERING_GLINT_TEMPLATE: &str = "trichome_glint";
const FLOWERING_GLINT_DURATION: Duration = Duration::from_secs(2);
const BASE_YIELD_GRAMS: f32 = 40.0;
const CONSTRUCTION_STEP: f32 = 0.125;

type SpawnInbox = Rc<RefCell<Vec<(RequestId, Option<InstanceId>)>>>;

#[derive(Debug, Clone)]
pub(crate) struct GrowRoomLayout {
    pub(crate) plant_rows: u32,
    pub(crate) plant_cols: u32,
    pub(crate) plant_spacing: f32,
    pub(crate) stage_seconds: f32,
    pub(crate) conditions_interval_seconds: f32,
    pub(crate) construction_interval_seconds: f32,
    pub(crate) equipment_toggle_seconds: f32,
    pub(crate) equipment_position: Vec3,
    pub(crate) construction_site: Vec3,
    pub(crate) harvest_target: Option<u32>,
}

impl Default for GrowRoomLayout {
    fn default() -> Self {
        Self {
            plant_rows: 3,
            plant_cols: 4,
            plant_spacing: 1.5,
            stage_seconds: 4.0,
            conditions_interval_seconds: 2.0,
            construction_interval_seconds: 1.5,
            equipment_toggle_seconds: 8.0,
            equipment_position: Vec3::new(0.0, 3.0, 0.0),
            construction_site: Vec3::new(60.0, 0.0, 0.0),
            harvest_target: None,
        }
    }
}

/// A single grow room: a grid of plants cycling through their stages,
/// drifting climate readings, an out-of-view construction site and a grow
/// light that switches on and off.
pub(crate) struct GrowRoomScenario {
    layout: GrowRoomLayout,
    plants: Vec<Plant>,
    pending: HashMap<RequestId, usize>,
    inbox: SpawnInbox,
    climate: ClimateModel,
    site: ConstructionSite,
    equipment: Option<InstanceId>,
    equipment_on: bool,
    elapsed_seconds: f32,
    conditions_timer: f32,
    construction_timer: f32,
    equipment_timer: f32,
    harvested: u32,
    glints_played: u32,
    glints_culled: u32,
}

impl GrowRoomScenario {
    pub(crate) fn new(layout: GrowRoomLayout) -> Self {
        let mut plants = Vec::new();
        for row in 0..layout.plant_rows {
            for col in 0..layout.plant_cols {
                let id = row * layout.plant_cols + col + 1;
                let position = Vec3::new(
                    col as f32 * layout.plant_spacing,
                    0.0,
                    row as f32 * layout.plant_spacing,
                );
                plants.push(Plant::seedling(id, position));
            }
        }
        let site = ConstructionSite {
            id: 1,
            position: layout.construction_site,
            progress: 0.0,
            step: CONSTRUCTION_STEP,
        };

        Self {
            layout,
            plants,
            pending: HashMap::new(),
            inbox: Rc::new(RefCell::new(Vec::new())),
            climate: ClimateModel::default(),
            site,
            equipment: None,
            equipment_on: false,
            elapsed_seconds: 0.0,
            conditions_timer: 0.0,
            construction_timer: 0.0,
            equipment_timer: 0.0,
            harvested: 0,
            glints_played: 0,
            glints_culled: 0,
        }
    }

    pub(crate) fn harvested(&self) -> u32 {
        self.harvested
    }

    pub(crate) fn plant_count(&self) -> usize {
        self.plants.len()
    }

    pub(crate) fn plants_spawned(&self) -> usize {
        self.plants
            .iter()
            .filter(|plant| plant.instance.is_some())
            .count()
    }

    pub(crate) fn glints(&self) -> (u32, u32) {
        (self.glints_played, self.glints_culled)
    }

    fn request_plant(&mut self, index: usize, runtime: &mut PresentationRuntime) {
        let Some(plant) = self.plants.get(index) else {
            return;
        };
        let inbox = Rc::clone(&self.inbox);
        let request = runtime.instantiate_async(
            stage_template(plant.stage),
            Placement::at(plant.position),
            Box::new(move |request, instance| inbox.borrow_mut().push((request, instance))),
        );
        self.pending.insert(request, index);
    }

    fn collect_spawned(&mut self) {
        let ready = std::mem::take(&mut *self.inbox.borrow_mut());
        for (request, instance) in ready {
            let Some(index) = self.pending.remove(&request) else {
                continue;
            };
            let Some(plant) = self.plants.get_mut(index) else {
                continue;
            };
            match instance {
                Some(id) => plant.instance = Some(id),
                None => warn!(plant_id = plant.id, "plant_spawn_failed"),
            }
        }
    }

    fn advance_plants(&mut self, dt: f32, runtime: &mut PresentationRuntime) {
        for index in 0..self.plants.len() {
            let plant = &mut self.plants[index];
            plant.stage_elapsed += dt;
            if let Some(id) = plant.instance {
                runtime.touch(id);
            }
            if plant.stage_elapsed < self.layout.stage_seconds {
                continue;
            }
            plant.stage_elapsed = 0.0;
            match next_stage(plant.stage) {
                Some(stage) => self.grow(index, stage, runtime),
                None => self.harvest(index, runtime),
            }
        }
    }

    fn grow(&mut self, index: usize, stage: PlantStage, runtime: &mut PresentationRuntime) {
        let plant = &mut self.plants[index];
        let template_changed = stage_template(stage) != stage_template(plant.stage);
        plant.stage = stage;
        let (plant_id, position) = (plant.id, plant.position);
        let previous = if template_changed {
            plant.instance.take()
        } else {
            None
        };

        runtime.publish(DomainEvent::PlantStageChanged {
            plant_id,
            stage,
            position,
        });
        if let Some(id) = previous {
            runtime.release(id);
        }
        if template_changed {
            self.request_plant(index, runtime);
        }

        if stage == PlantStage::Flowering {
            match runtime.play_template(
                FLOWERING_GLINT_TEMPLATE,
                Placement::at(position),
                FLOWERING_GLINT_DURATION,
            ) {
                PlayOutcome::Playing(_) => self.glints_played += 1,
                PlayOutcome::Culled => self.glints_culled += 1,
                other => debug!(plant_id, outcome = ?other, "flowering_glint_skipped"),
            }
        }
    }

    fn harvest(&mut self, index: usize, runtime: &mut PresentationRuntime) {
        let plant = &mut self.plants[index];
        let yield_grams = plant.yield_grams(BASE_YIELD_GRAMS);
        let (plant_id, position) = (plant.id, plant.position);
        let previous = plant.instance.take();
        plant.stage = PlantStage::Seedling;

        runtime.publish(DomainEvent::HarvestCompleted {
            plant_id,
            yield_grams,
            position,
        });
        if let Some(id) = previous {
            runtime.release(id);
        }
        self.request_plant(index, runtime);
        self.harvested += 1;
        info!(
            plant_id,
            yield_grams,
            harvested_total = self.harvested,
            "plant_harvested"
        );
    }

    fn update_conditions(&mut self, dt: f32, runtime: &mut PresentationRuntime) {
        self.conditions_timer += dt;
        if self.conditions_timer < self.layout.conditions_interval_seconds {
            return;
        }
        self.conditions_timer -= self.layout.conditions_interval_seconds;
        let (temperature_c, humidity_pct, co2_ppm) = self.climate.sample(self.elapsed_seconds);
        runtime.publish(DomainEvent::ConditionsChanged {
            room_id: ROOM_ID,
            temperature_c,
            humidity_pct,
            co2_ppm,
            position: Vec3::ZERO,
        });
    }

    fn update_construction(&mut self, dt: f32, runtime: &mut PresentationRuntime) {
        self.construction_timer += dt;
        if self.construction_timer < self.layout.construction_interval_seconds {
            return;
        }
        self.construction_timer -= self.layout.construction_interval_seconds;
        if let Some(progress) = self.site.advance() {
            runtime.publish(DomainEvent::ConstructionProgress {
                site_id: self.site.id,
                progress,
                position: self.site.position,
            });
        }
    }

    fn update_equipment(&mut self, dt: f32, runtime: &mut PresentationRuntime) {
        self.equipment_timer += dt;
        if self.equipment_timer < self.layout.equipment_toggle_seconds {
            return;
        }
        self.equipment_timer -= self.layout.equipment_toggle_seconds;
        self.equipment_on = !self.equipment_on;
        if let Some(id) = self.equipment {
            runtime.touch(id);
        }
        runtime.publish(DomainEvent::EquipmentToggled {
            equipment_id: EQUIPMENT_ID,
            template_id: EQUIPMENT_TEMPLATE.to_string(),
            enabled: self.equipment_on,
            position: self.layout.equipment_position,
        });
    }
}

impl Scenario for GrowRoomScenario {
    fn name(&self) -> &str {
        "grow_room"
    }

    fn load(&mut self, runtime: &mut PresentationRuntime) {
        runtime.set_viewer(Vec3::ZERO);
        let preloaded = runtime.preload(stage_template(PlantStage::Seedling), self.plants.len());
        for index in 0..self.plants.len() {
            self.request_plant(index, runtime);
        }
        self.equipment = match runtime.instantiate(
            EQUIPMENT_TEMPLATE,
            Placement::at(self.layout.equipment_position),
        ) {
            Instantiation::Ready(id) => Some(id),
            other => {
                warn!(outcome = ?other, "grow_room_equipment_unavailable");
                None
            }
        };
        info!(
            plants = self.plant_count(),
            preloaded,
            equipment = self.equipment.is_some(),
            "grow_room_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        runtime: &mut PresentationRuntime,
    ) -> ScenarioCommand {
        self.collect_spawned();
        self.elapsed_seconds += fixed_dt_seconds;
        self.advance_plants(fixed_dt_seconds, runtime);
        self.update_conditions(fixed_dt_seconds, runtime);
        self.update_construction(fixed_dt_seconds, runtime);
        self.update_equipment(fixed_dt_seconds, runtime);

        match self.layout.harvest_target {
            Some(target) if self.harvested >= target => {
                info!(harvested = self.harvested, target, "harvest_target_reached");
                ScenarioCommand::Stop
            }
            _ => ScenarioCommand::None,
        }
    }

    fn unload(&mut self, runtime: &mut PresentationRuntime) {
        self.collect_spawned();
        let spawned = self.plants_spawned();
        let (glints_played, glints_culled) = self.glints();
        for plant in &mut self.plants {
            if let Some(id) = plant.instance.take() {
                runtime.release(id);
            }
        }
        if let Some(id) = self.equipment.take() {
            runtime.release(id);
        }
        info!(
            harvested = self.harvested(),
            spawned,
            glints_played,
            glints_culled,
            "grow_room_unloaded"
        );
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
