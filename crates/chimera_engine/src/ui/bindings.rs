use std::collections::HashMap;

use tracing::debug;

use crate::events::DomainEvent;

use super::message_panel::MessagePanel;
use super::widgets::{StatusColor, UiSurface, WidgetKind, WidgetTree};

pub const KEY_TEMPERATURE: &str = "room.temperature_c";
pub const KEY_HUMIDITY: &str = "room.humidity_pct";
pub const KEY_CO2: &str = "room.co2_ppm";
pub const KEY_CONSTRUCTION: &str = "construction.progress_pct";
pub const KEY_LAST_YIELD: &str = "harvest.last_yield_g";
pub const KEY_HARVEST_TOTAL: &str = "harvest.total_g";
pub const KEY_PLANT_STAGE: &str = "plant.stage";
pub const KEY_EQUIPMENT: &str = "equipment.status";

pub const HUD_MESSAGES: &str = "hud.messages";

#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Number(f32),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    /// Inclusive upper bound.
    pub upper: f32,
    pub color: StatusColor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Text {
        widget: String,
        precision: usize,
        unit: String,
    },
    Fill {
        widget: String,
        min: f32,
        max: f32,
    },
    Threshold {
        widget: String,
        bands: Vec<ThresholdBand>,
        above: StatusColor,
    },
}

impl Binding {
    pub fn widget(&self) -> &str {
        match self {
            Self::Text { widget, .. } | Self::Fill { widget, .. } | Self::Threshold { widget, .. } => {
                widget
            }
        }
    }

    fn apply(&self, value: &DataValue, surface: &mut dyn UiSurface) -> bool {
        match (self, value) {
            (
                Self::Text {
                    widget,
                    precision,
                    unit,
                },
                DataValue::Number(number),
            ) => {
                let precision = *precision;
                surface.set_text(widget, &format!("{number:.precision$}{unit}"));
                true
            }
            (Self::Text { widget, .. }, DataValue::Text(text)) => {
                surface.set_text(widget, text);
                true
            }
            (Self::Fill { widget, min, max }, DataValue::Number(number)) => {
                surface.set_fill(widget, fill_fraction(*number, *min, *max));
                true
            }
            (
                Self::Threshold {
                    widget,
                    bands,
                    above,
                },
                DataValue::Number(number),
            ) => {
                surface.set_color(widget, band_color(bands, *above, *number));
                true
            }
            (Self::Fill { .. } | Self::Threshold { .. }, DataValue::Text(_)) => false,
        }
    }
}

pub fn fill_fraction(value: f32, min: f32, max: f32) -> f32 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

pub fn band_color(bands: &[ThresholdBand], above: StatusColor, value: f32) -> StatusColor {
    bands
        .iter()
        .find(|band| value <= band.upper)
        .map_or(above, |band| band.color)
}

/// Maps data keys to widget updates and turns domain events into data-key
/// values. Every mutation checks that its widget exists first.
#[derive(Debug, Default)]
pub struct UiBindingController {
    bindings: HashMap<String, Vec<Binding>>,
    values: HashMap<String, DataValue>,
    panel: MessagePanel,
    panel_widget: Option<String>,
    panel_visible_lines: usize,
    harvest_total_g: f32,
    skipped_updates: u64,
}

impl UiBindingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bindings for the widgets in [`hud_widget_tree`].
    pub fn with_default_hud() -> Self {
        let mut controller = Self::new();
        let comfort = vec![
            ThresholdBand {
                upper: 18.0,
                color: StatusColor::Warning,
            },
            ThresholdBand {
                upper: 28.0,
                color: StatusColor::Good,
            },
            ThresholdBand {
                upper: 32.0,
                color: StatusColor::Warning,
            },
        ];
        let humidity = vec![
            ThresholdBand {
                upper: 35.0,
                color: StatusColor::Warning,
            },
            ThresholdBand {
                upper: 65.0,
                color: StatusColor::Good,
            },
        ];

        controller.bind_text(KEY_TEMPERATURE, "hud.temperature", 1, " C");
        controller.bind_threshold(
            KEY_TEMPERATURE,
            "hud.temperature_status",
            comfort,
            StatusColor::Critical,
        );
        controller.bind_text(KEY_HUMIDITY, "hud.humidity", 0, "%");
        controller.bind_fill(KEY_HUMIDITY, "hud.humidity_bar", 0.0, 100.0);
        controller.bind_threshold(
            KEY_HUMIDITY,
            "hud.humidity_status",
            humidity,
            StatusColor::Critical,
        );
        controller.bind_text(KEY_CO2, "hud.co2", 0, " ppm");
        controller.bind_fill(KEY_CONSTRUCTION, "hud.construction_bar", 0.0, 100.0);
        controller.bind_text(KEY_CONSTRUCTION, "hud.construction", 0, "%");
        controller.bind_text(KEY_LAST_YIELD, "hud.last_yield", 1, " g");
        controller.bind_text(KEY_HARVEST_TOTAL, "hud.harvest_total", 1, " g");
        controller.bind_text(KEY_PLANT_STAGE, "hud.plant_stage", 0, "");
        controller.bind_text(KEY_EQUIPMENT, "hud.equipment", 0, "");
        controller.attach_panel(HUD_MESSAGES, 6);
        controller
    }

    pub fn bind(&mut self, data_key: &str, binding: Binding) {
        self.bindings
            .entry(data_key.to_string())
            .or_default()
            .push(binding);
    }

    pub fn bind_text(&mut self, data_key: &str, widget: &str, precision: usize, unit: &str) {
        self.bind(
            data_key,
            Binding::Text {
                widget: widget.to_string(),
                precision,
                unit: unit.to_string(),
            },
        );
    }

    pub fn bind_fill(&mut self, data_key: &str, widget: &str, min: f32, max: f32) {
        self.bind(
            data_key,
            Binding::Fill {
                widget: widget.to_string(),
                min,
                max,
            },
        );
    }

    pub fn bind_threshold(
        &mut self,
        data_key: &str,
        widget: &str,
        mut bands: Vec<ThresholdBand>,
        above: StatusColor,
    ) {
        bands.sort_by(|a, b| a.upper.total_cmp(&b.upper));
        self.bind(
            data_key,
            Binding::Threshold {
                widget: widget.to_string(),
                bands,
                above,
            },
        );
    }

    /// Mirrors the newest `visible_lines` panel lines into a text widget.
    pub fn attach_panel(&mut self, widget: &str, visible_lines: usize) {
        self.panel_widget = Some(widget.to_string());
        self.panel_visible_lines = visible_lines.max(1);
    }

    pub fn value(&self, data_key: &str) -> Option<&DataValue> {
        self.values.get(data_key)
    }

    pub fn panel(&self) -> &MessagePanel {
        &self.panel
    }

    pub fn skipped_updates(&self) -> u64 {
        self.skipped_updates
    }

    /// Stores `value` under `data_key` and pushes it through every binding
    /// for that key. Returns how many widgets were updated.
    pub fn set_value(
        &mut self,
        data_key: &str,
        value: DataValue,
        surface: &mut dyn UiSurface,
    ) -> usize {
        let mut applied = 0usize;
        if let Some(bindings) = self.bindings.get(data_key) {
            for binding in bindings {
                if !surface.has_widget(binding.widget()) {
                    self.skipped_updates = self.skipped_updates.saturating_add(1);
                    debug!(
                        data_key,
                        widget = binding.widget(),
                        "ui_widget_missing"
                    );
                    continue;
                }
                if binding.apply(&value, surface) {
                    applied += 1;
                }
            }
        }
        self.values.insert(data_key.to_string(), value);
        applied
    }

    pub fn post_message(&mut self, line: impl Into<String>, surface: &mut dyn UiSurface) -> bool {
        self.panel.push(line);
        let Some(widget) = self.panel_widget.as_deref() else {
            return false;
        };
        if !surface.has_widget(widget) {
            self.skipped_updates = self.skipped_updates.saturating_add(1);
            debug!(widget, "ui_widget_missing");
            return false;
        }
        surface.set_text(widget, &self.panel.render_tail(self.panel_visible_lines));
        true
    }

    pub fn handle_event(&mut self, event: &DomainEvent, surface: &mut dyn UiSurface) -> usize {
        match event {
            DomainEvent::PlantStageChanged {
                plant_id, stage, ..
            } => {
                let applied =
                    self.set_value(KEY_PLANT_STAGE, DataValue::Text(stage.to_string()), surface);
                self.post_message(format!("Plant {plant_id} is now {stage}"), surface);
                applied
            }
            DomainEvent::ConditionsChanged {
                temperature_c,
                humidity_pct,
                co2_ppm,
                ..
            } => {
                self.set_value(KEY_TEMPERATURE, DataValue::Number(*temperature_c), surface)
                    + self.set_value(KEY_HUMIDITY, DataValue::Number(*humidity_pct), surface)
                    + self.set_value(KEY_CO2, DataValue::Number(*co2_ppm), surface)
            }
            DomainEvent::ConstructionProgress {
                site_id, progress, ..
            } => {
                let percent = (progress * 100.0).clamp(0.0, 100.0);
                let applied = self.set_value(KEY_CONSTRUCTION, DataValue::Number(percent), surface);
                if *progress >= 1.0 {
                    self.post_message(format!("Construction site {site_id} complete"), surface);
                }
                applied
            }
            DomainEvent::HarvestCompleted {
                plant_id,
                yield_grams,
                ..
            } => {
                self.harvest_total_g += yield_grams;
                let total = self.harvest_total_g;
                let applied = self.set_value(KEY_LAST_YIELD, DataValue::Number(*yield_grams), surface)
                    + self.set_value(KEY_HARVEST_TOTAL, DataValue::Number(total), surface);
                self.post_message(
                    format!("Harvested {yield_grams:.1} g from plant {plant_id}"),
                    surface,
                );
                applied
            }
            DomainEvent::EquipmentToggled {
                template_id,
                enabled,
                ..
            } => {
                let state = if *enabled { "On" } else { "Off" };
                self.set_value(
                    KEY_EQUIPMENT,
                    DataValue::Text(format!("{template_id}: {state}")),
                    surface,
                )
            }
        }
    }
}

/// Widget tree matching [`UiBindingController::with_default_hud`].
pub fn hud_widget_tree() -> WidgetTree {
    WidgetTree::new()
        .with_widget("hud.temperature", WidgetKind::Label)
        .with_widget("hud.temperature_status", WidgetKind::StatusIndicator)
        .with_widget("hud.humidity", WidgetKind::Label)
        .with_widget("hud.humidity_bar", WidgetKind::ProgressBar)
        .with_widget("hud.humidity_status", WidgetKind::StatusIndicator)
        .with_widget("hud.co2", WidgetKind::Label)
        .with_widget("hud.construction", WidgetKind::Label)
        .with_widget("hud.construction_bar", WidgetKind::ProgressBar)
        .with_widget("hud.last_yield", WidgetKind::Label)
        .with_widget("hud.harvest_total", WidgetKind::Label)
        .with_widget("hud.plant_stage", WidgetKind::Label)
        .with_widget("hud.equipment", WidgetKind::Label)
        .with_widget(HUD_MESSAGES, WidgetKind::MessagePanel)
}
