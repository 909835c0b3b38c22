mod bindings;
mod message_panel;
mod widgets;

pub use bindings::{
    band_color, fill_fraction, hud_widget_tree, Binding, DataValue, ThresholdBand,
    UiBindingController, HUD_MESSAGES, KEY_CO2, KEY_CONSTRUCTION, KEY_EQUIPMENT,
    KEY_HARVEST_TOTAL, KEY_HUMIDITY, KEY_LAST_YIELD, KEY_PLANT_STAGE, KEY_TEMPERATURE,
};
pub use message_panel::{MessagePanel, DEFAULT_PANEL_LINES};
pub use widgets::{StatusColor, UiSurface, WidgetKind, WidgetState, WidgetTree};
