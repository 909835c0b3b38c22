use super::types::{AssetKind, TemplateCategory, TemplateEntry, TemplateParams};

fn params(
    radius: f32,
    power_draw: f32,
    duration_secs: f32,
    intensity_min: f32,
    intensity_max: f32,
) -> TemplateParams {
    TemplateParams {
        radius,
        power_draw,
        duration_secs,
        intensity_min,
        intensity_max,
    }
}

pub(crate) fn default_entries() -> Vec<TemplateEntry> {
    let mut entries = Vec::with_capacity(32);
    entries.extend(plant_entries());
    entries.extend(equipment_entries());
    entries.extend(facility_entries());
    entries.extend(environment_entries());
    entries.extend(ui_entries());
    entries.extend(particle_entries());
    entries.extend(audio_entries());
    entries
}

fn plant_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new("plant_seedling", TemplateCategory::Plant, "Seedling")
            .with_params(params(0.15, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["growable", "waterable"])
            .with_asset(AssetKind::Mesh, "mesh_seedling")
            .with_pool_capacity(128),
        TemplateEntry::new("plant_vegetative", TemplateCategory::Plant, "Vegetative Plant")
            .with_params(params(0.4, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["growable", "waterable", "trainable"])
            .with_asset(AssetKind::Mesh, "mesh_vegetative")
            .with_pool_capacity(128),
        TemplateEntry::new("plant_flowering", TemplateCategory::Plant, "Flowering Plant")
            .with_params(params(0.6, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["growable", "waterable", "harvestable"])
            .with_asset(AssetKind::Mesh, "mesh_flowering")
            .with_pool_capacity(128),
        TemplateEntry::new("plant_mother", TemplateCategory::Plant, "Mother Plant")
            .with_params(params(0.8, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["growable", "waterable", "cloneable"])
            .with_asset(AssetKind::Mesh, "mesh_mother")
            .with_pool_capacity(16),
    ]
}

fn equipment_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new("led_grow_light", TemplateCategory::Equipment, "LED Grow Light")
            .with_params(params(2.5, 480.0, 0.0, 0.2, 1.0))
            .with_capabilities(&["power", "lighting", "dimmable", "spectrum"])
            .with_asset(AssetKind::Mesh, "mesh_led_panel"),
        TemplateEntry::new("hps_grow_light", TemplateCategory::Equipment, "HPS Grow Light")
            .with_params(params(2.0, 1000.0, 0.0, 0.5, 1.0))
            .with_capabilities(&["power", "lighting"])
            .with_asset(AssetKind::Mesh, "mesh_hps_lamp"),
        TemplateEntry::new("hvac_unit", TemplateCategory::Equipment, "HVAC Unit")
            .with_params(params(6.0, 3500.0, 0.0, 0.0, 1.0))
            .with_capabilities(&["power", "climate", "ducted"])
            .with_asset(AssetKind::Mesh, "mesh_hvac")
            .with_asset(AssetKind::AudioClip, "sfx_hvac_hum"),
        TemplateEntry::new("dehumidifier", TemplateCategory::Equipment, "Dehumidifier")
            .with_params(params(4.0, 700.0, 0.0, 0.0, 1.0))
            .with_capabilities(&["power", "climate"])
            .with_asset(AssetKind::Mesh, "mesh_dehumidifier"),
        TemplateEntry::new("drip_irrigation", TemplateCategory::Equipment, "Drip Irrigation")
            .with_params(params(3.0, 60.0, 0.0, 0.0, 1.0))
            .with_capabilities(&["power", "watering", "plumbed"])
            .with_asset(AssetKind::Mesh, "mesh_drip_line"),
        TemplateEntry::new("co2_generator", TemplateCategory::Equipment, "CO2 Generator")
            .with_params(params(5.0, 150.0, 0.0, 0.0, 1.0))
            .with_capabilities(&["power", "climate", "co2"])
            .with_asset(AssetKind::Mesh, "mesh_co2_burner"),
    ]
}

fn facility_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new("room_grow_small", TemplateCategory::Facility, "Small Grow Room")
            .with_params(params(4.0, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["lighting", "climate", "watering"])
            .with_asset(AssetKind::Mesh, "mesh_room_4x4")
            .unpooled(),
        TemplateEntry::new("room_grow_large", TemplateCategory::Facility, "Large Grow Room")
            .with_params(params(10.0, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["lighting", "climate", "watering", "co2"])
            .with_asset(AssetKind::Mesh, "mesh_room_10x10")
            .unpooled(),
        TemplateEntry::new("room_drying", TemplateCategory::Facility, "Drying Room")
            .with_params(params(5.0, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["climate"])
            .with_asset(AssetKind::Mesh, "mesh_room_drying")
            .unpooled(),
        TemplateEntry::new("room_processing", TemplateCategory::Facility, "Processing Lab")
            .with_params(params(6.0, 0.0, 0.0, 0.0, 0.0))
            .with_capabilities(&["power"])
            .with_asset(AssetKind::Mesh, "mesh_room_lab")
            .unpooled(),
    ]
}

fn environment_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new("env_heat_shimmer", TemplateCategory::Environment, "Heat Shimmer")
            .with_params(params(3.0, 0.0, 4.0, 0.2, 0.8))
            .with_capabilities(&["temperature"])
            .with_asset(AssetKind::VfxGraph, "vfx_heat_shimmer"),
        TemplateEntry::new("env_humidity_mist", TemplateCategory::Environment, "Humidity Mist")
            .with_params(params(4.0, 0.0, 5.0, 0.1, 0.7))
            .with_capabilities(&["humidity"])
            .with_asset(AssetKind::Particle, "fx_mist"),
        TemplateEntry::new("env_airflow", TemplateCategory::Environment, "Airflow Streams")
            .with_params(params(5.0, 0.0, 3.0, 0.3, 1.0))
            .with_capabilities(&["airflow"])
            .with_asset(AssetKind::VfxGraph, "vfx_airflow"),
        TemplateEntry::new("env_co2_haze", TemplateCategory::Environment, "CO2 Haze")
            .with_params(params(4.0, 0.0, 6.0, 0.1, 0.5))
            .with_capabilities(&["co2"])
            .with_asset(AssetKind::Particle, "fx_co2_haze"),
    ]
}

fn ui_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new("ui_progress_bar", TemplateCategory::Ui, "Progress Bar")
            .with_capabilities(&["fill"])
            .with_asset(AssetKind::Widget, "widget_progress_bar"),
        TemplateEntry::new("ui_status_indicator", TemplateCategory::Ui, "Status Indicator")
            .with_capabilities(&["color_band"])
            .with_asset(AssetKind::Widget, "widget_status_light"),
        TemplateEntry::new("ui_metric_label", TemplateCategory::Ui, "Metric Label")
            .with_capabilities(&["text"])
            .with_asset(AssetKind::Widget, "widget_metric_label"),
        TemplateEntry::new("ui_message_panel", TemplateCategory::Ui, "Message Panel")
            .with_capabilities(&["text", "scroll"])
            .with_asset(AssetKind::Widget, "widget_message_panel"),
    ]
}

fn particle_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new(
            "plant_growth_sparkles",
            TemplateCategory::Particle,
            "Growth Sparkles",
        )
        .with_params(params(1.0, 0.0, 3.0, 0.4, 1.0))
        .with_capabilities(&["growth"])
        .with_asset(AssetKind::Particle, "fx_growth_sparkles")
        .with_pool_capacity(24),
        TemplateEntry::new("harvest_burst", TemplateCategory::Particle, "Harvest Burst")
            .with_params(params(1.5, 0.0, 2.0, 0.6, 1.0))
            .with_capabilities(&["harvest"])
            .with_asset(AssetKind::Particle, "fx_harvest_burst")
            .with_asset(AssetKind::AudioClip, "sfx_harvest_snip")
            .with_pool_capacity(12),
        TemplateEntry::new("construction_dust", TemplateCategory::Particle, "Construction Dust")
            .with_params(params(3.0, 0.0, 4.0, 0.3, 0.9))
            .with_capabilities(&["construction"])
            .with_asset(AssetKind::Particle, "fx_construction_dust")
            .with_asset(AssetKind::AudioClip, "sfx_construction_loop")
            .with_pool_capacity(8),
        TemplateEntry::new("construction_complete", TemplateCategory::Particle, "Build Complete")
            .with_params(params(2.0, 0.0, 2.5, 0.8, 1.0))
            .with_capabilities(&["construction"])
            .with_asset(AssetKind::VfxGraph, "vfx_build_complete")
            .with_pool_capacity(4),
        TemplateEntry::new("equipment_sparks", TemplateCategory::Particle, "Equipment Sparks")
            .with_params(params(0.8, 0.0, 1.5, 0.5, 1.0))
            .with_capabilities(&["equipment"])
            .with_asset(AssetKind::Particle, "fx_sparks")
            .with_pool_capacity(8),
    ]
}

fn audio_entries() -> Vec<TemplateEntry> {
    vec![
        TemplateEntry::new("sfx_water_pour", TemplateCategory::Audio, "Water Pour")
            .with_params(params(6.0, 0.0, 2.0, 0.5, 0.9))
            .with_capabilities(&["watering"])
            .with_asset(AssetKind::AudioClip, "sfx_water_pour"),
        TemplateEntry::new("sfx_equipment_click", TemplateCategory::Audio, "Equipment Click")
            .with_params(params(4.0, 0.0, 0.5, 0.6, 1.0))
            .with_capabilities(&["equipment"])
            .with_asset(AssetKind::AudioClip, "sfx_switch_click"),
        TemplateEntry::new("sfx_stage_chime", TemplateCategory::Audio, "Stage Chime")
            .with_params(params(8.0, 0.0, 1.5, 0.4, 0.8))
            .with_capabilities(&["growth"])
            .with_asset(AssetKind::AudioClip, "sfx_stage_chime"),
    ]
}
