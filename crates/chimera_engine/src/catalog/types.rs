use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateCategory {
    Plant,
    Equipment,
    Facility,
    Environment,
    Ui,
    Particle,
    Audio,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 7] = [
        TemplateCategory::Plant,
        TemplateCategory::Equipment,
        TemplateCategory::Facility,
        TemplateCategory::Environment,
        TemplateCategory::Ui,
        TemplateCategory::Particle,
        TemplateCategory::Audio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateCategory::Plant => "Plant",
            TemplateCategory::Equipment => "Equipment",
            TemplateCategory::Facility => "Facility",
            TemplateCategory::Environment => "Environment",
            TemplateCategory::Ui => "Ui",
            TemplateCategory::Particle => "Particle",
            TemplateCategory::Audio => "Audio",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Particle,
    VfxGraph,
    AudioClip,
    Widget,
    Mesh,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Particle,
        AssetKind::VfxGraph,
        AssetKind::AudioClip,
        AssetKind::Widget,
        AssetKind::Mesh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Particle => "Particle",
            AssetKind::VfxGraph => "VfxGraph",
            AssetKind::AudioClip => "AudioClip",
            AssetKind::Widget => "Widget",
            AssetKind::Mesh => "Mesh",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationAsset {
    pub kind: AssetKind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemplateParams {
    pub radius: f32,
    pub power_draw: f32,
    pub duration_secs: f32,
    pub intensity_min: f32,
    pub intensity_max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Radius,
    PowerDraw,
    Duration,
    IntensityMin,
    IntensityMax,
}

impl TemplateParams {
    pub fn get(&self, field: NumericField) -> f32 {
        match field {
            NumericField::Radius => self.radius,
            NumericField::PowerDraw => self.power_draw,
            NumericField::Duration => self.duration_secs,
            NumericField::IntensityMin => self.intensity_min,
            NumericField::IntensityMax => self.intensity_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub id: String,
    pub category: TemplateCategory,
    pub label: String,
    pub params: TemplateParams,
    pub required_capabilities: Vec<String>,
    pub presentation_assets: Vec<PresentationAsset>,
    pub pooled: bool,
    pub pool_capacity: Option<usize>,
}

impl TemplateEntry {
    pub fn new(id: &str, category: TemplateCategory, label: &str) -> Self {
        Self {
            id: id.to_string(),
            category,
            label: label.to_string(),
            params: TemplateParams::default(),
            required_capabilities: Vec::new(),
            presentation_assets: Vec::new(),
            pooled: true,
            pool_capacity: None,
        }
    }

    pub fn with_params(mut self, params: TemplateParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_capabilities(mut self, tags: &[&str]) -> Self {
        self.required_capabilities = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }

    pub fn with_asset(mut self, kind: AssetKind, name: &str) -> Self {
        self.presentation_assets.push(PresentationAsset {
            kind,
            name: name.to_string(),
        });
        self
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    pub fn unpooled(mut self) -> Self {
        self.pooled = false;
        self
    }

    pub fn has_capability(&self, tag: &str) -> bool {
        self.required_capabilities
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(
            TemplateCategory::parse("particle"),
            Some(TemplateCategory::Particle)
        );
        assert_eq!(TemplateCategory::parse("Ui"), Some(TemplateCategory::Ui));
        assert_eq!(TemplateCategory::parse("Spaceship"), None);
    }

    #[test]
    fn numeric_field_reads_matching_param() {
        let params = TemplateParams {
            radius: 1.0,
            power_draw: 2.0,
            duration_secs: 3.0,
            intensity_min: 4.0,
            intensity_max: 5.0,
        };
        assert_eq!(params.get(NumericField::Radius), 1.0);
        assert_eq!(params.get(NumericField::PowerDraw), 2.0);
        assert_eq!(params.get(NumericField::Duration), 3.0);
        assert_eq!(params.get(NumericField::IntensityMin), 4.0);
        assert_eq!(params.get(NumericField::IntensityMax), 5.0);
    }
}
