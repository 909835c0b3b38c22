use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColor {
    Neutral,
    Good,
    Warning,
    Critical,
}

impl StatusColor {
    pub fn rgba(self) -> [f32; 4] {
        match self {
            Self::Neutral => [0.75, 0.75, 0.75, 1.0],
            Self::Good => [0.2, 0.8, 0.3, 1.0],
            Self::Warning => [0.95, 0.75, 0.1, 1.0],
            Self::Critical => [0.9, 0.2, 0.2, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Label,
    ProgressBar,
    StatusIndicator,
    MessagePanel,
}

/// Named widgets owned by the UI layout engine. Mutating a name that does
/// not exist is a no-op.
pub trait UiSurface {
    fn has_widget(&self, name: &str) -> bool;
    fn set_text(&mut self, name: &str, text: &str);
    fn set_fill(&mut self, name: &str, fraction: f32);
    fn set_color(&mut self, name: &str, color: StatusColor);
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    pub kind: WidgetKind,
    pub text: String,
    pub fill: f32,
    pub color: StatusColor,
    pub update_count: u32,
}

impl WidgetState {
    fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            text: String::new(),
            fill: 0.0,
            color: StatusColor::Neutral,
            update_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WidgetTree {
    widgets: BTreeMap<String, WidgetState>,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_widget(mut self, name: &str, kind: WidgetKind) -> Self {
        self.add(name, kind);
        self
    }

    pub fn add(&mut self, name: &str, kind: WidgetKind) {
        self.widgets.insert(name.to_string(), WidgetState::new(kind));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.widgets.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&WidgetState> {
        self.widgets.get(name)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    fn touch(&mut self, name: &str) -> Option<&mut WidgetState> {
        let widget = self.widgets.get_mut(name)?;
        widget.update_count = widget.update_count.saturating_add(1);
        Some(widget)
    }
}

impl UiSurface for WidgetTree {
    fn has_widget(&self, name: &str) -> bool {
        self.widgets.contains_key(name)
    }

    fn set_text(&mut self, name: &str, text: &str) {
        if let Some(widget) = self.touch(name) {
            widget.text.clear();
            widget.text.push_str(text);
        }
    }

    fn set_fill(&mut self, name: &str, fraction: f32) {
        if let Some(widget) = self.touch(name) {
            widget.fill = fraction.clamp(0.0, 1.0);
        }
    }

    fn set_color(&mut self, name: &str, color: StatusColor) {
        if let Some(widget) = self.touch(name) {
            widget.color = color;
        }
    }
}
