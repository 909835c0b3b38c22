use crate::runtime::PresentationRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioCommand {
    None,
    Stop,
}

/// Scripted driver for the headless runner. `update` runs at the fixed
/// simulation rate; presentation work goes through the runtime.
pub trait Scenario {
    fn name(&self) -> &str;
    fn load(&mut self, runtime: &mut PresentationRuntime);
    fn update(&mut self, fixed_dt_seconds: f32, runtime: &mut PresentationRuntime)
        -> ScenarioCommand;
    fn unload(&mut self, _runtime: &mut PresentationRuntime) {}
}
