use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::catalog::PresentationAsset;

use super::effects::EffectId;
use super::math::Placement;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    pub intensity: f32,
    pub duration: Duration,
    pub tint: Option<[f32; 4]>,
}

/// Boundary to the engine that actually draws and plays presentation
/// assets. Calls are fire-and-forget; completion is driven by the
/// dispatcher's own timers.
pub trait PresentationBackend {
    fn spawn_presentation(
        &mut self,
        effect: EffectId,
        asset: &PresentationAsset,
        placement: Placement,
        params: &EffectParams,
    );

    fn stop_presentation(&mut self, effect: EffectId);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl PresentationBackend for NullBackend {
    fn spawn_presentation(
        &mut self,
        _effect: EffectId,
        _asset: &PresentationAsset,
        _placement: Placement,
        _params: &EffectParams,
    ) {
    }

    fn stop_presentation(&mut self, _effect: EffectId) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Spawn {
        effect: EffectId,
        asset_name: String,
        placement: Placement,
        intensity: f32,
    },
    Stop {
        effect: EffectId,
    },
}

/// Keeps every call in a log that stays readable after the backend has been
/// handed to a runtime.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    calls: Rc<RefCell<Vec<BackendCall>>>,
}

#[derive(Debug, Clone)]
pub struct BackendLog {
    calls: Rc<RefCell<Vec<BackendCall>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> BackendLog {
        BackendLog {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl BackendLog {
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, BackendCall::Spawn { .. }))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, BackendCall::Stop { .. }))
            .count()
    }
}

impl PresentationBackend for RecordingBackend {
    fn spawn_presentation(
        &mut self,
        effect: EffectId,
        asset: &PresentationAsset,
        placement: Placement,
        params: &EffectParams,
    ) {
        self.calls.borrow_mut().push(BackendCall::Spawn {
            effect,
            asset_name: asset.name.clone(),
            placement,
            intensity: params.intensity,
        });
    }

    fn stop_presentation(&mut self, effect: EffectId) {
        self.calls.borrow_mut().push(BackendCall::Stop { effect });
    }
}
