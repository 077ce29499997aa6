//! Node lifecycle manager.
//!
//! Owns the module-id to live-unit mapping. Units are created at most once
//! per module and torn down exactly once; brands whose units cannot be
//! reconfigured in place (the one-shot oscillator, a microphone changing
//! device) go through recreate or install instead.

use std::collections::HashMap;

use crate::dsp::UnitUpdate;
use crate::engine::context::{AudioContext, UnitId};
use crate::graph::{Module, ModuleKind};

use super::error::RuntimeError;

#[derive(Default)]
pub struct NodeManager {
    units: HashMap<String, UnitId>,
}

impl NodeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live unit backing a module, if one exists.
    pub fn get(&self, module_id: &str) -> Option<UnitId> {
        self.units.get(module_id).copied()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.units.contains_key(module_id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Returns the module's live unit, creating it on first use.
    pub fn get_or_create(
        &mut self,
        module: &Module,
        ctx: &mut dyn AudioContext,
    ) -> Result<UnitId, RuntimeError> {
        if let Some(unit) = self.units.get(&module.id) {
            return Ok(*unit);
        }
        let unit = ctx.create_unit(module)?;
        self.units.insert(module.id.clone(), unit);
        Ok(unit)
    }

    /// Tears down the module's live unit. Idempotent: returns false when no
    /// unit existed.
    pub fn destroy(
        &mut self,
        module_id: &str,
        ctx: &mut dyn AudioContext,
    ) -> Result<bool, RuntimeError> {
        match self.units.remove(module_id) {
            Some(unit) => {
                ctx.drop_unit(unit)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replaces the module's unit with a freshly built one. Engine-side
    /// cables attached to the old unit are dropped with it; the connection
    /// manager rewires from the model afterwards.
    pub fn recreate(
        &mut self,
        module: &Module,
        ctx: &mut dyn AudioContext,
    ) -> Result<UnitId, RuntimeError> {
        self.destroy(&module.id, ctx)?;
        self.get_or_create(module, ctx)
    }

    /// Adopts a unit that was built outside the manager. Used for the
    /// microphone device swap, where the replacement unit must be created
    /// successfully before the old one is torn down.
    pub fn install(&mut self, module_id: &str, unit: UnitId) {
        self.units.insert(module_id.to_string(), unit);
    }

    /// Pushes the module's current parameters into its live unit. A module
    /// without a unit, or whose brand has no in-place update, is skipped.
    pub fn dispatch_param_update(
        &self,
        module: &Module,
        ctx: &mut dyn AudioContext,
    ) -> Result<(), RuntimeError> {
        let Some(unit) = self.get(&module.id) else {
            return Ok(());
        };
        let update = match &module.kind {
            ModuleKind::Delay(p) => UnitUpdate::Delay {
                delay_time: p.delay_time.value,
            },
            ModuleKind::BiquadFilter(p) => UnitUpdate::BiquadFilter {
                filter_type: p.filter_type,
                frequency: p.frequency.value,
                q: p.q.value,
                gain: p.gain.value,
                detune: p.detune.value,
            },
            ModuleKind::Gain(p) => UnitUpdate::Gain {
                gain: p.gain.value,
            },
            ModuleKind::Oscillator(p) => UnitUpdate::Oscillator {
                waveform: p.waveform,
                frequency: p.frequency.value,
                detune: p.detune.value,
            },
            ModuleKind::WaveShaper(p) => UnitUpdate::WaveShaper {
                curve: p.curve.clone(),
                oversample: p.oversample,
            },
            _ => return Ok(()),
        };
        ctx.update(unit, update)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::offline::OfflineContext;
    use crate::graph::{ModuleBrand, Position};

    fn module(brand: ModuleBrand) -> Module {
        Module::create(brand, Position::default())
    }

    #[test]
    fn test_get_or_create_is_memoized() {
        let mut ctx = OfflineContext::new(44100);
        let mut nodes = NodeManager::new();
        let gain = module(ModuleBrand::Gain);

        let a = nodes.get_or_create(&gain, &mut ctx).expect("create");
        let b = nodes.get_or_create(&gain, &mut ctx).expect("reuse");
        assert_eq!(a, b);
        assert_eq!(ctx.unit_count(), 1);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut ctx = OfflineContext::new(44100);
        let mut nodes = NodeManager::new();
        let gain = module(ModuleBrand::Gain);
        nodes.get_or_create(&gain, &mut ctx).expect("create");

        assert!(nodes.destroy(&gain.id, &mut ctx).expect("destroy"));
        assert!(!nodes.destroy(&gain.id, &mut ctx).expect("again"));
        assert_eq!(ctx.unit_count(), 0);
    }

    #[test]
    fn test_recreate_swaps_unit() {
        let mut ctx = OfflineContext::new(44100);
        let mut nodes = NodeManager::new();
        let osc = module(ModuleBrand::Oscillator);

        let first = nodes.get_or_create(&osc, &mut ctx).expect("create");
        let second = nodes.recreate(&osc, &mut ctx).expect("recreate");
        assert_ne!(first, second);
        assert_eq!(ctx.unit_count(), 1);
    }

    #[test]
    fn test_param_update_without_unit_is_noop() {
        let mut ctx = OfflineContext::new(44100);
        let nodes = NodeManager::new();
        let gain = module(ModuleBrand::Gain);
        assert!(nodes.dispatch_param_update(&gain, &mut ctx).is_ok());
    }

    #[test]
    fn test_speaker_out_has_no_unit() {
        let mut ctx = OfflineContext::new(44100);
        let mut nodes = NodeManager::new();
        let speaker = module(ModuleBrand::SpeakerOut);
        assert!(nodes.get_or_create(&speaker, &mut ctx).is_err());
        assert!(!nodes.contains(&speaker.id));
    }
}
