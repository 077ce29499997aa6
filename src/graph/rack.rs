//! The rack: module list plus derived link map.
//!
//! Read-only collections are exposed directly; all mutation that touches
//! live audio state goes through [`crate::runtime`].

use super::link::LinkMap;
use super::module::{Module, ModuleBrand, Position};

/// The complete logical patch.
#[derive(Clone, Debug, Default)]
pub struct Rack {
    pub modules: Vec<Module>,
    pub links: LinkMap,
}

impl Rack {
    /// Creates an empty rack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rack from a loaded module list. Links are not rebuilt here;
    /// that happens during patch initialization, when live units are wired.
    pub fn from_modules(modules: Vec<Module>) -> Self {
        Self {
            modules,
            links: LinkMap::new(),
        }
    }

    /// The built-in sample patch: a microphone input and a speaker output,
    /// not yet cabled together.
    pub fn sample() -> Self {
        let mic = Module::create(ModuleBrand::MicIn, Position::new(50.0, 50.0));
        let speaker = Module::create(ModuleBrand::SpeakerOut, Position::new(200.0, 300.0));
        Self::from_modules(vec![mic, speaker])
    }

    /// Looks up a module by id.
    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Looks up a module by id, mutably.
    pub fn module_mut(&mut self, id: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id == id)
    }

    /// Whether a module with the given id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.module(id).is_some()
    }

    /// Adds a module to the rack.
    pub fn add_module(&mut self, module: Module) {
        self.modules.push(module);
    }

    /// Removes and returns a module. Does not touch links; the delete
    /// cascade in the connection manager is responsible for those.
    pub fn take_module(&mut self, id: &str) -> Option<Module> {
        let index = self.modules.iter().position(|m| m.id == id)?;
        Some(self.modules.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_patch_shape() {
        let rack = Rack::sample();
        assert_eq!(rack.modules.len(), 2);
        assert_eq!(rack.modules[0].brand(), ModuleBrand::MicIn);
        assert_eq!(rack.modules[1].brand(), ModuleBrand::SpeakerOut);
        assert!(rack.links.is_empty());
    }

    #[test]
    fn test_module_lookup() {
        let mut rack = Rack::new();
        let module = Module::create(ModuleBrand::Gain, Position::default());
        let id = module.id.clone();
        rack.add_module(module);

        assert!(rack.contains(&id));
        assert_eq!(rack.module(&id).unwrap().brand(), ModuleBrand::Gain);
        assert!(rack.take_module(&id).is_some());
        assert!(!rack.contains(&id));
        assert!(rack.take_module(&id).is_none());
    }
}
