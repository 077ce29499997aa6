//! The live unit graph.
//!
//! Owned by whichever side renders audio (the cpal callback, or the offline
//! context directly). Each block runs in two phases: first every unit's
//! input and modulation buffers are gathered from the previous block's
//! outputs, then every unit processes. Feedback cycles are therefore legal
//! and cost one block of latency per cable hop.

use std::collections::HashMap;

use crate::dsp::{ModInputs, Unit, UnitUpdate};

use super::commands::EngineCommand;
use super::context::{Endpoint, UnitId};

/// One cable in the live graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Wire {
    pub source: UnitId,
    pub destination: Endpoint,
}

struct UnitState {
    unit: Box<dyn Unit>,
    input: Vec<f32>,
    /// One buffer per modulation key that has at least one cable.
    mods: Vec<(String, Vec<f32>)>,
}

pub struct UnitGraph {
    units: HashMap<UnitId, UnitState>,
    /// Previous block's output per unit, read during the gather phase.
    outputs: HashMap<UnitId, Vec<f32>>,
    wires: Vec<Wire>,
    master: Vec<f32>,
    scratch: Vec<f32>,
    block_size: usize,
}

impl UnitGraph {
    pub fn new(block_size: usize) -> Self {
        Self {
            units: HashMap::new(),
            outputs: HashMap::new(),
            wires: Vec::new(),
            master: vec![0.0; block_size],
            scratch: vec![0.0; block_size],
            block_size,
        }
    }

    pub fn insert(&mut self, id: UnitId, unit: Box<dyn Unit>) {
        self.units.insert(
            id,
            UnitState {
                unit,
                input: vec![0.0; self.block_size],
                mods: Vec::new(),
            },
        );
        self.outputs.insert(id, vec![0.0; self.block_size]);
    }

    pub fn remove(&mut self, id: UnitId) {
        self.units.remove(&id);
        self.outputs.remove(&id);
        self.wires
            .retain(|wire| wire.source != id && !endpoint_touches(&wire.destination, id));
    }

    pub fn connect(&mut self, source: UnitId, destination: Endpoint) {
        let wire = Wire {
            source,
            destination,
        };
        if self.wires.contains(&wire) {
            return;
        }
        if let Endpoint::Param(id, key) = &wire.destination {
            if let Some(state) = self.units.get_mut(id) {
                if !state.mods.iter().any(|(k, _)| k == key) {
                    state.mods.push((key.clone(), vec![0.0; self.block_size]));
                }
            }
        }
        self.wires.push(wire);
    }

    pub fn disconnect(&mut self, source: UnitId, destination: &Endpoint) {
        self.wires
            .retain(|wire| !(wire.source == source && wire.destination == *destination));
    }

    pub fn start(&mut self, id: UnitId) {
        if let Some(state) = self.units.get_mut(&id) {
            state.unit.start();
        }
    }

    pub fn stop(&mut self, id: UnitId) {
        if let Some(state) = self.units.get_mut(&id) {
            state.unit.stop();
        }
    }

    pub fn update(&mut self, id: UnitId, update: &UnitUpdate) {
        if let Some(state) = self.units.get_mut(&id) {
            state.unit.apply(update);
        }
    }

    /// Applies one control-side command. Commands referring to units that
    /// no longer exist are dropped silently; the control side validated
    /// them when they were issued.
    pub fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::InsertUnit { unit, node } => self.insert(unit, node),
            EngineCommand::RemoveUnit(unit) => self.remove(unit),
            EngineCommand::Connect {
                source,
                destination,
            } => self.connect(source, destination),
            EngineCommand::Disconnect {
                source,
                destination,
            } => self.disconnect(source, &destination),
            EngineCommand::Start(unit) => self.start(unit),
            EngineCommand::Stop(unit) => self.stop(unit),
            EngineCommand::Update { unit, update } => self.update(unit, &update),
        }
    }

    /// Renders one block and returns the master output.
    pub fn process(&mut self) -> &[f32] {
        // Gather: route last block's outputs into each destination buffer.
        for state in self.units.values_mut() {
            state.input.fill(0.0);
            for (_, buf) in state.mods.iter_mut() {
                buf.fill(0.0);
            }
        }
        for wire in &self.wires {
            let Some(source) = self.outputs.get(&wire.source) else {
                continue;
            };
            match &wire.destination {
                Endpoint::Node(id) => {
                    if let Some(state) = self.units.get_mut(id) {
                        mix_into(&mut state.input, source);
                    }
                }
                Endpoint::Param(id, key) => {
                    if let Some(state) = self.units.get_mut(id) {
                        if let Some((_, buf)) = state.mods.iter_mut().find(|(k, _)| k == key) {
                            mix_into(buf, source);
                        }
                    }
                }
                Endpoint::MasterOut => {}
            }
        }

        // Process every unit into its fresh output buffer.
        for (id, state) in self.units.iter_mut() {
            let mods = ModInputs::new(&state.mods);
            state.unit.process(&state.input, &mods, &mut self.scratch);
            if let Some(out) = self.outputs.get_mut(id) {
                out.copy_from_slice(&self.scratch);
            }
        }

        // Mix cables patched into the master output.
        self.master.fill(0.0);
        for wire in &self.wires {
            if wire.destination == Endpoint::MasterOut {
                if let Some(source) = self.outputs.get(&wire.source) {
                    let master = &mut self.master;
                    mix_into(master, source);
                }
            }
        }
        &self.master
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }
}

fn endpoint_touches(endpoint: &Endpoint, id: UnitId) -> bool {
    match endpoint {
        Endpoint::Node(unit) | Endpoint::Param(unit, _) => *unit == id,
        Endpoint::MasterOut => false,
    }
}

fn mix_into(destination: &mut [f32], source: &[f32]) {
    for (out, sample) in destination.iter_mut().zip(source) {
        *out += sample;
    }
}
