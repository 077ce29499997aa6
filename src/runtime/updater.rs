//! Update dispatcher.
//!
//! Translates per-brand edit events into model mutations plus the matching
//! engine-side action: an in-place parameter push for most brands, the
//! one-shot start/stop/recreate dance for the oscillator, a tear-down and
//! rebuild for a microphone device swap, and recorder control for the
//! recording module.

use crate::engine::context::AudioContext;
use crate::graph::{
    curves, CurveType, FilterType, MicInParam, Module, ModuleKind, Oversample, Rack, Waveform,
};

use super::connections::rewire_all;
use super::error::RuntimeError;
use super::node_manager::NodeManager;
use super::recorder::Recorder;

/// One edit to a module's parameters.
#[derive(Clone, Debug)]
pub enum UpdateEvent {
    Delay {
        module_id: String,
        delay_time: f32,
    },
    BiquadFilter {
        module_id: String,
        filter_type: FilterType,
        frequency: f32,
        q: f32,
        gain: f32,
        detune: f32,
    },
    Gain {
        module_id: String,
        gain: f32,
    },
    Oscillator {
        module_id: String,
        waveform: Waveform,
        frequency: f32,
        detune: f32,
        is_playing: bool,
    },
    WaveShaper {
        module_id: String,
        curve_type: CurveType,
        amount: f32,
        oversample: Oversample,
    },
    Recording {
        module_id: String,
        is_recording: bool,
    },
    /// Swap the capture device of a microphone module.
    ChangeAudioInput {
        module_id: String,
        mic: String,
        speaker: String,
    },
}

/// Applies one edit event to the model, the live units, and the recorder.
pub fn dispatch_update(
    rack: &mut Rack,
    nodes: &mut NodeManager,
    ctx: &mut dyn AudioContext,
    recorder: &mut dyn Recorder,
    event: UpdateEvent,
) -> Result<(), RuntimeError> {
    match event {
        UpdateEvent::Delay {
            module_id,
            delay_time,
        } => {
            let module = require(rack, &module_id)?;
            if let ModuleKind::Delay(p) = &mut module.kind {
                p.delay_time.set(delay_time);
            }
            let snapshot = module.clone();
            nodes.dispatch_param_update(&snapshot, ctx)
        }

        UpdateEvent::BiquadFilter {
            module_id,
            filter_type,
            frequency,
            q,
            gain,
            detune,
        } => {
            let module = require(rack, &module_id)?;
            if let ModuleKind::BiquadFilter(p) = &mut module.kind {
                p.filter_type = filter_type;
                p.frequency.set(frequency);
                p.q.set(q);
                p.gain.set(gain);
                p.detune.set(detune);
            }
            let snapshot = module.clone();
            nodes.dispatch_param_update(&snapshot, ctx)
        }

        UpdateEvent::Gain { module_id, gain } => {
            let module = require(rack, &module_id)?;
            if let ModuleKind::Gain(p) = &mut module.kind {
                p.gain.set(gain);
            }
            let snapshot = module.clone();
            nodes.dispatch_param_update(&snapshot, ctx)
        }

        UpdateEvent::Oscillator {
            module_id,
            waveform,
            frequency,
            detune,
            is_playing,
        } => {
            let module = require(rack, &module_id)?;
            let ModuleKind::Oscillator(p) = &mut module.kind else {
                return Ok(());
            };
            let was_playing = p.is_playing;
            p.waveform = waveform;
            p.frequency.set(frequency);
            p.detune.set(detune);
            p.is_playing = is_playing;
            let snapshot = module.clone();

            nodes.dispatch_param_update(&snapshot, ctx)?;
            match (was_playing, is_playing) {
                (false, true) => {
                    if let Some(unit) = nodes.get(&module_id) {
                        ctx.start(unit)?;
                    }
                    Ok(())
                }
                (true, false) => {
                    // A one-shot source never restarts. Stop it, then swap
                    // in a fresh armed unit and restore every cable.
                    if let Some(unit) = nodes.get(&module_id) {
                        ctx.stop(unit)?;
                    }
                    nodes.recreate(&snapshot, ctx)?;
                    rewire_all(rack, nodes, ctx)
                }
                _ => Ok(()),
            }
        }

        UpdateEvent::WaveShaper {
            module_id,
            curve_type,
            amount,
            oversample,
        } => {
            let module = require(rack, &module_id)?;
            if let ModuleKind::WaveShaper(p) = &mut module.kind {
                p.curve_type = curve_type;
                p.amount.set(amount);
                p.oversample = oversample;
                p.curve = curves::generate_curve(curve_type, p.amount.value);
            }
            let snapshot = module.clone();
            nodes.dispatch_param_update(&snapshot, ctx)
        }

        UpdateEvent::Recording {
            module_id,
            is_recording,
        } => {
            let module = require(rack, &module_id)?;
            let ModuleKind::Recording(p) = &mut module.kind else {
                return Ok(());
            };
            if p.is_recording == is_recording {
                return Ok(());
            }
            p.is_recording = is_recording;

            if is_recording {
                let unit = nodes
                    .get(&module_id)
                    .ok_or_else(|| RuntimeError::MissingLiveUnit(module_id.clone()))?;
                let handle = ctx.capture(unit)?;
                recorder.start(&module_id, handle)?;
            } else {
                recorder.stop(&module_id)?;
            }
            Ok(())
        }

        UpdateEvent::ChangeAudioInput {
            module_id,
            mic,
            speaker,
        } => {
            let module = rack
                .module(&module_id)
                .cloned()
                .ok_or_else(|| RuntimeError::MissingModule(module_id.clone()))?;
            if !matches!(module.kind, ModuleKind::MicIn(_)) {
                return Ok(());
            }

            // Open the new device before touching anything: if it fails,
            // the old unit and all wiring stay as they were.
            let mut trial = module;
            trial.kind = ModuleKind::MicIn(MicInParam { mic, speaker });
            let new_unit = ctx.create_unit(&trial)?;

            if let Some(old_unit) = nodes.get(&module_id) {
                let _ = ctx.drop_unit(old_unit);
            }
            nodes.install(&module_id, new_unit);
            if let Some(module) = rack.module_mut(&module_id) {
                module.kind = trial.kind;
            }
            rewire_all(rack, nodes, ctx)
        }
    }
}

fn require<'a>(rack: &'a mut Rack, module_id: &str) -> Result<&'a mut Module, RuntimeError> {
    rack.module_mut(module_id)
        .ok_or_else(|| RuntimeError::MissingModule(module_id.to_string()))
}
