//! Offline audio context.
//!
//! Renders the unit graph synchronously with no hardware attached. Used by
//! tests and by headless operation; microphone modules resolve to silent
//! sources, and capture device access can be forced to fail to exercise
//! recovery paths.

use crate::dsp::tap::CaptureBuffer;
use crate::dsp::{self, Unit, UnitUpdate};
use crate::graph::{Module, ModuleBrand, ModuleKind};

use super::context::{
    AudioContext, CaptureHandle, Endpoint, OneShot, UnitError, UnitId, UnitMeta, UnitTable,
};
use super::unit_graph::{UnitGraph, Wire};

const OFFLINE_BLOCK_SIZE: usize = 128;

pub struct OfflineContext {
    graph: UnitGraph,
    units: UnitTable,
    impulse_response: Vec<f32>,
    sample_rate: u32,
    deny_capture_devices: bool,
}

impl OfflineContext {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            graph: UnitGraph::new(OFFLINE_BLOCK_SIZE),
            units: UnitTable::new(),
            impulse_response: vec![1.0],
            sample_rate,
            deny_capture_devices: false,
        }
    }

    /// Makes every subsequent microphone unit creation fail, as if the
    /// capture device were unavailable.
    pub fn deny_capture_devices(&mut self, deny: bool) {
        self.deny_capture_devices = deny;
    }

    pub fn set_impulse_response(&mut self, impulse_response: Vec<f32>) {
        self.impulse_response = impulse_response;
    }

    /// Renders the given number of blocks and returns the concatenated
    /// master output.
    pub fn render(&mut self, blocks: usize) -> Vec<f32> {
        let mut rendered = Vec::with_capacity(blocks * OFFLINE_BLOCK_SIZE);
        for _ in 0..blocks {
            rendered.extend_from_slice(self.graph.process());
        }
        rendered
    }

    pub fn wires(&self) -> &[Wire] {
        self.graph.wires()
    }

    pub fn unit_count(&self) -> usize {
        self.graph.unit_count()
    }

    fn build(&mut self, module: &Module) -> Result<(Box<dyn Unit>, Option<CaptureBuffer>), UnitError> {
        match &module.kind {
            ModuleKind::MicIn(param) => {
                if self.deny_capture_devices {
                    return Err(UnitError::DeviceAccessDenied(format!(
                        "capture device '{}' unavailable",
                        param.mic
                    )));
                }
                // No hardware offline. The producer end is dropped, so the
                // source renders silence.
                let (_, consumer) = rtrb::RingBuffer::new(1);
                Ok((Box::new(dsp::mic::MicSource::new(consumer)), None))
            }
            _ => dsp::build_unit(module, self.sample_rate, &self.impulse_response),
        }
    }
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_unit(&mut self, module: &Module) -> Result<UnitId, UnitError> {
        let (node, capture) = self.build(module)?;
        let one_shot = match module.brand() {
            ModuleBrand::Oscillator => Some(OneShot::Armed),
            _ => None,
        };
        let id = self.units.register(UnitMeta {
            mod_targets: node.mod_targets(),
            one_shot,
            capture,
        });
        self.graph.insert(id, node);
        Ok(id)
    }

    fn drop_unit(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units.remove(unit)?;
        self.graph.remove(unit);
        Ok(())
    }

    fn connect(&mut self, source: UnitId, destination: Endpoint) -> Result<(), UnitError> {
        self.units.ensure_known(source)?;
        self.units.validate_endpoint(&destination)?;
        self.graph.connect(source, destination);
        Ok(())
    }

    fn disconnect(&mut self, source: UnitId, destination: Endpoint) -> Result<(), UnitError> {
        self.units.ensure_known(source)?;
        self.units.validate_endpoint(&destination)?;
        self.graph.disconnect(source, &destination);
        Ok(())
    }

    fn start(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units.begin_start(unit)?;
        self.graph.start(unit);
        Ok(())
    }

    fn stop(&mut self, unit: UnitId) -> Result<(), UnitError> {
        self.units.begin_stop(unit)?;
        self.graph.stop(unit);
        Ok(())
    }

    fn update(&mut self, unit: UnitId, update: UnitUpdate) -> Result<(), UnitError> {
        self.units.ensure_known(unit)?;
        self.graph.update(unit, &update);
        Ok(())
    }

    fn capture(&mut self, unit: UnitId) -> Result<CaptureHandle, UnitError> {
        let buffer = self.units.capture(unit)?;
        Ok(CaptureHandle {
            buffer,
            sample_rate: self.sample_rate,
        })
    }
}
