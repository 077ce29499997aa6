//! Commands shipped from the control side to the audio thread.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::dsp::{Unit, UnitUpdate};

use super::context::{Endpoint, UnitId};

/// Capacity of the control-to-audio command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// A mutation of the live unit graph, applied by the audio thread between
/// blocks.
pub enum EngineCommand {
    InsertUnit { unit: UnitId, node: Box<dyn Unit> },
    RemoveUnit(UnitId),
    Connect { source: UnitId, destination: Endpoint },
    Disconnect { source: UnitId, destination: Endpoint },
    Start(UnitId),
    Stop(UnitId),
    Update { unit: UnitId, update: UnitUpdate },
}

/// Creates the lock-free SPSC command channel between the control side and
/// the audio callback.
pub fn command_channel() -> (Producer<EngineCommand>, Consumer<EngineCommand>) {
    RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
