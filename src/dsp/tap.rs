//! Recording tap unit.
//!
//! A recording module sits at the end of a chain and captures whatever is
//! patched into it. The unit itself is a sink: it appends its input to a
//! shared capture buffer while armed and always outputs silence. The capture
//! buffer is shared with the control side, which arms it when recording
//! starts and drains it into a file when recording stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::unit::{ModInputs, Unit, UnitUpdate};

/// Shared sample store between a [`StreamTap`] on the audio thread and the
/// recorder on the control side.
#[derive(Clone)]
pub struct CaptureBuffer {
    samples: Arc<Mutex<Vec<f32>>>,
    armed: Arc<AtomicBool>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clears any stale samples and starts capturing.
    pub fn arm(&self) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
        self.armed.store(true, Ordering::Release);
    }

    /// Stops capturing. Captured samples stay until taken.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Appends a block while armed. Called from the audio thread.
    pub fn append(&self, block: &[f32]) {
        if !self.is_armed() {
            return;
        }
        if let Ok(mut samples) = self.samples.lock() {
            samples.extend_from_slice(block);
        }
    }

    /// Takes everything captured so far, leaving the buffer empty.
    pub fn take(&self) -> Vec<f32> {
        match self.samples.lock() {
            Ok(mut samples) => std::mem::take(&mut *samples),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink unit that copies its input into a [`CaptureBuffer`].
pub struct StreamTap {
    capture: CaptureBuffer,
}

impl StreamTap {
    pub fn new(capture: CaptureBuffer) -> Self {
        Self { capture }
    }
}

impl Unit for StreamTap {
    fn apply(&mut self, _update: &UnitUpdate) {}

    fn process(&mut self, input: &[f32], _mods: &ModInputs, output: &mut [f32]) {
        self.capture.append(input);
        output.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_captures_only_while_armed() {
        let capture = CaptureBuffer::new();
        let mut tap = StreamTap::new(capture.clone());
        let input = vec![0.25; 4];
        let mut output = vec![1.0; 4];

        tap.process(&input, &ModInputs::empty(), &mut output);
        assert!(capture.take().is_empty());
        assert!(output.iter().all(|&s| s == 0.0));

        capture.arm();
        tap.process(&input, &ModInputs::empty(), &mut output);
        tap.process(&input, &ModInputs::empty(), &mut output);
        capture.disarm();
        tap.process(&input, &ModInputs::empty(), &mut output);

        assert_eq!(capture.take(), vec![0.25; 8]);
    }

    #[test]
    fn test_arm_clears_previous_session() {
        let capture = CaptureBuffer::new();
        capture.arm();
        capture.append(&[1.0, 2.0]);
        capture.disarm();

        capture.arm();
        capture.append(&[3.0]);
        assert_eq!(capture.take(), vec![3.0]);
    }
}
