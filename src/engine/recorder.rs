//! WAV recording sink.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::runtime::recorder::{RecordError, Recorder};

use super::context::CaptureHandle;

/// Writes each finished recording session to a timestamped mono WAV file.
pub struct WavRecorder {
    out_dir: PathBuf,
    sessions: HashMap<String, CaptureHandle>,
}

impl WavRecorder {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            sessions: HashMap::new(),
        }
    }
}

impl Recorder for WavRecorder {
    fn start(&mut self, module_id: &str, capture: CaptureHandle) -> Result<(), RecordError> {
        capture.buffer.arm();
        self.sessions.insert(module_id.to_string(), capture);
        Ok(())
    }

    fn stop(&mut self, module_id: &str) -> Result<(), RecordError> {
        let handle = self
            .sessions
            .remove(module_id)
            .ok_or_else(|| RecordError::NotRecording(module_id.to_string()))?;
        handle.buffer.disarm();
        let samples = handle.buffer.take();

        fs::create_dir_all(&self.out_dir)?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = self.out_dir.join(format!("recording_{}.wav", stamp));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: handle.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for sample in &samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;

        info!(
            "Saved recording: {} ({} samples)",
            path.display(),
            samples.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::tap::CaptureBuffer;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("patchbay_rec_test_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn test_session_round_trip() {
        let dir = temp_dir("round_trip");
        let mut recorder = WavRecorder::new(dir.clone());
        let handle = CaptureHandle {
            buffer: CaptureBuffer::new(),
            sample_rate: 44100,
        };

        recorder.start("mod-1", handle.clone()).expect("start");
        assert!(handle.buffer.is_armed());
        handle.buffer.append(&[0.1, -0.1, 0.5]);
        recorder.stop("mod-1").expect("stop");
        assert!(!handle.buffer.is_armed());

        let files: Vec<_> = fs::read_dir(&dir)
            .expect("read dir")
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stop_without_session_errors() {
        let mut recorder = WavRecorder::new(temp_dir("no_session"));
        assert!(matches!(
            recorder.stop("ghost"),
            Err(RecordError::NotRecording(_))
        ));
    }
}
