//! Patch serialization for save/load functionality.
//!
//! A patch file captures the module list: every module's brand, position,
//! parameters, and destination entries. Links are not stored; they are
//! derived from the destination lists when the patch is brought live.

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::graph::{
    curves, BiquadFilterParam, ConvolverParam, DelayParam, DestinationInfo, GainParam, MicInParam,
    Module, ModuleKind, OscillatorParam, Position, Rack, RecordingParam, WaveShaperParam,
};

/// Current patch format version.
/// Increment this when making breaking changes to the format.
pub const SCHEMA_VERSION: u32 = 1;

/// A complete saved patch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchFile {
    /// Patch format version for future compatibility.
    pub version: u32,
    /// All modules in the patch.
    pub modules: Vec<ModuleSchema>,
}

impl PatchFile {
    /// Check if this patch version is compatible with the current format.
    pub fn is_compatible(&self) -> bool {
        self.version <= SCHEMA_VERSION
    }
}

/// Serialized form of one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSchema {
    pub id: String,
    pub position: Position,
    #[serde(default)]
    pub destinations: Vec<DestinationInfo>,
    #[serde(flatten)]
    pub kind: KindSchema,
}

/// Brand tag plus the brand's parameter record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "brand", content = "param", rename_all = "snake_case")]
pub enum KindSchema {
    MicIn(MicInParam),
    BiquadFilter(BiquadFilterParam),
    Delay(DelayParam),
    Gain(GainParam),
    Oscillator(OscillatorParam),
    WaveShaper(WaveShaperParam),
    Convolver(ConvolverParam),
    Recording(RecordingParam),
    SpeakerOut,
}

/// Converts a live module into its serialized form.
pub fn to_schema(module: &Module) -> ModuleSchema {
    let kind = match &module.kind {
        ModuleKind::MicIn(p) => KindSchema::MicIn(p.clone()),
        ModuleKind::BiquadFilter(p) => KindSchema::BiquadFilter(p.clone()),
        ModuleKind::Delay(p) => KindSchema::Delay(p.clone()),
        ModuleKind::Gain(p) => KindSchema::Gain(p.clone()),
        ModuleKind::Oscillator(p) => KindSchema::Oscillator(p.clone()),
        ModuleKind::WaveShaper(p) => KindSchema::WaveShaper(p.clone()),
        ModuleKind::Convolver(p) => KindSchema::Convolver(p.clone()),
        ModuleKind::Recording(p) => KindSchema::Recording(p.clone()),
        ModuleKind::SpeakerOut => KindSchema::SpeakerOut,
    };
    ModuleSchema {
        id: module.id.clone(),
        position: module.position,
        destinations: module.destinations.clone(),
        kind,
    }
}

/// Converts a serialized module back into the model. Transient run state is
/// normalized: an oscillator always loads stopped, a recording module loads
/// idle, and a wave-shaper's curve is regenerated from its curve type and
/// amount rather than trusting the stored samples.
pub fn from_schema(schema: ModuleSchema) -> Module {
    let kind = match schema.kind {
        KindSchema::MicIn(p) => ModuleKind::MicIn(p),
        KindSchema::BiquadFilter(p) => ModuleKind::BiquadFilter(p),
        KindSchema::Delay(p) => ModuleKind::Delay(p),
        KindSchema::Gain(p) => ModuleKind::Gain(p),
        KindSchema::Oscillator(mut p) => {
            p.is_playing = false;
            ModuleKind::Oscillator(p)
        }
        KindSchema::WaveShaper(mut p) => {
            p.curve = curves::generate_curve(p.curve_type, p.amount.value);
            ModuleKind::WaveShaper(p)
        }
        KindSchema::Convolver(p) => ModuleKind::Convolver(p),
        KindSchema::Recording(mut p) => {
            p.is_recording = false;
            ModuleKind::Recording(p)
        }
        KindSchema::SpeakerOut => ModuleKind::SpeakerOut,
    };
    let mut module = Module::new(schema.id, schema.position, kind);
    module.destinations = schema.destinations;
    module
}

/// Error type for patch operations.
#[derive(Debug)]
pub enum PatchError {
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON serialization/deserialization error.
    SerializationError(serde_json::Error),
    /// Incompatible patch version.
    IncompatibleVersion { found: u32, expected: u32 },
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "File error: {}", e),
            Self::SerializationError(e) => write!(f, "Serialization error: {}", e),
            Self::IncompatibleVersion { found, expected } => write!(
                f,
                "Incompatible patch version: found {}, expected <= {}",
                found, expected
            ),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            Self::SerializationError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PatchError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_json::Error> for PatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err)
    }
}

/// Save the rack's module list to a JSON file.
pub fn save_modules(rack: &Rack, path: &Path) -> Result<(), PatchError> {
    let file = PatchFile {
        version: SCHEMA_VERSION,
        modules: rack.modules.iter().map(to_schema).collect(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a module list from a JSON file.
pub fn load_modules(path: &Path) -> Result<Vec<Module>, PatchError> {
    let json = std::fs::read_to_string(path)?;
    let file: PatchFile = serde_json::from_str(&json)?;

    if !file.is_compatible() {
        return Err(PatchError::IncompatibleVersion {
            found: file.version,
            expected: SCHEMA_VERSION,
        });
    }

    Ok(file.modules.into_iter().map(from_schema).collect())
}

/// Load a rack from disk, falling back to the built-in sample patch when the
/// file is missing, unreadable, or incompatible.
pub fn load_or_sample(path: &Path) -> Rack {
    match load_modules(path) {
        Ok(modules) => Rack::from_modules(modules),
        Err(e) => {
            warn!(
                "Could not load patch from {}: {}. Starting with the sample patch.",
                path.display(),
                e
            );
            Rack::sample()
        }
    }
}

/// The default patch location in the user's data directory.
pub fn default_patch_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("patchbay").join("modules.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{CurveType, ModuleBrand};

    #[test]
    fn test_module_round_trip() {
        let mut rack = Rack::new();
        let mut osc = Module::create(ModuleBrand::Oscillator, Position::new(10.0, 20.0));
        let filter = Module::create(ModuleBrand::BiquadFilter, Position::new(30.0, 40.0));
        osc.destinations
            .push(DestinationInfo::param(&filter.id, "frequency"));
        rack.add_module(osc.clone());
        rack.add_module(filter.clone());

        let file = PatchFile {
            version: SCHEMA_VERSION,
            modules: rack.modules.iter().map(to_schema).collect(),
        };
        let json = serde_json::to_string(&file).unwrap();
        let loaded: PatchFile = serde_json::from_str(&json).unwrap();
        let modules: Vec<Module> = loaded.modules.into_iter().map(from_schema).collect();

        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].id, osc.id);
        assert_eq!(modules[0].destinations, osc.destinations);
        assert_eq!(modules[1], filter);
    }

    #[test]
    fn test_schema_json_shape() {
        let module = Module::create(ModuleBrand::Gain, Position::default());
        let json = serde_json::to_value(to_schema(&module)).unwrap();
        assert_eq!(json["brand"], "gain");
        assert_eq!(json["param"]["gain"]["value"], 1.0);
        assert_eq!(json["id"], module.id.as_str());
    }

    #[test]
    fn test_loading_normalizes_run_state() {
        let mut osc = Module::create(ModuleBrand::Oscillator, Position::default());
        if let ModuleKind::Oscillator(p) = &mut osc.kind {
            p.is_playing = true;
        }
        let mut recording = Module::create(ModuleBrand::Recording, Position::default());
        if let ModuleKind::Recording(p) = &mut recording.kind {
            p.is_recording = true;
        }

        let osc = from_schema(to_schema(&osc));
        let recording = from_schema(to_schema(&recording));
        match osc.kind {
            ModuleKind::Oscillator(p) => assert!(!p.is_playing),
            _ => panic!("wrong kind"),
        }
        match recording.kind {
            ModuleKind::Recording(p) => assert!(!p.is_recording),
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_loading_regenerates_curve() {
        let mut shaper = Module::create(ModuleBrand::WaveShaper, Position::default());
        if let ModuleKind::WaveShaper(p) = &mut shaper.kind {
            p.curve_type = CurveType::Overdrive;
            // Stored samples are stale on purpose.
            p.curve = vec![9.0; 4];
        }

        let loaded = from_schema(to_schema(&shaper));
        match loaded.kind {
            ModuleKind::WaveShaper(p) => {
                assert_eq!(p.curve, curves::generate_curve(CurveType::Overdrive, 50.0));
            }
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_version_compatibility() {
        let file = PatchFile {
            version: SCHEMA_VERSION + 1,
            modules: Vec::new(),
        };
        assert!(!file.is_compatible());

        let json = serde_json::to_string(&file).unwrap();
        let path = std::env::temp_dir().join(format!(
            "patchbay_patch_test_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, json).unwrap();
        assert!(matches!(
            load_modules(&path),
            Err(PatchError::IncompatibleVersion { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_falls_back_to_sample() {
        let rack = load_or_sample(Path::new("/nonexistent/modules.json"));
        assert_eq!(rack.modules.len(), 2);
        assert_eq!(rack.modules[0].brand(), ModuleBrand::MicIn);
        assert_eq!(rack.modules[1].brand(), ModuleBrand::SpeakerOut);
    }

    #[test]
    fn test_save_and_load_file() {
        let mut rack = Rack::new();
        rack.add_module(Module::create(ModuleBrand::Delay, Position::new(1.0, 2.0)));
        let path = std::env::temp_dir().join(format!(
            "patchbay_save_test_{}.json",
            std::process::id()
        ));

        save_modules(&rack, &path).expect("save");
        let modules = load_modules(&path).expect("load");
        assert_eq!(modules, rack.modules);
        std::fs::remove_file(&path).ok();
    }
}
