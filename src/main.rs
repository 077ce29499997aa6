//! Patchbay - headless audio patch host
//!
//! Loads a saved patch (or the built-in sample), brings it live on the
//! default output device, and runs until Enter is pressed, saving the patch
//! back on exit.

use std::error::Error;
use std::io::BufRead;
use std::path::PathBuf;

use log::{info, warn};

use patchbay::engine::AudioEngine;
use patchbay::persistence::{default_patch_path, load_or_sample, save_modules};
use patchbay::runtime::{init_patch, NodeManager};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let patch_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(default_patch_path)
        .ok_or("no patch path given and no data directory available")?;

    let mut rack = load_or_sample(&patch_path);
    info!(
        "Loaded patch from {}: {} modules",
        patch_path.display(),
        rack.modules.len()
    );

    let engine = AudioEngine::new()?;
    info!("Output device running at {} Hz", engine.sample_rate());
    let mut ctx = engine.start(None)?;

    let mut nodes = NodeManager::new();
    init_patch(&mut rack, &mut nodes, &mut ctx)?;
    info!(
        "Patch live: {} units, {} links. Press Enter to quit.",
        nodes.len(),
        rack.links.len()
    );

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    if let Err(e) = save_modules(&rack, &patch_path) {
        warn!("Could not save patch to {}: {}", patch_path.display(), e);
    } else {
        info!("Saved patch to {}", patch_path.display());
    }
    Ok(())
}
