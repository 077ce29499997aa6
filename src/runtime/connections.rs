//! Connection manager.
//!
//! Keeps the three layers of connection state in lock step: the source
//! modules' `destinations` lists (the persisted truth), the rack's link map
//! (derived, one entry per ordered module pair), and the engine wiring
//! behind the audio context. All cable mutations go through here.

use std::collections::HashSet;

use log::{debug, warn};

use crate::engine::context::{AudioContext, Endpoint};
use crate::graph::{link_id, DestinationInfo, Link, LinkMap, Module, ModuleBrand, Rack};

use super::error::RuntimeError;
use super::node_manager::NodeManager;

/// Whether a cable from `source` to `destination` would be legal: the source
/// must not be a pure sink, must not target itself, and the pair must not be
/// linked already.
pub fn can_link(links: &LinkMap, source: &Module, destination: &Module) -> bool {
    source.is_connectable()
        && source.id != destination.id
        && !links.contains_key(&link_id(&source.id, &destination.id))
}

/// Resolves where a destination entry lands in the engine. `None` when the
/// destination module has no live unit.
fn endpoint_for_module(
    destination: &Module,
    nodes: &NodeManager,
    info: &DestinationInfo,
) -> Option<Endpoint> {
    match info {
        DestinationInfo::Node { .. } if destination.brand() == ModuleBrand::SpeakerOut => {
            Some(Endpoint::MasterOut)
        }
        DestinationInfo::Node { .. } => nodes.get(&destination.id).map(Endpoint::Node),
        DestinationInfo::Param { param_key, .. } => nodes
            .get(&destination.id)
            .map(|unit| Endpoint::Param(unit, param_key.clone())),
    }
}

fn endpoint_for(
    rack: &Rack,
    nodes: &NodeManager,
    info: &DestinationInfo,
) -> Result<Endpoint, RuntimeError> {
    let destination = rack
        .module(info.module_id())
        .ok_or_else(|| RuntimeError::MissingModule(info.module_id().to_string()))?;
    endpoint_for_module(destination, nodes, info)
        .ok_or_else(|| RuntimeError::MissingLiveUnit(destination.id.clone()))
}

/// Removes the engine wire for one destination entry if both ends are still
/// live. Used by cascades that must not fail halfway.
fn unwire_if_live(
    rack: &Rack,
    nodes: &NodeManager,
    ctx: &mut dyn AudioContext,
    source_id: &str,
    info: &DestinationInfo,
) {
    let Some(source_unit) = nodes.get(source_id) else {
        return;
    };
    let Some(destination) = rack.module(info.module_id()) else {
        return;
    };
    let Some(endpoint) = endpoint_for_module(destination, nodes, info) else {
        return;
    };
    if let Err(e) = ctx.disconnect(source_unit, endpoint) {
        debug!("Ignoring stale wire {} -> {}: {}", source_id, info.module_id(), e);
    }
}

/// Cables a source module into a destination entry, materializing both live
/// units on first use. Returns false without touching anything when the link
/// would be illegal or already exists.
pub fn connect(
    rack: &mut Rack,
    nodes: &mut NodeManager,
    ctx: &mut dyn AudioContext,
    source_id: &str,
    info: DestinationInfo,
) -> Result<bool, RuntimeError> {
    let source = rack
        .module(source_id)
        .cloned()
        .ok_or_else(|| RuntimeError::MissingModule(source_id.to_string()))?;
    let destination = rack
        .module(info.module_id())
        .cloned()
        .ok_or_else(|| RuntimeError::MissingModule(info.module_id().to_string()))?;

    if !can_link(&rack.links, &source, &destination) {
        return Ok(false);
    }

    let source_unit = nodes.get_or_create(&source, ctx)?;
    if !(destination.brand() == ModuleBrand::SpeakerOut
        && matches!(info, DestinationInfo::Node { .. }))
    {
        nodes.get_or_create(&destination, ctx)?;
    }
    let endpoint = endpoint_for(rack, nodes, &info)?;
    ctx.connect(source_unit, endpoint)?;

    let link = Link::new(source_id, destination.id.as_str());
    rack.links.insert(link.id.clone(), link);
    if let Some(source) = rack.module_mut(source_id) {
        if source.destination_for(info.module_id()).is_none() {
            source.destinations.push(info);
        }
    }
    Ok(true)
}

/// Removes the cable between two modules from all three layers.
pub fn disconnect(
    rack: &mut Rack,
    nodes: &NodeManager,
    ctx: &mut dyn AudioContext,
    source_id: &str,
    destination_id: &str,
) -> Result<(), RuntimeError> {
    let info = rack
        .module(source_id)
        .ok_or_else(|| RuntimeError::MissingModule(source_id.to_string()))?
        .destination_for(destination_id)
        .cloned()
        .ok_or_else(|| RuntimeError::MissingDestination {
            source_id: source_id.to_string(),
            destination_id: destination_id.to_string(),
        })?;

    let source_unit = nodes
        .get(source_id)
        .ok_or_else(|| RuntimeError::MissingLiveUnit(source_id.to_string()))?;
    let endpoint = endpoint_for(rack, nodes, &info)?;
    ctx.disconnect(source_unit, endpoint)?;

    rack.links.remove(&link_id(source_id, destination_id));
    if let Some(source) = rack.module_mut(source_id) {
        source
            .destinations
            .retain(|d| d.module_id() != destination_id);
    }
    Ok(())
}

/// Moves an existing cable to a different landing point on the same
/// destination module (main input versus a named parameter). The pair must
/// already be linked; afterwards exactly one engine wire exists for it.
pub fn change_destination(
    rack: &mut Rack,
    nodes: &mut NodeManager,
    ctx: &mut dyn AudioContext,
    source_id: &str,
    new_info: DestinationInfo,
) -> Result<(), RuntimeError> {
    let destination_id = new_info.module_id().to_string();
    rack.module(source_id)
        .ok_or_else(|| RuntimeError::MissingModule(source_id.to_string()))?
        .destination_for(&destination_id)
        .ok_or_else(|| RuntimeError::MissingDestination {
            source_id: source_id.to_string(),
            destination_id: destination_id.clone(),
        })?;

    disconnect(rack, nodes, ctx, source_id, &destination_id)?;
    connect(rack, nodes, ctx, source_id, new_info)?;
    Ok(())
}

/// Removes a cable by link id. Unknown ids are tolerated; the link is
/// already gone.
pub fn delete_link(
    rack: &mut Rack,
    nodes: &NodeManager,
    ctx: &mut dyn AudioContext,
    id: &str,
) -> Result<(), RuntimeError> {
    let Some(link) = rack.links.get(id).cloned() else {
        return Ok(());
    };
    disconnect(rack, nodes, ctx, &link.source_id, &link.destination_id)
}

/// Deletes a module and cascades: every cable into or out of it is unwired,
/// its links and the destination entries of its upstream modules are
/// removed, and its live unit is torn down.
pub fn delete_module(
    rack: &mut Rack,
    nodes: &mut NodeManager,
    ctx: &mut dyn AudioContext,
    module_id: &str,
) -> Result<(), RuntimeError> {
    let module = rack
        .take_module(module_id)
        .ok_or_else(|| RuntimeError::MissingModule(module_id.to_string()))?;

    // Outgoing cables.
    for info in &module.destinations {
        unwire_if_live(rack, nodes, ctx, &module.id, info);
        rack.links.remove(&link_id(module_id, info.module_id()));
    }

    // Incoming cables. The module is already out of the rack, so its
    // endpoint is resolved from the removed value.
    let incoming: Vec<(String, DestinationInfo)> = rack
        .modules
        .iter()
        .filter_map(|m| {
            m.destination_for(module_id)
                .map(|info| (m.id.clone(), info.clone()))
        })
        .collect();
    for (source_id, info) in incoming {
        if let Some(source_unit) = nodes.get(&source_id) {
            if let Some(endpoint) = endpoint_for_module(&module, nodes, &info) {
                if let Err(e) = ctx.disconnect(source_unit, endpoint) {
                    debug!("Ignoring stale wire {} -> {}: {}", source_id, module_id, e);
                }
            }
        }
        rack.links.remove(&link_id(&source_id, module_id));
        if let Some(source) = rack.module_mut(&source_id) {
            source.destinations.retain(|d| d.module_id() != module_id);
        }
    }

    nodes.destroy(module_id, ctx)?;
    Ok(())
}

/// Re-issues every engine wire implied by the modules' destination lists.
/// Idempotent: already-present wires are deduplicated by the context.
/// Modules without live units (a microphone whose device failed) are left
/// unwired. Neither links nor destinations change.
pub fn rewire_all(
    rack: &Rack,
    nodes: &NodeManager,
    ctx: &mut dyn AudioContext,
) -> Result<(), RuntimeError> {
    for module in &rack.modules {
        let Some(source_unit) = nodes.get(&module.id) else {
            continue;
        };
        for info in &module.destinations {
            let Some(destination) = rack.module(info.module_id()) else {
                continue;
            };
            match endpoint_for_module(destination, nodes, info) {
                Some(endpoint) => ctx.connect(source_unit, endpoint)?,
                None => warn!(
                    "Leaving {} -> {} unwired: destination has no live unit",
                    module.id, destination.id
                ),
            }
        }
    }
    Ok(())
}

/// Brings a freshly loaded rack live: prunes destination entries that point
/// at missing modules, creates a unit for every module brand that has one,
/// rebuilds the link map from the destination lists, and wires the engine.
///
/// A microphone whose device cannot be opened is kept in the rack with its
/// links intact but stays unwired.
pub fn init_patch(
    rack: &mut Rack,
    nodes: &mut NodeManager,
    ctx: &mut dyn AudioContext,
) -> Result<(), RuntimeError> {
    let ids: HashSet<String> = rack.modules.iter().map(|m| m.id.clone()).collect();
    for module in &mut rack.modules {
        module.destinations.retain(|d| ids.contains(d.module_id()));
    }

    for module in rack.modules.clone() {
        if module.brand() == ModuleBrand::SpeakerOut {
            continue;
        }
        match nodes.get_or_create(&module, ctx) {
            Ok(_) => {}
            Err(RuntimeError::DeviceAccessDenied(msg)) => {
                warn!("Leaving module '{}' unwired: {}", module.id, msg);
            }
            Err(e) => return Err(e),
        }
    }

    rack.links.clear();
    for module in &rack.modules {
        for info in &module.destinations {
            let link = Link::new(module.id.as_str(), info.module_id());
            rack.links.insert(link.id.clone(), link);
        }
    }

    rewire_all(rack, nodes, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::offline::OfflineContext;
    use crate::graph::Position;

    struct Fixture {
        rack: Rack,
        nodes: NodeManager,
        ctx: OfflineContext,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                rack: Rack::new(),
                nodes: NodeManager::new(),
                ctx: OfflineContext::new(44100),
            }
        }

        fn add(&mut self, brand: ModuleBrand) -> String {
            let module = Module::create(brand, Position::default());
            let id = module.id.clone();
            if brand != ModuleBrand::SpeakerOut {
                self.nodes
                    .get_or_create(&module, &mut self.ctx)
                    .expect("unit");
            }
            self.rack.add_module(module);
            id
        }

        fn connect(&mut self, source: &str, info: DestinationInfo) -> bool {
            connect(&mut self.rack, &mut self.nodes, &mut self.ctx, source, info).expect("connect")
        }
    }

    #[test]
    fn test_mic_filter_speaker_chain() {
        let mut fx = Fixture::new();
        let mic = fx.add(ModuleBrand::MicIn);
        let filter = fx.add(ModuleBrand::BiquadFilter);
        let speaker = fx.add(ModuleBrand::SpeakerOut);

        assert!(fx.connect(&mic, DestinationInfo::node(&filter)));
        assert!(fx.connect(&filter, DestinationInfo::node(&speaker)));
        assert_eq!(fx.rack.links.len(), 2);
        assert_eq!(fx.ctx.wires().len(), 2);

        disconnect(&mut fx.rack, &fx.nodes, &mut fx.ctx, &mic, &filter).expect("disconnect");
        assert_eq!(fx.rack.links.len(), 1);
        assert_eq!(fx.ctx.wires().len(), 1);
        assert!(fx.rack.module(&mic).expect("mic").destinations.is_empty());
    }

    #[test]
    fn test_can_link_is_true_exactly_once_per_pair() {
        let mut fx = Fixture::new();
        let osc = fx.add(ModuleBrand::Oscillator);
        let gain = fx.add(ModuleBrand::Gain);

        assert!(fx.connect(&osc, DestinationInfo::node(&gain)));
        assert!(!fx.connect(&osc, DestinationInfo::node(&gain)));
        assert_eq!(fx.rack.links.len(), 1);
        assert_eq!(fx.ctx.wires().len(), 1);
    }

    #[test]
    fn test_sinks_and_self_loops_are_rejected() {
        let mut fx = Fixture::new();
        let speaker = fx.add(ModuleBrand::SpeakerOut);
        let recording = fx.add(ModuleBrand::Recording);
        let gain = fx.add(ModuleBrand::Gain);

        assert!(!fx.connect(&recording, DestinationInfo::node(&gain)));
        assert!(!fx.connect(&gain, DestinationInfo::node(&gain)));
        let speaker_module = fx.rack.module(&speaker).cloned().expect("speaker");
        let gain_module = fx.rack.module(&gain).cloned().expect("gain");
        assert!(!can_link(&fx.rack.links, &speaker_module, &gain_module));
    }

    #[test]
    fn test_param_cable_and_delete_cascade() {
        let mut fx = Fixture::new();
        let osc = fx.add(ModuleBrand::Oscillator);
        let filter = fx.add(ModuleBrand::BiquadFilter);
        let speaker = fx.add(ModuleBrand::SpeakerOut);

        assert!(fx.connect(&osc, DestinationInfo::param(&filter, "frequency")));
        assert!(fx.connect(&filter, DestinationInfo::node(&speaker)));
        assert_eq!(fx.rack.links.len(), 2);

        delete_module(&mut fx.rack, &mut fx.nodes, &mut fx.ctx, &osc).expect("delete");
        assert!(!fx.rack.contains(&osc));
        assert_eq!(fx.rack.links.len(), 1);
        assert_eq!(fx.ctx.wires().len(), 1);
        assert!(!fx.nodes.contains(&osc));
    }

    #[test]
    fn test_delete_destination_clears_upstream_entries() {
        let mut fx = Fixture::new();
        let osc = fx.add(ModuleBrand::Oscillator);
        let gain = fx.add(ModuleBrand::Gain);
        assert!(fx.connect(&osc, DestinationInfo::node(&gain)));

        delete_module(&mut fx.rack, &mut fx.nodes, &mut fx.ctx, &gain).expect("delete");
        assert!(fx.rack.module(&osc).expect("osc").destinations.is_empty());
        assert!(fx.rack.links.is_empty());
        assert!(fx.ctx.wires().is_empty());
    }

    #[test]
    fn test_delete_speaker_unwires_master() {
        let mut fx = Fixture::new();
        let gain = fx.add(ModuleBrand::Gain);
        let speaker = fx.add(ModuleBrand::SpeakerOut);
        assert!(fx.connect(&gain, DestinationInfo::node(&speaker)));
        assert_eq!(fx.ctx.wires().len(), 1);

        delete_module(&mut fx.rack, &mut fx.nodes, &mut fx.ctx, &speaker).expect("delete");
        assert!(fx.ctx.wires().is_empty());
        assert!(fx.rack.links.is_empty());
    }

    #[test]
    fn test_change_destination_keeps_single_wire() {
        let mut fx = Fixture::new();
        let osc = fx.add(ModuleBrand::Oscillator);
        let filter = fx.add(ModuleBrand::BiquadFilter);
        assert!(fx.connect(&osc, DestinationInfo::node(&filter)));

        change_destination(
            &mut fx.rack,
            &mut fx.nodes,
            &mut fx.ctx,
            &osc,
            DestinationInfo::param(&filter, "frequency"),
        )
        .expect("change");

        assert_eq!(fx.ctx.wires().len(), 1);
        assert_eq!(fx.rack.links.len(), 1);
        let info = fx
            .rack
            .module(&osc)
            .and_then(|m| m.destination_for(&filter))
            .cloned()
            .expect("destination");
        assert_eq!(info, DestinationInfo::param(&filter, "frequency"));
    }

    #[test]
    fn test_change_destination_requires_existing_link() {
        let mut fx = Fixture::new();
        let osc = fx.add(ModuleBrand::Oscillator);
        let filter = fx.add(ModuleBrand::BiquadFilter);

        let result = change_destination(
            &mut fx.rack,
            &mut fx.nodes,
            &mut fx.ctx,
            &osc,
            DestinationInfo::param(&filter, "frequency"),
        );
        assert!(matches!(
            result,
            Err(RuntimeError::MissingDestination { .. })
        ));
    }

    #[test]
    fn test_delete_link_by_id() {
        let mut fx = Fixture::new();
        let osc = fx.add(ModuleBrand::Oscillator);
        let gain = fx.add(ModuleBrand::Gain);
        assert!(fx.connect(&osc, DestinationInfo::node(&gain)));

        delete_link(
            &mut fx.rack,
            &fx.nodes,
            &mut fx.ctx,
            &link_id(&osc, &gain),
        )
        .expect("delete link");
        assert!(fx.rack.links.is_empty());
        assert!(fx.ctx.wires().is_empty());

        // Deleting it again is a no-op.
        delete_link(&mut fx.rack, &fx.nodes, &mut fx.ctx, &link_id(&osc, &gain))
            .expect("idempotent");
    }

    #[test]
    fn test_init_patch_builds_links_and_wires() {
        let mut ctx = OfflineContext::new(44100);
        let mut nodes = NodeManager::new();

        let mut osc = Module::create(ModuleBrand::Oscillator, Position::default());
        let mut filter = Module::create(ModuleBrand::BiquadFilter, Position::default());
        let speaker = Module::create(ModuleBrand::SpeakerOut, Position::default());
        osc.destinations.push(DestinationInfo::node(&filter.id));
        osc.destinations.push(DestinationInfo::node("gone"));
        filter.destinations.push(DestinationInfo::node(&speaker.id));
        let osc_id = osc.id.clone();

        let mut rack = Rack::from_modules(vec![osc, filter, speaker]);
        init_patch(&mut rack, &mut nodes, &mut ctx).expect("init");

        assert_eq!(nodes.len(), 2);
        assert_eq!(rack.links.len(), 2);
        assert_eq!(ctx.wires().len(), 2);
        // The dangling destination entry was pruned.
        assert_eq!(
            rack.module(&osc_id).expect("osc").destinations.len(),
            1
        );
    }

    #[test]
    fn test_init_patch_keeps_failed_mic_unwired() {
        let mut ctx = OfflineContext::new(44100);
        ctx.deny_capture_devices(true);
        let mut nodes = NodeManager::new();

        let mut mic = Module::create(ModuleBrand::MicIn, Position::default());
        let speaker = Module::create(ModuleBrand::SpeakerOut, Position::default());
        mic.destinations.push(DestinationInfo::node(&speaker.id));
        let mic_id = mic.id.clone();

        let mut rack = Rack::from_modules(vec![mic, speaker]);
        init_patch(&mut rack, &mut nodes, &mut ctx).expect("init");

        // Module and link survive, but nothing is wired.
        assert!(rack.contains(&mic_id));
        assert_eq!(rack.links.len(), 1);
        assert!(!nodes.contains(&mic_id));
        assert!(ctx.wires().is_empty());
    }
}
