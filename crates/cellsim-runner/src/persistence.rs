//! Key/value store file and saved templates.

use anyhow::{Context, Result};
use cellsim_core::MemoryStore;
use cellsim_world::{ComponentRegistry, OrganismTemplate};
use std::path::Path;
use tracing::{info, warn};

/// Read the store at `path`, starting empty when the file does not exist
pub fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        info!("No store at {}, starting empty", path.display());
        return Ok(MemoryStore::new());
    }
    let bytes = std::fs::read(path).with_context(|| format!("reading store {}", path.display()))?;
    let store = MemoryStore::from_bytes(&bytes).with_context(|| format!("decoding store {}", path.display()))?;
    info!(keys = store.len(), "Loaded store from {}", path.display());
    Ok(store)
}

pub fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = store.to_bytes()?;
    std::fs::write(path, bytes).with_context(|| format!("writing store {}", path.display()))?;
    info!(keys = store.len(), "Saved store to {}", path.display());
    Ok(())
}

pub fn template_key(template: &OrganismTemplate) -> String {
    format!("template.{}", template.id.0)
}

/// Swap each default for its saved version when one exists and still
/// resolves against `registry`; defaults without a saved copy are written
/// to the store.
pub fn load_templates(
    store: &mut MemoryStore,
    registry: &ComponentRegistry,
    defaults: Vec<(String, OrganismTemplate)>,
) -> Vec<(String, OrganismTemplate)> {
    defaults
        .into_iter()
        .map(|(name, default)| {
            let key = template_key(&default);
            match OrganismTemplate::load_from(&*store, &key) {
                Some(saved) if saved.id == default.id && saved.is_playable() && saved.resolve(registry).is_ok() => {
                    info!(template = %saved.id, name = %name, "Using saved template");
                    (name, saved)
                }
                Some(_) => {
                    warn!(key = %key, "Saved template is unusable, restoring default");
                    default.save_to(store, &key);
                    (name, default)
                }
                None => {
                    default.save_to(store, &key);
                    (name, default)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_core::{ComponentId, KeyValueStore};
    use cellsim_world::catalog;

    #[test]
    fn test_defaults_are_saved_then_reused() {
        let registry = catalog::default_registry().unwrap();
        let mut store = MemoryStore::new();

        let first = load_templates(&mut store, &registry, catalog::default_templates(&registry).unwrap());
        assert!(store.has_key("template.1.componentCount"));

        let mut hunter = catalog::hunter_template(&registry).unwrap();
        hunter.set_component(&registry, 2, catalog::TENTACLE).unwrap();
        hunter.save_to(&mut store, "template.2");

        let second = load_templates(&mut store, &registry, catalog::default_templates(&registry).unwrap());
        assert_eq!(first.len(), second.len());
        assert_eq!(second[1].1.component_ids()[2], catalog::TENTACLE);
    }

    #[test]
    fn test_broken_saved_template_is_replaced() {
        let registry = catalog::default_registry().unwrap();
        let mut store = MemoryStore::new();
        store.set_int("template.1.componentCount", 1);
        store.set_int("template.1.component.0", ComponentId(999).0);
        store.set_int("template.1.id", 1);

        let templates = load_templates(&mut store, &registry, catalog::default_templates(&registry).unwrap());
        assert_eq!(templates[0].1.body_id(), catalog::PROTOCELL);
        assert_eq!(store.get_int("template.1.component.0", 0), catalog::PROTOCELL.0);
    }

    #[test]
    fn test_store_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("cellsim-runner-{}", std::process::id()));
        let path = dir.join("store.bin");
        let mut store = MemoryStore::new();
        store.set_int("env.pond.runs", 3);

        save_store(&store, &path).unwrap();
        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded.get_int("env.pond.runs", 0), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
