pub mod generator;

use std::sync::Arc;

use blogsmith_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    registry.register(Arc::new(generator::GeneratorModule::from_settings(settings)?));
    Ok(())
}
