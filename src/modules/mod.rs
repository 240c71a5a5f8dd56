pub mod books;

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    registry.register(books::create_module(settings)?);
    Ok(())
}
