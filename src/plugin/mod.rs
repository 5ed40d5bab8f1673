pub mod classifier;
pub mod explanation;
pub mod manifest;
pub mod registry;
pub mod source;
pub mod state;
pub mod sync;

#[cfg(test)]
pub mod testing;

pub use classifier::PluginClassifier;
pub use state::Plugin;
pub use sync::DirectorySyncer;
