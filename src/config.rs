use std::path::PathBuf;

/// Construction-time configuration for an [`crate::Engine`].
///
/// Mirrors the `[server]` section of the original `config.ini`: the
/// engine never reads argv, env vars or config files itself, it is
/// handed a fully resolved `EngineConfig` by whatever embeds it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_folder: PathBuf,
    pub summary_file: PathBuf,
    pub open_interfaces_size: usize,
    pub always_rebuild_summary: bool,
}

impl EngineConfig {
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        let data_folder = data_folder.into();
        let summary_file = data_folder.join("summary.json");
        Self {
            data_folder,
            summary_file,
            open_interfaces_size: Self::DEFAULT_OPEN_INTERFACES_SIZE,
            always_rebuild_summary: false,
        }
    }

    pub const DEFAULT_OPEN_INTERFACES_SIZE: usize = 5;
}
