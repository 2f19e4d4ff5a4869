/// Conditions that stop `check_module` before any diagnostics are produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("typechecker: missing module")]
    MissingModule,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Parse(#[from] toml::de::Error),
}
