use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Duplicate module: {0}")]
    DuplicateModule(String),

    #[error("Module {module} depends on unknown module {dependency}")]
    UnknownDependency { module: String, dependency: String },

    #[error("Cyclic module dependency: {cycle}")]
    CyclicDependency { cycle: String },

    #[error("Invalid module name: {0:?}")]
    InvalidModuleName(String),

    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Unsatisfiable ordering constraints: {cycle}")]
    UnsatisfiableOrdering { cycle: String },

    #[error("Task {task}{module_suffix} failed: {reason}", module_suffix = .module.as_deref().map(|m| format!(" on module {m}")).unwrap_or_default())]
    ActionExecution {
        task: String,
        module: Option<String>,
        reason: String,
    },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Worker join error: {0}")]
    WorkerJoin(String),

    #[error("Scheduler is in state {state}, expected {expected}")]
    InvalidSchedulerState {
        state: &'static str,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
