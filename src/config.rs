use std::path::PathBuf;

pub const SLOTS_ENV: &str = "TIMETABLED_SLOTS";
pub const WORKSPACE_ENV: &str = "TIMETABLED_WORKSPACE";

/// Start-up settings read from the environment. Both are optional: the host
/// can supply them later through `slots.load` and `workspace.select`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub slots_path: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            slots_path: env_path(SLOTS_ENV),
            workspace: env_path(WORKSPACE_ENV),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
