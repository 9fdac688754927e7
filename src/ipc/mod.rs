mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use router::handle_request;
pub use types::{AppState, Request};

use crate::config::Config;

/// Apply start-up configuration. Failures are logged and leave the state
/// empty so the host can still recover over the protocol.
pub fn preload(state: &mut AppState, cfg: &Config) {
    if let Some(path) = cfg.slots_path.as_deref() {
        if let Err(e) = handlers::slots::load_into(state, path) {
            log::warn!("{}", e);
        }
    }
    if let Some(path) = cfg.workspace.as_deref() {
        if let Err(e) = handlers::core::select_workspace(state, path) {
            log::warn!("workspace {} not opened: {:#}", path.to_string_lossy(), e);
        }
    }
}
