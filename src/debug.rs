use tracing::{info, warn};

use crate::app_state::AppState;

/// Runs only when METRICSVIEW_DEBUG_MODE is set: checks the backend is
/// reachable, then exits.
pub async fn run_debug(state: &AppState) {
    info!("🔧 Debug mode: probing metrics backend...");
    info!(config = ?state.config, "effective configuration");

    match state.rules_service.get_rules().await {
        Ok(rules) => {
            let rule_count: usize = rules.groups.iter().map(|g| g.rules.len()).sum();
            info!(groups = rules.groups.len(), rules = rule_count, "rules endpoint reachable");
        }
        Err(e) => warn!(error = ?e, "rules endpoint check failed"),
    }

    info!("Debug tasks completed. Exiting...");
}
