use std::time::Duration;

use crate::types::ReferenceSpaceKind;

/// Tunables for a [`SessionController`](crate::session::SessionController).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Application name reported to the runtime at instance creation.
    pub application_name: String,
    /// Space created by `begin_session` when none was set explicitly.
    pub reference_space: ReferenceSpaceKind,
    /// Upper bound on a single swapchain image wait.
    pub image_wait_timeout: Duration,
    /// Number of event polls `poll_until_ready` performs before giving up.
    pub ready_poll_limit: usize,
    /// Sleep between empty polls in `poll_until_ready`.
    pub ready_poll_interval: Duration,
    /// Samples kept for frame timing percentiles.
    pub timing_window: usize,
    /// Frame budget in milliseconds (11.1 for 90Hz).
    pub frame_budget_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            application_name: "OpenXR App".to_string(),
            reference_space: ReferenceSpaceKind::Local,
            image_wait_timeout: Duration::from_millis(100),
            ready_poll_limit: 500,
            ready_poll_interval: Duration::from_millis(10),
            timing_window: 1000,
            frame_budget_ms: 11.1,
        }
    }
}
