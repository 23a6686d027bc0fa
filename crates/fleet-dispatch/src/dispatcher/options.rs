use std::time::Duration;

use fleet_common::config::DispatchConfig;
use tokio::sync::broadcast;

use crate::task::TaskSummary;

pub struct DispatcherOptions {
    /// The length of each auction window.
    pub bidding_time_window: Duration,
    /// The FIFO cap on the terminated task table.
    pub terminated_tasks_max_size: usize,
    /// The period of the ongoing-tasks publisher.
    pub publish_ongoing_tasks_period: Duration,
    pub ongoing_tasks_sender: broadcast::Sender<Vec<TaskSummary>>,
}

impl DispatcherOptions {
    pub fn new(
        config: &DispatchConfig,
        ongoing_tasks_sender: broadcast::Sender<Vec<TaskSummary>>,
    ) -> Self {
        Self {
            bidding_time_window: Duration::from_secs_f64(config.bidding_time_window_secs),
            terminated_tasks_max_size: config.terminated_tasks_max_size,
            publish_ongoing_tasks_period: Duration::from_secs(
                config.publish_ongoing_tasks_period_secs,
            ),
            ongoing_tasks_sender,
        }
    }
}
