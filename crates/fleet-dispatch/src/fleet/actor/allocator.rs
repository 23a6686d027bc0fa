use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};

use crate::fleet::FleetActor;
use crate::planner::Assignments;
use crate::request::TaskRequest;

impl FleetActor {
    /// Run the task planner over the fleet's full request set: the new
    /// request (if any) plus every robot's pending non-charging requests,
    /// minus the request to be ignored (if any). Planner errors are logged
    /// and collapse to [None]; ordering and tie-breaking are delegated to
    /// the planner.
    pub(super) fn allocate_tasks(
        &self,
        new_request: Option<Arc<TaskRequest>>,
        ignore_request: Option<&TaskRequest>,
    ) -> Option<Assignments> {
        let Some(planner) = &self.task_planner else {
            warn!(
                "fleet [{}] cannot allocate tasks without a task planner",
                self.options.name
            );
            return None;
        };

        let task_id = new_request
            .as_ref()
            .map(|request| request.id.to_string())
            .unwrap_or_default();
        let mut pending_requests = Vec::new();
        if let Some(request) = new_request {
            pending_requests.push(request);
        }

        let mut states = Vec::with_capacity(self.task_managers.len());
        for manager in &self.task_managers {
            states.push(manager.expected_finish_state());
            pending_requests.extend(manager.pending_requests());
        }

        if let Some(ignore) = ignore_request {
            match pending_requests
                .iter()
                .position(|request| request.id == ignore.id)
            {
                Some(position) => {
                    pending_requests.remove(position);
                    info!(
                        "request for task [{}] will be ignored during task allocation",
                        ignore.id
                    );
                }
                None => {
                    warn!(
                        "request for task [{}] is not present in any of the task queues",
                        ignore.id
                    );
                }
            }
        }

        info!(
            "planning for [{}] robot(s) and [{}] request(s)",
            states.len(),
            pending_requests.len()
        );
        match planner.plan(Utc::now(), states, pending_requests) {
            Ok(assignments) if assignments.is_empty() => {
                error!("the task planner failed to compute assignments for task [{task_id}]");
                None
            }
            Ok(assignments) => Some(assignments),
            Err(e) => {
                error!(
                    "the task planner failed to compute assignments for task [{task_id}]: {e}"
                );
                None
            }
        }
    }
}
