use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_server::actor::{ActorAction, ActorContext};
use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use crate::bidding::{BidNotice, BidProposal};
use crate::dispatcher::DispatcherEvent;
use crate::error::{DispatchError, DispatchResult};
use crate::fleet::{FleetActor, FleetEvent};
use crate::graph::interpolate_positions;
use crate::id::TaskId;
use crate::messages::{DispatchAck, DispatchMethod, DispatchRequest, DockSummary, FleetState};
use crate::planner::{Assignments, TaskPlanner, TaskPlannerParams};
use crate::request::{BinaryPriority, RequestDetail, TaskRequest};
use crate::task::{
    Priority, TaskDescription, TaskKind, TaskPayload, TaskProfile, TaskState, TaskStatus,
};
use crate::task_manager::TaskManager;

impl FleetActor {
    pub(super) fn handle_bid_notice(
        &mut self,
        ctx: &mut ActorContext<Self>,
        notice: BidNotice,
    ) -> ActorAction {
        let task_profile = notice.task_profile;
        let task_id = task_profile.task_id.clone();
        let name = self.options.name.clone();

        if self.task_managers.is_empty() {
            info!("fleet [{name}] does not have any robots to accept task [{task_id}]");
            return ActorAction::Continue;
        }
        if task_id.is_empty() {
            warn!("received a bid notice with an invalid task id, ignoring the request");
            return ActorAction::Continue;
        }
        // Task revival is not supported.
        if self.bid_notice_assignments.contains_key(&task_id) {
            return ActorAction::Continue;
        }
        let Some(accept_task) = &self.accept_task else {
            warn!("fleet [{name}] is not configured to accept any task requests");
            return ActorAction::Continue;
        };
        if !accept_task(&task_profile) {
            info!("fleet [{name}] is configured to not accept task [{task_id}]");
            return ActorAction::Continue;
        }
        if self.task_planner.is_none() {
            warn!("fleet [{name}] is not configured with parameters for task planning");
            return ActorAction::Continue;
        }

        let Some(request) = self.make_request(&task_profile) else {
            return ActorAction::Continue;
        };
        let request = Arc::new(request);
        self.generated_requests
            .insert(task_id.clone(), request.clone());
        self.task_profiles
            .insert(task_id.clone(), task_profile.clone());

        let Some(assignments) = self.allocate_tasks(Some(request), None) else {
            return ActorAction::Continue;
        };
        let cost = self
            .task_planner
            .as_ref()
            .map(|planner| planner.compute_cost(&assignments))
            .unwrap_or_default();

        // The robot whose queue contains this request carries the bid.
        let mut robot_name = String::new();
        let mut finish_time = task_profile.description.start_time;
        for (index, agent) in assignments.iter().enumerate() {
            if let Some(assignment) = agent.iter().find(|a| a.request.id == task_id) {
                finish_time = assignment.finish_state.time;
                if let Some(manager) = self.task_managers.get(index) {
                    robot_name = manager.robot_name();
                }
                break;
            }
        }

        let proposal = BidProposal {
            fleet_name: name.clone(),
            task_profile,
            robot_name: robot_name.clone(),
            prev_cost: self.current_assignment_cost,
            new_cost: cost,
            finish_time,
        };
        info!(
            "submitted bid proposal to accommodate task [{task_id}] by robot [{robot_name}] \
             with new cost [{cost}]"
        );
        let dispatcher = self.options.dispatcher.clone();
        ctx.spawn(async move {
            if dispatcher
                .send(DispatcherEvent::ReceiveProposal { proposal })
                .await
                .is_err()
            {
                warn!("failed to send bid proposal from fleet [{name}]");
            }
        });
        self.bid_notice_assignments.insert(task_id, assignments);
        ActorAction::Continue
    }

    /// Validate a bid notice payload against the navigation graph and build
    /// the typed request handed to the task planner. Any missing
    /// precondition rejects the notice.
    pub(super) fn make_request(&self, task_profile: &TaskProfile) -> Option<TaskRequest> {
        let name = &self.options.name;
        let description = &task_profile.description;
        let task_id = &task_profile.task_id;
        let priority = if description.priority.is_high() {
            BinaryPriority::High
        } else {
            BinaryPriority::Low
        };

        let detail = match description.kind() {
            Some(TaskKind::Clean) => {
                let TaskPayload::Clean { start_waypoint } = &description.payload else {
                    error!(
                        "required clean payload missing in task profile, rejecting bid notice \
                         for task [{task_id}]"
                    );
                    return None;
                };
                if start_waypoint.is_empty() {
                    error!(
                        "required param [clean.start_waypoint] missing in task profile, \
                         rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                }
                let Some(start_wp) = self.graph.find_waypoint(start_waypoint) else {
                    info!(
                        "fleet [{name}] does not have a named waypoint [{start_waypoint}] in \
                         its nav graph, rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                };
                let Some(dock_param) = self.dock_params.get(start_waypoint) else {
                    info!(
                        "dock param for dock [{start_waypoint}] unavailable, rejecting bid \
                         notice for task [{task_id}]"
                    );
                    return None;
                };
                let Some(finish_wp) = self.graph.find_waypoint(&dock_param.finish) else {
                    info!(
                        "fleet [{name}] does not have a named waypoint [{}] in its nav graph, \
                         rejecting bid notice for task [{task_id}]",
                        dock_param.finish
                    );
                    return None;
                };
                let trajectory = interpolate_positions(
                    &self.options.vehicle_traits,
                    description.start_time,
                    &dock_param.path,
                );
                if trajectory.is_empty() {
                    info!(
                        "unable to generate a cleaning trajectory from the dock path of \
                         [{start_waypoint}], rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                }
                RequestDetail::Clean {
                    start_waypoint: start_wp.index(),
                    finish_waypoint: finish_wp.index(),
                    trajectory,
                }
            }
            Some(TaskKind::Delivery) => {
                let TaskPayload::Delivery {
                    pickup_place,
                    pickup_dispenser,
                    dropoff_place,
                    dropoff_ingestor,
                } = &description.payload
                else {
                    error!(
                        "required delivery payload missing in task profile, rejecting bid \
                         notice for task [{task_id}]"
                    );
                    return None;
                };
                for (param, value) in [
                    ("delivery.pickup_place", pickup_place),
                    ("delivery.pickup_dispenser", pickup_dispenser),
                    ("delivery.dropoff_place", dropoff_place),
                    ("delivery.dropoff_ingestor", dropoff_ingestor),
                ] {
                    if value.is_empty() {
                        error!(
                            "required param [{param}] missing in task profile, rejecting bid \
                             notice for task [{task_id}]"
                        );
                        return None;
                    }
                }
                let Some(pickup_wp) = self.graph.find_waypoint(pickup_place) else {
                    info!(
                        "fleet [{name}] does not have a named waypoint [{pickup_place}] in its \
                         nav graph, rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                };
                let Some(dropoff_wp) = self.graph.find_waypoint(dropoff_place) else {
                    info!(
                        "fleet [{name}] does not have a named waypoint [{dropoff_place}] in \
                         its nav graph, rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                };
                // The wait durations stay at zero until dispenser and
                // ingestor cycle times can be looked up per system.
                RequestDetail::Delivery {
                    pickup_waypoint: pickup_wp.index(),
                    pickup_wait: Duration::from_secs(0),
                    dropoff_waypoint: dropoff_wp.index(),
                    dropoff_wait: Duration::from_secs(0),
                }
            }
            Some(TaskKind::Loop) => {
                let TaskPayload::Loop {
                    start_name,
                    finish_name,
                    num_loops,
                } = &description.payload
                else {
                    error!(
                        "required loop payload missing in task profile, rejecting bid notice \
                         for task [{task_id}]"
                    );
                    return None;
                };
                if start_name.is_empty() {
                    error!(
                        "required param [loop.start_name] missing in task profile, rejecting \
                         bid notice for task [{task_id}]"
                    );
                    return None;
                }
                if finish_name.is_empty() {
                    error!(
                        "required param [loop.finish_name] missing in task profile, rejecting \
                         bid notice for task [{task_id}]"
                    );
                    return None;
                }
                if *num_loops < 1 {
                    error!(
                        "required param [loop.num_loops: {num_loops}] in task profile is \
                         invalid, rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                }
                let Some(start_wp) = self.graph.find_waypoint(start_name) else {
                    info!(
                        "fleet [{name}] does not have a named waypoint [{start_name}] in its \
                         nav graph, rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                };
                let Some(finish_wp) = self.graph.find_waypoint(finish_name) else {
                    info!(
                        "fleet [{name}] does not have a named waypoint [{finish_name}] in its \
                         nav graph, rejecting bid notice for task [{task_id}]"
                    );
                    return None;
                };
                RequestDetail::Loop {
                    start_waypoint: start_wp.index(),
                    finish_waypoint: finish_wp.index(),
                    num_loops: *num_loops,
                }
            }
            _ => {
                error!(
                    "invalid task type [{}] in task profile, rejecting bid notice for task \
                     [{task_id}]",
                    description.kind_tag
                );
                return None;
            }
        };

        Some(TaskRequest {
            id: task_id.clone(),
            earliest_start_time: description.start_time,
            priority,
            detail,
        })
    }

    pub(super) fn handle_dispatch_request(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        request: DispatchRequest,
        result: oneshot::Sender<DispatchAck>,
    ) -> ActorAction {
        if request.fleet_name != self.options.name {
            warn!(
                "received a dispatch request addressed to fleet [{}], ignoring the request",
                request.fleet_name
            );
            let _ = result.send(DispatchAck::new(request, false));
            return ActorAction::Continue;
        }
        let task_id = request.task_profile.task_id.clone();
        let success = match request.method {
            DispatchMethod::Add => self.add_dispatched_task(&task_id),
            DispatchMethod::Cancel => self.cancel_dispatched_task(&task_id),
        };
        let _ = result.send(DispatchAck::new(request, success));
        ActorAction::Continue
    }

    fn add_dispatched_task(&mut self, task_id: &TaskId) -> bool {
        let name = &self.options.name;
        let Some(assignments) = self.bid_notice_assignments.get(task_id).cloned() else {
            warn!(
                "received a dispatch request for task [{task_id}] before receiving a bid \
                 notice, ignoring the request"
            );
            return false;
        };
        info!("bid for task [{task_id}] awarded to fleet [{name}], processing the request");

        if assignments.len() != self.task_managers.len() {
            error!(
                "the number of available robots does not match the assignments for task \
                 [{task_id}], ignoring the request"
            );
            return false;
        }
        let Some(request) = self.generated_requests.get(task_id).cloned() else {
            error!(
                "unable to find the generated request for task [{task_id}], ignoring the \
                 request"
            );
            return false;
        };

        // A robot may have started working on one of the bid-time
        // assignments in the meantime, in which case a fresh plan is needed
        // before the queues can be replaced.
        let assignments = if self.is_valid_assignments(&assignments) {
            assignments
        } else {
            match self.allocate_tasks(Some(request.clone()), None) {
                Some(assignments) => assignments,
                None => {
                    warn!(
                        "unable to replan assignments when accommodating task [{task_id}], \
                         ignoring the request"
                    );
                    return false;
                }
            }
        };

        self.commit_assignments(&assignments);
        self.assigned_requests.insert(task_id.clone(), request);
        info!(
            "assignments updated for robots in fleet [{}] to accommodate task [{task_id}]",
            self.options.name
        );
        true
    }

    fn cancel_dispatched_task(&mut self, task_id: &TaskId) -> bool {
        if self.cancelled_task_ids.contains(task_id) {
            warn!("task [{task_id}] has already been cancelled");
            return true;
        }
        let Some(request) = self.assigned_requests.get(task_id).cloned() else {
            warn!(
                "unable to cancel task [{task_id}] as it is not assigned to fleet [{}]",
                self.options.name
            );
            return false;
        };
        // Cancellation of a task that has begun execution is not supported.
        if self.executed_tasks().contains(task_id) {
            warn!(
                "unable to cancel task [{task_id}] that has already begun execution, only \
                 queued tasks may be cancelled"
            );
            return false;
        }

        let Some(assignments) = self.allocate_tasks(None, Some(&request)) else {
            warn!("unable to replan assignments when cancelling task [{task_id}]");
            return false;
        };
        self.commit_assignments(&assignments);
        self.cancelled_task_ids.insert(task_id.clone());
        info!(
            "task [{task_id}] has been cancelled, assignments updated for robots in fleet [{}]",
            self.options.name
        );
        true
    }

    /// True iff no assignment refers to a task that a robot has already
    /// begun or finished executing.
    pub(super) fn is_valid_assignments(&self, assignments: &Assignments) -> bool {
        let executed = self.executed_tasks();
        assignments
            .iter()
            .flatten()
            .all(|assignment| !executed.contains(&assignment.request.id))
    }

    fn executed_tasks(&self) -> HashSet<TaskId> {
        self.task_managers
            .iter()
            .flat_map(|manager| manager.executed_tasks())
            .collect()
    }

    fn commit_assignments(&mut self, assignments: &Assignments) {
        for (manager, queue) in self.task_managers.iter_mut().zip(assignments.iter()) {
            manager.set_queue(queue.clone());
        }
        if let Some(planner) = &self.task_planner {
            self.current_assignment_cost = planner.compute_cost(assignments);
        }
    }

    pub(super) fn handle_dock_summary(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        summary: DockSummary,
    ) -> ActorAction {
        for dock in summary.docks {
            if dock.fleet_name == self.options.name {
                self.dock_params = dock
                    .params
                    .into_iter()
                    .map(|param| (param.start.clone(), param))
                    .collect();
                break;
            }
        }
        ActorAction::Continue
    }

    pub(super) fn handle_add_robot(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        mut manager: Box<dyn TaskManager>,
        start_waypoints: Vec<usize>,
        result: oneshot::Sender<DispatchResult<()>>,
    ) -> ActorAction {
        let outcome = self.add_robot(&mut manager, &start_waypoints);
        if outcome.is_ok() {
            self.task_managers.push(manager);
        }
        let _ = result.send(outcome);
        ActorAction::Continue
    }

    fn add_robot(
        &mut self,
        manager: &mut Box<dyn TaskManager>,
        start_waypoints: &[usize],
    ) -> DispatchResult<()> {
        let Some(start) = start_waypoints.first() else {
            return Err(DispatchError::InvalidArgument(
                "adding a robot to a fleet requires at least one start waypoint".to_string(),
            ));
        };
        let Some(charger) = self.graph.nearest_charger(*start) else {
            return Err(DispatchError::InvalidArgument(
                "adding a robot to a fleet requires at least one charging waypoint in its \
                 navigation graph"
                    .to_string(),
            ));
        };
        manager.assign_charger(charger);
        info!(
            "added a robot named [{}] to fleet [{}]",
            manager.robot_name(),
            self.options.name
        );
        Ok(())
    }

    pub(super) fn handle_close_lanes(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        lanes: Vec<usize>,
    ) -> ActorAction {
        if !self.graph.close_lanes(&lanes) {
            debug!("no changes are needed to the planner configuration");
        }
        ActorAction::Continue
    }

    pub(super) fn handle_open_lanes(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        lanes: Vec<usize>,
    ) -> ActorAction {
        if !self.graph.open_lanes(&lanes) {
            debug!("no changes are needed to the planner configuration");
        }
        ActorAction::Continue
    }

    pub(super) fn handle_configure_planner(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        planner: Arc<dyn TaskPlanner>,
        params: TaskPlannerParams,
        result: oneshot::Sender<bool>,
    ) -> ActorAction {
        if params.is_valid() {
            self.task_planner = Some(planner);
            let _ = result.send(true);
        } else {
            warn!(
                "invalid task planner params for fleet [{}], keeping the previous planner",
                self.options.name
            );
            let _ = result.send(false);
        }
        ActorAction::Continue
    }

    pub(super) fn handle_report_task_status(
        &mut self,
        ctx: &mut ActorContext<Self>,
        task_id: TaskId,
        robot_name: String,
        state: TaskState,
    ) -> ActorAction {
        let name = self.options.name.clone();
        let task_profile = self.task_profiles.get(&task_id).cloned().unwrap_or_else(|| {
            // Work the fleet generated on its own (e.g. charging) has no
            // submitted profile.
            TaskProfile {
                task_id: task_id.clone(),
                submission_time: Utc::now(),
                description: TaskDescription {
                    kind_tag: TaskKind::ChargeBattery.tag(),
                    start_time: Utc::now(),
                    priority: Priority::default(),
                    payload: TaskPayload::None,
                },
            }
        });
        let status = TaskStatus {
            task_profile,
            fleet_name: Some(name.clone()),
            robot_name: Some(robot_name),
            state,
            status_message: None,
        };
        let dispatcher = self.options.dispatcher.clone();
        ctx.spawn(async move {
            if dispatcher
                .send(DispatcherEvent::UpdateTaskStatus { status })
                .await
                .is_err()
            {
                warn!("failed to report task status from fleet [{name}]");
            }
        });
        ActorAction::Continue
    }

    pub(super) fn handle_publish_fleet_state(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> ActorAction {
        let state = FleetState {
            name: self.options.name.clone(),
            robots: self
                .task_managers
                .iter()
                .map(|manager| manager.summary())
                .collect(),
        };
        // Nobody may be subscribed; that is fine.
        let _ = self.options.fleet_state_sender.send(state);
        if let Some(period) = self.options.state_publish_period {
            ctx.send_with_delay(FleetEvent::PublishFleetState, period);
        }
        ActorAction::Continue
    }
}
