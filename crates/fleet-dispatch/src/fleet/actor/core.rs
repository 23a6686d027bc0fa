use std::collections::{HashMap, HashSet};
use std::mem;

use fleet_server::actor::{Actor, ActorAction, ActorContext};
use log::info;

use crate::fleet::{FleetActor, FleetEvent, FleetOptions};

impl Actor for FleetActor {
    type Message = FleetEvent;
    type Options = FleetOptions;

    fn name() -> &'static str {
        "FleetActor"
    }

    fn new(mut options: FleetOptions) -> Self {
        let graph = mem::take(&mut options.graph);
        Self {
            options,
            graph,
            dock_params: HashMap::new(),
            accept_task: None,
            task_planner: None,
            task_managers: Vec::new(),
            bid_notice_assignments: HashMap::new(),
            generated_requests: HashMap::new(),
            task_profiles: HashMap::new(),
            assigned_requests: HashMap::new(),
            cancelled_task_ids: HashSet::new(),
            current_assignment_cost: 0.0,
        }
    }

    fn start(&mut self, ctx: &mut ActorContext<Self>) {
        if let Some(period) = self.options.state_publish_period {
            ctx.send_with_delay(FleetEvent::PublishFleetState, period);
        }
    }

    fn receive(&mut self, ctx: &mut ActorContext<Self>, message: FleetEvent) -> ActorAction {
        match message {
            FleetEvent::BidNotice { notice } => self.handle_bid_notice(ctx, notice),
            FleetEvent::DispatchRequest { request, result } => {
                self.handle_dispatch_request(ctx, request, result)
            }
            FleetEvent::DockSummary { summary } => self.handle_dock_summary(ctx, summary),
            FleetEvent::AddRobot {
                manager,
                start_waypoints,
                result,
            } => self.handle_add_robot(ctx, manager, start_waypoints, result),
            FleetEvent::CloseLanes { lanes } => self.handle_close_lanes(ctx, lanes),
            FleetEvent::OpenLanes { lanes } => self.handle_open_lanes(ctx, lanes),
            FleetEvent::AcceptTaskRequests { accept } => {
                self.accept_task = Some(accept);
                ActorAction::Continue
            }
            FleetEvent::ConfigurePlanner {
                planner,
                params,
                result,
            } => self.handle_configure_planner(ctx, planner, params, result),
            FleetEvent::ReportTaskStatus {
                task_id,
                robot_name,
                state,
            } => self.handle_report_task_status(ctx, task_id, robot_name, state),
            FleetEvent::PublishFleetState => self.handle_publish_fleet_state(ctx),
        }
    }

    fn stop(self) {
        info!("fleet [{}] has stopped", self.options.name);
    }
}
