use fleet_server::actor::{Actor, ActorAction, ActorContext};
use log::info;

use crate::bidding::Auctioneer;
use crate::dispatcher::registry::FleetRegistry;
use crate::dispatcher::state::DispatcherState;
use crate::dispatcher::{DispatcherActor, DispatcherEvent, DispatcherOptions};

impl Actor for DispatcherActor {
    type Message = DispatcherEvent;
    type Options = DispatcherOptions;

    fn name() -> &'static str {
        "DispatcherActor"
    }

    fn new(options: DispatcherOptions) -> Self {
        let state = DispatcherState::new(options.terminated_tasks_max_size);
        Self {
            options,
            state,
            auctioneer: Auctioneer::new(),
            fleets: FleetRegistry::new(),
            status_callback: None,
        }
    }

    fn start(&mut self, ctx: &mut ActorContext<Self>) {
        ctx.send_with_delay(
            DispatcherEvent::PublishOngoingTasks,
            self.options.publish_ongoing_tasks_period,
        );
    }

    fn receive(&mut self, ctx: &mut ActorContext<Self>, message: DispatcherEvent) -> ActorAction {
        match message {
            DispatcherEvent::SubmitTask {
                description,
                result,
            } => self.handle_submit_task(ctx, description, result),
            DispatcherEvent::CancelTask { task_id, result } => {
                self.handle_cancel_task(ctx, task_id, result)
            }
            DispatcherEvent::GetTaskState { task_id, result } => {
                self.handle_get_task_state(ctx, task_id, result)
            }
            DispatcherEvent::GetTaskList { result } => self.handle_get_task_list(ctx, result),
            DispatcherEvent::RegisterFleet { fleet_name, fleet } => {
                self.handle_register_fleet(ctx, fleet_name, fleet)
            }
            DispatcherEvent::ReceiveProposal { proposal } => {
                self.handle_receive_proposal(ctx, proposal)
            }
            DispatcherEvent::BiddingWindowClosed { task_id } => {
                self.handle_bidding_window_closed(ctx, task_id)
            }
            DispatcherEvent::ReceiveDispatchAck { ack } => {
                self.handle_receive_dispatch_ack(ctx, ack)
            }
            DispatcherEvent::UpdateTaskStatus { status } => {
                self.handle_update_task_status(ctx, status)
            }
            DispatcherEvent::PublishOngoingTasks => self.handle_publish_ongoing_tasks(ctx),
            DispatcherEvent::SetEvaluator { evaluator } => {
                self.auctioneer.select_evaluator(evaluator);
                ActorAction::Continue
            }
            DispatcherEvent::SetStatusCallback { callback } => {
                self.status_callback = Some(callback);
                ActorAction::Continue
            }
            DispatcherEvent::Shutdown => ActorAction::Stop,
        }
    }

    fn stop(self) {
        info!("the dispatcher has stopped");
    }
}
