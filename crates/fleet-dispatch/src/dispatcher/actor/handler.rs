use chrono::Utc;
use fleet_server::actor::{ActorAction, ActorContext, ActorHandle};
use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use crate::bidding::{BidNotice, BidProposal};
use crate::dispatcher::event::TaskList;
use crate::dispatcher::{DispatcherActor, DispatcherEvent};
use crate::error::{DispatchError, DispatchResult};
use crate::fleet::FleetActor;
use crate::id::TaskId;
use crate::messages::{DispatchAck, DispatchMethod};
use crate::task::{TaskDescription, TaskProfile, TaskState, TaskStatus};

impl DispatcherActor {
    pub(super) fn handle_submit_task(
        &mut self,
        ctx: &mut ActorContext<Self>,
        description: TaskDescription,
        result: oneshot::Sender<DispatchResult<TaskId>>,
    ) -> ActorAction {
        let Some(kind) = description.kind() else {
            error!("task type [{}] is invalid", description.kind_tag);
            let _ = result.send(Err(DispatchError::InvalidTaskType));
            return ActorAction::Continue;
        };
        let task_id = match self.state.mint_task_id(kind) {
            Ok(task_id) => task_id,
            Err(e) => {
                let _ = result.send(Err(e));
                return ActorAction::Continue;
            }
        };
        info!("received task submission [{task_id}]");

        let task_profile = TaskProfile {
            task_id: task_id.clone(),
            submission_time: Utc::now(),
            description,
        };
        let status = TaskStatus::new(task_profile.clone());
        self.state.insert_submitted(status.clone());
        self.notify_status(&status);

        let notice = BidNotice {
            task_profile,
            time_window: self.options.bidding_time_window,
        };
        if self.state.push_notice(notice) {
            self.start_next_auction(ctx);
        }
        let _ = result.send(Ok(task_id));
        ActorAction::Continue
    }

    pub(super) fn handle_cancel_task(
        &mut self,
        ctx: &mut ActorContext<Self>,
        task_id: TaskId,
        result: oneshot::Sender<bool>,
    ) -> ActorAction {
        let Some(status) = self.state.get_active(&task_id) else {
            error!("task [{task_id}] is not found in the active tasks");
            let _ = result.send(false);
            return ActorAction::Continue;
        };
        warn!("cancel task: [{task_id}]");

        // A pending task has not been awarded, so it terminates locally.
        if status.state == TaskState::Pending {
            let mut status = status.clone();
            status.state = TaskState::Canceled;
            self.terminate_task(status.clone());
            self.notify_status(&status);
            let _ = result.send(true);
            return ActorAction::Continue;
        }

        if !self.state.is_user_submitted(&task_id) {
            error!("only user submitted tasks are cancelable");
            let _ = result.send(false);
            return ActorAction::Continue;
        }

        if status.state != TaskState::Queued {
            error!("unable to cancel task [{task_id}] as it is not a queued task");
            let _ = result.send(false);
            return ActorAction::Continue;
        }

        let task_profile = status.task_profile.clone();
        let Some(fleet_name) = status.fleet_name.clone() else {
            error!("queued task [{task_id}] has no owning fleet");
            let _ = result.send(false);
            return ActorAction::Continue;
        };

        // Drop the fleet's stale auxiliary work before it replans, then let
        // the fleet decide whether the cancellation succeeds.
        self.sweep_self_generated_tasks(&fleet_name);
        self.fleets.cancel_task(ctx, &fleet_name, task_profile, result);
        ActorAction::Continue
    }

    pub(super) fn handle_get_task_state(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        task_id: TaskId,
        result: oneshot::Sender<Option<TaskState>>,
    ) -> ActorAction {
        let _ = result.send(self.state.get_state(&task_id));
        ActorAction::Continue
    }

    pub(super) fn handle_get_task_list(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        result: oneshot::Sender<TaskList>,
    ) -> ActorAction {
        let _ = result.send(TaskList {
            active_tasks: self.state.active_summaries(),
            terminated_tasks: self.state.terminated_summaries(),
        });
        ActorAction::Continue
    }

    pub(super) fn handle_register_fleet(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        fleet_name: String,
        fleet: ActorHandle<FleetActor>,
    ) -> ActorAction {
        info!("registered fleet [{fleet_name}]");
        self.fleets.register(fleet_name, fleet);
        ActorAction::Continue
    }

    pub(super) fn handle_receive_proposal(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        proposal: BidProposal,
    ) -> ActorAction {
        self.auctioneer.receive_proposal(proposal);
        ActorAction::Continue
    }

    pub(super) fn handle_bidding_window_closed(
        &mut self,
        ctx: &mut ActorContext<Self>,
        task_id: TaskId,
    ) -> ActorAction {
        let Some(winner) = self.auctioneer.finish_bidding(&task_id) else {
            // A stale window timer; the auction was aborted or superseded.
            return ActorAction::Continue;
        };
        self.receive_bidding_winner(ctx, &task_id, winner);
        ActorAction::Continue
    }

    fn receive_bidding_winner(
        &mut self,
        ctx: &mut ActorContext<Self>,
        task_id: &TaskId,
        winner: Option<BidProposal>,
    ) {
        // The auction for the queue head has concluded either way.
        let advance = self
            .state
            .front_notice()
            .is_some_and(|notice| &notice.task_profile.task_id == task_id);
        if advance {
            self.state.pop_notice();
        }

        // The task may have been canceled while its auction was running.
        if let Some(status) = self.state.get_active(task_id).cloned() {
            match winner {
                None => {
                    warn!(
                        "bidding result: task [{task_id}] has no submissions during bidding, \
                         task failed"
                    );
                    let mut status = status;
                    status.state = TaskState::Failed;
                    self.terminate_task(status.clone());
                    self.notify_status(&status);
                }
                Some(winner) => {
                    info!(
                        "bidding result: task [{task_id}] is accepted by fleet [{}]",
                        winner.fleet_name
                    );
                    let mut status = status;
                    status.fleet_name = Some(winner.fleet_name.clone());
                    status.robot_name = Some(winner.robot_name.clone());
                    self.state.update_active(status.clone());
                    self.sweep_self_generated_tasks(&winner.fleet_name);
                    self.fleets
                        .add_task(ctx, &winner.fleet_name, status.task_profile);
                }
            }
        }

        if advance {
            self.start_next_auction(ctx);
        }
    }

    pub(super) fn handle_receive_dispatch_ack(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        ack: DispatchAck,
    ) -> ActorAction {
        let task_id = ack.request.task_profile.task_id.clone();
        match ack.request.method {
            DispatchMethod::Add => {
                // The task may have been canceled while the award was in flight.
                let Some(status) = self.state.get_active(&task_id).cloned() else {
                    return ActorAction::Continue;
                };
                let mut status = status;
                if ack.success {
                    // The fleet may have begun executing before the
                    // acknowledgement landed; never regress the state.
                    if status.state != TaskState::Pending {
                        return ActorAction::Continue;
                    }
                    info!(
                        "task [{task_id}] has been queued on fleet [{}]",
                        ack.request.fleet_name
                    );
                    status.state = TaskState::Queued;
                    self.state.update_active(status.clone());
                    self.notify_status(&status);
                } else {
                    warn!(
                        "fleet [{}] failed to accommodate task [{task_id}], task failed",
                        ack.request.fleet_name
                    );
                    status.state = TaskState::Failed;
                    self.terminate_task(status.clone());
                    self.notify_status(&status);
                }
            }
            DispatchMethod::Cancel => {
                // Advisory: the canceled task terminates through the status
                // channel, not through the acknowledgement.
                debug!(
                    "fleet [{}] acknowledged cancellation of task [{task_id}]: {}",
                    ack.request.fleet_name, ack.success
                );
            }
        }
        ActorAction::Continue
    }

    pub(super) fn handle_update_task_status(
        &mut self,
        ctx: &mut ActorContext<Self>,
        status: TaskStatus,
    ) -> ActorAction {
        let task_id = status.task_id().clone();
        if !self.state.contains_active(&task_id) {
            if self.state.contains_terminated(&task_id) {
                debug!("ignoring status for terminated task [{task_id}]");
                return ActorAction::Continue;
            }
            // Fleets generate tasks outside the auction path (e.g. charging);
            // admit them so they are visible and garbage-collectable.
            warn!("adding previously unheard task: [{task_id}]");
            self.state.admit_stray(status.clone());
        } else if let Some(current) = self.state.get_active_mut(&task_id) {
            current.state = status.state;
            if current.fleet_name.is_none() {
                current.fleet_name = status.fleet_name.clone();
            }
            if status.robot_name.is_some() {
                current.robot_name = status.robot_name.clone();
            }
            if status.status_message.is_some() {
                current.status_message = status.status_message.clone();
            }
        }

        // A status for the current bidding head means the fleet has begun
        // the task before formally acknowledging the award; its auction is
        // moot, so the queue advances early.
        if self
            .state
            .front_notice()
            .is_some_and(|notice| notice.task_profile.task_id == task_id)
        {
            self.auctioneer.abort_bidding(&task_id);
            self.state.pop_notice();
            self.start_next_auction(ctx);
        }

        if let Some(current) = self.state.get_active(&task_id).cloned() {
            self.notify_status(&current);
            if current.is_terminated() {
                self.terminate_task(current);
            }
        }
        ActorAction::Continue
    }

    pub(super) fn handle_publish_ongoing_tasks(
        &mut self,
        ctx: &mut ActorContext<Self>,
    ) -> ActorAction {
        self.publish_ongoing_tasks();
        ctx.send_with_delay(
            DispatcherEvent::PublishOngoingTasks,
            self.options.publish_ongoing_tasks_period,
        );
        ActorAction::Continue
    }

    /// Start the auction for the first queued notice whose task is still
    /// pending; stale heads (canceled or terminated early) are skipped so
    /// their notices never reach the fleets.
    fn start_next_auction(&mut self, ctx: &mut ActorContext<Self>) {
        if !self.auctioneer.is_idle() {
            return;
        }
        while let Some(notice) = self.state.front_notice() {
            let task_id = notice.task_profile.task_id.clone();
            let eligible = self
                .state
                .get_active(&task_id)
                .is_some_and(|status| status.state == TaskState::Pending);
            if !eligible {
                debug!("skipping bidding for inactive task [{task_id}]");
                self.state.pop_notice();
                continue;
            }
            let notice = notice.clone();
            if let Some(time_window) = self.auctioneer.start_bidding(notice.clone()) {
                self.fleets.broadcast_notice(ctx, &notice);
                ctx.send_with_delay(DispatcherEvent::BiddingWindowClosed { task_id }, time_window);
            }
            return;
        }
    }

    /// Mark as canceled and terminate every active task attributed to a
    /// fleet that is not user-submitted. Invoked before a fleet receives a
    /// new user-submitted assignment.
    fn sweep_self_generated_tasks(&mut self, fleet_name: &str) {
        for status in self.state.cancel_self_generated(fleet_name) {
            debug!(
                "terminating self-generated task [{}] on fleet [{fleet_name}]",
                status.task_id()
            );
            self.terminate_task(status);
        }
    }

    fn terminate_task(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminated());
        // The snapshot published here still contains the task, in its
        // terminal state; the next snapshot shows the removal.
        if self.state.contains_active(status.task_id()) {
            self.state.update_active(status.clone());
        }
        self.publish_ongoing_tasks();
        self.state.terminate(status);
    }

    fn publish_ongoing_tasks(&self) {
        // Nobody may be subscribed; that is fine.
        let _ = self
            .options
            .ongoing_tasks_sender
            .send(self.state.active_summaries());
    }

    fn notify_status(&self, status: &TaskStatus) {
        if let Some(callback) = &self.status_callback {
            callback(status);
        }
    }
}
