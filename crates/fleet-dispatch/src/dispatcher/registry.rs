use std::collections::HashMap;

use fleet_server::actor::{ActorContext, ActorHandle};
use log::warn;
use tokio::sync::oneshot;

use crate::bidding::BidNotice;
use crate::dispatcher::{DispatcherActor, DispatcherEvent};
use crate::fleet::{FleetActor, FleetEvent};
use crate::messages::{DispatchAck, DispatchMethod, DispatchRequest};
use crate::task::TaskProfile;

/// The dispatcher-side view of the registered fleets: the broadcast target
/// for bid notices and the command channel for awarded or revoked tasks.
pub struct FleetRegistry {
    fleets: HashMap<String, ActorHandle<FleetActor>>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self {
            fleets: HashMap::new(),
        }
    }

    pub fn register(&mut self, fleet_name: String, handle: ActorHandle<FleetActor>) {
        if self.fleets.insert(fleet_name.clone(), handle).is_some() {
            warn!("fleet [{fleet_name}] was already registered and has been replaced");
        }
    }

    pub fn broadcast_notice(&self, ctx: &mut ActorContext<DispatcherActor>, notice: &BidNotice) {
        for (fleet_name, handle) in &self.fleets {
            let fleet_name = fleet_name.clone();
            let handle = handle.clone();
            let notice = notice.clone();
            ctx.spawn(async move {
                if handle.send(FleetEvent::BidNotice { notice }).await.is_err() {
                    warn!("failed to send bid notice to fleet [{fleet_name}]");
                }
            });
        }
    }

    /// Command the winning fleet to commit an awarded task. The fleet's
    /// acknowledgement is delivered back to the dispatcher as an event.
    pub fn add_task(
        &self,
        ctx: &mut ActorContext<DispatcherActor>,
        fleet_name: &str,
        task_profile: TaskProfile,
    ) {
        let request = DispatchRequest {
            task_profile,
            fleet_name: fleet_name.to_string(),
            method: DispatchMethod::Add,
        };
        let dispatcher = ctx.handle().clone();
        let Some(handle) = self.fleets.get(fleet_name).cloned() else {
            warn!("cannot dispatch task to unknown fleet [{fleet_name}]");
            let ack = DispatchAck::new(request, false);
            ctx.spawn(async move {
                let _ = dispatcher.send(DispatcherEvent::ReceiveDispatchAck { ack }).await;
            });
            return;
        };
        ctx.spawn(async move {
            let (tx, rx) = oneshot::channel();
            let fleet_name = request.fleet_name.clone();
            let fallback = request.clone();
            let sent = handle
                .send(FleetEvent::DispatchRequest {
                    request,
                    result: tx,
                })
                .await
                .is_ok();
            let ack = if sent {
                match rx.await {
                    Ok(ack) => ack,
                    Err(_) => DispatchAck::new(fallback, false),
                }
            } else {
                warn!("failed to send dispatch request to fleet [{fleet_name}]");
                DispatchAck::new(fallback, false)
            };
            let _ = dispatcher.send(DispatcherEvent::ReceiveDispatchAck { ack }).await;
        });
    }

    /// Forward a cancellation to the owning fleet. The fleet's boolean
    /// acknowledgement is returned to the caller through `result`, and also
    /// delivered back to the dispatcher as an advisory event.
    pub fn cancel_task(
        &self,
        ctx: &mut ActorContext<DispatcherActor>,
        fleet_name: &str,
        task_profile: TaskProfile,
        result: oneshot::Sender<bool>,
    ) {
        let request = DispatchRequest {
            task_profile,
            fleet_name: fleet_name.to_string(),
            method: DispatchMethod::Cancel,
        };
        let Some(handle) = self.fleets.get(fleet_name).cloned() else {
            warn!("cannot cancel task on unknown fleet [{fleet_name}]");
            let _ = result.send(false);
            return;
        };
        let dispatcher = ctx.handle().clone();
        ctx.spawn(async move {
            let (tx, rx) = oneshot::channel();
            let fleet_name = request.fleet_name.clone();
            let fallback = request.clone();
            let sent = handle
                .send(FleetEvent::DispatchRequest {
                    request,
                    result: tx,
                })
                .await
                .is_ok();
            let ack = if sent {
                match rx.await {
                    Ok(ack) => ack,
                    Err(_) => DispatchAck::new(fallback, false),
                }
            } else {
                warn!("failed to send cancel request to fleet [{fleet_name}]");
                DispatchAck::new(fallback, false)
            };
            let _ = result.send(ack.success);
            let _ = dispatcher.send(DispatcherEvent::ReceiveDispatchAck { ack }).await;
        });
    }
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
