use std::time::Duration;

use fleet_common::config::FleetConfig;
use fleet_server::actor::ActorHandle;
use tokio::sync::broadcast;

use crate::dispatcher::DispatcherActor;
use crate::graph::{NavGraph, VehicleTraits};
use crate::messages::FleetState;

pub struct FleetOptions {
    pub name: String,
    pub graph: NavGraph,
    pub vehicle_traits: VehicleTraits,
    /// The period of the fleet state publisher; [None] disables it.
    pub state_publish_period: Option<Duration>,
    pub dispatcher: ActorHandle<DispatcherActor>,
    pub fleet_state_sender: broadcast::Sender<FleetState>,
}

impl FleetOptions {
    pub fn new(
        name: String,
        graph: NavGraph,
        vehicle_traits: VehicleTraits,
        config: &FleetConfig,
        dispatcher: ActorHandle<DispatcherActor>,
        fleet_state_sender: broadcast::Sender<FleetState>,
    ) -> Self {
        let state_publish_period = match config.state_publish_period_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            name,
            graph,
            vehicle_traits,
            state_publish_period,
            dispatcher,
            fleet_state_sender,
        }
    }
}
