mod core;
mod handler;

use crate::bidding::Auctioneer;
use crate::dispatcher::event::StatusCallback;
use crate::dispatcher::registry::FleetRegistry;
use crate::dispatcher::state::DispatcherState;
use crate::dispatcher::DispatcherOptions;

pub struct DispatcherActor {
    options: DispatcherOptions,
    state: DispatcherState,
    auctioneer: Auctioneer,
    fleets: FleetRegistry,
    /// The single task status observer. It is invoked synchronously from
    /// within state transitions; re-entering the dispatcher from the
    /// callback is undefined behavior.
    status_callback: Option<StatusCallback>,
}
