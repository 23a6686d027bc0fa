use std::time::Duration;

use log::{debug, error, warn};

use crate::bidding::{BidNotice, BidProposal, Evaluator, LeastFleetDiffCostEvaluator};
use crate::id::TaskId;

enum AuctionState {
    Idle,
    Collecting {
        notice: BidNotice,
        proposals: Vec<BidProposal>,
    },
    /// Transient: entered while the evaluator runs, so a re-entrant proposal
    /// observed in this state is dropped rather than collected.
    Evaluating,
}

/// Runs one auction at a time on the dispatcher side. Proposals arriving
/// while no auction is collecting, or after evaluation has started, are
/// dropped.
pub struct Auctioneer {
    evaluator: Box<dyn Evaluator>,
    state: AuctionState,
}

impl Auctioneer {
    pub fn new() -> Self {
        Self {
            evaluator: Box::new(LeastFleetDiffCostEvaluator),
            state: AuctionState::Idle,
        }
    }

    pub fn select_evaluator(&mut self, evaluator: Box<dyn Evaluator>) {
        self.evaluator = evaluator;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, AuctionState::Idle)
    }

    pub fn current_task(&self) -> Option<&TaskId> {
        match &self.state {
            AuctionState::Collecting { notice, .. } => Some(&notice.task_profile.task_id),
            _ => None,
        }
    }

    /// Open the bidding window for a notice. Returns the window length so
    /// the caller can arm the close timer, or [None] when another auction is
    /// still in progress.
    pub fn start_bidding(&mut self, notice: BidNotice) -> Option<Duration> {
        if !self.is_idle() {
            error!(
                "cannot start bidding for task [{}] while another auction is in progress",
                notice.task_profile.task_id
            );
            return None;
        }
        debug!(
            "started bidding for task [{}]",
            notice.task_profile.task_id
        );
        let time_window = notice.time_window;
        self.state = AuctionState::Collecting {
            notice,
            proposals: vec![],
        };
        Some(time_window)
    }

    pub fn receive_proposal(&mut self, proposal: BidProposal) {
        match &mut self.state {
            AuctionState::Collecting { notice, proposals }
                if notice.task_profile.task_id == proposal.task_profile.task_id =>
            {
                debug!(
                    "received proposal from fleet [{}] for task [{}]",
                    proposal.fleet_name, proposal.task_profile.task_id
                );
                proposals.push(proposal);
            }
            _ => {
                warn!(
                    "dropping late proposal from fleet [{}] for task [{}]",
                    proposal.fleet_name, proposal.task_profile.task_id
                );
            }
        }
    }

    /// Close the window for a task and evaluate the collected proposals.
    /// Returns the auction outcome, or [None] when no auction is collecting
    /// for this task (a stale window timer).
    pub fn finish_bidding(&mut self, task_id: &TaskId) -> Option<Option<BidProposal>> {
        if self.current_task() != Some(task_id) {
            return None;
        }
        let state = std::mem::replace(&mut self.state, AuctionState::Evaluating);
        let AuctionState::Collecting { proposals, .. } = state else {
            // Unreachable: current_task() only matches in the collecting state.
            self.state = AuctionState::Idle;
            return None;
        };
        let winner = self
            .evaluator
            .choose(&proposals)
            .and_then(|index| proposals.into_iter().nth(index));
        self.state = AuctionState::Idle;
        Some(winner)
    }

    /// Abandon the auction for a task without evaluating. Used when the task
    /// is observed executing before its window closed.
    pub fn abort_bidding(&mut self, task_id: &TaskId) -> bool {
        if self.current_task() != Some(task_id) {
            return false;
        }
        debug!("aborted bidding for task [{task_id}]");
        self.state = AuctionState::Idle;
        true
    }
}

impl Default for Auctioneer {
    fn default() -> Self {
        Self::new()
    }
}
