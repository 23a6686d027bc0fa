use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use env_logger::{Builder, Env};
use fleet_common::config::AppConfig;
use fleet_dispatch::graph::{DockParameters, NavGraph, Pose, VehicleTraits};
use fleet_dispatch::messages::{Dock, DockSummary};
use fleet_dispatch::planner::{GreedyPlanner, RobotState, TaskPlannerParams};
use fleet_dispatch::task::TaskDescription;
use fleet_dispatch::task_manager::InMemoryTaskManager;
use fleet_dispatch::{Dispatcher, Fleet};
use log::info;

#[derive(Debug, Parser)]
#[command(name = "fleet", about = "Run a demo fleet task dispatch session")]
struct Args {
    /// The number of robots in the demo fleet.
    #[arg(long, default_value_t = 2)]
    robots: usize,
}

fn demo_graph() -> NavGraph {
    let mut graph = NavGraph::new();
    graph.add_waypoint("dock_a", [0.0, 0.0]);
    graph.add_waypoint("hall", [10.0, 0.0]);
    graph.add_waypoint("pantry", [4.0, 6.0]);
    graph.add_waypoint("ward", [12.0, 6.0]);
    graph.add_charger("charger", [6.0, 0.0]);
    graph.add_lane(0, 1);
    graph.add_lane(1, 0);
    graph.add_lane(1, 3);
    graph.add_lane(2, 3);
    graph
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = AppConfig::load()?;

    let graph = demo_graph();
    let planner = Arc::new(GreedyPlanner::new(
        Arc::new(graph.clone()),
        VehicleTraits::default(),
    ));

    let dispatcher = Dispatcher::new(&config);
    let fleet = Fleet::new(
        "demo_fleet",
        graph,
        VehicleTraits::default(),
        &config,
        &dispatcher,
    );
    fleet.accept_task_requests(|_| true).await?;
    fleet
        .set_task_planner(planner, TaskPlannerParams::default())
        .await?;
    fleet
        .update_docks(DockSummary {
            docks: vec![Dock {
                fleet_name: "demo_fleet".to_string(),
                params: vec![DockParameters {
                    start: "dock_a".to_string(),
                    finish: "hall".to_string(),
                    path: vec![
                        Pose {
                            x: 0.0,
                            y: 0.0,
                            yaw: 0.0,
                        },
                        Pose {
                            x: 10.0,
                            y: 0.0,
                            yaw: 0.0,
                        },
                    ],
                }],
            }],
        })
        .await?;

    for index in 0..args.robots {
        let state = RobotState {
            time: chrono::Utc::now(),
            waypoint: index % 2,
            charging_waypoint: 0,
            battery_soc: 1.0,
        };
        let manager = InMemoryTaskManager::new(format!("robot_{index}"), state);
        fleet.add_robot(Box::new(manager), vec![index % 2]).await?;
    }
    dispatcher.register_fleet(&fleet).await?;

    let clean = dispatcher
        .submit_task(TaskDescription::clean("dock_a"))
        .await?;
    let delivery = dispatcher
        .submit_task(TaskDescription::delivery(
            "pantry",
            "dispenser",
            "ward",
            "ingestor",
        ))
        .await?;
    let patrol = dispatcher
        .submit_task(TaskDescription::loop_between("hall", "ward", 3))
        .await?;
    info!("submitted tasks [{clean}], [{delivery}], [{patrol}]");

    // Let the auctions run their windows back to back.
    tokio::time::sleep(Duration::from_secs(8)).await;

    let list = dispatcher.task_list().await?;
    for task in &list.active_tasks {
        info!(
            "active task [{}]: {} on fleet [{}] robot [{}]",
            task.task_id,
            task.state,
            task.fleet_name.as_deref().unwrap_or("-"),
            task.robot_name.as_deref().unwrap_or("-"),
        );
    }

    let cancelled = dispatcher.cancel_task(delivery.clone()).await?;
    info!("cancel task [{delivery}]: {cancelled}");

    let list = dispatcher.task_list().await?;
    info!(
        "{} active and {} terminated task(s)",
        list.active_tasks.len(),
        list.terminated_tasks.len()
    );

    dispatcher.shutdown().await;
    Ok(())
}
