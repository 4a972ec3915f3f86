//! Run a complete survey mission against a live server.
//!
//! Registers a drone and a polygon site, plans a mission, starts it, streams
//! telemetry along the planned path and completes it.

use clap::Parser;
use serde_json::json;
use std::time::Duration;
use survey_cli::SurveyClient;
use survey_core::models::{
    CreateDroneRequest, CreateMissionRequest, CreateSiteRequest, LineString, Position,
    TelemetryReply, TelemetryReport,
};

/// Survey mission demo
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Survey Server URL
    #[arg(long, default_value = "http://localhost:8000")]
    url: String,

    /// Delay between telemetry reports in milliseconds
    #[arg(long, default_value_t = 250)]
    delay_ms: u64,

    /// Abort instead of completing the mission
    #[arg(long)]
    abort: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = SurveyClient::new(&args.url);

    let health = client.health().await?;
    println!("Server health: {}", health);

    let drone = client
        .create_drone(&CreateDroneRequest {
            model: "Demo Quad".to_string(),
            status: None,
            battery_level: Some(100.0),
        })
        .await?;
    println!("Registered drone {} ({})", drone.id, drone.status);

    let site = client
        .create_site(&CreateSiteRequest {
            name: "Demo field".to_string(),
            location: json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0]]]
            }),
            area: 0.0,
        })
        .await?;
    println!("Created site {} (area {})", site.id, site.area);

    let waypoints = vec![
        Position::new(0.5, 0.5),
        Position::new(1.5, 0.5),
        Position::new(2.5, 0.5),
    ];
    let mission = client
        .create_mission(&CreateMissionRequest {
            drone_id: drone.id,
            site_id: site.id,
            planned_path: LineString::new(waypoints.clone()),
        })
        .await?;
    println!("Planned mission {} ({} waypoints)", mission.id, waypoints.len());

    let mission = client.start_mission(mission.id).await?;
    println!("Mission {} is {}", mission.id, mission.status);

    let mut stream = client.telemetry(mission.id).await?;
    for (i, waypoint) in waypoints.iter().enumerate() {
        let mut report = TelemetryReport::new(waypoint.lng, waypoint.lat);
        report.battery = Some(100.0 - 5.0 * (i + 1) as f64);
        match stream.send(&report).await? {
            TelemetryReply::Ack { progress } => println!("  report {} acked, progress {:.1}%", i + 1, progress),
            TelemetryReply::Rejected { reason } => println!("  report {} rejected: {}", i + 1, reason),
        }
        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }
    stream.close().await?;

    let finished = if args.abort {
        client.abort_mission(mission.id).await?
    } else {
        client.complete_mission(mission.id).await?
    };
    match finished.distance {
        Some(distance) => println!("Mission {} {}: flew {:.1} m", finished.id, finished.status, distance),
        None => println!("Mission {} {}", finished.id, finished.status),
    }

    let drone = client.get_drone(drone.id).await?;
    println!(
        "Drone {} is {} (battery {:?})",
        drone.id, drone.status, drone.battery_level
    );

    Ok(())
}
