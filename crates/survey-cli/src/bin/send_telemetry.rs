//! CLI tool to stream simulated telemetry to a survey mission.
//!
//! Flies a straight line between two points and prints each server reply.

use anyhow::Context;
use clap::Parser;
use survey_cli::{report_period, StraightTrack, SurveyClient};
use survey_core::models::{Position, TelemetryReply, TelemetryReport};
use tokio::time;
use uuid::Uuid;

/// Send telemetry for an IN_PROGRESS mission
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Survey Server URL
    #[arg(long, default_value = "http://localhost:8000")]
    url: String,

    /// Mission to report for
    #[arg(long)]
    mission: Uuid,

    /// Start longitude
    #[arg(long, default_value_t = 8.5400)]
    from_lng: f64,

    /// Start latitude
    #[arg(long, default_value_t = 47.3700)]
    from_lat: f64,

    /// End longitude
    #[arg(long, default_value_t = 8.5450)]
    to_lng: f64,

    /// End latitude
    #[arg(long, default_value_t = 47.3720)]
    to_lat: f64,

    /// Altitude in meters
    #[arg(long, default_value_t = 60.0)]
    altitude: f64,

    /// Number of reports to send
    #[arg(long, default_value_t = 10)]
    points: usize,

    /// Reports per second
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Battery level at the first report, drains 0.5% per report
    #[arg(long, default_value_t = 100.0)]
    battery: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let period = report_period(args.rate).context("invalid --rate")?;

    println!("Connecting to Survey Server at {}...", args.url);
    let client = SurveyClient::new(&args.url);
    let mut stream = client.telemetry(args.mission).await?;

    let track = StraightTrack::new(
        Position::with_alt(args.from_lng, args.from_lat, args.altitude),
        Position::with_alt(args.to_lng, args.to_lat, args.altitude),
    );

    println!("Streaming {} reports for mission {}", args.points, args.mission);
    let mut interval = time::interval(period);

    for (i, position) in track.sample(args.points).into_iter().enumerate() {
        interval.tick().await;

        let mut report = TelemetryReport::new(position.lng, position.lat);
        report.alt = position.alt;
        report.battery = Some((args.battery - 0.5 * i as f64).max(0.0));
        report.timestamp = Some(chrono::Utc::now().to_rfc3339());

        match stream.send(&report).await? {
            TelemetryReply::Ack { progress } => {
                println!("  [{:3}] ({:.5}, {:.5}) progress {:.1}%", i + 1, report.lat, report.lng, progress)
            }
            TelemetryReply::Rejected { reason } => {
                println!("  [{:3}] rejected: {}", i + 1, reason)
            }
        }
    }

    stream.close().await?;
    println!("Done.");
    Ok(())
}
