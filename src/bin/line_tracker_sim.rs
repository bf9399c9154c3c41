use anyhow::{anyhow, Context, Result};
use clap::Parser;
use line_tracker::{
    LineGoal, LineTrackerTrapezoid, Odometry, Tracker, TrackerConfig, TrackerStatus, Vec3,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

/// Fly a simulated multirotor through a sequence of line goals
#[derive(Debug, Parser)]
#[command(name = "line_tracker_sim")]
struct Args {
    /// Tracker configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Goal as "x,y,z"; repeat to queue several goals
    #[arg(short, long = "goal", value_parser = parse_goal, required = true)]
    goals: Vec<Vec3>,

    /// Interpret goals relative to the current commanded position
    #[arg(long)]
    relative: bool,

    /// Cruise speed in m/s (default from config)
    #[arg(long, default_value_t = 0.0)]
    v_des: f64,

    /// Cruise acceleration in m/s^2 (default from config)
    #[arg(long, default_value_t = 0.0)]
    a_des: f64,

    /// Seconds between goals; a goal may interrupt the one in flight
    #[arg(long, default_value_t = 4.0)]
    goal_interval: f64,

    /// Control loop rate in Hz
    #[arg(long, default_value_t = 50.0)]
    rate: f64,

    /// Vehicle position tracking bandwidth in 1/s; lower means more lag
    #[arg(long, default_value_t = 2.0)]
    bandwidth: f64,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,
}

fn parse_goal(text: &str) -> Result<Vec3, String> {
    let parts = text
        .split(',')
        .map(|s| s.trim().parse::<f64>().map_err(|e| format!("{}: {}", s, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z but got '{}'", text)),
    }
}

/// Point-mass vehicle chasing the commanded position
struct Vehicle {
    position: Vec3,
    velocity: Vec3,
    bandwidth: f64,
}

impl Vehicle {
    fn step(&mut self, target: Vec3, feedforward: Vec3, dt: f64) {
        self.velocity = feedforward + self.bandwidth * (target - self.position);
        self.position += self.velocity * dt;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if !args.rate.is_finite() || args.rate <= 0.0 {
        return Err(anyhow!("control rate must be positive, got {}", args.rate));
    }
    let period = Duration::try_from_secs_f64(1.0 / args.rate).context("invalid control rate")?;
    let timeout = Duration::try_from_secs_f64(args.timeout).context("invalid timeout")?;
    let goal_interval =
        Duration::try_from_secs_f64(args.goal_interval).context("invalid goal interval")?;

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading tracker config from {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    let mut tracker = LineTrackerTrapezoid::new(config.clone());
    tracker.initialize(&config)?;

    let (goal_tx, mut goal_rx) = mpsc::channel::<LineGoal>(8);
    let goal_count = args.goals.len();
    let goals: Vec<LineGoal> = args
        .goals
        .iter()
        .map(|g| LineGoal {
            x: g.x,
            y: g.y,
            z: g.z,
            relative: args.relative,
            v_des: args.v_des,
            a_des: args.a_des,
        })
        .collect();
    tokio::spawn(async move {
        for (i, goal) in goals.into_iter().enumerate() {
            if i > 0 {
                sleep(goal_interval).await;
            }
            if goal_tx.send(goal).await.is_err() {
                break;
            }
        }
    });

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut vehicle = Vehicle {
        position: Vec3::zeros(),
        velocity: Vec3::zeros(),
        bandwidth: args.bandwidth,
    };
    let started = Instant::now();
    let mut goals_received = 0;

    tracing::info!("Running {} at {} Hz", tracker.name(), args.rate);

    loop {
        tokio::select! {
            Some(goal) = goal_rx.recv() => {
                goals_received += 1;
                tracker.on_goal(&goal);
            }
            _ = ticker.tick() => {
                let stamp = started.elapsed();
                let odom = Odometry {
                    linear_velocity: vehicle.velocity,
                    ..Odometry::at_rest(stamp, vehicle.position, 0.0)
                };

                let cmd = tracker.update(&odom);
                if !tracker.is_active() {
                    tracker.activate(None);
                }

                match cmd {
                    Some(cmd) => {
                        vehicle.step(cmd.position, cmd.velocity, period.as_secs_f64());
                        tracing::debug!(
                            "t={:.2} cmd=({:.3}, {:.3}, {:.3}) odom=({:.3}, {:.3}, {:.3})",
                            stamp.as_secs_f64(),
                            cmd.position.x, cmd.position.y, cmd.position.z,
                            vehicle.position.x, vehicle.position.y, vehicle.position.z
                        );
                    }
                    None => vehicle.step(vehicle.position, Vec3::zeros(), period.as_secs_f64()),
                }

                if goals_received == goal_count && tracker.status() == Some(TrackerStatus::Succeeded) {
                    tracing::info!(
                        "All goals reached after {:.2}s, vehicle at ({:.3}, {:.3}, {:.3})",
                        stamp.as_secs_f64(),
                        vehicle.position.x, vehicle.position.y, vehicle.position.z
                    );
                    break;
                }
                if stamp > timeout {
                    tracker.deactivate();
                    return Err(anyhow!("timed out after {:.1}s", args.timeout));
                }
            }
        }
    }

    tracker.deactivate();
    Ok(())
}
