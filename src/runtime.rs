// Fixed-rate loop hosting the drive command, with a command watchdog
// Note: if teleop stops sending axis commands, the watchdog stops every module
// instead of replaying the last stick position.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{CMD_TIMEOUT, DriveConfig, TOPIC_CMD_AXES, TOPIC_HEADING, TOPIC_HEALTH, TOPIC_RT_MODULES};
use crate::drive::{
    AxisSample, AxisSource, DriveCommand, DriveError, HeadingSource, ModuleSink, ModuleState,
};
use crate::messages::{AxisCommand, HeadingReport, ModuleActuation, RuntimeHealth};

/// Latest teleop command plus its age
pub struct CommandLink {
    latest: Option<AxisCommand>,
    received_at: Instant,
    timeout: Duration,
    stale: bool,
}

impl CommandLink {
    pub fn new(timeout: Duration) -> Self {
        Self {
            latest: None,
            received_at: Instant::now(),
            timeout,
            stale: true, // Stale until first cmd
        }
    }

    pub fn on_command(&mut self, cmd: AxisCommand, now: Instant) {
        debug!("Received command: {:?}", &cmd);
        self.latest = Some(cmd);
        self.received_at = now;
    }

    /// Re-evaluate staleness for the cycle at `now`
    pub fn refresh(&mut self, now: Instant) -> bool {
        self.stale = match self.latest {
            Some(_) => now.saturating_duration_since(self.received_at) > self.timeout,
            None => true,
        };
        self.stale
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

impl AxisSource for CommandLink {
    fn sample(&mut self) -> AxisSample {
        match &self.latest {
            Some(cmd) if !self.stale => AxisSample::from(cmd),
            _ => AxisSample::default(),
        }
    }
}

/// Most recent heading from the pose estimator
#[derive(Debug, Default)]
pub struct HeadingTracker {
    heading: f64,
}

impl HeadingTracker {
    pub fn on_report(&mut self, report: HeadingReport) {
        self.heading = report.heading_rad;
    }
}

impl HeadingSource for HeadingTracker {
    fn heading(&self) -> f64 {
        self.heading
    }
}

/// Collects the frame to publish this cycle
#[derive(Debug, Default)]
pub struct ActuationBuffer {
    pending: Option<ModuleActuation>,
}

impl ActuationBuffer {
    pub fn take(&mut self) -> Option<ModuleActuation> {
        self.pending.take()
    }
}

impl ModuleSink for ActuationBuffer {
    fn set_module_states(&mut self, states: &[ModuleState]) {
        self.pending = Some(ModuleActuation::from(states));
    }

    fn stop(&mut self, held: &[ModuleState]) {
        self.pending = Some(ModuleActuation::from(held));
    }
}

pub struct Runtime {
    command: DriveCommand<CommandLink, HeadingTracker, ActuationBuffer>,
    period: Duration,
    last_tick: Option<Instant>,
    active: bool,
    health: RuntimeHealth,
}

impl Runtime {
    /// `period` is the nominal loop period, used to time the first cycle after a (re)start
    pub fn new(config: DriveConfig, period: Duration) -> Result<Self, DriveError> {
        let command = DriveCommand::new(
            config,
            CommandLink::new(CMD_TIMEOUT),
            HeadingTracker::default(),
            ActuationBuffer::default(),
        )?;

        Ok(Self {
            command,
            period,
            last_tick: None,
            active: false,
            health: RuntimeHealth::CmdStale,
        })
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    fn on_command(&mut self, cmd: AxisCommand, now: Instant) {
        self.command.axes_mut().on_command(cmd, now);
    }

    fn on_heading(&mut self, report: HeadingReport) {
        self.command.heading_mut().on_report(report);
    }

    /// Run one cycle (includes watchdog logic) and return the frame to publish, if any
    fn tick(&mut self, now: Instant) -> Option<ModuleActuation> {
        let previous_tick = self.last_tick.replace(now);

        if self.command.axes_mut().refresh(now) {
            if self.active {
                // Watchdog triggered - stop the robot
                warn!("Axis command stale, stopping modules");
                self.command.end(true);
                self.active = false;
            } else {
                self.command.stop();
            }
            self.health = RuntimeHealth::CmdStale;
        } else {
            if !self.active {
                info!("Axis commands flowing, drive command started");
                // The first cycle ramps from the previous tick, at most one period back
                let floor = now.checked_sub(self.period).unwrap_or(now);
                let start = previous_tick.map_or(floor, |t| t.clamp(floor, now));
                self.command.initialize(start);
                self.active = true;
            }
            match self.command.execute_at(now) {
                Ok(()) => self.health = RuntimeHealth::Ok,
                Err(e) => {
                    if self.health != RuntimeHealth::InvalidInput {
                        warn!("Rejected cycle: {}", e);
                    }
                    self.health = RuntimeHealth::InvalidInput;
                }
            }
        }

        self.command.sink_mut().take()
    }

    /// Final stop frame before the runtime exits
    fn shutdown(&mut self) -> Option<ModuleActuation> {
        self.command.end(self.active);
        self.active = false;
        self.command.sink_mut().take()
    }
}

pub async fn run(
    config: DriveConfig,
    loop_hz: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let period = Duration::from_millis(1000 / loop_hz);
    let mut runtime = Runtime::new(config, period)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_axes = session.declare_subscriber(TOPIC_CMD_AXES).await?;
    let sub_heading = session.declare_subscriber(TOPIC_HEADING).await?;
    let pub_modules = session.declare_publisher(TOPIC_RT_MODULES).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(period);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        loop_hz,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_AXES, TOPIC_HEADING);
    info!("Publishing to: {}, {}", TOPIC_RT_MODULES, TOPIC_HEALTH);

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                info!("Shutdown requested");
                if let Some(actuation) = runtime.shutdown() {
                    pub_modules.put(serde_json::to_string(&actuation)?).await?;
                }
                break;
            }
        }

        // 1. Drain all pending messages (non-blocking), keep latest
        let now = Instant::now();
        while let Ok(Some(sample)) = sub_axes.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<AxisCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd, now),
                Err(e) => warn!("Failed to parse axis command: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_heading.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<HeadingReport>(&payload) {
                Ok(report) => runtime.on_heading(report),
                Err(e) => warn!("Failed to parse heading: {}", e),
            }
        }

        // 2. Run the cycle
        // 3. Publish module states (skipped when the cycle was rejected)
        if let Some(actuation) = runtime.tick(now) {
            pub_modules.put(serde_json::to_string(&actuation)?).await?;
        }

        // 4. Publish health
        pub_health.put(serde_json::to_string(&runtime.health)?).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const DT: Duration = Duration::from_millis(20);

    fn runtime() -> Runtime {
        Runtime::new(DriveConfig::default(), DT).unwrap()
    }

    fn axes(x: f64, y: f64, rotation: f64) -> AxisCommand {
        AxisCommand {
            x,
            y,
            rotation,
            field_relative: false,
        }
    }

    #[test]
    fn test_starts_stale_and_stopped() {
        let mut runtime = runtime();
        let frame = runtime.tick(Instant::now()).unwrap();

        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        assert_eq!(frame.modules.len(), 4);
        assert!(frame.modules.iter().all(|m| m.speed_mps == 0.0));
    }

    #[test]
    fn test_fresh_command_drives() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        runtime.on_command(axes(0.0, 1.0, 0.0), now);

        now += DT;
        let frame = runtime.tick(now).unwrap();
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert!(frame.modules.iter().all(|m| m.speed_mps > 0.0));
    }

    #[test]
    fn test_watchdog_stops_with_angles_held() {
        let mut runtime = runtime();
        let mut now = Instant::now();

        for _ in 0..5 {
            runtime.on_command(axes(0.0, 1.0, 0.0), now);
            now += DT;
            runtime.tick(now);
        }

        now += CMD_TIMEOUT + DT;
        let frame = runtime.tick(now).unwrap();
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        for m in &frame.modules {
            assert_eq!(m.speed_mps, 0.0);
            assert!((m.angle_rad - FRAC_PI_2).abs() < 1e-9);
        }
    }

    #[test]
    fn test_field_relative_follows_heading_reports() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        runtime.on_heading(HeadingReport {
            heading_rad: FRAC_PI_2,
        });

        let cmd = AxisCommand {
            field_relative: true,
            ..axes(1.0, 0.0, 0.0)
        };
        runtime.on_command(cmd, now);
        now += DT;
        let frame = runtime.tick(now).unwrap();

        for m in &frame.modules {
            assert!((m.angle_rad + FRAC_PI_2).abs() < 1e-9, "angle {}", m.angle_rad);
        }
    }

    #[test]
    fn test_shutdown_sends_stop() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        runtime.on_command(axes(1.0, 0.0, 0.0), now);
        now += DT;
        runtime.tick(now);

        let frame = runtime.shutdown().unwrap();
        assert!(frame.modules.iter().all(|m| m.speed_mps == 0.0));
    }

    #[test]
    fn test_first_active_cycle_ramps_over_one_period() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        runtime.tick(now);

        runtime.on_command(axes(1.0, 0.0, 0.0), now);
        now += DT;
        let frame = runtime.tick(now).unwrap();

        // 3 units/s over 20 ms at 4 m/s full stick
        for m in &frame.modules {
            assert!((m.speed_mps - 0.24).abs() < 1e-9, "speed {}", m.speed_mps);
        }
    }

    #[test]
    fn test_invalid_heading_skips_actuation_then_recovers() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        let cmd = AxisCommand {
            field_relative: true,
            ..axes(1.0, 0.0, 0.0)
        };

        runtime.on_heading(HeadingReport {
            heading_rad: f64::NAN,
        });
        runtime.on_command(cmd.clone(), now);
        now += DT;
        assert!(runtime.tick(now).is_none());
        assert_eq!(runtime.health(), RuntimeHealth::InvalidInput);

        // Still rejected while the heading stays bad
        runtime.on_command(cmd.clone(), now);
        now += DT;
        assert!(runtime.tick(now).is_none());
        assert_eq!(runtime.health(), RuntimeHealth::InvalidInput);

        runtime.on_heading(HeadingReport { heading_rad: 0.0 });
        runtime.on_command(cmd, now);
        now += DT;
        let frame = runtime.tick(now).unwrap();
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert!(frame.modules.iter().all(|m| m.speed_mps > 0.0 && m.angle_rad.abs() < 1e-9));
    }

    #[test]
    fn test_invalid_heading_ignored_when_robot_relative() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        runtime.on_heading(HeadingReport {
            heading_rad: f64::INFINITY,
        });
        runtime.on_command(axes(1.0, 0.0, 0.0), now);
        now += DT;
        assert!(runtime.tick(now).is_some());
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
    }

    #[test]
    fn test_resume_after_long_gap_ramps_over_one_period() {
        let mut runtime = runtime();
        let mut now = Instant::now();
        runtime.tick(now);

        now += Duration::from_secs(5);
        runtime.on_command(axes(1.0, 0.0, 0.0), now);
        let frame = runtime.tick(now).unwrap();
        for m in &frame.modules {
            assert!((m.speed_mps - 0.24).abs() < 1e-9, "speed {}", m.speed_mps);
        }
    }
}
