// Simulated wheel hardware for the zenoh bridge
//
// Answers the runtime's per-wheel commands with encoder feedback from four
// simulated motors, so teleop and auto can be tried end to end without a robot.
//
// Usage: cargo run --example wheel_sim_bridge
//   then: cargo run -- auto --step drive:10 --step turn:90
use mecanum_drive_runtime::config::{DriveConfig, wheel_command_topic, wheel_feedback_topic};
use mecanum_drive_runtime::hal::{Actuator, ActuatorError, RunMode, SimulatedMotor, Wheel};
use mecanum_drive_runtime::messages::{WheelCommand, WheelFeedback, WheelOp};
use tokio::time::interval;
use tracing::{debug, info, warn};
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::{Publisher, Subscriber};
use zenoh::sample::Sample;

struct SimWheel {
    wheel: Wheel,
    motor: SimulatedMotor,
    commands: Subscriber<FifoChannelHandler<Sample>>,
    feedback: Publisher<'static>,
    ack: u64,
}

impl SimWheel {
    fn apply(&mut self, op: WheelOp) -> Result<(), ActuatorError> {
        match op {
            WheelOp::RunMode { mode } => self.motor.set_run_mode(mode),
            WheelOp::Target { ticks } => self.motor.set_target_position(ticks),
            WheelOp::Power { power } => self.motor.set_power(power),
            WheelOp::Direction { direction } => self.motor.set_direction(direction),
            WheelOp::ZeroPower { behavior } => self.motor.set_zero_power_behavior(behavior),
        }
    }

    /// Drain pending commands, advance one period, return feedback
    fn tick(&mut self) -> Result<WheelFeedback, ActuatorError> {
        while let Ok(Some(sample)) = self.commands.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<WheelCommand>(&payload) {
                Ok(cmd) => {
                    debug!("{}: {:?}", self.wheel, cmd);
                    self.apply(cmd.op)?;
                    self.ack = self.ack.max(cmd.seq);
                }
                Err(e) => warn!("Failed to parse command for {}: {}", self.wheel, e),
            }
        }

        let busy = if self.motor.mode() == RunMode::PositionTracking {
            !self.motor.is_arrived()?
        } else {
            self.motor.step();
            false
        };
        Ok(WheelFeedback {
            ack: self.ack,
            position: self.motor.current_position()?,
            busy,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let mut wheels = Vec::with_capacity(Wheel::ALL.len());
    for wheel in Wheel::ALL {
        let commands = session.declare_subscriber(wheel_command_topic(wheel)).await?;
        let feedback = session.declare_publisher(wheel_feedback_topic(wheel)).await?;
        info!("Simulating {}", wheel);
        wheels.push(SimWheel {
            wheel,
            motor: SimulatedMotor::new(),
            commands,
            feedback,
            ack: 0,
        });
    }

    let mut tick = interval(DriveConfig::default().loop_period());
    loop {
        tick.tick().await;
        for sim in &mut wheels {
            let feedback = sim.tick()?;
            sim.feedback.put(serde_json::to_string(&feedback)?).await?;
        }
    }
}
