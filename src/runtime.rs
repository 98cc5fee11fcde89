// Host glue: zenoh session, actuator setup, op-mode dispatch, stop handling
//
// The control loops are synchronous busy-poll loops, so they run on one
// blocking thread. The async side only opens the session and turns Ctrl-C
// into a stop request the loops see at their next iteration.

use tracing::{info, warn};
use zenoh::Session;

use crate::config::{DriveConfig, WheelDirections};
use crate::drive::{
    DriveError, MotionIntent, MoveOutcome, MoveSupervisor, TeleopLoop, WheelTest,
};
use crate::hal::{
    Actuator, ActuatorError, DriveMotors, SimulatedMotor, StdClock, StopFlag, Telemetry,
    TracingTelemetry, Wheel, ZenohGamepad, ZenohTelemetry, ZenohWheel, ZeroPowerBehavior,
};

/// What the runtime should do once started
#[derive(Debug, Clone, PartialEq)]
pub enum OpMode {
    /// Gamepad driving until stopped
    Teleop,
    /// Run discrete moves in order, then exit
    Auto { steps: Vec<MotionIntent> },
    /// Drive a single wheel from the left stick
    WheelTest { wheel: Wheel },
}

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub op_mode: OpMode,
    pub config: DriveConfig,
    /// Use in-process simulated motors instead of the zenoh wheel bridge
    pub sim: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Zenoh error: {0}")]
    Zenoh(String),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error("Control thread failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type BoxedActuator = Box<dyn Actuator>;
type BoxedTelemetry = Box<dyn Telemetry>;

pub async fn run(options: RuntimeOptions) -> Result<(), RuntimeError> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default())
        .await
        .map_err(|e| RuntimeError::Zenoh(e.to_string()))?;

    let stop = StopFlag::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Stop requested");
                stop.request_stop();
            }
        });
    }

    info!(
        "Runtime started: {:?}, {}Hz loop, {} motors",
        options.op_mode,
        options.config.loop_hz,
        if options.sim { "simulated" } else { "bridged" }
    );

    tokio::task::spawn_blocking(move || run_op_mode(&session, options, stop)).await??;

    info!("Runtime finished");
    Ok(())
}

fn build_wheel(
    session: &Session,
    wheel: Wheel,
    sim: bool,
) -> Result<BoxedActuator, ActuatorError> {
    if sim {
        Ok(Box::new(SimulatedMotor::new()))
    } else {
        Ok(Box::new(ZenohWheel::declare(session, wheel)?))
    }
}

/// Simulated runs keep telemetry in the log, bridged runs publish it for the operator
fn build_telemetry(session: &Session, sim: bool) -> Result<BoxedTelemetry, ActuatorError> {
    if sim {
        Ok(Box::new(TracingTelemetry::new()))
    } else {
        Ok(Box::new(ZenohTelemetry::declare(session)?))
    }
}

fn build_motors(
    session: &Session,
    sim: bool,
) -> Result<DriveMotors<BoxedActuator>, ActuatorError> {
    let [front_left, front_right, back_left, back_right] =
        Wheel::ALL.map(|wheel| build_wheel(session, wheel, sim));
    Ok(DriveMotors::new(
        front_left?,
        front_right?,
        back_left?,
        back_right?,
    ))
}

/// Runs on the control thread until the op-mode finishes or a stop is requested
fn run_op_mode(
    session: &Session,
    options: RuntimeOptions,
    stop: StopFlag,
) -> Result<(), RuntimeError> {
    let config = &options.config;
    let period = config.loop_period();
    let mut telemetry = build_telemetry(session, options.sim)?;

    match &options.op_mode {
        OpMode::Teleop => {
            let mut motors = build_motors(session, options.sim)?;
            motors.configure(WheelDirections::teleop().0, ZeroPowerBehavior::Brake)?;
            let input = ZenohGamepad::declare(session, config.gamepad_timeout())?;

            telemetry.add_data("Status", &"Initialized");
            telemetry.update();

            TeleopLoop::new(motors, input, StdClock::new(), stop, telemetry)
                .with_period(period)
                .run()?;
        }
        OpMode::Auto { steps } => {
            let mut motors = build_motors(session, options.sim)?;
            motors.configure(WheelDirections::autonomous().0, ZeroPowerBehavior::Brake)?;

            let mut supervisor =
                MoveSupervisor::new(motors, StdClock::new(), stop, telemetry, config)
                    .with_poll_period(period);
            supervisor.telemetry_mut().add_data("Status", &"Ready");
            supervisor.telemetry_mut().update();

            let outcomes = supervisor.run_sequence(steps)?;
            let completed = outcomes
                .iter()
                .filter(|o| **o == MoveOutcome::Completed)
                .count();
            if completed < steps.len() {
                warn!("{} of {} moves completed", completed, steps.len());
            } else {
                info!("All {} moves completed", steps.len());
            }

            supervisor.telemetry_mut().add_data("Status", &"Done");
            supervisor.telemetry_mut().update();
        }
        OpMode::WheelTest { wheel } => {
            let mut motor = build_wheel(session, *wheel, options.sim)?;
            motor.set_direction(WheelDirections::teleop().get(*wheel))?;

            telemetry.add_data("Status", &"Initialized");
            telemetry.update();

            let input = ZenohGamepad::declare(session, config.gamepad_timeout())?;
            WheelTest::new(*wheel, motor, input, StdClock::new(), stop, telemetry)
                .with_period(period)
                .run()?;
        }
    }
    Ok(())
}
