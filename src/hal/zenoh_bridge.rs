// Zenoh bridge: wheel actuators, gamepad input and telemetry over pub/sub
//
// The control thread is synchronous, so every zenoh call here resolves with
// `Wait` instead of `.await`.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use zenoh::Session;
use zenoh::Wait;
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::{Publisher, Subscriber};
use zenoh::sample::Sample;

use super::{
    Actuator, ActuatorError, ControllerInput, Direction, RunMode, Telemetry, Wheel,
    ZeroPowerBehavior,
};
use crate::config::{
    TOPIC_CMD_GAMEPAD, TOPIC_HEALTH, TOPIC_TELEMETRY, wheel_command_topic, wheel_feedback_topic,
};
use crate::messages::{GamepadState, RuntimeHealth, WheelCommand, WheelFeedback, WheelOp};

type SampleSubscriber = Subscriber<FifoChannelHandler<Sample>>;

fn transport(e: impl fmt::Display) -> ActuatorError {
    ActuatorError::Transport(e.to_string())
}

/// Matches wheel feedback against the commands sent so far.
///
/// Feedback is only trusted for arrival once it acknowledges the last command
/// sent, so a sample taken before the wheel switched to position tracking (or
/// before its power was applied) can never read as "arrived".
#[derive(Debug, Clone, Default)]
struct FeedbackTracker {
    latest: WheelFeedback,
    sent_seq: u64,
    reset_seq: u64,
}

impl FeedbackTracker {
    fn on_sent(&mut self, seq: u64, op: &WheelOp) {
        self.sent_seq = seq;
        if let WheelOp::RunMode {
            mode: RunMode::ResetPosition,
        } = op
        {
            self.reset_seq = seq;
        }
    }

    /// Keep the newest sample, out-of-order stragglers are dropped
    fn on_feedback(&mut self, feedback: WheelFeedback) {
        if feedback.ack >= self.latest.ack {
            self.latest = feedback;
        }
    }

    fn position(&self) -> i32 {
        if self.latest.ack < self.reset_seq {
            // Reset not yet reflected in feedback
            0
        } else {
            self.latest.position
        }
    }

    fn settled(&self) -> bool {
        self.latest.ack >= self.sent_seq && !self.latest.busy
    }
}

/// One wheel driven by a remote hardware process.
///
/// Commands go out on `mecanum/rt/wheel/<wheel>`, feedback comes back on
/// `mecanum/state/wheel/<wheel>`.
pub struct ZenohWheel {
    wheel: Wheel,
    publisher: Publisher<'static>,
    feedback: SampleSubscriber,
    tracker: FeedbackTracker,
    mode: RunMode,
    next_seq: u64,
}

impl ZenohWheel {
    pub fn declare(session: &Session, wheel: Wheel) -> Result<Self, ActuatorError> {
        let publisher = session
            .declare_publisher(wheel_command_topic(wheel))
            .wait()
            .map_err(transport)?;
        let feedback = session
            .declare_subscriber(wheel_feedback_topic(wheel))
            .wait()
            .map_err(transport)?;
        debug!("Declared wheel bridge for {}", wheel);

        Ok(Self {
            wheel,
            publisher,
            feedback,
            tracker: FeedbackTracker::default(),
            mode: RunMode::Direct,
            next_seq: 1,
        })
    }

    fn send(&mut self, op: WheelOp) -> Result<(), ActuatorError> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let json = serde_json::to_string(&WheelCommand { seq, op })?;
        self.publisher
            .put(json)
            .wait()
            .map_err(|e| ActuatorError::Link {
                wheel: self.wheel,
                reason: e.to_string(),
            })?;
        self.tracker.on_sent(seq, &op);
        Ok(())
    }

    /// Drain pending feedback (non-blocking), keep latest
    fn drain_feedback(&mut self) {
        while let Ok(Some(sample)) = self.feedback.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<WheelFeedback>(&payload) {
                Ok(feedback) => self.tracker.on_feedback(feedback),
                Err(e) => warn!("Failed to parse feedback for {}: {}", self.wheel, e),
            }
        }
    }
}

impl Actuator for ZenohWheel {
    fn set_run_mode(&mut self, mode: RunMode) -> Result<(), ActuatorError> {
        self.send(WheelOp::RunMode { mode })?;
        self.mode = mode;
        Ok(())
    }

    fn set_target_position(&mut self, ticks: i32) -> Result<(), ActuatorError> {
        self.send(WheelOp::Target { ticks })
    }

    fn set_power(&mut self, power: f64) -> Result<(), ActuatorError> {
        self.send(WheelOp::Power { power })
    }

    fn current_position(&mut self) -> Result<i32, ActuatorError> {
        self.drain_feedback();
        Ok(self.tracker.position())
    }

    fn is_arrived(&mut self) -> Result<bool, ActuatorError> {
        self.drain_feedback();
        if self.mode != RunMode::PositionTracking {
            return Ok(true);
        }
        Ok(self.tracker.settled())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        self.send(WheelOp::Direction { direction })
    }

    fn set_zero_power_behavior(
        &mut self,
        behavior: ZeroPowerBehavior,
    ) -> Result<(), ActuatorError> {
        self.send(WheelOp::ZeroPower { behavior })
    }
}

/// Holds the latest gamepad state and releases the sticks once it goes stale.
///
/// If no message arrives within the timeout (teleop crashed, link dropped)
/// the sticks read as neutral so the robot stops instead of holding the last command.
#[derive(Debug, Clone)]
pub struct GamepadWatchdog {
    latest: Option<GamepadState>,
    received_at: Instant,
    timeout: Duration,
    health: RuntimeHealth,
}

impl GamepadWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            latest: None,
            received_at: Instant::now(),
            timeout,
            health: RuntimeHealth::CmdStale, // Start stale until first input
        }
    }

    pub fn on_input(&mut self, state: GamepadState, now: Instant) {
        debug!("Received gamepad: {:?}", state);
        self.latest = Some(state.clamped());
        self.received_at = now;
    }

    /// Sticks to act on at `now`
    pub fn current(&mut self, now: Instant) -> GamepadState {
        let age = now.saturating_duration_since(self.received_at);
        match self.latest {
            Some(state) if age <= self.timeout => {
                self.health = RuntimeHealth::Ok;
                state
            }
            _ => {
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Gamepad input stale ({:?} old), releasing sticks", age);
                }
                self.health = RuntimeHealth::CmdStale;
                GamepadState::neutral()
            }
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }
}

/// Gamepad state received over zenoh on `mecanum/cmd/gamepad`.
/// Health is published on every read.
pub struct ZenohGamepad {
    subscriber: SampleSubscriber,
    pub_health: Publisher<'static>,
    watchdog: GamepadWatchdog,
}

impl ZenohGamepad {
    pub fn declare(session: &Session, timeout: Duration) -> Result<Self, ActuatorError> {
        let subscriber = session
            .declare_subscriber(TOPIC_CMD_GAMEPAD)
            .wait()
            .map_err(transport)?;
        let pub_health = session
            .declare_publisher(TOPIC_HEALTH)
            .wait()
            .map_err(transport)?;

        Ok(Self {
            subscriber,
            pub_health,
            watchdog: GamepadWatchdog::new(timeout),
        })
    }

    fn publish_health(&self) {
        let result = serde_json::to_string(&self.watchdog.health())
            .map_err(transport)
            .and_then(|json| self.pub_health.put(json).wait().map_err(transport));
        if let Err(e) = result {
            warn!("Failed to publish health: {}", e);
        }
    }
}

impl ControllerInput for ZenohGamepad {
    fn read(&mut self) -> GamepadState {
        // Drain all pending input (non-blocking), keep latest
        while let Ok(Some(sample)) = self.subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<GamepadState>(&payload) {
                Ok(state) => self.watchdog.on_input(state, Instant::now()),
                Err(e) => warn!("Failed to parse gamepad state: {}", e),
            }
        }

        let state = self.watchdog.current(Instant::now());
        self.publish_health();
        state
    }
}

/// Telemetry published as one JSON object per update
pub struct ZenohTelemetry {
    publisher: Publisher<'static>,
    pending: BTreeMap<String, String>,
}

impl ZenohTelemetry {
    pub fn declare(session: &Session) -> Result<Self, ActuatorError> {
        let publisher = session
            .declare_publisher(TOPIC_TELEMETRY)
            .wait()
            .map_err(transport)?;
        Ok(Self {
            publisher,
            pending: BTreeMap::new(),
        })
    }
}

impl Telemetry for ZenohTelemetry {
    fn add_data(&mut self, key: &str, value: &dyn fmt::Display) {
        self.pending.insert(key.to_string(), value.to_string());
    }

    fn update(&mut self) {
        let fields = std::mem::take(&mut self.pending);
        debug!(target: "telemetry", "{:?}", fields);
        let result = serde_json::to_string(&fields)
            .map_err(transport)
            .and_then(|json| self.publisher.put(json).wait().map_err(transport));
        if let Err(e) = result {
            warn!("Failed to publish telemetry: {}", e);
        }
    }
}
