//! Motor task: the step loop and its periodic slice.
//!
//! The task exclusively owns both [`Motor`]s and the
//! [`TrackingScheduler`]. It spins without sleeping, calling
//! [`Motor::run`] on both axes, because step timing accuracy depends on
//! how tightly it polls. Every `motor_update_period_us` it also runs a
//! slower slice that:
//!
//! 1. Drains the motor command queue
//! 2. Advances the tracking scheduler
//! 3. Publishes positions and status to [`MountState`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use esp_mount::axis::{Axis, AxisPair};
//! use esp_mount::commands::{motor_channel, MotorCommand};
//! use esp_mount::config::{MotorConfig, TaskConfig};
//! use esp_mount::hal::MockStepper;
//! use esp_mount::motor::Motor;
//! use esp_mount::services::{MotorTask, MountState};
//!
//! let tasks = TaskConfig::default();
//! let state = Arc::new(MountState::new(&tasks));
//! let (tx, rx) = motor_channel(tasks.motor_queue_capacity);
//! let motors = AxisPair::from_fn(|_| Motor::new(MotorConfig::default(), MockStepper::new()).unwrap());
//! let mut task = MotorTask::new(motors, rx, Arc::clone(&state), &tasks);
//!
//! tx.send(MotorCommand::PositionUpdate(5, 6));
//! task.spin(0).unwrap();
//!
//! assert_eq!(task.motors()[Axis::Ax2].position(), 6);
//! assert_eq!(state.position().unwrap(), AxisPair::new(5, 6));
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use crate::axis::{Axis, AxisPair};
use crate::commands::{MotorCommand, MotorCommandReceiver};
use crate::config::TaskConfig;
use crate::motor::Motor;
use crate::tracking::TrackingScheduler;
use crate::traits::{Clock, StepperPins};

use super::shared::{MountState, MountStatus};

/// Owner of both motors and the tracking scheduler.
pub struct MotorTask<P: StepperPins> {
    motors: AxisPair<Motor<P>>,
    scheduler: TrackingScheduler,
    commands: MotorCommandReceiver,
    state: Arc<MountState>,
    update_period_us: i64,
    last_periodic_us: Option<i64>,
}

impl<P: StepperPins> MotorTask<P> {
    /// Creates the task. The first [`spin`](Self::spin) runs the periodic
    /// slice immediately.
    pub fn new(
        motors: AxisPair<Motor<P>>,
        commands: MotorCommandReceiver,
        state: Arc<MountState>,
        config: &TaskConfig,
    ) -> Self {
        Self {
            motors,
            scheduler: TrackingScheduler::new(),
            commands,
            state,
            update_period_us: config.motor_update_period_us,
            last_periodic_us: None,
        }
    }

    /// Both motors.
    pub fn motors(&self) -> &AxisPair<Motor<P>> {
        &self.motors
    }

    /// The tracking scheduler.
    pub fn scheduler(&self) -> &TrackingScheduler {
        &self.scheduler
    }

    /// One loop iteration: run both axes, then the periodic slice if due.
    pub fn spin(&mut self, now_us: i64) -> Result<(), P::Error> {
        for (_, motor) in self.motors.iter_mut() {
            motor.run(now_us)?;
        }
        let due = self
            .last_periodic_us
            .map_or(true, |last| now_us.saturating_sub(last) >= self.update_period_us);
        if due {
            self.periodic(now_us);
        }
        Ok(())
    }

    /// Command drain, tracking refresh and snapshot.
    pub fn periodic(&mut self, now_us: i64) {
        self.last_periodic_us = Some(now_us);

        while let Some(cmd) = self.commands.try_recv() {
            self.apply(cmd);
        }

        if let Err(err) = self.scheduler.update(now_us, &mut self.motors, &self.state) {
            warn!("tracking update skipped: {err}");
        }

        let position = AxisPair::from_fn(|axis| self.motors[axis].position());
        let modes = AxisPair::from_fn(|axis| self.motors[axis].mode());
        let status = MountStatus::from_modes(modes, self.scheduler.is_active());
        if let Err(err) = self.state.publish_motion(position, status) {
            warn!("position snapshot skipped: {err}");
        }

        for (axis, motor) in self.motors.iter() {
            if let Some(offset) = motor.position_offset(now_us) {
                debug!("{} tracking offset {offset} steps", axis.as_str());
            }
        }
        debug!("status {status:?}, position ({}, {})", position[Axis::Ax1], position[Axis::Ax2]);
    }

    fn apply(&mut self, cmd: MotorCommand) {
        match cmd {
            MotorCommand::PositionUpdate(ax1, ax2) => {
                self.motors[Axis::Ax1].set_position(ax1);
                self.motors[Axis::Ax2].set_position(ax2);
            }
            MotorCommand::Goto(ax1, ax2) => {
                self.scheduler.cancel();
                self.motors[Axis::Ax1].goto(ax1);
                self.motors[Axis::Ax2].goto(ax2);
            }
            MotorCommand::Stop { instant } => {
                self.scheduler.cancel();
                for (_, motor) in self.motors.iter_mut() {
                    motor.stop(instant);
                }
            }
            MotorCommand::TrackBegin => {
                if let Err(err) = self.scheduler.begin(&mut self.motors, &self.state) {
                    warn!("tracking not started: {err}");
                }
            }
            MotorCommand::TrackStop => {
                self.scheduler.cancel();
                for (_, motor) in self.motors.iter_mut() {
                    motor.stop(false);
                }
                info!("motors holding after tracking stop");
            }
        }
    }

    /// Runs the task forever.
    pub fn run<C: Clock>(&mut self, clock: &C) -> ! {
        info!("motor task running");
        loop {
            if let Err(err) = self.spin(clock.now_us()) {
                warn!("step output failed: {err:?}");
            }
        }
    }
}
