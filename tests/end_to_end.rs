//! End-to-end tests: protocol task and motor task sharing one mount state

use std::sync::Arc;

use esp_mount::{
    axis::{Axis, AxisPair},
    commands::motor_channel,
    config::MountConfig,
    hal::{MockSerial, MockStepper},
    CommTask, Dispatcher, Motor, MotorCommand, MotorCommandSender, MotorMode, MotorTask,
    MountState, TrackPoint,
};

/// Motor task loop period, in microseconds
const TICK_US: i64 = 25;

struct Mount {
    comm: CommTask<MockSerial>,
    motors: MotorTask<MockStepper>,
    now_us: i64,
}

impl Mount {
    fn new() -> Self {
        let config = MountConfig::default();
        let (motors, tx, state) = Self::motor_side();
        Self {
            comm: CommTask::new(
                MockSerial::new(),
                Dispatcher::new(state, tx, config.cpr()),
                &config.comm,
            ),
            motors,
            now_us: 0,
        }
    }

    /// Motor task with its command queue and shared state.
    fn motor_side() -> (MotorTask<MockStepper>, MotorCommandSender, Arc<MountState>) {
        let config = MountConfig::default();
        let state = Arc::new(MountState::new(&config.tasks));
        let (tx, rx) = motor_channel(config.tasks.motor_queue_capacity);
        let motors = config
            .motors()
            .map(|motor| Motor::new(motor, MockStepper::new()).unwrap());
        (MotorTask::new(motors, rx, Arc::clone(&state), &config.tasks), tx, state)
    }

    fn send(&mut self, line: &str) -> String {
        self.comm.transport_mut().queue_line(line);
        self.comm.poll(self.now_us).unwrap();
        self.comm.transport_mut().take_output()
    }

    fn run_for(&mut self, duration_us: i64) {
        let end = self.now_us + duration_us;
        while self.now_us < end {
            self.motors.spin(self.now_us).unwrap();
            self.now_us += TICK_US;
        }
    }
}

#[test]
fn set_position_reaches_motors_and_snapshot() {
    let mut mount = Mount::new();
    assert_eq!(mount.send("+p 100 200"), "+p 100 200\n");
    assert_eq!(mount.send("+gp"), "+gp 100 200\n");

    mount.run_for(1_000);

    assert_eq!(mount.motors.motors()[Axis::Ax1].position(), 100);
    assert_eq!(mount.motors.motors()[Axis::Ax2].position(), 200);
    assert_eq!(mount.send("+gp"), "+gp 100 200\n");
}

#[test]
fn goto_moves_both_axes() {
    let mut mount = Mount::new();
    assert_eq!(mount.send("+g 300 -150"), "+g 300 -150\n");

    mount.run_for(1_000);
    assert_eq!(mount.send("+gs"), "+gs 1\n");

    mount.run_for(5_000_000);
    assert_eq!(mount.send("+gp"), "+gp 300 -150\n");
    assert_eq!(mount.send("+gs"), "+gs 0\n");
}

#[test]
fn tracking_session() {
    let mut mount = Mount::new();
    assert_eq!(mount.send("+t 0"), "+t 0\n");
    assert_eq!(mount.send("+tp 10 20 1000"), "+tp 0\n");
    assert_eq!(mount.send("+gtbf"), "+gtbf 5999\n");
    assert_eq!(mount.send("+tb"), "+tb\n");

    // First slice pulls the point and heads for it
    mount.run_for(1_000);
    assert!(mount.motors.scheduler().is_active());
    let targets = AxisPair::from_fn(|axis| mount.motors.motors()[axis].target_position());
    assert_eq!(targets, AxisPair::new(10, 20));
    assert_eq!(mount.motors.motors()[Axis::Ax1].mode(), MotorMode::Goto);
    assert_eq!(mount.send("+gtbf"), "+gtbf 6000\n");
    assert_eq!(mount.send("+gs"), "+gs 2\n");

    // Past the last point the scheduler runs dry and the mount settles
    mount.run_for(3_000_000);
    assert!(!mount.motors.scheduler().is_active());
    assert_eq!(mount.send("+gp"), "+gp 10 20\n");
    assert_eq!(mount.send("+gs"), "+gs 0\n");
}

#[test]
fn stop_tracking_halts_scheduler() {
    let mut mount = Mount::new();
    assert_eq!(mount.send("+tp 1000 1000 60000"), "+tp 0\n");
    assert_eq!(mount.send("+tp 2000 2000 120000"), "+tp 0\n");
    assert_eq!(mount.send("+tb"), "+tb\n");
    mount.run_for(1_000);
    assert!(mount.motors.scheduler().is_active());

    assert_eq!(mount.send("+ts"), "+ts\n");
    mount.run_for(300_000);

    assert!(!mount.motors.scheduler().is_active());
    // Remaining points stay queued
    assert_eq!(mount.send("+gtbf"), "+gtbf 5999\n");
}

#[test]
fn instant_stop_freezes_position() {
    let mut mount = Mount::new();
    mount.send("+g 100000 100000");
    mount.run_for(1_000_000);

    assert_eq!(mount.send("+s 1"), "+s 1\n");
    mount.run_for(300_000);
    let held = mount.send("+gp");

    mount.run_for(1_000_000);
    assert_eq!(mount.send("+gp"), held);
    assert_eq!(mount.send("+gs"), "+gs 0\n");
}

/// Velocity and path-deviation envelope of one axis.
struct Envelope {
    min_velocity: f32,
    max_velocity: f32,
    max_deviation: f64,
}

impl Envelope {
    fn new() -> Self {
        Self {
            min_velocity: f32::MAX,
            max_velocity: f32::MIN,
            max_deviation: 0.0,
        }
    }

    fn record(&mut self, velocity: f32, deviation: f64) {
        self.min_velocity = self.min_velocity.min(velocity);
        self.max_velocity = self.max_velocity.max(velocity);
        self.max_deviation = self.max_deviation.max(deviation.abs());
    }
}

#[test]
fn constant_rate_track_stays_on_line() {
    // Ax1 at sidereal rate, ax2 fast, one point per second
    const RATES: [i64; 2] = [27, 1000];
    const POINTS: u64 = 30;
    const SETTLE_US: i64 = 2_000_000;
    const END_US: i64 = 25_000_000;

    let (mut task, tx, state) = Mount::motor_side();
    for k in 0..POINTS {
        let point = TrackPoint::new(RATES[0] * k as i64, RATES[1] * k as i64, k * 1000);
        state.push_track_point(point).unwrap();
    }
    tx.send(MotorCommand::TrackBegin);

    let mut never_reversed = true;
    let mut settled = [Envelope::new(), Envelope::new()];

    let mut now = 0;
    while now < END_US {
        task.spin(now).unwrap();
        for (axis, motor) in task.motors().iter() {
            if motor.velocity() < 0.0 {
                never_reversed = false;
            }
            if now >= SETTLE_US {
                let ideal = RATES[axis.index()] as f64 * now as f64 / 1_000_000.0;
                settled[axis.index()].record(motor.velocity(), motor.position() as f64 - ideal);
            }
        }
        now += TICK_US;
    }

    assert!(never_reversed);
    assert!(task.scheduler().is_active());

    let [sidereal, fast] = settled;
    assert!(sidereal.max_deviation <= 3.0, "sidereal deviation {}", sidereal.max_deviation);
    assert!(
        sidereal.min_velocity >= 20.0 && sidereal.max_velocity <= 35.0,
        "sidereal velocity {}..{}",
        sidereal.min_velocity,
        sidereal.max_velocity
    );
    assert!(fast.max_deviation <= 30.0, "fast deviation {}", fast.max_deviation);
    assert!(
        fast.min_velocity >= 850.0 && fast.max_velocity <= 1150.0,
        "fast velocity {}..{}",
        fast.min_velocity,
        fast.max_velocity
    );
}
