//! Integration tests for the motor kinematics engine

use esp_mount::{config::MotorConfig, hal::MockStepper, Motor, MotorMode, StepDirection};

/// Loop period used to drive the engine, in microseconds
const TICK_US: i64 = 25;

fn slow_config() -> MotorConfig {
    MotorConfig::default()
        .with_max_velocity(2000.0)
        .with_max_acceleration(1000.0)
        .with_brake_acceleration(1000.0)
        .with_goto_min_velocity(100.0)
}

fn motor(config: MotorConfig) -> Motor<MockStepper> {
    Motor::new(config, MockStepper::new()).unwrap()
}

/// Runs the engine from `from_us` to `to_us`, calling `check` after every tick.
fn run_until(
    motor: &mut Motor<MockStepper>,
    from_us: i64,
    to_us: i64,
    mut check: impl FnMut(&Motor<MockStepper>),
) {
    let mut now = from_us;
    while now < to_us {
        motor.run(now).unwrap();
        check(motor);
        now += TICK_US;
    }
}

// ============================================================================
// Goto
// ============================================================================

#[test]
fn goto_respects_max_velocity_and_lands_on_target() {
    let mut motor = motor(slow_config());
    motor.goto(5000);

    let mut peak = 0.0f32;
    run_until(&mut motor, 0, 8_000_000, |m| {
        assert!(m.velocity().abs() <= 2000.0 + f32::EPSILON);
        peak = peak.max(m.velocity().abs());
    });

    // Long enough to reach cruise speed
    assert!(peak > 1900.0, "peak velocity {peak}");
    assert_eq!(motor.position(), 5000);
    assert_eq!(motor.mode(), MotorMode::Stopped);
    assert_eq!(motor.velocity(), 0.0);

    // Stays put once stopped
    let steps = motor.pins().steps;
    run_until(&mut motor, 8_000_000, 9_000_000, |_| {});
    assert_eq!(motor.pins().steps, steps);
    assert_eq!(motor.position(), 5000);
}

#[test]
fn goto_backwards() {
    let mut motor = motor(slow_config());
    motor.set_position(1000);
    motor.goto(-500);

    run_until(&mut motor, 0, 6_000_000, |_| {});

    assert_eq!(motor.position(), -500);
    assert_eq!(motor.pins().direction, StepDirection::Backward);
    assert_eq!(motor.mode(), MotorMode::Stopped);
}

#[test]
fn new_goto_mid_flight_reverses() {
    let mut motor = motor(slow_config());
    motor.goto(10_000);
    run_until(&mut motor, 0, 2_000_000, |_| {});
    assert!(motor.velocity() > 0.0);

    motor.goto(0);
    run_until(&mut motor, 2_000_000, 15_000_000, |_| {});

    assert_eq!(motor.position(), 0);
    assert_eq!(motor.mode(), MotorMode::Stopped);
    assert!(motor.pins().direction_changes >= 1);
}

// ============================================================================
// Stop
// ============================================================================

#[test]
fn instant_stop_is_idempotent() {
    let mut motor = motor(slow_config());
    motor.goto(100_000);
    run_until(&mut motor, 0, 1_000_000, |_| {});
    assert!(motor.velocity() > 0.0);

    motor.stop(true);
    let position = motor.position();
    motor.stop(true);

    assert_eq!(motor.mode(), MotorMode::Stopped);
    assert_eq!(motor.velocity(), 0.0);
    assert_eq!(motor.target_position(), position);

    run_until(&mut motor, 1_000_000, 2_000_000, |_| {});
    assert_eq!(motor.position(), position);
}

#[test]
fn soft_stop_decelerates_and_settles() {
    let mut motor = motor(slow_config());
    motor.goto(100_000);
    run_until(&mut motor, 0, 2_000_000, |_| {});

    motor.stop(false);
    assert_ne!(motor.mode(), MotorMode::Stopped);

    run_until(&mut motor, 2_000_000, 10_000_000, |_| {});
    assert_eq!(motor.mode(), MotorMode::Stopped);
    assert_eq!(motor.position(), motor.target_position());
}

#[test]
fn stop_while_stopped_is_noop() {
    let mut motor = motor(MotorConfig::default());
    motor.stop(false);
    run_until(&mut motor, 0, 100_000, |_| {});
    assert_eq!(motor.mode(), MotorMode::Stopped);
    assert_eq!(motor.pins().steps, 0);
}

// ============================================================================
// Tracking
// ============================================================================

#[test]
fn zero_duration_segment_becomes_goto() {
    let mut motor = motor(slow_config());
    motor.track(0, 500, 1_000, 1_000);

    assert_eq!(motor.mode(), MotorMode::Goto);
    assert_eq!(motor.target_position(), 500);

    run_until(&mut motor, 0, 5_000_000, |_| {});
    assert_eq!(motor.position(), 500);
}

#[test]
fn tracking_follows_segment_then_settles_on_target() {
    let mut motor = motor(MotorConfig::default());
    motor.track(0, 1000, 0, 10_000_000);
    assert_eq!(motor.mode(), MotorMode::Tracking);

    let mut worst = 0i64;
    let mut now = 0;
    while now < 9_000_000 {
        motor.run(now).unwrap();
        if let Some(offset) = motor.position_offset(now) {
            worst = worst.max(offset.abs());
        }
        now += TICK_US;
    }
    assert!(worst <= 20, "worst tracking offset {worst}");

    run_until(&mut motor, 9_000_000, 20_000_000, |_| {});
    assert_eq!(motor.position(), 1000);
    assert_eq!(motor.mode(), MotorMode::Stopped);
}

#[test]
fn microsteps_reset_to_finest_when_idle() {
    let mut motor = motor(MotorConfig::default());
    motor.goto(40_000);
    run_until(&mut motor, 0, 3_000_000, |_| {});
    assert!(motor.state().microstep_index > 0);

    motor.stop(true);
    run_until(&mut motor, 3_000_000, 3_100_000, |_| {});

    assert_eq!(motor.state().microstep_index, 0);
    let finest = MotorConfig::default().microsteps[0];
    assert_eq!((motor.pins().cfg1, motor.pins().cfg2), (finest.cfg1, finest.cfg2));
}
