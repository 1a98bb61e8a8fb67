//! Integration tests for the serial protocol: parsing, dispatch and replies

use std::sync::Arc;

use esp_mount::{
    commands::{motor_channel, MotorCommandReceiver},
    config::{CommConfig, MountConfig},
    hal::{MockClock, MockSerial},
    parsing::read_message,
    CommTask, Dispatcher, MotorCommand, MountMsg, MountState,
};

fn comm() -> (CommTask<MockSerial>, MotorCommandReceiver) {
    let config = MountConfig::default();
    let state = Arc::new(MountState::new(&config.tasks));
    let (tx, rx) = motor_channel(config.tasks.motor_queue_capacity);
    let dispatcher = Dispatcher::new(state, tx, config.cpr());
    (CommTask::new(MockSerial::new(), dispatcher, &CommConfig::default()), rx)
}

/// Sends one line and returns the reply.
fn exchange(task: &mut CommTask<MockSerial>, line: &str, now_us: i64) -> String {
    task.transport_mut().queue_line(line);
    task.poll(now_us).unwrap();
    task.transport_mut().take_output()
}

// ============================================================================
// Replies
// ============================================================================

#[test]
fn set_position_round_trip() {
    let (mut task, rx) = comm();
    assert_eq!(exchange(&mut task, "+p 5 -7", 0), "+p 5 -7\n");
    assert_eq!(exchange(&mut task, "+gp", 0), "+gp 5 -7\n");
    assert_eq!(rx.try_recv(), Some(MotorCommand::PositionUpdate(5, -7)));
}

#[test]
fn time_sync_then_query() {
    let (mut task, _rx) = comm();
    assert_eq!(exchange(&mut task, "+t 5000", 2_000_000), "+t 5000\n");
    assert_eq!(exchange(&mut task, "+gt", 3_000_000), "+gt 6000\n");
}

#[test]
fn goto_echoes_optional_time() {
    let (mut task, rx) = comm();
    assert_eq!(exchange(&mut task, "+g 100 -200", 0), "+g 100 -200\n");
    assert_eq!(exchange(&mut task, "+g 1 2 3000", 0), "+g 1 2 3000\n");
    assert_eq!(rx.try_recv(), Some(MotorCommand::Goto(100, -200)));
    assert_eq!(rx.try_recv(), Some(MotorCommand::Goto(1, 2)));
}

#[test]
fn stop_echoes_flag() {
    let (mut task, rx) = comm();
    assert_eq!(exchange(&mut task, "+s 1", 0), "+s 1\n");
    assert_eq!(exchange(&mut task, "+s 0", 0), "+s 0\n");
    assert_eq!(rx.try_recv(), Some(MotorCommand::Stop { instant: true }));
    assert_eq!(rx.try_recv(), Some(MotorCommand::Stop { instant: false }));
}

#[test]
fn static_queries() {
    let (mut task, _rx) = comm();
    assert_eq!(exchange(&mut task, "+gc", 0), "+gc 2304000 2304000\n");
    assert_eq!(exchange(&mut task, "+gpv", 0), "+gpv 1\n");
    assert_eq!(exchange(&mut task, "+gs", 0), "+gs 0\n");
    assert_eq!(exchange(&mut task, "+gtbs", 0), "+gtbs 6000\n");
    assert_eq!(exchange(&mut task, "+gtbf", 0), "+gtbf 6000\n");
}

#[test]
fn track_buffer_commands() {
    let (mut task, _rx) = comm();
    assert_eq!(exchange(&mut task, "+tp 10 20 1000", 0), "+tp 0\n");
    assert_eq!(exchange(&mut task, "+tp 11 21 2000", 0), "+tp 0\n");
    assert_eq!(exchange(&mut task, "+gtbf", 0), "+gtbf 5998\n");
    assert_eq!(exchange(&mut task, "+tbc", 0), "+tbc\n");
    assert_eq!(exchange(&mut task, "+gtbf", 0), "+gtbf 6000\n");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn bad_argument_is_invalid_parameter() {
    let (mut task, rx) = comm();
    assert_eq!(
        exchange(&mut task, "+g abc 5", 0),
        "! 2 Invalid parameter received\n"
    );
    assert_eq!(rx.try_recv(), None);
}

#[test]
fn missing_argument_is_invalid_parameter() {
    let (mut task, _rx) = comm();
    assert_eq!(exchange(&mut task, "+p 5", 0), "! 2 Invalid parameter received\n");
}

#[test]
fn unknown_command() {
    let (mut task, _rx) = comm();
    assert_eq!(exchange(&mut task, "+xyz", 0), "! 3 Unknown command received\n");
}

#[test]
fn missing_sentinel_flushes_input() {
    let (mut task, _rx) = comm();
    task.transport_mut().queue_line("gp");
    task.transport_mut().queue_line("+gp");

    task.poll(0).unwrap();

    assert_eq!(task.transport_mut().take_output(), "! 2 Invalid command received\n");
    assert_eq!(task.transport().rx_len(), 0);
    assert_eq!(task.transport().flushes, 1);
}

#[test]
fn error_does_not_swallow_next_line() {
    let (mut task, _rx) = comm();
    task.transport_mut().queue_line("+g 1 x 3");
    task.transport_mut().queue_line("+gpv");

    let replies = task.poll_all(&MockClock::new()).unwrap();

    assert_eq!(replies, 2);
    assert_eq!(
        task.transport_mut().take_output(),
        "! 2 Invalid parameter received\n+gpv 1\n"
    );
}

#[test]
fn blank_lines_are_ignored() {
    let (mut task, _rx) = comm();
    task.transport_mut().queue_bytes(b"\r\n\n");
    let replies = task.poll_all(&MockClock::new()).unwrap();
    assert_eq!(replies, 0);
    assert!(task.transport_mut().take_output().is_empty());
}

// ============================================================================
// Parser
// ============================================================================

#[test]
fn crlf_terminated_lines_parse() {
    let mut serial = MockSerial::new();
    serial.queue_bytes(b"+tp -3 4 99\r\n");
    let msg = read_message(&mut serial, 10);
    assert!(matches!(msg, Some(MountMsg::AddTrackPoint(p)) if p.ax1 == -3 && p.ax2 == 4 && p.timestamp_ms == 99));
    assert_eq!(serial.rx_len(), 0);
}

#[test]
fn extra_spaces_between_arguments() {
    let (mut task, _rx) = comm();
    assert_eq!(exchange(&mut task, "+p  5   -7", 0), "+p 5 -7\n");
}
