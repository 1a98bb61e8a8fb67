//! ESP32 telescope mount controller.
//!
//! This is the main entry point for the mount hardware. It starts two
//! tasks sharing one [`MountState`]:
//!
//! - **Motor task** (core 1, high priority): busy loop stepping both axes,
//!   with a 200ms slice that drains commands and advances tracking
//! - **Protocol task** (core 0): polls UART2 every 10ms, parses commands
//!   and writes replies
//!
//! The motor task never yields, so the idle-task watchdog must be disabled
//! on core 1 (`CONFIG_ESP_TASK_WDT_CHECK_IDLE_TASK_CPU1=n`).
//!
//! # Build
//!
//! ```bash
//! cargo build --release --features esp32 --bin esp32_main
//! espflash flash --monitor target/xtensa-esp32-espidf/release/esp32_main
//! ```

use std::sync::Arc;
use std::thread;

use esp_idf_hal::cpu::Core;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::task::thread::ThreadSpawnConfiguration;
use esp_mount::axis::AxisPair;
use esp_mount::commands::motor_channel;
use esp_mount::config::MountConfig;
use esp_mount::hal::esp32::{esp32_stepper, Esp32Clock, Esp32Uart};
use esp_mount::motor::Motor;
use esp_mount::services::{CommTask, Dispatcher, MotorTask, MountState};
use log::info;

/// Motor task stack in bytes
const MOTOR_STACK_SIZE: usize = 8192;

/// Motor task FreeRTOS priority
const MOTOR_PRIORITY: u8 = 12;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("esp-mount starting");

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = MountConfig::default();
    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Initialize Steppers
    // =========================================================================
    let ax1 = esp32_stepper(
        peripherals.pins.gpio25.into(),
        peripherals.pins.gpio26.into(),
        peripherals.pins.gpio18.into(),
        peripherals.pins.gpio27.into(),
    )?;
    let ax2 = esp32_stepper(
        peripherals.pins.gpio19.into(),
        peripherals.pins.gpio21.into(),
        peripherals.pins.gpio22.into(),
        peripherals.pins.gpio23.into(),
    )?;
    let motors = AxisPair::new(
        Motor::new(config.axis1.motor.clone(), ax1)
            .map_err(|e| anyhow::anyhow!("ax1 init failed: {:?}", e))?,
        Motor::new(config.axis2.motor.clone(), ax2)
            .map_err(|e| anyhow::anyhow!("ax2 init failed: {:?}", e))?,
    );
    info!("steppers ready (ax1 GPIO25/26/18/27, ax2 GPIO19/21/22/23)");

    // =========================================================================
    // Initialize UART (UART2 on GPIO12/13)
    // =========================================================================
    let uart = Esp32Uart::new(
        peripherals.uart2,
        peripherals.pins.gpio12,
        peripherals.pins.gpio13,
        &config.comm,
    )?;
    info!("uart ready at {} baud", config.comm.baud_rate);

    // =========================================================================
    // Shared State and Tasks
    // =========================================================================
    let state = Arc::new(MountState::new(&config.tasks));
    let (tx, rx) = motor_channel(config.tasks.motor_queue_capacity);

    let mut motor_task = MotorTask::new(motors, rx, Arc::clone(&state), &config.tasks);
    let dispatcher = Dispatcher::new(state, tx, config.cpr());
    let mut comm_task = CommTask::new(uart, dispatcher, &config.comm);

    ThreadSpawnConfiguration {
        name: Some(&b"motorTask\0"[..]),
        stack_size: MOTOR_STACK_SIZE,
        priority: MOTOR_PRIORITY,
        pin_to_core: Some(Core::Core1),
        ..Default::default()
    }
    .set()?;
    thread::Builder::new()
        .stack_size(MOTOR_STACK_SIZE)
        .spawn(move || {
            motor_task.run(&Esp32Clock::new());
        })?;
    ThreadSpawnConfiguration::default().set()?;

    // Protocol task runs on the main thread
    comm_task.run(&Esp32Clock::new())
}
