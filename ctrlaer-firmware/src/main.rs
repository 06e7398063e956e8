//! ctrlaer - Multiplexed PIO pulse sequencer firmware
//!
//! Boots an RP2040, starts one pulse engine on the PIO state machine and
//! pin block named in `ctrlaer.toml`, and streams `<command>,<duration>`
//! records from UART0 into it.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{PIO0, PIO1, UART0};
use embassy_rp::pio::{Common, Instance, Pio, StateMachine};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ctrlaer_core::ConfigError;
use ctrlaer_hal::TxFifo;
use ctrlaer_hal_rp2040::{OutputPins, PulseEngine};

use crate::config::{parse_config, FirmwareConfig};

mod config;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit ctrlaer.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../ctrlaer.toml");

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO0>;
    PIO1_IRQ_0 => embassy_rp::pio::InterruptHandler<PIO1>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

// One cell per state machine; only the configured one is initialized
static ENGINE_0: StaticCell<PulseEngine<'static, PIO0, 0>> = StaticCell::new();
static ENGINE_1: StaticCell<PulseEngine<'static, PIO0, 1>> = StaticCell::new();
static ENGINE_2: StaticCell<PulseEngine<'static, PIO0, 2>> = StaticCell::new();
static ENGINE_3: StaticCell<PulseEngine<'static, PIO0, 3>> = StaticCell::new();
static ENGINE_4: StaticCell<PulseEngine<'static, PIO1, 0>> = StaticCell::new();
static ENGINE_5: StaticCell<PulseEngine<'static, PIO1, 1>> = StaticCell::new();
static ENGINE_6: StaticCell<PulseEngine<'static, PIO1, 2>> = StaticCell::new();
static ENGINE_7: StaticCell<PulseEngine<'static, PIO1, 3>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ctrlaer firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    let (mut pins, p) = OutputPins::from_peripherals(p);

    // Command link on UART0 (GPIO0 TX, GPIO1 RX)
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config.baud_rate;

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.uart0, p.uart_tx, p.uart_rx, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized at {} baud", config.baud_rate);

    let Pio {
        common: mut common0,
        sm0: sm0_0,
        sm1: sm0_1,
        sm2: sm0_2,
        sm3: sm0_3,
        ..
    } = Pio::new(p.pio0, Irqs);
    let Pio {
        common: mut common1,
        sm0: sm1_0,
        sm1: sm1_1,
        sm2: sm1_2,
        sm3: sm1_3,
        ..
    } = Pio::new(p.pio1, Irqs);

    let started = match config.engine.state_machine {
        0 => start_engine(&ENGINE_0, &mut common0, sm0_0, &mut pins, &config),
        1 => start_engine(&ENGINE_1, &mut common0, sm0_1, &mut pins, &config),
        2 => start_engine(&ENGINE_2, &mut common0, sm0_2, &mut pins, &config),
        3 => start_engine(&ENGINE_3, &mut common0, sm0_3, &mut pins, &config),
        4 => start_engine(&ENGINE_4, &mut common1, sm1_0, &mut pins, &config),
        5 => start_engine(&ENGINE_5, &mut common1, sm1_1, &mut pins, &config),
        6 => start_engine(&ENGINE_6, &mut common1, sm1_2, &mut pins, &config),
        7 => start_engine(&ENGINE_7, &mut common1, sm1_3, &mut pins, &config),
        sm => Err(ConfigError::InvalidStateMachine(sm)),
    };

    match started {
        Ok(engine) => {
            info!("PIO engine initialized");
            spawner
                .spawn(tasks::listen_task(
                    engine,
                    rx,
                    tx,
                    config.run,
                    config.engine,
                ))
                .unwrap();
            info!("All tasks spawned, firmware running");
        }
        Err(e) => error!("Engine setup failed: {:?}", e),
    }

    // The PIO blocks' shared state lives here, so this task never returns
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded configuration, falling back to defaults
fn load_config() -> FirmwareConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Configuration loaded: {:?}", config);
            config
        }
        Err(e) => {
            error!("Config parse error: {:?}, using defaults", e);
            FirmwareConfig::default()
        }
    }
}

/// Start the engine on one state machine and leak it for the listen task
fn start_engine<PIO: Instance, const SM: usize>(
    cell: &'static StaticCell<PulseEngine<'static, PIO, SM>>,
    common: &mut Common<'static, PIO>,
    sm: StateMachine<'static, PIO, SM>,
    pins: &mut OutputPins,
    config: &FirmwareConfig,
) -> Result<&'static mut dyn TxFifo, ConfigError> {
    let engine = PulseEngine::new(common, sm, pins, &config.engine, config.run.encoding)?;
    Ok(cell.init(engine))
}
