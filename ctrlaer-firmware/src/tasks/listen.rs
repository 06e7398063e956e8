//! Command link task
//!
//! Runs listening sessions on UART0 back to back. Each session streams
//! host records into the engine until `END`, then idles the pins. Input
//! that arrives with an `END` carries over to the next session.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::{Delay, Timer};

use ctrlaer_core::{EngineConfig, ListenError, Listener, OutputDriver, RunConfig};
use ctrlaer_hal::TxFifo;

/// Pause after a UART error before the next session
const ERROR_BACKOFF_MS: u64 = 100;

/// Listen task - forwards host records to the engine and echoes them
#[embassy_executor::task]
pub async fn listen_task(
    engine: &'static mut dyn TxFifo,
    mut rx: BufferedUartRx,
    mut tx: BufferedUartTx,
    run: RunConfig,
    engine_config: EngineConfig,
) {
    info!("Listen task started ({:?})", run);

    let mut driver = OutputDriver::new(engine, Delay, &run, &engine_config);
    let mut listener = Listener::new();
    let mut session: u32 = 0;

    loop {
        session = session.wrapping_add(1);
        debug!("Session {} waiting for records", session);

        match listener.session(&mut driver, &mut rx, &mut tx).await {
            Ok(summary) => {
                info!(
                    "Session {} done: {} accepted, {} rejected, {:?}",
                    session, summary.accepted, summary.rejected, summary.outcome
                );
                if let Some(e) = summary.last_error {
                    warn!("Session {} last rejected line: {:?}", session, e);
                }
            }
            Err(ListenError::Io(e)) => {
                warn!("UART error in session {}: {:?}", session, e);
                listener.reset();
                Timer::after_millis(ERROR_BACKOFF_MS).await;
            }
        }
    }
}
