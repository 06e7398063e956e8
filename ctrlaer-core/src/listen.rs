//! Line-command listener
//!
//! Reads `<command>,<duration>` records from a byte transport and streams
//! them into an [`OutputDriver`] as a direct run. Each record's command is
//! the packed engine value and is queued as-is. Once a record is queued it
//! is echoed back, so the host can pace itself on the echoes.
//!
//! A session ends on `END` or when the transport reports end of input;
//! the terminal `(OFF, 0)` event then idles the pins. Malformed lines are
//! counted and skipped. Bytes read past `END` stay in the [`Listener`]
//! and start the next session.

use ctrlaer_hal::TxFifo;
use ctrlaer_protocol::{Line, LineError, LineParser, MAX_LINE_LEN};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};

use crate::driver::{OutputDriver, RunOutcome};
use crate::mux::PackedEvent;

/// Transport failure while listening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListenError<E> {
    /// Read or write on the transport failed
    Io(E),
}

/// Result of one listening session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ListenSummary {
    /// Records queued and echoed
    pub accepted: usize,
    /// Malformed lines skipped
    pub rejected: usize,
    /// Most recent parse error
    pub last_error: Option<LineError>,
    /// Delivery outcome
    pub outcome: RunOutcome,
}

/// Line-command listener on one transport
///
/// Keeps the parser and any unconsumed input between sessions, so
/// records that arrive in the same read as the previous `END` are not
/// lost.
#[derive(Debug)]
pub struct Listener {
    parser: LineParser,
    buf: [u8; MAX_LINE_LEN],
    start: usize,
    end: usize,
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener {
    pub fn new() -> Self {
        Self {
            parser: LineParser::new(),
            buf: [0; MAX_LINE_LEN],
            start: 0,
            end: 0,
        }
    }

    /// Bytes read but not parsed yet
    pub fn pending(&self) -> usize {
        self.end - self.start
    }

    /// Drop buffered input and any partial line
    pub fn reset(&mut self) {
        self.parser.reset();
        self.start = 0;
        self.end = 0;
    }

    /// Run one listening session
    ///
    /// `rx` and `tx` are usually the two halves of one serial port. A
    /// non-blocking driver that finds the FIFO full ends the session with
    /// [`RunOutcome::Saturated`] and without the terminal event; the record
    /// that did not fit is dropped.
    pub async fn session<Q, D, R, W>(
        &mut self,
        driver: &mut OutputDriver<Q, D>,
        rx: &mut R,
        tx: &mut W,
    ) -> Result<ListenSummary, ListenError<R::Error>>
    where
        Q: TxFifo,
        D: DelayNs,
        R: Read,
        W: Write<Error = R::Error>,
    {
        let mut summary = ListenSummary {
            accepted: 0,
            rejected: 0,
            last_error: None,
            outcome: RunOutcome::Completed { events: 0 },
        };

        loop {
            if self.start == self.end {
                let n = rx.read(&mut self.buf).await.map_err(ListenError::Io)?;
                if n == 0 {
                    break;
                }
                self.start = 0;
                self.end = n;
            }

            let (used, result) = self.parser.feed_bytes(&self.buf[self.start..self.end]);
            self.start += used;

            match result {
                Ok(None) => {}
                Ok(Some(Line::End)) => break,
                Ok(Some(Line::Record(record))) => {
                    let event = PackedEvent::new(record.command, record.duration);
                    if !driver.push(event).await {
                        summary.outcome = RunOutcome::Saturated {
                            delivered: summary.accepted,
                        };
                        return Ok(summary);
                    }
                    summary.accepted += 1;

                    tx.write_all(record.encode().as_bytes())
                        .await
                        .map_err(ListenError::Io)?;
                    tx.flush().await.map_err(ListenError::Io)?;
                }
                Err(e) => {
                    summary.rejected += 1;
                    summary.last_error = Some(e);
                }
            }
        }

        driver.finish().await;
        summary.outcome = RunOutcome::Completed {
            events: summary.accepted,
        };
        Ok(summary)
    }
}
