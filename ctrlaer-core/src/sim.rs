//! Host-side doubles for the engine FIFO, the poll delay and a serial port

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use ctrlaer_hal::TxFifo;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};

#[derive(Debug, Default)]
struct State {
    capacity: usize,
    fifo: VecDeque<u32>,
    pushed: Vec<u32>,
    executed: Vec<(u32, u32)>,
    pending_value: Option<u32>,
    polls: usize,
}

impl State {
    fn consume(&mut self, words: usize) {
        for _ in 0..words {
            let Some(word) = self.fifo.pop_front() else {
                return;
            };
            match self.pending_value.take() {
                Some(value) => self.executed.push((value, word)),
                None => self.pending_value = Some(word),
            }
        }
    }
}

/// Simulated engine: a bounded FIFO whose words are consumed on every poll
#[derive(Debug, Clone)]
pub struct SimEngine(Rc<RefCell<State>>);

impl SimEngine {
    pub fn new(capacity: usize) -> Self {
        Self(Rc::new(RefCell::new(State {
            capacity,
            ..Default::default()
        })))
    }

    pub fn fifo(&self) -> SimFifo {
        SimFifo(self.clone())
    }

    /// Delay that lets the engine consume `words` per call
    pub fn delay(&self, words: usize) -> SimDelay {
        SimDelay {
            engine: self.clone(),
            words,
        }
    }

    /// Every word ever pushed, in order
    pub fn pushed(&self) -> Vec<u32> {
        self.0.borrow().pushed.clone()
    }

    /// Events the engine has pulled completely
    pub fn executed(&self) -> Vec<(u32, u32)> {
        self.0.borrow().executed.clone()
    }

    /// Number of delay calls
    pub fn polls(&self) -> usize {
        self.0.borrow().polls
    }
}

pub struct SimFifo(SimEngine);

impl TxFifo for SimFifo {
    fn push(&mut self, word: u32) {
        let mut state = self.0 .0.borrow_mut();
        assert!(state.fifo.len() < state.capacity, "push into full FIFO");
        state.fifo.push_back(word);
        state.pushed.push(word);
    }

    fn is_full(&mut self) -> bool {
        let state = self.0 .0.borrow();
        state.fifo.len() >= state.capacity
    }

    fn is_empty(&mut self) -> bool {
        self.0 .0.borrow().fifo.is_empty()
    }
}

pub struct SimDelay {
    engine: SimEngine,
    words: usize,
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        let mut state = self.engine.0.borrow_mut();
        state.polls += 1;
        state.consume(self.words);
    }
}

/// Serial port replaying fixed input in chunks and recording output
pub struct SimSerial {
    input: Vec<u8>,
    position: usize,
    chunk: usize,
    pub output: Vec<u8>,
    pub fail_writes: bool,
}

impl SimSerial {
    pub fn new(input: &[u8], chunk: usize) -> Self {
        Self {
            input: input.to_vec(),
            position: 0,
            chunk: chunk.max(1),
            output: Vec::new(),
            fail_writes: false,
        }
    }

    pub fn output_str(&self) -> &str {
        core::str::from_utf8(&self.output).unwrap()
    }

    /// Bytes not read yet
    pub fn unread(&self) -> usize {
        self.input.len() - self.position
    }
}

impl ErrorType for SimSerial {
    type Error = ErrorKind;
}

impl Read for SimSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let n = self.chunk.min(buf.len()).min(self.unread());
        buf[..n].copy_from_slice(&self.input[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

impl Write for SimSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        if self.fail_writes {
            return Err(ErrorKind::BrokenPipe);
        }
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}
