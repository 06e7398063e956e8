//! Hardware input queue abstraction
//!
//! The execution engine owns a bounded FIFO of 32-bit words. Software is
//! the single producer, the engine the single consumer. The producer may
//! only enqueue and observe the full/empty flags: there is no peek, no pop
//! and no capacity introspection.

/// Transmit side of a hardware FIFO
///
/// Implementations wrap the chip's TX FIFO status and data registers.
/// There is exactly one producer, so no locking. Status reads take
/// `&mut self`: chip HALs only expose the FIFO registers through an
/// exclusive borrow.
pub trait TxFifo {
    /// Enqueue one word
    ///
    /// Callers check [`is_full`](Self::is_full) first. Pushing into a full
    /// FIFO is implementation-defined (hardware implementations stall until
    /// the engine frees a slot).
    fn push(&mut self, word: u32);

    /// Check if the FIFO has no free slot
    fn is_full(&mut self) -> bool;

    /// Check if the engine has consumed every queued word
    fn is_empty(&mut self) -> bool;
}

impl<T: TxFifo + ?Sized> TxFifo for &mut T {
    fn push(&mut self, word: u32) {
        (**self).push(word)
    }

    fn is_full(&mut self) -> bool {
        (**self).is_full()
    }

    fn is_empty(&mut self) -> bool {
        (**self).is_empty()
    }
}
