use crate::error::Result;

/// A synchronous, full-duplex, clocked serial bus.
///
/// The bus has no framing, addressing or error detection of its own: a
/// transfer clocks `tx.len()` bytes out and the same number of bytes in.
/// Implementations block until the controller completes or errors the
/// transfer.
pub trait SpiBus {
    /// Run one full-duplex transfer.
    ///
    /// `tx` and `rx` must have the same length. Returns the number of bytes
    /// clocked.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize>;

    /// Acquire the cooperative, exclusive lock on the underlying device
    /// (blocking). Other processes holding their own descriptor to the same
    /// device are excluded until [`SpiBus::unlock`].
    fn lock_exclusive(&self) -> Result<()>;

    /// Release the lock taken by [`SpiBus::lock_exclusive`].
    fn unlock(&self) -> Result<()>;

    /// Device name for diagnostics.
    fn name(&self) -> &str {
        "spi"
    }
}

impl<B: SpiBus + ?Sized> SpiBus for Box<B> {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize> {
        (**self).transfer(tx, rx)
    }

    fn lock_exclusive(&self) -> Result<()> {
        (**self).lock_exclusive()
    }

    fn unlock(&self) -> Result<()> {
        (**self).unlock()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
