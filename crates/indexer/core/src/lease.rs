use tokio::sync::{Mutex, MutexGuard};

/// Striped per-block-number locks.
///
/// Reconciles and promotions hold the lease of their block number for the whole
/// lookup-then-act sequence so that two paths never interleave on the same
/// number. Distinct numbers may share a stripe, which only serializes them.
#[derive(Debug)]
pub struct BlockLeases {
    stripes: Box<[Mutex<()>]>,
}

impl BlockLeases {
    /// Default number of stripes.
    pub const DEFAULT_STRIPES: usize = 256;

    /// Creates a table with `stripes` locks (at least one).
    pub fn new(stripes: usize) -> Self {
        Self { stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect() }
    }

    /// Waits for the lease of `number`.
    pub async fn acquire(&self, number: u64) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe(number)].lock().await
    }

    fn stripe(&self, number: u64) -> usize {
        (number % self.stripes.len() as u64) as usize
    }
}

impl Default for BlockLeases {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}
