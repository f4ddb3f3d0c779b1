use crate::ConfigError;

/// Immutable settings shared by the synchronization components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerConfig {
    /// First block number the backfill scanner visits.
    pub start_block: u64,
    /// Number of blocks that must follow a block before it is stable.
    pub confirmations: u64,
    /// Concurrent block reconciles during backfill.
    pub scan_workers: usize,
    /// Concurrent transaction ingestions per block.
    pub tx_workers: usize,
    /// Most skipped heads the live subscriber fills in after a gap.
    pub max_gap_fill: u64,
}

impl IndexerConfig {
    /// Default bound on gap fill after a subscription hiccup.
    pub const DEFAULT_MAX_GAP_FILL: u64 = 128;

    /// Checks that worker counts are usable.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_workers == 0 {
            return Err(ConfigError::ZeroScanWorkers);
        }
        if self.tx_workers == 0 {
            return Err(ConfigError::ZeroTransactionWorkers);
        }
        Ok(())
    }

    /// Returns true if `number` has at least `confirmations` blocks on top of it
    /// when the chain head is `head`.
    pub const fn is_stable(&self, number: u64, head: u64) -> bool {
        match number.checked_add(self.confirmations) {
            Some(threshold) => threshold <= head,
            None => false,
        }
    }

    /// Returns the block that becomes stable when `head` arrives, if any.
    pub const fn promotion_target(&self, head: u64) -> Option<u64> {
        head.checked_sub(self.confirmations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(confirmations: u64) -> IndexerConfig {
        IndexerConfig {
            start_block: 0,
            confirmations,
            scan_workers: 4,
            tx_workers: 4,
            max_gap_fill: IndexerConfig::DEFAULT_MAX_GAP_FILL,
        }
    }

    #[rstest]
    #[case::exactly_deep_enough(100, 112, true)]
    #[case::one_short(100, 111, false)]
    #[case::at_head(112, 112, false)]
    #[case::far_below(0, 112, true)]
    fn test_is_stable(#[case] number: u64, #[case] head: u64, #[case] stable: bool) {
        assert_eq!(config(12).is_stable(number, head), stable);
    }

    #[test]
    fn test_is_stable_overflow() {
        assert!(!config(12).is_stable(u64::MAX, u64::MAX));
    }

    #[test]
    fn test_zero_confirmations_is_immediately_stable() {
        assert!(config(0).is_stable(10, 10));
        assert_eq!(config(0).promotion_target(10), Some(10));
    }

    #[test]
    fn test_promotion_target_below_depth() {
        assert_eq!(config(12).promotion_target(11), None);
        assert_eq!(config(12).promotion_target(12), Some(0));
        assert_eq!(config(12).promotion_target(20), Some(8));
    }

    #[test]
    fn test_validate() {
        assert_eq!(config(1).validate(), Ok(()));
        let config = IndexerConfig { scan_workers: 0, ..config(1) };
        assert_eq!(config.validate(), Err(ConfigError::ZeroScanWorkers));
        let config = IndexerConfig { scan_workers: 1, tx_workers: 0, ..config };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTransactionWorkers));
    }
}
