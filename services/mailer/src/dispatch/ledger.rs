/// Receives every send outcome the moment it is known.
///
/// A dispatch reports through the ledger before moving on, so anything the
/// ledger records survives even if the caller stops awaiting the dispatch.
pub trait SendLedger: Send + Sync {
    fn record_success(&self);

    /// Returns the sender's consecutive failure count including this one.
    fn record_failure(&self) -> u32;
}
