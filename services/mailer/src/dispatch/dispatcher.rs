use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::mail::{MailTransport, OutgoingMessage};

use super::ledger::SendLedger;
use super::policy::{jittered, DispatchPolicy};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub attempted: usize,
    pub sent: usize,
    /// Sender's failure streak after the last attempt, as the ledger saw it.
    pub consecutive_failures: u32,
    /// Set when the failure cutoff left messages unsent.
    pub aborted: bool,
}

impl DispatchResult {
    fn record(&mut self, attempt: Attempt) {
        self.attempted += 1;
        match attempt {
            Attempt::Sent => {
                self.sent += 1;
                self.consecutive_failures = 0;
            }
            Attempt::Failed {
                consecutive_failures,
            } => self.consecutive_failures = consecutive_failures,
        }
    }
}

enum Attempt {
    Sent,
    Failed { consecutive_failures: u32 },
}

async fn attempt(
    transport: &dyn MailTransport,
    ledger: &dyn SendLedger,
    message: &OutgoingMessage,
) -> Attempt {
    match transport.send(message).await {
        Ok(()) => {
            ledger.record_success();
            debug!(recipient = %message.to_address, "message sent");
            Attempt::Sent
        }
        Err(err) => {
            let consecutive_failures = ledger.record_failure();
            warn!(
                recipient = %message.to_address,
                consecutive_failures,
                error = %err,
                "message send failed"
            );
            Attempt::Failed {
                consecutive_failures,
            }
        }
    }
}

/// Sends already-validated messages under a [`DispatchPolicy`].
///
/// Individual send failures are logged and left out of the sent count; a
/// dispatch never fails as a whole.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    policy: DispatchPolicy,
}

impl Dispatcher {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Every outcome is reported to `ledger` as it happens. The sequential
    /// cutoff uses the failure streak the ledger returns, so failures carried
    /// over from earlier requests by the same sender count toward it.
    pub async fn dispatch(
        &self,
        transport: &dyn MailTransport,
        messages: &[OutgoingMessage],
        ledger: &dyn SendLedger,
    ) -> DispatchResult {
        let result = match &self.policy {
            DispatchPolicy::Sequential {
                delay,
                jitter,
                failure_threshold,
            } => {
                send_sequential(
                    transport,
                    messages,
                    ledger,
                    *delay,
                    *jitter,
                    *failure_threshold,
                )
                .await
            }
            DispatchPolicy::Batched { batch_size, delay } => {
                send_batched(transport, messages, ledger, *batch_size, *delay).await
            }
        };

        debug!(
            policy = ?self.policy.kind(),
            total = messages.len(),
            attempted = result.attempted,
            sent = result.sent,
            aborted = result.aborted,
            "dispatch finished"
        );
        result
    }
}

async fn send_sequential(
    transport: &dyn MailTransport,
    messages: &[OutgoingMessage],
    ledger: &dyn SendLedger,
    delay: Duration,
    jitter: Duration,
    failure_threshold: u32,
) -> DispatchResult {
    let mut result = DispatchResult::default();

    for (index, message) in messages.iter().enumerate() {
        if index > 0 {
            sleep(jittered(delay, jitter)).await;
        }

        result.record(attempt(transport, ledger, message).await);

        if result.consecutive_failures >= failure_threshold {
            result.aborted = result.attempted < messages.len();
            if result.aborted {
                warn!(
                    consecutive_failures = result.consecutive_failures,
                    skipped = messages.len() - result.attempted,
                    "failure cutoff reached, abandoning remaining messages"
                );
            }
            break;
        }
    }

    result
}

async fn send_batched(
    transport: &dyn MailTransport,
    messages: &[OutgoingMessage],
    ledger: &dyn SendLedger,
    batch_size: usize,
    delay: Duration,
) -> DispatchResult {
    let mut result = DispatchResult::default();

    for (index, group) in messages.chunks(batch_size.max(1)).enumerate() {
        if index > 0 {
            sleep(delay).await;
        }

        let attempts = join_all(
            group
                .iter()
                .map(|message| attempt(transport, ledger, message)),
        )
        .await;
        for outcome in attempts {
            result.record(outcome);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::mail::TransportError;

    const SEND_TIME: Duration = Duration::from_millis(10);

    #[derive(Default)]
    struct RecordingTransport {
        failing: HashSet<String>,
        delivered: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingTransport {
        fn failing(recipients: &[&str]) -> Self {
            Self {
                failing: recipients.iter().map(|r| r.to_string()).collect(),
                ..Self::default()
            }
        }

        fn delivered(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn verify(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            sleep(SEND_TIME).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&message.to_address) {
                return Err(TransportError::Send("mailbox unavailable".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push(message.to_address.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingLedger {
        delivered: AtomicUsize,
        failures: AtomicU32,
    }

    impl CountingLedger {
        fn with_failures(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                ..Self::default()
            }
        }
    }

    impl SendLedger for CountingLedger {
        fn record_success(&self) {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            self.failures.store(0, Ordering::SeqCst);
        }

        fn record_failure(&self) -> u32 {
            self.failures.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    fn messages(recipients: &[&str]) -> Vec<OutgoingMessage> {
        recipients
            .iter()
            .map(|to| OutgoingMessage::new("Alice", "a@gmail.com", *to, "Hi", "hello"))
            .collect()
    }

    fn sequential(delay_ms: u64) -> Dispatcher {
        Dispatcher::new(DispatchPolicy::Sequential {
            delay: Duration::from_millis(delay_ms),
            jitter: Duration::ZERO,
            failure_threshold: 3,
        })
    }

    fn batched(batch_size: usize, delay_ms: u64) -> Dispatcher {
        Dispatcher::new(DispatchPolicy::Batched {
            batch_size,
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_sends_in_order_with_delay_between_attempts() {
        let transport = RecordingTransport::default();
        let batch = messages(&["1@x.com", "2@x.com", "3@x.com"]);
        let ledger = CountingLedger::default();

        let started = Instant::now();
        let result = sequential(150).dispatch(&transport, &batch, &ledger).await;

        assert_eq!(result.sent, 3);
        assert_eq!(result.attempted, 3);
        assert!(!result.aborted);
        assert_eq!(transport.delivered(), vec!["1@x.com", "2@x.com", "3@x.com"]);
        assert_eq!(ledger.delivered.load(Ordering::SeqCst), 3);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= SEND_TIME * 3 + Duration::from_millis(300));
        assert!(elapsed < SEND_TIME * 3 + Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_stops_after_three_consecutive_failures() {
        let recipients = ["1@x.com", "2@x.com", "3@x.com", "4@x.com", "5@x.com"];
        let transport = RecordingTransport::failing(&recipients);
        let ledger = CountingLedger::default();

        let result = sequential(0)
            .dispatch(&transport, &messages(&recipients), &ledger)
            .await;

        assert_eq!(result.attempted, 3);
        assert_eq!(result.sent, 0);
        assert_eq!(result.consecutive_failures, 3);
        assert_eq!(ledger.failures.load(Ordering::SeqCst), 3);
        assert!(result.aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_count() {
        let transport = RecordingTransport::failing(&["1@x.com", "2@x.com", "4@x.com", "5@x.com"]);
        let batch = messages(&["1@x.com", "2@x.com", "3@x.com", "4@x.com", "5@x.com", "6@x.com"]);
        let ledger = CountingLedger::default();

        let result = sequential(0).dispatch(&transport, &batch, &ledger).await;

        assert_eq!(result.attempted, 6);
        assert_eq!(result.sent, 2);
        assert_eq!(result.consecutive_failures, 0);
        assert!(!result.aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn carried_failures_shorten_the_cutoff() {
        let transport = RecordingTransport::failing(&["1@x.com"]);
        let batch = messages(&["1@x.com", "2@x.com"]);

        let ledger = CountingLedger::with_failures(2);
        let result = sequential(0).dispatch(&transport, &batch, &ledger).await;

        assert_eq!(result.attempted, 1);
        assert_eq!(result.sent, 0);
        assert!(result.aborted);
        assert!(transport.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cutoff_on_last_message_is_not_an_abort() {
        let recipients = ["1@x.com", "2@x.com", "3@x.com"];
        let transport = RecordingTransport::failing(&recipients);
        let ledger = CountingLedger::default();

        let result = sequential(0)
            .dispatch(&transport, &messages(&recipients), &ledger)
            .await;

        assert_eq!(result.attempted, 3);
        assert_eq!(result.sent, 0);
        assert_eq!(result.consecutive_failures, 3);
        assert!(!result.aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn batched_sends_groups_of_three_with_one_pause() {
        let transport = RecordingTransport::default();
        let batch = messages(&["1@x.com", "2@x.com", "3@x.com", "4@x.com", "5@x.com"]);
        let ledger = CountingLedger::default();

        let started = Instant::now();
        let result = batched(3, 1_000).dispatch(&transport, &batch, &ledger).await;

        assert_eq!(result.sent, 5);
        assert_eq!(result.attempted, 5);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= SEND_TIME * 2 + Duration::from_millis(1_000));
        assert!(elapsed < SEND_TIME * 2 + Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn batched_keeps_going_after_failures() {
        let recipients = ["1@x.com", "2@x.com", "3@x.com", "4@x.com", "5@x.com", "6@x.com"];
        let transport = RecordingTransport::failing(&recipients[..5]);
        let ledger = CountingLedger::default();

        let result = batched(3, 0)
            .dispatch(&transport, &messages(&recipients), &ledger)
            .await;

        assert_eq!(result.attempted, 6);
        assert_eq!(result.sent, 1);
        assert_eq!(ledger.delivered.load(Ordering::SeqCst), 1);
        assert!(!result.aborted);
        assert_eq!(transport.delivered(), vec!["6@x.com"]);
    }

    #[tokio::test]
    async fn empty_dispatch_sends_nothing() {
        let transport = RecordingTransport::default();
        let ledger = CountingLedger::with_failures(1);

        for dispatcher in [sequential(0), batched(3, 0)] {
            let result = dispatcher.dispatch(&transport, &[], &ledger).await;
            assert_eq!(result.attempted, 0);
            assert_eq!(result.sent, 0);
        }
        assert_eq!(ledger.failures.load(Ordering::SeqCst), 1);
    }
}
