//! Connection reconciliation engine.
//!
//! One call to [`Reconciler::reconcile`] is one cycle: take inventory, run the
//! guards, then verify an existing network connection, promote a wired
//! device to network mode, or reconnect to the cached address. A network
//! device that stops answering triggers an adb server reset and a fresh pass,
//! at most `max_heal_attempts` times per cycle.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{AbortReason, CycleOutcome, CycleReport, DeviceRecord, Notice, Result};
use crate::infrastructure::{AddressStore, DeviceTransport};

use super::guards::{triage, Verdict};
use super::supervisor::Cycle;

/// What to do when a transport call fails at a given call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and carry on.
    BestEffort,
    /// Propagate out of the cycle.
    Required,
}

/// The address the engine believes it is connected to.
///
/// Only the engine writes it; other tasks read it through [`subscribe`].
/// Going from nothing to an address (or back) yields exactly one notice.
///
/// [`subscribe`]: ConnectionIndicator::subscribe
#[derive(Debug)]
pub struct ConnectionIndicator {
    tx: watch::Sender<Option<String>>,
}

impl ConnectionIndicator {
    #[must_use]
    pub fn new(initial: Option<String>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }

    /// Replace the value, returning the notice for a null/non-null flip.
    pub fn set(&self, next: Option<String>) -> Option<Notice> {
        let mut notice = None;
        self.tx.send_if_modified(|current| {
            notice = match (current.as_ref(), next.as_ref()) {
                (None, Some(address)) => Some(Notice::Connected(address.clone())),
                (Some(previous), None) => Some(Notice::Disconnected(previous.clone())),
                _ => None,
            };
            let changed = *current != next;
            *current = next;
            changed
        });
        notice
    }
}

/// Result of one pass through the gates.
enum Pass {
    Done(CycleOutcome),
    /// The single network device did not answer; reset and go again.
    StaleNetwork,
}

/// The reconciliation state machine.
pub struct Reconciler<T, S> {
    transport: T,
    store: S,
    indicator: ConnectionIndicator,
    max_heal_attempts: u32,
}

impl<T: DeviceTransport, S: AddressStore> Reconciler<T, S> {
    #[must_use]
    pub fn new(transport: T, store: S, max_heal_attempts: u32) -> Self {
        Self::with_indicator(transport, store, max_heal_attempts, None)
    }

    /// Start from a known indicator value.
    #[must_use]
    pub fn with_indicator(
        transport: T,
        store: S,
        max_heal_attempts: u32,
        connected: Option<String>,
    ) -> Self {
        Self {
            transport,
            store,
            indicator: ConnectionIndicator::new(connected),
            max_heal_attempts,
        }
    }

    #[must_use]
    pub const fn indicator(&self) -> &ConnectionIndicator {
        &self.indicator
    }

    /// Run one full cycle.
    pub async fn reconcile(&mut self) -> Result<CycleReport> {
        let mut notices = Vec::new();
        let mut resets = 0;

        loop {
            match self.pass(&mut notices).await? {
                Pass::Done(outcome) => return Ok(CycleReport::new(outcome, notices, resets)),
                Pass::StaleNetwork if resets >= self.max_heal_attempts => {
                    tracing::warn!(resets, "Network device still unreachable, giving up");
                    notices.push(Notice::HealExhausted(resets));
                    return Ok(CycleReport::new(
                        CycleOutcome::HealExhausted { resets },
                        notices,
                        resets,
                    ));
                }
                Pass::StaleNetwork => {
                    tracing::debug!("Bad connection, resetting adb");
                    self.reset_daemon(&mut notices, FailurePolicy::Required).await?;
                    resets += 1;
                    tracing::debug!(resets, "Reset, checking again");
                }
            }
        }
    }

    async fn pass(&self, notices: &mut Vec<Notice>) -> Result<Pass> {
        tracing::debug!("Checking status");

        let devices = self.transport.list_devices().await?;
        tracing::debug!(?devices, "Devices");

        let triage = triage(devices, self.transport.port());
        for cleanup in &triage.cleanups {
            tracing::debug!(?cleanup, "Disconnecting all network devices");
            self.disconnect_all(notices, FailurePolicy::BestEffort).await?;
        }

        let verdict = match triage.decision {
            Ok(verdict) => verdict,
            Err(reason) => {
                notices.push(match reason {
                    AbortReason::PhysicalConflict => Notice::UnplugToResolveConflict,
                    AbortReason::MultipleDevices => Notice::MultipleDevices,
                    AbortReason::NoAddressAvailable => Notice::AttachDevice,
                });
                return Ok(Pass::Done(CycleOutcome::Aborted(reason)));
            }
        };

        let (address, from_wire) = match verdict {
            Verdict::Network(device) => return self.verify(&device, notices).await,
            Verdict::Wired(device) => {
                tracing::debug!(serial = %device.serial, "Detected wired device");
                let address = self.transport.query_network_address().await?;
                tracing::debug!(address = %address, "Saving device IP");
                self.store.save(&address)?;
                self.transport.enable_network_mode().await?;
                (Some(address), true)
            }
            Verdict::Empty => (self.store.load()?, false),
        };

        tracing::debug!("Attempting IP connection");
        let Some(address) = address else {
            notices.push(Notice::AttachDevice);
            return Ok(Pass::Done(CycleOutcome::Aborted(
                AbortReason::NoAddressAvailable,
            )));
        };

        notices.push(Notice::Connecting(address.clone()));
        match self.transport.connect(&address).await {
            Ok(()) => {
                notices.extend(self.indicator.set(Some(address.clone())));
                if from_wire {
                    notices.push(Notice::CableNoLongerNeeded);
                }
                Ok(Pass::Done(CycleOutcome::Connected { address, from_wire }))
            }
            Err(e) => {
                tracing::debug!(error = %e, "Connect failed");
                notices.push(Notice::ConnectFailed(address.clone()));
                Ok(Pass::Done(CycleOutcome::ConnectFailed { address }))
            }
        }
    }

    /// Check that the lone network device still answers.
    async fn verify(&self, device: &DeviceRecord, notices: &mut Vec<Notice>) -> Result<Pass> {
        tracing::debug!(serial = %device.serial, "Detected IP device, verifying connection");

        let address = match self.transport.query_network_address().await {
            Ok(address) => address,
            Err(e) => {
                tracing::debug!(error = %e, "Verification failed");
                return Ok(Pass::StaleNetwork);
            }
        };

        tracing::debug!(address = %address, "Connection verified");
        if self.indicator.current().as_deref() != Some(address.as_str()) {
            self.store.save(&address)?;
            notices.extend(self.indicator.set(Some(address.clone())));
        }

        Ok(Pass::Done(CycleOutcome::Verified { address }))
    }

    async fn disconnect_all(
        &self,
        notices: &mut Vec<Notice>,
        policy: FailurePolicy,
    ) -> Result<()> {
        notices.extend(self.indicator.set(None));
        let result = self.transport.disconnect_all().await;
        apply_policy(result, policy, "disconnect all")
    }

    async fn reset_daemon(
        &self,
        notices: &mut Vec<Notice>,
        policy: FailurePolicy,
    ) -> Result<()> {
        notices.extend(self.indicator.set(None));
        let result = self.transport.reset_daemon().await;
        apply_policy(result, policy, "reset adb server")
    }
}

fn apply_policy(result: Result<()>, policy: FailurePolicy, operation: &str) -> Result<()> {
    match (result, policy) {
        (Err(e), FailurePolicy::BestEffort) => {
            tracing::warn!(error = %e, "Failed to {operation}, continuing");
            Ok(())
        }
        (result, _) => result,
    }
}

#[async_trait]
impl<T: DeviceTransport, S: AddressStore> Cycle for Reconciler<T, S> {
    async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.reconcile().await
    }
}
