//! Device triage: the ordered guards that run before any connection work.
//!
//! Guards are pure functions over the working device set. Each one either
//! lets the cycle continue, asks for a disconnect-all (after narrowing the
//! set), or aborts the cycle with a reason. Once all guards pass, at most one
//! device remains and the set collapses into a [`Verdict`].

use crate::domain::{AbortReason, DeviceRecord};

/// Why a guard asked for every network connection to be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// At least one device reported `offline`.
    OfflineDevices,
    /// More than one network identity is visible for a single device.
    MultipleNetworkDevices,
}

/// Result of a single guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    DisconnectAll(Cleanup),
    Abort(AbortReason),
}

/// What is left once every guard passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Exactly one network-attached device.
    Network(DeviceRecord),
    /// Exactly one cable-attached device.
    Wired(DeviceRecord),
    /// Nothing attached.
    Empty,
}

/// Outcome of running all guards over an inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triage {
    /// Disconnect-all requests, in the order the guards raised them.
    pub cleanups: Vec<Cleanup>,
    pub decision: Result<Verdict, AbortReason>,
}

/// Devices still under consideration during a cycle.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    devices: Vec<DeviceRecord>,
    port: u16,
}

impl WorkingSet {
    #[must_use]
    pub const fn new(devices: Vec<DeviceRecord>, port: u16) -> Self {
        Self { devices, port }
    }

    fn len(&self) -> usize {
        self.devices.len()
    }

    fn network_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_network(self.port)).count()
    }

    fn wired_count(&self) -> usize {
        self.len() - self.network_count()
    }

    fn drop_network(&mut self) {
        let port = self.port;
        self.devices.retain(|d| !d.is_network(port));
    }

    fn into_verdict(mut self) -> Verdict {
        match self.devices.pop() {
            None => Verdict::Empty,
            Some(device) if device.is_network(self.port) => Verdict::Network(device),
            Some(device) => Verdict::Wired(device),
        }
    }
}

type Guard = fn(&mut WorkingSet) -> Step;

/// Guards in evaluation order.
const GUARDS: [(&str, Guard); 4] = [
    ("offline-cleanup", offline_cleanup),
    ("multi-network", collapse_network),
    ("physical-conflict", physical_conflict),
    ("residual-ambiguity", residual_ambiguity),
];

/// Offline devices poison every network entry: drop them all.
fn offline_cleanup(set: &mut WorkingSet) -> Step {
    if set.devices.iter().any(DeviceRecord::is_offline) {
        set.drop_network();
        Step::DisconnectAll(Cleanup::OfflineDevices)
    } else {
        Step::Continue
    }
}

/// Several network identities for one device means stale state.
fn collapse_network(set: &mut WorkingSet) -> Step {
    if set.network_count() > 1 {
        set.drop_network();
        Step::DisconnectAll(Cleanup::MultipleNetworkDevices)
    } else {
        Step::Continue
    }
}

fn physical_conflict(set: &mut WorkingSet) -> Step {
    if set.len() > 1 && set.wired_count() > 0 {
        Step::Abort(AbortReason::PhysicalConflict)
    } else {
        Step::Continue
    }
}

fn residual_ambiguity(set: &mut WorkingSet) -> Step {
    if set.len() > 1 {
        Step::Abort(AbortReason::MultipleDevices)
    } else {
        Step::Continue
    }
}

/// Run every guard over `devices` and classify what remains.
#[must_use]
pub fn triage(devices: Vec<DeviceRecord>, port: u16) -> Triage {
    let mut set = WorkingSet::new(devices, port);
    let mut cleanups = Vec::new();

    for (name, guard) in GUARDS {
        match guard(&mut set) {
            Step::Continue => {}
            Step::DisconnectAll(cleanup) => {
                tracing::debug!(
                    guard = name,
                    ?cleanup,
                    remaining = set.len(),
                    "Guard narrowed devices"
                );
                cleanups.push(cleanup);
            }
            Step::Abort(reason) => {
                tracing::debug!(guard = name, ?reason, "Guard aborted cycle");
                return Triage {
                    cleanups,
                    decision: Err(reason),
                };
            }
        }
    }

    Triage {
        cleanups,
        decision: Ok(set.into_verdict()),
    }
}
