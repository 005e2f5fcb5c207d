//! Fleet orchestrator.
//!
//! Runs one worker per device on a bounded pool. Credentials are resolved
//! before dispatch: once for the whole batch under
//! [`CredentialPolicy::Universal`], or device by device under
//! [`CredentialPolicy::PerDevice`]. Every per-device error, including a
//! worker panic, ends up in that device's [`SessionOutcome`]; only a failed
//! universal credential resolution aborts the batch.

mod builder;
mod result;

pub use builder::{DEFAULT_CONCURRENCY, FleetBuilder};
pub use result::BatchResult;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::cancel::CancelToken;
use crate::credentials::{CredentialPolicy, CredentialResolver, Credentials, SecretPrompt};
use crate::device::{CatalogEntry, DeviceDescriptor, normalize};
use crate::driver::{DriverSettings, InteractionDriver, SessionOutcome};
use crate::error::{DriverError, Error, Result, ValidationError};
use crate::script::{self, ScriptParams};
use crate::session::Connector;

/// Drives a batch of devices concurrently.
pub struct FleetOrchestrator<C> {
    connector: Arc<C>,
    concurrency: usize,
    deadline: Option<Duration>,
    credential_attempts: u32,
    settings: DriverSettings,
}

/// A device ready for dispatch, or already settled during preparation.
enum Prepared {
    Ready {
        device: DeviceDescriptor,
        credentials: Arc<Credentials>,
    },
    Settled(SessionOutcome),
}

impl<C: Connector> FleetOrchestrator<C> {
    /// Maximum number of devices driven at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Run a batch over validated descriptors.
    ///
    /// Device names key the result. A repeated name fails validation and is
    /// reported under `<name>#<n>`, the first free suffix from 2.
    pub async fn run<P: SecretPrompt>(
        &self,
        devices: Vec<DeviceDescriptor>,
        policy: &CredentialPolicy,
        prompt: P,
        params: &ScriptParams,
        cancel: &CancelToken,
    ) -> Result<BatchResult> {
        let mut checked = IndexMap::with_capacity(devices.len());
        for device in devices {
            if !checked.contains_key(&device.name) {
                checked.insert(device.name.clone(), Ok(device));
                continue;
            }
            let key = free_key(&checked, &device.name);
            warn!("{key}: device name '{}' repeats an earlier device", device.name);
            let err = ValidationError::InvalidField {
                field: "name",
                reason: format!("'{}' is already used in this batch", device.name),
            };
            checked.insert(key, Err(err.into()));
        }
        self.run_checked(checked, policy, prompt, params, cancel)
            .await
    }

    /// Run a batch over raw catalog entries.
    ///
    /// Entries that fail validation are reported as failed devices.
    pub async fn run_entries<P: SecretPrompt>(
        &self,
        entries: &IndexMap<String, CatalogEntry>,
        policy: &CredentialPolicy,
        prompt: P,
        params: &ScriptParams,
        cancel: &CancelToken,
    ) -> Result<BatchResult> {
        let devices = entries
            .iter()
            .map(|(name, entry)| (name.clone(), normalize(name, entry)))
            .collect();
        self.run_checked(devices, policy, prompt, params, cancel)
            .await
    }

    /// Run a batch where some devices may already have failed validation.
    ///
    /// `Err` entries are reported as failed without being dispatched.
    pub async fn run_checked<P: SecretPrompt>(
        &self,
        devices: IndexMap<String, Result<DeviceDescriptor>>,
        policy: &CredentialPolicy,
        prompt: P,
        params: &ScriptParams,
        cancel: &CancelToken,
    ) -> Result<BatchResult> {
        let resolver = CredentialResolver::new(prompt).max_attempts(self.credential_attempts);
        let shared = match policy {
            CredentialPolicy::Universal { username } => {
                Some(Arc::new(resolver.resolve_universal(username).await?))
            }
            CredentialPolicy::PerDevice => None,
        };

        let mut prepared = Vec::with_capacity(devices.len());
        for (name, device) in devices {
            let entry = match device {
                _ if cancel.is_cancelled() => Prepared::Settled(SessionOutcome::cancelled(&name)),
                Err(e) => {
                    warn!("{name}: skipped: {e}");
                    Prepared::Settled(SessionOutcome::failed(&name, &e, Duration::ZERO))
                }
                Ok(device) => match &shared {
                    Some(credentials) => Prepared::Ready {
                        device,
                        credentials: credentials.clone(),
                    },
                    None => match resolver.resolve(policy, &device).await {
                        Ok(credentials) => Prepared::Ready {
                            device,
                            credentials: Arc::new(credentials),
                        },
                        Err(e) => {
                            warn!("{name}: credentials not resolved: {e}");
                            Prepared::Settled(SessionOutcome::failed(&name, &e, Duration::ZERO))
                        }
                    },
                },
            };
            prepared.push((name, entry));
        }

        Ok(self.dispatch(prepared, params, cancel).await)
    }

    async fn dispatch(
        &self,
        prepared: Vec<(String, Prepared)>,
        params: &ScriptParams,
        cancel: &CancelToken,
    ) -> BatchResult {
        let started = Instant::now();
        let batch = CancelToken::new();
        let watchdog = tokio::spawn(watch_batch(cancel.clone(), batch.clone(), self.deadline));

        info!(
            "dispatching {} devices, concurrency {}",
            prepared.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let params = Arc::new(params.clone());
        let mut workers = JoinSet::new();
        let mut running = HashMap::new();
        let mut order = Vec::with_capacity(prepared.len());
        let mut settled = HashMap::new();

        for (name, entry) in prepared {
            order.push(name.clone());
            let (device, credentials) = match entry {
                Prepared::Settled(outcome) => {
                    settled.insert(name, outcome);
                    continue;
                }
                Prepared::Ready {
                    device,
                    credentials,
                } => (device, credentials),
            };

            let semaphore = semaphore.clone();
            let connector = self.connector.clone();
            let params = params.clone();
            let settings = self.settings.clone();
            let cancel = batch.clone();
            let handle = workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return SessionOutcome::cancelled(&device.name);
                };
                if cancel.is_cancelled() {
                    debug!("{}: cancelled before start", device.name);
                    return SessionOutcome::cancelled(&device.name);
                }
                drive(&*connector, device, &credentials, &params, settings, &cancel).await
            });
            running.insert(handle.id(), name);
        }

        while let Some(joined) = workers.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some(name) = running.remove(&id) {
                        settled.insert(name, outcome);
                    }
                }
                Err(e) => {
                    let name = running.remove(&e.id()).unwrap_or_default();
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    error!("{name}: worker failed: {message}");
                    let err: Error = DriverError::Worker { message }.into();
                    settled.insert(name.clone(), SessionOutcome::failed(name, &err, Duration::ZERO));
                }
            }
        }
        watchdog.abort();

        let outcomes: IndexMap<_, _> = order
            .into_iter()
            .filter_map(|name| settled.remove(&name).map(|outcome| (name, outcome)))
            .collect();
        let result = BatchResult::new(outcomes);
        info!(
            "batch finished in {:?}: {} succeeded, {} failed, {} cancelled",
            started.elapsed(),
            result.succeeded().count(),
            result.failed().count(),
            result.cancelled().count()
        );
        result
    }
}

/// One worker: build the script, open a session, run the driver.
async fn drive<C: Connector>(
    connector: &C,
    device: DeviceDescriptor,
    credentials: &Credentials,
    params: &ScriptParams,
    settings: DriverSettings,
    cancel: &CancelToken,
) -> SessionOutcome {
    let started = Instant::now();

    let script = match script::build(&device, credentials, params) {
        Ok(script) => script,
        Err(e) => {
            warn!("{}: no script: {e}", device.name);
            return SessionOutcome::failed(&device.name, &e, started.elapsed());
        }
    };

    info!(
        "{}: connecting to {}:{} ({} steps)",
        device.name,
        device.host,
        device.port,
        script.len()
    );
    let session = tokio::select! {
        connected = connector.connect(&device, credentials) => match connected {
            Ok(session) => session,
            Err(e) => {
                warn!("{}: connect failed: {e}", device.name);
                return SessionOutcome::failed(&device.name, &e, started.elapsed());
            }
        },
        _ = cancel.cancelled() => {
            let err: Error = DriverError::Cancelled.into();
            return SessionOutcome::failed(&device.name, &err, started.elapsed());
        }
    };

    let outcome = InteractionDriver::new(session, &device, settings)
        .run(&script, cancel)
        .await;
    info!("{}: {:?} after {:?}", device.name, outcome.status, outcome.elapsed);
    outcome
}

fn free_key<V>(taken: &IndexMap<String, V>, name: &str) -> String {
    let mut n = 2;
    loop {
        let key = format!("{name}#{n}");
        if !taken.contains_key(&key) {
            return key;
        }
        n += 1;
    }
}

/// Cancel `batch` when the caller cancels or the deadline passes.
async fn watch_batch(caller: CancelToken, batch: CancelToken, deadline: Option<Duration>) {
    let expired = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = caller.cancelled() => debug!("batch cancelled"),
        _ = expired => warn!("batch deadline reached, cancelling outstanding devices"),
    }
    batch.cancel();
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}
