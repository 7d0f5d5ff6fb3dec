use std::{path::PathBuf, sync::Arc};

use chrono::{NaiveDate, Utc};
use tokio::{
    sync::{broadcast, mpsc, oneshot, Mutex},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    config::CheckInConfig,
    core::{
        guard,
        projection::{self, ListQuery},
        roster::Roster,
    },
    error::{CheckInError, CheckInResult},
    export,
    ingest::{self, ScanDebouncer},
    persist::{RecordStore, StoreResult, memory::MemoryRecordStore},
    record::{AttendeeRecord, CheckInDraft},
    sync::{SyncEndpoint, SyncReceipt},
    types::{Identifier, StoreMode},
};

use super::events::CheckInEvent;

/// Result of feeding one decoded scan to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan produced a new check-in.
    Accepted(AttendeeRecord),
    /// The scan arrived inside the debounce window and was ignored.
    Suppressed,
}

/// Cloneable async front door to the check-in runtime.
///
/// Every call becomes one command to a single-writer loop, so the duplicate
/// check and the store write of a check-in happen as one step.
#[derive(Clone)]
pub struct CheckInHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<CheckInEvent>,
}

enum Command {
    Open {
        resp: oneshot::Sender<CheckInResult<StoreMode>>,
    },
    CheckIn {
        draft: CheckInDraft,
        resp: oneshot::Sender<CheckInResult<AttendeeRecord>>,
    },
    CheckInManual {
        identifier: String,
        display_name: String,
        resp: oneshot::Sender<CheckInResult<AttendeeRecord>>,
    },
    Scan {
        payload: String,
        resp: oneshot::Sender<CheckInResult<ScanOutcome>>,
    },
    Records {
        resp: oneshot::Sender<CheckInResult<Vec<AttendeeRecord>>>,
    },
    List {
        query: ListQuery,
        resp: oneshot::Sender<CheckInResult<Vec<AttendeeRecord>>>,
    },
    Delete {
        identifier: Identifier,
        resp: oneshot::Sender<CheckInResult<()>>,
    },
    ClearAll {
        resp: oneshot::Sender<CheckInResult<()>>,
    },
    Reload {
        resp: oneshot::Sender<CheckInResult<usize>>,
    },
    ExportCsv {
        resp: oneshot::Sender<CheckInResult<String>>,
    },
    Sync {
        resp: oneshot::Sender<CheckInResult<SyncReceipt>>,
    },
    Mode {
        resp: oneshot::Sender<StoreMode>,
    },
    Shutdown {
        resp: oneshot::Sender<CheckInResult<()>>,
    },
}

/// Starts the runtime loop around `store` (opened or not) and returns its handle.
///
/// Nothing touches the store until [`CheckInHandle::open`] is called.
pub fn spawn_checkin(
    store: Box<dyn RecordStore>,
    sync: Box<dyn SyncEndpoint>,
    config: CheckInConfig,
) -> CheckInHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_buffer.max(1));
    let (events_tx, _) = broadcast::channel::<CheckInEvent>(1024);

    let mut worker = Worker {
        store: Arc::new(Mutex::new(store)),
        sync: Arc::new(Mutex::new(sync)),
        mode: StoreMode::Unopened,
        roster: Roster::new(),
        debounce: ScanDebouncer::new(config.scan_cooldown),
        events_tx: events_tx.clone(),
        config,
    };

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if worker.handle_command(cmd).await {
                break;
            }
        }
        debug!("check-in runtime stopped");
    });

    CheckInHandle { cmd_tx, events_tx }
}

impl CheckInHandle {
    /// New receiver for runtime events. Only events sent after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<CheckInEvent> {
        self.events_tx.subscribe()
    }

    /// Opens the store and loads the working set. Idempotent.
    ///
    /// When durable storage is unavailable and the config allows it, the
    /// runtime switches to a session-only store and reports
    /// [`StoreMode::InMemory`] instead of failing.
    pub async fn open(&self) -> CheckInResult<StoreMode> {
        self.request(|resp| Command::Open { resp }).await?
    }

    /// Checks in a validated draft.
    pub async fn check_in(&self, draft: CheckInDraft) -> CheckInResult<AttendeeRecord> {
        self.request(|resp| Command::CheckIn { draft, resp }).await?
    }

    /// Validates manual form input, then checks it in.
    ///
    /// Blank input fails with [`CheckInError::InvalidPayload`] and emits
    /// [`CheckInEvent::Rejected`], like a malformed scan.
    pub async fn check_in_manual(
        &self,
        identifier: impl Into<String>,
        display_name: impl Into<String>,
    ) -> CheckInResult<AttendeeRecord> {
        let identifier = identifier.into();
        let display_name = display_name.into();
        self.request(|resp| Command::CheckInManual {
            identifier,
            display_name,
            resp,
        })
        .await?
    }

    /// Feeds one decoded scan payload through debounce, parsing and check-in.
    pub async fn scan(&self, payload: impl Into<String>) -> CheckInResult<ScanOutcome> {
        let payload = payload.into();
        self.request(|resp| Command::Scan { payload, resp }).await?
    }

    /// Every record, newest check-in first.
    pub async fn records(&self) -> CheckInResult<Vec<AttendeeRecord>> {
        self.request(|resp| Command::Records { resp }).await?
    }

    /// Filtered, sorted view of the working set.
    pub async fn list(&self, query: ListQuery) -> CheckInResult<Vec<AttendeeRecord>> {
        self.request(|resp| Command::List { query, resp }).await?
    }

    /// Deletes one record; unknown identifiers are a no-op.
    pub async fn delete(&self, identifier: impl Into<Identifier>) -> CheckInResult<()> {
        let identifier = identifier.into();
        self.request(|resp| Command::Delete { identifier, resp }).await?
    }

    /// Deletes every record.
    pub async fn clear_all(&self) -> CheckInResult<()> {
        self.request(|resp| Command::ClearAll { resp }).await?
    }

    /// Replaces the working set with the store's contents.
    pub async fn reload(&self) -> CheckInResult<usize> {
        self.request(|resp| Command::Reload { resp }).await?
    }

    /// CSV document of every record, oldest first.
    pub async fn export_csv(&self) -> CheckInResult<String> {
        self.request(|resp| Command::ExportCsv { resp }).await?
    }

    /// Writes the CSV export for `date` into `dir`.
    pub async fn export_to(&self, dir: PathBuf, date: NaiveDate) -> CheckInResult<PathBuf> {
        let records = self.records().await?;
        tokio::task::spawn_blocking(move || export::write_csv(dir, &records, date))
            .await
            .map_err(|e| CheckInError::Worker(format!("join error: {e}")))?
    }

    /// Hands the current records to the sync endpoint once.
    pub async fn sync(&self) -> CheckInResult<SyncReceipt> {
        self.request(|resp| Command::Sync { resp }).await?
    }

    /// Persistence mode currently in effect.
    pub async fn mode(&self) -> CheckInResult<StoreMode> {
        self.request(|resp| Command::Mode { resp }).await
    }

    /// Closes the store and stops the loop. Later calls fail with
    /// [`CheckInError::ChannelClosed`].
    pub async fn shutdown(&self) -> CheckInResult<()> {
        self.request(|resp| Command::Shutdown { resp }).await?
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> CheckInResult<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| CheckInError::ChannelClosed)?;
        rx.await.map_err(|_| CheckInError::ChannelClosed)
    }
}

struct Worker {
    store: Arc<Mutex<Box<dyn RecordStore>>>,
    sync: Arc<Mutex<Box<dyn SyncEndpoint>>>,
    mode: StoreMode,
    roster: Roster,
    debounce: ScanDebouncer,
    events_tx: broadcast::Sender<CheckInEvent>,
    config: CheckInConfig,
}

impl Worker {
    /// Returns true when the loop should stop.
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Open { resp } => {
                let _ = resp.send(self.open().await);
            }
            Command::CheckIn { draft, resp } => {
                let _ = resp.send(self.check_in(draft).await);
            }
            Command::CheckInManual {
                identifier,
                display_name,
                resp,
            } => {
                let _ = resp.send(self.check_in_manual(&identifier, &display_name).await);
            }
            Command::Scan { payload, resp } => {
                let _ = resp.send(self.scan(&payload).await);
            }
            Command::Records { resp } => {
                let out = self
                    .ensure_open()
                    .map(|()| self.roster.newest_first_cloned());
                let _ = resp.send(out);
            }
            Command::List { query, resp } => {
                let out = self
                    .ensure_open()
                    .map(|()| projection::project(self.roster.iter(), &query));
                let _ = resp.send(out);
            }
            Command::Delete { identifier, resp } => {
                let _ = resp.send(self.delete(identifier).await);
            }
            Command::ClearAll { resp } => {
                let _ = resp.send(self.clear_all().await);
            }
            Command::Reload { resp } => {
                let _ = resp.send(self.reload().await);
            }
            Command::ExportCsv { resp } => {
                let out = self
                    .ensure_open()
                    .and_then(|()| export::to_csv(self.roster.iter()));
                let _ = resp.send(out);
            }
            Command::Sync { resp } => {
                let _ = resp.send(self.sync().await);
            }
            Command::Mode { resp } => {
                let _ = resp.send(self.mode);
            }
            Command::Shutdown { resp } => {
                let out = self.with_store(|store| store.close()).await;
                if let Err(err) = &out {
                    warn!(%err, "closing store failed");
                }
                self.mode = StoreMode::Unopened;
                let _ = resp.send(out);
                return true;
            }
        }

        false
    }

    fn ensure_open(&self) -> CheckInResult<()> {
        match self.mode {
            StoreMode::Unopened => Err(CheckInError::NotInitialized),
            StoreMode::Durable | StoreMode::InMemory => Ok(()),
        }
    }

    fn emit(&self, event: CheckInEvent) {
        let _ = self.events_tx.send(event);
    }

    async fn with_store<T, F>(&self, f: F) -> CheckInResult<T>
    where
        F: FnOnce(&mut dyn RecordStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut store = store.blocking_lock();
            f(&mut **store)
        })
        .await
        .map_err(|e| CheckInError::Worker(format!("join error: {e}")))?
        .map_err(CheckInError::from)
    }

    async fn open(&mut self) -> CheckInResult<StoreMode> {
        if self.mode != StoreMode::Unopened {
            return Ok(self.mode);
        }

        match self.with_store(|store| store.open()).await {
            Ok(()) => {}
            Err(CheckInError::StorageUnavailable(reason)) if self.config.in_memory_fallback => {
                warn!(%reason, "durable storage unavailable, check-ins will not survive a restart");
                *self.store.lock().await = Box::new(MemoryRecordStore::opened());
                self.emit(CheckInEvent::DegradedMode { reason });
            }
            Err(err) => {
                warn!(%err, "opening store failed");
                return Err(err);
            }
        }

        let records = self
            .with_store(|store| store.get_all())
            .await
            .inspect_err(|err| warn!(%err, "loading check-ins failed"))?;
        let durable = self.store.lock().await.is_durable();
        self.mode = if durable {
            StoreMode::Durable
        } else {
            StoreMode::InMemory
        };
        self.roster.replace_all(records);
        info!(mode = ?self.mode, count = self.roster.len(), "check-in store ready");
        self.emit(CheckInEvent::Opened {
            mode: self.mode,
            count: self.roster.len(),
        });
        Ok(self.mode)
    }

    async fn check_in(&mut self, draft: CheckInDraft) -> CheckInResult<AttendeeRecord> {
        self.ensure_open()?;

        if let Err(err) = guard::admit(&self.roster, &draft) {
            info!(identifier = %draft.identifier, "duplicate check-in rejected");
            self.emit(CheckInEvent::Rejected {
                identifier: Some(draft.identifier),
                reason: err.to_string(),
            });
            return Err(err);
        }

        let record = AttendeeRecord::from_draft(draft, Utc::now());
        let identifier = record.identifier.clone();
        let stored = match self.with_store(move |store| store.put(&record)).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%identifier, %err, "persisting check-in failed");
                self.emit(CheckInEvent::Rejected {
                    identifier: Some(identifier),
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        self.roster.upsert(stored.clone());
        debug!(identifier = %stored.identifier, "checked in");
        self.emit(CheckInEvent::CheckedIn {
            identifier: stored.identifier.clone(),
        });
        Ok(stored)
    }

    async fn check_in_manual(
        &mut self,
        identifier: &str,
        display_name: &str,
    ) -> CheckInResult<AttendeeRecord> {
        self.ensure_open()?;

        let draft = match ingest::validate_manual(identifier, display_name) {
            Ok(draft) => draft,
            Err(err) => {
                info!(%err, "manual check-in rejected");
                self.emit(CheckInEvent::Rejected {
                    identifier: None,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        self.check_in(draft).await
    }

    async fn scan(&mut self, payload: &str) -> CheckInResult<ScanOutcome> {
        self.ensure_open()?;

        if self.debounce.is_suppressed(Instant::now()) {
            debug!("scan ignored inside debounce window");
            return Ok(ScanOutcome::Suppressed);
        }

        let draft = match ingest::parse_scan_payload(payload) {
            Ok(draft) => draft,
            Err(err) => {
                warn!(%err, "scan payload rejected");
                self.emit(CheckInEvent::Rejected {
                    identifier: None,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        let record = self.check_in(draft).await?;
        self.debounce.arm(Instant::now());
        Ok(ScanOutcome::Accepted(record))
    }

    async fn delete(&mut self, identifier: Identifier) -> CheckInResult<()> {
        self.ensure_open()?;
        let key = identifier.clone();
        self.with_store(move |store| store.delete(&key))
            .await
            .inspect_err(|err| warn!(%identifier, %err, "delete failed"))?;
        let existed = self.roster.remove(&identifier).is_some();
        self.emit(CheckInEvent::Deleted { identifier, existed });
        Ok(())
    }

    async fn clear_all(&mut self) -> CheckInResult<()> {
        self.ensure_open()?;
        self.with_store(|store| store.clear_all())
            .await
            .inspect_err(|err| warn!(%err, "clear failed"))?;
        let removed = self.roster.clear();
        info!(removed, "all check-ins cleared");
        self.emit(CheckInEvent::Cleared { removed });
        Ok(())
    }

    async fn reload(&mut self) -> CheckInResult<usize> {
        self.ensure_open()?;
        let records = self
            .with_store(|store| store.get_all())
            .await
            .inspect_err(|err| warn!(%err, "reload failed"))?;
        self.roster.replace_all(records);
        let count = self.roster.len();
        self.emit(CheckInEvent::Reloaded { count });
        Ok(count)
    }

    async fn sync(&mut self) -> CheckInResult<SyncReceipt> {
        self.ensure_open()?;
        if self.roster.is_empty() {
            debug!("sync requested with nobody checked in");
        }
        let records = self.roster.newest_first_cloned();
        let sync = Arc::clone(&self.sync);
        let receipt = tokio::task::spawn_blocking(move || sync.blocking_lock().submit(&records))
            .await
            .map_err(|e| CheckInError::Worker(format!("join error: {e}")))?
            .inspect_err(|err| warn!(%err, "sync failed"))?;
        self.emit(CheckInEvent::Synced {
            offered: receipt.offered,
            transmitted: receipt.transmitted,
        });
        Ok(receipt)
    }
}
