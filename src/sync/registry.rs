//! Address watch registry.
//!
//! Owns the in-memory [`AccountState`] of every monitored address and
//! publishes the set of enabled ("active") addresses. Subscribers only ever
//! see the newest complete set; intermediate values may be skipped.

use crate::db::account;
use crate::models::{now_millis, AccountSnapshot, AccountState, Address, MonitoredAccount};
use crate::node::{NodeClient, NodeError};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Immutable snapshot of the enabled addresses.
pub type ActiveAddresses = Arc<BTreeSet<Address>>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Address {0} not found")]
    NotFound(Address),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),
}

pub struct AccountRegistry {
    pool: SqlitePool,
    states: RwLock<HashMap<Address, AccountState>>,
    active: watch::Sender<ActiveAddresses>,
    // Serializes create/enable/disable so memory and storage agree
    mutations: Mutex<()>,
}

impl AccountRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        let (active, _) = watch::channel(ActiveAddresses::default());
        Self {
            pool,
            states: RwLock::new(HashMap::new()),
            active,
            mutations: Mutex::new(()),
        }
    }

    /// Builds the registry from storage, seeds the snapshots from the node
    /// and publishes the initial active set.
    pub async fn load(pool: SqlitePool, node: &dyn NodeClient) -> Result<Self, RegistryError> {
        let registry = Self::new(pool);

        let accounts = account::find_all_accounts(&registry.pool).await?;
        info!("Found {} addresses", accounts.len());

        let mut states = HashMap::with_capacity(accounts.len());
        for account in accounts {
            match Address::parse_path(&account.address) {
                Ok(address) => {
                    states.insert(address, AccountState { address, account, snapshot: None });
                }
                Err(e) => warn!("Skipping stored account {}: {}", account.address, e),
            }
        }

        let addresses: Vec<Address> = states.keys().copied().collect();
        match node.fetch_account_snapshots(&addresses).await {
            Ok(snapshots) => {
                for snapshot in snapshots {
                    if let Some(state) = states.get_mut(&snapshot.address()) {
                        state.snapshot = Some(snapshot);
                    }
                }
            }
            // The snapshot stream fills these in once it connects
            Err(e) => warn!("Failed to fetch initial account snapshots: {}", e),
        }

        let loaded = states.len();
        *registry.write_states() = states;
        registry.refresh_active();

        info!("Loaded {} addresses", loaded);
        Ok(registry)
    }

    /// Starts monitoring `address`, or re-enables it if it is already known.
    pub async fn create(&self, address: Address) -> Result<MonitoredAccount, RegistryError> {
        let _guard = self.mutations.lock().await;
        info!("Start monitoring of account {}", address);

        if account::find_account(&self.pool, &address).await?.is_some() {
            info!("Account {} is already known. Enabling instead...", address);
            return self.set_enabled(address, true).await;
        }

        let Some(account) = account::insert_account(&self.pool, &address, now_millis()).await? else {
            info!("Account {} was created concurrently. Enabling instead...", address);
            return self.set_enabled(address, true).await;
        };

        self.write_states()
            .entry(address)
            .and_modify(|state| state.account = account.clone())
            .or_insert_with(|| AccountState {
                address,
                account: account.clone(),
                snapshot: None,
            });
        self.refresh_active();

        info!("Account {} monitoring added successfully", address);
        Ok(account)
    }

    pub async fn enable(&self, address: Address) -> Result<MonitoredAccount, RegistryError> {
        let _guard = self.mutations.lock().await;
        self.set_enabled(address, true).await
    }

    pub async fn disable(&self, address: Address) -> Result<MonitoredAccount, RegistryError> {
        let _guard = self.mutations.lock().await;
        self.set_enabled(address, false).await
    }

    async fn set_enabled(&self, address: Address, enabled: bool) -> Result<MonitoredAccount, RegistryError> {
        let account = account::find_account(&self.pool, &address)
            .await?
            .ok_or(RegistryError::NotFound(address))?;

        if account.is_enabled() == enabled {
            info!(
                "Account {} is already {}",
                address,
                if enabled { "enabled" } else { "disabled" }
            );
            return Ok(account);
        }

        let now = now_millis();
        let disabled_at = if enabled { None } else { Some(now) };
        let account = account::update_disabled_at(&self.pool, &address, disabled_at, now)
            .await?
            .ok_or(RegistryError::NotFound(address))?;

        self.write_states()
            .entry(address)
            .and_modify(|state| state.account = account.clone())
            .or_insert_with(|| AccountState {
                address,
                account: account.clone(),
                snapshot: None,
            });
        self.refresh_active();

        match account.disabled_at {
            Some(at) => info!("Account {} has been disabled at {}", address, at),
            None => info!("Account {} has been enabled", address),
        }
        Ok(account)
    }

    /// Replaces the stored snapshot of a tracked address. Snapshots for
    /// unknown addresses are dropped. Returns whether the update applied.
    pub fn apply_snapshot_update(&self, snapshot: AccountSnapshot) -> bool {
        let address = snapshot.address();
        match self.write_states().get_mut(&address) {
            Some(state) => {
                state.snapshot = Some(snapshot);
                true
            }
            None => {
                debug!("Ignoring snapshot for untracked address {}", address);
                false
            }
        }
    }

    pub fn current_active_addresses(&self) -> ActiveAddresses {
        self.active.borrow().clone()
    }

    /// Receiver that always yields the newest active set.
    pub fn subscribe(&self) -> watch::Receiver<ActiveAddresses> {
        self.active.subscribe()
    }

    pub fn account_details(&self, address: &Address) -> Option<AccountSnapshot> {
        self.read_states().get(address).and_then(|state| state.snapshot.clone())
    }

    pub fn account_map(&self) -> HashMap<Address, Option<AccountSnapshot>> {
        self.read_states()
            .iter()
            .map(|(address, state)| (*address, state.snapshot.clone()))
            .collect()
    }

    pub async fn find(&self, address: &Address) -> Result<Option<MonitoredAccount>, RegistryError> {
        Ok(account::find_account(&self.pool, address).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<MonitoredAccount>, RegistryError> {
        Ok(account::find_all_accounts(&self.pool).await?)
    }

    fn refresh_active(&self) {
        // Computed and published under the read guard so a stale set can
        // never overwrite a newer one.
        let states = self.read_states();
        let active: BTreeSet<Address> = states
            .values()
            .filter(|state| state.is_enabled())
            .map(|state| state.address)
            .collect();
        let count = active.len();

        let changed = self.active.send_if_modified(|current| {
            if **current == active {
                return false;
            }
            *current = Arc::new(active);
            true
        });
        drop(states);

        if changed {
            info!("Refreshed {} active addresses", count);
        }
    }

    fn read_states(&self) -> RwLockReadGuard<'_, HashMap<Address, AccountState>> {
        self.states.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_states(&self) -> RwLockWriteGuard<'_, HashMap<Address, AccountState>> {
        self.states.write().unwrap_or_else(PoisonError::into_inner)
    }
}
