//! ENI state manager.
//!
//! Maintains a live MAC → device-name map of the hot-pluggable network
//! interfaces attached to the host, combining two sources of truth:
//!
//! - **Events**: a filesystem watcher on the sysfs net directory delivers
//!   create/remove notifications, each handled with a fresh kernel link
//!   lookup. This is the latency optimisation.
//! - **Periodic reconciliation**: every reconciliation interval the link
//!   list is re-enumerated and the map converged against it. This is the
//!   authoritative consolidator; a missed or misordered event is repaired
//!   on the next tick.
//!
//! Transient enumeration or watcher errors are logged and never
//! terminate the manager.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// A kernel network link: device name plus hardware address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Device name, e.g. `eth1`.
    pub name: String,
    /// Canonical IEEE 48-bit MAC address.
    pub mac: String,
}

/// Kernel link enumeration seam.
///
/// The production implementation reads sysfs; any stub honouring the
/// contract is a valid collaborator for tests.
pub trait LinkEnumerator: Send + Sync {
    /// Lists every link currently known to the kernel.
    fn list_links(&self) -> Result<Vec<Link>>;

    /// Looks up one link by device name.
    fn link_by_name(&self, device: &str) -> Result<Link>;
}

/// Link enumerator backed by `/sys/class/net`.
pub struct SysfsLinkEnumerator {
    net_dir: PathBuf,
}

impl SysfsLinkEnumerator {
    /// Creates an enumerator rooted at `net_dir`.
    pub fn new(net_dir: impl Into<PathBuf>) -> Self {
        Self {
            net_dir: net_dir.into(),
        }
    }
}

impl LinkEnumerator for SysfsLinkEnumerator {
    fn list_links(&self) -> Result<Vec<Link>> {
        let mut links = Vec::new();
        for entry in fs::read_dir(&self.net_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            match self.link_by_name(&name) {
                Ok(link) => links.push(link),
                // Interfaces can disappear mid-enumeration.
                Err(err) => debug!(device = %name, %err, "skipping link"),
            }
        }
        Ok(links)
    }

    fn link_by_name(&self, device: &str) -> Result<Link> {
        let address_path = self.net_dir.join(device).join("address");
        let mac = fs::read_to_string(&address_path).map_err(|e| Error::Filesystem {
            path: address_path,
            reason: e.to_string(),
        })?;
        Ok(Link {
            name: device.to_string(),
            mac: mac.trim().to_string(),
        })
    }
}

enum InterfaceEvent {
    Created(PathBuf),
    Removed(PathBuf),
}

/// Maintains the reconciled MAC → device-name map.
pub struct EniStateManager {
    /// MAC => device name. Single writer, many readers.
    enis: RwLock<HashMap<String, String>>,
    enumerator: Arc<dyn LinkEnumerator>,
    device_prefix: String,
    reconciliation_interval: Duration,
    watch_dir: PathBuf,
    watcher: Mutex<Option<notify::RecommendedWatcher>>,
}

impl EniStateManager {
    /// Creates a manager reading the kernel view from sysfs.
    pub fn new(config: &Config) -> Arc<Self> {
        let enumerator = Arc::new(SysfsLinkEnumerator::new(&config.sysfs_net_dir));
        Self::with_enumerator(config, enumerator)
    }

    /// Creates a manager with a custom link enumerator.
    pub fn with_enumerator(config: &Config, enumerator: Arc<dyn LinkEnumerator>) -> Arc<Self> {
        Arc::new(Self {
            enis: RwLock::new(HashMap::new()),
            enumerator,
            device_prefix: config.device_name_prefix.clone(),
            reconciliation_interval: config.reconciliation_interval,
            watch_dir: config.sysfs_net_dir.clone(),
            watcher: Mutex::new(None),
        })
    }

    /// Initializes the map from the current link list and starts the
    /// sysfs watcher with its event consumer task.
    pub fn init(self: &Arc<Self>) -> Result<()> {
        let links = self.enumerator.list_links().map_err(|err| {
            error!(%err, "error retrieving network interfaces");
            err
        })?;
        for link in links {
            if !link.name.starts_with(&self.device_prefix) {
                continue;
            }
            if let Err(err) = self.add_device_with_mac(&link.name, &link.mac) {
                warn!(device = %link.name, %err, "skipping interface");
            }
        }

        let (tx, rx) = mpsc::channel::<InterfaceEvent>(64);
        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        debug!(%err, "interface watcher error");
                        return;
                    }
                };
                for path in event.paths {
                    let message = match event.kind {
                        EventKind::Create(_) => InterfaceEvent::Created(path),
                        EventKind::Remove(_) => InterfaceEvent::Removed(path),
                        _ => continue,
                    };
                    let _ = tx.blocking_send(message);
                }
            })
            .map_err(|e| Error::Filesystem {
                path: self.watch_dir.clone(),
                reason: format!("unable to create watcher: {e}"),
            })?;
        watcher
            .watch(&self.watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Filesystem {
                path: self.watch_dir.clone(),
                reason: format!("unable to watch: {e}"),
            })?;
        *self.watcher.lock().expect("watcher lock poisoned") = Some(watcher);

        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.consume_events(rx).await });

        Ok(())
    }

    /// Runs periodic reconciliation until `token` fires, then stops the
    /// ticker and closes the watcher.
    pub async fn begin_update(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.reconciliation_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial state came
        // from init().
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.reconcile(),
                _ = token.cancelled() => {
                    self.close_watcher();
                    return;
                }
            }
        }
    }

    /// Converges the map against a fresh kernel link list.
    pub fn reconcile(&self) {
        let links = match self.enumerator.list_links() {
            Ok(links) => links,
            Err(err) => {
                error!(%err, "error obtaining link list for reconciliation");
                return;
            }
        };
        let desired = self.build_state(&links);

        // Remove non-existent interfaces first.
        self.enis
            .write()
            .expect("eni map poisoned")
            .retain(|mac, _| desired.contains_key(mac));

        // Add new interfaces next.
        for (mac, device) in desired {
            if !self.device_exists(&mac) {
                if let Err(err) = self.add_device_with_mac(&device, &mac) {
                    warn!(device = %device, %err, "skipping interface");
                }
            }
        }
    }

    /// Returns a snapshot of the MAC → device-name map.
    pub fn get_all(&self) -> HashMap<String, String> {
        self.enis.read().expect("eni map poisoned").clone()
    }

    /// Returns true if a device is recorded for `mac`.
    pub fn device_exists(&self, mac: &str) -> bool {
        self.enis.read().expect("eni map poisoned").contains_key(mac)
    }

    /// Records `device` under `mac` after validating both.
    ///
    /// Invalid input mutates nothing. A re-add overwrites.
    pub fn add_device_with_mac(&self, device: &str, mac: &str) -> Result<()> {
        debug!(device, mac, "adding device");

        if !self.is_valid_device(device) {
            return Err(Error::InvalidDeviceName(device.to_string()));
        }
        if !is_valid_mac(mac) {
            return Err(Error::InvalidMacAddress(mac.to_string()));
        }

        self.enis
            .write()
            .expect("eni map poisoned")
            .insert(mac.to_string(), device.to_string());
        Ok(())
    }

    /// Records the device at `path`, looking up its MAC from the kernel.
    pub fn add_device(&self, path: &Path) -> Result<()> {
        let device = device_basename(path)?;
        if !self.is_valid_device(&device) {
            return Err(Error::InvalidDeviceName(device));
        }

        let link = self.enumerator.link_by_name(&device)?;
        self.add_device_with_mac(&device, &link.mac)
    }

    /// Removes the record stored under `mac`.
    pub fn remove_device_with_mac(&self, mac: &str) -> Result<()> {
        debug!(mac, "removing device with MAC");

        if !is_valid_mac(mac) {
            return Err(Error::InvalidMacAddress(mac.to_string()));
        }

        self.enis.write().expect("eni map poisoned").remove(mac);
        Ok(())
    }

    /// Removes every record pointing at `device`.
    pub fn remove_device(&self, device: &str) -> Result<()> {
        debug!(device, "removing device");

        if !self.is_valid_device(device) {
            return Err(Error::InvalidDeviceName(device.to_string()));
        }

        self.enis
            .write()
            .expect("eni map poisoned")
            .retain(|_, name| name != device);
        Ok(())
    }

    async fn consume_events(&self, mut rx: mpsc::Receiver<InterfaceEvent>) {
        while let Some(event) = rx.recv().await {
            let result = match event {
                InterfaceEvent::Created(path) => self.add_device(&path),
                InterfaceEvent::Removed(path) => {
                    device_basename(&path).and_then(|device| self.remove_device(&device))
                }
            };
            if let Err(err) = result {
                debug!(%err, "ignoring interface event");
            }
        }
        debug!("interface event channel closed");
    }

    fn close_watcher(&self) {
        // Dropping the watcher closes the event channel, which ends the
        // consumer task.
        self.watcher.lock().expect("watcher lock poisoned").take();
    }

    fn build_state(&self, links: &[Link]) -> HashMap<String, String> {
        links
            .iter()
            .filter(|link| link.name.starts_with(&self.device_prefix))
            .map(|link| (link.mac.clone(), link.name.clone()))
            .collect()
    }

    fn is_valid_device(&self, device: &str) -> bool {
        device.starts_with(&self.device_prefix)
    }
}

/// Validates a canonical IEEE 48-bit MAC address
/// (`aa:bb:cc:dd:ee:ff`). Any other form is invalid.
pub fn is_valid_mac(mac: &str) -> bool {
    let mut octets = 0;
    for octet in mac.split(':') {
        if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        octets += 1;
    }
    octets == 6
}

fn device_basename(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidDeviceName(path.display().to_string()))
}
