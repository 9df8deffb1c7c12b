//! Online/offline state with a single writer and any number of readers.

use log::info;
use tokio::sync::watch;

/// Current connectivity plus how many offline-to-online edges have occurred.
///
/// The counter lets subscribers tell a fresh reconnect from a value they
/// have already acted on, even when several edges land between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    pub online: bool,
    pub reconnects: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEdge {
    CameOnline,
    WentOffline,
}

/// Owns the connectivity state. Only the tracker can change it.
///
/// Dropping the tracker closes every subscription.
#[derive(Debug)]
pub struct ConnectivityTracker {
    tx: watch::Sender<ConnectivitySnapshot>,
}

impl ConnectivityTracker {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(ConnectivitySnapshot {
            online: initially_online,
            reconnects: 0,
        });
        Self { tx }
    }

    /// Read-only view for the overlay and any other consumer.
    pub fn handle(&self) -> ConnectivityHandle {
        ConnectivityHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    /// Applies an external online/offline signal.
    ///
    /// Returns the edge when the state actually changed; repeated signals
    /// with the current value are ignored.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEdge> {
        let changed = self.tx.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.reconnects += 1;
            }
            true
        });
        if !changed {
            return None;
        }
        if online {
            info!("[Connectivity] Back online");
            Some(ConnectivityEdge::CameOnline)
        } else {
            info!("[Connectivity] Gone offline");
            Some(ConnectivityEdge::WentOffline)
        }
    }

    pub fn went_online(&self) -> Option<ConnectivityEdge> {
        self.set_online(true)
    }

    pub fn went_offline(&self) -> Option<ConnectivityEdge> {
        self.set_online(false)
    }
}

impl Default for ConnectivityTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectivityHandle {
    rx: watch::Receiver<ConnectivitySnapshot>,
}

impl ConnectivityHandle {
    pub fn is_online(&self) -> bool {
        self.rx.borrow().online
    }

    pub fn check_online_status(&self) -> bool {
        self.is_online()
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        *self.rx.borrow()
    }

    /// A fresh receiver for edge notifications.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivitySnapshot> {
        self.rx.clone()
    }
}
