//! Tray bridge
//!
//! Spawns the tray UI thread and bridges it to the Tokio runtime: a
//! forwarder thread moves menu commands from the crossbeam channel into a
//! Tokio channel the main loop can select on, and a publisher task samples
//! controller status into periodic snapshots for the menu.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{SessionState, SlotStatus, StatusSnapshot, TrayCommand, TrayManager, TrayUpdate};
use crate::xinput::ControllerHub;

/// How often the publisher refreshes the menu content
const STATUS_INTERVAL: Duration = Duration::from_millis(500);

/// Handles to a running tray UI
pub struct TrayHandle {
    /// Commands from menu clicks, bridged into the Tokio runtime
    pub commands: mpsc::UnboundedReceiver<TrayCommand>,
    /// Sender for status snapshots
    pub updates: crossbeam::channel::Sender<TrayUpdate>,
}

/// Start the tray UI on its own OS thread and bridge its channels.
pub fn spawn_tray() -> anyhow::Result<TrayHandle> {
    let (update_tx, update_rx) = crossbeam::channel::unbounded::<TrayUpdate>();
    let (command_tx, command_rx) = crossbeam::channel::unbounded::<TrayCommand>();
    let (bridged_tx, bridged_rx) = mpsc::unbounded_channel::<TrayCommand>();

    std::thread::Builder::new()
        .name("metropad-tray".into())
        .spawn(move || {
            if let Err(e) = TrayManager::new(update_rx, command_tx).run() {
                warn!("Tray manager exited with error: {}", e);
            }
        })?;

    // Blocking recv on the crossbeam side, so it gets its own thread too.
    std::thread::Builder::new()
        .name("metropad-tray-bridge".into())
        .spawn(move || {
            while let Ok(command) = command_rx.recv() {
                if bridged_tx.send(command).is_err() {
                    break;
                }
            }
            debug!("Tray command bridge stopped");
        })?;

    Ok(TrayHandle {
        commands: bridged_rx,
        updates: update_tx,
    })
}

/// Tokio task that periodically publishes controller status to the tray
pub struct TrayStatusPublisher {
    update_tx: crossbeam::channel::Sender<TrayUpdate>,
    hub: Arc<ControllerHub>,
    session: Arc<RwLock<SessionState>>,
}

impl TrayStatusPublisher {
    pub fn new(
        update_tx: crossbeam::channel::Sender<TrayUpdate>,
        hub: Arc<ControllerHub>,
        session: Arc<RwLock<SessionState>>,
    ) -> Self {
        Self {
            update_tx,
            hub,
            session,
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        let session = *self.session.read();
        let slots = std::array::from_fn(|i| {
            let controller = self.hub.controller(i as u32);
            SlotStatus {
                connected: controller.is_connected(),
                battery: controller.gamepad_battery(),
            }
        });
        StatusSnapshot {
            slots,
            selected: session.selected,
            mapping_paused: session.mapping_paused,
        }
    }

    /// Publish snapshots until the tray side hangs up.
    pub async fn run(self) {
        debug!("Tray status publisher started");
        let mut ticker = tokio::time::interval(STATUS_INTERVAL);
        loop {
            ticker.tick().await;
            let update = TrayUpdate::Status(self.snapshot());
            if self.update_tx.send(update).is_err() {
                debug!("Tray update channel closed, publisher stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xinput::gateway::testing::ScriptedGateway;
    use crate::xinput::state::{ControllerState, GamepadSnapshot};
    use crate::xinput::GamepadGateway;

    fn publisher_with_connected_slot0() -> (TrayStatusPublisher, Arc<RwLock<SessionState>>) {
        let gateway = Arc::new(ScriptedGateway::connected(vec![ControllerState {
            packet: 1,
            pad: GamepadSnapshot::default(),
        }]));
        let hub = Arc::new(ControllerHub::new(gateway as Arc<dyn GamepadGateway>));
        for controller in hub.controllers().iter() {
            controller.update_state();
        }

        let session = Arc::new(RwLock::new(SessionState {
            selected: Some(0),
            mapping_paused: false,
        }));
        let (update_tx, _update_rx) = crossbeam::channel::unbounded();
        (
            TrayStatusPublisher::new(update_tx, hub, Arc::clone(&session)),
            session,
        )
    }

    #[test]
    fn snapshot_reflects_hub_and_session() {
        let (publisher, session) = publisher_with_connected_slot0();

        let snap = publisher.snapshot();
        assert!(snap.slots[0].connected);
        assert!(!snap.slots[1].connected);
        assert_eq!(snap.selected, Some(0));
        assert!(!snap.mapping_paused);

        session.write().mapping_paused = true;
        assert!(publisher.snapshot().mapping_paused);
    }
}
