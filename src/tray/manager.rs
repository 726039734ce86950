//! Tray manager
//!
//! Runs on a dedicated OS thread and owns the Win32 message loop, the tray
//! icon, and the menu. Menu clicks become [`TrayCommand`]s; periodic status
//! snapshots from the runtime drive the icon color and menu text.

use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::{debug, trace, warn};

use super::icons::{generate_icon_bytes, IconState};
use super::{StatusSnapshot, TrayCommand, TrayUpdate};
use crate::xinput::MAX_CONTROLLERS;

pub struct TrayManager {
    update_rx: crossbeam::channel::Receiver<TrayUpdate>,
    command_tx: crossbeam::channel::Sender<TrayCommand>,
    status: StatusSnapshot,
    last_menu_hash: u64,
    last_icon: Option<IconState>,
}

impl TrayManager {
    pub fn new(
        update_rx: crossbeam::channel::Receiver<TrayUpdate>,
        command_tx: crossbeam::channel::Sender<TrayCommand>,
    ) -> Self {
        Self {
            update_rx,
            command_tx,
            status: StatusSnapshot::default(),
            last_menu_hash: 0,
            last_icon: None,
        }
    }

    /// Run the tray UI; blocks the current thread until quit.
    pub fn run(mut self) -> anyhow::Result<()> {
        debug!("Starting tray manager");

        let icon_bytes = generate_icon_bytes(IconState::Disconnected);
        let icon = tray_icon::Icon::from_rgba(icon_bytes, 16, 16)
            .map_err(|e| anyhow::anyhow!("Failed to create icon: {}", e))?;

        let tray_icon = tray_icon::TrayIconBuilder::new()
            .with_icon(icon)
            .with_tooltip("MetroPad - waiting for controller")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create tray icon: {}", e))?;

        let menu = self.build_menu()?;
        tray_icon.set_menu(Some(Box::new(menu)));
        self.last_menu_hash = self.menu_hash();
        debug!("Tray icon and menu created");

        let menu_channel = muda::MenuEvent::receiver();

        loop {
            self.pump_windows_messages();

            while let Ok(event) = menu_channel.try_recv() {
                trace!("Menu event: {:?}", event.id);
                if !self.handle_menu_event(event.id.as_ref()) {
                    self.remove_icon(&tray_icon);
                    return Ok(());
                }
            }

            let update = match self
                .update_rx
                .recv_timeout(std::time::Duration::from_millis(50))
            {
                Ok(update) => update,
                Err(crossbeam::channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
            };

            let TrayUpdate::Status(snapshot) = update;
            self.status = snapshot;

            let icon_state = self.icon_state();
            if self.last_icon != Some(icon_state) {
                let bytes = generate_icon_bytes(icon_state);
                if let Ok(new_icon) = tray_icon::Icon::from_rgba(bytes, 16, 16) {
                    let _ = tray_icon.set_icon(Some(new_icon));
                }
                self.last_icon = Some(icon_state);
            }

            let new_hash = self.menu_hash();
            if new_hash != self.last_menu_hash {
                let _ = tray_icon.set_tooltip(Some(&self.tooltip()));
                if let Ok(new_menu) = self.build_menu() {
                    tray_icon.set_menu(Some(Box::new(new_menu)));
                    self.last_menu_hash = new_hash;
                    trace!("Tray menu rebuilt");
                }
            }
        }

        self.remove_icon(&tray_icon);
        Ok(())
    }

    /// Returns false when the loop should exit.
    fn handle_menu_event(&self, id: &str) -> bool {
        match id {
            "quit" => {
                debug!("Quit selected from tray menu");
                let _ = self.command_tx.try_send(TrayCommand::Shutdown);
                return false;
            },
            "vibe_test" => {
                let _ = self.command_tx.try_send(TrayCommand::TestVibration);
            },
            "toggle_mapping" => {
                let _ = self.command_tx.try_send(TrayCommand::ToggleMapping);
            },
            other => {
                if let Some(slot) = other.strip_prefix("select_") {
                    match slot.parse::<u32>() {
                        Ok(index) if (index as usize) < MAX_CONTROLLERS => {
                            let _ = self.command_tx.try_send(TrayCommand::SelectController(index));
                        },
                        _ => warn!("Bad slot in menu id: {}", other),
                    }
                } else {
                    debug!("Unknown menu item: {}", other);
                }
            },
        }
        true
    }

    fn build_menu(&self) -> anyhow::Result<muda::Menu> {
        let menu = muda::Menu::new();

        let title = muda::MenuItem::new("MetroPad", false, None);
        menu.append(&title)?;
        menu.append(&muda::PredefinedMenuItem::separator())?;

        for (i, slot) in self.status.slots.iter().enumerate() {
            let text = if slot.connected {
                format!("Controller {}: {}", i + 1, slot.battery)
            } else {
                format!("Controller {}: not connected", i + 1)
            };
            menu.append(&muda::MenuItem::new(&text, false, None))?;
        }
        menu.append(&muda::PredefinedMenuItem::separator())?;

        let selector = muda::Submenu::new("Map controller", true);
        for (i, slot) in self.status.slots.iter().enumerate() {
            let check = if self.status.selected == Some(i as u32) {
                "\u{2713} "
            } else {
                ""
            };
            let item = muda::MenuItem::with_id(
                format!("select_{}", i),
                format!("{}Controller {}", check, i + 1),
                slot.connected,
                None,
            );
            selector.append(&item)?;
        }
        menu.append(&selector)?;

        let vibe = muda::MenuItem::with_id(
            "vibe_test",
            "Test vibration",
            self.status.selected.is_some(),
            None,
        );
        menu.append(&vibe)?;

        let toggle_text = if self.status.mapping_paused {
            "Resume mapping"
        } else {
            "Pause mapping"
        };
        let toggle = muda::MenuItem::with_id("toggle_mapping", toggle_text, true, None);
        menu.append(&toggle)?;

        menu.append(&muda::PredefinedMenuItem::separator())?;
        menu.append(&muda::MenuItem::with_id("quit", "Quit", true, None))?;

        Ok(menu)
    }

    fn icon_state(&self) -> IconState {
        let any_connected = self.status.slots.iter().any(|s| s.connected);
        if !any_connected {
            IconState::Disconnected
        } else if self.status.mapping_paused {
            IconState::Paused
        } else {
            IconState::Active
        }
    }

    fn tooltip(&self) -> String {
        match self.status.selected {
            Some(index) => {
                let slot = self.status.slots[index as usize];
                let state = if self.status.mapping_paused {
                    "paused"
                } else {
                    "active"
                };
                format!("MetroPad - controller {} ({}), {}", index + 1, slot.battery, state)
            },
            None => "MetroPad - waiting for controller".to_string(),
        }
    }

    /// Menu content only changes when the snapshot changes, so hashing the
    /// snapshot is enough to skip redundant rebuilds.
    fn menu_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        format!("{:?}", self.status).hash(&mut hasher);
        hasher.finish()
    }

    fn remove_icon(&self, tray_icon: &tray_icon::TrayIcon) {
        debug!("Tray manager shutting down, removing icon");
        if let Err(e) = tray_icon.set_visible(false) {
            warn!("Failed to hide tray icon: {}", e);
        }
    }

    /// Drain the thread's Win32 message queue; required for tray and menu
    /// events to be delivered.
    fn pump_windows_messages(&self) {
        use windows::Win32::UI::WindowsAndMessaging::{
            DispatchMessageW, PeekMessageW, TranslateMessage, PM_REMOVE,
        };

        unsafe {
            let mut msg = std::mem::zeroed();
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tray::SlotStatus;
    use crate::xinput::{BatteryInfo, BatteryLevel, BatteryType};

    fn manager_with(status: StatusSnapshot) -> TrayManager {
        let (_update_tx, update_rx) = crossbeam::channel::unbounded();
        let (command_tx, _command_rx) = crossbeam::channel::unbounded();
        let mut mgr = TrayManager::new(update_rx, command_tx);
        mgr.status = status;
        mgr
    }

    fn connected_slot() -> SlotStatus {
        SlotStatus {
            connected: true,
            battery: BatteryInfo {
                ty: BatteryType::Alkaline,
                level: BatteryLevel::Full,
            },
        }
    }

    #[test]
    fn icon_reflects_connection_and_pause() {
        let mut status = StatusSnapshot::default();
        assert_eq!(manager_with(status).icon_state(), IconState::Disconnected);

        status.slots[1] = connected_slot();
        assert_eq!(manager_with(status).icon_state(), IconState::Active);

        status.mapping_paused = true;
        assert_eq!(manager_with(status).icon_state(), IconState::Paused);
    }

    #[test]
    fn menu_hash_tracks_snapshot_changes() {
        let mut status = StatusSnapshot::default();
        let base = manager_with(status).menu_hash();
        assert_eq!(manager_with(status).menu_hash(), base);

        status.slots[0] = connected_slot();
        assert_ne!(manager_with(status).menu_hash(), base);
    }

    #[test]
    fn menu_events_map_to_commands() {
        let (_update_tx, update_rx) = crossbeam::channel::unbounded();
        let (command_tx, command_rx) = crossbeam::channel::unbounded();
        let mgr = TrayManager::new(update_rx, command_tx);

        assert!(mgr.handle_menu_event("select_2"));
        assert_eq!(command_rx.try_recv(), Ok(TrayCommand::SelectController(2)));

        assert!(mgr.handle_menu_event("vibe_test"));
        assert_eq!(command_rx.try_recv(), Ok(TrayCommand::TestVibration));

        assert!(mgr.handle_menu_event("toggle_mapping"));
        assert_eq!(command_rx.try_recv(), Ok(TrayCommand::ToggleMapping));

        // Out-of-range slot is ignored
        assert!(mgr.handle_menu_event("select_9"));
        assert!(command_rx.try_recv().is_err());

        assert!(!mgr.handle_menu_event("quit"));
        assert_eq!(command_rx.try_recv(), Ok(TrayCommand::Shutdown));
    }

    #[test]
    fn tooltip_names_selected_controller() {
        let mut status = StatusSnapshot::default();
        status.slots[0] = connected_slot();
        status.selected = Some(0);

        let tooltip = manager_with(status).tooltip();
        assert!(tooltip.contains("controller 1"));
        assert!(tooltip.contains("active"));

        status.mapping_paused = true;
        assert!(manager_with(status).tooltip().contains("paused"));
    }
}
