//! Controller hub - registry and polling loop
//!
//! Owns the four controller slots and the background sampling thread that
//! refreshes them. Constructed once by the process entry point and passed to
//! whatever consumes it; there are no globals, so tests can run independent
//! hubs side by side.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::controller::{Controller, StateChange};
use super::gateway::GamepadGateway;

/// Maximum number of controllers supported by XInput
pub const MAX_CONTROLLERS: usize = 4;

/// Default sampling rate in updates per second
pub const DEFAULT_RATE_HZ: u32 = 25;

/// Recognized range for the sampling rate
pub const MIN_RATE_HZ: u32 = 1;
pub const MAX_RATE_HZ: u32 = 1000;

/// State shared with the sampling thread
struct PollShared {
    /// Cooperative stop flag, observed at the top of each sweep
    stop: AtomicBool,
    /// Guards against two loops racing to start; cleared by the loop on exit
    running: Mutex<bool>,
    /// Sleep interval between sweeps, derived from the configured rate
    interval_ms: AtomicU64,
    /// Incremented once per loop entry
    loop_entries: AtomicU64,
}

/// Fixed registry of four controller slots plus the sampling loop
pub struct ControllerHub {
    controllers: [Arc<Controller>; MAX_CONTROLLERS],
    poll: Arc<PollShared>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<StateChange>>>,
}

impl ControllerHub {
    /// Create the hub with its four slots, in index order.
    pub fn new(gateway: Arc<dyn GamepadGateway>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controllers = std::array::from_fn(|i| {
            Arc::new(Controller::new(i as u32, Arc::clone(&gateway), tx.clone()))
        });

        let hub = Self {
            controllers,
            poll: Arc::new(PollShared {
                stop: AtomicBool::new(false),
                running: Mutex::new(false),
                interval_ms: AtomicU64::new(0),
                loop_entries: AtomicU64::new(0),
            }),
            event_rx: Mutex::new(Some(rx)),
        };
        hub.set_rate(DEFAULT_RATE_HZ);
        hub
    }

    /// Look up a slot by index; panics on an out-of-range index, which is a
    /// programming error (the valid range is a compile-time constant).
    pub fn controller(&self, index: u32) -> &Arc<Controller> {
        &self.controllers[index as usize]
    }

    pub fn controllers(&self) -> &[Arc<Controller>; MAX_CONTROLLERS] {
        &self.controllers
    }

    /// Take the state-change receiver. Yields `Some` exactly once.
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<StateChange>> {
        self.event_rx.lock().take()
    }

    /// Set the sampling rate in updates per second, clamped to [1, 1000].
    ///
    /// The live loop picks the new interval up on its next sweep.
    pub fn set_rate(&self, updates_per_second: u32) {
        let rate = updates_per_second.clamp(MIN_RATE_HZ, MAX_RATE_HZ);
        if rate != updates_per_second {
            warn!(
                "Sampling rate {} outside [{}, {}], clamped to {}",
                updates_per_second, MIN_RATE_HZ, MAX_RATE_HZ, rate
            );
        }
        self.poll.interval_ms.store((1000 / rate) as u64, Ordering::SeqCst);
    }

    /// Current sleep interval between sweeps.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms.load(Ordering::SeqCst))
    }

    /// Spawn the sampling loop. No-op if one is already running.
    pub fn start_polling(&self) {
        let mut running = self.poll.running.lock();
        if *running {
            debug!("Sampling loop already running, ignoring start request");
            return;
        }
        *running = true;
        self.poll.stop.store(false, Ordering::SeqCst);

        let controllers = self.controllers.clone();
        let shared = Arc::clone(&self.poll);

        let spawned = std::thread::Builder::new()
            .name("metropad-poll".into())
            .spawn(move || {
                shared.loop_entries.fetch_add(1, Ordering::SeqCst);
                debug!("Sampling loop started");

                while !shared.stop.load(Ordering::SeqCst) {
                    for controller in controllers.iter() {
                        controller.update_state();
                    }
                    let interval = shared.interval_ms.load(Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(interval));
                }

                *shared.running.lock() = false;
                debug!("Sampling loop stopped");
            });

        if let Err(e) = spawned {
            *running = false;
            warn!("Failed to spawn sampling thread: {}", e);
        }
    }

    /// Request the sampling loop to stop after its current sweep.
    ///
    /// Cooperative, not immediate: a sleep already in progress delays
    /// shutdown by up to one interval.
    pub fn stop_polling(&self) {
        if *self.poll.running.lock() {
            self.poll.stop.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_polling(&self) -> bool {
        *self.poll.running.lock()
    }

    /// How many times a sampling loop has been entered since construction.
    pub fn poll_loop_entries(&self) -> u64 {
        self.poll.loop_entries.load(Ordering::SeqCst)
    }

    /// Refresh every slot once and return the lowest connected index.
    ///
    /// Used at startup to pick the initially selected controller; returns
    /// `None` when no controller is plugged in.
    pub fn first_connected(&self) -> Option<u32> {
        for controller in self.controllers.iter() {
            if controller.update_state().is_connected() {
                info!("Found connected controller: {}", controller.index() + 1);
                return Some(controller.index());
            }
        }
        debug!("No connected controller found");
        None
    }
}

impl Drop for ControllerHub {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xinput::gateway::testing::ScriptedGateway;
    use crate::xinput::state::{buttons, ControllerState, GamepadSnapshot};

    fn state(packet: u32, button_bits: u16) -> ControllerState {
        ControllerState {
            packet,
            pad: GamepadSnapshot {
                buttons: button_bits,
                ..Default::default()
            },
        }
    }

    #[test]
    fn rate_is_clamped_into_valid_range() {
        let hub = ControllerHub::new(Arc::new(ScriptedGateway::new(vec![])));

        hub.set_rate(0);
        assert_eq!(hub.interval(), Duration::from_millis(1000));

        hub.set_rate(5000);
        assert_eq!(hub.interval(), Duration::from_millis(1));

        hub.set_rate(25);
        assert_eq!(hub.interval(), Duration::from_millis(40));
    }

    #[test]
    fn sweep_queries_slots_in_index_order() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let hub = ControllerHub::new(Arc::clone(&gateway) as Arc<dyn GamepadGateway>);

        for controller in hub.controllers().iter() {
            controller.update_state();
        }

        assert_eq!(*gateway.queried_slots.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn double_start_runs_exactly_one_loop() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let hub = Arc::new(ControllerHub::new(
            Arc::clone(&gateway) as Arc<dyn GamepadGateway>
        ));
        hub.set_rate(1000);

        let a = {
            let hub = Arc::clone(&hub);
            std::thread::spawn(move || hub.start_polling())
        };
        let b = {
            let hub = Arc::clone(&hub);
            std::thread::spawn(move || hub.start_polling())
        };
        a.join().unwrap();
        b.join().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(hub.poll_loop_entries(), 1);

        hub.stop_polling();
    }

    #[test]
    fn stop_is_cooperative_and_start_is_reentrant_after_stop() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let hub = ControllerHub::new(Arc::clone(&gateway) as Arc<dyn GamepadGateway>);
        hub.set_rate(1000);

        hub.start_polling();
        assert!(hub.is_polling());
        hub.stop_polling();

        // The loop observes the flag between sweeps.
        std::thread::sleep(Duration::from_millis(50));
        assert!(!hub.is_polling());

        hub.start_polling();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(hub.poll_loop_entries(), 2);
        hub.stop_polling();
    }

    #[test]
    fn first_connected_picks_lowest_index() {
        // Slot 0 scripted as connected
        let gateway = Arc::new(ScriptedGateway::connected(vec![state(1, 0)]));
        let hub = ControllerHub::new(gateway as Arc<dyn GamepadGateway>);
        assert_eq!(hub.first_connected(), Some(0));
    }

    #[test]
    fn no_controllers_yields_none() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Err(
            crate::xinput::GatewayError::NotConnected(0),
        )]));
        let hub = ControllerHub::new(gateway as Arc<dyn GamepadGateway>);
        assert_eq!(hub.first_connected(), None);
    }

    /// End-to-end sweep: packet 1 then 2 with A pressed produces exactly one
    /// state-change event for slot 0.
    #[test]
    fn packet_advance_produces_single_event() {
        let gateway = Arc::new(ScriptedGateway::connected(vec![
            state(1, 0),
            state(2, buttons::A),
            state(2, buttons::A),
        ]));
        let hub = ControllerHub::new(gateway as Arc<dyn GamepadGateway>);
        let mut rx = hub.take_event_receiver().expect("receiver");

        for controller in hub.controllers().iter() {
            controller.update_state();
        }
        // Drain the initial 0 -> 1 transition.
        let initial = rx.try_recv().expect("initial event");
        assert_eq!(initial.index, 0);

        for controller in hub.controllers().iter() {
            controller.update_state();
        }
        let change = rx.try_recv().expect("press event");
        assert_eq!(change.index, 0);
        assert!(change.current.pad.pressed(crate::xinput::Button::A));
        assert!(!change.previous.pad.pressed(crate::xinput::Button::A));
        assert!(rx.try_recv().is_err());

        // Unchanged packet: no further events.
        for controller in hub.controllers().iter() {
            controller.update_state();
        }
        assert!(rx.try_recv().is_err());
    }

    /// Same scenario end to end: the press event drives the mapper, which
    /// synthesizes exactly one Enter key-down and no key-up.
    #[test]
    fn press_event_drives_single_enter_down() {
        use crate::mapper::{MapperSettings, MetroMapper};
        use crate::synth::{InputEvent, InputSink, SynthError, VirtualKey};

        #[derive(Default)]
        struct CollectSink(Vec<InputEvent>);
        impl InputSink for CollectSink {
            fn send(&mut self, events: &[InputEvent]) -> Result<(), SynthError> {
                self.0.extend_from_slice(events);
                Ok(())
            }
        }

        let gateway = Arc::new(ScriptedGateway::connected(vec![
            state(1, 0),
            state(2, buttons::A),
        ]));
        let hub = ControllerHub::new(gateway as Arc<dyn GamepadGateway>);
        let mut rx = hub.take_event_receiver().expect("receiver");
        let mut mapper = MetroMapper::new(CollectSink::default(), MapperSettings::default());

        for _ in 0..2 {
            for controller in hub.controllers().iter() {
                controller.update_state();
            }
        }

        let mut synthesized = Vec::new();
        while let Ok(change) = rx.try_recv() {
            mapper.apply(&change.current.pad).unwrap();
            synthesized = mapper.sink().0.clone();
        }

        assert_eq!(synthesized, vec![InputEvent::KeyDown(VirtualKey::Return)]);
    }

    #[test]
    fn receiver_can_only_be_taken_once() {
        let hub = ControllerHub::new(Arc::new(ScriptedGateway::new(vec![])));
        assert!(hub.take_event_receiver().is_some());
        assert!(hub.take_event_receiver().is_none());
    }
}
