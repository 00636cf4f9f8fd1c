use std::sync::{Mutex, PoisonError};

use tokio::sync::{watch, OnceCell};

use crate::device::{SessionError, Transport, TransportOutput};
use crate::prelude::*;
use crate::protocol::*;

/// A connection-scoped handle to one machine.
///
/// Clones share the same [`DeviceState`]. Every mutation, whether it comes from a command or from
/// an inbound notification, goes through one lock, and the resulting snapshot is published to
/// [`DeviceSession::subscribe`] before the lock is released.
#[derive(Clone)]
pub struct DeviceSession {
    transport: Arc<Box<dyn Transport>>,
    catalog: &'static CommandCatalog,
    state: Arc<Mutex<DeviceState>>,
    updates: Arc<watch::Sender<DeviceState>>,
    name: Arc<OnceCell<String>>,
}

impl DeviceSession {
    /// Creates a session without reading from the transport. Notifications must be fed in through
    /// [`DeviceSession::on_notification`].
    pub fn new(transport: Box<dyn Transport>, variant: ProtocolVariant) -> Self {
        let (tx, _) = watch::channel(DeviceState::default());
        DeviceSession {
            transport: Arc::new(transport),
            catalog: variant.catalog(),
            state: Arc::new(Mutex::new(DeviceState::default())),
            updates: Arc::new(tx),
            name: Arc::new(OnceCell::new()),
        }
    }

    /// Creates a session and spawns the loop that drains the transport into it.
    pub fn start(transport: Box<dyn Transport>, variant: ProtocolVariant) -> Self {
        let session = Self::new(transport, variant);
        tokio::spawn(session.clone().notification_loop());
        session
    }

    async fn notification_loop(self) {
        loop {
            // Treat end-of-stream and read errors as TransportOutput::Done
            let output = match self.transport.read().await {
                Ok(Some(output)) => output,
                Ok(None) | Err(_) => TransportOutput::Done,
            };
            match output {
                TransportOutput::Ready => self.update(|state| state.connected = true),
                TransportOutput::Notification(frame) => self.on_notification(frame.bytes()),
                TransportOutput::Done => {
                    self.update(|state| state.connected = false);
                    break;
                }
            }
        }
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.catalog.variant
    }

    pub fn address(&self) -> String {
        self.transport.address()
    }

    /// A copy of the current state.
    pub fn state(&self) -> DeviceState {
        self.lock().clone()
    }

    /// Receives every state snapshot published after this call, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.updates.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<T>(&self, f: impl FnOnce(&mut DeviceState) -> T) -> T {
        let mut state = self.lock();
        let result = f(&mut *state);
        self.updates.send_replace(state.clone());
        result
    }

    /// Signs a copy of `template` and hands it to the transport.
    async fn send(&self, template: &[u8]) -> Result<(), SessionError> {
        let frame = Frame::signed(template)?;
        match self.transport.write(frame).await {
            Ok(()) => {
                self.update(|state| state.connected = true);
                Ok(())
            }
            Err(e) => {
                self.update(|state| state.connected = false);
                Err(e.into())
            }
        }
    }

    pub async fn power_on(&self) -> Result<(), SessionError> {
        self.send(self.catalog.power_on).await
    }

    pub async fn set_cup_light(&self, on: bool) -> Result<(), SessionError> {
        self.set_switches(|switches| switches.cup_light = on).await
    }

    pub async fn set_energy_save(&self, on: bool) -> Result<(), SessionError> {
        self.set_switches(|switches| switches.energy_save = on).await
    }

    pub async fn set_sound_alarm(&self, on: bool) -> Result<(), SessionError> {
        self.set_switches(|switches| switches.sounds = on).await
    }

    /// Applies `f` to the local switches and sends all of them.
    async fn set_switches(&self, f: impl FnOnce(&mut SwitchState)) -> Result<(), SessionError> {
        let frame = self.update(|state| {
            f(&mut state.switches);
            encode_switches(&state.switches, &self.catalog.switches)
        });
        self.send(&frame).await
    }

    /// Records `beverage` as cooking and sends its start command. A beverage that is already
    /// cooking is not stopped first.
    pub async fn start_beverage(&self, beverage: Beverage) -> Result<(), SessionError> {
        self.update(|state| state.cooking = beverage);
        self.send(self.catalog.command_for(beverage, Action::On))
            .await
    }

    /// Sends the stop command for the beverage we believe is cooking. Does nothing when idle.
    pub async fn cancel_beverage(&self) -> Result<(), SessionError> {
        let cooking = self.update(|state| std::mem::take(&mut state.cooking));
        if cooking == Beverage::None {
            return Ok(());
        }
        self.send(self.catalog.command_for(cooking, Action::Off))
            .await
    }

    /// Asks the machine for a status notification. The reply arrives through
    /// [`DeviceSession::on_notification`].
    pub async fn request_status(&self) -> Result<(), SessionError> {
        self.send(self.catalog.status_request).await
    }

    /// Folds an inbound frame into the session state.
    pub fn on_notification(&self, raw: &[u8]) {
        self.update(|state| *state = decode_notification(raw, state));
    }

    /// Waits until the state satisfies `predicate`, checking the current state first.
    pub async fn wait_for(
        &self,
        predicate: impl Fn(&DeviceState) -> bool,
        timeout: Duration,
    ) -> Result<DeviceState, SessionError> {
        let mut rx = self.subscribe();
        let wait = async {
            loop {
                // The predicate runs on a copy so it may call back into the session
                let state = rx.borrow_and_update().clone();
                if predicate(&state) {
                    return Ok(state);
                }
                if rx.changed().await.is_err() {
                    return Err(SessionError::Timeout);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| SessionError::Timeout)?
    }

    /// The machine's name, read once per session. Falls back to a name built from the address
    /// when the read fails.
    pub async fn device_name(&self) -> String {
        self.name
            .get_or_init(|| async {
                match self.transport.read_device_name().await {
                    Ok(raw) if !raw.is_empty() => String::from_utf8_lossy(&raw)
                        .trim_end_matches('\0')
                        .to_owned(),
                    _ => format!("Primadonna {}", self.transport.address()),
                }
            })
            .await
            .clone()
    }
}
