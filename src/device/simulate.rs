use tokio::sync::{mpsc, Mutex};

use crate::device::{Transport, TransportError, TransportOutput};
use crate::prelude::*;
use crate::protocol::*;

const STATUS_FRAME_LEN: usize = 19;
const BREW_STEPS: usize = 8;
const DEFAULT_DELAY: Duration = Duration::from_millis(250);

const SHORT_BUSY: [u8; 3] = [0x01, 0x9c, 0x00];
const SHORT_IDLE: [u8; 3] = [0x01, 0xb5, 0x00];

#[derive(Default)]
struct Machine {
    is_on: bool,
    /// Bumped on every start or stop so a stale brew stops reporting.
    brew_generation: u64,
}

/// A machine that lives in memory. It answers the frames it recognizes and ignores the rest,
/// including anything with a bad signature.
pub struct SimulatedMachine {
    catalog: &'static CommandCatalog,
    delay: Duration,
    machine: Arc<std::sync::Mutex<Machine>>,
    tx: mpsc::Sender<TransportOutput>,
    rx: Mutex<mpsc::Receiver<TransportOutput>>,
}

impl SimulatedMachine {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self::with_delay(variant, DEFAULT_DELAY)
    }

    /// A simulator that waits `delay` between the notifications of a brew.
    pub fn with_delay(variant: ProtocolVariant, delay: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        let _ = tx.try_send(TransportOutput::Ready);
        SimulatedMachine {
            catalog: variant.catalog(),
            delay,
            machine: Default::default(),
            tx,
            rx: Mutex::new(rx),
        }
    }

    fn with_machine<T>(&self, f: impl FnOnce(&mut Machine) -> T) -> T {
        let mut machine = self
            .machine
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut *machine)
    }

    async fn reply(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.tx
            .send(TransportOutput::Notification(Frame::from_vec(frame)))
            .await
            .map_err(|_| TransportError::Disconnected)
    }

    async fn handle(&self, frame: Frame) -> Result<(), TransportError> {
        if !frame.has_valid_signature() {
            return Ok(());
        }
        match self.catalog.lookup(frame.bytes()) {
            Some(Command::StatusRequest) => {
                let is_on = self.with_machine(|m| m.is_on);
                self.reply(status_frame(is_on)).await
            }
            Some(Command::PowerOn) => {
                self.with_machine(|m| m.is_on = true);
                self.reply(status_frame(true)).await
            }
            Some(Command::Beverage(_, Action::On)) => {
                let generation = self.with_machine(|m| {
                    m.is_on = true;
                    m.brew_generation += 1;
                    m.brew_generation
                });
                tokio::spawn(brew(
                    self.machine.clone(),
                    self.tx.clone(),
                    self.delay,
                    generation,
                ));
                Ok(())
            }
            Some(Command::Beverage(_, Action::Off)) => {
                self.with_machine(|m| m.brew_generation += 1);
                self.reply(SHORT_IDLE.to_vec()).await
            }
            Some(Command::Switches(_)) | None => Ok(()),
        }
    }
}

/// A signed long-format status frame from a machine with the steam nozzle attached.
fn status_frame(is_on: bool) -> Vec<u8> {
    let mut frame = vec![0; STATUS_FRAME_LEN];
    frame[..4].copy_from_slice(&[0xd0, 0x12, 0x75, 0x0f]);
    frame[4] = SteamNozzle::Steam.into();
    frame[5] = DeviceStatus::Ok.into();
    frame[9] = is_on as u8;
    let signature = checksum(&frame[..STATUS_FRAME_LEN - SIGNATURE_LEN]);
    frame[STATUS_FRAME_LEN - SIGNATURE_LEN..].copy_from_slice(&signature);
    frame
}

/// Reports busy frames until the brew is done or superseded, then reports idle.
async fn brew(
    machine: Arc<std::sync::Mutex<Machine>>,
    tx: mpsc::Sender<TransportOutput>,
    delay: Duration,
    generation: u64,
) {
    let current = || {
        machine
            .lock()
            .map(|m| m.brew_generation == generation)
            .unwrap_or(false)
    };
    for step in 0..=BREW_STEPS {
        let permit = match tx.reserve().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        // Checked after the slot is reserved so a stop is never overtaken by a busy frame
        if !current() {
            return;
        }
        let frame = if step < BREW_STEPS {
            &SHORT_BUSY
        } else {
            &SHORT_IDLE
        };
        permit.send(TransportOutput::Notification(Frame::from_slice(frame)));
        tokio::time::sleep(delay).await;
    }
}

impl Transport for SimulatedMachine {
    fn read<'a>(&'a self) -> AsyncFuture<'a, Option<TransportOutput>> {
        Box::pin(async { Ok(self.rx.lock().await.recv().await) })
    }

    fn write<'a>(&'a self, data: Frame) -> AsyncFuture<'a, ()> {
        Box::pin(self.handle(data))
    }

    fn read_device_name<'a>(&'a self) -> AsyncFuture<'a, Vec<u8>> {
        Box::pin(async { Ok(b"Simulated PrimaDonna".to_vec()) })
    }

    fn address(&self) -> String {
        "simulator".to_owned()
    }
}
