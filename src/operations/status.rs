use crate::device::{DeviceSession, SessionError};
use crate::display;
use crate::prelude::*;
use crate::protocol::*;

/// Requests a status notification and waits up to `timeout` for a long-format reply. On timeout
/// the last known state is returned instead.
pub async fn status(session: &DeviceSession, timeout: Duration) -> Result<DeviceState, SessionError> {
    let previous = session.state().last_raw_frame;
    session.request_status().await?;
    let reply = session
        .wait_for(
            |state| {
                state.last_raw_frame != previous
                    && NotificationShape::classify(&state.last_raw_frame) == NotificationShape::Long
            },
            timeout,
        )
        .await;
    match reply {
        Ok(state) => Ok(state),
        Err(SessionError::Timeout) => {
            warning!("No status reply within {}ms", timeout.as_millis());
            Ok(session.state())
        }
        Err(e) => Err(e),
    }
}

/// Prints the device name and state.
pub async fn print_status(session: &DeviceSession, timeout: Duration) -> Result<(), SessionError> {
    info!("Device name: {}", session.device_name().await);
    let state = status(session, timeout).await?;
    info!("Power: {}", if state.switches.is_on { "ON" } else { "OFF" });
    info!("Status: {:?}", state.status);
    match state.steam_nozzle {
        Some(nozzle) => info!("Steam nozzle: {:?}", nozzle),
        None => info!("Steam nozzle: Unknown"),
    }
    info!("Currently brewing: {}", state.cooking.name());
    trace_packet!("Last frame: {}", hexdump(&state.last_raw_frame));
    Ok(())
}

/// Displays every state change until the machine disconnects.
pub async fn monitor(session: &DeviceSession) -> Result<(), SessionError> {
    let mut updates = session.subscribe();
    session.request_status().await?;
    loop {
        let state = updates.borrow_and_update().clone();
        display::display_state(&state);
        if !state.connected {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }
    Ok(())
}
