use crate::device::{DeviceSession, SessionError};
use crate::prelude::*;
use crate::protocol::*;

/// Starts brewing `beverage`.
pub async fn brew(session: &DeviceSession, beverage: Beverage) -> Result<(), SessionError> {
    session.start_beverage(beverage).await?;
    info!("{}", beverage.description());
    Ok(())
}

/// Starts brewing `beverage` and follows the machine until it reports idle again.
pub async fn brew_and_wait(
    session: &DeviceSession,
    beverage: Beverage,
    timeout: Duration,
) -> Result<DeviceState, SessionError> {
    brew(session, beverage).await?;
    session
        .wait_for(|state| state.status == DeviceStatus::Cooking, timeout)
        .await?;
    info!("Dispensing...");
    session
        .wait_for(|state| state.status != DeviceStatus::Cooking, timeout)
        .await
}

/// Stops whatever we last asked the machine to brew.
pub async fn cancel(session: &DeviceSession) -> Result<(), SessionError> {
    let cooking = session.state().cooking;
    session.cancel_beverage().await?;
    if cooking == Beverage::None {
        info!("Nothing is brewing");
    } else {
        info!("Cancelled brewing");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::SimulatedMachine;

    #[tokio::test]
    async fn brew_until_idle() -> Result<(), SessionError> {
        let sim = SimulatedMachine::with_delay(ProtocolVariant::Legacy, Duration::from_millis(20));
        let session = DeviceSession::start(Box::new(sim), ProtocolVariant::Legacy);
        let state = brew_and_wait(&session, Beverage::Americano, Duration::from_secs(5)).await?;
        assert_eq!(state.status, DeviceStatus::Ok);
        assert!(state.switches.is_on);
        assert_eq!(state.cooking, Beverage::Americano);
        cancel(&session).await?;
        assert_eq!(session.state().cooking, Beverage::None);
        Ok(())
    }
}
