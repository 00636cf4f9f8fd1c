use tokio::sync::{mpsc::Receiver, Mutex};

use crate::device::{TransportError, TransportOutput};
use crate::prelude::*;

/// Converts a stream into something that can be more easily awaited. In addition, it can optionally add
/// [`TransportOutput::Ready`] and [`TransportOutput::Done`] items to the start and end of the stream.
pub struct NotificationReceiver {
    rx: Mutex<Receiver<TransportOutput>>,
}

impl NotificationReceiver {
    pub fn from_stream<T: Stream<Item = TransportOutput> + Unpin + Send + 'static>(
        mut stream: T,
        wrap_start_end: bool,
    ) -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        tokio::spawn(async move {
            if wrap_start_end && tx.send(TransportOutput::Ready).await.is_err() {
                return;
            }
            while let Some(m) = stream.next().await {
                if tx.send(m).await.is_err() {
                    trace_shutdown!("NotificationReceiver (receiver dropped)");
                    return;
                }
            }
            trace_shutdown!("NotificationReceiver");
            if wrap_start_end {
                let _ = tx.send(TransportOutput::Done).await;
            }
        });

        NotificationReceiver {
            rx: Mutex::new(rx),
        }
    }

    pub async fn recv(&self) -> Result<Option<TransportOutput>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::Frame;

    #[tokio::test]
    async fn wraps_stream() -> Result<(), TransportError> {
        let frame = TransportOutput::Notification(Frame::from_slice(&[1, 0x9c, 0]));
        let receiver =
            NotificationReceiver::from_stream(tokio_stream::iter(vec![frame.clone()]), true);
        assert_eq!(receiver.recv().await?, Some(TransportOutput::Ready));
        assert_eq!(receiver.recv().await?, Some(frame));
        assert_eq!(receiver.recv().await?, Some(TransportOutput::Done));
        assert_eq!(receiver.recv().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn passes_stream_through() -> Result<(), TransportError> {
        let receiver = NotificationReceiver::from_stream(tokio_stream::iter(vec![]), false);
        assert_eq!(receiver.recv().await?, None);
        Ok(())
    }
}
