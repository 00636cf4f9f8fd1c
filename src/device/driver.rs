use crate::{prelude::*, protocol::Frame};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportOutput {
    /// The link is up and notifications will follow.
    Ready,
    Notification(Frame),
    /// The link has gone away.
    Done,
}

/// The link to a machine. Implementations own connection handling; sessions only write frames,
/// read notifications and ask for the device name.
///
/// Async-ish traits for read/write. See https://smallcultfollowing.com/babysteps/blog/2019/10/26/async-fn-in-traits-are-hard/
/// for some tips on making async trait functions.
pub trait Transport: Send + Sync {
    /// Read one item from the machine.
    fn read<'a>(&'a self) -> AsyncFuture<'a, Option<TransportOutput>>;

    /// Write one signed frame to the command channel.
    fn write<'a>(&'a self, data: Frame) -> AsyncFuture<'a, ()>;

    /// Read the raw device name.
    fn read_device_name<'a>(&'a self) -> AsyncFuture<'a, Vec<u8>>;

    /// The address the machine was reached at.
    fn address(&self) -> String;
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::device::TransportError;
    use std::sync::Mutex;

    /// Scripted transport: replays `read_items` and records every write.
    #[derive(Default)]
    pub struct TransportTest {
        pub read_items: Arc<Mutex<Vec<TransportOutput>>>,
        pub write_items: Arc<Mutex<Vec<Frame>>>,
        pub fail_writes: Arc<Mutex<bool>>,
        pub name: Option<Vec<u8>>,
    }

    impl TransportTest {
        pub fn new(items: Vec<TransportOutput>) -> TransportTest {
            let mut read_items = vec![TransportOutput::Ready];
            read_items.extend(items);
            read_items.push(TransportOutput::Done);
            TransportTest {
                read_items: Arc::new(Mutex::new(read_items)),
                ..Default::default()
            }
        }
    }

    impl Transport for TransportTest {
        fn read<'a>(&'a self) -> AsyncFuture<'a, Option<TransportOutput>> {
            Box::pin(async {
                let mut items = self.read_items.lock().unwrap();
                if items.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(items.remove(0)))
                }
            })
        }

        fn write<'a>(&'a self, data: Frame) -> AsyncFuture<'a, ()> {
            let fail = *self.fail_writes.lock().unwrap();
            if !fail {
                self.write_items.lock().unwrap().push(data);
            }
            Box::pin(async move {
                if fail {
                    Err(TransportError::Disconnected)
                } else {
                    Ok(())
                }
            })
        }

        fn read_device_name<'a>(&'a self) -> AsyncFuture<'a, Vec<u8>> {
            Box::pin(async {
                self.name.clone().ok_or(TransportError::NotFound)
            })
        }

        fn address(&self) -> String {
            "00:11:22:33:44:55".to_owned()
        }
    }

    #[tokio::test]
    async fn test_read() -> Result<(), TransportError> {
        let test = TransportTest::new(vec![TransportOutput::Notification(Frame::from_slice(
            &[0x01, 0xb5, 0x00],
        ))]);
        assert_eq!(
            TransportOutput::Ready,
            test.read().await?.expect("expected item")
        );
        assert_eq!(
            TransportOutput::Notification(Frame::from_slice(&[0x01, 0xb5, 0x00])),
            test.read().await?.expect("expected item")
        );
        assert_eq!(
            TransportOutput::Done,
            test.read().await?.expect("expected item")
        );
        assert_eq!(None, test.read().await?);
        Ok(())
    }
}
