//! Watches a device for link loss outside of handshake operations.

use bluer::{Device, DeviceEvent, DeviceProperty};
use futures::StreamExt;
use pkap_handshake::HandshakeEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Post [`HandshakeEvent::Disconnected`] into `events` when `device`
/// drops its connection.
///
/// The task ends after the first disconnect, when the event stream
/// closes, or when the receiving side of `events` is gone. Abort the
/// handle once the handshake is over.
pub fn spawn_disconnect_monitor(
    device: Device,
    events: mpsc::Sender<HandshakeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stream = match device.events().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to watch device {}: {}", device.address(), e);
                return;
            }
        };
        futures::pin_mut!(stream);

        while let Some(event) = stream.next().await {
            if let DeviceEvent::PropertyChanged(DeviceProperty::Connected(false)) = event {
                debug!("Device {} disconnected", device.address());
                let _ = events.send(HandshakeEvent::Disconnected).await;
                return;
            }
        }
    })
}
