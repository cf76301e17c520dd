//! # Now-Playing Relay
//!
//! Forwards presentation updates and telemetry notices from the engine to the
//! host on a separate task. The engine only ever enqueues, so a slow or
//! failing publisher cannot block or alter playback.

use bridge_traits::{NowPlayingInfo, NowPlayingPublisher, PlaybackNotice, TelemetrySink};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

enum RelayMessage {
    Publish(NowPlayingInfo),
    Clear,
    Notice(PlaybackNotice),
    Flush(oneshot::Sender<()>),
}

pub(crate) struct NowPlayingRelay {
    sender: mpsc::UnboundedSender<RelayMessage>,
    publish_enabled: bool,
}

impl NowPlayingRelay {
    /// Spawn the relay task. Must be called inside a tokio runtime.
    pub(crate) fn spawn(
        publisher: Arc<dyn NowPlayingPublisher>,
        telemetry: Arc<dyn TelemetrySink>,
        publish_enabled: bool,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                match message {
                    RelayMessage::Publish(info) => {
                        if let Err(e) = publisher.publish(info).await {
                            warn!(error = %e, "Now-playing publish failed");
                        }
                    }
                    RelayMessage::Clear => {
                        if let Err(e) = publisher.clear().await {
                            warn!(error = %e, "Now-playing clear failed");
                        }
                    }
                    RelayMessage::Notice(notice) => telemetry.notify(notice),
                    RelayMessage::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Now-playing relay stopped");
        });

        Self {
            sender,
            publish_enabled,
        }
    }

    pub(crate) fn publish(&self, info: NowPlayingInfo) {
        if self.publish_enabled {
            let _ = self.sender.send(RelayMessage::Publish(info));
        }
    }

    pub(crate) fn clear(&self) {
        if self.publish_enabled {
            let _ = self.sender.send(RelayMessage::Clear);
        }
    }

    pub(crate) fn notify(&self, notice: PlaybackNotice) {
        let _ = self.sender.send(RelayMessage::Notice(notice));
    }

    /// Wait until everything enqueued so far has been handed to the host.
    pub(crate) async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(RelayMessage::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}
