//! The StateMap session: one task per device socket.
//!
//! A session owns its connection and walks it through the phases in
//! [`SessionPhase`]:
//!
//! 1. **Subscribing**: one subscribe message per catalog path for the
//!    device's unit type, in catalog order, each write awaited before the
//!    next one goes out.
//! 2. **Streaming**: read chunks, reassemble frames, decode and dispatch
//!    them one at a time, in arrival order.
//! 3. **Closed**: unregister from the registry, close the socket.
//!
//! Dispatch is small:
//!
//! - a value update goes to the path's listeners and, while this
//!   connection is still the device's live registration, to the
//!   registry's per-device subscribers and broadcast channel;
//! - a poll request with a non-zero interval gets a reject response;
//! - a zero-interval interval message is the device echoing our subscribe
//!   and is ignored.
//!
//! A message that fails to decode is logged and skipped. Only a stream
//! that can't be resynchronized (an oversized frame, an out-of-bounds
//! seek, or too many bad messages in a row) ends the session with an
//! error.

use stagelinq_protocol::{
    FrameDecoder, StateMessage, encode_frame, encode_poll_response, encode_subscribe,
};
use stagelinq_transport::{Connection, TransportError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{
    DeviceInfo, SessionPhase, StateEvent, StateMapConfig, StateMapError, StateMapHandle,
    StateMapRegistry, catalog,
};

/// Registers a session for `info` and starts it on its own task.
///
/// Registration happens before this returns, so the device is visible in
/// the registry (and a previous connection for it is already retired)
/// by the time the caller gets the handle. The task resolves when the
/// session ends: `Ok(())` when the device hung up or
/// [`StateMapHandle::shutdown`] was called, an error otherwise.
pub async fn spawn_session<C>(
    conn: C,
    info: DeviceInfo,
    registry: StateMapRegistry,
    config: StateMapConfig,
) -> (StateMapHandle, JoinHandle<Result<(), StateMapError>>)
where
    C: Connection<Error = TransportError>,
{
    let handle = StateMapHandle::new(info, conn.id());
    registry.register(handle.clone()).await;

    let session = Session {
        conn,
        handle: handle.clone(),
        registry,
        config: config.validated(),
    };
    let task = tokio::spawn(session.run());
    (handle, task)
}

struct Session<C> {
    conn: C,
    handle: StateMapHandle,
    registry: StateMapRegistry,
    config: StateMapConfig,
}

/// Resolves once shutdown has been requested.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender gone: nobody can ask us to stop any more.
            std::future::pending::<()>().await;
        }
    }
}

impl<C> Session<C>
where
    C: Connection<Error = TransportError>,
{
    async fn run(self) -> Result<(), StateMapError> {
        let device_id = self.handle.device_id();
        let connection_id = self.conn.id();
        tracing::debug!(
            %device_id,
            %connection_id,
            peer = %self.conn.peer_addr(),
            "statemap session started"
        );

        let mut shutdown = self.handle.shutdown_receiver();
        let result = self.drive(&mut shutdown).await;

        self.registry.unregister(&device_id, connection_id).await;
        if let Err(e) = self.conn.close().await {
            tracing::debug!(%device_id, error = %e, "error closing statemap connection");
        }
        self.handle.set_phase(SessionPhase::Closed);

        match &result {
            Ok(()) => tracing::info!(%device_id, %connection_id, "statemap session ended"),
            Err(e) => tracing::warn!(
                %device_id,
                %connection_id,
                error = %e,
                "statemap session ended with error"
            ),
        }
        result
    }

    async fn drive(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), StateMapError> {
        self.handle.set_phase(SessionPhase::Subscribing);
        if !self.subscribe_all(shutdown).await? {
            return Ok(());
        }

        self.handle.set_phase(SessionPhase::Streaming);
        self.stream(shutdown).await
    }

    /// Sends the unit's whole catalog. Returns `false` if shutdown was
    /// requested part-way.
    async fn subscribe_all(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<bool, StateMapError> {
        let info = self.handle.info();
        let paths = catalog::paths_for(info.unit_type);
        tracing::debug!(
            device_id = %info.device_id,
            unit_type = %info.unit_type,
            count = paths.len(),
            "subscribing to state paths"
        );

        for path in paths {
            let frame = encode_frame(&encode_subscribe(path, 0)?);
            tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => return Ok(false),
                sent = self.conn.send(&frame) => sent?,
            }
            tracing::trace!(device_id = %info.device_id, path, "subscribed");
        }
        Ok(true)
    }

    async fn stream(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), StateMapError> {
        let device_id = self.handle.device_id();
        let mut decoder = FrameDecoder::with_max_frame_len(self.config.max_frame_len);
        let mut consecutive_errors: u32 = 0;

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => {
                    tracing::debug!(%device_id, "statemap session shutting down");
                    return Ok(());
                }
                received = self.conn.recv() => received?,
            };

            let Some(chunk) = received else {
                tracing::info!(%device_id, "device closed statemap connection");
                return Ok(());
            };
            decoder.extend(&chunk);

            while let Some(frame) = decoder.next_frame()? {
                if *shutdown.borrow() {
                    tracing::debug!(
                        %device_id,
                        buffered = decoder.buffered(),
                        "statemap session shutting down, dropping buffered frames"
                    );
                    return Ok(());
                }

                match StateMessage::decode(&frame) {
                    Ok(message) => {
                        consecutive_errors = 0;
                        self.dispatch(message).await?;
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        consecutive_errors += 1;
                        tracing::warn!(
                            %device_id,
                            error = %e,
                            len = frame.len(),
                            consecutive = consecutive_errors,
                            "skipping undecodable statemap message"
                        );
                        if consecutive_errors > self.config.max_consecutive_decode_errors {
                            return Err(StateMapError::TooManyDecodeErrors(consecutive_errors));
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, message: StateMessage) -> Result<(), StateMapError> {
        let device_id = self.handle.device_id();

        match message {
            StateMessage::ValueUpdate { path, value } => {
                tracing::trace!(%device_id, %path, kind = value.kind(), "state value");
                let event = StateEvent {
                    device_id,
                    path,
                    value,
                };
                self.handle.notify_listeners(&event).await;

                if self
                    .registry
                    .is_current(&device_id, self.handle.connection_id())
                    .await
                {
                    self.registry.publish_state(event).await;
                } else {
                    tracing::trace!(
                        %device_id,
                        path = %event.path,
                        "connection replaced, not publishing"
                    );
                }
            }
            StateMessage::IntervalPoll { path, interval_ms } if interval_ms != 0 => {
                tracing::debug!(%device_id, %path, interval_ms, "rejecting poll request");
                let response = encode_frame(&encode_poll_response(&path)?);
                self.conn.send(&response).await?;
            }
            StateMessage::IntervalPoll { path, .. } => {
                tracing::trace!(%device_id, %path, "subscribe echo");
            }
        }
        Ok(())
    }
}
