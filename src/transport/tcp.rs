//! # TCP Transport
//!
//! Async Levin client over `Framed<TcpStream, BucketCodec>`.
//!
//! ## Responsibilities
//! - Connect with a bounded timeout
//! - Send buckets and wait for responses with a per-bucket timeout
//! - Answer requests the peer interleaves with our own through a [`Dispatcher`]
//! - Record traffic and failures into the global metrics

use crate::config::{FramerLimits, NetworkConfig, LEVIN_OK};
use crate::core::bucket::Bucket;
use crate::core::codec::BucketCodec;
use crate::core::section::Section;
use crate::error::{ProtocolError, Result};
use crate::protocol::command::Command;
use crate::protocol::dispatcher::Dispatcher;
use crate::utils::metrics::{global_metrics, Timer};
use crate::utils::timeout::{with_timeout_error, DEFAULT_TIMEOUT, RESPONSE_TIMEOUT};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, warn};

pub struct LevinClient {
    framed: Framed<TcpStream, BucketCodec>,
    dispatcher: Dispatcher,
    send_timeout: Duration,
    response_timeout: Duration,
}

impl LevinClient {
    /// Connect to `address`, giving up after `connect_timeout`.
    #[instrument(skip(limits), level = "debug")]
    pub async fn connect(
        address: &str,
        connect_timeout: Duration,
        limits: FramerLimits,
    ) -> Result<Self> {
        let stream = with_timeout_error(
            async { Ok(TcpStream::connect(address).await?) },
            connect_timeout,
        )
        .await
        .inspect_err(|e| {
            global_metrics().connection_error();
            warn!(address, error = %e, "connect failed");
        })?;

        info!(address, "connected");
        Ok(Self::from_stream(stream, limits))
    }

    /// Connect using the client and transport sections of `config`.
    pub async fn from_config(config: &NetworkConfig) -> Result<Self> {
        let client = Self::connect(
            &config.client.address,
            config.client.connection_timeout,
            config.transport.limits(),
        )
        .await?;
        Ok(client.with_timeouts(DEFAULT_TIMEOUT, config.client.response_timeout))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, limits: FramerLimits) -> Self {
        global_metrics().connection_established();
        Self {
            framed: Framed::new(stream, BucketCodec::new(limits)),
            dispatcher: Dispatcher::default(),
            send_timeout: DEFAULT_TIMEOUT,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, send_timeout: Duration, response_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self.response_timeout = response_timeout;
        self
    }

    /// Handlers for requests the peer sends while we wait on a response
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.framed.get_ref().peer_addr()?)
    }

    #[instrument(skip(self, bucket), fields(command = %bucket.command()), level = "debug")]
    pub async fn send(&mut self, bucket: Bucket) -> Result<()> {
        let len = bucket.encoded_len() as u64;
        let framed = &mut self.framed;
        with_timeout_error(
            async {
                framed.send(bucket).await?;
                Ok(())
            },
            self.send_timeout,
        )
        .await
        .inspect_err(|e| global_metrics().record_error(e))?;

        global_metrics().bucket_sent(len);
        debug!(bytes = len, ">> sent bucket");
        Ok(())
    }

    /// Next bucket from the peer, waiting at most the response timeout.
    pub async fn recv(&mut self) -> Result<Bucket> {
        let framed = &mut self.framed;
        let bucket = with_timeout_error(
            async {
                framed
                    .next()
                    .await
                    .ok_or(ProtocolError::ConnectionClosed)?
            },
            self.response_timeout,
        )
        .await
        .inspect_err(|e| global_metrics().record_error(e))?;

        global_metrics().bucket_received(bucket.encoded_len() as u64);
        debug!(
            command = %bucket.command(),
            payload_len = bucket.payload().len(),
            "<< received bucket"
        );
        Ok(bucket)
    }

    /// Send a request and return the decoded payload of its response.
    ///
    /// Requests arriving from the peer in the meantime are answered through
    /// the dispatcher; unrelated responses are skipped.
    pub async fn request(&mut self, command: Command, section: &Section) -> Result<Section> {
        let _timer = Timer::start("levin_request");
        self.send(Bucket::request(command, section)?).await?;

        loop {
            let bucket = self.recv().await?;
            let header = *bucket.header();

            if !header.is_response() {
                self.answer(bucket).await?;
                continue;
            }
            if header.command != command {
                debug!(command = %header.command, "skipping unrelated response");
                continue;
            }
            if header.return_code < LEVIN_OK {
                return Err(ProtocolError::UnexpectedMessage(format!(
                    "{command} failed with return code {}",
                    header.return_code
                )));
            }
            return bucket
                .section()
                .inspect_err(|e| global_metrics().record_error(e));
        }
    }

    /// Run the dispatcher on a peer request and reply when it asks for one.
    async fn answer(&mut self, bucket: Bucket) -> Result<()> {
        let command = bucket.command();
        if !self.dispatcher.handles(command) {
            debug!(%command, "no handler for peer request");
            return Ok(());
        }

        let request = bucket
            .section()
            .inspect_err(|e| global_metrics().record_error(e))?;
        let response = self.dispatcher.dispatch(command, &request)?;
        if bucket.header().is_request {
            self.send(Bucket::response(command, &response, LEVIN_OK)?).await?;
        }
        Ok(())
    }
}

impl Drop for LevinClient {
    fn drop(&mut self) {
        global_metrics().connection_closed();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::core::bucket::BucketHeader;
    use tokio::net::TcpListener;

    async fn pair() -> (LevinClient, Framed<TcpStream, BucketCodec>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (client, accepted) = tokio::join!(
            LevinClient::connect(&addr, Duration::from_secs(1), FramerLimits::default()),
            listener.accept()
        );
        let server = Framed::new(accepted.unwrap().0, BucketCodec::default());
        (client.unwrap(), server)
    }

    #[tokio::test]
    async fn test_request_answers_interleaved_support_flags() {
        let (client, mut server) = pair().await;
        let mut client = client.with_dispatcher(Dispatcher::with_defaults().unwrap());

        let node = tokio::spawn(async move {
            let request = server.next().await.unwrap().unwrap();
            assert_eq!(request.command(), Command::Ping);

            let ask = Bucket::request(Command::RequestSupportFlags, &Section::new()).unwrap();
            server.send(ask).await.unwrap();
            let flags = server.next().await.unwrap().unwrap();
            assert!(flags.header().is_response());
            assert_eq!(flags.command(), Command::RequestSupportFlags);

            let pong = Section::new().with("peer_id", 9u64);
            server
                .send(Bucket::response(Command::Ping, &pong, LEVIN_OK).unwrap())
                .await
                .unwrap();
        });

        let response = client.request(Command::Ping, &Section::new()).await.unwrap();
        assert_eq!(response.get("peer_id").unwrap().as_u64(), Some(9));
        node.await.unwrap();
    }

    #[tokio::test]
    async fn test_negative_return_code_is_error() {
        let (mut client, mut server) = pair().await;
        tokio::spawn(async move {
            let _ = server.next().await;
            let payload = crate::core::storage::encode_section(&Section::new()).unwrap();
            let header = BucketHeader::response(Command::TimedSync, 0, -1);
            let _ = server.send(Bucket::from_payload(header, payload)).await;
        });

        assert!(matches!(
            client.request(Command::TimedSync, &Section::new()).await,
            Err(ProtocolError::UnexpectedMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_recv_times_out() {
        let (client, _server) = pair().await;
        let mut client = client.with_timeouts(DEFAULT_TIMEOUT, Duration::from_millis(20));
        assert!(matches!(client.recv().await, Err(ProtocolError::Timeout)));
    }

    #[tokio::test]
    async fn test_recv_after_close() {
        let (mut client, server) = pair().await;
        drop(server);
        assert!(matches!(
            client.recv().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }
}
