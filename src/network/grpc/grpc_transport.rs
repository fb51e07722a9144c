//! gRPC implementation of [`WatchTransport`] on top of a tonic [`Channel`].

use futures::StreamExt;
use tonic::async_trait;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;
use tonic::transport::Endpoint;
use tracing::debug;
use tracing::error;

use crate::proto::WatchRequest;
use crate::proto::WatchServiceClient;
use crate::ClientConfig;
use crate::RawWatchStream;
use crate::Result;
use crate::WatchError;
use crate::WatchTransport;

#[derive(Debug, Clone)]
pub struct GrpcWatchTransport {
    // Tonic's Channel is thread-safe and reference-counted.
    pub(crate) channel: Channel,
    pub(crate) config: ClientConfig,
}

impl GrpcWatchTransport {
    /// Connects eagerly to `addr`
    pub async fn connect(
        addr: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let channel = Self::endpoint(addr.into(), &config)?.connect().await?;
        Ok(Self::with_channel(channel, config))
    }

    /// Builds the transport without dialing; the channel connects on first use.
    pub fn connect_lazy(
        addr: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let channel = Self::endpoint(addr.into(), &config)?.connect_lazy();
        Ok(Self::with_channel(channel, config))
    }

    pub fn with_channel(
        channel: Channel,
        config: ClientConfig,
    ) -> Self {
        Self { channel, config }
    }

    pub(crate) fn endpoint(
        addr: String,
        config: &ClientConfig,
    ) -> Result<Endpoint> {
        debug!("create_channel, addr = {:?}", &addr);
        // No request timeout: watch streams are expected to live indefinitely.
        Ok(Endpoint::try_from(addr)?
            .connect_timeout(config.connect_timeout())
            .tcp_keepalive(Some(config.tcp_keepalive()))
            .http2_keep_alive_interval(config.http2_keepalive_interval())
            .keep_alive_timeout(config.http2_keepalive_timeout())
            .keep_alive_while_idle(true))
    }

    fn make_client(&self) -> WatchServiceClient<Channel> {
        let mut client = WatchServiceClient::new(self.channel.clone())
            .max_decoding_message_size(self.config.max_decoding_message_size);
        if self.config.enable_compression {
            client = client
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip);
        }
        client
    }
}

#[async_trait]
impl WatchTransport for GrpcWatchTransport {
    async fn watch(
        &self,
        mut request: WatchRequest,
    ) -> std::result::Result<RawWatchStream, WatchError> {
        if request.client_id == 0 {
            request.client_id = self.config.id;
        }

        let mut client = self.make_client();
        match client.watch(request).await {
            Ok(response) => {
                debug!("Watch stream established");
                Ok(response.into_inner().map(|item| item.map_err(WatchError::from)).boxed())
            }
            Err(status) => {
                error!("Watch request failed: {:?}", status);
                Err(status.into())
            }
        }
    }

    async fn close(&self) {
        // Channels are dropped with the transport; nothing is pooled here.
        debug!("grpc watch transport closed");
    }
}
