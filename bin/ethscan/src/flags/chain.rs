use clap::Args;
use ethscan_core::{AlloyChainClient, AlloyChainClientBuilder};
use std::time::Duration;
use url::Url;

/// Chain endpoint arguments.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// HTTP JSON-RPC endpoint used for block and receipt reads.
    #[arg(id = "chain.rpc-url", long = "chain.rpc-url", env = "JSON_RPC_ENDPOINT")]
    pub rpc_url: Url,
    /// WebSocket endpoint used for new head subscriptions.
    #[arg(id = "chain.ws-url", long = "chain.ws-url", env = "WS_ENDPOINT")]
    pub ws_url: Url,
    /// Upper bound on each chain request, in seconds.
    #[arg(id = "chain.request-timeout-secs", long = "chain.request-timeout-secs", env = "CONTEXT_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,
}

impl ChainArgs {
    /// Builds the chain client.
    pub fn client(&self) -> AlloyChainClient {
        AlloyChainClientBuilder::new(self.rpc_url.clone(), self.ws_url.clone())
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .build()
    }
}
