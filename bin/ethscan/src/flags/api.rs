use clap::Args;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Query API listener arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ApiArgs {
    /// Address the API listens on.
    #[arg(id = "api.host", long = "api.host", env = "SERVER_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,
    /// Port the API listens on.
    #[arg(id = "api.port", long = "api.port", env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,
}

impl ApiArgs {
    /// Returns the listen socket.
    pub const fn socket(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
