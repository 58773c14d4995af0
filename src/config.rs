use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/habits.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub data_path: PathBuf,
}

impl Config {
    /// Reads `APP_BIND_ADDR`, `PORT` and `APP_DATA_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
                warn!(%value, "invalid PORT, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let bind_addr = match lookup("APP_BIND_ADDR") {
            Some(value) => value.trim().parse::<IpAddr>().unwrap_or_else(|_| {
                warn!(%value, "invalid APP_BIND_ADDR, binding all interfaces");
                IpAddr::V4(Ipv4Addr::UNSPECIFIED)
            }),
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let data_path = lookup("APP_DATA_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        Self {
            bind_addr,
            port,
            data_path,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
