use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;
use crate::gateway::GatewayConfig;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where table data is read from. Identity always goes through the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Rest,
    Sqlite { database_url: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub backend: Backend,
    pub request_timeout: Duration,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let gateway = GatewayConfig::new_from_env()?;

        let backend = match env::var("DASHBOARD_BACKEND").as_deref() {
            Err(_) | Ok("rest") => Backend::Rest,
            Ok("sqlite") => Backend::Sqlite {
                database_url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://dashboard.db".to_string()),
            },
            Ok(other) => {
                return Err(AppError::Config(format!("unknown DASHBOARD_BACKEND: {}", other)));
            }
        };

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| AppError::Config(format!("invalid REQUEST_TIMEOUT_SECS: {}", raw)))?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("invalid BIND_ADDR {}: {}", bind_addr, e)))?;

        Ok(Self {
            gateway,
            backend,
            request_timeout,
            bind_addr,
        })
    }
}
