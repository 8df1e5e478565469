use std::env;
use std::time::Duration;

/// Which bus implementation to connect to
#[derive(Debug, Clone)]
pub enum BusType {
    Nats,
    InMemory,
}

impl BusType {
    pub fn from_env() -> Self {
        match env::var("BUS_TYPE")
            .unwrap_or_else(|_| "nats".to_string())
            .to_lowercase()
            .as_str()
        {
            "nats" => BusType::Nats,
            "inmemory" => BusType::InMemory,
            _ => {
                tracing::warn!("Unknown BUS_TYPE, defaulting to nats");
                BusType::Nats
            }
        }
    }
}

/// Acknowledgement timing for consumed messages.
///
/// The pipeline historically acknowledged at delivery time, before
/// processing — a message that fails to decode or persist is lost. That
/// trade-off is kept as the named default instead of being buried in the
/// transport; see `AtLeastOnce` for the unsupported alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Message is consumed at delivery time; processing failures drop it.
    AtMostOnce,
    /// Acknowledge only after successful persistence. Recognized in config
    /// but not supported on a core NATS subscription (it would need a
    /// JetStream consumer); the worker refuses to start with it.
    AtLeastOnce,
}

impl AckMode {
    pub fn from_env() -> Self {
        match env::var("ACK_MODE")
            .unwrap_or_else(|_| "at-most-once".to_string())
            .to_lowercase()
            .as_str()
        {
            "at-most-once" => AckMode::AtMostOnce,
            "at-least-once" => AckMode::AtLeastOnce,
            _ => {
                tracing::warn!("Unknown ACK_MODE, defaulting to at-most-once");
                AckMode::AtMostOnce
            }
        }
    }
}

impl std::fmt::Display for AckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AckMode::AtMostOnce => write!(f, "at-most-once"),
            AckMode::AtLeastOnce => write!(f, "at-least-once"),
        }
    }
}

/// Worker configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub subject: String,
    pub bus_type: BusType,
    pub nats_url: String,
    pub database_url: String,
    pub heartbeat_interval: Duration,
    pub ack_mode: AckMode,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let subject = env::var("SUBJECT").unwrap_or_else(|_| "person.registered".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let heartbeat_secs: u64 = env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| "HEARTBEAT_INTERVAL_SECS must be a valid u64".to_string())?;
        if heartbeat_secs == 0 {
            return Err("HEARTBEAT_INTERVAL_SECS must be greater than zero".to_string());
        }

        Ok(Config {
            subject,
            bus_type: BusType::from_env(),
            nats_url,
            database_url,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            ack_mode: AckMode::from_env(),
        })
    }
}
