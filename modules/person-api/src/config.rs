use std::env;

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

/// Ingress configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub subject: String,
    pub bus_type: BusType,
    pub nats_url: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let subject = env::var("SUBJECT").unwrap_or_else(|_| "person.registered".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        Ok(Config {
            subject,
            bus_type: BusType::from_env(),
            nats_url,
            port,
        })
    }
}
