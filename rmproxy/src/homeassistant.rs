//! Outbound REST bridge to a Home Assistant server.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProxyError, Result};

const DEFAULT_AUTH_HEADER: &str = "x-ha-access";
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a named command maps onto a Home Assistant REST call.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandMapping {
    #[serde(default)]
    pub method: Option<String>,
    pub endpoint: String,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BridgeConfig {
    server: Option<String>,
    authorizationheader: Option<String>,
    password: Option<String>,
    commands: HashMap<String, CommandMapping>,
}

/// A configured Home Assistant connection.
pub struct HomeAssistant {
    agent: ureq::Agent,
    server: String,
    authorization_header: String,
    password: String,
    commands: HashMap<String, CommandMapping>,
}

impl HomeAssistant {
    /// Load the bridge configuration from its JSON stream. The environment
    /// variables `HASERVER`, `HAAUTHORIZATIONHEADER` and `HAPASSWORD`
    /// override the file.
    pub fn load(reader: impl Read) -> Result<Self> {
        let config: BridgeConfig =
            serde_json::from_reader(reader).map_err(|e| ProxyError::json("Home Assistant", e))?;

        let server = env_or("HASERVER", config.server).ok_or(ProxyError::BridgeServerMissing)?;
        let password =
            env_or("HAPASSWORD", config.password).ok_or(ProxyError::BridgePasswordMissing)?;
        let authorization_header = env_or("HAAUTHORIZATIONHEADER", config.authorizationheader)
            .unwrap_or_else(|| DEFAULT_AUTH_HEADER.to_string());

        let server = if server.ends_with('/') {
            server
        } else {
            format!("{server}/")
        };

        Ok(Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout(CLIENT_TIMEOUT)
                .build(),
            server,
            authorization_header,
            password,
            commands: config.commands,
        })
    }

    /// Invoke a named command against the Home Assistant REST API.
    pub fn execute(&self, command: &str) -> Result<()> {
        let mapping = self
            .commands
            .get(command)
            .ok_or_else(|| ProxyError::UnknownBridgeCommand(command.to_string()))?;

        let method = mapping.method.as_deref().unwrap_or("GET");
        let url = format!("{}{}", self.server, mapping.endpoint);
        info!("sending request to {url}");

        let request = self
            .agent
            .request(method, &url)
            .set("Content-Type", "application/json")
            .set(&self.authorization_header, &self.password);

        let response = match &mapping.payload {
            Some(payload) => request.send_string(payload),
            None => request.call(),
        };

        match response {
            Ok(response) => {
                debug!("response code {}", response.status());
                Ok(())
            }
            Err(ureq::Error::Status(code, _)) => {
                Err(ProxyError::Bridge(format!("received {code} status code")))
            }
            Err(e) => Err(ProxyError::Bridge(e.to_string())),
        }
    }
}

fn env_or(name: &str, fallback: Option<String>) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => fallback.filter(|v| !v.is_empty()),
    }
}
