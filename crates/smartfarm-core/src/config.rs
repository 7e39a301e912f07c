//! Configuration loading and typed config structures for a SmartFarm node.
//!
//! One YAML file (default `smartfarm.yaml`) configures every role. All
//! sections are optional and fall back to the defaults below. After
//! parsing, `FARM_*` environment variables override selected fields so a
//! single binary can be started as any role without editing the file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held a value that could not be parsed.
    #[error("invalid value {value:?} for {variable}: {reason}")]
    InvalidOverride {
        /// Name of the environment variable.
        variable: String,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A parsed value is outside its accepted range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Which part of the demo this process plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Sensor dashboard server: store, simulator, ingest and query.
    #[default]
    Farm,
    /// Relay producer holding one string value and notifying a receiver.
    RelaySource,
    /// Relay display process, fed by webhook pushes or by polling.
    RelayReceiver,
    /// Outbound-only client posting random readings to a farm server.
    Sensor,
}

impl Role {
    /// The kebab-case name used in config files and `FARM_ROLE`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Farm => "farm",
            Self::RelaySource => "relay-source",
            Self::RelayReceiver => "relay-receiver",
            Self::Sensor => "sensor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "farm" => Ok(Self::Farm),
            "relay-source" | "source" => Ok(Self::RelaySource),
            "relay-receiver" | "receiver" => Ok(Self::RelayReceiver),
            "sensor" => Ok(Self::Sensor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// How a relay receiver learns about new values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiveMode {
    /// The source POSTs each update to our `/webhook`.
    #[default]
    Push,
    /// We GET the source's query endpoint on a fixed interval.
    Poll,
}

impl ReceiveMode {
    /// The lowercase name used in config files and `FARM_RELAY_MODE`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Poll => "poll",
        }
    }
}

impl fmt::Display for ReceiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "push" | "webhook" => Ok(Self::Push),
            "poll" | "polling" => Ok(Self::Poll),
            other => Err(format!("unknown relay mode: {other}")),
        }
    }
}

/// Top-level node configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FarmConfig {
    /// The role this process plays.
    #[serde(default)]
    pub role: Role,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Background simulator settings (farm role).
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Ingest endpoint settings (farm role).
    #[serde(default)]
    pub ingest: IngestSection,

    /// Dashboard settings (farm role).
    #[serde(default)]
    pub dashboard: DashboardSection,

    /// Relay settings (relay roles).
    #[serde(default)]
    pub relay: RelaySection,

    /// Sensor client settings (sensor role).
    #[serde(default)]
    pub sensor: SensorSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl FarmConfig {
    /// Load configuration from a YAML file, then apply `FARM_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for an unparsable override, or
    /// [`ConfigError::InvalidValue`] for a zero interval or timeout.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without applying overrides.
    ///
    /// An empty document yields the defaults. Parsed values are checked
    /// with [`FarmConfig::validate`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the background loops cannot run with.
    ///
    /// Every interval and timeout must be at least one millisecond.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("simulation.tick_interval_ms", self.simulation.tick_interval_ms),
            ("dashboard.refresh_interval_ms", self.dashboard.refresh_interval_ms),
            ("relay.poll_interval_ms", self.relay.poll_interval_ms),
            ("relay.request_timeout_ms", self.relay.request_timeout_ms),
            ("sensor.send_interval_ms", self.sensor.send_interval_ms),
            ("sensor.request_timeout_ms", self.sensor.request_timeout_ms),
        ];
        match periods.into_iter().find(|(_, ms)| *ms == 0) {
            Some((field, _)) => Err(ConfigError::InvalidValue {
                field,
                reason: "must be at least 1 ms",
            }),
            None => Ok(()),
        }
    }

    /// Override fields from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields from any variable lookup.
    ///
    /// Recognized variables: `FARM_ROLE`, `FARM_HOST`, `FARM_PORT`,
    /// `FARM_RELAY_MODE`, `FARM_WEBHOOK_URL`, `FARM_POLL_URL`,
    /// `FARM_SENSOR_URL`, `FARM_SIMULATION`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("FARM_ROLE") {
            self.role = parse_override("FARM_ROLE", &val)?;
        }
        if let Some(val) = lookup("FARM_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("FARM_PORT") {
            self.server.port = Some(parse_override("FARM_PORT", &val)?);
        }
        if let Some(val) = lookup("FARM_RELAY_MODE") {
            self.relay.mode = parse_override("FARM_RELAY_MODE", &val)?;
        }
        if let Some(val) = lookup("FARM_WEBHOOK_URL") {
            self.relay.webhook_url = val;
        }
        if let Some(val) = lookup("FARM_POLL_URL") {
            self.relay.poll_url = val;
        }
        if let Some(val) = lookup("FARM_SENSOR_URL") {
            self.sensor.server_url = val;
        }
        if let Some(val) = lookup("FARM_SIMULATION") {
            self.simulation.enabled = parse_override("FARM_SIMULATION", &val)?;
        }
        Ok(())
    }

    /// The port to listen on: the configured one, else the role default.
    ///
    /// Defaults: farm 5000, relay source 3002, push receiver 3003,
    /// poll receiver 3004. The sensor role does not listen.
    pub const fn listen_port(&self) -> u16 {
        if let Some(port) = self.server.port {
            return port;
        }
        match (self.role, self.relay.mode) {
            (Role::Farm | Role::Sensor, _) => 5000,
            (Role::RelaySource, _) => 3002,
            (Role::RelayReceiver, ReceiveMode::Push) => 3003,
            (Role::RelayReceiver, ReceiveMode::Poll) => 3004,
        }
    }
}

fn parse_override<T>(variable: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            variable: variable.to_owned(),
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. `None` means the role default.
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
        }
    }
}

/// Background simulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationSection {
    /// Whether the farm node runs the simulator.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between simulation ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl SimulationSection {
    /// The tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Ingest endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngestSection {
    /// Writer tag used when the caller does not identify itself.
    #[serde(default = "default_ingest_source")]
    pub default_source: String,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            default_source: default_ingest_source(),
        }
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DashboardSection {
    /// How often the dashboard page polls `/api/data`, in milliseconds.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

/// Relay settings shared by source and receiver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelaySection {
    /// Receiver mode (receiver role only).
    #[serde(default)]
    pub mode: ReceiveMode,

    /// Where the source POSTs notifications (source role).
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Which query endpoint the receiver polls (poll mode).
    #[serde(default = "default_poll_url")]
    pub poll_url: String,

    /// Milliseconds between polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-call timeout for outbound relay requests, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Start polling at process start instead of waiting for `/start-polling`.
    #[serde(default = "default_true")]
    pub poll_on_startup: bool,
}

impl RelaySection {
    /// The poll interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The outbound request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            mode: ReceiveMode::default(),
            webhook_url: default_webhook_url(),
            poll_url: default_poll_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_on_startup: true,
        }
    }
}

/// Sensor client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SensorSection {
    /// Base URL of the farm server to post readings to.
    #[serde(default = "default_sensor_server_url")]
    pub server_url: String,

    /// Writer tag sent in the `X-Farm-Source` header.
    #[serde(default = "default_sensor_tag")]
    pub source_tag: String,

    /// Milliseconds between sends.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Stop after this many sends. `None` means run until shutdown.
    #[serde(default)]
    pub max_sends: Option<u32>,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SensorSection {
    /// The send interval as a [`Duration`].
    pub const fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    /// The outbound request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            server_url: default_sensor_server_url(),
            source_tag: default_sensor_tag(),
            send_interval_ms: default_send_interval_ms(),
            max_sends: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_true() -> bool {
    true
}

const fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_ingest_source() -> String {
    String::from("external")
}

const fn default_refresh_interval_ms() -> u64 {
    2000
}

fn default_webhook_url() -> String {
    String::from("http://localhost:3003/webhook")
}

fn default_poll_url() -> String {
    String::from("http://localhost:3002/api/data")
}

const fn default_poll_interval_ms() -> u64 {
    3000
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_sensor_server_url() -> String {
    String::from("http://localhost:5000")
}

fn default_sensor_tag() -> String {
    String::from("raspberry_pi")
}

const fn default_send_interval_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_is_a_farm_node() {
        let config = FarmConfig::default();
        assert_eq!(config.role, Role::Farm);
        assert_eq!(config.listen_port(), 5000);
        assert!(config.simulation.enabled);
        assert_eq!(config.simulation.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.ingest.default_source, "external");
        assert_eq!(config.dashboard.refresh_interval_ms, 2000);
        assert_eq!(config.relay.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.relay.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.sensor.send_interval(), Duration::from_secs(10));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = FarmConfig::parse("  \n").ok();
        assert_eq!(config, Some(FarmConfig::default()));
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
role: relay-receiver
server:
  host: "127.0.0.1"
  port: 8081
simulation:
  enabled: false
  tick_interval_ms: 250
ingest:
  default_source: "greenhouse"
dashboard:
  refresh_interval_ms: 500
relay:
  mode: poll
  webhook_url: "http://receiver:3003/webhook"
  poll_url: "http://source:3002/api/data"
  poll_interval_ms: 1000
  request_timeout_ms: 1500
  poll_on_startup: false
sensor:
  server_url: "http://farm:5000"
  source_tag: "pi-7"
  send_interval_ms: 2000
  max_sends: 5
logging:
  level: debug
  json: true
"#;
        let config = FarmConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.unwrap_or_default();

        assert_eq!(config.role, Role::RelayReceiver);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.listen_port(), 8081);
        assert!(!config.simulation.enabled);
        assert_eq!(config.simulation.tick_interval_ms, 250);
        assert_eq!(config.ingest.default_source, "greenhouse");
        assert_eq!(config.dashboard.refresh_interval_ms, 500);
        assert_eq!(config.relay.mode, ReceiveMode::Poll);
        assert_eq!(config.relay.poll_url, "http://source:3002/api/data");
        assert!(!config.relay.poll_on_startup);
        assert_eq!(config.sensor.max_sends, Some(5));
        assert_eq!(config.sensor.source_tag, "pi-7");
        assert!(config.logging.json);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = FarmConfig::parse("role: relay-source\n").unwrap_or_default();
        assert_eq!(config.role, Role::RelaySource);
        assert_eq!(config.listen_port(), 3002);
        assert_eq!(config.relay.webhook_url, "http://localhost:3003/webhook");
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = FarmConfig::parse("role: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));

        let result = FarmConfig::parse("role: tractor\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let result = FarmConfig::parse("simulation:\n  tick_interval_ms: 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field, .. }) if field == "simulation.tick_interval_ms"
        ));

        let result = FarmConfig::parse("relay:\n  poll_interval_ms: 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field, .. }) if field == "relay.poll_interval_ms"
        ));

        let result = FarmConfig::parse("sensor:\n  send_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        assert!(FarmConfig::parse("simulation:\n  tick_interval_ms: 1\n").is_ok());
    }

    #[test]
    fn role_default_ports() {
        let mut config = FarmConfig {
            role: Role::RelayReceiver,
            ..FarmConfig::default()
        };
        assert_eq!(config.listen_port(), 3003);
        config.relay.mode = ReceiveMode::Poll;
        assert_eq!(config.listen_port(), 3004);
    }

    #[test]
    fn overrides_replace_fields() {
        let mut config = FarmConfig::default();
        let result = config.apply_overrides(lookup_from(&[
            ("FARM_ROLE", "receiver"),
            ("FARM_HOST", "127.0.0.1"),
            ("FARM_PORT", "9000"),
            ("FARM_RELAY_MODE", "poll"),
            ("FARM_WEBHOOK_URL", "http://a/webhook"),
            ("FARM_POLL_URL", "http://b/api/data"),
            ("FARM_SENSOR_URL", "http://c:5000"),
            ("FARM_SIMULATION", "false"),
        ]));
        assert!(result.is_ok());

        assert_eq!(config.role, Role::RelayReceiver);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.listen_port(), 9000);
        assert_eq!(config.relay.mode, ReceiveMode::Poll);
        assert_eq!(config.relay.webhook_url, "http://a/webhook");
        assert_eq!(config.relay.poll_url, "http://b/api/data");
        assert_eq!(config.sensor.server_url, "http://c:5000");
        assert!(!config.simulation.enabled);
    }

    #[test]
    fn invalid_override_is_reported() {
        let mut config = FarmConfig::default();
        let result = config.apply_overrides(lookup_from(&[("FARM_PORT", "eighty")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOverride { ref variable, ref value, .. })
                if variable == "FARM_PORT" && value == "eighty"
        ));

        let result = config.apply_overrides(lookup_from(&[("FARM_ROLE", "tractor")]));
        assert!(matches!(result, Err(ConfigError::InvalidOverride { .. })));
    }

    #[test]
    fn role_and_mode_round_trip_names() {
        for role in [Role::Farm, Role::RelaySource, Role::RelayReceiver, Role::Sensor] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        for mode in [ReceiveMode::Push, ReceiveMode::Poll] {
            assert_eq!(mode.to_string().parse::<ReceiveMode>(), Ok(mode));
        }
    }
}
