use rdkafka::ClientConfig;

use crate::error::ConfigError;

/// Comma-separated broker list for the consumer side.
pub const CONSUMER_ADDRESS_VAR: &str = "KAFKA_CONSUMER_ADDRESS";
/// Comma-separated broker list for the producer side.
pub const PRODUCER_ADDRESS_VAR: &str = "KAFKA_PRODUCER_ADDRESS";

/// Read a broker list from the environment. An unset variable and a
/// variable with no usable entries are distinct startup errors.
pub fn brokers_from_env(var: &'static str) -> Result<Vec<String>, ConfigError> {
    let raw = std::env::var(var).map_err(|_| ConfigError::Unset(var))?;
    let brokers = parse_broker_list(&raw);
    if brokers.is_empty() {
        return Err(ConfigError::Empty(var));
    }
    Ok(brokers)
}

/// Split on commas, trim whitespace, drop empty entries.
fn parse_broker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Consumer defaults: newest offsets for a fresh group, cooperative
/// sticky assignment, and autocommit of explicitly stored offsets only.
/// The claim loop stores an offset after its handler succeeds, so only
/// handled messages ever get committed.
pub fn consumer_client_config() -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("auto.offset.reset", "latest")
        .set("partition.assignment.strategy", "cooperative-sticky")
        .set("enable.auto.commit", "true")
        .set("auto.commit.interval.ms", "5000")
        .set("enable.auto.offset.store", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.partition.eof", "false");
    config
}

/// Producer defaults: a bounded delivery timeout so shutdown cannot
/// hang on undeliverable messages.
pub fn producer_client_config() -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("message.timeout.ms", "30000");
    config
}
