use clap::{Arg, ArgMatches, Command};

pub const ARG_KAFKA_BROKERS: &str = "kafka-brokers";
pub const ARG_KAFKA_TOPIC: &str = "kafka-topic";
pub const ARG_KAFKA_GROUP_ID: &str = "kafka-group-id";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_KAFKA_BROKERS)
                .long(ARG_KAFKA_BROKERS)
                .help("Kafka bootstrap servers; user replication is disabled when unset")
                .env("CUSTOS_KAFKA_BROKERS"),
        )
        .arg(
            Arg::new(ARG_KAFKA_TOPIC)
                .long(ARG_KAFKA_TOPIC)
                .help("Topic carrying user replication events")
                .env("CUSTOS_KAFKA_TOPIC")
                .default_value("users"),
        )
        .arg(
            Arg::new(ARG_KAFKA_GROUP_ID)
                .long(ARG_KAFKA_GROUP_ID)
                .help("Consumer group id for inbound replication")
                .env("CUSTOS_KAFKA_GROUP_ID")
                .default_value("custos"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub brokers: Option<String>,
    pub topic: String,
    pub group_id: String,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        Self {
            brokers: get_non_empty(ARG_KAFKA_BROKERS),
            topic: get_non_empty(ARG_KAFKA_TOPIC).unwrap_or_else(|| "users".to_string()),
            group_id: get_non_empty(ARG_KAFKA_GROUP_ID).unwrap_or_else(|| "custos".to_string()),
        }
    }
}
