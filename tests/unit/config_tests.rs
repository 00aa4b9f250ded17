use resequencer_rs::{
    BatchConfig, ConfigError, DuplicatePolicy, ResequencerConfig, StatsSnapshot, StopPolicy,
    StreamConfig,
};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    // --- defaults ---

    #[test]
    fn test_batch_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.batch_timeout(), Duration::from_secs(1));
        assert_eq!(config.delivery_interval(), Duration::from_millis(100));
        assert_eq!(config.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.stop_policy, StopPolicy::Flush);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stream_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.capacity, Some(1_000));
        assert_eq!(config.out_of_sequence_timeout(), Duration::from_secs(1));
        assert_eq!(config.stop_policy, StopPolicy::Drop);
        assert!(!config.reject_old);
        assert!(config.validate().is_ok());
    }

    // --- JSON loading ---

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = ResequencerConfig::from_json(r#"{ "mode": "batch", "capacity": 5 }"#).unwrap();
        let ResequencerConfig::Batch(batch) = config else {
            panic!("expected batch mode");
        };
        assert_eq!(batch.capacity, 5);
        assert_eq!(batch.batch_timeout_ms, 1_000);
    }

    #[test]
    fn test_from_json_stream_options() {
        let config = ResequencerConfig::from_json(
            r#"{
                "mode": "stream",
                "capacity": null,
                "out_of_sequence_timeout_ms": 250,
                "delivery_interval_ms": 50,
                "reject_old": true,
                "duplicates": "replace",
                "stop_policy": "flush"
            }"#,
        )
        .unwrap();

        assert_eq!(config.delivery_interval(), Duration::from_millis(50));
        assert_eq!(config.stop_policy(), StopPolicy::Flush);
        let ResequencerConfig::Stream(stream) = config else {
            panic!("expected stream mode");
        };
        assert_eq!(stream.capacity, None);
        assert_eq!(stream.out_of_sequence_timeout(), Duration::from_millis(250));
        assert!(stream.reject_old);
        assert_eq!(stream.duplicates, DuplicatePolicy::Replace);
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let result = ResequencerConfig::from_json(r#"{ "mode": "sideways" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let result = ResequencerConfig::from_json("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // --- validation ---

    #[test]
    fn test_zero_batch_capacity_invalid() {
        let result = ResequencerConfig::from_json(r#"{ "mode": "batch", "capacity": 0 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "capacity", .. })
        ));
    }

    #[test]
    fn test_zero_timeouts_invalid() {
        let batch = BatchConfig {
            batch_timeout_ms: 0,
            ..BatchConfig::default()
        };
        assert!(batch.validate().is_err());

        let stream = StreamConfig {
            out_of_sequence_timeout_ms: 0,
            ..StreamConfig::default()
        };
        assert!(stream.validate().is_err());

        let stream = StreamConfig {
            delivery_interval_ms: 0,
            ..StreamConfig::default()
        };
        assert!(stream.validate().is_err());
    }

    #[test]
    fn test_stream_rejects_allowed_duplicates() {
        let stream = StreamConfig {
            duplicates: DuplicatePolicy::Allow,
            ..StreamConfig::default()
        };
        let err = stream.validate().unwrap_err();
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ResequencerConfig::Stream(StreamConfig {
            reject_old: true,
            ..StreamConfig::default()
        });
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""mode":"stream""#));
        assert_eq!(ResequencerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_stats_snapshot_serializes() {
        let snapshot = StatsSnapshot {
            delivered: 3,
            forced: 1,
            ..StatsSnapshot::default()
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["delivered"], 3);
        assert_eq!(json["forced"], 1);
    }
}
