//! Tests for the adapters.

use std::sync::Arc;

use super::*;
use crate::domain::DiscoveryConfig;
use crate::ports::{ConfigProvider, LivenessChecker, TimeSource, Transport};
use crate::test_utils::{local_addr, random_record};

// =============================================================================
// SystemTimeSource
// =============================================================================

#[test]
fn test_system_time_source_is_after_2020() {
    let now = SystemTimeSource::new().now();
    assert!(now.as_secs() > 1_577_836_800);
}

// =============================================================================
// StaticConfigProvider
// =============================================================================

#[test]
fn test_static_config_provider_defaults() {
    let provider = StaticConfigProvider::new();
    assert!(provider.get_bootstrap_nodes().is_empty());
    assert_eq!(provider.get_discovery_config(), DiscoveryConfig::default());
}

#[test]
fn test_static_config_provider_builder() {
    let record = random_record();
    let provider = StaticConfigProvider::new()
        .with_bootstrap_nodes(vec![record.clone()])
        .with_config(DiscoveryConfig::for_testing());

    assert_eq!(provider.get_bootstrap_nodes(), vec![record]);
    assert_eq!(provider.get_discovery_config().bucket_size, 3);
}

// =============================================================================
// ChannelLivenessChecker
// =============================================================================

#[tokio::test]
async fn test_channel_liveness_checker_forwards_records() {
    let (checker, mut rx) = ChannelLivenessChecker::channel();
    let record = random_record();

    checker.check_liveness(record.clone());

    assert_eq!(rx.recv().await, Some(record));
}

#[test]
fn test_channel_liveness_checker_tolerates_closed_receiver() {
    let (checker, rx) = ChannelLivenessChecker::channel();
    drop(rx);
    checker.check_liveness(random_record());
}

// =============================================================================
// Transports
// =============================================================================

#[tokio::test]
async fn test_recording_transport_keeps_order() {
    let transport = Arc::new(RecordingTransport::new());

    transport.send(vec![1], local_addr(1)).await.unwrap();
    transport.send(vec![2], local_addr(2)).await.unwrap();

    assert_eq!(transport.len(), 2);
    assert_eq!(
        transport.take(),
        vec![(vec![1], local_addr(1)), (vec![2], local_addr(2))]
    );
    assert!(transport.is_empty());
}

#[tokio::test]
async fn test_noop_transport_accepts_everything() {
    assert!(NoOpTransport::new().send(vec![0; 10], local_addr(1)).await.is_ok());
}

// =============================================================================
// TomlConfigProvider
// =============================================================================

#[cfg(feature = "network")]
mod toml_provider {
    use super::*;

    #[test]
    fn test_toml_config_full() {
        let record = random_record();
        let content = format!(
            r#"
            [bootstrap]
            records = ["{}"]

            [discovery]
            bucket_size = 8
            lookup_query_budget = 32
            "#,
            hex::encode(record.encode())
        );

        let provider = TomlConfigProvider::parse(&content).unwrap();

        assert_eq!(provider.get_bootstrap_nodes(), vec![record]);
        let config = provider.get_discovery_config();
        assert_eq!(config.bucket_size, 8);
        assert_eq!(config.lookup_query_budget, 32);
        assert_eq!(config.max_concurrent_queries, 3);
    }

    #[test]
    fn test_toml_config_empty_uses_defaults() {
        let provider = TomlConfigProvider::parse("").unwrap();
        assert!(provider.get_bootstrap_nodes().is_empty());
        assert_eq!(provider.get_discovery_config(), DiscoveryConfig::default());
    }

    #[test]
    fn test_toml_config_rejects_bad_record() {
        let content = r#"
            [bootstrap]
            records = ["zz"]
        "#;
        let result = TomlConfigProvider::parse(content);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_toml_config_rejects_zero_bucket_size() {
        let content = r#"
            [discovery]
            bucket_size = 0
        "#;
        assert!(matches!(
            TomlConfigProvider::parse(content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_toml_config_parse_error() {
        assert!(matches!(
            TomlConfigProvider::parse("[discovery"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_config_missing_file() {
        assert!(matches!(
            TomlConfigProvider::load("/nonexistent/discv5.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_udp_transport_sends_datagram() {
        let sender = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        sender.send(vec![7, 8, 9], target).await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[7, 8, 9]);
        assert_eq!(from, sender.local_addr().unwrap());
    }
}
