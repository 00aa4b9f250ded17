use crate::init_tracing;
use resequencer_rs::{
    BatchConfig, ConfigError, Resequencer, ResequencerError, SequenceComparator, SinkError,
    StopPolicy, StreamConfig, TokioClock,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_collector() -> (
        Arc<Mutex<Vec<u64>>>,
        impl Fn(u64) -> Result<(), SinkError> + Send + Sync + 'static,
    ) {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink_out = out.clone();
        (out, move |n| {
            sink_out.lock().unwrap().push(n);
            Ok(())
        })
    }

    fn batch_collector() -> (
        Arc<Mutex<Vec<Vec<u64>>>>,
        impl Fn(Vec<u64>) -> Result<(), SinkError> + Send + Sync + 'static,
    ) {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink_out = out.clone();
        (out, move |batch| {
            sink_out.lock().unwrap().push(batch);
            Ok(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_fails() {
        init_tracing();
        let (_out, sink) = stream_collector();
        let resequencer =
            Resequencer::stream(SequenceComparator, StreamConfig::default(), sink).unwrap();

        resequencer.start().unwrap();
        assert!(resequencer.is_running());
        assert_eq!(resequencer.start(), Err(ResequencerError::AlreadyStarted));

        resequencer.stop().await;
        assert!(!resequencer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        init_tracing();
        let (out, sink) = stream_collector();
        let resequencer = Resequencer::stream_with_clock(
            SequenceComparator,
            StreamConfig::default(),
            sink,
            Arc::new(TokioClock),
        )
        .unwrap();

        resequencer.start().unwrap();
        resequencer.push(1).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        resequencer.stop().await;

        resequencer.start().unwrap();
        resequencer.push(2).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        resequencer.stop().await;

        assert_eq!(*out.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_stop_drops_pending_by_default() {
        init_tracing();
        let (out, sink) = stream_collector();
        let resequencer = Resequencer::stream_with_clock(
            SequenceComparator,
            StreamConfig::default(),
            sink,
            Arc::new(TokioClock),
        )
        .unwrap();

        resequencer.start().unwrap();
        resequencer.push(1).unwrap();
        resequencer.push(3).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(resequencer.pending(), 1);

        assert_eq!(resequencer.stop().await, 1);
        assert_eq!(*out.lock().unwrap(), vec![1]);
        assert_eq!(resequencer.pending(), 0);
        assert_eq!(resequencer.engine().stats().dropped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_stop_can_flush() {
        init_tracing();
        let (out, sink) = stream_collector();
        let config = StreamConfig {
            stop_policy: StopPolicy::Flush,
            ..StreamConfig::default()
        };
        let resequencer =
            Resequencer::stream_with_clock(SequenceComparator, config, sink, Arc::new(TokioClock))
                .unwrap();

        resequencer.start().unwrap();
        resequencer.push(1).unwrap();
        resequencer.push(3).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(resequencer.stop().await, 1);
        assert_eq!(*out.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_stop_flushes_open_window() {
        init_tracing();
        let (out, sink) = batch_collector();
        let resequencer = Resequencer::batch_with_clock(
            SequenceComparator,
            BatchConfig::default(),
            sink,
            Arc::new(TokioClock),
        )
        .unwrap();

        resequencer.start().unwrap();
        for n in [4, 2, 3] {
            resequencer.push(n).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(out.lock().unwrap().is_empty());

        assert_eq!(resequencer.stop().await, 3);
        assert_eq!(*out.lock().unwrap(), vec![vec![2, 3, 4]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_timeout_through_lifecycle() {
        init_tracing();
        let (out, sink) = batch_collector();
        let config = BatchConfig {
            batch_timeout_ms: 500,
            ..BatchConfig::default()
        };
        let resequencer =
            Resequencer::batch_with_clock(SequenceComparator, config, sink, Arc::new(TokioClock))
                .unwrap();

        resequencer.start().unwrap();
        for n in [9, 7, 8] {
            resequencer.push(n).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(650)).await;

        assert_eq!(*out.lock().unwrap(), vec![vec![7, 8, 9]]);
        assert_eq!(resequencer.stop().await, 0);
    }

    #[tokio::test]
    async fn test_on_demand_deliver_without_driver() {
        init_tracing();
        let (out, sink) = batch_collector();
        let resequencer =
            Resequencer::batch(SequenceComparator, BatchConfig::default(), sink).unwrap();

        resequencer.push(2).unwrap();
        resequencer.push(1).unwrap();
        assert_eq!(resequencer.deliver(), 2);
        assert_eq!(*out.lock().unwrap(), vec![vec![1, 2]]);
        assert_eq!(resequencer.stop().await, 0);
    }

    #[tokio::test]
    async fn test_reset_stream_through_lifecycle() {
        let (_out, sink) = stream_collector();
        let resequencer =
            Resequencer::stream(SequenceComparator, StreamConfig::default(), sink).unwrap();

        resequencer.push(5).unwrap();
        resequencer.push(9).unwrap();
        assert_eq!(resequencer.reset_stream(), 2);
        assert_eq!(resequencer.pending(), 0);
    }

    #[test]
    fn test_constructors_validate_config() {
        let (_out, sink) = stream_collector();
        let config = StreamConfig {
            delivery_interval_ms: 0,
            ..StreamConfig::default()
        };
        assert!(matches!(
            Resequencer::stream(SequenceComparator, config, sink),
            Err(ConfigError::InvalidValue { field: "delivery_interval_ms", .. })
        ));

        let (_out, sink) = batch_collector();
        let config = BatchConfig {
            capacity: 0,
            ..BatchConfig::default()
        };
        assert!(matches!(
            Resequencer::batch(SequenceComparator, config, sink),
            Err(ConfigError::InvalidValue { field: "capacity", .. })
        ));
    }
}
