/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Tests for batch resequencing: window sorting, capacity and timeout.

#[cfg(test)]
mod tests {
    use crate::resequencer::{
        BatchConfig, BatchResequencer, ConfigError, Deliver, DuplicatePolicy, KeyComparator,
        ManualClock, ResequencerError, SequenceComparator, SinkError, StopPolicy,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Batches = Arc<Mutex<Vec<Vec<u64>>>>;

    fn collector() -> (
        Batches,
        impl Fn(Vec<u64>) -> Result<(), SinkError> + Send + Sync + 'static,
    ) {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink_out = out.clone();
        (out, move |batch| {
            sink_out.lock().unwrap().push(batch);
            Ok(())
        })
    }

    fn config(capacity: usize) -> BatchConfig {
        BatchConfig {
            capacity,
            batch_timeout_ms: 1_000,
            ..BatchConfig::default()
        }
    }

    fn engine_with(
        config: BatchConfig,
    ) -> (
        BatchResequencer<u64, SequenceComparator>,
        Arc<ManualClock>,
        Batches,
    ) {
        let clock = Arc::new(ManualClock::new());
        let (out, sink) = collector();
        let engine =
            BatchResequencer::with_clock(SequenceComparator, config, sink, clock.clone()).unwrap();
        (engine, clock, out)
    }

    #[test]
    fn test_batch_sorted_by_comparator() {
        let (engine, _clock, out) = engine_with(config(5));

        for n in [5, 1, 4, 2, 3] {
            engine.push(n).unwrap();
        }

        assert_eq!(engine.deliver(), 5);
        assert_eq!(*out.lock().unwrap(), vec![vec![1, 2, 3, 4, 5]]);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_capacity_seals_window_immediately() {
        let (engine, _clock, out) = engine_with(config(3));

        engine.push(9).unwrap();
        engine.push(7).unwrap();
        assert_eq!(engine.sealed_batches(), 0);
        engine.push(8).unwrap();
        assert_eq!(engine.sealed_batches(), 1);
        assert!(engine.pending_elements().is_empty());

        // No time has passed: the sealed window goes out on the next tick anyway.
        assert_eq!(engine.tick(), 3);
        assert_eq!(*out.lock().unwrap(), vec![vec![7, 8, 9]]);
    }

    #[tokio::test]
    async fn test_capacity_fires_wake_signal() {
        let (engine, _clock, _out) = engine_with(config(2));
        let wake = engine.wake_signal().unwrap();

        engine.push(1).unwrap();
        engine.push(2).unwrap();

        // The stored permit makes the next wait complete immediately.
        let woken = tokio::time::timeout(Duration::from_millis(50), wake.notified()).await;
        assert!(woken.is_ok());
    }

    #[test]
    fn test_timeout_closes_partial_window() {
        let (engine, clock, out) = engine_with(config(10));

        for n in [30, 10, 20] {
            engine.push(n).unwrap();
        }

        clock.advance(Duration::from_millis(999));
        assert_eq!(engine.tick(), 0);
        assert!(out.lock().unwrap().is_empty());

        clock.advance(Duration::from_millis(1));
        assert_eq!(engine.tick(), 3);
        assert_eq!(engine.tick(), 0);
        assert_eq!(*out.lock().unwrap(), vec![vec![10, 20, 30]]);
    }

    #[test]
    fn test_window_deadline_starts_at_first_element() {
        let (engine, clock, out) = engine_with(config(10));

        clock.advance(Duration::from_millis(5_000));
        engine.push(1).unwrap();
        clock.advance(Duration::from_millis(500));
        assert_eq!(engine.tick(), 0);

        clock.advance(Duration::from_millis(500));
        assert_eq!(engine.tick(), 1);
        assert_eq!(*out.lock().unwrap(), vec![vec![1]]);
    }

    #[test]
    fn test_deliver_forces_open_window() {
        let (engine, _clock, out) = engine_with(config(10));

        engine.push(2).unwrap();
        engine.push(1).unwrap();

        assert_eq!(engine.deliver(), 2);
        assert_eq!(*out.lock().unwrap(), vec![vec![1, 2]]);
    }

    #[test]
    fn test_empty_deliver_is_noop() {
        let (engine, _clock, out) = engine_with(config(5));

        assert_eq!(engine.deliver(), 0);
        assert_eq!(engine.tick(), 0);
        assert!(out.lock().unwrap().is_empty());
        assert_eq!(engine.stats().batches, 0);
    }

    #[test]
    fn test_full_windows_delivered_in_arrival_order() {
        let (engine, _clock, out) = engine_with(config(2));

        for n in [8, 6, 3, 1, 5] {
            engine.push(n).unwrap();
        }
        assert_eq!(engine.sealed_batches(), 2);

        assert_eq!(engine.deliver(), 5);
        assert_eq!(
            *out.lock().unwrap(),
            vec![vec![6, 8], vec![1, 3], vec![5]]
        );
    }

    #[test]
    fn test_reverse_emits_descending() {
        let (engine, _clock, out) = engine_with(BatchConfig {
            reverse: true,
            ..config(4)
        });

        for n in [2, 4, 1, 3] {
            engine.push(n).unwrap();
        }
        engine.deliver();
        assert_eq!(*out.lock().unwrap(), vec![vec![4, 3, 2, 1]]);
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let (engine, _clock, _out) = engine_with(config(5));

        engine.push(1).unwrap();
        assert_eq!(engine.push(1), Err(ResequencerError::DuplicateKey));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_duplicates_allowed_when_configured() {
        let (engine, _clock, out) = engine_with(BatchConfig {
            duplicates: DuplicatePolicy::Allow,
            ..config(5)
        });

        for n in [3, 1, 3] {
            engine.push(n).unwrap();
        }
        engine.deliver();
        assert_eq!(*out.lock().unwrap(), vec![vec![1, 3, 3]]);
    }

    #[test]
    fn test_invalid_element_with_custom_comparator() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink_batches = batches.clone();
        let engine = BatchResequencer::new(
            KeyComparator::new(|s: &String| s.parse::<u64>().ok()),
            config(10),
            move |batch: Vec<String>| -> Result<(), SinkError> {
                sink_batches.lock().unwrap().push(batch);
                Ok(())
            },
        )
        .unwrap();

        engine.push("2".to_string()).unwrap();
        assert_eq!(
            engine.push("two".to_string()),
            Err(ResequencerError::InvalidElement)
        );
        engine.push("1".to_string()).unwrap();
        engine.deliver();

        assert_eq!(
            *batches.lock().unwrap(),
            vec![vec!["1".to_string(), "2".to_string()]]
        );
    }

    #[test]
    fn test_shutdown_flush_and_drop() {
        let (engine, _clock, out) = engine_with(config(10));
        engine.push(2).unwrap();
        engine.push(1).unwrap();
        assert_eq!(Deliver::shutdown(&engine, StopPolicy::Flush), 2);
        assert_eq!(*out.lock().unwrap(), vec![vec![1, 2]]);

        engine.push(3).unwrap();
        assert_eq!(Deliver::shutdown(&engine, StopPolicy::Drop), 1);
        assert_eq!(out.lock().unwrap().len(), 1);
        assert_eq!(engine.stats().dropped, 1);
    }

    #[test]
    fn test_zero_capacity_refused() {
        let (_out, sink) = collector();
        let result = BatchResequencer::new(SequenceComparator, config(0), sink);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "capacity", .. })
        ));
    }

    #[test]
    fn test_zero_interval_refused() {
        let (_out, sink) = collector();
        let result = BatchResequencer::new(
            SequenceComparator,
            BatchConfig {
                delivery_interval_ms: 0,
                ..config(10)
            },
            sink,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "delivery_interval_ms", .. })
        ));
    }
}
