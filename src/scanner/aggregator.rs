//! Single-writer result collection
//!
//! Exactly one task owns the result vector; workers only ever see the sending
//! half of the channel, so the collection needs no lock.

use std::collections::HashSet;
use std::hash::Hash;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Collects probe results from the result channel until every sender is gone
pub struct Aggregator<T> {
    handle: JoinHandle<Vec<T>>,
}

impl<T> Aggregator<T>
where
    T: Eq + Hash + Clone + Send + 'static,
{
    /// Start draining `rx` in a background task
    pub fn spawn(mut rx: mpsc::Receiver<T>) -> Self {
        let handle = tokio::spawn(async move {
            let mut seen = HashSet::new();
            let mut collected = Vec::new();

            while let Some(result) = rx.recv().await {
                if seen.insert(result.clone()) {
                    collected.push(result);
                } else {
                    log::trace!("Dropping duplicate result");
                }
            }

            collected
        });

        Self { handle }
    }

    /// Wait for end-of-stream and take the collection.
    ///
    /// Only returns once every sender has been dropped.
    pub async fn finish(self) -> Vec<T> {
        match self.handle.await {
            Ok(collected) => collected,
            Err(e) => {
                log::error!("Result aggregator failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Put a frozen result set into its final order
pub fn sort_results<T: Ord>(results: &mut [T]) {
    // stable, so equal keys keep arrival order
    results.sort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_collects_until_all_senders_dropped() {
        let (tx, rx) = mpsc::channel(2);
        let aggregator = Aggregator::spawn(rx);

        let tx2 = tx.clone();
        tokio::spawn(async move {
            for port in [443u16, 22] {
                tx2.send(port).await.unwrap();
            }
        });
        tx.send(80).await.unwrap();
        drop(tx);

        let mut ports = aggregator.finish().await;
        sort_results(&mut ports);
        assert_eq!(ports, vec![22, 80, 443]);
    }

    #[tokio::test]
    async fn test_duplicates_collapsed() {
        let (tx, rx) = mpsc::channel(10);
        let aggregator = Aggregator::spawn(rx);

        for port in [80u16, 80, 81, 80] {
            tx.send(port).await.unwrap();
        }
        drop(tx);

        assert_eq!(aggregator.finish().await, vec![80, 81]);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let (tx, rx) = mpsc::channel::<u16>(1);
        let aggregator = Aggregator::spawn(rx);
        drop(tx);
        assert!(aggregator.finish().await.is_empty());
    }

    #[test]
    fn test_addresses_sort_by_bytes() {
        let mut hosts = vec![
            Ipv4Addr::new(10, 0, 0, 10),
            Ipv4Addr::new(10, 0, 0, 2),
            Ipv4Addr::new(9, 255, 255, 255),
        ];
        sort_results(&mut hosts);
        assert_eq!(
            hosts,
            vec![
                Ipv4Addr::new(9, 255, 255, 255),
                Ipv4Addr::new(10, 0, 0, 2),
                Ipv4Addr::new(10, 0, 0, 10),
            ]
        );
    }
}
