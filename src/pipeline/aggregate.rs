//! Fan-in of worker outcomes.

use std::path::PathBuf;

use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use super::Outcome;
use crate::extract::ExtractError;
use crate::record::Extracted;

/// An archive that produced no record, with the reason.
#[derive(Debug)]
pub struct Failure {
    /// The archive that failed.
    pub path: PathBuf,
    /// Why it failed.
    pub error: ExtractError,
}

/// Outcomes of one pool run, partitioned by result.
#[derive(Debug, Default)]
pub struct Harvested {
    /// Successfully extracted records with their archives, in completion order.
    pub records: Vec<Extracted>,
    /// Archives that produced no record, in completion order.
    pub failures: Vec<Failure>,
    /// Outcomes that never arrived because every sender disconnected early.
    pub missing: usize,
}

impl Harvested {
    /// Returns the number of outcomes received.
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len()
    }
}

/// Drains exactly `expected` outcomes from `results`.
///
/// Blocks until each outcome arrives. Never reads past `expected`, so the
/// channel may carry further messages for another consumer. If all senders
/// hang up first, the shortfall is recorded in [`Harvested::missing`].
pub fn collect(results: &Receiver<Outcome>, expected: usize) -> Harvested {
    let mut harvested = Harvested {
        records: Vec::with_capacity(expected),
        failures: Vec::new(),
        missing: 0,
    };

    for received in 0..expected {
        let Ok(outcome) = results.recv() else {
            harvested.missing = expected - received;
            warn!(
                received,
                expected, "result channel closed before every outcome arrived"
            );
            break;
        };

        match outcome.result {
            Ok(record) => {
                debug!(path = %outcome.path.display(), name = %record.name, "collected record");
                harvested.records.push(Extracted {
                    path: outcome.path,
                    record,
                });
            }
            Err(error) => {
                warn!(
                    path = %outcome.path.display(),
                    kind = %error.kind(),
                    error = %error,
                    "archive skipped"
                );
                harvested.failures.push(Failure {
                    path: outcome.path,
                    error,
                });
            }
        }
    }

    harvested
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::record::Record;

    fn ok(path: &str, name: &str) -> Outcome {
        Outcome {
            path: PathBuf::from(path),
            result: Ok(Record::new("1,2", "", name)),
        }
    }

    fn no_member(path: &str) -> Outcome {
        Outcome {
            path: PathBuf::from(path),
            result: Err(ExtractError::NoMatchingMember {
                path: PathBuf::from(path),
            }),
        }
    }

    #[test]
    fn test_collect_partitions_outcomes() {
        let (tx, rx) = unbounded();
        tx.send(ok("a.kmz", "A")).unwrap();
        tx.send(no_member("b.kmz")).unwrap();
        tx.send(ok("c.kmz", "C")).unwrap();

        let harvested = collect(&rx, 3);

        assert_eq!(harvested.records.len(), 2);
        assert_eq!(harvested.records[0].path, PathBuf::from("a.kmz"));
        assert_eq!(harvested.records[0].record.name, "A");
        assert_eq!(harvested.failures.len(), 1);
        assert_eq!(harvested.failures[0].path, PathBuf::from("b.kmz"));
        assert_eq!(harvested.total(), 3);
        assert_eq!(harvested.missing, 0);
    }

    #[test]
    fn test_collect_reads_no_more_than_expected() {
        let (tx, rx) = unbounded();
        for name in ["A", "B", "C"] {
            tx.send(ok("x.kmz", name)).unwrap();
        }

        let harvested = collect(&rx, 2);

        assert_eq!(harvested.total(), 2);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_collect_zero_expected_returns_immediately() {
        let (_tx, rx) = unbounded::<Outcome>();
        let harvested = collect(&rx, 0);
        assert_eq!(harvested.total(), 0);
    }

    #[test]
    fn test_collect_records_shortfall_when_senders_hang_up() {
        let (tx, rx) = unbounded();
        tx.send(ok("a.kmz", "A")).unwrap();
        drop(tx);

        let harvested = collect(&rx, 3);

        assert_eq!(harvested.total(), 1);
        assert_eq!(harvested.missing, 2);
    }
}
