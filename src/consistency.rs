//! Consistency checks: the same (spec, query) must always produce the same
//! decision, however many times and on however many threads it is run.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::decision::{DecisionEngine, QueryContext};
use crate::spec::model::PersonaSpecV2;

/// Outcome of a consistency run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub runs: usize,
    /// Distinct consistency digests seen. Exactly one when consistent.
    pub digests: BTreeSet<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.digests.len() == 1
    }
}

/// Decide `runs` times in sequence.
pub fn check_repeated(
    engine: &DecisionEngine,
    spec: &PersonaSpecV2,
    query: &QueryContext,
    runs: usize,
) -> Result<ConsistencyReport, serde_json::Error> {
    let mut digests = BTreeSet::new();
    for _ in 0..runs {
        digests.insert(engine.decide(spec, query).consistency_digest()?);
    }
    Ok(report(runs, digests))
}

/// Decide once on each of `threads` scoped threads sharing one engine.
pub fn check_concurrent(
    engine: &DecisionEngine,
    spec: &PersonaSpecV2,
    query: &QueryContext,
    threads: usize,
) -> Result<ConsistencyReport, serde_json::Error> {
    let results = run_scoped(threads, || engine.decide(spec, query).consistency_digest());

    let mut digests = BTreeSet::new();
    for digest in results {
        digests.insert(digest?);
    }
    Ok(report(threads, digests))
}

/// Run `task` once on each of `threads` scoped threads. A panicking thread
/// re-raises its panic here, so every result comes from a completed run.
fn run_scoped<T, F>(threads: usize, task: F) -> Vec<T>
where
    T: Send,
    F: Fn() -> T + Sync,
{
    std::thread::scope(|scope| {
        let task = &task;
        let handles: Vec<_> = (0..threads).map(|_| scope.spawn(task)).collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

fn report(runs: usize, digests: BTreeSet<String>) -> ConsistencyReport {
    if digests.len() > 1 {
        log::warn!("{} runs produced {} distinct decisions", runs, digests.len());
    }
    ConsistencyReport { runs, digests }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::tests::sample_spec;
    use std::sync::Arc;

    fn query() -> QueryContext {
        QueryContext::new("career_advice", "honest feedback on a salary offer")
    }

    #[test]
    fn test_repeated_runs_agree() {
        let report = check_repeated(&DecisionEngine::default(), &sample_spec(), &query(), 25).unwrap();
        assert_eq!(report.runs, 25);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_threads_agree_with_sequential() {
        let engine = DecisionEngine::default();
        let spec = sample_spec();
        let sequential = check_repeated(&engine, &spec, &query(), 1).unwrap();
        let concurrent = check_concurrent(&engine, &spec, &query(), 8).unwrap();
        assert!(concurrent.is_consistent());
        assert_eq!(sequential.digests, concurrent.digests);
    }

    #[test]
    fn test_scoped_runs_return_one_result_per_thread() {
        assert_eq!(run_scoped(6, || 7).len(), 6);
        assert!(run_scoped(0, || 7).is_empty());
    }

    #[test]
    #[should_panic(expected = "decision thread failed")]
    fn test_panicking_thread_is_not_dropped() {
        run_scoped(4, || -> u8 { panic!("decision thread failed") });
    }

    #[test]
    fn test_engine_and_inputs_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DecisionEngine>();
        assert_send_sync::<PersonaSpecV2>();
        assert_send_sync::<QueryContext>();
    }

    #[tokio::test]
    async fn test_concurrent_tasks_agree() {
        let engine = Arc::new(DecisionEngine::default());
        let spec = Arc::new(sample_spec());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let (engine, spec) = (Arc::clone(&engine), Arc::clone(&spec));
            handles.push(tokio::spawn(async move {
                engine.decide(&spec, &query()).consistency_digest().unwrap()
            }));
        }
        let mut digests = BTreeSet::new();
        for handle in handles {
            digests.insert(handle.await.unwrap());
        }
        assert_eq!(digests.len(), 1);
    }
}
