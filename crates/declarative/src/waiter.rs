//! Reconciliation waiter
//!
//! Polls the status provider until every targeted kustomization is ready,
//! one of them fails, the deadline passes, or the caller cancels.

use crate::cancel::CancelToken;
use crate::context::{ProgressCallback, StatusProvider};
use crate::error::{Error, Result};
use crate::types::{UnitState, WaitOptions};
use blueprint::{DEFAULT_KUSTOMIZATION_TIMEOUT, DependencyGraph, Kustomization};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Polling state machine over a fixed set of kustomizations
pub struct Waiter<'a> {
    provider: &'a dyn StatusProvider,
    options: &'a WaitOptions,
    cancel: CancelToken,
}

impl<'a> Waiter<'a> {
    pub fn new(provider: &'a dyn StatusProvider, options: &'a WaitOptions) -> Self {
        Self {
            provider,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Stop the wait when `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Effective deadline: the graph's budget, narrowed by the caller's timeout
    pub fn deadline(&self, budget: Duration) -> Duration {
        match self.options.timeout {
            Some(limit) => budget.min(limit),
            None => budget,
        }
    }

    /// Wait for `names` within `budget` (narrowed by the configured timeout).
    ///
    /// Returns the number of units confirmed ready.
    pub fn wait(
        &self,
        message: &str,
        names: &[String],
        budget: Duration,
        progress: &mut dyn ProgressCallback,
    ) -> Result<usize> {
        let targets: BTreeSet<String> = names.iter().cloned().collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let deadline = self.deadline(budget);
        log::info!(
            "{message}: {} kustomization(s), deadline {}",
            targets.len(),
            blueprint::format_duration(deadline)
        );

        progress.on_wait_start(message, targets.len());
        let result = self.poll_until_done(targets, deadline, progress);
        progress.on_wait_complete(result.is_ok());
        result
    }

    fn poll_until_done(
        &self,
        targets: BTreeSet<String>,
        deadline: Duration,
        progress: &mut dyn ProgressCallback,
    ) -> Result<usize> {
        let total = targets.len();
        let start = Instant::now();
        let max_errors = self.options.max_consecutive_errors.max(1);
        let mut states: BTreeMap<String, UnitState> = targets
            .into_iter()
            .map(|name| (name, UnitState::Unobserved))
            .collect();
        let mut consecutive_errors = 0;

        loop {
            if self.cancel.is_canceled() {
                return Err(Error::Canceled);
            }

            let pending: Vec<String> = states
                .iter()
                .filter(|(_, state)| !state.is_terminal())
                .map(|(name, _)| name.clone())
                .collect();

            match self.provider.statuses(&pending) {
                Ok(reports) => {
                    consecutive_errors = 0;
                    for name in pending {
                        let report = reports.get(&name).cloned().unwrap_or_default();
                        let state = match report.state {
                            // Only this loop decides when time is up
                            UnitState::TimedOut => UnitState::InProgress,
                            other => other,
                        };
                        if state == UnitState::Failed {
                            log::warn!("kustomization '{name}' failed");
                            return Err(Error::ReconciliationFailed {
                                name,
                                message: report
                                    .message
                                    .unwrap_or_else(|| "reconciliation failed".to_string()),
                            });
                        }
                        if let Some(previous) = states.get_mut(&name)
                            && *previous != state
                        {
                            log::debug!("kustomization '{name}': {previous} -> {state}");
                            *previous = state;
                        }
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    log::warn!(
                        "status query failed ({consecutive_errors}/{max_errors}): {e:#}"
                    );
                    if consecutive_errors >= max_errors {
                        return Err(Error::Status {
                            message: format!("{e:#}"),
                        });
                    }
                }
            }

            let ready = states.values().filter(|s| **s == UnitState::Ready).count();
            progress.on_wait_progress(ready, total);
            if ready == total {
                log::info!("all {total} kustomization(s) ready");
                return Ok(total);
            }

            let elapsed = start.elapsed();
            if elapsed >= deadline {
                let pending: Vec<String> = states
                    .iter_mut()
                    .filter(|(_, state)| !state.is_terminal())
                    .map(|(name, state)| {
                        *state = UnitState::TimedOut;
                        name.clone()
                    })
                    .collect();
                return Err(Error::Timeout { pending });
            }

            if self
                .cancel
                .sleep(self.options.poll_interval.min(deadline - elapsed))
            {
                return Err(Error::Canceled);
            }
        }
    }
}

/// Names to wait for: `names` when given, otherwise every kustomization
/// that asks to be waited on
pub fn wait_targets(kustomizations: &[Kustomization], names: &[String]) -> Vec<String> {
    if !names.is_empty() {
        return names.to_vec();
    }
    kustomizations
        .iter()
        .filter(|k| k.should_wait())
        .map(|k| k.name.clone())
        .collect()
}

/// Wait budget for a set of kustomizations.
///
/// Falls back to the default per-unit timeout when the graph has nothing to
/// charge, e.g. when waiting on names the blueprint does not declare.
pub fn wait_budget(kustomizations: &[Kustomization]) -> Duration {
    let budget = DependencyGraph::from_kustomizations(kustomizations).max_wait_time();
    if budget.is_zero() {
        DEFAULT_KUSTOMIZATION_TIMEOUT
    } else {
        budget
    }
}

/// Wait for kustomizations declared in a blueprint.
///
/// An empty `names` waits on every unit whose `wait` flag is set.
pub fn wait_for_kustomizations(
    provider: &dyn StatusProvider,
    kustomizations: &[Kustomization],
    message: &str,
    names: &[String],
    options: &WaitOptions,
    cancel: CancelToken,
    progress: &mut dyn ProgressCallback,
) -> Result<usize> {
    let targets = wait_targets(kustomizations, names);
    Waiter::new(provider, options).with_cancel(cancel).wait(
        message,
        &targets,
        wait_budget(kustomizations),
        progress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::types::StatusReport;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::thread;

    /// Replays one scripted response per poll, repeating the last one
    struct Scripted {
        polls: Mutex<Vec<anyhow::Result<HashMap<String, StatusReport>>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(polls: Vec<anyhow::Result<HashMap<String, StatusReport>>>) -> Self {
            Self {
                polls: Mutex::new(polls),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl StatusProvider for Scripted {
        fn statuses(&self, names: &[String]) -> anyhow::Result<HashMap<String, StatusReport>> {
            self.calls.lock().unwrap().push(names.to_vec());
            let mut polls = self.polls.lock().unwrap();
            if polls.len() > 1 {
                polls.remove(0)
            } else {
                match polls.first() {
                    Some(Ok(map)) => Ok(map.clone()),
                    Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
                    None => Ok(HashMap::new()),
                }
            }
        }
    }

    fn reports(entries: &[(&str, UnitState)]) -> anyhow::Result<HashMap<String, StatusReport>> {
        Ok(entries
            .iter()
            .map(|(name, state)| ((*name).to_string(), StatusReport::new(*state)))
            .collect())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn fast() -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_millis(5),
            timeout: None,
            max_consecutive_errors: 3,
        }
    }

    #[test]
    fn test_all_ready() {
        let provider = Scripted::new(vec![
            reports(&[("a", UnitState::InProgress)]),
            reports(&[("a", UnitState::Ready), ("b", UnitState::Ready)]),
        ]);
        let options = fast();
        let ready = Waiter::new(&provider, &options)
            .wait("Waiting", &names(&["a", "b"]), Duration::from_secs(5), &mut NoProgress)
            .unwrap();
        assert_eq!(ready, 2);
        assert_eq!(provider.calls().len(), 2);
    }

    #[test]
    fn test_polls_only_pending_units_in_one_batch() {
        let provider = Scripted::new(vec![
            reports(&[("a", UnitState::Ready)]),
            reports(&[("b", UnitState::Ready)]),
        ]);
        let options = fast();
        Waiter::new(&provider, &options)
            .wait("Waiting", &names(&["a", "b"]), Duration::from_secs(5), &mut NoProgress)
            .unwrap();
        assert_eq!(provider.calls(), vec![names(&["a", "b"]), names(&["b"])]);
    }

    #[test]
    fn test_failure_returns_immediately() {
        let provider = Scripted::new(vec![Ok(HashMap::from([(
            "ingress".to_string(),
            StatusReport::with_message(UnitState::Failed, "kustomize build failed"),
        )]))]);
        let options = WaitOptions {
            poll_interval: Duration::from_secs(10),
            ..fast()
        };

        let start = Instant::now();
        let err = Waiter::new(&provider, &options)
            .wait(
                "Waiting",
                &names(&["ingress"]),
                Duration::from_secs(600),
                &mut NoProgress,
            )
            .unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(provider.calls().len(), 1);
        match err {
            Error::ReconciliationFailed { name, message } => {
                assert_eq!(name, "ingress");
                assert_eq!(message, "kustomize build failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_names_pending_units() {
        let provider = Scripted::new(vec![reports(&[
            ("a", UnitState::Ready),
            ("c", UnitState::InProgress),
        ])]);
        let options = fast();
        let err = Waiter::new(&provider, &options)
            .wait(
                "Waiting",
                &names(&["c", "b", "a"]),
                Duration::from_millis(30),
                &mut NoProgress,
            )
            .unwrap_err();
        match err {
            Error::Timeout { pending } => assert_eq!(pending, names(&["b", "c"])),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_caller_timeout_narrows_budget() {
        let provider = Scripted::new(vec![reports(&[])]);
        let options = WaitOptions {
            timeout: Some(Duration::from_millis(20)),
            ..fast()
        };
        let waiter = Waiter::new(&provider, &options);
        assert_eq!(
            waiter.deadline(Duration::from_secs(60)),
            Duration::from_millis(20)
        );

        let start = Instant::now();
        let err = waiter
            .wait("Waiting", &names(&["a"]), Duration::from_secs(60), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let provider = Scripted::new(vec![reports(&[("a", UnitState::InProgress)])]);
        let options = WaitOptions {
            poll_interval: Duration::from_secs(30),
            ..fast()
        };
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        let err = Waiter::new(&provider, &options)
            .with_cancel(cancel)
            .wait("Waiting", &names(&["a"]), Duration::from_secs(600), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::Canceled));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_status_errors_tolerated_up_to_limit() {
        let provider = Scripted::new(vec![
            Err(anyhow::anyhow!("connection refused")),
            Err(anyhow::anyhow!("connection refused")),
            reports(&[("a", UnitState::Ready)]),
        ]);
        let options = fast();
        let ready = Waiter::new(&provider, &options)
            .wait("Waiting", &names(&["a"]), Duration::from_secs(5), &mut NoProgress)
            .unwrap();
        assert_eq!(ready, 1);

        let failing = Scripted::new(vec![Err(anyhow::anyhow!("unauthorized"))]);
        let err = Waiter::new(&failing, &options)
            .wait("Waiting", &names(&["a"]), Duration::from_secs(5), &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::Status { ref message } if message == "unauthorized"));
        assert_eq!(failing.calls().len(), 3);
    }

    #[test]
    fn test_targets_default_to_waited_units() {
        let units = vec![
            Kustomization::new("a"),
            Kustomization {
                wait: Some(false),
                ..Kustomization::new("b")
            },
        ];
        assert_eq!(wait_targets(&units, &[]), names(&["a"]));
        assert_eq!(wait_targets(&units, &names(&["b"])), names(&["b"]));
        assert_eq!(wait_budget(&[]), DEFAULT_KUSTOMIZATION_TIMEOUT);
    }

    #[test]
    fn test_nothing_to_wait_for() {
        let provider = Scripted::new(vec![]);
        let units = vec![Kustomization {
            wait: Some(false),
            ..Kustomization::new("a")
        }];
        let ready = wait_for_kustomizations(
            &provider,
            &units,
            "Waiting",
            &[],
            &fast(),
            CancelToken::new(),
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(ready, 0);
        assert!(provider.calls().is_empty());
    }
}
