//! Cache warming and neighbour prefetch.
//!
//! Both run the orchestrator with full orchestration disabled, so they are
//! cheap: context load plus detectors, no agents and no generator.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use stride_core::{DomainId, FallbackLevel};
use tracing::{debug, info, warn};

use crate::orchestrator::Orchestrator;
use crate::request::OrchestrationRequest;

/// Outcome of a [`warmup`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupReport {
    pub warmed: Vec<DomainId>,
    pub failed: Vec<DomainId>,
}

/// Domains a user usually visits next from `current`.
pub fn neighbours(current: DomainId) -> &'static [DomainId] {
    use DomainId::*;
    match current {
        Profile => &[Goals, Budget],
        Goals => &[Budget, Jobs],
        Budget => &[Goals, Trade],
        Trade => &[Budget, Discovery],
        Jobs => &[Goals, Discovery],
        Discovery => &[Jobs, Trade],
    }
}

fn cheap_request(domain: DomainId, user_id: &str) -> OrchestrationRequest {
    OrchestrationRequest::new(domain, user_id).with_full_orchestration(false)
}

/// Run a cheap pass for every domain in `domains` (all of them when
/// `None`) concurrently.
///
/// A domain counts as failed when its task dies or it ends on the static
/// tier. Failures never abort the other domains.
pub async fn warmup(
    orchestrator: &Orchestrator,
    user_id: &str,
    domains: Option<&[DomainId]>,
) -> WarmupReport {
    let domains = domains.unwrap_or(&DomainId::ALL[..]).to_vec();
    info!(user_id, domains = domains.len(), "Warming up");

    let handles: Vec<_> = domains
        .iter()
        .map(|&domain| {
            let orchestrator = orchestrator.clone();
            let request = cheap_request(domain, user_id);
            tokio::spawn(async move { orchestrator.run(request).await })
        })
        .collect();

    let mut report = WarmupReport::default();
    for (domain, joined) in domains.into_iter().zip(join_all(handles).await) {
        match joined {
            Ok(result) if result.processing_info.fallback_level < FallbackLevel::STATIC => {
                report.warmed.push(domain);
            }
            Ok(_) => {
                debug!(%domain, "Warmup fell back to static tip");
                report.failed.push(domain);
            }
            Err(e) => {
                warn!(%domain, error = %e, "Warmup task failed");
                report.failed.push(domain);
            }
        }
    }
    report
}

/// Schedule cheap passes for the neighbours of `current` that are not in
/// `cached`. Returns without waiting; the tasks run detached.
///
/// Must be called from within a Tokio runtime.
pub fn prefetch(
    orchestrator: &Orchestrator,
    user_id: &str,
    current: DomainId,
    cached: &[DomainId],
) -> Vec<DomainId> {
    let scheduled: Vec<DomainId> = neighbours(current)
        .iter()
        .copied()
        .filter(|d| !cached.contains(d))
        .collect();

    for &domain in &scheduled {
        let orchestrator = orchestrator.clone();
        let request = cheap_request(domain, user_id);
        tokio::spawn(async move {
            let result = orchestrator.run(request).await;
            if result.processing_info.fallback_level == FallbackLevel::STATIC {
                warn!(%domain, "Prefetch fell back to static tip");
            }
        });
    }

    debug!(%current, scheduled = scheduled.len(), "Prefetch scheduled");
    scheduled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_agents::LocalAgents;
    use crate::test_helpers::{FailingStore, ScriptedGenerator};
    use std::sync::Arc;
    use stride_store::InMemoryContextStore;
    use stride_telemetry::TraceRecorder;

    fn orchestrator() -> Orchestrator {
        Orchestrator::builder(
            Arc::new(InMemoryContextStore::new()),
            Arc::new(LocalAgents::default()),
        )
        .build()
    }

    #[test]
    fn every_domain_has_two_distinct_neighbours() {
        for domain in DomainId::ALL {
            let n = neighbours(domain);
            assert_eq!(n.len(), 2);
            assert!(!n.contains(&domain));
            assert_ne!(n[0], n[1]);
        }
    }

    #[tokio::test]
    async fn warms_every_domain_by_default() {
        let report = warmup(&orchestrator(), "u1", None).await;
        assert_eq!(report.warmed, DomainId::ALL.to_vec());
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn warmup_never_calls_the_generator() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let orchestrator = Orchestrator::builder(
            Arc::new(InMemoryContextStore::new()),
            Arc::new(LocalAgents::default()),
        )
        .generator(generator.clone())
        .build();
        let report = warmup(&orchestrator, "u1", Some(&[DomainId::Jobs])).await;
        assert_eq!(report.warmed, vec![DomainId::Jobs]);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() {
        let orchestrator =
            Orchestrator::builder(Arc::new(FailingStore), Arc::new(LocalAgents::default())).build();
        let report = warmup(&orchestrator, "u1", Some(&[DomainId::Budget, DomainId::Goals])).await;
        assert!(report.warmed.is_empty());
        assert_eq!(report.failed, vec![DomainId::Budget, DomainId::Goals]);
    }

    #[tokio::test]
    async fn prefetch_skips_cached_domains() {
        let scheduled = prefetch(&orchestrator(), "u1", DomainId::Budget, &[DomainId::Goals]);
        assert_eq!(scheduled, vec![DomainId::Trade]);
        let scheduled = prefetch(&orchestrator(), "u1", DomainId::Budget, &[]);
        assert_eq!(scheduled, vec![DomainId::Goals, DomainId::Trade]);
        let scheduled = prefetch(
            &orchestrator(),
            "u1",
            DomainId::Budget,
            &[DomainId::Goals, DomainId::Trade],
        );
        assert!(scheduled.is_empty());
    }

    #[tokio::test]
    async fn prefetched_calls_run_in_the_background() {
        let recorder = Arc::new(TraceRecorder::new());
        let orchestrator = Orchestrator::builder(
            Arc::new(InMemoryContextStore::new()),
            Arc::new(LocalAgents::default()),
        )
        .sink(recorder.clone())
        .build();

        let scheduled = prefetch(&orchestrator, "u1", DomainId::Profile, &[]);
        assert_eq!(scheduled.len(), 2);

        // Degraded calls are always sampled, so each prefetch leaves a trace.
        for _ in 0..100 {
            if recorder.len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.len(), 2);
    }
}
