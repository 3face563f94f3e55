//! Parallel sub-agent fan-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use attache_events::EventBus;
use attache_models::{BusEvent, SwarmTask};

use crate::error::{Result, SwarmError};

/// Hard cap on parallel sub-agents per dispatch.
pub const MAX_AGENTS: usize = 10;

/// Delay between consecutive sub-agent launches, to avoid hammering the
/// upstream model API with a burst of simultaneous requests.
pub const STAGGER: Duration = Duration::from_millis(1000);

/// Runs one sub-agent task to completion.
///
/// The dispatcher is transport-agnostic; the production runner drives an LLM
/// reasoning loop, while tests substitute canned responders.
#[async_trait]
pub trait SubAgentRunner: Send + Sync {
    async fn run(&self, task: &SwarmTask) -> Result<String>;
}

/// Fans a list of prompts out to parallel sub-agents and aggregates their
/// reports into a single text block.
#[derive(Clone)]
pub struct SwarmDispatcher {
    bus: EventBus,
}

impl SwarmDispatcher {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// Dispatches up to [`MAX_AGENTS`] tasks. Launches are staggered by
    /// [`STAGGER`] per index, all tasks run concurrently, and the combined
    /// report preserves task order regardless of completion order. A failed
    /// sub-agent contributes an error line instead of aborting its siblings.
    pub async fn dispatch(
        &self,
        prompts: Vec<String>,
        shared_instruction: &str,
        runner: Arc<dyn SubAgentRunner>,
    ) -> Result<String> {
        if prompts.len() > MAX_AGENTS {
            return Err(SwarmError::TooManyTasks {
                count: prompts.len(),
            });
        }

        info!(agents = prompts.len(), "dispatching swarm");
        self.log(format!("Dispatching swarm of {} agents", prompts.len()));

        let tasks: Vec<SwarmTask> = prompts
            .into_iter()
            .enumerate()
            .map(|(index, prompt)| SwarmTask {
                index,
                prompt,
                shared_instruction: shared_instruction.to_string(),
            })
            .collect();

        let futures = tasks.into_iter().map(|task| {
            let runner = runner.clone();
            async move {
                tokio::time::sleep(STAGGER * task.index as u32).await;
                let outcome = runner.run(&task).await;
                (task, outcome)
            }
        });

        let mut sections = Vec::new();
        for (task, outcome) in join_all(futures).await {
            match outcome {
                Ok(report) => {
                    sections.push(format!("[Agent #{} Result]: {}", task.agent_number(), report));
                }
                Err(e) => {
                    warn!(agent = task.agent_number(), error = %e, "sub-agent failed");
                    sections.push(format!("[Agent #{} Error]: {}", task.agent_number(), e));
                }
            }
        }

        self.log("Swarm complete".to_string());
        Ok(sections.join("\n\n---\n\n"))
    }

    fn log(&self, content: String) {
        if let Err(e) = self.bus.publish(BusEvent::AgentLog {
            role: "swarm".to_string(),
            content,
        }) {
            warn!(error = %e, "failed to publish swarm log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    struct EchoRunner;

    #[async_trait]
    impl SubAgentRunner for EchoRunner {
        async fn run(&self, task: &SwarmTask) -> Result<String> {
            Ok(format!("done: {}", task.prompt))
        }
    }

    struct FlakyRunner;

    #[async_trait]
    impl SubAgentRunner for FlakyRunner {
        async fn run(&self, task: &SwarmTask) -> Result<String> {
            if task.index == 1 {
                Err(SwarmError::Agent("FAILED: no data".to_string()))
            } else {
                Ok("ok".to_string())
            }
        }
    }

    /// Completes tasks in reverse launch order.
    struct SlowFirstRunner;

    #[async_trait]
    impl SubAgentRunner for SlowFirstRunner {
        async fn run(&self, task: &SwarmTask) -> Result<String> {
            if task.index == 0 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok(format!("report {}", task.agent_number()))
        }
    }

    struct CountingRunner(AtomicUsize);

    #[async_trait]
    impl SubAgentRunner for CountingRunner {
        async fn run(&self, _task: &SwarmTask) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("counted".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_aggregates_in_order() {
        let dispatcher = SwarmDispatcher::new(EventBus::new());
        let report = dispatcher
            .dispatch(
                vec!["alpha".into(), "beta".into()],
                "research",
                Arc::new(EchoRunner),
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            "[Agent #1 Result]: done: alpha\n\n---\n\n[Agent #2 Result]: done: beta"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_survives_out_of_order_completion() {
        let dispatcher = SwarmDispatcher::new(EventBus::new());
        let report = dispatcher
            .dispatch(
                vec!["a".into(), "b".into(), "c".into()],
                "",
                Arc::new(SlowFirstRunner),
            )
            .await
            .unwrap();

        let lines: Vec<&str> = report.split("\n\n---\n\n").collect();
        assert_eq!(
            lines,
            vec![
                "[Agent #1 Result]: report 1",
                "[Agent #2 Result]: report 2",
                "[Agent #3 Result]: report 3"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_captured_not_fatal() {
        let dispatcher = SwarmDispatcher::new(EventBus::new());
        let report = dispatcher
            .dispatch(
                vec!["a".into(), "b".into(), "c".into()],
                "",
                Arc::new(FlakyRunner),
            )
            .await
            .unwrap();

        assert!(report.contains("[Agent #1 Result]: ok"));
        assert!(report.contains("[Agent #2 Error]: FAILED: no data"));
        assert!(report.contains("[Agent #3 Result]: ok"));
    }

    #[tokio::test]
    async fn test_cap_rejected_before_any_launch() {
        let dispatcher = SwarmDispatcher::new(EventBus::new());
        let counter = Arc::new(CountingRunner(AtomicUsize::new(0)));
        let prompts: Vec<String> = (0..11).map(|i| format!("task {}", i)).collect();

        let result = dispatcher.dispatch(prompts, "", counter.clone()).await;

        assert!(matches!(result, Err(SwarmError::TooManyTasks { count: 11 })));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launches_staggered() {
        struct StampRunner(std::sync::Mutex<Vec<Duration>>, Instant);

        #[async_trait]
        impl SubAgentRunner for StampRunner {
            async fn run(&self, _task: &SwarmTask) -> Result<String> {
                self.0.lock().unwrap().push(Instant::now() - self.1);
                Ok("stamped".to_string())
            }
        }

        let dispatcher = SwarmDispatcher::new(EventBus::new());
        let runner = Arc::new(StampRunner(std::sync::Mutex::new(Vec::new()), Instant::now()));
        dispatcher
            .dispatch(
                vec!["a".into(), "b".into(), "c".into()],
                "",
                runner.clone(),
            )
            .await
            .unwrap();

        let stamps = runner.0.lock().unwrap();
        assert_eq!(stamps[0], Duration::from_millis(0));
        assert_eq!(stamps[1], Duration::from_millis(1000));
        assert_eq!(stamps[2], Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_empty_dispatch() {
        let dispatcher = SwarmDispatcher::new(EventBus::new());
        let report = dispatcher
            .dispatch(Vec::new(), "", Arc::new(EchoRunner))
            .await
            .unwrap();
        assert_eq!(report, "");
    }
}
