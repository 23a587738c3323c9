//! Concurrent tool dispatch
//!
//! Runs every call of one model turn concurrently, each under its own
//! timeout, and hands the results back in call order.

use crate::ports::tool_executor::{ToolContext, ToolExecutorPort};
use conductor_domain::{ToolCall, ToolError, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ToolDispatcher {
    executor: Arc<dyn ToolExecutorPort>,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ToolDispatcher {
    pub fn new(executor: Arc<dyn ToolExecutorPort>, timeout: Duration, max_parallel: usize) -> Self {
        Self {
            executor,
            timeout,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    pub fn executor(&self) -> &Arc<dyn ToolExecutorPort> {
        &self.executor
    }

    /// Execute `calls` concurrently. `results[i]` answers `calls[i]`.
    ///
    /// A call that exceeds the timeout resolves to a `Timeout` failure;
    /// the other calls are unaffected.
    pub async fn dispatch(&self, ctx: &ToolContext, calls: &[ToolCall]) -> Vec<ToolResult> {
        let handles: Vec<_> = calls
            .iter()
            .map(|call| {
                let executor = Arc::clone(&self.executor);
                let permits = Arc::clone(&self.permits);
                let ctx = ctx.clone();
                let call = call.clone();
                let timeout = self.timeout;

                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    let started = Instant::now();

                    let result =
                        match tokio::time::timeout(timeout, executor.execute(&ctx, &call)).await {
                            Ok(result) => result,
                            Err(_) => {
                                warn!(
                                    tool = %call.tool_name,
                                    timeout_secs = timeout.as_secs_f64(),
                                    "Tool call timed out"
                                );
                                ToolResult::failure(
                                    &call.id,
                                    &call.tool_name,
                                    ToolError::timeout(format!(
                                        "{} (after {}s)",
                                        call.tool_name,
                                        timeout.as_secs_f64()
                                    )),
                                )
                            }
                        };

                    let elapsed = started.elapsed().as_millis() as u64;
                    debug!(tool = %call.tool_name, ms = elapsed, success = result.is_success(), "Tool call finished");
                    attach(result, &call, elapsed)
                })
            })
            .collect();

        let _abort = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());
        let joined = futures::future::join_all(handles).await;

        calls
            .iter()
            .zip(joined)
            .map(|(call, joined)| match joined {
                Ok(result) => result,
                Err(e) => ToolResult::failure(
                    &call.id,
                    &call.tool_name,
                    ToolError::execution_failed(format!("Tool task aborted: {}", e)),
                ),
            })
            .collect()
    }
}

/// Aborts in-flight calls when the batch is abandoned.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Bind a result to the call that produced it.
fn attach(mut result: ToolResult, call: &ToolCall, elapsed_ms: u64) -> ToolResult {
    result.tool_call_id = call.id.clone();
    result.tool_name = call.tool_name.clone();
    if result.duration_ms.is_none() {
        result.duration_ms = Some(elapsed_ms);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conductor_domain::{ConversationId, ToolDescriptor, ToolErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sleeps for `delay_ms` then echoes it back.
    struct SleepyTools {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SleepyTools {
        fn new() -> Self {
            Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ToolExecutorPort for SleepyTools {
        fn descriptors(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor::new("sleep", "Sleep")]
        }

        async fn execute(&self, _ctx: &ToolContext, call: &ToolCall) -> ToolResult {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = call.get_i64("delay_ms").unwrap_or(0) as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            // Deliberately wrong id: the dispatcher must rebind it.
            ToolResult::success("wrong", &call.tool_name, delay.to_string())
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(ConversationId::new("c1"))
    }

    fn call(id: &str, delay_ms: i64) -> ToolCall {
        ToolCall::new(id, "sleep").with_arg("delay_ms", delay_ms)
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_call_order() {
        let dispatcher = ToolDispatcher::new(Arc::new(SleepyTools::new()), Duration::from_secs(5), 8);
        let calls = vec![call("a", 300), call("b", 10), call("c", 100)];

        let results = dispatcher.dispatch(&ctx(), &calls).await;

        let ids: Vec<_> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(results[0].output(), Some("300"));
        assert_eq!(results[1].output(), Some("10"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_run_concurrently() {
        let tools = Arc::new(SleepyTools::new());
        let dispatcher = ToolDispatcher::new(tools.clone(), Duration::from_secs(5), 8);
        let calls: Vec<_> = (0..4).map(|i| call(&format!("c{}", i), 1000)).collect();

        let started = tokio::time::Instant::now();
        dispatcher.dispatch(&ctx(), &calls).await;

        assert!(started.elapsed() < Duration::from_millis(1500));
        assert_eq!(tools.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallelism_is_bounded() {
        let tools = Arc::new(SleepyTools::new());
        let dispatcher = ToolDispatcher::new(tools.clone(), Duration::from_secs(5), 2);
        let calls: Vec<_> = (0..5).map(|i| call(&format!("c{}", i), 100)).collect();

        let results = dispatcher.dispatch(&ctx(), &calls).await;

        assert_eq!(results.len(), 5);
        assert_eq!(tools.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_affects_only_slow_call() {
        let dispatcher =
            ToolDispatcher::new(Arc::new(SleepyTools::new()), Duration::from_millis(500), 8);
        let calls = vec![call("fast", 10), call("slow", 10_000)];

        let results = dispatcher.dispatch(&ctx(), &calls).await;

        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(results[1].tool_call_id, "slow");
        assert_eq!(results[1].error().unwrap().kind, ToolErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dispatcher = ToolDispatcher::new(Arc::new(SleepyTools::new()), Duration::from_secs(1), 8);
        assert!(dispatcher.dispatch(&ctx(), &[]).await.is_empty());
    }
}
