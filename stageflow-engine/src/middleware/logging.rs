//! A middleware that logs every transition attempt.

use super::{Middleware, MiddlewareFlow};
use crate::core::TransitionContext;
use async_trait::async_trait;
use tracing::{debug, info, Level};

/// Logs each transition attempt through `tracing` and always continues.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    name: String,
    level: Level,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self {
            name: "logging".to_string(),
            level: Level::INFO,
        }
    }
}

impl LoggingMiddleware {
    /// Creates an info-level logging middleware named `logging`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a debug-level logging middleware.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }

    /// Overrides the registration name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &mut TransitionContext) -> anyhow::Result<MiddlewareFlow> {
        if self.level == Level::DEBUG {
            debug!(
                from = ctx.from(),
                to = ctx.to(),
                event = ?ctx.event(),
                data = %ctx.data(),
                "Transition attempt"
            );
        } else {
            info!(
                from = ctx.from(),
                to = ctx.to(),
                event = ?ctx.event(),
                "Transition attempt"
            );
        }
        Ok(MiddlewareFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransitionTrigger;
    use serde_json::Value;

    #[tokio::test]
    async fn test_logging_middleware_continues() {
        let middleware = LoggingMiddleware::debug().with_name("trace");
        let mut ctx = TransitionContext::new("a", "b", TransitionTrigger::Direct, Value::Null);

        assert_eq!(middleware.name(), "trace");
        assert_eq!(middleware.handle(&mut ctx).await.unwrap(), MiddlewareFlow::Continue);
        assert!(!ctx.is_cancelled());
    }
}
