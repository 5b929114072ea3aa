use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

pub struct MetricsCollector {
    registry: Registry,

    // Form engine
    pub render_passes: IntCounterVec,
    pub validation_failures: IntCounterVec,

    // Operations
    pub operation_executions: CounterVec,
    pub operation_duration: HistogramVec,

    // Sessions and chat
    pub sessions_created: IntCounter,
    pub chat_turns: IntCounterVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let render_passes = IntCounterVec::new(
            Opts::new("masgent_render_passes_total", "Total form render passes"),
            &["operation"],
        )?;
        registry.register(Box::new(render_passes.clone()))?;

        let validation_failures = IntCounterVec::new(
            Opts::new("masgent_validation_failures_total", "Executions rejected by validation"),
            &["operation"],
        )?;
        registry.register(Box::new(validation_failures.clone()))?;

        let operation_executions = CounterVec::new(
            Opts::new("masgent_operation_executions_total", "Operation executions by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operation_executions.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("masgent_operation_duration_seconds", "Operation call duration in seconds"),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let chat_turns = IntCounterVec::new(
            Opts::new("masgent_chat_turns_total", "Chat turns by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(chat_turns.clone()))?;

        let sessions_created = IntCounter::new("masgent_sessions_created_total", "Sessions created")?;
        registry.register(Box::new(sessions_created.clone()))?;

        Ok(Self {
            registry,
            render_passes,
            validation_failures,
            operation_executions,
            operation_duration,
            chat_turns,
            sessions_created,
        })
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics collector")
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_encoding() {
        let collector = MetricsCollector::new().unwrap();
        collector.render_passes.with_label_values(&["generate_structure"]).inc();
        collector
            .operation_executions
            .with_label_values(&["generate_structure", "completed"])
            .inc();

        let text = collector.encode().unwrap();
        assert!(text.contains("masgent_render_passes_total"));
        assert!(text.contains("outcome=\"completed\""));
    }

    #[tokio::test]
    async fn test_metrics_handler() {
        let collector = Arc::new(MetricsCollector::new().unwrap());
        let handler = MetricsHandler::new(collector.clone());
        collector.chat_turns.with_label_values(&["send"]).inc();

        let metrics = handler.metrics().await;
        assert!(metrics.contains("masgent_chat_turns_total"));
    }
}
