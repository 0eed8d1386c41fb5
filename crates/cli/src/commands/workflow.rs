//! `ragweave workflow`: validate and dry-run workflow graphs.

use futures::StreamExt;
use ragweave_agent::Agent;
use ragweave_config::AppConfig;
use ragweave_telemetry::TelemetryEngine;
use ragweave_tools::NoopToolExecutor;
use ragweave_workflow::{GraphIssue, NodeServices, WorkflowAgent, WorkflowGraph};
use std::path::Path;
use std::sync::Arc;

use crate::offline::EchoModel;

fn load_graph(path: &Path) -> Result<WorkflowGraph, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let graph = WorkflowGraph::from_json(&json)
        .map_err(|e| format!("Failed to parse {}: {e}", path.display()))?;
    Ok(graph)
}

pub async fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let graph = load_graph(path)?;
    println!(
        "🔍 Workflow '{}' ({} nodes, {} edges)",
        graph.workflow.name,
        graph.nodes.len(),
        graph.edges.len()
    );

    let issues = graph.validate();
    if issues.is_empty() {
        println!("   ✅ No problems found");
        return Ok(());
    }

    for issue in &issues {
        let marker = match issue {
            GraphIssue::Branching { .. } | GraphIssue::MultipleStarts { .. } => "⚠️ ",
            _ => "❌",
        };
        println!("   {marker} {issue}");
    }

    if !graph.is_runnable() {
        return Err("workflow is not runnable".into());
    }
    Ok(())
}

pub async fn run(
    path: &Path,
    query: &str,
    max_steps: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(max_steps) = max_steps {
        config.workflow.max_execution_steps = max_steps;
        config.validate().map_err(|e| format!("Invalid --max-steps: {e}"))?;
    }
    let graph = load_graph(path)?;

    let telemetry = config
        .telemetry
        .enabled
        .then(|| Arc::new(TelemetryEngine::new(config.telemetry.max_traces)));
    let services = NodeServices::new(Arc::new(EchoModel), Arc::new(NoopToolExecutor))
        .with_settings(config.agent.clone())
        .with_telemetry(telemetry.clone());

    let agent = WorkflowAgent::embedded(graph, services).with_settings(&config.workflow);

    let mut events = agent.generate(query, None);
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
    }

    if let Some(engine) = telemetry {
        let summary = engine.summary();
        tracing::info!(
            nodes = summary.node_executions,
            llm_calls = summary.llm_calls,
            failures = summary.failures,
            "Dry run finished"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_graph(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn validate_accepts_runnable_graph() {
        let file = write_graph(
            r#"{"workflow": {"id": "w", "name": "W"},
                "nodes": [{"id": "s", "type": "start"}, {"id": "e", "type": "end"}],
                "edges": [{"id": "1", "source": "s", "target": "e"}]}"#,
        );
        assert!(validate(file.path()).await.is_ok());
    }

    #[tokio::test]
    async fn validate_rejects_graph_without_start() {
        let file = write_graph(
            r#"{"workflow": {"id": "w", "name": "W"}, "nodes": [{"id": "e", "type": "end"}]}"#,
        );
        assert!(validate(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let err = validate(Path::new("/nonexistent/workflow.json")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn step_override_above_ceiling_is_rejected() {
        let err = run(Path::new("/nonexistent/workflow.json"), "q", Some(500))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be at most 50"));
    }
}
