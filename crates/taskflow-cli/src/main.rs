use anyhow::{Context, Result};
use taskflow_core::CancellationToken;
use taskflow_core::app::{CreateTask, CreateWorkflow, EngineBuilder, EngineConfig};
use taskflow_core::domain::{Parameter, ParameterType};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    tracing::info!(
        task_duration_ms = config.task_duration.as_millis() as u64,
        "taskflow demo starting"
    );

    // status changes are already logged by the engine; print them as JSON too
    let engine = EngineBuilder::new(config).log_events(false).build()?;
    let mut events = engine.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(error = %err, "failed to encode event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Ctrl-C cancels whatever is running
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    let build = engine
        .tasks()
        .create_task(
            CreateTask::new("build", "compile the release artifacts")
                .with_parameter(Parameter::new("profile", "release", ParameterType::String)),
        )
        .await?;
    let deploy = engine
        .tasks()
        .create_task(
            CreateTask::new("deploy", "roll the artifacts out").with_parameter(Parameter::new(
                "target",
                serde_json::json!({ "env": "staging", "replicas": 2 }).to_string(),
                ParameterType::Json,
            )),
        )
        .await?;
    let smoke = engine
        .tasks()
        .create_task(CreateTask::new("smoke-test", "standalone sanity check"))
        .await?;

    let workflow = engine
        .workflows()
        .create_workflow(CreateWorkflow::new(
            "release",
            "build then deploy",
            vec![build.id.clone(), deploy.id.clone()],
        ))
        .await?;

    match engine.tasks().execute_task(&smoke.id, &cancel).await {
        Ok(task) => tracing::info!(task_id = %task.id, status = %task.status, "standalone task done"),
        Err(failure) => tracing::warn!(error = %failure, "standalone task failed"),
    }

    let outcome = engine
        .workflows()
        .execute_workflow(&workflow.id, &cancel)
        .await;
    match &outcome {
        Ok(workflow) => {
            tracing::info!(workflow_id = %workflow.id, status = %workflow.status, "workflow done")
        }
        Err(failure) => tracing::warn!(error = %failure, "workflow failed"),
    }

    for task in engine
        .workflows()
        .get_workflow_tasks(&workflow.id)
        .await
        .context("load workflow tasks")?
    {
        tracing::info!(task_id = %task.id, name = %task.name, status = %task.status, "final task status");
    }

    drop(engine);
    printer.await.context("event printer panicked")?;

    outcome.map(|_| ()).map_err(Into::into)
}
