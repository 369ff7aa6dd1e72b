// ABOUTME: Renders pipeline events and diagnostics through Output.
// ABOUTME: Events are consumed on a separate task while the executor runs.

use kagglelab::diagnostics::Diagnostics;
use kagglelab::output::Output;
use kagglelab::pipeline::PipelineEvent;
use kagglelab::pipeline::events::{self, EventSender};
use tokio::task::JoinHandle;

/// Start a task printing every event sent on the returned sender. The task
/// ends once all senders are dropped.
pub fn spawn_reporter(output: Output) -> (EventSender, JoinHandle<()>) {
    let (tx, mut rx) = events::channel();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            render(&output, &event);
        }
    });
    (tx, handle)
}

fn render(output: &Output, event: &PipelineEvent) {
    match event {
        PipelineEvent::PullingImage(image) => {
            output.event("pull", &format!("→ Pulling {}...", image));
        }
        PipelineEvent::StepStarted { step, command } => {
            output.event(
                "step",
                &format!("→ [{}/{}] {}", step.number, step.total, command),
            );
        }
        PipelineEvent::Output { line, .. } => {
            output.event("output", &format!("    {}", line.trim_end()));
        }
        PipelineEvent::StepFinished { .. } => {}
        PipelineEvent::FailureMasked {
            step,
            exit_code,
            fallback,
        } => {
            output.warning(&format!(
                "step {} exited with {}: {}",
                step.number, exit_code, fallback
            ));
        }
        PipelineEvent::LayerCommitted { step, image } => {
            tracing::debug!(step = step.number, layer = %image.short(), "layer committed");
        }
    }
}

/// Print warnings collected during the command. Masked failures were
/// already shown as they happened.
pub fn report_diagnostics(output: &Output, diagnostics: &Diagnostics) {
    use kagglelab::diagnostics::WarningKind;

    for warning in diagnostics.warnings() {
        if warning.kind != WarningKind::MaskedFailure {
            output.warning(&warning.message);
        }
    }

    let masked = diagnostics
        .warnings()
        .iter()
        .filter(|w| w.kind == WarningKind::MaskedFailure)
        .count();
    if masked > 0 {
        output.warning(&format!(
            "{} step failure(s) were tolerated; results may be incomplete",
            masked
        ));
    }
}
