// ABOUTME: Diagnostics accumulator for non-fatal warnings during a pipeline run.
// ABOUTME: Collects warnings that shouldn't fail a command but should be shown to users.

/// Collects non-fatal warnings while a pipeline is executed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A step failed but its failure policy let the pipeline continue.
    pub fn masked_failure(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::MaskedFailure,
            message: message.into(),
        }
    }

    /// Layers of a failed build could not be removed.
    pub fn layer_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LayerCleanup,
            message: message.into(),
        }
    }

    /// A step or stale container could not be removed.
    pub fn container_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ContainerCleanup,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    MaskedFailure,
    LayerCleanup,
    ContainerCleanup,
}
