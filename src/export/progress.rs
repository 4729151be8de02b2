use tracing::debug;

/// Advisory progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Percent(u8),
    Status(String),
}

impl Progress {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }
}

/// Receives progress events. Errors are logged and dropped by the caller.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &Progress) -> anyhow::Result<()>;
}

impl<F> ProgressReporter for F
where
    F: Fn(&Progress) -> anyhow::Result<()> + Send + Sync,
{
    fn report(&self, progress: &Progress) -> anyhow::Result<()> {
        self(progress)
    }
}

/// Reporter that ignores everything.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _progress: &Progress) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Forward `progress` to `reporter`, swallowing any failure.
pub fn report(reporter: &dyn ProgressReporter, progress: Progress) {
    if let Err(err) = reporter.report(&progress) {
        debug!(%err, ?progress, "progress reporter failed");
    }
}
