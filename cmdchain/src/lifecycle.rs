//! Lifecycle notifications for pipeline participants.

/// Setup and cleanup callbacks shared by sources, sinks and commands.
///
/// `setup` runs once before the first cycle of every run and is the place to
/// reset cursors and counters, since participants are reused across runs.
/// `cleanup` runs once after the last cycle on every exit path, including
/// graceful aborts and fatal errors. A failing `cleanup` is logged and
/// discarded so that the remaining participants are still notified.
pub trait Lifecycle {
    /// Called during the setup phase of a run.
    ///
    /// # Errors
    ///
    /// A setup error is fatal: the run skips its cycles, cleans up and
    /// reports the error.
    fn setup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during the tear-down phase of a run.
    ///
    /// # Errors
    ///
    /// Errors are logged and discarded by the pipeline.
    fn cleanup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
