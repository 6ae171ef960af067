use anyhow::Result;

/// Store and reconciliation calls are serialized on one thread, so a current-thread runtime is
/// all the binary needs.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
