use std::{
    io::{self, ErrorKind},
    path::Path,
};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::trace;

/// Reads the whole file under a shared lock. A missing file is reported as `None`.
pub async fn read_locked(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    file.lock_shared()?;
    let mut content = String::new();
    let result = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    result?;
    trace!("Read {} bytes from {path:?}", content.len());
    Ok(Some(content))
}

/// Replaces file content under an exclusive lock, creating the file if needed.
pub async fn write_locked(path: &Path, content: &[u8]) -> Result<(), io::Error> {
    let mut file = open_for_update(path).await?;
    file.lock_exclusive()?;
    let result = overwrite(&mut file, content).await;
    file.unlock_async().await?;
    result
}

/// Read-modify-write under a single exclusive lock. `update` receives the current content
/// (`None` for a new or empty file) and returns the bytes to store together with a value handed
/// back to the caller.
pub async fn update_locked<T, E>(
    path: &Path,
    update: impl FnOnce(Option<&str>) -> Result<(Vec<u8>, T), E>,
) -> Result<T, E>
where
    E: From<io::Error>,
{
    let mut file = open_for_update(path).await?;
    file.lock_exclusive()?;
    let result = read_and_replace(&mut file, update).await;
    file.unlock_async().await?;
    result
}

async fn read_and_replace<T, E>(
    file: &mut File,
    update: impl FnOnce(Option<&str>) -> Result<(Vec<u8>, T), E>,
) -> Result<T, E>
where
    E: From<io::Error>,
{
    let mut current = String::new();
    file.read_to_string(&mut current).await?;
    let existing = Some(current.as_str()).filter(|v| !v.trim().is_empty());
    let (content, value) = update(existing)?;
    overwrite(file, &content).await?;
    Ok(value)
}

async fn open_for_update(path: &Path) -> Result<File, io::Error> {
    // Truncation happens only after the lock is held, so readers never observe a half-empty file.
    File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await
}

async fn overwrite(file: &mut File, content: &[u8]) -> Result<(), io::Error> {
    file.set_len(0).await?;
    file.rewind().await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_data().await
}

#[cfg(test)]
mod tests {
    use std::io;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{read_locked, update_locked, write_locked};

    #[tokio::test]
    async fn test_read_missing_file() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(read_locked(&dir.path().join("missing")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_replaces_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("value.json");
        write_locked(&path, b"a much longer first value").await?;
        write_locked(&path, b"short").await?;
        assert_eq!(read_locked(&path).await?.as_deref(), Some("short"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_sees_previous_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("counter");

        let first = update_locked::<_, io::Error>(&path, |current| {
            assert_eq!(current, None);
            Ok((b"1".to_vec(), 1))
        })
        .await?;

        let second = update_locked::<_, io::Error>(&path, |current| {
            let next = current.unwrap_or("0").parse::<u32>().unwrap() + 1;
            Ok((next.to_string().into_bytes(), next))
        })
        .await?;

        assert_eq!((first, second), (1, 2));
        assert_eq!(read_locked(&path).await?.as_deref(), Some("2"));
        Ok(())
    }
}
