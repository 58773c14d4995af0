use crate::models::AppData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::error;

/// A missing or unparsable file starts the service with no habits. Any other
/// read failure is returned so the caller never writes over data it could not
/// see.
pub async fn load_data(path: &Path) -> std::io::Result<AppData> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(AppData::default()),
        Err(err) => {
            error!("failed to read data file: {err}");
            return Err(err);
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(data) => Ok(data),
        Err(err) => {
            error!("failed to parse data file: {err}");
            Ok(AppData::default())
        }
    }
}

/// Writes a sibling temp file and renames it over `path`.
pub async fn persist_data(path: &Path, data: &AppData) -> std::io::Result<()> {
    let payload = serde_json::to_vec_pretty(data)?;
    let temp = temp_path(path);
    fs::write(&temp, payload).await?;
    if let Err(err) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(err);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "data".into());
    name.push(".tmp");
    path.with_file_name(name)
}
