use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::SheetError;
use crate::sheet::models::StoredSheet;
use crate::sheet::position_map::PositionMap;

/// Directory-backed store for rendered sheets and their position maps.
///
/// Each persisted pair shares one fresh id: `<id>.png` and `<id>.json`.
/// Files are created once and never rewritten.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), SheetError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub async fn persist(&self, png: &[u8], map: &PositionMap) -> Result<StoredSheet, SheetError> {
        let map_json = map.to_json()?;
        self.ensure_root().await?;
        self.persist_as(Uuid::new_v4(), png, &map_json).await
    }

    /// Writes the pair for `id`. Only files created by this call are removed on failure.
    async fn persist_as(
        &self,
        id: Uuid,
        png: &[u8],
        map_json: &[u8],
    ) -> Result<StoredSheet, SheetError> {
        let image_path = self.image_path(id);
        let position_map_path = self.position_map_path(id);

        write_new(&image_path, png).await?;
        if let Err(e) = write_new(&position_map_path, map_json).await {
            warn!(sheet_id = %id, error = %e, "Position map write failed, removing image");
            let _ = fs::remove_file(&image_path).await;
            return Err(e.into());
        }

        info!(sheet_id = %id, path = %image_path.display(), "Sheet persisted");
        Ok(StoredSheet {
            id,
            image_path,
            position_map_path,
        })
    }

    pub async fn load_position_map(&self, id: Uuid) -> Result<PositionMap, SheetError> {
        let bytes = match fs::read(self.position_map_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SheetError::NotFound(format!("Position map {id} not found")));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(PositionMap::from_json(&bytes)?)
    }

    /// Removes both artifacts of `id`. Fails with `NotFound` only when neither existed.
    pub async fn delete(&self, id: Uuid) -> Result<(), SheetError> {
        let mut removed = false;
        for path in [self.image_path(id), self.position_map_path(id)] {
            match fs::remove_file(&path).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if !removed {
            return Err(SheetError::NotFound(format!("Sheet {id} not found")));
        }
        info!(sheet_id = %id, "Sheet deleted");
        Ok(())
    }

    fn image_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.png"))
    }

    fn position_map_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

/// Creates `path` exclusively. A file this call created is removed if the write fails.
async fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        drop(file);
        let _ = fs::remove_file(path).await;
    }
    written
}
