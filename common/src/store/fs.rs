use async_trait::async_trait;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

use super::{validate_key, ObjectEntry, ObjectStore};
use crate::error::StoreError;

/// Prefijo de los temporales de escritura; el listado los ignora.
const UPLOAD_TMP_PREFIX: &str = ".upload-";

/// Bucket respaldado por un directorio local. Las claves son rutas
/// relativas con `/`; los subdirectorios se listan como contenedores.
/// `rename` usa `rename(2)`, atómico dentro del mismo filesystem.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Parte de directorio de un prefijo: `incoming/ab` -> `incoming/`.
fn dir_part(prefix: &str) -> &str {
    prefix.rfind('/').map_or("", |i| &prefix[..=i])
}

/// Recorre solo el directorio del prefijo; `processed/` y `approved/`
/// crecen sin límite y no se tocan al listar pendientes.
fn list_blocking(root: &Path, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
    let root_key = root.to_string_lossy().to_string();
    if !root.is_dir() {
        return Err(StoreError::NotFound(root_key));
    }

    let dir = dir_part(prefix);
    let start = if dir.is_empty() {
        root.to_path_buf()
    } else {
        validate_key(dir)?;
        root.join(dir)
    };
    if !start.is_dir() {
        // carpeta aún no creada: no hay nada pendiente
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let walker = WalkDir::new(&start)
        .min_depth(if dir.is_empty() { 1 } else { 0 })
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let err = e
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("ciclo de enlaces en el bucket"));
            StoreError::io(&root_key, err)
        })?;

        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(UPLOAD_TMP_PREFIX)
        {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let mut key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let is_container = entry.file_type().is_dir();
        if is_container {
            key.push('/');
        }

        if key.starts_with(prefix) {
            out.push(ObjectEntry { key, is_container });
        }
    }

    Ok(out)
}

fn put_blocking(root: &Path, path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or(root);
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(UPLOAD_TMP_PREFIX)
        .tempfile_in(parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let root = self.root.clone();
        let prefix = prefix.to_string();

        tokio::task::spawn_blocking(move || list_blocking(&root, &prefix))
            .await
            .map_err(|e| StoreError::io(self.root.to_string_lossy(), io::Error::other(e)))?
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::io(key, e)
            }
        })
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let root = self.root.clone();
        let content = content.to_vec();

        tokio::task::spawn_blocking(move || put_blocking(&root, &path, &content))
            .await
            .map_err(|e| StoreError::io(key, io::Error::other(e)))?
            .map_err(|e| StoreError::io(key, e))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let src = self.path_for(from)?;
        let dst = self.path_for(to)?;

        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(to, e))?;
        }

        tokio::fs::rename(&src, &dst).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(from.to_string())
            } else {
                StoreError::io(from, e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> (tempfile::TempDir, FsObjectStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(tmp.path());
        (tmp, store)
    }

    #[tokio::test]
    async fn put_fetch_y_exists() {
        let (_tmp, store) = bucket();
        store.put("incoming/abc", b"%PDF-1.4").await.unwrap();

        assert!(store.exists("incoming/abc").await.unwrap());
        assert!(!store.exists("incoming/otra").await.unwrap());
        assert_eq!(store.fetch("incoming/abc").await.unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn list_marca_carpetas_como_contenedores_y_filtra_prefijo() {
        let (_tmp, store) = bucket();
        store.put("incoming/a1", b"x").await.unwrap();
        store.put("incoming/sub/b2", b"y").await.unwrap();
        store.put("processed/c3", b"z").await.unwrap();

        let mut listed = store.list("incoming/").await.unwrap();
        listed.sort_by(|a, b| a.key.cmp(&b.key));

        assert_eq!(
            listed,
            vec![
                ObjectEntry::container("incoming/"),
                ObjectEntry::object("incoming/a1"),
                ObjectEntry::container("incoming/sub/"),
                ObjectEntry::object("incoming/sub/b2"),
            ]
        );
    }

    #[tokio::test]
    async fn list_sin_carpeta_de_pendientes_devuelve_vacio() {
        let (_tmp, store) = bucket();
        store.put("processed/c3", b"z").await.unwrap();

        assert!(store.list("incoming/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_con_prefijo_parcial_filtra_por_nombre() {
        let (_tmp, store) = bucket();
        store.put("incoming/ab1", b"x").await.unwrap();
        store.put("incoming/cd2", b"y").await.unwrap();

        let listed = store.list("incoming/a").await.unwrap();
        assert_eq!(listed, vec![ObjectEntry::object("incoming/ab1")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn list_no_recorre_carpetas_fuera_del_prefijo() {
        use std::os::unix::fs::PermissionsExt;

        let (tmp, store) = bucket();
        store.put("incoming/a1", b"x").await.unwrap();
        for i in 0..50 {
            store.put(&format!("processed/p{i}"), b"z").await.unwrap();
        }
        let locked = tmp.path().join("processed/bloqueada");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let listed = store.list("incoming/").await;

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        let listed = listed.unwrap();
        assert_eq!(
            listed,
            vec![
                ObjectEntry::container("incoming/"),
                ObjectEntry::object("incoming/a1"),
            ]
        );
    }

    #[tokio::test]
    async fn list_de_bucket_inexistente_falla() {
        let store = FsObjectStore::new("/no/existe/este/bucket");
        let err = store.list("incoming/").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rename_mueve_y_luego_falla_con_not_found() {
        let (_tmp, store) = bucket();
        store.put("incoming/abc", b"x").await.unwrap();

        store.rename("incoming/abc", "processed/abc").await.unwrap();
        assert!(!store.exists("incoming/abc").await.unwrap());
        assert!(store.exists("processed/abc").await.unwrap());

        let err = store
            .rename("incoming/abc", "processed/abc")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn claves_invalidas_no_salen_del_bucket() {
        let (_tmp, store) = bucket();
        let err = store.put("../fuera", b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
