use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{
    AppSchema, StoreError, TargetConfig, format::Format, path::expand_home, store::ConfigStore,
};

/// Directory under `$HOME` holding cfgtoggle's own files.
pub const DEFAULT_CONFIG_DIR: &str = ".config/configtoggle";

const APPS_DIR: &str = "apps";
const SCHEMA_EXTS: [&str; 2] = ["yaml", "yml"];

/// File-backed store.
///
/// Layout:
///
/// ```text
/// <root>/
///   apps/
///     ghostty.yaml
///     zed.yml
/// ```
///
/// Target files live wherever each schema's `path` points.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    home: Option<PathBuf>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            home: dirs::home_dir(),
        }
    }

    /// Store rooted at `~/.config/configtoggle`, creating `apps/` if missing.
    pub fn from_default_dir() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
        let store = Self::new(home.join(DEFAULT_CONFIG_DIR));
        let apps = store.apps_dir();
        fs::create_dir_all(&apps).map_err(|e| StoreError::Write {
            path: apps,
            source: e,
        })?;
        Ok(store)
    }

    /// Override the directory `~` expands to.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join(APPS_DIR)
    }

    /// Resolved location of the schema's target file.
    pub fn target_path(&self, schema: &AppSchema) -> PathBuf {
        PathBuf::from(expand_home(&schema.target_path, self.home.as_deref()))
    }

    fn schema_file(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(StoreError::InvalidAppName(name.to_string()));
        }
        let dir = self.apps_dir();
        SCHEMA_EXTS
            .iter()
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| StoreError::AppNotFound(name.to_string()))
    }
}

impl ConfigStore for FileStore {
    fn load_app_config(&self, name: &str) -> Result<AppSchema, StoreError> {
        let path = self.schema_file(name)?;
        debug!("Loading app schema from {}", path.display());

        let content = fs::read_to_string(&path).map_err(|e| StoreError::Read {
            path: path.clone(),
            source: e,
        })?;
        let mut schema: AppSchema =
            serde_yaml::from_str(&content).map_err(|e| StoreError::Parse {
                path: path.clone(),
                source: e.into(),
            })?;
        schema.name = name.to_string();
        for (key, preset) in schema.presets.iter_mut() {
            if preset.name.is_empty() {
                preset.name = key.clone();
            }
        }
        Ok(schema)
    }

    fn list_apps(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.apps_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| StoreError::Read {
            path: dir.clone(),
            source: e,
        })?;

        let mut apps = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Read {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
            if !SCHEMA_EXTS.contains(&ext) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                apps.push(stem.to_string());
            }
        }
        apps.sort();
        apps.dedup();
        Ok(apps)
    }

    fn load_target_config(&self, schema: &AppSchema) -> Result<TargetConfig, StoreError> {
        let path = self.target_path(schema);
        let format = Format::detect(&schema.format, &path)?;
        debug!("Loading {} target from {}", format, path.display());

        let content = fs::read_to_string(&path).map_err(|e| StoreError::Read {
            path: path.clone(),
            source: e,
        })?;
        let map = format.parse(&content, &path)?;
        Ok(TargetConfig::from_map(map))
    }

    fn save_target_config(
        &self,
        schema: &AppSchema,
        target: &TargetConfig,
    ) -> Result<(), StoreError> {
        let path = self.target_path(schema);
        let format = Format::detect(&schema.format, &path)?;
        let previous = if format == Format::Custom && path.exists() {
            Some(fs::read_to_string(&path).map_err(|e| StoreError::Read {
                path: path.clone(),
                source: e,
            })?)
        } else {
            None
        };
        let content = format.render_over(target.as_map(), previous.as_deref(), &path)?;

        let write_err = |e: std::io::Error| StoreError::Write {
            path: path.clone(),
            source: e,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(write_err)?;

        let permissions = if path.exists() {
            let backup = backup_path(&path);
            fs::copy(&path, &backup).map_err(write_err)?;
            debug!("Backed up {} to {}", path.display(), backup.display());
            Some(fs::metadata(&path).map_err(write_err)?.permissions())
        } else {
            None
        };

        let mut tmp = NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        if let Some(perm) = permissions {
            tmp.as_file().set_permissions(perm).map_err(write_err)?;
        }
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        info!("Saved {} ({})", path.display(), format);
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
path: ~/app/config.json
fields:
  theme:
    type: choice
    values: [dark, light]
presets:
  day:
    values:
      theme: light
"#;

    fn setup() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cfg")).with_home(dir.path());
        fs::create_dir_all(store.apps_dir()).unwrap();
        fs::write(store.apps_dir().join("demo.yaml"), SCHEMA).unwrap();
        fs::write(store.apps_dir().join("other.yml"), "path: /tmp/x.toml").unwrap();
        fs::write(store.apps_dir().join("README.md"), "ignored").unwrap();
        (dir, store)
    }

    #[test]
    fn test_list_and_load_schema() {
        let (_dir, store) = setup();
        assert_eq!(store.list_apps().unwrap(), vec!["demo", "other"]);

        let schema = store.load_app_config("demo").unwrap();
        assert_eq!(schema.name, "demo");
        assert_eq!(schema.presets["day"].name, "day");
        assert!(matches!(
            store.load_app_config("missing"),
            Err(StoreError::AppNotFound(_))
        ));
        assert!(matches!(
            store.load_app_config("../demo"),
            Err(StoreError::InvalidAppName(_))
        ));
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nope"));
        assert!(store.list_apps().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_backup() {
        let (dir, store) = setup();
        let schema = store.load_app_config("demo").unwrap();
        let target_file = dir.path().join("app/config.json");
        assert_eq!(store.target_path(&schema), target_file);
        assert!(store.load_target_config(&schema).is_err());

        let mut target = TargetConfig::new();
        target.set("theme", json!("dark")).unwrap();
        store.save_target_config(&schema, &target).unwrap();
        assert!(!backup_path(&target_file).exists());

        target.set("theme", json!("light")).unwrap();
        store.save_target_config(&schema, &target).unwrap();

        let loaded = store.load_target_config(&schema).unwrap();
        assert_eq!(loaded.get_string("theme"), "light");
        let backup = fs::read_to_string(backup_path(&target_file)).unwrap();
        assert!(backup.contains("dark"));
    }

    #[test]
    fn test_save_custom_keeps_comments() {
        let (dir, store) = setup();
        fs::write(
            store.apps_dir().join("ghostty.yaml"),
            "path: ~/ghostty/config\nformat: custom\nfields:\n  theme:\n    type: string\n",
        )
        .unwrap();
        let target_file = dir.path().join("ghostty/config");
        fs::create_dir_all(target_file.parent().unwrap()).unwrap();
        fs::write(
            &target_file,
            "# appearance\ntheme = dark\nkeybind = ctrl+a=select_all\nkeybind = ctrl+c=copy\n",
        )
        .unwrap();

        let schema = store.load_app_config("ghostty").unwrap();
        let mut target = store.load_target_config(&schema).unwrap();
        assert_eq!(
            target.get("keybind"),
            Some(&json!(["ctrl+a=select_all", "ctrl+c=copy"]))
        );
        target.set("theme", json!("light")).unwrap();
        store.save_target_config(&schema, &target).unwrap();

        assert_eq!(
            fs::read_to_string(&target_file).unwrap(),
            "# appearance\ntheme = light\nkeybind = ctrl+a=select_all\nkeybind = ctrl+c=copy\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = setup();
        let schema = store.load_app_config("demo").unwrap();
        let target_file = dir.path().join("app/config.json");
        fs::create_dir_all(target_file.parent().unwrap()).unwrap();
        fs::write(&target_file, "{}").unwrap();
        fs::set_permissions(&target_file, fs::Permissions::from_mode(0o640)).unwrap();

        store
            .save_target_config(&schema, &TargetConfig::new())
            .unwrap();
        let mode = fs::metadata(&target_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
