use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use cfgtoggle::{
    Engine, EngineOptions, ErrorKind, ToggleError,
    appcfg::{ConfigStore, FileStore},
    hook::{HookError, check_hook_command},
};
use ntest::timeout;
use tempfile::TempDir;

const SCHEMA: &str = r#"
path: {target}
format: json
fields:
  theme:
    type: choice
    values: ["dark", "light", "auto"]
    default: dark
  font-size:
    type: int
    values: [12, 14, 16]
presets:
  bright:
    values:
      theme: light
      font-size: 16
  broken:
    values:
      theme: auto
      font-size: large
hooks:
  post-toggle: "{hook}"
  post-cycle: "{hook}"
  post-preset: "{hook}"
env:
  CFGTOGGLE_APP: test-app
"#;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    target: PathBuf,
    marker: PathBuf,
}

impl Fixture {
    /// `hook` may use `{marker}` for the absolute path of a marker file.
    fn new(hook: &str) -> Self {
        let dir = hook_safe_tempdir();
        let root = dir.path().join("config");
        let target = dir.path().join("app").join("config.json");
        let marker = dir.path().join("hook-ran");

        let hook = hook.replace("{marker}", &marker.display().to_string());
        let schema = SCHEMA
            .replace("{target}", &target.display().to_string())
            .replace("{hook}", &hook);

        fs::create_dir_all(root.join("apps")).unwrap();
        fs::write(root.join("apps").join("test-app.yaml"), schema).unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, r#"{"theme":"dark","font-size":14}"#).unwrap();

        Self {
            _dir: dir,
            root,
            target,
            marker,
        }
    }

    fn engine(&self, options: EngineOptions) -> Engine {
        Engine::new(Arc::new(FileStore::new(&self.root)), options)
    }

    fn target_json(&self) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(&self.target).unwrap()).unwrap()
    }

    fn snapshot(&self) -> (Vec<u8>, SystemTime) {
        (
            fs::read(&self.target).unwrap(),
            fs::metadata(&self.target).unwrap().modified().unwrap(),
        )
    }
}

/// A temporary directory whose path may appear in a hook command.
///
/// Hook arguments may not name /var/ or other system directories, nor contain
/// tool names such as `nc`, which random directory names occasionally do.
fn hook_safe_tempdir() -> TempDir {
    for _ in 0..64 {
        let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR")).unwrap();
        let command = format!("touch {}", dir.path().join("hook-ran").display());
        if check_hook_command(&command).is_ok() {
            return dir;
        }
    }
    panic!("no temporary directory usable in hook commands under CARGO_TARGET_TMPDIR");
}

fn backup_of(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.backup", path.display()))
}

#[test]
#[timeout(20000)]
fn toggle_persists_and_runs_hook() {
    let fx = Fixture::new("touch {marker}");
    let report = fx
        .engine(EngineOptions::default())
        .toggle("test-app", "theme", "light")
        .unwrap();

    assert!(report.saved);
    assert_eq!(report.target_path, fx.target.display().to_string());
    assert_eq!(fx.target_json(), serde_json::json!({"theme": "light", "font-size": 14}));
    assert!(fx.marker.exists());
    assert!(report.hook.is_some());

    let backup = fs::read_to_string(backup_of(&fx.target)).unwrap();
    assert!(backup.contains("dark"));
}

#[test]
fn invalid_value_leaves_file_unchanged() {
    let fx = Fixture::new("touch {marker}");
    let before = fx.snapshot();

    let err = fx
        .engine(EngineOptions::default())
        .toggle("test-app", "theme", "invalid")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldInvalidValue);
    assert_eq!(err.suggestions(), vec!["dark", "light", "auto"]);
    assert_eq!(fx.snapshot(), before);
    assert!(!fx.marker.exists());
}

#[test]
fn unknown_app_suggests_known_apps() {
    let fx = Fixture::new("touch {marker}");
    let err = fx
        .engine(EngineOptions::default())
        .toggle("nonexistent", "theme", "light")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AppNotFound);
    assert_eq!(err.suggestions(), vec!["test-app"]);
}

#[test]
#[timeout(20000)]
fn dry_run_touches_nothing() {
    let fx = Fixture::new("touch {marker}");
    let before = fx.snapshot();
    let engine = fx.engine(EngineOptions::default().with_dry_run(true));

    let report = engine.toggle("test-app", "theme", "light").unwrap();
    assert!(report.dry_run);
    assert!(!report.saved);
    assert_eq!(report.diff.modified["theme"].new, "light");

    let report = engine.cycle("test-app", "font-size").unwrap();
    assert_eq!(report.diff.modified["font-size"].new, 16);

    let report = engine.apply_preset("test-app", "bright").unwrap();
    assert_eq!(report.diff.summary(), "+0 added, ~2 modified, -0 removed");

    assert_eq!(fx.snapshot(), before);
    assert!(!fx.marker.exists());
    assert!(!backup_of(&fx.target).exists());
}

#[test]
#[timeout(20000)]
fn cycle_wraps_around() {
    let fx = Fixture::new("echo cycled");
    let engine = fx.engine(EngineOptions::default());
    for expected in ["light", "auto", "dark"] {
        engine.cycle("test-app", "theme").unwrap();
        assert_eq!(fx.target_json()["theme"], expected);
    }
}

#[test]
fn failed_preset_leaves_file_untouched() {
    let fx = Fixture::new("touch {marker}");
    let before = fx.snapshot();

    let err = fx
        .engine(EngineOptions::default())
        .apply_preset("test-app", "broken")
        .unwrap_err();
    assert!(matches!(err, ToggleError::FieldInvalidType { ref key, .. } if key == "font-size"));
    assert_eq!(fx.snapshot(), before);
    assert!(!fx.marker.exists());

    let err = fx
        .engine(EngineOptions::default())
        .apply_preset("test-app", "missing")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PresetNotFound);
    assert_eq!(err.suggestions(), vec!["bright", "broken"]);
}

#[test]
#[timeout(20000)]
fn hook_failure_is_reported_after_save() {
    let fx = Fixture::new("ls entry-that-does-not-exist");
    let err = fx
        .engine(EngineOptions::default())
        .toggle("test-app", "theme", "auto")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HookFailed);
    assert!(matches!(
        err,
        ToggleError::Hook {
            source: HookError::Failed { .. },
            ..
        }
    ));
    assert_eq!(fx.target_json()["theme"], "auto");
}

#[test]
fn rejected_hook_never_runs() {
    let fx = Fixture::new("rm -rf {marker}");
    fs::write(&fx.marker, "keep").unwrap();

    let err = fx
        .engine(EngineOptions::default())
        .toggle("test-app", "theme", "light")
        .unwrap_err();
    assert!(matches!(
        err,
        ToggleError::Hook {
            source: HookError::Validation(_),
            ..
        }
    ));
    assert!(fx.marker.exists());
}

#[test]
#[timeout(20000)]
fn hook_timeout_is_enforced() {
    let fx = Fixture::new("sleep 30");
    let engine = fx.engine(
        EngineOptions::default().with_hook_timeout(std::time::Duration::from_millis(300)),
    );
    let err = engine.toggle("test-app", "theme", "light").unwrap_err();
    assert!(matches!(
        err,
        ToggleError::Hook {
            source: HookError::Timeout { .. },
            ..
        }
    ));
}

#[test]
fn missing_target_is_a_parse_error() {
    let fx = Fixture::new("echo hi");
    fs::remove_file(&fx.target).unwrap();

    let err = fx
        .engine(EngineOptions::default())
        .toggle("test-app", "theme", "light")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigParse);
    assert_eq!(err.suggestions(), vec!["check the file exists and is readable"]);
}

#[test]
fn toml_target_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("alacritty.toml");
    fs::write(
        &target,
        "updated = 1979-05-27T07:32:00Z\n\n[font]\nsize = 12\n\n[window]\nopacity = 1.0\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("apps")).unwrap();
    fs::write(
        dir.path().join("apps").join("alacritty.yml"),
        format!(
            "path: {}\nfields:\n  font.size:\n    type: integer\n    values: [12, 14]\n  window.opacity:\n    type: number\n",
            target.display()
        ),
    )
    .unwrap();

    let store = FileStore::new(dir.path());
    let engine = Engine::new(Arc::new(store.clone()), EngineOptions::default());
    engine.cycle("alacritty", "font.size").unwrap();
    engine.toggle("alacritty", "window.opacity", "0.8").unwrap();

    let schema = store.load_app_config("alacritty").unwrap();
    let loaded = store.load_target_config(&schema).unwrap();
    assert_eq!(loaded.get("font.size"), Some(&serde_json::json!(14)));
    assert_eq!(loaded.get("window.opacity"), Some(&serde_json::json!(0.8)));

    let values = engine.get_current_values("alacritty").unwrap();
    assert_eq!(values["font.size"], Some(serde_json::json!(14)));

    let text = fs::read_to_string(&target).unwrap();
    assert!(text.contains("updated = 1979-05-27T07:32:00Z"), "{text}");
}

#[test]
fn ghostty_keybinds_append_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("ghostty").join("config");
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, "# Ghostty\ntheme = dark\nkeybind = ctrl+a=select_all\n").unwrap();
    fs::create_dir_all(dir.path().join("apps")).unwrap();
    fs::write(
        dir.path().join("apps").join("ghostty.yaml"),
        format!(
            "path: {}\nformat: custom\nfields:\n  theme:\n    type: choice\n    values: [dark, light]\n  keybind:\n    type: string\n",
            target.display()
        ),
    )
    .unwrap();

    let engine = Engine::new(Arc::new(FileStore::new(dir.path())), EngineOptions::default());
    engine.append("ghostty", "keybind", "ctrl+c=copy").unwrap();
    engine.toggle("ghostty", "theme", "light").unwrap();
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# Ghostty\ntheme = light\nkeybind = ctrl+a=select_all\nkeybind = ctrl+c=copy\n"
    );

    engine.remove("ghostty", "keybind", "ctrl+a").unwrap();
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "# Ghostty\ntheme = light\nkeybind = ctrl+c=copy\n"
    );

    let changed = engine.get_changed_values("ghostty").unwrap();
    assert_eq!(changed["keybind"], Some(serde_json::json!("ctrl+c=copy")));
}
