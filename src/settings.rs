use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::{DEFAULT_TABLE, StoreConfig, StoreError};
use crate::theme::ThemePreset;

const DEFAULT_THEME: &str = "default";
const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
const MIN_POLL_INTERVAL_MS: u64 = 1_000;
const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
const DEFAULT_REFRESH_DEBOUNCE_MS: u64 = 100;
const MAX_REFRESH_DEBOUNCE_MS: u64 = 5_000;
const DEFAULT_LONG_PRESS_MS: u64 = 500;
const MIN_LONG_PRESS_MS: u64 = 150;
const MAX_LONG_PRESS_MS: u64 = 3_000;
const DEFAULT_MOVE_THRESHOLD: u16 = 1;
const MAX_MOVE_THRESHOLD: u16 = 10;
const DEFAULT_MENU_MARGIN: u16 = 1;
const MAX_MENU_MARGIN: u16 = 5;

const URL_ENV: [&str; 2] = ["HOMEWORK_TRACKER_SUPABASE_URL", "SUPABASE_URL"];
const KEY_ENV: [&str; 2] = ["HOMEWORK_TRACKER_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"];
const THEME_ENV: &str = "HOMEWORK_TRACKER_THEME";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    pub table: String,
    /// Periodic refresh; 0 disables it.
    pub poll_interval_ms: u64,
    pub refresh_debounce_ms: u64,
    pub long_press_ms: u64,
    pub move_threshold: u16,
    pub menu_margin: u16,
    pub haptic_feedback: bool,
    pub confirm_delete: bool,
    pub realtime: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            supabase_url: None,
            anon_key: None,
            table: DEFAULT_TABLE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            refresh_debounce_ms: DEFAULT_REFRESH_DEBOUNCE_MS,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
            menu_margin: DEFAULT_MENU_MARGIN,
            haptic_feedback: true,
            confirm_delete: true,
            realtime: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("homework-tracker");
        path.push("settings.toml");
        Some(path)
    }

    /// File settings with process environment overrides applied.
    pub fn load() -> Self {
        let mut settings = Self::config_path()
            .map(|path| Self::load_from_path(&path))
            .unwrap_or_default();
        settings.apply_env_overrides(|name| std::env::var(name).ok());
        settings
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) => {
                warn!("failed to read settings '{}': {error}", path.display());
                return Self::default();
            }
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut settings) => {
                settings.validate();
                settings
            }
            Err(error) => {
                warn!("failed to parse settings '{}': {error}", path.display());
                Self::default()
            }
        }
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first_set = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        };
        if let Some(url) = first_set(&URL_ENV) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = first_set(&KEY_ENV) {
            self.anon_key = Some(key);
        }
        if let Some(theme) = first_set(&[THEME_ENV]) {
            self.theme = theme;
            self.validate();
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().ok_or_else(|| anyhow!("unable to determine config path"))?;
        self.save_to_path(&path)
    }

    /// Writes to a sibling temp file, then renames it over `path`.
    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("invalid settings path '{}'", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;

        let mut validated = self.clone();
        validated.validate();
        let contents =
            toml::to_string_pretty(&validated).context("failed to serialize settings")?;

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid settings file name"))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents)
            .with_context(|| format!("failed to write '{}'", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to move '{}' into place at '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    pub fn validate(&mut self) {
        if self.poll_interval_ms != 0 {
            self.poll_interval_ms = self
                .poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
        }
        self.refresh_debounce_ms = self.refresh_debounce_ms.min(MAX_REFRESH_DEBOUNCE_MS);
        self.long_press_ms = self
            .long_press_ms
            .clamp(MIN_LONG_PRESS_MS, MAX_LONG_PRESS_MS);
        self.move_threshold = self.move_threshold.clamp(1, MAX_MOVE_THRESHOLD);
        self.menu_margin = self.menu_margin.min(MAX_MENU_MARGIN);

        if self.table.trim().is_empty() {
            self.table = DEFAULT_TABLE.to_string();
        }

        self.theme = match ThemePreset::from_str(&self.theme) {
            Ok(preset) => preset.as_str().to_string(),
            Err(()) => {
                warn!("invalid theme '{}'; falling back to default", self.theme);
                DEFAULT_THEME.to_string()
            }
        };
    }

    pub fn theme_preset(&self) -> ThemePreset {
        ThemePreset::from_str(&self.theme).unwrap_or_default()
    }

    pub fn store_config(&self) -> Result<StoreConfig, StoreError> {
        StoreConfig::new(
            self.supabase_url.as_deref(),
            self.anon_key.as_deref(),
            &self.table,
        )
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn settings_file_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir
            .path()
            .join("homework-tracker")
            .join("settings.toml")
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.theme, "default");
        assert_eq!(settings.table, "tasks");
        assert_eq!(settings.poll_interval_ms, 30_000);
        assert_eq!(settings.refresh_debounce_ms, 100);
        assert_eq!(settings.long_press_ms, 500);
        assert!(settings.confirm_delete);
        assert!(settings.store_config().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let settings = Settings::load_from_path(&settings_file_path(&temp_dir));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("parent")).expect("create config dir");
        fs::write(&path, "theme = \"mono\"\nlong_press_ms = [oops").expect("write settings");

        assert_eq!(Settings::load_from_path(&path), Settings::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("parent")).expect("create config dir");
        fs::write(
            &path,
            "supabase_url = \"https://abc.supabase.co\"\nanon_key = \"anon\"\nconfirm_delete = false\n",
        )
        .expect("write settings");

        let settings = Settings::load_from_path(&path);
        assert!(!settings.confirm_delete);
        assert_eq!(settings.long_press_ms, DEFAULT_LONG_PRESS_MS);
        let config = settings.store_config().expect("store config");
        assert_eq!(config.rest_endpoint(), "https://abc.supabase.co/rest/v1/tasks");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = settings_file_path(&temp_dir);
        let expected = Settings {
            theme: "high-contrast".to_string(),
            poll_interval_ms: 0,
            menu_margin: 2,
            haptic_feedback: false,
            ..Settings::default()
        };

        expected.save_to_path(&path).expect("save settings");
        assert!(!path.with_file_name(".settings.toml.tmp").exists());
        assert_eq!(Settings::load_from_path(&path), expected);
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut settings = Settings {
            poll_interval_ms: 5,
            refresh_debounce_ms: 60_000,
            long_press_ms: 1,
            move_threshold: 0,
            menu_margin: 40,
            table: "  ".to_string(),
            theme: "vapor".to_string(),
            ..Settings::default()
        };
        settings.validate();

        assert_eq!(settings.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(settings.refresh_debounce_ms, MAX_REFRESH_DEBOUNCE_MS);
        assert_eq!(settings.long_press_ms, MIN_LONG_PRESS_MS);
        assert_eq!(settings.move_threshold, 1);
        assert_eq!(settings.menu_margin, MAX_MENU_MARGIN);
        assert_eq!(settings.table, "tasks");
        assert_eq!(settings.theme, "default");
    }

    #[test]
    fn test_zero_poll_interval_disables_polling() {
        let mut settings = Settings {
            poll_interval_ms: 0,
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.poll_interval(), None);
    }

    #[test]
    fn test_env_overrides_prefer_namespaced_variables() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HOMEWORK_TRACKER_SUPABASE_URL", "https://primary.supabase.co"),
            ("SUPABASE_URL", "https://fallback.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("HOMEWORK_TRACKER_THEME", "paper"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env_overrides(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(
            settings.supabase_url.as_deref(),
            Some("https://primary.supabase.co")
        );
        assert_eq!(settings.anon_key.as_deref(), Some("anon"));
        assert_eq!(settings.theme, "light");
    }
}
