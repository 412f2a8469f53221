//! Loading pipeline: finds data files, detects their format, deserializes
//! them and builds validated core types.

use crate::schema::{DishData, ServiceConfigData, TableData, into_layout, into_menu};
use kitchen_core::config::{ConfigError, ServiceConfig, TableLayout};
use kitchen_core::menu::{Menu, MenuError};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two dishes share a name.
    #[error("duplicate dish '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A number does not fit the simulation's fixed-point range.
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("invalid menu: {0}")]
    Menu(#[from] MenuError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = &found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML has no top-level arrays, so for TOML
/// the list is read from the array at `toml_key`; RON and JSON files hold
/// the list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Loaders
// ===========================================================================

/// Load a menu file. Dish names must be unique.
pub fn load_menu(path: &Path) -> Result<Menu, DataLoadError> {
    let dishes: Vec<DishData> = deserialize_list(path, "dishes")?;
    let mut names = HashSet::new();
    for dish in &dishes {
        if !names.insert(dish.name.as_str()) {
            return Err(DataLoadError::DuplicateName {
                file: path.to_path_buf(),
                name: dish.name.clone(),
            });
        }
    }
    into_menu(dishes)
}

/// Load a service configuration file.
pub fn load_service_config(path: &Path) -> Result<ServiceConfig, DataLoadError> {
    let data: ServiceConfigData = deserialize_file(path)?;
    data.into_config()
}

/// Load a table layout file.
pub fn load_layout(path: &Path) -> Result<TableLayout, DataLoadError> {
    let tables: Vec<TableData> = deserialize_list(path, "tables")?;
    into_layout(tables)
}

/// Everything needed to start a service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceData {
    pub menu: Menu,
    pub config: ServiceConfig,
    pub layout: TableLayout,
}

/// Load `menu`, `service` and `layout` from a directory.
///
/// `menu` is required. A missing `service` or `layout` file falls back to
/// the default configuration or dining room.
pub fn load_service_data(dir: &Path) -> Result<ServiceData, DataLoadError> {
    let menu = load_menu(&require_data_file(dir, "menu")?)?;

    let config = match find_data_file(dir, "service")? {
        Some(path) => load_service_config(&path)?,
        None => {
            log::debug!("no service file in {}, using defaults", dir.display());
            ServiceConfig::default()
        }
    };

    let layout = match find_data_file(dir, "layout")? {
        Some(path) => load_layout(&path)?,
        None => {
            log::debug!("no layout file in {}, using the default room", dir.display());
            TableLayout::default()
        }
    };

    log::info!(
        "loaded {} dishes and {} tables from {}",
        menu.len(),
        layout.tables.len(),
        dir.display()
    );
    Ok(ServiceData {
        menu,
        config,
        layout,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kitchen_core::config::KitchenPolicy;
    use kitchen_core::customer::CustomerKind;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kitchen_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("menu.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("menu.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("menu.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        assert!(matches!(
            detect_format(Path::new("menu.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("menu")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_none() {
        let dir = make_test_dir("find_none");
        assert_eq!(find_data_file(&dir, "menu").unwrap(), None);
        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("layout.ron"), "[]").unwrap();
        fs::write(dir.join("layout.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "layout"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn missing_menu_is_required() {
        let dir = make_test_dir("missing_menu");
        match load_service_data(&dir) {
            Err(DataLoadError::MissingRequired { file, .. }) => assert_eq!(file, "menu"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Loaders
    // -----------------------------------------------------------------------

    #[test]
    fn menu_toml_reads_dishes_key() {
        let dir = make_test_dir("menu_toml");
        let path = dir.join("menu.toml");
        fs::write(
            &path,
            r#"
[[dishes]]
name = "Simple Burger"
price = 10
prep_time = 4.0

[[dishes]]
name = "Gourmet Pizza"
price = 25
difficulty = 4
prep_time = 10.0
"#,
        )
        .unwrap();

        let menu = load_menu(&path).unwrap();
        assert_eq!(menu.len(), 2);
        assert_eq!(menu.dishes()[0].difficulty, 1);
        assert_eq!(menu.dishes()[1].prep_time(), kitchen_core::fixed::secs(10));

        cleanup(&dir);
    }

    #[test]
    fn menu_toml_without_key_is_parse_error() {
        let dir = make_test_dir("menu_nokey");
        let path = dir.join("menu.toml");
        fs::write(&path, "title = \"lunch\"\n").unwrap();
        assert!(matches!(load_menu(&path), Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_dish_rejected() {
        let dir = make_test_dir("menu_dup");
        let path = dir.join("menu.json");
        fs::write(
            &path,
            r#"[{"name": "Soup", "price": 5, "prep_time": 3.0},
                {"name": "Soup", "price": 6, "prep_time": 4.0}]"#,
        )
        .unwrap();

        match load_menu(&path) {
            Err(DataLoadError::DuplicateName { name, .. }) => assert_eq!(name, "Soup"),
            other => panic!("expected DuplicateName, got {other:?}"),
        }

        cleanup(&dir);
    }

    #[test]
    fn service_file_fields_are_optional() {
        let dir = make_test_dir("service_partial");
        let path = dir.join("service.ron");
        fs::write(&path, "(seed: 99, kitchen: (manual: true))").unwrap();

        let config = load_service_config(&path).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.kitchen, KitchenPolicy::Manual);
        assert_eq!(config.group_sizes, ServiceConfig::default().group_sizes);
        assert_eq!(config.policies, ServiceConfig::default().policies);

        cleanup(&dir);
    }

    #[test]
    fn invalid_service_values_rejected() {
        let dir = make_test_dir("service_invalid");
        let path = dir.join("service.json");
        fs::write(&path, r#"{"spawn_interval": 0.0}"#).unwrap();

        assert!(matches!(
            load_service_config(&path),
            Err(DataLoadError::Config(ConfigError::NonPositive {
                field: "spawn_interval",
                ..
            }))
        ));

        cleanup(&dir);
    }

    #[test]
    fn negative_reward_multiplier_rejected() {
        let dir = make_test_dir("service_negative_reward");
        let path = dir.join("service.toml");
        fs::write(
            &path,
            r#"
[customers.boss]
patience_min = 25.0
patience_max = 30.0
reward_multiplier = -1.0
spawn_weight = 5
"#,
        )
        .unwrap();

        assert!(matches!(
            load_service_config(&path),
            Err(DataLoadError::Config(ConfigError::NegativeRewardMultiplier {
                kind: CustomerKind::Boss,
                ..
            }))
        ));

        cleanup(&dir);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = make_test_dir("malformed");
        let path = dir.join("layout.json");
        fs::write(&path, "[{\"x\": 1,").unwrap();
        assert!(matches!(load_layout(&path), Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn optional_files_fall_back_to_defaults() {
        let dir = make_test_dir("fallback");
        fs::write(
            dir.join("menu.ron"),
            r#"[(name: "Tea", price: 3, prep_time: 1.5)]"#,
        )
        .unwrap();

        let data = load_service_data(&dir).unwrap();
        assert_eq!(data.menu.len(), 1);
        assert_eq!(data.config, ServiceConfig::default());
        assert_eq!(data.layout, TableLayout::default());

        cleanup(&dir);
    }
}
