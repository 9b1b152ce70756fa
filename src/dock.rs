//! Dock inventory: reading pinned apps from com.apple.dock.plist, filtering
//! out native macOS apps, and looking up bundle versions.

use std::path::{Path, PathBuf};

use home::home_dir;
use plist::Value;

use crate::errors::UpdateError;
use crate::types::AppEntry;

/// Version sentinel for bundles without a readable Info.plist.
pub const UNKNOWN_VERSION: &str = "Unknown";

// Exclusion list for first-party macOS apps. Configuration data tied to one
// vendor's OS, not logic.
const NATIVE_PATH_PREFIXES: &[&str] = &["/System/", "/Applications/Utilities/", "/usr/"];
const NATIVE_APPS: &[&str] = &[
    "Finder",
    "Safari",
    "Mail",
    "Calendar",
    "Contacts",
    "Maps",
    "Photos",
    "Messages",
    "FaceTime",
    "Music",
    "TV",
    "Podcasts",
    "News",
    "Stocks",
    "Home",
    "Shortcuts",
    "System Preferences",
];

fn dock_plist_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("/Users/unknown"))
        .join("Library")
        .join("Preferences")
        .join("com.apple.dock.plist")
}

/// Read the current user's Dock preferences and return the non-native
/// pinned apps. Selection defaults to true on every rebuild.
pub fn list_entries() -> Result<Vec<AppEntry>, UpdateError> {
    read_entries_from(&dock_plist_path())
}

/// Parse `persistent-apps` out of a Dock preference file. Entries missing
/// the label or URL keys are skipped; an unreadable file is a reportable
/// error that aborts the refresh only.
pub fn read_entries_from(path: &Path) -> Result<Vec<AppEntry>, UpdateError> {
    let root = Value::from_file(path).map_err(|e| UpdateError::InventoryRead(e.to_string()))?;

    let persistent_apps = root
        .as_dictionary()
        .and_then(|d| d.get("persistent-apps"))
        .and_then(|v| v.as_array());

    let mut entries = Vec::new();
    for item in persistent_apps.into_iter().flatten() {
        let Some(tile_data) = item
            .as_dictionary()
            .and_then(|d| d.get("tile-data"))
            .and_then(|v| v.as_dictionary())
        else {
            continue;
        };
        let Some(name) = tile_data.get("file-label").and_then(|v| v.as_string()) else {
            continue;
        };
        let Some(url) = tile_data
            .get("file-data")
            .and_then(|v| v.as_dictionary())
            .and_then(|d| d.get("_CFURLString"))
            .and_then(|v| v.as_string())
        else {
            continue;
        };

        let app_path = PathBuf::from(
            url.strip_prefix("file://")
                .unwrap_or(url)
                .trim_end_matches('/'),
        );
        if is_native_app(&app_path) {
            continue;
        }

        entries.push(AppEntry {
            name: name.to_string(),
            version: app_version(&app_path),
            path: app_path,
            selected: true,
        });
    }
    Ok(entries)
}

/// True for apps under an OS-reserved prefix or on the first-party name list.
pub fn is_native_app(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    if NATIVE_PATH_PREFIXES.iter().any(|p| path_str.starts_with(p)) {
        return true;
    }
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().trim_end_matches(".app").to_string())
        .unwrap_or_default();
    NATIVE_APPS.contains(&base.as_str())
}

/// CFBundleShortVersionString from the bundle's Info.plist. Degrades to the
/// "Unknown" sentinel on any failure; never raises.
pub fn app_version(app_path: &Path) -> String {
    let info = app_path.join("Contents").join("Info.plist");
    Value::from_file(&info)
        .ok()
        .as_ref()
        .and_then(|v| v.as_dictionary())
        .and_then(|d| d.get("CFBundleShortVersionString"))
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

#[cfg(test)]
mod tests {
    use plist::Dictionary;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dock_updater_{}_{name}", std::process::id()))
    }

    fn tile(label: Option<&str>, url: Option<&str>) -> Value {
        let mut tile_data = Dictionary::new();
        if let Some(label) = label {
            tile_data.insert("file-label".into(), Value::from(label));
        }
        if let Some(url) = url {
            let mut file_data = Dictionary::new();
            file_data.insert("_CFURLString".into(), Value::from(url));
            file_data.insert("_CFURLStringType".into(), Value::from(15u64));
            tile_data.insert("file-data".into(), Value::Dictionary(file_data));
        }
        let mut item = Dictionary::new();
        item.insert("tile-data".into(), Value::Dictionary(tile_data));
        Value::Dictionary(item)
    }

    fn write_dock_plist(path: &Path, tiles: Vec<Value>) {
        let mut root = Dictionary::new();
        root.insert("persistent-apps".into(), Value::Array(tiles));
        Value::Dictionary(root).to_file_xml(path).unwrap();
    }

    #[test]
    fn native_detection_by_prefix_and_name() {
        assert!(is_native_app(Path::new(
            "/System/Applications/Calculator.app"
        )));
        assert!(is_native_app(Path::new(
            "/Applications/Utilities/Terminal.app"
        )));
        assert!(is_native_app(Path::new("/usr/libexec/Something.app")));
        assert!(is_native_app(Path::new("/Applications/Safari.app")));
        assert!(is_native_app(Path::new(
            "/Applications/System Preferences.app"
        )));

        assert!(!is_native_app(Path::new("/Applications/Google Chrome.app")));
        assert!(!is_native_app(Path::new("/Applications/VSCode.app")));
    }

    #[test]
    fn version_lookup_degrades_to_unknown() {
        assert_eq!(app_version(Path::new("/nonexistent/path")), "Unknown");
    }

    #[test]
    fn version_lookup_reads_bundle_info() {
        let bundle = temp_path("Fake.app");
        std::fs::create_dir_all(bundle.join("Contents")).unwrap();
        let mut info = Dictionary::new();
        info.insert("CFBundleShortVersionString".into(), Value::from("2.5.1"));
        Value::Dictionary(info)
            .to_file_xml(bundle.join("Contents").join("Info.plist"))
            .unwrap();

        assert_eq!(app_version(&bundle), "2.5.1");
        std::fs::remove_dir_all(&bundle).unwrap();
    }

    #[test]
    fn entries_skip_malformed_tiles_and_native_apps() {
        let path = temp_path("dock.plist");
        write_dock_plist(
            &path,
            vec![
                tile(Some("Google Chrome"), Some("file:///Applications/Google%20Chrome.app/")),
                tile(Some("Safari"), Some("file:///Applications/Safari.app/")),
                tile(None, Some("file:///Applications/Slack.app/")),
                tile(Some("No URL"), None),
            ],
        );

        let entries = read_entries_from(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Google Chrome");
        assert_eq!(
            entries[0].path,
            PathBuf::from("/Applications/Google%20Chrome.app")
        );
        assert!(entries[0].selected);
        assert_eq!(entries[0].version, "Unknown");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unreadable_file_is_an_inventory_error() {
        let err = read_entries_from(Path::new("/nonexistent/dock.plist")).unwrap_err();
        assert!(matches!(err, UpdateError::InventoryRead(_)));
    }

    #[test]
    fn missing_persistent_apps_key_yields_empty_inventory() {
        let path = temp_path("empty_dock.plist");
        Value::Dictionary(Dictionary::new())
            .to_file_xml(&path)
            .unwrap();
        assert!(read_entries_from(&path).unwrap().is_empty());
        std::fs::remove_file(&path).unwrap();
    }
}
