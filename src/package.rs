//! Checks a packaged `jniLibs/<abi>` directory against the load plan and
//! renders the manifest entry that points the framework at the activity.

use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;
use zenilib_activity::{ACTIVITY_LIB_NAME, APPLICATION_LIBRARY, LIBRARIES, LoadPlan, MAIN_SYMBOL};

use crate::CliError;

/// First library in the plan whose `.so` is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingLibrary {
    pub file: String,
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PackageReport {
    /// Plan libraries found, in load order, up to the first missing one.
    pub present: Vec<String>,
    pub missing: Option<MissingLibrary>,
    /// Shared objects that neither the plan nor the activity account for.
    pub unexpected: Vec<String>,
}

fn shared_objects(dir: &Path) -> Result<BTreeSet<String>, CliError> {
    if !dir.is_dir() {
        return Err(CliError::NotADirectory(dir.to_path_buf()));
    }

    let mut files = BTreeSet::new();
    for entry in WalkDir::new(dir).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".so") {
            files.insert(name);
        }
    }
    Ok(files)
}

/// Walk the plan in load order and stop at the first library that is not
/// packaged, the same point at which loading would abort on device.
pub fn check_directory(dir: &Path, plan: &LoadPlan) -> Result<PackageReport, CliError> {
    let files = shared_objects(dir)?;
    let mut report = PackageReport::default();

    for (index, library) in plan.libraries().iter().enumerate() {
        let file = library.file_name();
        if !files.contains(&file) {
            report.missing = Some(MissingLibrary {
                file,
                position: index + 1,
                total: plan.len(),
            });
            break;
        }
        report.present.push(file);
    }

    let activity = format!("lib{}.so", ACTIVITY_LIB_NAME);
    report.unexpected = files
        .into_iter()
        .filter(|f| *f != activity && !LIBRARIES.iter().any(|lib| lib.file_name() == *f))
        .collect();

    Ok(report)
}

/// `<activity>` entry for `AndroidManifest.xml`.
///
/// The framework loads the activity library, which bootstraps and then calls
/// the application library's main entry.
pub fn render_manifest(package: &str) -> String {
    format!(
        r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="{package}">
    <application android:hasCode="false">
        <activity
            android:name="android.app.NativeActivity"
            android:configChanges="orientation|keyboardHidden|screenSize"
            android:exported="true">
            <!-- bootstraps, then calls {main} in lib{app}.so -->
            <meta-data
                android:name="android.app.lib_name"
                android:value="{lib}" />
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>
    </application>
</manifest>
"#,
        package = package,
        lib = ACTIVITY_LIB_NAME,
        main = MAIN_SYMBOL,
        app = APPLICATION_LIBRARY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("zenidroid-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_complete_default_package() {
        let dir = scratch_dir("complete", &["libapplication.so", "libzenilib_activity.so"]);
        let report = check_directory(&dir, &LoadPlan::enabled(false)).unwrap();

        assert_eq!(report.present, vec!["libapplication.so"]);
        assert_eq!(report.missing, None);
        assert!(report.unexpected.is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_reports_first_missing_in_load_order() {
        let dir = scratch_dir(
            "missing",
            &["libgnustl_shared.so", "libz.so", "libfreetype2.so", "libapplication.so", "libextra.so"],
        );
        let report = check_directory(&dir, &LoadPlan::enabled(true)).unwrap();

        assert_eq!(report.present, vec!["libgnustl_shared.so", "libz.so"]);
        assert_eq!(
            report.missing,
            Some(MissingLibrary {
                file: "libpng.so".to_string(),
                position: 3,
                total: 12,
            })
        );
        assert_eq!(report.unexpected, vec!["libextra.so"]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_not_a_directory() {
        let missing = std::env::temp_dir().join("zenidroid-does-not-exist");
        assert!(matches!(
            check_directory(&missing, &LoadPlan::enabled(false)),
            Err(CliError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_manifest_points_at_activity_library() {
        let manifest = render_manifest("com.zenilib.app");
        assert!(manifest.contains(r#"package="com.zenilib.app""#));
        assert!(manifest.contains(r#"android:value="zenilib_activity""#));
        assert!(manifest.contains("android.app.NativeActivity"));
        assert!(manifest.contains("zeni_android_main in libapplication.so"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_library_counts_as_present() {
        let target_dir = scratch_dir("symlink-target", &["libapplication.so"]);
        let dir = scratch_dir("symlink", &[]);
        std::os::unix::fs::symlink(target_dir.join("libapplication.so"), dir.join("libapplication.so")).unwrap();

        let report = check_directory(&dir, &LoadPlan::enabled(false)).unwrap();

        assert_eq!(report.present, vec!["libapplication.so"]);
        assert_eq!(report.missing, None);
        fs::remove_dir_all(dir).unwrap();
        fs::remove_dir_all(target_dir).unwrap();
    }
}
