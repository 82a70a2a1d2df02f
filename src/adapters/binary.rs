use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::SdkKind;

/// Size on disk of what gets deployed for `sdk`.
///
/// Node targets ship as a directory of scripts, so the whole directory of
/// the entry script is summed; every other kind reports the target file.
pub fn binary_size(target: &Path, sdk: SdkKind) -> io::Result<u64> {
    match sdk {
        SdkKind::Node => {
            let dir = match target.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let size = directory_size(dir)?;
            debug!(dir = %dir.display(), size, "Summed node package size");
            Ok(size)
        }
        _ => Ok(fs::metadata(target)?.len()),
    }
}

/// File that runs when `target` is launched as `sdk`.
///
/// Scripts are passed to their interpreter as given. A bare native name is
/// looked up on `PATH` the way process spawning does; anything with a
/// directory component is used as is.
pub fn resolve_executable(target: &Path, sdk: SdkKind) -> PathBuf {
    if sdk.interpreter().is_some() || target.components().count() > 1 {
        return target.to_path_buf();
    }

    let candidates = |dir: PathBuf| {
        let plain = dir.join(target);
        let exe = cfg!(windows).then(|| plain.with_extension("exe"));
        std::iter::once(plain).chain(exe)
    };

    env::var_os("PATH")
        .and_then(|paths| {
            env::split_paths(&paths)
                .flat_map(candidates)
                .find(|candidate| candidate.is_file())
        })
        .unwrap_or_else(|| target.to_path_buf())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Sum of every file below `dir`, skipping hidden subdirectories
pub fn directory_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if !is_hidden(&entry.file_name()) {
                total += directory_size(&entry.path())?;
            }
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_native_binary_is_file_size() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app");
        fs::write(&target, vec![0u8; 2048]).unwrap();
        fs::write(dir.path().join("other"), vec![0u8; 100]).unwrap();

        assert_eq!(binary_size(&target, SdkKind::Native).unwrap(), 2048);
        assert_eq!(binary_size(&target, SdkKind::Python).unwrap(), 2048);
    }

    #[test]
    fn test_node_sums_directory_without_hidden() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("main.js");
        fs::write(&target, vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules").join("dep.js"), vec![0u8; 50]).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("index"), vec![0u8; 1000]).unwrap();

        assert_eq!(binary_size(&target, SdkKind::Node).unwrap(), 150);
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_name_resolves_on_path() {
        let resolved = resolve_executable(Path::new("sh"), SdkKind::Native);
        assert!(resolved.is_absolute());
        assert!(binary_size(&resolved, SdkKind::Native).unwrap() > 0);
    }

    #[test]
    fn test_scripts_and_paths_are_kept() {
        assert_eq!(
            resolve_executable(Path::new("main.py"), SdkKind::Python),
            PathBuf::from("main.py")
        );
        assert_eq!(
            resolve_executable(Path::new("./bin/app"), SdkKind::Native),
            PathBuf::from("./bin/app")
        );
        assert_eq!(
            resolve_executable(Path::new("no-such-program-here"), SdkKind::Native),
            PathBuf::from("no-such-program-here")
        );
    }

    #[test]
    fn test_missing_target_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(binary_size(&dir.path().join("nope"), SdkKind::Native).is_err());
    }
}
