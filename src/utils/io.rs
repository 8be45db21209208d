//! File I/O primitives with consistent error handling.

use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::error::{Error, Result};

fn io_error(err: impl ToString, operation: &str, step: Option<&str>) -> Error {
    let context = match step {
        Some(step) => format!("{} ({})", operation, step),
        None => operation.to_string(),
    };
    Error::internal_io(err.to_string(), Some(context))
}

pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| io_error(e, operation, None))
}

/// Write through a uniquely named sibling temp file and rename it into
/// place. Missing parent directories are created.
pub fn write_file_atomic(path: &Path, content: &str, operation: &str) -> Result<()> {
    let (Some(parent), Some(filename)) = (path.parent(), path.file_name()) else {
        return Err(io_error(format!("Invalid path: {}", path.display()), operation, None));
    };

    fs::create_dir_all(parent).map_err(|e| io_error(e, operation, Some("create dir")))?;

    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        filename.to_string_lossy(),
        Uuid::new_v4().simple()
    ));
    fs::write(&tmp_path, content).map_err(|e| io_error(e, operation, Some("write temp")))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error(e, operation, Some("rename"))
    })
}

/// Set unix permission bits; a no-op elsewhere.
pub fn set_mode(path: &Path, mode: u32, operation: &str) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| io_error(e, operation, None))?;
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode, operation);
    }

    Ok(())
}
