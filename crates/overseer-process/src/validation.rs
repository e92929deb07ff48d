//! Pre-spawn validation.

use overseer_common::ProcessResult;

/// Validate that an executable path is usable before attempting to spawn.
pub fn validate_executable(path: &str) -> ProcessResult<()> {
    if path.is_empty() {
        return Err(overseer_common::ProcessError::configuration(
            "validation",
            "Executable path cannot be empty",
        ));
    }

    Ok(())
}
