use std::path::Path;

use flexi_logger::{Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle};

use crate::param::General;

/// Start logging as configured by the `general` section.
///
/// `RUST_LOG` overrides `log_level`. With a `log_base` the log goes to
/// `<log_base>.<log_suffix>` and warnings are still echoed on stderr.
/// Keep the returned handle alive for as long as logging is needed.
pub fn init_logger(general: &General) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str(&general.log_level)?;

    if general.log_base.is_empty() {
        return logger.log_to_stderr().start();
    }

    let base = Path::new(&general.log_base);
    let directory = base.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let basename = base.file_name().and_then(|n| n.to_str()).unwrap_or("featlab");

    logger
        .log_to_file(
            FileSpec::default()
                .directory(directory)
                .basename(basename)
                .suffix(&general.log_suffix)
                .suppress_timestamp(),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .start()
}
