use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Once,
};

use dirs::home_dir;
use tracing_subscriber::EnvFilter;

use crate::errors::Result;

const DEFAULT_DIR_NAME: &str = ".dairy_billing";
const HOME_ENV: &str = "DAIRY_BILLING_HOME";
const DEFAULT_LOG_DIRECTIVE: &str = "dairy_billing=info";
const TMP_SUFFIX: &str = "tmp";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    init_tracing_with(None);
}

/// Initializes tracing with a filter such as `dairy_billing=debug,hyper=warn`.
///
/// Returns `false` when tracing was already set up, in which case `directive` is ignored.
/// An invalid directive falls back to `RUST_LOG` or the default and is logged.
pub fn init_tracing_with(directive: Option<&str>) -> bool {
    let mut installed = false;
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::fmt;

        let (filter, rejected) = log_filter(directive);
        // A host application may already own the global subscriber.
        installed = fmt().with_env_filter(filter).try_init().is_ok();
        if let Some(reason) = rejected {
            tracing::warn!(%reason, "invalid log filter, using default");
        }
    });
    installed
}

/// Parses a comma-separated filter. Without one, or when it does not parse, `RUST_LOG`
/// is used and then `dairy_billing=info`; the parse error comes back alongside.
pub fn log_filter(directive: Option<&str>) -> (EnvFilter, Option<String>) {
    let mut rejected = None;
    if let Some(raw) = directive {
        match EnvFilter::try_new(raw) {
            Ok(filter) => return (filter, None),
            Err(err) => rejected = Some(format!("{raw}: {err}")),
        }
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    (filter, rejected)
}

/// Returns the application data directory, defaulting to `~/.dairy_billing`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sibling path used to stage a write before renaming over `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to a staging file and renames it into place.
pub fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
