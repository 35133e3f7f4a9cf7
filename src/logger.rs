//! Session log: one file per run, truncated on `init()`.
//!
//! The file lives at `$SKETCHWALL_LOG` when set, otherwise under the OS data
//! directory:
//!   Windows:  `%APPDATA%\SketchWall\sketchwall.log`
//!   Linux:    `~/.local/share/SketchWall/sketchwall.log`
//!   macOS:    `~/Library/Application Support/SketchWall/sketchwall.log`
//!
//! Log through `log_info!` / `log_warn!` / `log_err!`. Until `init()` has run
//! (library hosts, unit tests) they are no-ops.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Environment variable overriding the log file location.
pub const LOG_PATH_ENV: &str = "SKETCHWALL_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Padded so messages line up.
        f.write_str(match self {
            Level::Info => "INFO ",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
        })
    }
}

struct SessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl SessionLog {
    fn append(&self, line: &str) {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(file, "{}", line);
    }
}

static SESSION: OnceLock<SessionLog> = OnceLock::new();

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// Path of the open session log, if any.
pub fn log_path() -> Option<&'static PathBuf> {
    SESSION.get().map(|s| &s.path)
}

/// Append one entry. Formatting is skipped entirely while no log is open,
/// and write failures are swallowed.
pub fn write(level: Level, args: fmt::Arguments<'_>) {
    if let Some(session) = SESSION.get() {
        session.append(&format_entry(&clock(), level, args));
    }
}

fn format_entry(clock: &str, level: Level, args: fmt::Arguments<'_>) -> String {
    format!("{} {} {}", clock, level, args)
}

/// Open (truncating) the session log and install a panic hook that records
/// the panic before the default handler runs. Later calls are ignored.
pub fn init() {
    if SESSION.get().is_some() {
        return;
    }
    let path = std::env::var_os(LOG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(default_log_path);

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            // The run continues without a log file.
            eprintln!("warning: cannot open log file {}: {}", path.display(), e);
            return;
        }
    };

    let session = SESSION.get_or_init(|| SessionLog { path, file: Mutex::new(file) });
    session.append(&format!(
        "# sketchwall {} session, unix time {}",
        env!("CARGO_PKG_VERSION"),
        unix_seconds()
    ));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(session) = SESSION.get() {
            session.append(&format!("{} PANIC {}", clock(), info));
        }
        prev(info);
    }));
}

fn default_log_path() -> PathBuf {
    let base = if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else if cfg!(target_os = "macos") {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join("Library").join("Application Support"))
    } else {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share")))
    };
    base.unwrap_or_else(|| PathBuf::from("."))
        .join("SketchWall")
        .join("sketchwall.log")
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `HH:MM:SS` (UTC).
fn clock() -> String {
    let secs = unix_seconds();
    format!("{:02}:{:02}:{:02}", (secs % 86_400) / 3_600, (secs % 3_600) / 60, secs % 60)
}
