use crate::config::{LogConfig, LOG_COMBINED, LOG_CONSOLE, LOG_FILE};
use crate::utils::{ErrorStr, ResultV};

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, LevelFilter, SharedLogger, TerminalMode, TermLogger, WriteLogger,
};


const MODULE: &str = "LOGGER";

pub const LOGGER_ERROR: &str = "logger init error";


/// Build a closure for `map_err` that logs the underlying error and replaces it with `err`
pub fn get_reporter<E: Display>(module: &'static str, kind: &'static str, err: ErrorStr) -> impl Fn(E) -> ErrorStr {
    move |e: E| {
        error!("[{}] {} error: {}", module, kind, e);
        err
    }
}

pub fn init_logger(cfg: &LogConfig) -> ResultV {
    let level = cfg.level_filter()?;

    let loggers: Vec<Box<dyn SharedLogger>> = match cfg.kind.as_str() {
        LOG_CONSOLE  => vec![term_logger(level)],
        LOG_FILE     => vec![file_logger(level, &cfg.file_path())?],
        LOG_COMBINED => vec![
            file_logger(level, &cfg.file_path())?,
            term_logger(level.min(LevelFilter::Warn)),
        ],
        _ => {
            eprintln!(
                "Unsupported log type: {}, only `{}`, `{}` and `{}` are supported. Use `{}` by default",
                cfg.kind, LOG_CONSOLE, LOG_FILE, LOG_COMBINED, LOG_CONSOLE
            );
            vec![term_logger(level)]
        }
    };

    CombinedLogger::init(loggers).map_err(|e| {
        eprintln!("[{}] Could not install logger: {}", MODULE, e);
        LOGGER_ERROR
    })
}


fn prepare_logger_config() -> simplelog::Config {
    let mut builder = simplelog::ConfigBuilder::new();
    builder.set_time_format_custom(
        simplelog::format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
        )
    );
    // local offset is unavailable in multithreaded processes on some platforms, UTC is used then
    let _ = builder.set_time_offset_to_local();
    builder.build()
}

fn term_logger(level: LevelFilter) -> Box<dyn SharedLogger> {
    TermLogger::new(
        level,
        prepare_logger_config(),
        TerminalMode::Stderr, ColorChoice::Auto
    )
}

fn file_logger(level: LevelFilter, filename: &str) -> Result<Box<dyn SharedLogger>, ErrorStr> {
    let logger: Box<dyn SharedLogger> = WriteLogger::new(
        level,
        prepare_logger_config(),
        open_log_file(filename)?,
    );
    Ok(logger)
}

fn open_log_file(filename: &str) -> Result<File, ErrorStr> {
    let report = |e: std::io::Error| {
        eprintln!("[{}] Could not open log file {}: {}", MODULE, filename, e);
        LOGGER_ERROR
    };

    if let Some(dir) = Path::new(filename).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(report)?;
    }
    OpenOptions::new().write(true).create(true).append(true).open(filename).map_err(report)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_maps_error_to_static_string() {
        let reporter = get_reporter(MODULE, "Test", "boom");
        let res: Result<(), ErrorStr> = Err("inner failure").map_err(&reporter);
        assert_eq!(res, Err("boom"));
    }

    #[test]
    fn log_file_is_created_with_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/app.log");
        open_log_file(path.to_str().unwrap()).unwrap();
        assert!(path.exists());
    }
}
