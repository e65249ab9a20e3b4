use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Route `log` output to the given file (appended) or, failing that, to stderr.
///
/// Stdout carries the MCP protocol and must never receive log lines.
pub fn init(log_file: Option<&Path>) {
    let env = env_logger::Env::default().default_filter_or("warn,scout=info");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {} {}: {}",
            buf.timestamp_millis(),
            record.level(),
            record.target(),
            record.args()
        )
    });

    let mut file_error = None;
    let target = match log_file {
        Some(path) => match open_log_file(path) {
            Ok(file) => env_logger::Target::Pipe(Box::new(file)),
            Err(err) => {
                file_error = Some(format!("{}: {err}", path.display()));
                env_logger::Target::Stderr
            }
        },
        None => env_logger::Target::Stderr,
    };
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.target(target).try_init();

    if let Some(err) = file_error {
        log::warn!("Could not open log file {err}; logging to stderr");
    }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
