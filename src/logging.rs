//! Routing of the `cas` diagnostic target.
//!
//! The client logs through `tracing` under [`TARGET`]. [`layer`] turns the
//! configured [`LogTarget`] into a layer for the host's subscriber:
//!
//! ```rust,ignore
//! use tracing_subscriber::prelude::*;
//!
//! let cas_log = cas_connect::logging::layer(&config.log_target())?;
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(cas_log.layer)
//!     .init();
//! // keep `cas_log.guard` alive for the lifetime of the process
//! ```

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::registry::LookupSpan;

use crate::config::LogTarget;
use crate::error::Error;

/// Tracing target of every diagnostic line emitted by this crate.
pub const TARGET: &str = "cas";

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Layer for the `cas` target plus, for file output, the writer guard.
///
/// Dropping the guard flushes and stops the background writer.
pub struct CasLog<S> {
    pub layer: BoxedLayer<S>,
    pub guard: Option<WorkerGuard>,
}

/// Build the layer for `target`.
///
/// - [`LogTarget::Host`]: `cas` events flow to the host's other layers.
/// - [`LogTarget::File`]: `cas` events are also written to the file.
/// - [`LogTarget::Disabled`]: `cas` events are filtered out.
///
/// # Errors
///
/// Returns [`Error::Io`] if the log directory cannot be created, or
/// [`Error::Config`] if the path has no file name.
pub fn layer<S>(target: &LogTarget) -> Result<CasLog<S>, Error>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match target {
        LogTarget::Host => Ok(CasLog {
            layer: Targets::new().with_default(LevelFilter::TRACE).boxed(),
            guard: None,
        }),
        LogTarget::Disabled => Ok(CasLog {
            layer: Targets::new()
                .with_default(LevelFilter::TRACE)
                .with_target(TARGET, LevelFilter::OFF)
                .boxed(),
            guard: None,
        }),
        LogTarget::File(path) => {
            let file_name = path.file_name().ok_or_else(|| {
                Error::Config(format!("cas_log: '{}' is not a file path", path.display()))
            })?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(Targets::new().with_target(TARGET, LevelFilter::TRACE))
                .boxed();

            Ok(CasLog { layer, guard: Some(guard) })
        }
    }
}
