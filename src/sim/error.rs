//! Error types for simulation configuration, GPU execution, and frame sinks.
//!
//! This module declares focused, composable error types used across the
//! simulation lifecycle. Each error carries enough context to make failures
//! actionable while remaining small and cheap to pass around or convert into
//! the top-level [`SimError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure domain
//!   (configuration validation, device/pipeline construction, sink I/O).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`SimError`].
//! * **Actionability:** Structured fields (offending parameter names,
//!   requested vs. available limits, stage names) make logs useful without
//!   reproducing the issue.
//!
//! ## Typical flow
//! Construction-time operations return domain errors (`ConfigError`,
//! `GpuError`, `SinkError`) which orchestration code bubbles into
//! [`SimError`] with `?`. Per-tick failures (readback misses, sink write
//! errors, queue overflow) are deliberately *not* errors at the API surface;
//! they are absorbed and logged, because a running simulation must tolerate
//! them.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

/// Returned when a [`SimulationConfig`](crate::sim::config::SimulationConfig)
/// or the stage list handed to the orchestrator is invalid.
///
/// Configuration errors are always fatal: they are raised before any GPU
/// resource is allocated, so a failed initialization leaves nothing behind.
///
/// ### Example
/// ```ignore
/// if config.width == 0 {
///     return Err(ConfigError::ZeroDimension { axis: "lattice width" }.into());
/// }
/// ```

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {

    /// A lattice axis that must be non-zero was zero.
    ///
    /// Depth is exempt: a zero depth selects a two-dimensional run.
    ZeroDimension {
        /// Name of the offending axis, for example `"lattice width"`.
        axis: &'static str,
    },

    /// A parameter that must be strictly positive was not.
    NonPositive {
        /// Name of the offending parameter.
        parameter: &'static str,

        /// The rejected value.
        value: f32,
    },

    /// The field list was empty; at least one fermion field is required.
    NoFields,

    /// More fields were configured than the mask and property buffer admit.
    TooManyFields {
        /// Number of fields in the configuration.
        requested: usize,

        /// Maximum supported field count.
        maximum: usize,
    },

    /// A stage shader failed to parse as WGSL.
    ShaderParse {
        /// Stage name as declared in the stage list.
        stage: String,

        /// Parser diagnostic.
        detail: String,
    },

    /// A stage shader is missing a required entry point.
    ///
    /// Compute programs must expose at least `pass0`; render programs must
    /// expose both `vs_main` and `fs_main`.
    MissingEntryPoint {
        /// Stage name as declared in the stage list.
        stage: String,

        /// The entry point that was not found.
        entry: &'static str,
    },

    /// Two active stages declared the same dedicated buffer name with
    /// different element sizes or sizing rules.
    ConflictingDeclaration {
        /// The contested buffer name.
        name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroDimension { axis } => {
                write!(f, "{axis} must be non-zero")
            }
            ConfigError::NonPositive { parameter, value } => {
                write!(f, "{parameter} must be positive (got {value})")
            }
            ConfigError::NoFields => f.write_str("at least one fermion field is required"),
            ConfigError::TooManyFields { requested, maximum } => {
                write!(f, "too many fields ({requested} configured; maximum {maximum})")
            }
            ConfigError::ShaderParse { stage, detail } => {
                write!(f, "stage '{stage}' failed to parse: {detail}")
            }
            ConfigError::MissingEntryPoint { stage, entry } => {
                write!(f, "stage '{stage}' is missing entry point '{entry}'")
            }
            ConfigError::ConflictingDeclaration { name } => {
                write!(f, "conflicting declarations for dedicated buffer '{name}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Returned when GPU device acquisition or command execution fails.
///
/// Acquisition failures (`AdapterUnavailable`, `DeviceRequest`,
/// `LimitExceeded`) are fatal at initialize time. `Released` is returned by
/// every operation invoked after [`release`](crate::Orchestrator::release).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {

    /// No compatible GPU adapter was found.
    AdapterUnavailable,

    /// The adapter refused the device request.
    DeviceRequest {
        /// Driver diagnostic.
        detail: String,
    },

    /// The adapter cannot satisfy a limit the simulation requires.
    LimitExceeded {
        /// Name of the wgpu limit.
        limit: &'static str,

        /// Value the simulation needs.
        required: u64,

        /// Value the adapter offers.
        available: u64,
    },

    /// Waiting on submitted GPU work failed.
    Poll {
        /// Driver diagnostic.
        detail: String,
    },

    /// The orchestrator was used after its resources were released.
    Released,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::AdapterUnavailable => f.write_str("no compatible GPU adapter found"),
            GpuError::DeviceRequest { detail } => {
                write!(f, "device request failed: {detail}")
            }
            GpuError::LimitExceeded { limit, required, available } => {
                write!(
                    f,
                    "adapter limit too low: {limit} requires {required}, adapter offers {available}"
                )
            }
            GpuError::Poll { detail } => write!(f, "device poll failed: {detail}"),
            GpuError::Released => f.write_str("simulation resources were already released"),
        }
    }
}

impl std::error::Error for GpuError {}

/// Returned when a frame sink cannot be constructed or torn down.
///
/// Sink construction is fatal: a recording run with no encoder is useless,
/// so a missing binary aborts initialization. Per-frame write failures after
/// construction are absorbed by the sink worker and logged instead.

#[derive(Debug)]
pub enum SinkError {

    /// No encoder executable was found at any candidate location.
    EncoderNotFound,

    /// The encoder process could not be started.
    SpawnFailed {
        /// Operating system diagnostic.
        detail: String,
    },

    /// The encoder process exited before accepting any frames.
    EncoderExited {
        /// Exit code, when the platform reports one.
        code: Option<i32>,
    },

    /// Filesystem or pipe I/O around the encoder failed.
    Io(std::io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::EncoderNotFound => {
                f.write_str("no ffmpeg executable found on this system")
            }
            SinkError::SpawnFailed { detail } => {
                write!(f, "failed to start encoder process: {detail}")
            }
            SinkError::EncoderExited { code: Some(code) } => {
                write!(f, "encoder process exited early with code {code}")
            }
            SinkError::EncoderExited { code: None } => {
                f.write_str("encoder process exited early")
            }
            SinkError::Io(e) => write!(f, "encoder i/o failed: {e}"),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self { SinkError::Io(e) }
}

/// Top-level error for simulation lifecycle operations.
///
/// Aggregates the domain errors so orchestration entry points can return a
/// single expressive type. `From<T>` conversions allow `?` from every
/// construction step:
///
/// ```ignore
/// fn initialize(config: SimulationConfig) -> SimResult<Orchestrator> {
///     config.validate()?;                  // -> ConfigError -> SimError
///     let context = GpuContext::new(23)?;  // -> GpuError    -> SimError
///     let sink = FfmpegFrameSink::open(&settings)?; // -> SinkError -> SimError
///     /* … */
/// }
/// ```

#[derive(Debug)]
pub enum SimError {

    /// Configuration or stage validation failed.
    Config(ConfigError),

    /// GPU acquisition or execution failed.
    Gpu(GpuError),

    /// Frame sink construction or teardown failed.
    Sink(SinkError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "{e}"),
            SimError::Gpu(e) => write!(f, "{e}"),
            SimError::Sink(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self { SimError::Config(e) }
}
impl From<GpuError> for SimError {
    fn from(e: GpuError) -> Self { SimError::Gpu(e) }
}
impl From<SinkError> for SimError {
    fn from(e: SinkError) -> Self { SimError::Sink(e) }
}

/// Convenience alias for simulation lifecycle results.
pub type SimResult<T> = Result<T, SimError>;
