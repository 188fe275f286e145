/// DenOfIz RHI Engine - process-wide state
///
/// Holds the logger, the RHI configuration, the shared shader compiler and the
/// registry of logical devices. Storage is thread-safe static state behind
/// RwLocks, so every accessor can be called from any thread.

use std::sync::{OnceLock, RwLock, Arc};
use std::time::SystemTime;
use rustc_hash::FxHashMap;
use crate::config::RhiConfiguration;
use crate::device::LogicalDevice;
use crate::error::Result;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::shader::ShaderCompiler;

// ===== INTERNAL STATE =====

/// Device registry (requires `Engine::initialize()`)
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Entries below this severity are dropped
static MIN_SEVERITY: OnceLock<RwLock<LogSeverity>> = OnceLock::new();

/// Configuration, seeded from the environment on first read
static CONFIGURATION: OnceLock<RwLock<RhiConfiguration>> = OnceLock::new();

/// Shared shader compiler, created on first use
static SHADER_COMPILER: OnceLock<RwLock<Option<Arc<ShaderCompiler>>>> = OnceLock::new();

struct EngineState {
    devices: RwLock<FxHashMap<String, Arc<dyn LogicalDevice>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            devices: RwLock::new(FxHashMap::default()),
        }
    }
}

fn configuration_lock() -> &'static RwLock<RhiConfiguration> {
    CONFIGURATION.get_or_init(|| RwLock::new(RhiConfiguration::from_env()))
}

fn shader_compiler_lock() -> &'static RwLock<Option<Arc<ShaderCompiler>>> {
    SHADER_COMPILER.get_or_init(|| RwLock::new(None))
}

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

// ===== PUBLIC API =====

/// Process-wide RHI state
///
/// # Example
///
/// ```no_run
/// use dz_rhi::dz::{Engine, ShaderProgram, ShaderProgramDesc};
///
/// Engine::initialize()?;
///
/// // The compiler is created on first use from Engine::configuration()
/// let compiler = Engine::shader_compiler()?;
///
/// Engine::shutdown();
/// # Ok::<(), dz_rhi::dz::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Initialize the device registry
    ///
    /// Idempotent. Logging, configuration and the shader compiler work
    /// without it.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Drop every registered device and the shared shader compiler
    ///
    /// Devices still referenced elsewhere stay alive until their last
    /// `Arc` is dropped.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut devices) = state.devices.write() {
                devices.clear();
            }
        }
        if let Ok(mut compiler) = shader_compiler_lock().write() {
            *compiler = None;
        }
    }

    // ===== CONFIGURATION API =====

    /// Current configuration (a snapshot)
    pub fn configuration() -> RhiConfiguration {
        match configuration_lock().read() {
            Ok(config) => config.clone(),
            Err(_) => RhiConfiguration::default(),
        }
    }

    /// Replace the configuration
    ///
    /// The shared shader compiler is dropped so the next
    /// [`shader_compiler`](Self::shader_compiler) call picks up the new
    /// tool paths and cache settings.
    pub fn set_configuration(config: RhiConfiguration) {
        if let Ok(mut lock) = configuration_lock().write() {
            *lock = config;
        }
        if let Ok(mut compiler) = shader_compiler_lock().write() {
            *compiler = None;
        }
    }

    // ===== SHADER COMPILER API =====

    /// Shared shader compiler, created from the current configuration on first use
    ///
    /// # Errors
    ///
    /// Returns an error if the compiler lock is poisoned.
    pub fn shader_compiler() -> Result<Arc<ShaderCompiler>> {
        {
            let lock = shader_compiler_lock().read()
                .map_err(|_| crate::engine_err!("dz::Engine", "ShaderCompiler lock poisoned"))?;
            if let Some(compiler) = lock.as_ref() {
                return Ok(Arc::clone(compiler));
            }
        }

        let mut lock = shader_compiler_lock().write()
            .map_err(|_| crate::engine_err!("dz::Engine", "ShaderCompiler lock poisoned"))?;

        // Another thread may have won the race between the two locks
        if let Some(compiler) = lock.as_ref() {
            return Ok(Arc::clone(compiler));
        }

        let compiler = Arc::new(ShaderCompiler::from_configuration(&Self::configuration()));
        *lock = Some(Arc::clone(&compiler));
        crate::engine_debug!("dz::Engine", "Shared ShaderCompiler created");
        Ok(compiler)
    }

    /// Install a custom shared shader compiler
    pub fn set_shader_compiler(compiler: ShaderCompiler) -> Arc<ShaderCompiler> {
        let compiler = Arc::new(compiler);
        if let Ok(mut lock) = shader_compiler_lock().write() {
            *lock = Some(Arc::clone(&compiler));
        }
        compiler
    }

    // ===== DEVICE REGISTRY API =====

    /// Register a logical device under a name
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A device with this name already exists
    /// - The registry lock is poisoned
    ///
    /// # Example
    ///
    /// ```ignore
    /// use dz_rhi::dz::Engine;
    /// use dz_rhi_vulkan::VulkanLogicalDevice;
    ///
    /// Engine::initialize()?;
    /// let device = Engine::create_device("main", VulkanLogicalDevice::new(Default::default())?)?;
    /// # Ok::<(), dz_rhi::dz::Error>(())
    /// ```
    pub fn create_device<D: LogicalDevice + 'static>(name: &str, device: D) -> Result<Arc<dyn LogicalDevice>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| crate::engine_err!("dz::Engine", InitializationFailed =>
                "Engine not initialized. Call Engine::initialize() first."))?;

        let mut devices = state.devices.write()
            .map_err(|_| crate::engine_err!("dz::Engine", "Device registry lock poisoned"))?;

        if devices.contains_key(name) {
            crate::engine_bail!("dz::Engine", InitializationFailed =>
                "Device '{}' already exists. Call Engine::destroy_device() first.", name);
        }

        let device: Arc<dyn LogicalDevice> = Arc::new(device);
        devices.insert(name.to_string(), Arc::clone(&device));

        crate::engine_info!("dz::Engine", "Device '{}' registered", name);

        Ok(device)
    }

    /// Look up a registered device
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or no device has this name.
    pub fn device(name: &str) -> Result<Arc<dyn LogicalDevice>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| crate::engine_err!("dz::Engine", InitializationFailed =>
                "Engine not initialized. Call Engine::initialize() first."))?;

        let devices = state.devices.read()
            .map_err(|_| crate::engine_err!("dz::Engine", "Device registry lock poisoned"))?;

        devices.get(name)
            .cloned()
            .ok_or_else(|| crate::engine_err!("dz::Engine", InvalidResource =>
                "Device '{}' not found", name))
    }

    /// Remove a device from the registry
    ///
    /// Removing an unknown name is not an error.
    pub fn destroy_device(name: &str) -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| crate::engine_err!("dz::Engine", InitializationFailed =>
                "Engine not initialized"))?;

        let mut devices = state.devices.write()
            .map_err(|_| crate::engine_err!("dz::Engine", "Device registry lock poisoned"))?;

        if devices.remove(name).is_some() {
            crate::engine_info!("dz::Engine", "Device '{}' destroyed", name);
        }

        Ok(())
    }

    /// Names of all registered devices
    pub fn device_names() -> Vec<String> {
        ENGINE_STATE.get()
            .and_then(|state| state.devices.read().ok())
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered devices
    pub fn device_count() -> usize {
        ENGINE_STATE.get()
            .and_then(|state| state.devices.read().ok())
            .map(|devices| devices.len())
            .unwrap_or(0)
    }

    /// Reset all process-wide state for testing (only available in test builds)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset_for_testing() {
        Self::shutdown();
        if let Ok(mut config) = configuration_lock().write() {
            *config = RhiConfiguration::default();
        }
        if let Ok(mut severity) = MIN_SEVERITY.get_or_init(|| RwLock::new(LogSeverity::Trace)).write() {
            *severity = LogSeverity::Trace;
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dz_rhi::dz::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Drop every entry below `severity`
    pub fn set_min_severity(severity: LogSeverity) {
        if let Ok(mut lock) = MIN_SEVERITY.get_or_init(|| RwLock::new(LogSeverity::Trace)).write() {
            *lock = severity;
        }
    }

    fn accepts(severity: LogSeverity) -> bool {
        MIN_SEVERITY.get()
            .and_then(|lock| lock.read().ok().map(|min| severity >= *min))
            .unwrap_or(true)
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if !Self::accepts(severity) {
            return;
        }
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if !Self::accepts(severity) {
            return;
        }
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
