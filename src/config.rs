//! Configuration for which tags are attached to statements.

/// Enable switches, one per tag category.
///
/// The configuration is fixed once a driver is wrapped; changing it means
/// wrapping the driver again.
///
/// # Example
///
/// ```rust
/// use sql_commenter::CommenterConfig;
///
/// let config = CommenterConfig::default()
///     .with_route(true)
///     .with_action(true);
///
/// assert!(config.enable_db_driver);
/// assert!(config.enable_route);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommenterConfig {
    /// Emit the calling action from the request context.
    /// Default: `false`
    pub enable_action: bool,

    /// Emit the web framework name from the request context.
    /// Default: `false`
    pub enable_framework: bool,

    /// Emit the request route from the request context.
    /// Default: `false` (routes can carry identifiers)
    pub enable_route: bool,

    /// Emit the W3C `traceparent` of the active trace.
    /// Default: `true`
    pub enable_traceparent: bool,

    /// Emit the name of the driver that executed the statement.
    /// Default: `true`
    pub enable_db_driver: bool,

    /// Emit the application identity, resolved once per driver.
    /// Default: `false`
    pub enable_application: bool,

    /// Emit the controller from the request context.
    /// Default: `false`
    pub enable_controller: bool,
}

impl Default for CommenterConfig {
    fn default() -> Self {
        Self {
            enable_action: false,
            enable_framework: false,
            enable_route: false,
            enable_traceparent: true,
            enable_db_driver: true,
            enable_application: false,
            enable_controller: false,
        }
    }
}

impl CommenterConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tag enabled.
    pub fn all() -> Self {
        Self {
            enable_action: true,
            enable_framework: true,
            enable_route: true,
            enable_traceparent: true,
            enable_db_driver: true,
            enable_application: true,
            enable_controller: true,
        }
    }

    /// No tag enabled; statements pass through untouched apart from trimming.
    pub fn none() -> Self {
        Self {
            enable_action: false,
            enable_framework: false,
            enable_route: false,
            enable_traceparent: false,
            enable_db_driver: false,
            enable_application: false,
            enable_controller: false,
        }
    }

    pub fn with_action(mut self, enabled: bool) -> Self {
        self.enable_action = enabled;
        self
    }

    pub fn with_framework(mut self, enabled: bool) -> Self {
        self.enable_framework = enabled;
        self
    }

    pub fn with_route(mut self, enabled: bool) -> Self {
        self.enable_route = enabled;
        self
    }

    pub fn with_traceparent(mut self, enabled: bool) -> Self {
        self.enable_traceparent = enabled;
        self
    }

    pub fn with_db_driver(mut self, enabled: bool) -> Self {
        self.enable_db_driver = enabled;
        self
    }

    /// Enable or disable the application tag.
    ///
    /// The first statement that needs it resolves the identity; the value is
    /// then reused for the lifetime of the wrapped driver.
    pub fn with_application(mut self, enabled: bool) -> Self {
        self.enable_application = enabled;
        self
    }

    pub fn with_controller(mut self, enabled: bool) -> Self {
        self.enable_controller = enabled;
        self
    }
}

/// Static identifying values that cannot come from the request context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    /// Name the real driver is registered under. Left empty, `open` fills in
    /// the registered name.
    pub driver_name: String,

    /// Application identity. Left empty, it is resolved on first use.
    pub application: String,
}

/// Everything handed down from `open` to each proxy layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommenterOptions {
    pub config: CommenterConfig,
    pub tags: Tags,
}

impl CommenterOptions {
    /// Create options with the default configuration and no static tags.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CommenterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Override the driver name reported in the `db_driver` tag.
    pub fn with_driver_name(mut self, name: impl Into<String>) -> Self {
        self.tags.driver_name = name.into();
        self
    }

    /// Set the application identity up front, skipping resolution.
    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.tags.application = application.into();
        self
    }
}

impl From<CommenterConfig> for CommenterOptions {
    fn from(config: CommenterConfig) -> Self {
        Self::default().with_config(config)
    }
}
