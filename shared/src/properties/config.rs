use super::policy::PropertyPolicy;

/// Settings a `PropertyHandler` starts with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Policy given to properties registered without an explicit one
    pub default_policy: PropertyPolicy,
    /// When set, `set_policy` leaves the reserved ids below `ID_USER` alone
    pub default_userspace: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            default_policy: PropertyPolicy::Local,
            default_userspace: true,
        }
    }
}

/// Settings a property is registered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyConfig {
    /// `None` takes the handler's default policy
    pub policy: Option<PropertyPolicy>,
    /// Name shown by `PropertyHandler::property_name`
    pub name: Option<String>,
    pub emits_signal: bool,
    /// Skip sends and local stores that would not change the value
    pub optimized: bool,
    pub read_only: bool,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            policy: None,
            name: None,
            emits_signal: true,
            optimized: false,
            read_only: false,
        }
    }
}

impl PropertyConfig {
    pub fn with_policy(mut self, policy: PropertyPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn optimized(mut self, optimized: bool) -> Self {
        self.optimized = optimized;
        self
    }

    pub fn emits_signal(mut self, emits_signal: bool) -> Self {
        self.emits_signal = emits_signal;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
