//! Store configuration.

/// Which mobile-number pattern a deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobilePolicy {
    /// Any ten digits: `^\d{10}$`.
    AnyTenDigits,
    /// Ten digits starting with 6-9: `^[6-9]\d{9}$`.
    IndianCellular,
}

impl MobilePolicy {
    /// Returns the regular expression enforced by this policy.
    #[must_use]
    pub const fn pattern(self) -> &'static str {
        match self {
            MobilePolicy::AnyTenDigits => r"^\d{10}$",
            MobilePolicy::IndianCellular => r"^[6-9]\d{9}$",
        }
    }
}

/// Which e-mail addresses a deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailPolicy {
    /// Any syntactically plausible address.
    Generic,
    /// Only `@gmail.com` addresses.
    GmailOnly,
}

impl EmailPolicy {
    /// Returns the regular expression enforced by this policy.
    #[must_use]
    pub const fn pattern(self) -> &'static str {
        match self {
            EmailPolicy::Generic => r"^[\w.-]+@[\w.-]+\.\w+$",
            EmailPolicy::GmailOnly => r"^[\w.-]+@gmail\.com$",
        }
    }
}

/// Deployment-specific validation choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Mobile number pattern.
    pub mobile: MobilePolicy,
    /// E-mail pattern.
    pub email: EmailPolicy,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            mobile: MobilePolicy::AnyTenDigits,
            email: EmailPolicy::Generic,
        }
    }
}

/// What deleting a referenced record does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// Refuse the delete while any reference exists.
    #[default]
    Restrict,
    /// Clear nullable references, then delete. Required references still
    /// block the delete.
    CascadeClear,
}

/// What a sweep does with expired records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepPolicy {
    /// Remove records whose recomputed status is `INACTIVE`.
    pub evict_inactive: bool,
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Pattern choices for user contact fields.
    pub validation: ValidationPolicy,

    /// Delete-time handling of references.
    pub reference_policy: ReferencePolicy,

    /// Sweep behavior.
    pub sweep: SweepPolicy,

    /// Upper bound on random identifier draws before giving up.
    pub max_allocation_attempts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            validation: ValidationPolicy::default(),
            reference_policy: ReferencePolicy::Restrict,
            sweep: SweepPolicy::default(),
            max_allocation_attempts: 1000,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the mobile number policy.
    #[must_use]
    pub const fn mobile_policy(mut self, policy: MobilePolicy) -> Self {
        self.validation.mobile = policy;
        self
    }

    /// Sets the e-mail policy.
    #[must_use]
    pub const fn email_policy(mut self, policy: EmailPolicy) -> Self {
        self.validation.email = policy;
        self
    }

    /// Sets the delete-time reference policy.
    #[must_use]
    pub const fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }

    /// Sets whether sweeps evict inactive records.
    #[must_use]
    pub const fn evict_inactive(mut self, value: bool) -> Self {
        self.sweep.evict_inactive = value;
        self
    }

    /// Sets the random identifier retry cap.
    #[must_use]
    pub const fn max_allocation_attempts(mut self, attempts: usize) -> Self {
        self.max_allocation_attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert_eq!(config.reference_policy, ReferencePolicy::Restrict);
        assert!(!config.sweep.evict_inactive);
        assert_eq!(config.max_allocation_attempts, 1000);
        assert_eq!(config.validation.mobile, MobilePolicy::AnyTenDigits);
        assert_eq!(config.validation.email, EmailPolicy::Generic);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .mobile_policy(MobilePolicy::IndianCellular)
            .email_policy(EmailPolicy::GmailOnly)
            .reference_policy(ReferencePolicy::CascadeClear)
            .evict_inactive(true)
            .max_allocation_attempts(5);

        assert_eq!(config.validation.mobile, MobilePolicy::IndianCellular);
        assert_eq!(config.validation.email, EmailPolicy::GmailOnly);
        assert_eq!(config.reference_policy, ReferencePolicy::CascadeClear);
        assert!(config.sweep.evict_inactive);
        assert_eq!(config.max_allocation_attempts, 5);
    }
}
