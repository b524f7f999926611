use crate::att::Access;
use crate::gatt::Cursors;

/// HID service configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum number of service instances.
    pub max_instances: usize,
    /// Maximum number of reports per service instance.
    pub max_reports: usize,
    /// Security required for characteristic access.
    pub security: Security,
}

impl Config {
    /// Returns the attribute table array limits, which hold `max_instances`
    /// instances with every optional characteristic and `max_reports` reports.
    /// Each instance needs up to 7 fixed characteristics, one per report, and a
    /// terminator. Reports and the Report Map have one descriptor pair each.
    /// The service array has room for the final terminator.
    #[must_use]
    pub const fn limits(&self) -> Cursors {
        let (n, r) = (self.max_instances, self.max_reports);
        Cursors::new(
            n.saturating_add(1),
            n.saturating_mul(r.saturating_add(8)),
            n.saturating_mul(r.saturating_add(1).saturating_mul(2)),
        )
    }

    /// Parses a JSON configuration. Missing fields take default values.
    #[cfg(feature = "json")]
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            max_instances: 2,
            max_reports: 8,
            security: Security::default(),
        }
    }
}

/// Link security required to access characteristic values. Descriptors are
/// always readable without security.
#[derive(
    Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Security {
    None,
    #[default]
    Encrypted,
    /// Encryption with an authenticated (MITM-protected) key.
    Authenticated,
}

impl Security {
    /// Adds the security requirements to an access permission.
    #[inline]
    pub const fn apply(self, a: Access) -> Access {
        match self {
            Self::None => a,
            Self::Encrypted => a.encrypt(),
            Self::Authenticated => a.encrypt().authn(),
        }
    }
}
