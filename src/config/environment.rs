//! Who and where this process is, captured once at startup.

use std::collections::BTreeMap;

use serde::Serialize;

/// Version reported in logs and on every page.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The server's identity as shown to visitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub hostname: String,
    /// Location name, or the hostname when the deployment location is unknown.
    pub location: String,
    pub version: &'static str,
}

impl Identity {
    /// Builds an identity from a hostname and an optional location path such
    /// as `/org/initech/location/aws-us-west-2`; only its last segment is kept.
    pub fn new(hostname: impl Into<String>, location: Option<&str>) -> Self {
        let hostname = hostname.into();
        let location = location
            .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
            .map_or_else(|| hostname.clone(), str::to_owned);

        Self {
            hostname,
            location,
            version: SERVER_VERSION,
        }
    }

    /// Resolves the hostname from `HOSTNAME`, then `/etc/hostname`.
    pub fn detect(location: Option<&str>) -> Self {
        let hostname = std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_owned());

        Self::new(hostname, location)
    }

    /// `true` when no known location was configured.
    pub fn is_unplaced(&self) -> bool {
        self.location == self.hostname
    }
}

/// Sorted copy of the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Copies the current environment. Variables that are not valid Unicode
    /// are skipped.
    pub fn capture() -> Self {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<(String, String)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
