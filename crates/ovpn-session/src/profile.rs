//! Profiles and credentials
//!
//! Profile parsing belongs to the external core library; this module
//! only defines the seam. The controller hands the raw config to a
//! `ProfileParser`, attaches the caller's credentials to the validated
//! profile, and passes it to the tunnel engine.

/// Parameters of the most recent manual connect request.
///
/// Kept only to replay a reconnection attempt. Overwritten, not merged,
/// on every new connect. Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub raw_config: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("raw_config", &format!("{} bytes", self.raw_config.len()))
            .finish()
    }
}

/// A validated tunnel profile, ready for the engine.
#[derive(Clone, Default)]
pub struct Profile {
    /// Display name, if the config declared one
    pub name: Option<String>,
    /// Username attached after parsing
    pub username: Option<String>,
    /// Password attached after parsing
    pub password: Option<String>,
    /// The validated raw config, verbatim
    pub raw: Vec<u8>,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("raw", &format!("{} bytes", self.raw.len()))
            .finish()
    }
}

/// Profile parser seam.
///
/// The production implementation wraps the external core library's
/// config parser; it either returns a usable profile or a parse error.
pub trait ProfileParser: Send {
    fn parse(&self, raw: &[u8]) -> Result<Profile, ParseError>;
}

/// Profile failed to parse.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials {
            username: "alice".into(),
            password: "hunter2".into(),
            raw_config: "client\nremote host 1194\n".into(),
        };
        let rendered = format!("{:?}", credentials);

        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }
}
