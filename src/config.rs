//! Port configuration
//!
//! The bus card's port pair is read from a small `key=value` file:
//!
//! ```text
//! # RC2014 YM/AY card
//! addr_port=0xD8
//! data_port=0xD0
//! ```
//!
//! Blank lines and lines starting with `#` are skipped, unknown keys are
//! ignored, and values may be decimal or `0x`-prefixed hexadecimal. A missing
//! or unreadable file is not fatal: [`PortConfig::load_or_default`] falls back
//! to the built-in port pair.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default address (register select) port.
pub const DEFAULT_ADDR_PORT: u8 = 0xD8;
/// Default data port.
pub const DEFAULT_DATA_PORT: u8 = 0xD0;
/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "ports.conf";

/// Errors reading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File missing or unreadable
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Value that is not a byte in decimal or hex
    #[error("Line {line}: invalid value '{value}' for '{key}'")]
    InvalidValue {
        /// 1-based line number
        line: usize,
        /// Key on that line
        key: String,
        /// Offending value
        value: String,
    },
}

/// Configuration rejected by validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address and data ports collide
    #[error("Address and data port are both 0x{0:02X}")]
    SamePort(u8),
}

/// I/O port pair of the PSG bus card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Register select port (also used for read-back)
    pub addr_port: u8,
    /// Data write port
    pub data_port: u8,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            addr_port: DEFAULT_ADDR_PORT,
            data_port: DEFAULT_DATA_PORT,
        }
    }
}

impl PortConfig {
    /// Explicit port pair.
    pub fn new(addr_port: u8, data_port: u8) -> Self {
        PortConfig {
            addr_port,
            data_port,
        }
    }

    /// Parse configuration text, starting from the default port pair.
    ///
    /// Lines with invalid values are skipped; the values are reported in the
    /// returned list so the caller can log them.
    pub fn parse(text: &str) -> (Self, Vec<ConfigError>) {
        let mut config = PortConfig::default();
        let mut rejected = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let slot = match key {
                "addr_port" => &mut config.addr_port,
                "data_port" => &mut config.data_port,
                _ => continue,
            };

            match parse_byte(value) {
                Some(v) => *slot = v,
                None => rejected.push(ConfigError::InvalidValue {
                    line: idx + 1,
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            }
        }

        (config, rejected)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (config, rejected) = Self::parse(&text);
        for err in &rejected {
            tracing::warn!(path = %path.display(), "{err}");
        }
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults if it cannot be read.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{err}; using default ports");
                PortConfig::default()
            }
        }
    }

    /// Load with fallback to defaults, then validate.
    ///
    /// An unreadable file is not an error; a port pair that collides is.
    pub fn resolve(path: impl AsRef<Path>) -> crate::Result<Self> {
        let config = Self::load_or_default(path);
        config.validate()?;
        Ok(config)
    }

    /// Reject degenerate port mappings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.addr_port == self.data_port {
            return Err(ValidationError::SamePort(self.addr_port));
        }
        Ok(())
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal byte.
fn parse_byte(value: &str) -> Option<u8> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u8::from_str_radix(hex, 16).ok()
    } else {
        value.parse::<u8>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_hex_and_decimal() {
        let (cfg, rejected) = PortConfig::parse("addr_port=0xA0\ndata_port=161\n");
        assert!(rejected.is_empty());
        assert_eq!(cfg, PortConfig::new(0xA0, 0xA1));
    }

    #[test]
    fn test_comments_blank_and_unknown_keys() {
        let text = "# comment\n\n  \nvolume=11\naddr_port = 0x10\r\n";
        let (cfg, rejected) = PortConfig::parse(text);
        assert!(rejected.is_empty());
        assert_eq!(cfg.addr_port, 0x10);
        assert_eq!(cfg.data_port, DEFAULT_DATA_PORT);
    }

    #[test]
    fn test_invalid_value_keeps_default() {
        let (cfg, rejected) = PortConfig::parse("addr_port=0x1FF\ndata_port=zz\n");
        assert_eq!(cfg, PortConfig::default());
        assert_eq!(rejected.len(), 2);
        assert!(matches!(
            &rejected[0],
            ConfigError::InvalidValue { line: 1, key, .. } if key == "addr_port"
        ));
    }

    #[test]
    fn test_validate_rejects_same_port() {
        assert_eq!(
            PortConfig::new(0x90, 0x90).validate(),
            Err(ValidationError::SamePort(0x90))
        );
        assert!(PortConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.conf");
        assert!(matches!(
            PortConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(PortConfig::load_or_default(&path), PortConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# ports").unwrap();
        writeln!(file, "addr_port=0x90").unwrap();
        writeln!(file, "data_port=0x91").unwrap();
        file.flush().unwrap();

        let cfg = PortConfig::load(file.path()).unwrap();
        assert_eq!(cfg, PortConfig::new(0x90, 0x91));
    }

    #[test]
    fn test_resolve_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "addr_port=0xD0").unwrap();
        file.flush().unwrap();
        assert_eq!(
            PortConfig::resolve(file.path()),
            Err(crate::SynthError::Validation(ValidationError::SamePort(0xD0)))
        );

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            PortConfig::resolve(dir.path().join("absent.conf")),
            Ok(PortConfig::default())
        );
    }
}
