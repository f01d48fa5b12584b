//! Operator settings persisted as TOML
//!
//! One typed record per settings area. Every field has a default so a
//! partial file (or none at all) still loads.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_NAME: &str = "ppms-invoice";
const REDACTED: &str = "********";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ApiSettings {
    pub(crate) url: String,
    pub(crate) key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct MailSettings {
    pub(crate) server: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) from_address: String,
    /// Route every message to `test_address` instead of the real recipients
    pub(crate) test_mode: bool,
    pub(crate) test_address: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            server: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
            test_mode: false,
            test_address: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct FacilitySettings {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) manager_name: String,
    pub(crate) manager_email: String,
    /// Ledger-internal account code credited on export
    pub(crate) code: String,
}

/// Optional columns shown in the rendered invoice tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct InvoiceColumns {
    pub(crate) session: bool,
    pub(crate) user: bool,
    pub(crate) system_type: bool,
    pub(crate) system: bool,
    pub(crate) date: bool,
    pub(crate) start: bool,
    pub(crate) booked: bool,
    pub(crate) used: bool,
    pub(crate) notes: bool,
    pub(crate) initial_amount: bool,
    pub(crate) fees: bool,
    pub(crate) final_amount: bool,
}

impl Default for InvoiceColumns {
    fn default() -> Self {
        InvoiceColumns {
            session: true,
            user: true,
            system_type: true,
            system: true,
            date: true,
            start: true,
            booked: true,
            used: true,
            notes: true,
            initial_amount: true,
            fees: true,
            final_amount: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GeneralSettings {
    pub(crate) invoice_folder: String,
    pub(crate) message_text: String,
    /// External invoice template; empty uses the built-in one
    pub(crate) template: String,
    pub(crate) workers: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        GeneralSettings {
            invoice_folder: String::new(),
            message_text: String::new(),
            template: String::new(),
            workers: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) api: ApiSettings,
    pub(crate) mail: MailSettings,
    pub(crate) facility: FacilitySettings,
    pub(crate) columns: InvoiceColumns,
    pub(crate) general: GeneralSettings,
}

impl Settings {
    /// Settings file to use: `explicit` if given, else the first existing
    /// candidate, else the preferred candidate for a new file.
    pub(crate) fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let candidates = Self::config_paths();
        if let Some(found) = candidates.iter().find(|p| p.exists()) {
            return Ok(found.clone());
        }
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Config("cannot determine home directory".to_string()))
    }

    /// Load from `path`. A missing file yields defaults.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let settings = toml::from_str::<Settings>(&content)
            .map_err(|e| AppError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
        log::debug!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| AppError::io(parent, e))?;
        }
        let content = self.to_toml()?;
        fs::write(path, content).map_err(|e| AppError::io(path, e))
    }

    pub(crate) fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Copy with secrets masked, for display
    pub(crate) fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api.key.is_empty() {
            copy.api.key = REDACTED.to_string();
        }
        if !copy.mail.password.is_empty() {
            copy.mail.password = REDACTED.to_string();
        }
        copy
    }

    /// Update one field by dotted key, e.g. `mail.test_mode`. The value is
    /// parsed according to the field's current type.
    pub(crate) fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let unknown = || AppError::Config(format!("unknown setting: {key}"));
        let (section, field) = key.split_once('.').ok_or_else(unknown)?;

        let mut table: toml::Table = toml::from_str(&self.to_toml()?)
            .map_err(|e| AppError::Config(e.to_string()))?;
        let slot = table
            .get_mut(section)
            .and_then(toml::Value::as_table_mut)
            .and_then(|t| t.get_mut(field))
            .ok_or_else(unknown)?;

        let invalid = |kind: &str| AppError::Config(format!("{key} expects {kind}, got \"{raw}\""));
        let value = match &*slot {
            toml::Value::Boolean(_) => toml::Value::Boolean(raw.parse().map_err(|_| invalid("true or false"))?),
            toml::Value::Integer(_) => toml::Value::Integer(raw.parse().map_err(|_| invalid("a number"))?),
            _ => toml::Value::String(raw.to_string()),
        };
        *slot = value;

        let content = toml::to_string(&table).map_err(|e| AppError::Config(e.to_string()))?;
        *self = toml::from_str(&content).map_err(|e| AppError::Config(format!("{key}: {e}")))?;
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/ppms-invoice/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join(APP_NAME).join("config.toml"));
        }

        // 2. Platform config dir (Application Support on macOS)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join(APP_NAME).join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.ppms-invoice.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(format!(".{APP_NAME}.toml")));
        }

        paths
    }
}
