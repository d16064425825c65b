//! Option lookup and environment configuration.

use std::collections::HashMap;
use std::env;
use std::sync::RwLock;

use crate::core::style::Style;

/// Environment variable that turns `truecolor = "auto"` into "on".
pub const TRUECOLOR_ENV: &str = "TERMSCREEN_TRUECOLOR";

/// Named global options the screen reads on every initialization.
///
/// Options read: `truecolor` (string: `on`, `off`, `auto`), and the booleans
/// `paste`, `mouse`, `xterm`, `fakecursor`.
pub trait GlobalOptions: Send + Sync {
    fn string_option(&self, name: &str) -> Option<String>;
    fn bool_option(&self, name: &str) -> Option<bool>;
    /// Style every cell is drawn with unless told otherwise.
    fn default_style(&self) -> Style;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    String(String),
}

/// In-memory [`GlobalOptions`] with the defaults an editor starts with.
#[derive(Debug)]
pub struct OptionStore {
    values: RwLock<HashMap<String, OptionValue>>,
    default_style: RwLock<Style>,
}

impl Default for OptionStore {
    fn default() -> Self {
        let mut values = HashMap::new();
        values.insert(
            "truecolor".to_string(),
            OptionValue::String("auto".to_string()),
        );
        values.insert("paste".to_string(), OptionValue::Bool(false));
        values.insert("mouse".to_string(), OptionValue::Bool(true));
        values.insert("xterm".to_string(), OptionValue::Bool(false));
        values.insert("fakecursor".to_string(), OptionValue::Bool(false));
        Self {
            values: RwLock::new(values),
            default_style: RwLock::new(Style::default()),
        }
    }
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: OptionValue) {
        let mut values = match self.values.write() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.insert(name.to_string(), value);
    }

    pub fn set_bool(&self, name: &str, value: bool) {
        self.set(name, OptionValue::Bool(value));
    }

    pub fn set_string(&self, name: &str, value: impl Into<String>) {
        self.set(name, OptionValue::String(value.into()));
    }

    pub fn set_default_style(&self, style: Style) {
        let mut current = match self.default_style.write() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = style;
    }

    fn get(&self, name: &str) -> Option<OptionValue> {
        let values = match self.values.read() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.get(name).cloned()
    }
}

impl GlobalOptions for OptionStore {
    fn string_option(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(OptionValue::String(value)) => Some(value),
            _ => None,
        }
    }

    fn bool_option(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(OptionValue::Bool(value)) => Some(value),
            _ => None,
        }
    }

    fn default_style(&self) -> Style {
        match self.default_style.read() {
            Ok(style) => *style,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// The `truecolor` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrueColorPolicy {
    On,
    Off,
    Auto,
}

impl TrueColorPolicy {
    /// Unknown values behave like `auto`.
    pub fn parse(value: &str) -> Self {
        match value {
            "on" => Self::On,
            "off" => Self::Off,
            _ => Self::Auto,
        }
    }

    /// Backend setting: forced on/off, or `None` to let the backend detect.
    pub fn resolve(self, env: &EnvConfig) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Auto if env.truecolor => Some(true),
            Self::Auto => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    /// Only consulted for `truecolor = "auto"`.
    pub truecolor: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            truecolor: env_flag(TRUECOLOR_ENV),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}
