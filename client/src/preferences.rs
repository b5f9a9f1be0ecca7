use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use tabletop_shared::color::Color;

/// Key under which the local participant's preferred color is stored.
pub const PREFERRED_COLOR_KEY: &str = "preferred_color";

/// Small persistent key/value store for local settings.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: HashMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences kept as a flat JSON object on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFilePreferences {
    /// Load from `path`. A missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        let text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, text)
    }
}

/// Stored preferred color. An unparsable value is logged and ignored.
pub fn load_preferred_color(store: &impl PreferenceStore) -> Option<Color> {
    let raw = store.get(PREFERRED_COLOR_KEY)?;
    match Color::parse_hex(&raw) {
        Ok(color) => Some(color),
        Err(e) => {
            tracing::warn!("Ignoring stored preferred color {:?}: {}", raw, e);
            None
        }
    }
}

pub fn save_preferred_color(store: &mut impl PreferenceStore, color: Color) -> io::Result<()> {
    store.set(PREFERRED_COLOR_KEY, &color.to_hex())
}
