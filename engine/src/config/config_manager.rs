use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use anyhow::Context;
use debounce::EventDebouncer;
use log::{error, info, warn};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

/// Holds the current value of a config file and writes it back, debounced,
/// whenever it is updated.
pub struct ConfigManager<T> {
    path: PathBuf,
    current: Arc<RwLock<T>>,
    debouncer: EventDebouncer<UpdateConfigEvent>,
}

const CONFIG_DEBOUNCE_DURATION_MS: u64 = 200;

pub trait Config:
    Sized + Default + Clone + Send + Sync + Serialize + for<'a> Deserialize<'a> + 'static
{
    fn get_path() -> &'static str;

    fn is_valid(&self) -> bool {
        true
    }

    fn create_manager() -> anyhow::Result<ConfigManager<Self>> {
        Self::create_manager_at(PathBuf::from(Self::get_path()))
    }

    fn create_manager_at(path: PathBuf) -> anyhow::Result<ConfigManager<Self>> {
        let mut manager = ConfigManager::new(path);
        if manager.path().exists() {
            manager.load_if_exists().with_context(|| {
                format!("Failed to load config from {}", manager.path().display())
            })?;
        } else {
            // Leave a file with the defaults behind for the user to edit
            info!("Writing default config to {}", manager.path().display());
            manager.update_and_save(|_| {});
        }
        Ok(manager)
    }
}

#[derive(Clone, Copy, PartialEq)]
struct UpdateConfigEvent;

fn write_config<T: Config>(path: &Path, config: &T) -> anyhow::Result<()> {
    let serialized = ron::ser::to_string_pretty(config, PrettyConfig::default())
        .context("Failed to serialize config")?;
    let mut writer = File::create(path)?;
    writer.write_all(serialized.as_bytes())?;
    Ok(())
}

impl<T> ConfigManager<T>
where
    T: Config,
{
    pub fn new(path: PathBuf) -> Self {
        let current = Arc::new(RwLock::new(T::default()));
        let current_clone = current.clone();
        let path_clone = path.clone();

        let on_update = move |_event: UpdateConfigEvent| {
            let config = current_clone
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();

            if !config.is_valid() {
                warn!("Attempted to write invalid config to {:?}", &path_clone);
                return;
            }

            if let Err(e) = write_config(&path_clone, &config) {
                error!("Failed to write config to {:?}: {:?}", &path_clone, e);
            }
        };

        Self {
            path,
            current,
            debouncer: EventDebouncer::new(
                Duration::from_millis(CONFIG_DEBOUNCE_DURATION_MS),
                on_update,
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> T {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Loads the file if it exists. An invalid config is reported and the defaults are kept.
    pub fn load_if_exists(&mut self) -> anyhow::Result<()> {
        if self.path.exists() {
            let config_data = std::fs::read_to_string(&self.path)?;

            if config_data.is_empty() {
                return Ok(());
            }

            let config: T = ron::from_str(&config_data)
                .with_context(|| format!("Failed to parse config from {:?}", &self.path))?;

            if !config.is_valid() {
                warn!(
                    "Config in {:?} is invalid, falling back to defaults",
                    &self.path
                );
                return Ok(());
            }

            self.current
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clone_from(&config);
        }
        Ok(())
    }

    pub fn update_and_save<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut T),
    {
        {
            let mut config = self.current.write().unwrap_or_else(PoisonError::into_inner);
            update_fn(&mut *config);
        }
        self.debouncer.put(UpdateConfigEvent);
    }
}
