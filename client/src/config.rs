use engine::config::config_manager::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Chunks loaded around the origin, per side
    pub world_radius: i32,
    pub frames: u32,
    pub edits_per_frame: u32,
    pub seed: u32,
    pub frame_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            world_radius: 4,
            frames: 600,
            edits_per_frame: 8,
            seed: 123_456,
            frame_ms: 16,
        }
    }
}

impl Config for ClientConfig {
    fn get_path() -> &'static str {
        "client.ron"
    }

    fn is_valid(&self) -> bool {
        self.world_radius >= 0 && self.frames > 0
    }
}
