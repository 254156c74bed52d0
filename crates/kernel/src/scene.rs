//! YAML scene descriptions.
//!
//! Every field has a default, so a scene file only lists what it changes:
//!
//! ```yaml
//! frame:
//!   speed_of_light: 20.0
//!   max_speed: 19.0
//! field: { kind: uniform, acceleration: [0.0, -1.0, 0.0] }
//! bodies:
//!   - { position: [0.0, -0.5, 0.0], half_extents: [10.0, 0.5, 10.0], is_static: true }
//!   - { position: [0.0, 2.0, 0.0], use_gravity: true }
//! ```

use crate::world::World;
use glam::DVec3;
use relativity_body::{BodyDesc, BodyError};
use relativity_common::{ConfigError, SimConfig};
use relativity_frame::{ConformalMap, FrameContext, FrameError, FrameParams, Minkowski, UniformField};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or instantiating a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
    #[error("body {index}: {source}")]
    Body {
        index: usize,
        #[source]
        source: BodyError,
    },
}

/// Background geometry of a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDesc {
    #[default]
    Flat,
    Uniform { acceleration: DVec3 },
}

impl FieldDesc {
    pub fn conformal_map(&self) -> Box<dyn ConformalMap> {
        match *self {
            Self::Flat => Box::new(Minkowski),
            Self::Uniform { acceleration } => Box::new(UniformField { acceleration }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub name: String,
    pub frame: FrameParams,
    pub config: SimConfig,
    pub field: FieldDesc,
    /// Fixed ticks to run when none are given on the command line.
    pub ticks: Option<u64>,
    pub bodies: Vec<BodyDesc>,
}

impl Scene {
    pub fn from_yaml_str(text: &str) -> Result<Self, SceneError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, SceneError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn frame_context(&self) -> Result<FrameContext, SceneError> {
        Ok(FrameContext::new(self.frame)?)
    }

    /// Validate the scene and spawn its bodies, in file order.
    pub fn build(&self) -> Result<(World, FrameContext), SceneError> {
        self.config.validate()?;
        let frame = self.frame_context()?;
        let mut world = World::new(self.config);
        for (index, desc) in self.bodies.iter().enumerate() {
            world
                .spawn(desc.clone(), &frame)
                .map_err(|source| SceneError::Body { index, source })?;
        }
        tracing::info!(scene = %self.name, bodies = world.body_count(), "scene loaded");
        Ok((world, frame))
    }
}
