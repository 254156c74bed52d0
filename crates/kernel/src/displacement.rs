//! Mesh vertex displacement seam.
//!
//! At presentation time each mesh body hands its body-local vertices to a
//! [`VertexDisplacer`], which returns where the player sees them. A GPU
//! implementation uploads [`GpuParamBlock`]; [`CpuDisplacer`] maps each
//! vertex through `world_to_optical` directly.

use bytemuck::{Pod, Zeroable};
use glam::{DMat4, DQuat, DVec3, DVec4, Mat4, Vec4};
use relativity_body::RelativisticBody;
use relativity_common::is_finite_vec;
use relativity_frame::{ConformalMap, FrameContext, contract_length_by, local_metric, world_to_optical};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Errors from a vertex displacer.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DisplacementError {
    #[error("displacer unavailable: {0}")]
    Unavailable(String),
    #[error("vertex count mismatch: sent {expected}, got {got}")]
    VertexCountMismatch { expected: usize, got: usize },
    #[error("non-finite displaced vertex at index {index}")]
    NonFinite { index: usize },
}

/// Everything a displacer needs to place one body's vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementParams {
    pub position: DVec3,
    pub velocity: DVec3,
    pub orientation: DQuat,
    pub body_boost: DMat4,
    /// Local metric at the body's position.
    pub metric: DMat4,
    pub frame: FrameContext,
}

impl DisplacementParams {
    pub fn new(body: &RelativisticBody, frame: &FrameContext, map: &dyn ConformalMap) -> Self {
        Self {
            position: body.position(),
            velocity: body.velocity(),
            orientation: body.orientation(),
            body_boost: body.boost(),
            metric: local_metric(body.position(), frame, map),
            frame: *frame,
        }
    }

    /// Single-precision copy laid out for a uniform buffer.
    pub fn gpu_block(&self) -> GpuParamBlock {
        let c = self.frame.speed_of_light();
        let vec4 = |v: DVec3, w: f64| v.extend(w).as_vec4().to_array();
        GpuParamBlock {
            body_boost: self.body_boost.as_mat4().to_cols_array_2d(),
            player_boost: self.frame.player_boost().as_mat4().to_cols_array_2d(),
            metric: self.metric.as_mat4().to_cols_array_2d(),
            body_position: vec4(self.position, 0.0),
            body_velocity: vec4(self.velocity, c),
            orientation: DVec4::from(self.orientation).as_vec4().to_array(),
            player_position: vec4(self.frame.player_position(), 0.0),
            player_velocity: vec4(self.frame.player_velocity(), c),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuParamBlock {
    pub body_boost: [[f32; 4]; 4],
    pub player_boost: [[f32; 4]; 4],
    pub metric: [[f32; 4]; 4],
    pub body_position: [f32; 4],
    /// `w` holds the speed of light.
    pub body_velocity: [f32; 4],
    pub orientation: [f32; 4],
    pub player_position: [f32; 4],
    /// `w` holds the speed of light.
    pub player_velocity: [f32; 4],
}

impl GpuParamBlock {
    pub fn body_boost(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.body_boost)
    }

    pub fn speed_of_light(&self) -> f32 {
        Vec4::from_array(self.body_velocity).w
    }
}

/// Maps a body's local mesh vertices to observed positions.
pub trait VertexDisplacer {
    fn displace(
        &mut self,
        params: &DisplacementParams,
        map: &dyn ConformalMap,
        vertices: &[DVec3],
    ) -> Result<Vec<DVec3>, DisplacementError>;
}

/// Reference displacer running on the CPU.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuDisplacer;

fn displace_vertex(params: &DisplacementParams, map: &dyn ConformalMap, vertex: DVec3) -> DVec3 {
    let c = params.frame.speed_of_light();
    let offset = contract_length_by(params.orientation * vertex, params.velocity, c);
    world_to_optical(
        (params.position + offset).extend(0.0),
        params.velocity,
        &params.frame,
        map,
    )
}

impl VertexDisplacer for CpuDisplacer {
    fn displace(
        &mut self,
        params: &DisplacementParams,
        map: &dyn ConformalMap,
        vertices: &[DVec3],
    ) -> Result<Vec<DVec3>, DisplacementError> {
        #[cfg(feature = "parallel")]
        let displaced: Vec<DVec3> = vertices
            .par_iter()
            .map(|&v| displace_vertex(params, map, v))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let displaced: Vec<DVec3> = vertices
            .iter()
            .map(|&v| displace_vertex(params, map, v))
            .collect();

        if let Some(index) = displaced.iter().position(|&v| !is_finite_vec(v)) {
            return Err(DisplacementError::NonFinite { index });
        }
        Ok(displaced)
    }
}
