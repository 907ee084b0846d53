//! Scene - The cube entities, lights and camera built once at startup
//!
//! # Example
//!
//! ```rust
//! use cubic::{Config, SceneBuilder};
//!
//! let scene = SceneBuilder::new(&Config::default()).build();
//! assert_eq!(scene.cubes.len(), 4096);
//! ```

use crate::camera::PerspectiveCamera;
use crate::grid::{CubeDescriptor, GridCell, GridLayout, Rgb};
use crate::info;
use crate::pick::Aabb;
use crate::Config;
use cubic_protocol::{
    AmbientLight, BackgroundData, Command, CreateCubeData, CubeMaterial, DirectionalLight,
    EnvironmentCommand, LightingData, SceneCommand, UiCommand,
};
use glam::Vec3;

/// Emissive intensity of an unselected cube
pub const EMISSIVE_NORMAL: f32 = 0.5;
/// Emissive intensity of the selected cube
pub const EMISSIVE_SELECTED: f32 = 1.0;

const METALNESS: f32 = 0.3;
const ROUGHNESS: f32 = 0.7;

/// One renderable cube. Created once, never added or removed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeEntity {
    pub cell: GridCell,
    pub position: Vec3,
    pub size: f32,
    pub color: Rgb,
    pub edge_color: Rgb,
    pub emissive_intensity: f32,
}

impl CubeEntity {
    pub fn from_descriptor(descriptor: CubeDescriptor, size: f32) -> Self {
        Self {
            cell: descriptor.cell,
            position: descriptor.position,
            size,
            color: descriptor.color,
            edge_color: descriptor.edge_color,
            emissive_intensity: EMISSIVE_NORMAL,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.position, self.size)
    }

    /// Base color scaled by half, then by the emissive intensity in the shader.
    pub fn emissive(&self) -> [f32; 3] {
        let [r, g, b] = self.color.to_linear();
        [r * 0.5, g * 0.5, b * 0.5]
    }

    pub fn material(&self) -> CubeMaterial {
        CubeMaterial {
            color: self.color.to_linear(),
            emissive: self.emissive(),
            emissive_intensity: self.emissive_intensity,
            metalness: METALNESS,
            roughness: ROUGHNESS,
        }
    }

    pub fn to_command(&self, cube_id: u32) -> Command {
        Command::Scene(SceneCommand::CreateCube(CreateCubeData {
            cube_id,
            position: self.position.to_array(),
            size: self.size,
            material: self.material(),
            edge_color: self.edge_color.to_linear(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

impl Default for Lights {
    fn default() -> Self {
        // Directional light placed at (1, 1, 1), shining at the origin
        let direction = (-Vec3::ONE).normalize();
        Self {
            ambient: AmbientLight {
                color: [1.0, 1.0, 1.0],
                intensity: 0.3,
            },
            directional: DirectionalLight {
                direction: direction.to_array(),
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub grid: GridLayout,
    /// Indexed by grid index
    pub cubes: Vec<CubeEntity>,
    pub lights: Lights,
    pub camera: PerspectiveCamera,
    pub background: [f32; 4],
}

impl Scene {
    pub fn cube(&self, cell: GridCell) -> Option<&CubeEntity> {
        self.cubes.get(self.grid.index_of(cell))
    }

    /// Startup batch: background, lights, every cube, camera and info panel.
    pub fn to_commands(&self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(self.cubes.len() + 4);
        commands.push(Command::Environment(EnvironmentCommand::SetBackground(
            BackgroundData::Color(self.background),
        )));
        commands.push(Command::Environment(EnvironmentCommand::SetLighting(LightingData {
            ambient: self.lights.ambient.clone(),
            directional: Some(self.lights.directional.clone()),
        })));
        commands.extend(
            self.cubes
                .iter()
                .enumerate()
                .map(|(index, cube)| cube.to_command(index as u32)),
        );
        commands.push(self.camera.to_command());
        commands.push(Command::Ui(UiCommand::SetInfoPanel {
            text: info::idle_text(),
        }));
        commands
    }
}

/// Builds the scene from a `Config`.
pub struct SceneBuilder {
    grid: GridLayout,
    fov: f32,
    near: f32,
    far: f32,
    aspect: f32,
    background: [f32; 4],
}

impl SceneBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            grid: GridLayout::new(config.grid_size, config.extent),
            fov: config.camera_fov,
            near: config.camera_near,
            far: config.camera_far,
            aspect: 1.0,
            background: config.background,
        }
    }

    /// Viewport aspect ratio (width / height).
    pub fn aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn build(self) -> Scene {
        let size = self.grid.cube_size();
        let cubes: Vec<CubeEntity> = self
            .grid
            .descriptors()
            .map(|descriptor| CubeEntity::from_descriptor(descriptor, size))
            .collect();

        // Camera sits on the (1, 1, 1) diagonal, one extent from the origin per axis
        let extent = self.grid.extent();
        let mut camera = PerspectiveCamera::new(self.fov, self.aspect, self.near, self.far);
        camera.position = Vec3::splat(extent);
        camera.look_at(Vec3::ZERO);

        log::info!(
            "Scene built: {} cubes, spacing {:.3}, cube size {}",
            cubes.len(),
            self.grid.spacing(),
            size
        );

        Scene {
            grid: self.grid,
            cubes,
            lights: Lights::default(),
            camera,
            background: self.background,
        }
    }
}
