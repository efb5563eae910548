// Copyright 2026 the Vergence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! World content: shader program, cube geometry, and instance placement.
//!
//! The scene is a field of [`NUM_INSTANCES`] cubes, placed once at creation
//! by a deterministic linear congruential generator so every run produces
//! the same world. Placement keeps the instance list sorted by descending
//! distance from the origin, which makes the instanced draw render far
//! cubes first.
//!
//! Vertex array objects are a separate, idempotent lifecycle step
//! ([`Scene::create_vaos`]): vertex arrays are not shared between contexts,
//! so in the threaded configuration they must be built on the rendering
//! context, while everything else in the scene can be built anywhere the
//! objects are shared.

use bytemuck::{Pod, Zeroable, bytes_of, cast_slice};
use glam::Vec3;
use thiserror::Error;

use crate::gl::{
    AttribType, BufferId, BufferTarget, GlDriver, ProgramId, ShaderId, ShaderStage,
    UniformLocation, VertexArrayId,
};

/// Number of cube instances in the world.
pub const NUM_INSTANCES: usize = 1500;

/// Minimum per-axis separation between instances (and from the viewer).
const MIN_SEPARATION: f32 = 4.0;

/// Attribute slot layout, bound by name before linking. The transform
/// attribute is a matrix and occupies four consecutive slots.
mod attrib {
    pub(super) const POSITION: u32 = 0;
    pub(super) const COLOR: u32 = 1;
    pub(super) const UV: u32 = 2;
    pub(super) const TRANSFORM: u32 = 3;
}

const VERTEX_SHADER: &str = "\
#version 300 es
in vec3 vertexPosition;
in vec4 vertexColor;
in mat4 vertexTransform;
uniform mat4 ViewMatrix;
uniform mat4 ProjectionMatrix;
out vec4 fragmentColor;
void main()
{
	gl_Position = ProjectionMatrix * ( ViewMatrix * ( vertexTransform * vec4( vertexPosition, 1.0 ) ) );
	fragmentColor = vertexColor;
}
";

const FRAGMENT_SHADER: &str = "\
#version 300 es
in lowp vec4 fragmentColor;
out lowp vec4 outColor;
void main()
{
	outColor = fragmentColor;
}
";

/// Scene creation failure. GPU objects allocated before the failure are not
/// rolled back; the caller retries or tears the context down.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Vertex shader failed to compile; carries the driver's info log.
    #[error("vertex shader compilation failed: {0}")]
    VertexCompile(String),
    /// Fragment shader failed to compile; carries the driver's info log.
    #[error("fragment shader compilation failed: {0}")]
    FragmentCompile(String),
    /// Program failed to link; carries the driver's info log.
    #[error("program link failed: {0}")]
    Link(String),
}

/// Deterministic 32-bit linear congruential generator.
///
/// Floats in `[0, 1)` come from splicing the low 23 state bits into the
/// mantissa of 1.0 and subtracting 1.0, so the sequence is bit-exact across
/// platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LcgRandom {
    state: u32,
}

impl LcgRandom {
    /// A generator starting from `seed`.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Current raw state, for determinism checks.
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Next float in `[0, 1)`.
    pub fn next_float(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        f32::from_bits(0x3F80_0000 | (self.state & 0x007F_FFFF)) - 1.0
    }
}

/// Byte-packed cube vertex data: normalized signed-byte positions followed
/// by normalized unsigned-byte colors, planar.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct CubeVertices {
    positions: [[i8; 4]; 8],
    colors: [[u8; 4]; 8],
}

const CUBE_VERTICES: CubeVertices = CubeVertices {
    positions: [
        // Top face ring, then bottom.
        [-127, 127, -127, 127],
        [127, 127, -127, 127],
        [127, 127, 127, 127],
        [-127, 127, 127, 127],
        [-127, -127, -127, 127],
        [-127, -127, 127, 127],
        [127, -127, 127, 127],
        [127, -127, -127, 127],
    ],
    colors: [
        [255, 0, 255, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 0, 0, 255],
        [0, 0, 255, 255],
        [0, 255, 0, 255],
        [255, 0, 255, 255],
        [255, 0, 0, 255],
    ],
};

#[rustfmt::skip]
const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 2, 3, 0, // top
    4, 5, 6, 6, 7, 4, // bottom
    2, 6, 7, 7, 1, 2, // right
    0, 4, 5, 5, 3, 0, // left
    3, 5, 6, 6, 2, 3, // front
    0, 1, 7, 7, 4, 0, // back
];

/// One entry in a geometry's vertex attribute table.
#[derive(Clone, Copy, Debug)]
struct VertexAttribPointer {
    index: u32,
    size: i32,
    ty: AttribType,
    normalized: bool,
    stride: i32,
    offset: usize,
}

/// An indexed mesh with its attribute table and optional vertex array.
#[derive(Debug)]
struct Geometry {
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    vertex_array: Option<VertexArrayId>,
    index_count: i32,
    attribs: Vec<VertexAttribPointer>,
}

impl Geometry {
    fn create_cube<G: GlDriver>(gl: &mut G) -> Self {
        let attribs = vec![
            VertexAttribPointer {
                index: attrib::POSITION,
                size: 4,
                ty: AttribType::I8Norm,
                normalized: true,
                stride: 4,
                offset: 0,
            },
            VertexAttribPointer {
                index: attrib::COLOR,
                size: 4,
                ty: AttribType::U8Norm,
                normalized: true,
                stride: 4,
                offset: size_of::<[[i8; 4]; 8]>(),
            },
        ];

        let vertex_buffer = gl.create_buffer();
        gl.bind_buffer(BufferTarget::Array, Some(vertex_buffer));
        gl.buffer_data_static(BufferTarget::Array, bytes_of(&CUBE_VERTICES));
        gl.bind_buffer(BufferTarget::Array, None);

        let index_buffer = gl.create_buffer();
        gl.bind_buffer(BufferTarget::ElementArray, Some(index_buffer));
        gl.buffer_data_static(BufferTarget::ElementArray, cast_slice(&CUBE_INDICES));
        gl.bind_buffer(BufferTarget::ElementArray, None);

        Self {
            vertex_buffer,
            index_buffer,
            vertex_array: None,
            index_count: 36,
            attribs,
        }
    }

    fn create_vao<G: GlDriver>(&mut self, gl: &mut G) {
        let vao = gl.create_vertex_array();
        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(BufferTarget::Array, Some(self.vertex_buffer));
        for attrib in &self.attribs {
            gl.enable_vertex_attrib(attrib.index);
            gl.vertex_attrib_pointer(
                attrib.index,
                attrib.size,
                attrib.ty,
                attrib.normalized,
                attrib.stride,
                attrib.offset,
            );
        }
        gl.bind_buffer(BufferTarget::ElementArray, Some(self.index_buffer));
        gl.bind_vertex_array(None);
        self.vertex_array = Some(vao);
    }

    fn destroy_vao<G: GlDriver>(&mut self, gl: &mut G) {
        if let Some(vao) = self.vertex_array.take() {
            gl.delete_vertex_array(vao);
        }
    }

    fn destroy<G: GlDriver>(self, gl: &mut G) {
        gl.delete_buffer(self.index_buffer);
        gl.delete_buffer(self.vertex_buffer);
    }
}

/// The linked scene program with its uniform locations.
#[derive(Debug)]
struct ShaderProgram {
    program: ProgramId,
    vertex_shader: ShaderId,
    fragment_shader: ShaderId,
    view_matrix: Option<UniformLocation>,
    projection_matrix: Option<UniformLocation>,
}

impl ShaderProgram {
    fn create<G: GlDriver>(gl: &mut G) -> Result<Self, SceneError> {
        let vertex_shader = gl
            .compile_shader(ShaderStage::Vertex, VERTEX_SHADER)
            .map_err(SceneError::VertexCompile)?;
        let fragment_shader = gl
            .compile_shader(ShaderStage::Fragment, FRAGMENT_SHADER)
            .map_err(SceneError::FragmentCompile)?;

        let program = gl.create_program();
        gl.attach_shader(program, vertex_shader);
        gl.attach_shader(program, fragment_shader);
        gl.bind_attrib_location(program, attrib::POSITION, "vertexPosition");
        gl.bind_attrib_location(program, attrib::COLOR, "vertexColor");
        gl.bind_attrib_location(program, attrib::UV, "vertexUv");
        gl.bind_attrib_location(program, attrib::TRANSFORM, "vertexTransform");
        gl.link_program(program).map_err(SceneError::Link)?;

        let view_matrix = gl.uniform_location(program, "ViewMatrix");
        let projection_matrix = gl.uniform_location(program, "ProjectionMatrix");
        Ok(Self {
            program,
            vertex_shader,
            fragment_shader,
            view_matrix,
            projection_matrix,
        })
    }

    fn destroy<G: GlDriver>(self, gl: &mut G) {
        gl.delete_program(self.program);
        gl.delete_shader(self.vertex_shader);
        gl.delete_shader(self.fragment_shader);
    }
}

/// Draws instance placement for `count` cubes.
///
/// Candidates are uniform in a cube of side `50 + sqrt(count)` centered on
/// the origin; a candidate is rejected when it is within
/// [`MIN_SEPARATION`] of the origin or of any placed instance on all three
/// axes simultaneously (an axis-aligned box test, intentionally not a
/// sphere). Accepted positions are insertion-sorted by descending squared
/// distance; three rotation-rate scalars are drawn per instance after its
/// position is accepted.
#[must_use]
pub fn place_instances(random: &mut LcgRandom, count: usize) -> (Vec<Vec3>, Vec<Vec3>) {
    #[expect(
        clippy::cast_precision_loss,
        reason = "instance counts are far below f32 precision limits"
    )]
    let side = 50.0 + (count as f32).sqrt();
    let mut positions: Vec<Vec3> = Vec::with_capacity(count);
    let mut rotations: Vec<Vec3> = Vec::with_capacity(count);

    for _ in 0..count {
        let candidate = loop {
            let x = (random.next_float() - 0.5) * side;
            let y = (random.next_float() - 0.5) * side;
            let z = (random.next_float() - 0.5) * side;
            if x.abs() < MIN_SEPARATION && y.abs() < MIN_SEPARATION && z.abs() < MIN_SEPARATION {
                continue;
            }
            let overlap = positions.iter().any(|other| {
                (x - other.x).abs() < MIN_SEPARATION
                    && (y - other.y).abs() < MIN_SEPARATION
                    && (z - other.z).abs() < MIN_SEPARATION
            });
            if !overlap {
                break Vec3::new(x, y, z);
            }
        };

        let dist_sqr = candidate.length_squared();
        let insert = positions.partition_point(|other| other.length_squared() > dist_sqr);
        positions.insert(insert, candidate);
        rotations.insert(
            insert,
            Vec3::new(
                random.next_float(),
                random.next_float(),
                random.next_float(),
            ),
        );
    }
    (positions, rotations)
}

/// The world: program, cube mesh, instance transform buffer, and the
/// deterministic placement.
#[derive(Debug)]
pub struct Scene {
    program: ShaderProgram,
    cube: Geometry,
    instance_transform_buffer: BufferId,
    created_vaos: bool,
    positions: Vec<Vec3>,
    rotations: Vec<Vec3>,
}

impl Scene {
    /// Builds the program, cube, instance buffer, and placement.
    ///
    /// Does not build vertex arrays; call [`Self::create_vaos`] on the
    /// context that will render.
    pub fn create<G: GlDriver>(gl: &mut G) -> Result<Self, SceneError> {
        let program = ShaderProgram::create(gl)?;
        let cube = Geometry::create_cube(gl);

        let instance_transform_buffer = gl.create_buffer();
        gl.bind_buffer(BufferTarget::Array, Some(instance_transform_buffer));
        gl.buffer_data_dynamic(BufferTarget::Array, NUM_INSTANCES * 16 * size_of::<f32>());
        gl.bind_buffer(BufferTarget::Array, None);

        let mut random = LcgRandom::new(2);
        let (positions, rotations) = place_instances(&mut random, NUM_INSTANCES);

        Ok(Self {
            program,
            cube,
            instance_transform_buffer,
            created_vaos: false,
            positions,
            rotations,
        })
    }

    /// Builds the cube vertex array and wires the instance transform matrix
    /// into its four attribute slots with a per-instance divisor.
    /// Idempotent.
    pub fn create_vaos<G: GlDriver>(&mut self, gl: &mut G) {
        if self.created_vaos {
            return;
        }
        self.cube.create_vao(gl);
        if let Some(vao) = self.cube.vertex_array {
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(BufferTarget::Array, Some(self.instance_transform_buffer));
            // One mat4 per instance: four vec4 columns, 64-byte stride.
            for column in 0..4_u32 {
                let index = attrib::TRANSFORM + column;
                gl.enable_vertex_attrib(index);
                gl.vertex_attrib_pointer(
                    index,
                    4,
                    AttribType::F32,
                    false,
                    64,
                    column as usize * 4 * size_of::<f32>(),
                );
                gl.vertex_attrib_divisor(index, 1);
            }
            gl.bind_vertex_array(None);
        }
        self.created_vaos = true;
    }

    /// Deletes the vertex arrays. Idempotent; must run on the context that
    /// built them.
    pub fn destroy_vaos<G: GlDriver>(&mut self, gl: &mut G) {
        if self.created_vaos {
            self.cube.destroy_vao(gl);
            self.created_vaos = false;
        }
    }

    /// Releases every GPU object, vertex arrays included.
    pub fn destroy<G: GlDriver>(mut self, gl: &mut G) {
        self.destroy_vaos(gl);
        self.program.destroy(gl);
        self.cube.destroy(gl);
        gl.delete_buffer(self.instance_transform_buffer);
    }

    /// Sorted instance positions, far to near.
    #[must_use]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Per-instance rotation rates, in position order.
    #[must_use]
    pub fn rotations(&self) -> &[Vec3] {
        &self.rotations
    }

    pub(crate) fn instance_transform_buffer(&self) -> BufferId {
        self.instance_transform_buffer
    }

    pub(crate) fn program(&self) -> ProgramId {
        self.program.program
    }

    pub(crate) fn view_matrix_location(&self) -> Option<UniformLocation> {
        self.program.view_matrix
    }

    pub(crate) fn projection_matrix_location(&self) -> Option<UniformLocation> {
        self.program.projection_matrix
    }

    pub(crate) fn vertex_array(&self) -> Option<VertexArrayId> {
        self.cube.vertex_array
    }

    pub(crate) fn index_count(&self) -> i32 {
        self.cube.index_count
    }
}
