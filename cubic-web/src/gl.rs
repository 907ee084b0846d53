//! WebGL2 renderer
//!
//! Same instanced layout as the desktop renderer: one draw for the filled
//! cubes, one for their outlines. It renders into the canvas for the flat
//! view and into the XR layer's framebuffer, once per eye, in immersive mode.

use crate::error::{Result, WebError};
use cubic::mesh::{self, CubeInstance, InstanceBuffer, Vertex};
use cubic_protocol::{BackgroundData, CameraData, Command, EnvironmentCommand, LightingData, SceneCommand};
use glam::{Mat4, Vec3};
use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlFramebuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject,
};

const CUBE_VERTEX_SHADER: &str = r#"#version 300 es
uniform mat4 u_view_proj;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec4 i_position_size;
layout(location = 3) in vec4 i_color_emissive_intensity;
layout(location = 4) in vec4 i_emissive_metalness;
layout(location = 5) in vec4 i_edge_color_roughness;

out vec3 v_world_position;
out vec3 v_normal;
out vec3 v_color;
out vec3 v_emissive;
out vec2 v_material;

void main() {
    vec3 world = i_position_size.xyz + a_position * i_position_size.w;
    gl_Position = u_view_proj * vec4(world, 1.0);
    v_world_position = world;
    v_normal = a_normal;
    v_color = i_color_emissive_intensity.rgb;
    v_emissive = i_emissive_metalness.rgb * i_color_emissive_intensity.w;
    v_material = vec2(i_emissive_metalness.w, i_edge_color_roughness.w);
}
"#;

const CUBE_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

uniform vec3 u_camera_position;
uniform vec3 u_ambient;
uniform vec3 u_light_direction;
uniform vec3 u_light_color;

in vec3 v_world_position;
in vec3 v_normal;
in vec3 v_color;
in vec3 v_emissive;
in vec2 v_material;

out vec4 out_color;

void main() {
    vec3 n = normalize(v_normal);
    vec3 l = normalize(-u_light_direction);
    vec3 v = normalize(u_camera_position - v_world_position);
    vec3 h = normalize(l + v);

    float metalness = v_material.x;
    float roughness = v_material.y;
    vec3 diffuse_color = v_color * (1.0 - metalness);
    vec3 specular_color = mix(vec3(0.04), v_color, metalness);
    float shininess = mix(128.0, 4.0, roughness);

    float n_dot_l = max(dot(n, l), 0.0);
    float specular = pow(max(dot(n, h), 0.0), shininess) * n_dot_l;

    vec3 lit = diffuse_color * (u_ambient + u_light_color * n_dot_l)
        + specular_color * u_light_color * specular;
    out_color = vec4(lit + v_emissive, 1.0);
}
"#;

const EDGE_VERTEX_SHADER: &str = r#"#version 300 es
uniform mat4 u_view_proj;

layout(location = 0) in vec3 a_position;
layout(location = 2) in vec4 i_position_size;
layout(location = 5) in vec4 i_edge_color_roughness;

out vec3 v_color;

void main() {
    vec3 world = i_position_size.xyz + a_position * i_position_size.w * 1.002;
    gl_Position = u_view_proj * vec4(world, 1.0);
    v_color = i_edge_color_roughness.rgb;
}
"#;

const EDGE_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

in vec3 v_color;
out vec4 out_color;

void main() {
    out_color = vec4(v_color, 1.0);
}
"#;

const LINE_VERTEX_SHADER: &str = r#"#version 300 es
uniform mat4 u_view_proj;
layout(location = 0) in vec3 a_position;

void main() {
    gl_Position = u_view_proj * vec4(a_position, 1.0);
}
"#;

const LINE_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

uniform vec3 u_color;
out vec4 out_color;

void main() {
    out_color = vec4(u_color, 1.0);
}
"#;

/// Controller pointer color
const POINTER_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

const INSTANCE_ATTRIBUTES: [u32; 4] = [2, 3, 4, 5];

/// WebGL2 context that an immersive session can render into.
pub fn create_context(canvas: &HtmlCanvasElement) -> Result<Gl> {
    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("xrCompatible"), &JsValue::TRUE)?;
    Reflect::set(&options, &JsValue::from_str("antialias"), &JsValue::TRUE)?;
    canvas
        .get_context_with_context_options("webgl2", &options)?
        .ok_or(WebError::Missing("WebGL2 context"))?
        .dyn_into::<Gl>()
        .map_err(|_| WebError::Missing("WebGl2RenderingContext"))
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader> {
    let shader = gl
        .create_shader(kind)
        .ok_or(WebError::Shader("unable to create shader object".into()))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(WebError::Shader(log))
    }
}

fn link_program(gl: &Gl, vertex: &str, fragment: &str) -> Result<WebGlProgram> {
    let vertex = compile_shader(gl, Gl::VERTEX_SHADER, vertex)?;
    let fragment = compile_shader(gl, Gl::FRAGMENT_SHADER, fragment)?;
    let program = gl
        .create_program()
        .ok_or(WebError::Link("unable to create program object".into()))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);
    gl.delete_shader(Some(&vertex));
    gl.delete_shader(Some(&fragment));

    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(WebError::Link(log))
    }
}

fn create_buffer(gl: &Gl, target: u32, data: &[u8], usage: u32) -> Result<WebGlBuffer> {
    let buffer = gl
        .create_buffer()
        .ok_or(WebError::Js("unable to create buffer".into()))?;
    gl.bind_buffer(target, Some(&buffer));
    gl.buffer_data_with_u8_array(target, data, usage);
    Ok(buffer)
}

fn create_vertex_array(gl: &Gl) -> Result<WebGlVertexArrayObject> {
    gl.create_vertex_array()
        .ok_or(WebError::Js("unable to create vertex array".into()))
}

struct CubeUniforms {
    view_proj: Option<WebGlUniformLocation>,
    camera_position: Option<WebGlUniformLocation>,
    ambient: Option<WebGlUniformLocation>,
    light_direction: Option<WebGlUniformLocation>,
    light_color: Option<WebGlUniformLocation>,
}

/// One eye (or the whole canvas): where to draw and from where.
pub struct ViewTarget<'a> {
    pub framebuffer: Option<&'a WebGlFramebuffer>,
    pub viewport: [i32; 4],
    pub view_proj: Mat4,
    pub eye: Vec3,
}

pub struct GlRenderer {
    gl: Gl,
    cube_program: WebGlProgram,
    cube_uniforms: CubeUniforms,
    edge_program: WebGlProgram,
    edge_view_proj: Option<WebGlUniformLocation>,
    line_program: WebGlProgram,
    line_view_proj: Option<WebGlUniformLocation>,
    line_color: Option<WebGlUniformLocation>,
    cube_vao: WebGlVertexArrayObject,
    edge_vao: WebGlVertexArrayObject,
    line_vao: WebGlVertexArrayObject,
    instance_buffer: WebGlBuffer,
    line_buffer: WebGlBuffer,
    num_indices: i32,
    num_edge_indices: i32,
    instances: InstanceBuffer,
    background_color: [f32; 4],
    camera: Option<CameraData>,
    lighting: Option<LightingData>,
}

impl GlRenderer {
    pub fn new(gl: Gl) -> Result<Self> {
        let cube_program = link_program(&gl, CUBE_VERTEX_SHADER, CUBE_FRAGMENT_SHADER)?;
        let edge_program = link_program(&gl, EDGE_VERTEX_SHADER, EDGE_FRAGMENT_SHADER)?;
        let line_program = link_program(&gl, LINE_VERTEX_SHADER, LINE_FRAGMENT_SHADER)?;

        let cube_uniforms = CubeUniforms {
            view_proj: gl.get_uniform_location(&cube_program, "u_view_proj"),
            camera_position: gl.get_uniform_location(&cube_program, "u_camera_position"),
            ambient: gl.get_uniform_location(&cube_program, "u_ambient"),
            light_direction: gl.get_uniform_location(&cube_program, "u_light_direction"),
            light_color: gl.get_uniform_location(&cube_program, "u_light_color"),
        };
        let edge_view_proj = gl.get_uniform_location(&edge_program, "u_view_proj");
        let line_view_proj = gl.get_uniform_location(&line_program, "u_view_proj");
        let line_color = gl.get_uniform_location(&line_program, "u_color");

        let instance_buffer = create_buffer(&gl, Gl::ARRAY_BUFFER, &[], Gl::DYNAMIC_DRAW)?;

        // Filled cubes: interleaved position/normal plus per-instance data
        let vertices = mesh::cube_vertices();
        let indices = mesh::cube_indices();
        let cube_vao = create_vertex_array(&gl)?;
        gl.bind_vertex_array(Some(&cube_vao));
        create_buffer(&gl, Gl::ARRAY_BUFFER, bytemuck::cast_slice(&vertices), Gl::STATIC_DRAW)?;
        let stride = std::mem::size_of::<Vertex>() as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 3, Gl::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_with_i32(1, 3, Gl::FLOAT, false, stride, 12);
        create_buffer(&gl, Gl::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&indices), Gl::STATIC_DRAW)?;
        bind_instance_attributes(&gl, &instance_buffer);

        // Outlines
        let edge_vertices = mesh::edge_vertices();
        let edge_indices = mesh::edge_indices();
        let edge_vao = create_vertex_array(&gl)?;
        gl.bind_vertex_array(Some(&edge_vao));
        create_buffer(&gl, Gl::ARRAY_BUFFER, bytemuck::cast_slice(&edge_vertices), Gl::STATIC_DRAW)?;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 3, Gl::FLOAT, false, 12, 0);
        create_buffer(&gl, Gl::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&edge_indices), Gl::STATIC_DRAW)?;
        bind_instance_attributes(&gl, &instance_buffer);

        // Controller pointers, rewritten every frame
        let line_vao = create_vertex_array(&gl)?;
        gl.bind_vertex_array(Some(&line_vao));
        let line_buffer = create_buffer(&gl, Gl::ARRAY_BUFFER, &[], Gl::STREAM_DRAW)?;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 3, Gl::FLOAT, false, 12, 0);

        gl.bind_vertex_array(None);
        gl.enable(Gl::DEPTH_TEST);
        gl.enable(Gl::CULL_FACE);
        gl.cull_face(Gl::BACK);

        log::info!("WebGL2 renderer ready");

        Ok(Self {
            gl,
            cube_program,
            cube_uniforms,
            edge_program,
            edge_view_proj,
            line_program,
            line_view_proj,
            line_color,
            cube_vao,
            edge_vao,
            line_vao,
            instance_buffer,
            line_buffer,
            num_indices: indices.len() as i32,
            num_edge_indices: edge_indices.len() as i32,
            instances: InstanceBuffer::new(),
            background_color: [0.0, 0.0, 0.0, 1.0],
            camera: None,
            lighting: None,
        })
    }

    pub fn context(&self) -> &Gl {
        &self.gl
    }

    /// Execute a scene or environment command. Returns false for commands
    /// that are not for the renderer.
    pub fn apply(&mut self, command: &Command) -> bool {
        match command {
            Command::Scene(SceneCommand::CreateCube(data)) => self.instances.create(data),
            Command::Scene(SceneCommand::SetEmissiveIntensity { cube_id, intensity }) => {
                if !self.instances.set_emissive_intensity(*cube_id, *intensity) {
                    log::warn!("SetEmissiveIntensity for unknown cube {}", cube_id);
                }
            }
            Command::Environment(EnvironmentCommand::SetCamera(camera)) => {
                self.camera = Some(camera.clone());
            }
            Command::Environment(EnvironmentCommand::SetBackground(BackgroundData::Color(color))) => {
                self.background_color = *color;
            }
            Command::Environment(EnvironmentCommand::SetLighting(lighting)) => {
                self.lighting = Some(lighting.clone());
            }
            _ => return false,
        }
        true
    }

    pub fn camera(&self) -> Option<&CameraData> {
        self.camera.as_ref()
    }

    fn upload_instances(&mut self) {
        if self.instances.take_dirty() {
            self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&self.instance_buffer));
            self.gl
                .buffer_data_with_u8_array(Gl::ARRAY_BUFFER, self.instances.as_bytes(), Gl::DYNAMIC_DRAW);
        }
    }

    /// Bind `framebuffer` and clear it. Call once per frame before `draw_view`.
    pub fn begin_frame(&mut self, framebuffer: Option<&WebGlFramebuffer>, size: (i32, i32)) {
        self.upload_instances();
        let gl = &self.gl;
        gl.bind_framebuffer(Gl::FRAMEBUFFER, framebuffer);
        gl.viewport(0, 0, size.0, size.1);
        let [r, g, b, a] = self.background_color;
        gl.clear_color(r, g, b, a);
        gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
    }

    pub fn draw_view(&self, target: &ViewTarget<'_>, pointers: &[[f32; 3]]) {
        let gl = &self.gl;
        gl.bind_framebuffer(Gl::FRAMEBUFFER, target.framebuffer);
        let [x, y, width, height] = target.viewport;
        gl.viewport(x, y, width, height);

        let view_proj = target.view_proj.to_cols_array();
        let count = self.instances.len() as i32;

        if count > 0 {
            let u = &self.cube_uniforms;
            gl.use_program(Some(&self.cube_program));
            gl.uniform_matrix4fv_with_f32_array(u.view_proj.as_ref(), false, &view_proj);
            gl.uniform3fv_with_f32_array(u.camera_position.as_ref(), &target.eye.to_array());
            let (ambient, direction, light) = self.light_uniforms();
            gl.uniform3fv_with_f32_array(u.ambient.as_ref(), &ambient);
            gl.uniform3fv_with_f32_array(u.light_direction.as_ref(), &direction);
            gl.uniform3fv_with_f32_array(u.light_color.as_ref(), &light);
            gl.bind_vertex_array(Some(&self.cube_vao));
            gl.draw_elements_instanced_with_i32(
                Gl::TRIANGLES,
                self.num_indices,
                Gl::UNSIGNED_SHORT,
                0,
                count,
            );

            gl.use_program(Some(&self.edge_program));
            gl.uniform_matrix4fv_with_f32_array(self.edge_view_proj.as_ref(), false, &view_proj);
            gl.bind_vertex_array(Some(&self.edge_vao));
            gl.draw_elements_instanced_with_i32(
                Gl::LINES,
                self.num_edge_indices,
                Gl::UNSIGNED_SHORT,
                0,
                count,
            );
        }

        if !pointers.is_empty() {
            gl.use_program(Some(&self.line_program));
            gl.uniform_matrix4fv_with_f32_array(self.line_view_proj.as_ref(), false, &view_proj);
            gl.uniform3fv_with_f32_array(self.line_color.as_ref(), &POINTER_COLOR);
            gl.bind_vertex_array(Some(&self.line_vao));
            gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&self.line_buffer));
            gl.buffer_data_with_u8_array(
                Gl::ARRAY_BUFFER,
                bytemuck::cast_slice(pointers),
                Gl::STREAM_DRAW,
            );
            gl.draw_arrays(Gl::LINES, 0, pointers.len() as i32);
        }

        gl.bind_vertex_array(None);
    }

    fn light_uniforms(&self) -> ([f32; 3], [f32; 3], [f32; 3]) {
        let Some(lighting) = &self.lighting else {
            return ([1.0; 3], [0.0, -1.0, 0.0], [0.0; 3]);
        };
        let scale = |c: [f32; 3], i: f32| [c[0] * i, c[1] * i, c[2] * i];
        let ambient = scale(lighting.ambient.color, lighting.ambient.intensity);
        match &lighting.directional {
            Some(light) => (
                ambient,
                light.direction,
                scale(light.color, light.intensity),
            ),
            None => (ambient, [0.0, -1.0, 0.0], [0.0; 3]),
        }
    }
}

/// Point attributes 2..=5 at the shared instance buffer, one step per instance.
fn bind_instance_attributes(gl: &Gl, instance_buffer: &WebGlBuffer) {
    gl.bind_buffer(Gl::ARRAY_BUFFER, Some(instance_buffer));
    let stride = std::mem::size_of::<CubeInstance>() as i32;
    for (i, location) in INSTANCE_ATTRIBUTES.iter().enumerate() {
        gl.enable_vertex_attrib_array(*location);
        gl.vertex_attrib_pointer_with_i32(*location, 4, Gl::FLOAT, false, stride, i as i32 * 16);
        gl.vertex_attrib_divisor(*location, 1);
    }
}
