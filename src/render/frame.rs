//! The per-frame render sequence.
//!
//! Every frame runs the same steps in the same order:
//!
//! 1. the caller measures the delta time with a [`FrameClock`];
//! 2. [`FrameRenderer::update`] applies the frame's input to the camera and toggles;
//! 3. [`FrameRenderer::render`] hands the [`FrameStats`] to the overlay, clears the framebuffer,
//!    draws the scene with [`DepthState::OPAQUE`], draws the skybox with [`DepthState::SKYBOX`] and
//!    a rotation-only view, restores the opaque depth state, reactivates the scene program and
//!    finally renders the overlay on top;
//! 4. the caller presents the frame.

use std::{rc::Rc, time::Instant};

use glam::{Mat4, Vec4};

use crate::{
    abs::{
        DepthState, DrawCall, Gpu, PolygonMode, RenderContext, ShaderError, ShaderProgram,
        Uniforms, VertexArray,
    },
    config::{Settings, ShaderSettings},
    controls::{Action, InputState, Requests},
};

use super::{
    SCENE_SHADER, SKYBOX_SHADER,
    camera::{Camera, Movement, rotation_only},
    load_program, load_program_or_builtin,
    overlay::{FrameStats, Overlay},
    skybox::{Skybox, load_faces, placeholder_faces},
};

/// The scene: one triangle in the z = 0 plane.
#[rustfmt::skip]
pub const TRIANGLE: [f32; 9] = [
    -0.5, -0.5, 0.0,
     0.5, -0.5, 0.0,
     0.0,  0.5, 0.0,
];

/// Edge length of the faces used when the skybox images cannot be loaded.
const PLACEHOLDER_FACE_SIZE: u32 = 16;

/// Measures the time between frames.
pub struct FrameClock {
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Returns the seconds elapsed since the previous tick, or since the clock was created.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        delta
    }
}

pub struct FrameRenderer {
    gpu: Gpu,
    scene_program: Rc<ShaderProgram>,
    scene: VertexArray,
    skybox: Skybox,
    camera: Camera,
    clear_color: Vec4,
    polygon_mode: PolygonMode,
    cursor_locked: bool,
    shaders: ShaderSettings,
    frame: u64,
    stats: FrameStats,
}

impl FrameRenderer {
    /// Builds the renderer described by `settings`.
    ///
    /// Configured shaders that fail to build are replaced by the built-in ones. Skybox images that
    /// fail to load are replaced by solid placeholder faces.
    pub fn new(gpu: &Gpu, settings: &Settings) -> Result<Self, String> {
        let shaders = &settings.shaders;
        let scene_program = load_program_or_builtin(gpu, shaders.scene.as_ref(), SCENE_SHADER)
            .map_err(|e| e.to_string())?;
        let skybox_program = load_program_or_builtin(gpu, shaders.skybox.as_ref(), SKYBOX_SHADER)
            .map_err(|e| e.to_string())?;

        let faces = load_faces(&settings.skybox.faces).unwrap_or_else(|e| {
            log::error!("{e}");
            log::warn!("using placeholder skybox faces");
            placeholder_faces(PLACEHOLDER_FACE_SIZE)
        });
        let skybox = Skybox::from_images(gpu, faces, Rc::new(skybox_program))
            .map_err(|e| e.to_string())?;

        let camera = settings.camera.build();
        let mut renderer = Self::from_parts(gpu, Rc::new(scene_program), skybox, camera)?;
        renderer.clear_color = settings.render.clear_color();
        renderer.polygon_mode = settings.render.polygon_mode();
        renderer.shaders = settings.shaders.clone();
        Ok(renderer)
    }

    /// Builds a renderer around an existing scene program and skybox, with built-in shader paths
    /// and default render settings.
    pub fn from_parts(
        gpu: &Gpu,
        scene_program: Rc<ShaderProgram>,
        skybox: Skybox,
        camera: Camera,
    ) -> Result<Self, String> {
        let scene = VertexArray::with_positions(gpu, &TRIANGLE, 3)?;
        let defaults = Settings::default();
        Ok(Self {
            gpu: Rc::clone(gpu),
            scene_program,
            scene,
            skybox,
            camera,
            clear_color: defaults.render.clear_color(),
            polygon_mode: defaults.render.polygon_mode(),
            cursor_locked: false,
            shaders: ShaderSettings::default(),
            frame: 0,
            stats: FrameStats::default(),
        })
    }

    /// Applies one frame of input. Held movement keys move the camera by `delta_time` seconds.
    pub fn update(&mut self, input: &InputState, delta_time: f32) -> Requests {
        let mut requests = Requests::default();
        for action in &input.actions {
            match action {
                Action::Quit => requests.quit = true,
                Action::ToggleCursor => {
                    self.cursor_locked = !self.cursor_locked;
                    requests.cursor_locked = Some(self.cursor_locked);
                }
                Action::ToggleWireframe => {
                    self.polygon_mode = self.polygon_mode.toggled();
                    log::info!("polygon mode: {:?}", self.polygon_mode);
                }
                Action::ReloadShaders => {
                    if let Err(e) = self.reload_shaders() {
                        log::error!("{e}");
                        log::warn!("keeping the previous shaders");
                    }
                }
            }
        }

        for movement in [
            Movement::Forward,
            Movement::Backward,
            Movement::Left,
            Movement::Right,
        ] {
            if input.is_held(movement) {
                self.camera.process_keyboard(movement, delta_time);
            }
        }
        let mouse = input.mouse_delta;
        self.camera.process_mouse(mouse.x, mouse.y, true);
        if input.scroll_delta != 0.0 {
            self.camera.process_scroll(input.scroll_delta);
        }
        requests
    }

    /// Renders one frame into `ctx`. Presenting it is up to the caller.
    pub fn render(&mut self, ctx: &mut RenderContext, overlay: &mut dyn Overlay, delta_time: f32) {
        let stats = FrameStats {
            frame: self.frame,
            delta_time,
            fps: if delta_time > 0.0 { 1.0 / delta_time } else { 0.0 },
            draw_calls: ctx.draw_calls(),
            camera_position: self.camera.position,
        };
        overlay.begin_frame(&stats);

        ctx.begin_frame();
        ctx.set_polygon_mode(self.polygon_mode);
        ctx.set_depth(DepthState::OPAQUE);
        ctx.clear(self.clear_color);

        let projection = self.camera.projection(ctx.aspect_ratio()).matrix();
        let view = self.camera.view_matrix();

        let scene_uniforms = Uniforms::new()
            .with("projection", projection)
            .with("view", view)
            .with("model", Mat4::IDENTITY);
        ctx.draw(DrawCall::triangles(&self.scene, &self.scene_program, &scene_uniforms));

        ctx.set_depth(DepthState::SKYBOX);
        let skybox_uniforms = Uniforms::new()
            .with("projection", projection)
            .with("view", rotation_only(view));
        self.skybox.draw(ctx, &skybox_uniforms);
        ctx.set_depth(DepthState::OPAQUE);

        ctx.use_program(&self.scene_program);
        overlay.render(ctx);

        self.frame += 1;
        self.stats = stats;
    }

    /// Rebuilds both programs from their configured paths, or from the built-in sources for
    /// programs without one.
    ///
    /// Either both programs are replaced or neither is.
    pub fn reload_shaders(&mut self) -> Result<(), ShaderError> {
        let scene = load_program(&self.gpu, self.shaders.scene.as_ref(), SCENE_SHADER)?;
        let skybox = load_program(&self.gpu, self.shaders.skybox.as_ref(), SKYBOX_SHADER)?;
        self.scene_program = Rc::new(scene);
        self.skybox.set_shader(Rc::new(skybox));
        log::info!("shaders reloaded");
        Ok(())
    }

    pub fn set_shader_paths(&mut self, shaders: ShaderSettings) {
        self.shaders = shaders;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    pub fn cursor_locked(&self) -> bool {
        self.cursor_locked
    }

    /// Statistics of the last rendered frame.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn scene_program(&self) -> &Rc<ShaderProgram> {
        &self.scene_program
    }

    pub fn skybox(&self) -> &Skybox {
        &self.skybox
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        abs::{DepthFunc, HeadlessBackend, Primitive, ProgramId, UniformValue},
        render::{ShaderPaths, overlay::NoOverlay},
    };

    fn setup() -> (Rc<HeadlessBackend>, Gpu, FrameRenderer) {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        let scene = Rc::new(load_program(&gpu, None, SCENE_SHADER).unwrap());
        let skybox_program = Rc::new(load_program(&gpu, None, SKYBOX_SHADER).unwrap());
        let skybox = Skybox::from_images(&gpu, placeholder_faces(4), skybox_program).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 0.0, -0.25));
        let renderer = FrameRenderer::from_parts(&gpu, scene, skybox, camera).unwrap();
        (headless, gpu, renderer)
    }

    /// Remembers what the device looked like when the overlay was asked to render.
    #[derive(Default)]
    struct Probe {
        stats: Vec<FrameStats>,
        seen: Vec<(usize, Option<ProgramId>)>,
    }

    impl Overlay for Probe {
        fn begin_frame(&mut self, stats: &FrameStats) {
            self.stats.push(*stats);
        }

        fn render(&mut self, ctx: &mut RenderContext) {
            self.seen.push((ctx.draw_calls(), ctx.current_program()));
        }
    }

    #[test]
    fn test_skybox_drawn_once_with_lequal_and_no_depth_write() {
        let (headless, gpu, mut renderer) = setup();
        let mut ctx = RenderContext::new(&gpu, 1600, 900);
        renderer.render(&mut ctx, &mut NoOverlay, 1.0 / 60.0);

        let draws = headless.draws();
        let skybox_draws: Vec<_> = draws.iter().filter(|d| d.count == 36).collect();
        assert_eq!(skybox_draws.len(), 1);
        let skybox = skybox_draws[0];
        assert_eq!(skybox.depth.func, DepthFunc::LessEqual);
        assert!(skybox.depth.test);
        assert!(!skybox.depth.write);
        assert_eq!(skybox.program, Some(renderer.skybox().shader().id()));
        assert_eq!(skybox.cubemap, Some(renderer.skybox().cubemap().id()));
    }

    #[test]
    fn test_frame_sequence() {
        let (headless, gpu, mut renderer) = setup();
        let mut ctx = RenderContext::new(&gpu, 1600, 900);
        let mut probe = Probe::default();
        renderer.render(&mut ctx, &mut probe, 0.5);

        assert_eq!(headless.clear_count(), 1);
        assert_eq!(
            headless.last_clear_color(),
            Some(Vec4::new(0.45, 0.55, 0.60, 1.0))
        );

        let draws = headless.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].count, 3);
        assert_eq!(draws[0].primitive, Primitive::Triangles);
        assert_eq!(draws[0].depth, DepthState::OPAQUE);
        assert_eq!(draws[0].program, Some(renderer.scene_program().id()));
        assert_eq!(draws[1].count, 36);

        // The overlay runs after both 3D draws, with the scene program active again.
        let scene = Some(renderer.scene_program().id());
        assert_eq!(probe.seen, vec![(2, scene)]);
        assert_eq!(headless.current_program(), scene);
        assert_eq!(headless.depth(), DepthState::OPAQUE);

        assert_eq!(probe.stats[0].frame, 0);
        assert_eq!(probe.stats[0].fps, 2.0);
        assert_eq!(renderer.stats().frame, 0);

        renderer.render(&mut ctx, &mut probe, 0.5);
        assert_eq!(probe.stats[1].frame, 1);
        assert_eq!(probe.stats[1].draw_calls, 2);
    }

    #[test]
    fn test_uniforms_follow_the_camera() {
        let (headless, gpu, mut renderer) = setup();
        let mut ctx = RenderContext::new(&gpu, 1600, 900);
        renderer.camera_mut().position = Vec3::new(4.0, 1.0, 2.0);
        renderer.render(&mut ctx, &mut NoOverlay, 0.016);

        let camera = renderer.camera();
        let projection = camera.projection(1600.0 / 900.0).matrix();
        let scene = renderer.scene_program().id();
        let skybox = renderer.skybox().shader().id();
        assert_eq!(
            headless.uniform(scene, "projection"),
            Some(UniformValue::Mat4(projection))
        );
        assert_eq!(
            headless.uniform(scene, "view"),
            Some(UniformValue::Mat4(camera.view_matrix()))
        );
        assert_eq!(
            headless.uniform(scene, "model"),
            Some(UniformValue::Mat4(Mat4::IDENTITY))
        );
        assert_eq!(
            headless.uniform(skybox, "view"),
            Some(UniformValue::Mat4(rotation_only(camera.view_matrix())))
        );
    }

    #[test]
    fn test_resize_changes_projection_aspect() {
        let (headless, gpu, mut renderer) = setup();
        let mut ctx = RenderContext::new(&gpu, 1600, 900);
        ctx.resize(800, 800);
        renderer.render(&mut ctx, &mut NoOverlay, 0.016);

        let projection = renderer.camera().projection(1.0).matrix();
        assert_eq!(
            headless.uniform(renderer.scene_program().id(), "projection"),
            Some(UniformValue::Mat4(projection))
        );
        assert_eq!(headless.viewport(), (800, 800));
    }

    #[test]
    fn test_toggles() {
        let (headless, gpu, mut renderer) = setup();
        let mut ctx = RenderContext::new(&gpu, 100, 100);

        let mut input = InputState::default();
        input.trigger(Action::ToggleWireframe);
        input.trigger(Action::ToggleCursor);
        let requests = renderer.update(&input, 0.0);
        assert_eq!(requests.cursor_locked, Some(true));
        assert!(!requests.quit);
        assert_eq!(renderer.polygon_mode(), PolygonMode::Line);

        renderer.render(&mut ctx, &mut NoOverlay, 0.016);
        let draws = headless.take_draws();
        assert!(draws.iter().all(|d| d.polygon_mode == PolygonMode::Line));

        input.begin_frame();
        input.trigger(Action::ToggleWireframe);
        input.trigger(Action::Quit);
        let requests = renderer.update(&input, 0.0);
        assert_eq!(requests.cursor_locked, None);
        assert!(requests.quit);
        renderer.render(&mut ctx, &mut NoOverlay, 0.016);
        assert!(headless.draws().iter().all(|d| d.polygon_mode == PolygonMode::Fill));
    }

    #[test]
    fn test_held_keys_move_the_camera() {
        let (_, _, mut renderer) = setup();
        let start = renderer.camera().position;
        let front = renderer.camera().front();

        let mut input = InputState::default();
        input.press(Movement::Forward);
        renderer.update(&input, 0.5);
        renderer.update(&input, 0.5);

        let expected = start + front * renderer.camera().speed;
        assert!(renderer.camera().position.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_mouse_and_scroll() {
        let (_, _, mut renderer) = setup();
        let mut input = InputState::default();
        input.mouse_moved(100.0, 50.0);
        input.scrolled(5.0);
        renderer.update(&input, 0.016);

        assert_eq!(renderer.camera().yaw(), -80.0);
        assert_eq!(renderer.camera().pitch(), 5.0);
        assert_eq!(renderer.camera().zoom(), 40.0);
    }

    #[test]
    fn test_failed_reload_keeps_running_programs() {
        let (_, _, mut renderer) = setup();
        let scene = renderer.scene_program().id();
        let skybox = renderer.skybox().shader().id();

        renderer.set_shader_paths(ShaderSettings {
            scene: None,
            skybox: Some(ShaderPaths {
                vertex: "/nonexistent/skybox.vs".into(),
                fragment: "/nonexistent/skybox.fs".into(),
            }),
        });
        assert!(renderer.reload_shaders().is_err());
        assert_eq!(renderer.scene_program().id(), scene);
        assert_eq!(renderer.skybox().shader().id(), skybox);

        renderer.set_shader_paths(ShaderSettings::default());
        renderer.reload_shaders().unwrap();
        assert_ne!(renderer.scene_program().id(), scene);
        assert_ne!(renderer.skybox().shader().id(), skybox);
    }

    #[test]
    fn test_new_falls_back_to_placeholder_faces() {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        let mut settings = Settings::default();
        settings.skybox.faces = std::array::from_fn(|i| format!("/nonexistent/{i}.png").into());
        settings.render.wireframe = true;

        let renderer = FrameRenderer::new(&gpu, &settings).unwrap();
        let size = PLACEHOLDER_FACE_SIZE;
        assert_eq!(renderer.skybox().cubemap().size(), (size, size));
        assert_eq!(renderer.polygon_mode(), PolygonMode::Line);
        assert_eq!(renderer.camera().position, Vec3::new(0.0, 0.0, -0.25));
    }
}
