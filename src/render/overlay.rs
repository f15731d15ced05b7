//! Overlays rendered on top of the 3D scene.
//!
//! An [`Overlay`] gets the frame's statistics before anything is drawn and renders after all 3D
//! geometry, so whatever it draws composites on top.

use std::rc::Rc;

use glam::{Vec2, Vec3, Vec4};

use crate::abs::{
    DepthState, DrawCall, Gpu, Primitive, RenderContext, ShaderError, ShaderProgram, Uniforms,
    VertexArray,
};

use super::{CROSSHAIR_SHADER, load_program};

/// Numbers describing the frame being rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub delta_time: f32,
    pub fps: f32,
    /// Draws issued during the previous frame.
    pub draw_calls: usize,
    pub camera_position: Vec3,
}

/// A UI collaborator drawn after the scene.
pub trait Overlay {
    /// Called at the start of the frame, before the framebuffer is cleared.
    fn begin_frame(&mut self, _stats: &FrameStats) {}

    /// Draws the overlay. Called after every 3D draw of the frame.
    fn render(&mut self, ctx: &mut RenderContext);
}

/// An overlay that draws nothing.
pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn render(&mut self, _ctx: &mut RenderContext) {}
}

impl<A: Overlay, B: Overlay> Overlay for (A, B) {
    fn begin_frame(&mut self, stats: &FrameStats) {
        self.0.begin_frame(stats);
        self.1.begin_frame(stats);
    }

    fn render(&mut self, ctx: &mut RenderContext) {
        self.0.render(ctx);
        self.1.render(ctx);
    }
}

impl<O: Overlay + ?Sized> Overlay for Box<O> {
    fn begin_frame(&mut self, stats: &FrameStats) {
        (**self).begin_frame(stats);
    }

    fn render(&mut self, ctx: &mut RenderContext) {
        (**self).render(ctx);
    }
}

/// Draws a crosshair in the middle of the screen.
pub struct CrosshairOverlay {
    program: Rc<ShaderProgram>,
    lines: VertexArray,
    /// Half the length of each arm, in pixels.
    pub size: f32,
    pub color: Vec4,
}

impl CrosshairOverlay {
    pub fn new(gpu: &Gpu) -> Result<Self, ShaderError> {
        let program = Rc::new(load_program(gpu, None, CROSSHAIR_SHADER)?);
        #[rustfmt::skip]
        let arms = [
            -1.0, 0.0,   1.0, 0.0,
             0.0, -1.0,  0.0, 1.0,
        ];
        let lines = VertexArray::with_positions(gpu, &arms, 2).map_err(ShaderError::Device)?;
        Ok(Self {
            program,
            lines,
            size: 10.0,
            color: Vec4::new(1.0, 1.0, 1.0, 0.8),
        })
    }
}

impl Overlay for CrosshairOverlay {
    fn render(&mut self, ctx: &mut RenderContext) {
        let (width, height) = ctx.viewport();
        let scale = Vec2::new(
            self.size * 2.0 / width.max(1) as f32,
            self.size * 2.0 / height.max(1) as f32,
        );
        let uniforms = Uniforms::new()
            .with("scale", scale)
            .with("color", self.color);

        let depth = ctx.depth();
        ctx.set_depth(DepthState::OVERLAY);
        ctx.draw(DrawCall {
            array: &self.lines,
            program: &self.program,
            uniforms: &uniforms,
            cubemaps: &[],
            primitive: Primitive::Lines,
            first: 0,
            count: 4,
        });
        ctx.set_depth(depth);
    }
}

/// Logs frame statistics at a fixed interval instead of drawing them.
pub struct LogOverlay {
    every: u64,
    stats: FrameStats,
}

impl LogOverlay {
    /// Logs once every `every` frames.
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            stats: FrameStats::default(),
        }
    }
}

impl Overlay for LogOverlay {
    fn begin_frame(&mut self, stats: &FrameStats) {
        self.stats = *stats;
    }

    fn render(&mut self, ctx: &mut RenderContext) {
        if self.stats.frame % self.every == 0 {
            log::info!(
                "frame {}: {:.1} fps, {} draws so far this frame, camera at {:.2}",
                self.stats.frame,
                self.stats.fps,
                ctx.draw_calls(),
                self.stats.camera_position
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::{DepthFunc, HeadlessBackend};

    #[test]
    fn test_crosshair_draws_lines_without_depth() {
        let headless = Rc::new(HeadlessBackend::new());
        let gpu: Gpu = headless.clone();
        let mut ctx = RenderContext::new(&gpu, 1000, 500);
        let mut overlay = CrosshairOverlay::new(&gpu).unwrap();

        overlay.render(&mut ctx);

        let draws = headless.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].primitive, Primitive::Lines);
        assert_eq!(draws[0].count, 4);
        assert!(!draws[0].depth.test);
        assert_eq!(headless.depth().func, DepthFunc::Less);
        assert_eq!(
            headless.uniform(overlay.program.id(), "scale"),
            Some(crate::abs::UniformValue::Vec2(Vec2::new(0.02, 0.04)))
        );
    }

    #[test]
    fn test_pair_forwards_to_both() {
        struct Count(usize);
        impl Overlay for Count {
            fn render(&mut self, _ctx: &mut RenderContext) {
                self.0 += 1;
            }
        }

        let gpu: Gpu = Rc::new(HeadlessBackend::new());
        let mut ctx = RenderContext::new(&gpu, 10, 10);
        let mut pair = (Count(0), Count(0));
        pair.render(&mut ctx);
        assert_eq!((pair.0.0, pair.1.0), (1, 1));
    }
}
