//! Draw plans: what a pass draws, decided on the CPU before any GPU call.
//!
//! Passes turn scene geometry plus frame state into a [`PassPlan`]; a shared
//! executor then records the plan into a render pass. Keeping the decision
//! separate from recording lets the pass logic be tested without a device.

use std::ops::Range;

use crate::gpu_scene::GpuScene;
use crate::pipeline::TopologyPipelines;
use crate::uniforms::{DrawUniforms, DynamicUniforms};

/// Which buffer and primitive assembly a command draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawSource {
    /// Indexed geometry triangles.
    Triangles,
    /// Indexed geometry lines.
    Lines,
    /// Geometry points as sprites.
    Points,
    /// Mesh surface vertices.
    MeshSurface,
    /// Mesh wireframe vertices.
    MeshWireframe,
    /// Mesh nodes as sprites.
    MeshNodes,
}

impl DrawSource {
    /// Returns true for sources drawn as instanced sprites.
    #[must_use]
    pub fn is_sprite(self) -> bool {
        matches!(self, DrawSource::Points | DrawSource::MeshNodes)
    }
}

/// One draw call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub source: DrawSource,
    /// Index range for indexed sources, vertex (or instance) range otherwise.
    pub range: Range<u32>,
    /// Index into [`PassPlan::uniforms`].
    pub uniform: usize,
}

/// Draw commands plus the uniform blocks they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassPlan {
    pub commands: Vec<DrawCommand>,
    pub uniforms: Vec<DrawUniforms>,
}

impl PassPlan {
    /// A plan whose commands all use `uniforms`.
    #[must_use]
    pub fn with_uniforms(uniforms: DrawUniforms) -> Self {
        Self {
            commands: Vec::new(),
            uniforms: vec![uniforms],
        }
    }

    /// Appends a uniform block and returns its index.
    pub fn add_uniforms(&mut self, uniforms: DrawUniforms) -> usize {
        self.uniforms.push(uniforms);
        self.uniforms.len() - 1
    }

    /// Appends a draw, extending the previous one when it continues it.
    pub fn push(&mut self, source: DrawSource, range: Range<u32>, uniform: usize) {
        if range.is_empty() {
            return;
        }
        if let Some(last) = self.commands.last_mut() {
            if last.source == source && last.uniform == uniform && last.range.end == range.start {
                last.range.end = range.end;
                return;
            }
        }
        self.commands.push(DrawCommand {
            source,
            range,
            uniform,
        });
    }

    /// Appends every range with the same uniform.
    pub fn extend(
        &mut self,
        source: DrawSource,
        ranges: impl IntoIterator<Item = Range<u32>>,
        uniform: usize,
    ) {
        for range in ranges {
            self.push(source, range, uniform);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of draw calls.
    pub fn draw_count(&self) -> usize {
        self.commands.len()
    }

    /// Commands drawing from `source`.
    pub fn commands_for(&self, source: DrawSource) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(move |c| c.source == source)
    }
}

/// Records `plan` into `pass`. Returns the number of draw calls issued.
///
/// Commands whose pipeline is missing or whose buffer is empty are skipped.
/// `uniforms` must already hold `plan.uniforms`.
pub fn execute_plan(
    pass: &mut wgpu::RenderPass<'_>,
    pipelines: &TopologyPipelines,
    frame_bind_group: &wgpu::BindGroup,
    uniforms: &DynamicUniforms<DrawUniforms>,
    scene: &GpuScene,
    plan: &PassPlan,
) -> u32 {
    let mut draws = 0;
    let mut bound: Option<DrawSource> = None;
    for command in &plan.commands {
        let pipeline = match command.source {
            DrawSource::Triangles | DrawSource::MeshSurface => pipelines.triangles.as_ref(),
            DrawSource::Lines | DrawSource::MeshWireframe => pipelines.lines.as_ref(),
            DrawSource::Points | DrawSource::MeshNodes => pipelines.sprites.as_ref(),
        };
        let Some(pipeline) = pipeline else {
            continue;
        };

        if bound != Some(command.source) {
            let buffer = match command.source {
                DrawSource::Triangles => &scene.triangles,
                DrawSource::Lines => &scene.lines,
                DrawSource::Points => &scene.points,
                DrawSource::MeshSurface | DrawSource::MeshWireframe | DrawSource::MeshNodes => {
                    &scene.mesh
                }
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, frame_bind_group, &[]);
            if !buffer.bind_for_draw(pass, 0) {
                bound = None;
                continue;
            }
            bound = Some(command.source);
        }

        pass.set_bind_group(1, uniforms.bind_group(), &[uniforms.offset(command.uniform)]);
        match command.source {
            DrawSource::Triangles | DrawSource::Lines => {
                pass.draw_indexed(command.range.clone(), 0, 0..1);
            }
            DrawSource::Points | DrawSource::MeshNodes => {
                pass.draw(0..6, command.range.clone());
            }
            DrawSource::MeshSurface | DrawSource::MeshWireframe => {
                pass.draw(command.range.clone(), 0..1);
            }
        }
        draws += 1;
    }
    draws
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_merges_continuations() {
        let mut plan = PassPlan::with_uniforms(DrawUniforms::default());
        plan.push(DrawSource::Triangles, 0..3, 0);
        plan.push(DrawSource::Triangles, 3..9, 0);
        plan.push(DrawSource::Lines, 9..12, 0);
        plan.push(DrawSource::Lines, 20..22, 0);
        assert_eq!(
            plan.commands,
            vec![
                DrawCommand {
                    source: DrawSource::Triangles,
                    range: 0..9,
                    uniform: 0
                },
                DrawCommand {
                    source: DrawSource::Lines,
                    range: 9..12,
                    uniform: 0
                },
                DrawCommand {
                    source: DrawSource::Lines,
                    range: 20..22,
                    uniform: 0
                },
            ]
        );
    }

    #[test]
    fn test_push_keeps_distinct_uniforms_apart() {
        let mut plan = PassPlan::default();
        let a = plan.add_uniforms(DrawUniforms::with_alpha(1.0));
        let b = plan.add_uniforms(DrawUniforms::with_alpha(0.5));
        plan.push(DrawSource::Triangles, 0..3, a);
        plan.push(DrawSource::Triangles, 3..6, b);
        plan.push(DrawSource::Triangles, 6..6, a);
        assert_eq!(plan.draw_count(), 2);
        assert_eq!(plan.commands_for(DrawSource::Triangles).count(), 2);
        assert!(DrawSource::MeshNodes.is_sprite());
        assert!(!DrawSource::MeshWireframe.is_sprite());
    }
}
