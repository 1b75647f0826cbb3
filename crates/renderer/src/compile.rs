use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Triangles in the generated disc fan.
pub(crate) const DISC_SEGMENTS: u32 = 64;
pub(crate) const DISC_VERTEX_COUNT: u32 = DISC_SEGMENTS * 3;

pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("disc vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(vertex_source()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("disc gradient fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(fragment_source()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

fn vertex_source() -> String {
    format!("{VERSION}{UNIFORMS}{VERTEX_BODY}")
        .replace("@SEGMENTS@", &format!("{DISC_SEGMENTS}u"))
}

fn fragment_source() -> String {
    format!("{VERSION}{UNIFORMS}{FRAGMENT_BODY}")
}

const VERSION: &str = "#version 450\n";

/// Uniform blocks; layouts must match `FrameUniforms` and `DiscUniforms`.
///
/// `stops[i].rgb` is the stop color and `stops[i].w` its position.
/// `shimmer` is (amplitude, speed, frequency, time) and `glow_pulse` is
/// (glow strength, pulse amplitude, pulse frequency, unused).
const UNIFORMS: &str = r"
layout(std140, set = 0, binding = 0) uniform FrameParams {
    mat4 view_proj;
    vec4 stops[4];
    vec4 shimmer;
    vec4 glow_pulse;
} frame;

layout(std140, set = 1, binding = 0) uniform DiscParams {
    mat4 model;
    vec4 focal;
} disc;
";

/// Bufferless triangle fan: vertex `3k` is the centre, `3k+1` and `3k+2`
/// are consecutive rim points of the unit circle.
const VERTEX_BODY: &str = r"
layout(location = 0) out vec2 v_local;

const float TAU = 6.28318530718;

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    uint segment = vertex_index / 3u;
    uint corner = vertex_index % 3u;
    vec2 unit_point = vec2(0.0);
    if (corner != 0u) {
        float angle = TAU * float(segment + corner - 1u) / float(@SEGMENTS@);
        unit_point = vec2(cos(angle), sin(angle));
    }
    v_local = unit_point;
    gl_Position = frame.view_proj * disc.model * vec4(unit_point, 0.0, 1.0);
}
";

const FRAGMENT_BODY: &str = r"
layout(location = 0) in vec2 v_local;
layout(location = 0) out vec4 out_color;

float ease(float t) {
    float x = clamp(t, 0.0, 1.0);
    return x * x * (3.0 - 2.0 * x);
}

vec3 stop_color(float d) {
    int segment = 2;
    for (int i = 0; i < 2; i++) {
        if (d < frame.stops[i + 1].w) {
            segment = i;
            break;
        }
    }
    vec4 lower = frame.stops[segment];
    vec4 upper = frame.stops[segment + 1];
    float span = upper.w - lower.w;
    float t = span > 0.0 ? (d - lower.w) / span : 1.0;
    return mix(lower.rgb, upper.rgb, ease(t));
}

void main() {
    float time = frame.shimmer.w;
    float d = distance(v_local, disc.focal.xy);
    float distorted = d + frame.shimmer.x * sin(frame.shimmer.y * time + d * frame.shimmer.z);
    vec3 glow = frame.stops[3].rgb * d * d * d * frame.glow_pulse.x;
    vec3 color = stop_color(distorted) + glow;
    float alpha = 1.0 - frame.glow_pulse.y * sin(time + d * frame.glow_pulse.z);
    out_color = vec4(color, clamp(alpha, 0.0, 1.0));
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_source_inlines_segment_count() {
        let source = vertex_source();
        assert!(source.starts_with("#version 450"));
        assert!(source.contains("float(64u)"));
        assert!(!source.contains("@SEGMENTS@"));
    }

    #[test]
    fn both_stages_share_the_uniform_blocks() {
        for source in [vertex_source(), fragment_source()] {
            assert!(source.contains("uniform FrameParams"));
            assert!(source.contains("uniform DiscParams"));
        }
    }

    #[test]
    fn shaders_parse_with_naga() {
        let mut frontend = wgpu::naga::front::glsl::Frontend::default();
        let options = wgpu::naga::front::glsl::Options::from(ShaderStage::Fragment);
        frontend
            .parse(&options, &fragment_source())
            .expect("fragment shader parses");
        let options = wgpu::naga::front::glsl::Options::from(ShaderStage::Vertex);
        frontend
            .parse(&options, &vertex_source())
            .expect("vertex shader parses");
    }
}
