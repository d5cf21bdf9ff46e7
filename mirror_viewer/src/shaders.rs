/// One module serves all three programs. `scene_vs_main` is shared; the
/// mirror and direct programs use `object_fs_main`, the floor program uses
/// `floor_fs_main`, which also samples the mirror surface from group 1.
pub(crate) const SCENE_SHADER_SOURCE: &str = r#"
struct PassUniforms {
    projection: mat4x4<f32>,
    light_ambient: vec4<f32>,
    light_diffuse: vec4<f32>,
    light_specular: vec4<f32>,
    light_position: vec4<f32>,
    clip_plane: vec4<f32>,
    material_specular: vec4<f32>,
    // x: shininess, y: floor reflectance, z: checker cells per edge
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> pass_uniforms: PassUniforms;

@group(1) @binding(0)
var reflection_texture: texture_2d<f32>;
@group(1) @binding(1)
var reflection_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct InstanceInput {
    @location(3) model_view_0: vec4<f32>,
    @location(4) model_view_1: vec4<f32>,
    @location(5) model_view_2: vec4<f32>,
    @location(6) model_view_3: vec4<f32>,
    @location(7) ambient: vec4<f32>,
    @location(8) diffuse: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) eye_position: vec4<f32>,
    @location(1) eye_normal: vec3<f32>,
    @location(2) ambient: vec4<f32>,
    @location(3) diffuse: vec4<f32>,
    @location(4) uv: vec2<f32>,
};

@vertex
fn scene_vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model_view = mat4x4<f32>(
        instance.model_view_0,
        instance.model_view_1,
        instance.model_view_2,
        instance.model_view_3,
    );
    let eye_position = model_view * vec4<f32>(vertex.position, 1.0);
    // Model-view is rigid up to the mirror flip, which is its own inverse
    // transpose, so the upper 3x3 carries normals as well.
    let normal_matrix = mat3x3<f32>(model_view[0].xyz, model_view[1].xyz, model_view[2].xyz);

    var out: VertexOutput;
    out.clip_position = pass_uniforms.projection * eye_position;
    out.eye_position = eye_position;
    out.eye_normal = normal_matrix * vertex.normal;
    out.ambient = instance.ambient;
    out.diffuse = instance.diffuse;
    out.uv = vertex.uv;
    return out;
}

fn shade(
    eye_position: vec4<f32>,
    eye_normal: vec3<f32>,
    ambient: vec3<f32>,
    diffuse: vec3<f32>,
) -> vec3<f32> {
    let p = eye_position.xyz / eye_position.w;
    let light = pass_uniforms.light_position;
    let to_light = normalize(light.xyz - p * light.w);
    let to_eye = normalize(-p);
    let half_vector = normalize(to_light + to_eye);
    let normal = normalize(eye_normal);
    let lambert = max(dot(normal, to_light), 0.0);
    let highlight = pow(max(dot(normal, half_vector), 0.0), pass_uniforms.params.x);
    return pass_uniforms.light_ambient.rgb * ambient
        + lambert * pass_uniforms.light_diffuse.rgb * diffuse
        + highlight * pass_uniforms.light_specular.rgb * pass_uniforms.material_specular.rgb;
}

@fragment
fn object_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    if dot(pass_uniforms.clip_plane, input.eye_position) < 0.0 {
        discard;
    }
    let color = shade(input.eye_position, input.eye_normal, input.ambient.rgb, input.diffuse.rgb);
    return vec4<f32>(color, input.ambient.a);
}

@fragment
fn floor_fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let cell = floor(input.uv * pass_uniforms.params.z);
    let parity = (cell.x + cell.y) - 2.0 * floor((cell.x + cell.y) * 0.5);
    let tint = mix(1.0, 0.55, parity);
    let lit = shade(
        input.eye_position,
        input.eye_normal,
        input.ambient.rgb * tint,
        input.diffuse.rgb * tint,
    );

    // The mirror pass shares this projection, so the reflected image of this
    // fragment sits at the same normalized screen position.
    let clip = pass_uniforms.projection * input.eye_position;
    let ndc = clip.xy / clip.w;
    let screen_uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let reflection = textureSample(reflection_texture, reflection_sampler, screen_uv);

    return vec4<f32>(mix(lit, reflection.rgb, pass_uniforms.params.y), 1.0);
}
"#;

pub(crate) const SCENE_VERTEX_ENTRY: &str = "scene_vs_main";
pub(crate) const OBJECT_FRAGMENT_ENTRY: &str = "object_fs_main";
pub(crate) const FLOOR_FRAGMENT_ENTRY: &str = "floor_fs_main";
