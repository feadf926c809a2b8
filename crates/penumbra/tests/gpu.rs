//! Headless GPU tests. Any backend is accepted, software GL included; a test
//! returns early only when the machine has no adapter at all.

use glam::{Mat4, Vec3};
use penumbra::light::generate_lights;
use penumbra::resources::ResourceManager;
use penumbra::{assets, Camera, Error, FrameInputs, LightSource, Model, PipelineVariant, Renderer, RendererConfig};
use std::sync::Arc;

const SIZE: u32 = 64;
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Gpu {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    downlevel: wgpu::DownlevelFlags,
}

fn gpu() -> Option<Gpu> {
    let _ = env_logger::builder().is_test(true).try_init();
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Test Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
        },
        None,
    ))
    .ok()?;
    log::info!("Testing on {:?}", adapter.get_info());
    Some(Gpu {
        device: Arc::new(device),
        queue: Arc::new(queue),
        downlevel: adapter.get_downlevel_capabilities().flags,
    })
}

fn renderer(device: &Arc<wgpu::Device>, queue: &Arc<wgpu::Queue>) -> Renderer {
    let config = RendererConfig::new(SIZE, SIZE, TARGET_FORMAT);
    Renderer::new(device.clone(), queue.clone(), config).expect("renderer")
}

fn color_target(device: &wgpu::Device) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Target"),
        size: wgpu::Extent3d { width: SIZE, height: SIZE, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Read back a 4-byte-per-texel texture; rows are padded to 256 bytes
fn read_texture(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture, aspect: wgpu::TextureAspect) -> Vec<u8> {
    let unpadded = SIZE * 4;
    let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback"),
        size: (padded * SIZE) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture { texture, mip_level: 0, origin: wgpu::Origin3d::ZERO, aspect },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(padded), rows_per_image: Some(SIZE) },
        },
        wgpu::Extent3d { width: SIZE, height: SIZE, depth_or_array_layers: 1 },
    );
    queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, |r| r.expect("map"));
    device.poll(wgpu::Maintain::Wait);
    let data = slice.get_mapped_range();
    let mut out = Vec::with_capacity((unpadded * SIZE) as usize);
    for row in data.chunks(padded as usize) {
        out.extend_from_slice(&row[..unpadded as usize]);
    }
    out
}

fn camera() -> Camera {
    Camera::look_at(Vec3::new(0.0, 1.0, 6.0), Vec3::ZERO, 45.0)
}

#[test]
fn display_depth_matches_gbuffer_depth() {
    let Some(Gpu { device, queue, downlevel }) = gpu() else { return };
    // Reading depth back needs depth-to-buffer copies; the transplant itself
    // does not, and `geometry_hides_the_sky` covers it everywhere.
    if !downlevel.contains(wgpu::DownlevelFlags::DEPTH_TEXTURE_AND_BUFFER_COPIES) {
        log::warn!("Adapter cannot copy depth to buffers, skipping depth readback");
        return;
    }
    let mut renderer = renderer(&device, &queue);
    let model = assets::procedural_scene(renderer.resources());
    let target = color_target(&device);
    let view = target.create_view(&Default::default());

    // No lights, so no marker writes depth after the transplant
    let inputs = FrameInputs { model: &model, camera: &camera(), lights: &[], width: SIZE, height: SIZE, plain_model: true };
    renderer.render(PipelineVariant::Plain, &inputs, &view).unwrap();

    let gbuffer = read_texture(&device, &queue, renderer.gbuffer_depth_texture(), wgpu::TextureAspect::DepthOnly);
    let display = read_texture(&device, &queue, renderer.display_depth_texture(), wgpu::TextureAspect::DepthOnly);
    assert_eq!(gbuffer, display);

    let covered = gbuffer
        .chunks(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .filter(|&d| d < 1.0)
        .count();
    assert!(covered > 0, "scene rasterized nothing");
}

#[test]
fn geometry_hides_the_sky() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let mut renderer = renderer(&device, &queue);
    let scene = assets::procedural_scene(renderer.resources());
    let empty = Model::new(Vec::new(), Mat4::IDENTITY);
    let target = color_target(&device);
    let view = target.create_view(&Default::default());

    let mut frame = |model: &Model| {
        let inputs = FrameInputs { model, camera: &camera(), lights: &[], width: SIZE, height: SIZE, plain_model: true };
        renderer.render(PipelineVariant::Plain, &inputs, &view).unwrap();
        read_texture(&device, &queue, &target, wgpu::TextureAspect::All)
    };
    let sky_only = frame(&empty);
    let with_scene = frame(&scene);

    // Without transplanted depth the skybox would overdraw every lit pixel
    let hidden = sky_only
        .chunks(4)
        .zip(with_scene.chunks(4))
        .filter(|(a, b)| a != b)
        .count();
    assert!(hidden > 0, "skybox drew over the scene");
    assert!(hidden < (SIZE * SIZE) as usize, "scene covers the whole view");
}

#[test]
fn every_variant_renders_without_validation_errors() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let mut renderer = renderer(&device, &queue);
    let model = assets::procedural_scene(renderer.resources());
    let lights = generate_lights(8, 114514);
    let target = color_target(&device);
    let view = target.create_view(&Default::default());

    for plain_model in [true, false] {
        for variant in PipelineVariant::ALL {
            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let inputs = FrameInputs { model: &model, camera: &camera(), lights: &lights, width: SIZE, height: SIZE, plain_model };
            renderer.render(variant, &inputs, &view).unwrap();
            device.poll(wgpu::Maintain::Wait);
            let error = pollster::block_on(device.pop_error_scope());
            assert!(error.is_none(), "{}: {:?}", variant.label(), error);
        }
    }
    assert_eq!(renderer.frame_count(), 8);
}

#[test]
fn switching_variants_leaves_lights_untouched() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let mut renderer = renderer(&device, &queue);
    let model = assets::procedural_scene(renderer.resources());
    let lights: Vec<LightSource> = generate_lights(8, 114514);
    let before = lights.clone();
    let target = color_target(&device);
    let view = target.create_view(&Default::default());

    for variant in PipelineVariant::ALL.iter().chain(PipelineVariant::ALL.iter().rev()) {
        let inputs = FrameInputs { model: &model, camera: &camera(), lights: &lights, width: SIZE, height: SIZE, plain_model: false };
        renderer.render(*variant, &inputs, &view).unwrap();
    }
    assert_eq!(lights, before);
}

#[test]
fn empty_scene_shows_sky() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let mut renderer = renderer(&device, &queue);
    let model = Model::new(Vec::new(), Mat4::IDENTITY);
    let target = color_target(&device);
    let view = target.create_view(&Default::default());

    let inputs = FrameInputs { model: &model, camera: &camera(), lights: &[], width: SIZE, height: SIZE, plain_model: true };
    renderer.render(PipelineVariant::Ssao, &inputs, &view).unwrap();

    let pixels = read_texture(&device, &queue, &target, wgpu::TextureAspect::All);
    // Lighting writes black background; only the skybox can make it bright
    assert!(pixels.chunks(4).all(|p| p[0] > 0 || p[1] > 0 || p[2] > 0));
}

#[test]
fn viewport_must_match_targets() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let mut renderer = renderer(&device, &queue);
    let model = Model::new(Vec::new(), Mat4::IDENTITY);
    let target = color_target(&device);
    let view = target.create_view(&Default::default());

    renderer.resize(32, 32).unwrap();
    assert_eq!(renderer.size(), (32, 32));
    let inputs = FrameInputs { model: &model, camera: &camera(), lights: &[], width: SIZE, height: SIZE, plain_model: true };
    assert!(matches!(renderer.render(PipelineVariant::Plain, &inputs, &view), Err(Error::Resource(_))));

    assert!(matches!(renderer.resize(0, 32), Err(Error::Config(_))));
    assert_eq!(renderer.size(), (32, 32));
}

#[test]
fn bad_config_fails_construction() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let mut config = RendererConfig::new(SIZE, SIZE, TARGET_FORMAT);
    config.occlusion.kernel_size = 0;
    assert!(matches!(Renderer::new(device, queue, config), Err(Error::Config(_))));
}

#[test]
fn oversized_texture_falls_back_to_a_single_texel() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let resources = ResourceManager::new(device.clone(), queue);
    let width = device.limits().max_texture_dimension_2d + 1;

    let direct = resources.texture_from_rgba8("Too Wide", &vec![0; 4 * width as usize], width, 1, wgpu::TextureFormat::Rgba8Unorm);
    assert!(matches!(direct, Err(Error::Resource(_))));

    let path = std::env::temp_dir().join(format!("penumbra_wide_{}.png", std::process::id()));
    image::RgbaImage::new(width, 1).save(&path).unwrap();
    let texture = assets::load_texture(&resources, &path, [255, 0, 0, 255], wgpu::TextureFormat::Rgba8Unorm);
    let _ = std::fs::remove_file(&path);
    assert_eq!(texture.size, (1, 1));
}

#[test]
fn unusable_skybox_falls_back_to_the_gradient() {
    let Some(Gpu { device, queue, .. }) = gpu() else { return };
    let resources = ResourceManager::new(device, queue);

    let empty: [Vec<u8>; 6] = Default::default();
    assert!(matches!(resources.cubemap_from_faces("Empty", 0, &empty), Err(Error::Resource(_))));

    let missing = std::env::temp_dir().join("penumbra_no_such_skybox");
    let sky = assets::load_skybox(&resources, &missing).unwrap();
    assert_eq!(sky.size, (64, 64));
}
