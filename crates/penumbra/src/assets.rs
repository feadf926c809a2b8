//! Model, texture and skybox loading
//!
//! Texture and skybox failures are never fatal: they are logged and replaced
//! with fallbacks so a missing file still produces a frame.

use crate::mesh::{GpuMesh, MeshData, Model, ModelMesh, Vertex};
use crate::reference::Environment;
use crate::resources::{GpuTexture, ResourceManager};
use crate::{Error, Result};
use glam::{Mat4, Vec3};
use std::path::Path;
use std::sync::Arc;

/// Cubemap face file stems, in +X, -X, +Y, -Y, +Z, -Z layer order
pub const SKYBOX_FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

const FACE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Edge length of the generated fallback sky
const GRADIENT_SKY_SIZE: u32 = 64;

/// Transform applied to loaded models: rotate -90 degrees about X, then scale by 0.1
pub fn default_model_transform() -> Mat4 {
    Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2) * Mat4::from_scale(Vec3::splat(0.1))
}

/// Load a Wavefront OBJ model with its diffuse and specular maps
pub fn load_obj(resources: &ResourceManager, path: &Path) -> Result<Model> {
    log::info!("Loading model {}", path.display());

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| Error::Asset(format!("{}: {}", path.display(), e)))?;

    if models.is_empty() {
        return Err(Error::Asset(format!("{}: no meshes", path.display())));
    }

    let materials = materials.unwrap_or_else(|e| {
        log::error!("Failed to load materials for {}: {}", path.display(), e);
        Vec::new()
    });

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let bind_groups: Vec<Arc<wgpu::BindGroup>> = materials
        .iter()
        .map(|material| load_material(resources, base_dir, material))
        .collect();
    let default_material = resources.default_material();

    let meshes = models
        .iter()
        .map(|model| {
            let data = mesh_data_from_obj(&model.mesh);
            let material = model
                .mesh
                .material_id
                .and_then(|id| bind_groups.get(id).cloned())
                .unwrap_or_else(|| default_material.clone());
            log::debug!(
                "  mesh '{}': {} vertices, {} indices",
                model.name,
                data.vertices.len(),
                data.indices.len()
            );
            ModelMesh {
                mesh: GpuMesh::from_data(resources.device(), &data),
                material,
            }
        })
        .collect();

    Ok(Model::new(meshes, default_model_transform()))
}

fn load_material(resources: &ResourceManager, base_dir: &Path, material: &tobj::Material) -> Arc<wgpu::BindGroup> {
    let albedo = match &material.diffuse_texture {
        Some(file) => load_texture(
            resources,
            &base_dir.join(file),
            [255, 255, 255, 255],
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ),
        None => resources.solid_texture("Albedo Fallback", [255, 255, 255, 255], wgpu::TextureFormat::Rgba8UnormSrgb),
    };
    let specular = match &material.specular_texture {
        Some(file) => load_texture(resources, &base_dir.join(file), [0, 0, 0, 255], wgpu::TextureFormat::Rgba8Unorm),
        None => resources.solid_texture("Specular Fallback", [0, 0, 0, 255], wgpu::TextureFormat::Rgba8Unorm),
    };
    resources.create_material(&material.name, &albedo.view, &specular.view)
}

/// Load an image file as a texture, or a 1x1 `fallback` texel on failure
pub fn load_texture(
    resources: &ResourceManager,
    path: &Path,
    fallback: [u8; 4],
    format: wgpu::TextureFormat,
) -> GpuTexture {
    let uploaded = image::open(path)
        .map_err(|e| Error::Asset(e.to_string()))
        .and_then(|img| {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            resources.texture_from_rgba8(&path.display().to_string(), &rgba, width, height, format)
        });
    uploaded.unwrap_or_else(|e| {
        log::error!("Texture failed to load at path {}: {}", path.display(), e);
        resources.solid_texture("Texture Fallback", fallback, format)
    })
}

/// CPU vertices for one OBJ mesh. Missing normals are rebuilt from the
/// triangles; texture v is flipped to top-left origin.
pub fn mesh_data_from_obj(mesh: &tobj::Mesh) -> MeshData {
    let vertex_count = mesh.positions.len() / 3;
    let normals = if mesh.normals.len() == mesh.positions.len() {
        mesh.normals.chunks(3).map(|n| Vec3::new(n[0], n[1], n[2])).collect()
    } else {
        smooth_normals(&mesh.positions, &mesh.indices)
    };

    let vertices = (0..vertex_count)
        .map(|i| {
            let p = &mesh.positions[i * 3..i * 3 + 3];
            let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            Vertex::new([p[0], p[1], p[2]], normals[i].to_array(), uv)
        })
        .collect();

    MeshData {
        vertices,
        indices: mesh.indices.clone(),
    }
}

/// Area-weighted vertex normals
fn smooth_normals(positions: &[f32], indices: &[u32]) -> Vec<Vec3> {
    let point = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(positions[i], positions[i + 1], positions[i + 2])
    };
    let mut normals = vec![Vec3::ZERO; positions.len() / 3];
    for tri in indices.chunks_exact(3) {
        let face = (point(tri[1]) - point(tri[0])).cross(point(tri[2]) - point(tri[0]));
        for &i in tri {
            normals[i as usize] += face;
        }
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

/// Floor, back wall and a few boxes; used when no model is given
pub fn procedural_scene(resources: &ResourceManager) -> Model {
    let material = resources.default_material();
    let parts = [
        MeshData::plane([0.0, -1.0, 0.0], 6.0),
        MeshData::quad([0.0, 2.0, -4.0], 3.0),
        MeshData::cube([0.0, -0.5, 0.0], 0.5),
        MeshData::cube([-2.0, -0.25, -1.5], 0.75),
        MeshData::cube([2.2, -0.6, 1.0], 0.4),
        MeshData::cube([1.5, -0.3, -2.5], 0.7),
    ];
    let meshes = parts
        .iter()
        .map(|data| ModelMesh {
            mesh: GpuMesh::from_data(resources.device(), data),
            material: material.clone(),
        })
        .collect();
    Model::new(meshes, Mat4::IDENTITY)
}

/// Load `right, left, top, bottom, front, back` faces from `dir`.
/// Any failure is logged and the gradient sky is returned instead.
pub fn load_skybox(resources: &ResourceManager, dir: &Path) -> Result<GpuTexture> {
    match read_faces(dir) {
        Ok((size, faces)) => match resources.cubemap_from_faces("Skybox", size, &faces) {
            Ok(cubemap) => return Ok(cubemap),
            Err(e) => log::error!("Cubemap upload failed for {}: {}", dir.display(), e),
        },
        Err(e) => log::error!("Cubemap texture failed to load at path {}: {}", dir.display(), e),
    }
    gradient_skybox(resources)
}

fn read_faces(dir: &Path) -> Result<(u32, [Vec<u8>; 6])> {
    let mut faces: [Vec<u8>; 6] = Default::default();
    let mut size = None;
    for (face, stem) in SKYBOX_FACES.iter().enumerate() {
        let path = FACE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.exists())
            .ok_or_else(|| Error::Asset(format!("missing skybox face '{}'", stem)))?;
        let img = image::open(&path)
            .map_err(|e| Error::Asset(format!("{}: {}", path.display(), e)))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        if w != h || size.is_some_and(|s| s != w) {
            return Err(Error::Asset(format!(
                "{}: faces must be square and equally sized, got {}x{}",
                path.display(), w, h
            )));
        }
        size = Some(w);
        faces[face] = img.into_raw();
    }
    let size = size.ok_or_else(|| Error::Asset("no skybox faces".into()))?;
    Ok((size, faces))
}

/// Vertical gradient sky. Also usable as a CPU `Environment`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSky {
    pub zenith: Vec3,
    pub horizon: Vec3,
    pub ground: Vec3,
}

impl Default for GradientSky {
    fn default() -> Self {
        Self {
            zenith: Vec3::new(0.25, 0.45, 0.85),
            horizon: Vec3::new(0.8, 0.85, 0.9),
            ground: Vec3::new(0.3, 0.28, 0.25),
        }
    }
}

impl Environment for GradientSky {
    fn radiance(&self, direction: Vec3) -> Vec3 {
        let y = direction.normalize_or_zero().y;
        if y >= 0.0 {
            self.horizon.lerp(self.zenith, y)
        } else {
            self.horizon.lerp(self.ground, (-y * 4.0).min(1.0))
        }
    }
}

/// Direction through texel center (x, y) of cube face `face`
pub fn cube_face_direction(face: usize, x: u32, y: u32, size: u32) -> Vec3 {
    let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
    let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// RGBA8 faces of `sky` rendered at `size` x `size`
pub fn environment_faces(sky: &dyn Environment, size: u32) -> [Vec<u8>; 6] {
    std::array::from_fn(|face| {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let c = sky.radiance(cube_face_direction(face, x, y, size));
                let c = (c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
                data.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
            }
        }
        data
    })
}

pub fn gradient_skybox(resources: &ResourceManager) -> Result<GpuTexture> {
    let faces = environment_faces(&GradientSky::default(), GRADIENT_SKY_SIZE);
    resources.cubemap_from_faces("Gradient Sky", GRADIENT_SKY_SIZE, &faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<tobj::Model> {
        let (models, _) = tobj::load_obj_buf(
            &mut std::io::Cursor::new(source),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok(Default::default()),
        )
        .unwrap();
        models
    }

    #[test]
    fn missing_normals_are_rebuilt() {
        let models = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n");
        let data = mesh_data_from_obj(&models[0].mesh);
        assert_eq!(data.vertices.len(), 3);
        assert_eq!(data.indices.len(), 3);
        for v in &data.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn texture_v_is_flipped() {
        let models = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0.25\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n");
        let data = mesh_data_from_obj(&models[0].mesh);
        let first = data
            .vertices
            .iter()
            .find(|v| v.position == [0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(first.tex_coords, [0.0, 0.75]);
    }

    #[test]
    fn quads_are_triangulated() {
        let models = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");
        let data = mesh_data_from_obj(&models[0].mesh);
        assert_eq!(data.indices.len(), 6);
    }

    #[test]
    fn face_directions_point_along_their_axis() {
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in axes.iter().enumerate() {
            let center = cube_face_direction(face, 1, 1, 3);
            assert!(center.dot(*axis) > 0.999, "face {}", face);
        }
    }

    #[test]
    fn gradient_sky_top_face_is_bluer_than_bottom() {
        let sky = GradientSky::default();
        let faces = environment_faces(&sky, 4);
        assert_eq!(faces.iter().map(Vec::len).collect::<Vec<_>>(), vec![64; 6]);
        let top_blue = faces[2][2];
        let bottom_blue = faces[3][2];
        assert!(top_blue > bottom_blue);
        assert!((sky.radiance(Vec3::Y) - sky.zenith).length() < 1e-6);
        assert_eq!(sky.radiance(Vec3::X), sky.horizon);
    }

    #[test]
    fn loaded_models_are_stood_up_and_shrunk() {
        let m = default_model_transform();
        let up = m.transform_vector3(Vec3::Z);
        assert!((up - Vec3::Y * 0.1).length() < 1e-6);
    }
}
