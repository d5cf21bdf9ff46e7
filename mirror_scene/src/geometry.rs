//! CPU-side meshes: OBJ import through `tobj` and the procedural floor quad.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle list with exactly one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("opening mesh {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing OBJ {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: tobj::LoadError,
    },
    #[error("mesh {path} contains no triangles")]
    Empty { path: String },
}

pub fn load_mesh(path: &Path) -> Result<MeshData, MeshError> {
    let label = path.display().to_string();
    let file = File::open(path).map_err(|source| MeshError::Io {
        path: label.clone(),
        source,
    })?;
    parse_obj(&mut BufReader::new(file), &label)
}

/// Parse OBJ text into a single merged mesh. Material libraries are ignored;
/// missing normals are rebuilt from face geometry.
pub fn parse_obj<R: BufRead>(reader: &mut R, label: &str) -> Result<MeshData, MeshError> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) =
        tobj::load_obj_buf(reader, &options, |_| Err(tobj::LoadError::OpenFileFailed)).map_err(
            |source| MeshError::Parse {
                path: label.to_string(),
                source,
            },
        )?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let base = vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        let normals = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        } else {
            face_normals(&mesh.positions, &mesh.indices)
        };
        for idx in 0..count {
            let uv = if mesh.texcoords.len() >= (idx + 1) * 2 {
                [mesh.texcoords[idx * 2], mesh.texcoords[idx * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            vertices.push(MeshVertex {
                position: [
                    mesh.positions[idx * 3],
                    mesh.positions[idx * 3 + 1],
                    mesh.positions[idx * 3 + 2],
                ],
                normal: normals[idx],
                uv,
            });
        }
        indices.extend(mesh.indices.iter().map(|index| base + index));
    }

    if indices.len() < 3 {
        return Err(MeshError::Empty {
            path: label.to_string(),
        });
    }

    let name = models
        .first()
        .map(|model| model.name.clone())
        .filter(|name| !name.is_empty() && name != "unnamed_object")
        .unwrap_or_else(|| label.to_string());

    Ok(MeshData {
        name,
        vertices,
        indices,
    })
}

/// Area-weighted vertex normals accumulated from each triangle.
fn face_normals(positions: &[f32], indices: &[u32]) -> Vec<[f32; 3]> {
    let point = |i: u32| {
        let i = i as usize * 3;
        Vec3::new(positions[i], positions[i + 1], positions[i + 2])
    };
    let mut sums = vec![Vec3::ZERO; positions.len() / 3];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (point(tri[0]), point(tri[1]), point(tri[2]));
        let normal = (b - a).cross(c - a);
        for &i in tri {
            sums[i as usize] += normal;
        }
    }
    sums.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

/// Quad in the XY plane centered on the origin, facing +Z with
/// counter-clockwise winding and UVs spanning `[0, 1]`.
pub fn make_quad(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let corner = |x: f32, y: f32, u: f32, v: f32| MeshVertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [u, v],
    };
    MeshData {
        name: "floor".to_string(),
        vertices: vec![
            corner(-hw, -hh, 0.0, 0.0),
            corner(hw, -hh, 1.0, 0.0),
            corner(hw, hh, 1.0, 1.0),
            corner(-hw, hh, 0.0, 1.0),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const TETRAHEDRON: &str = "\
o tetra
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 3 2
f 1 2 4
f 1 4 3
f 2 3 4
";

    #[test]
    fn parses_faces_and_rebuilds_normals() {
        let mesh = parse_obj(&mut Cursor::new(TETRAHEDRON), "tetra.obj").expect("parse");
        assert_eq!(mesh.name, "tetra");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        for vertex in &mesh.vertices {
            let length = Vec3::from(vertex.normal).length();
            assert!((length - 1.0).abs() < 1e-4);
        }
        // The origin corner only touches the three faces lying on the
        // coordinate planes, whose outward normals point along negative axes.
        let origin = Vec3::from(mesh.vertices[0].normal);
        assert!(origin.x < 0.0 && origin.y < 0.0 && origin.z < 0.0);
    }

    #[test]
    fn keeps_authored_normals() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
";
        let mesh = parse_obj(&mut Cursor::new(source), "tri.obj").expect("parse");
        assert_eq!(mesh.name, "tri.obj");
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn empty_obj_is_rejected() {
        let err = parse_obj(&mut Cursor::new("# nothing here\n"), "empty.obj")
            .expect_err("no triangles");
        assert!(matches!(err, MeshError::Empty { .. }));
        assert!(err.to_string().contains("empty.obj"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let missing = temp.path().join("absent.obj");
        let err = load_mesh(&missing).expect_err("missing file");
        assert!(matches!(err, MeshError::Io { .. }));
        assert!(err.to_string().contains("absent.obj"));
    }

    #[test]
    fn loads_from_disk() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("tetra.obj");
        File::create(&path)?.write_all(TETRAHEDRON.as_bytes())?;
        let mesh = load_mesh(&path)?;
        assert_eq!(mesh.triangle_count(), 4);
        let (min, max) = mesh.bounds().expect("bounds");
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::ONE);
        Ok(())
    }

    #[test]
    fn quad_faces_positive_z_counter_clockwise() {
        let quad = make_quad(4.0, 4.0);
        assert_eq!(quad.triangle_count(), 2);
        let (min, max) = quad.bounds().expect("bounds");
        assert_eq!(min, Vec3::new(-2.0, -2.0, 0.0));
        assert_eq!(max, Vec3::new(2.0, 2.0, 0.0));
        for tri in quad.indices.chunks_exact(3) {
            let p = |i: u32| Vec3::from(quad.vertices[i as usize].position);
            let normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(normal.z > 0.0);
        }
    }
}
