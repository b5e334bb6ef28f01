//! STL loading, ASCII and binary, reduced to the vertex cloud the analysis
//! works on. Faces are not kept. Vertices shared by several triangles are
//! merged, so each distinct position appears once, in first-seen order.
use anyhow::{bail, Context};
use nalgebra::Point3;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::processing::validate_cloud;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Loads an STL file and rejects meshes with fewer than three usable
/// vertices.
pub fn load_stl_vertices<P: AsRef<Path>>(path: P, name: &str) -> anyhow::Result<Vec<Point3<f64>>> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read STL file {}", path.display()))?;
    let points = parse_stl_bytes(&bytes)
        .with_context(|| format!("failed to parse STL file {}", path.display()))?;
    validate_cloud(name, &points)?;
    Ok(points)
}

/// Parses an in-memory STL, picking ASCII or binary from the content, and
/// merges duplicate vertices.
pub fn parse_stl_bytes(bytes: &[u8]) -> anyhow::Result<Vec<Point3<f64>>> {
    if bytes.len() < 6 {
        bail!("file too small to be an STL ({} bytes)", bytes.len());
    }
    // binary files may also start with "solid", trust the size check first
    let soup = if binary_size_matches(bytes) {
        parse_binary(bytes)?
    } else {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(HEADER_SIZE)]);
        if head.trim_start().starts_with("solid") {
            parse_ascii(bytes)?
        } else {
            parse_binary(bytes)?
        }
    };
    Ok(merge_duplicate_vertices(soup))
}

/// Keeps the first occurrence of every exact vertex position.
pub fn merge_duplicate_vertices(points: Vec<Point3<f64>>) -> Vec<Point3<f64>> {
    let mut seen = HashSet::with_capacity(points.len());
    points.into_iter().filter(|p| seen.insert(vertex_key(p))).collect()
}

fn vertex_key(p: &Point3<f64>) -> [u64; 3] {
    // adding 0.0 folds -0.0 into 0.0
    [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits())
}

fn binary_size_matches(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_SIZE + 4 {
        return false;
    }
    let count = triangle_count(bytes) as usize;
    bytes.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE
}

fn triangle_count(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([
        bytes[HEADER_SIZE],
        bytes[HEADER_SIZE + 1],
        bytes[HEADER_SIZE + 2],
        bytes[HEADER_SIZE + 3],
    ])
}

fn parse_binary(bytes: &[u8]) -> anyhow::Result<Vec<Point3<f64>>> {
    if bytes.len() < HEADER_SIZE + 4 {
        bail!(
            "binary STL header needs {} bytes, got {}",
            HEADER_SIZE + 4,
            bytes.len()
        );
    }
    let count = triangle_count(bytes) as usize;
    let body = &bytes[HEADER_SIZE + 4..];
    if body.len() < count * TRIANGLE_SIZE {
        bail!(
            "binary STL declares {} triangles but only holds {}",
            count,
            body.len() / TRIANGLE_SIZE
        );
    }

    let mut points = Vec::with_capacity(count * 3);
    for triangle in body.chunks_exact(TRIANGLE_SIZE).take(count) {
        // skip the 12 byte normal, the 2 byte attribute trails the vertices
        for v in 0..3 {
            let start = 12 + v * 12;
            points.push(read_vertex(&triangle[start..start + 12]));
        }
    }
    Ok(points)
}

fn read_vertex(buf: &[u8]) -> Point3<f64> {
    let x = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let y = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let z = f32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    Point3::new(f64::from(x), f64::from(y), f64::from(z))
}

fn parse_ascii(bytes: &[u8]) -> anyhow::Result<Vec<Point3<f64>>> {
    let text = String::from_utf8_lossy(bytes);
    let mut points = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some(keyword) if keyword.eq_ignore_ascii_case("vertex") => {
                let coords: Vec<&str> = parts.collect();
                if coords.len() < 3 {
                    bail!("line {}: vertex needs three coordinates", line_no + 1);
                }
                let parse = |s: &str| -> anyhow::Result<f64> {
                    s.parse::<f64>()
                        .with_context(|| format!("line {}: bad coordinate {:?}", line_no + 1, s))
                };
                points.push(Point3::new(parse(coords[0])?, parse(coords[1])?, parse(coords[2])?));
            }
            Some(keyword) if keyword.eq_ignore_ascii_case("endsolid") => break,
            _ => {}
        }
    }
    Ok(points)
}

/// Renders a vertex list as an ASCII STL, one facet per consecutive triple.
/// Trailing vertices that do not fill a triangle are dropped.
pub fn points_to_ascii_stl(name: &str, points: &[Point3<f64>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "solid {}", name);
    for tri in points.chunks_exact(3) {
        let _ = writeln!(out, "  facet normal 0 0 0");
        let _ = writeln!(out, "    outer loop");
        for p in tri {
            let _ = writeln!(out, "      vertex {} {} {}", p.x, p.y, p.z);
        }
        let _ = writeln!(out, "    endloop");
        let _ = writeln!(out, "  endfacet");
    }
    let _ = writeln!(out, "endsolid {}", name);
    out
}

#[cfg(test)]
mod stl_tests {
    use super::*;
    use crate::processing::laterality::{detect_foot_side, FootSide};
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn binary_stl(triangles: &[[[f32; 3]; 3]], header: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[..header.len()].copy_from_slice(header);
        bytes.extend((triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            bytes.extend([0u8; 12]);
            for v in tri {
                for c in v {
                    bytes.extend(c.to_le_bytes());
                }
            }
            bytes.extend([0u8; 2]);
        }
        bytes
    }

    #[test]
    fn test_parse_ascii() {
        let text = "solid part\n facet normal 0 0 1\n  outer loop\n   vertex 0 0 0\n   vertex 1.5 0 0\n   vertex 0 2 -3e-1\n  endloop\n endfacet\nendsolid part\n";
        let points = parse_stl_bytes(text.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[1].x, 1.5);
        assert_relative_eq!(points[2].z, -0.3);
    }

    #[test]
    fn test_parse_binary_starting_with_solid() {
        let tris = [
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 1.0, 1.0], [2.0, 1.0, 1.0], [1.0, 2.0, 1.5]],
        ];
        let bytes = binary_stl(&tris, b"solid but actually binary");
        let points = parse_stl_bytes(&bytes).unwrap();
        assert_eq!(points.len(), 6);
        assert_relative_eq!(points[5].z, 1.5);
    }

    #[test]
    fn test_truncated_binary_is_rejected() {
        let tris = [[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]];
        let mut bytes = binary_stl(&tris, b"binary");
        bytes.truncate(bytes.len() - 10);
        assert!(parse_stl_bytes(&bytes).is_err());
    }

    #[test]
    fn test_bad_ascii_coordinate() {
        let text = "solid x\nvertex 0 zero 0\nendsolid x\n";
        let err = parse_stl_bytes(text.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_ascii_writer_round_trips() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.25, 0.0, 0.0),
            Point3::new(0.0, -2.0, 7.5),
        ];
        let text = points_to_ascii_stl("screw", &points);
        assert_eq!(parse_stl_bytes(text.as_bytes()).unwrap(), points);
    }

    #[test]
    fn test_shared_vertices_are_merged_in_first_seen_order() {
        let text = "solid quad\n\
            vertex 0 0 0\nvertex 1 0 0\nvertex 1 1 0\n\
            vertex -0 0 0\nvertex 1 1 0\nvertex 0 1 0\n\
            endsolid quad\n";
        let points = parse_stl_bytes(text.as_bytes()).unwrap();
        assert_eq!(
            points,
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_fan_mesh_laterality_uses_unique_vertices() {
        // 20 triangles around a hub at x = 10, rim on the x = 0 plane
        let rim: Vec<[f32; 3]> = (0..=20)
            .map(|i| {
                let theta = std::f32::consts::PI * i as f32 / 20.0;
                [0.0, 5.0 * theta.cos(), 5.0 * theta.sin()]
            })
            .collect();
        let hub = [10.0f32, 0.0, 0.0];
        let tris: Vec<[[f32; 3]; 3]> = rim.windows(2).map(|w| [hub, w[0], w[1]]).collect();
        let medial = parse_stl_bytes(&binary_stl(&tris, b"fan")).unwrap();
        assert_eq!(medial.len(), 22);

        let lateral = vec![
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 1.0),
        ];
        // unmerged, the hub would pull the medial mean to x = 10/3
        assert_eq!(detect_foot_side(&medial, &lateral).unwrap(), FootSide::Right);
    }

    #[test]
    fn test_load_rejects_meshes_below_three_vertices() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"solid empty\nendsolid empty\n").unwrap();
        let err = load_stl_vertices(file.path(), "screw").unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }
}
