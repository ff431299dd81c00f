use std::io::Cursor;

use thiserror::Error;

use crate::utils::{Mesh, Vertex};

/// Uniform scale applied to the loaded model (it is authored tiny).
pub const MODEL_SCALE: f32 = 10.0;

pub const MODEL_MTL_PATH: &str = "assets/player.mtl";
pub const MODEL_OBJ_PATH: &str = "assets/player.obj";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to decode model: {0}")]
    Decode(#[from] tobj::LoadError),
    #[cfg(not(target_arch = "wasm32"))]
    #[error("failed to read asset: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(target_arch = "wasm32")]
    #[error("failed to fetch asset: {0}")]
    Fetch(String),
}

/// Decode an OBJ + MTL pair into a single vertex-colored mesh, colors taken
/// from each material's diffuse term.
pub fn decode_model(obj_bytes: &[u8], mtl_bytes: &[u8]) -> Result<Mesh, AssetError> {
    let (models, materials) = tobj::load_obj_buf(
        &mut Cursor::new(obj_bytes),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_path| tobj::load_mtl_buf(&mut Cursor::new(mtl_bytes)),
    )?;
    let materials = materials?;

    let mut mesh = Mesh::empty();
    for model in &models {
        let m = &model.mesh;
        let color = m
            .material_id
            .and_then(|id| materials.get(id))
            .and_then(|mat| mat.diffuse)
            .map(|d| [d[0], d[1], d[2], 1.0])
            .unwrap_or([1.0, 1.0, 1.0, 1.0]);

        let base = mesh.vertices.len() as u32;
        let vertex_count = m.positions.len() / 3;
        for i in 0..vertex_count {
            let pos = [
                m.positions[i * 3] * MODEL_SCALE,
                m.positions[i * 3 + 1] * MODEL_SCALE,
                m.positions[i * 3 + 2] * MODEL_SCALE,
            ];
            let normal = if m.normals.len() >= (i + 1) * 3 {
                [m.normals[i * 3], m.normals[i * 3 + 1], m.normals[i * 3 + 2]]
            } else {
                [0.0, 1.0, 0.0]
            };
            mesh.vertices.push(Vertex { pos, normal, color });
        }
        mesh.indices.extend(m.indices.iter().map(|&i| base + i));
    }
    Ok(mesh)
}

/// Load the model off the main thread; the frame loop polls the receiver.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_loader(
    mtl_path: String,
    obj_path: String,
) -> std::sync::mpsc::Receiver<Result<Mesh, AssetError>> {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let result = (|| {
            let mtl = std::fs::read(&mtl_path)?;
            let obj = std::fs::read(&obj_path)?;
            decode_model(&obj, &mtl)
        })();
        // Receiver may already be gone on shutdown
        let _ = tx.send(result);
    });
    rx
}

#[cfg(target_arch = "wasm32")]
pub async fn fetch_model(mtl_url: &str, obj_url: &str) -> Result<Mesh, AssetError> {
    let mtl = fetch_bytes(mtl_url).await?;
    let obj = fetch_bytes(obj_url).await?;
    decode_model(&obj, &mtl)
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(url: &str) -> Result<Vec<u8>, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_err = |e: wasm_bindgen::JsValue| AssetError::Fetch(format!("{url}: {e:?}"));

    let window = web_sys::window().ok_or_else(|| AssetError::Fetch("no window".into()))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(fetch_err)?
        .dyn_into::<web_sys::Response>()
        .map_err(fetch_err)?;
    if !response.ok() {
        return Err(AssetError::Fetch(format!(
            "{url}: HTTP {}",
            response.status()
        )));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(fetch_err)?)
        .await
        .map_err(fetch_err)?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJ: &str = "\
mtllib player.mtl
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
usemtl body
f 1//1 2//1 3//1
";
    const MTL: &str = "\
newmtl body
Kd 0.8 0.2 0.1
";

    #[test]
    fn decodes_a_triangle_with_material_color_and_scale() {
        let mesh = decode_model(OBJ.as_bytes(), MTL.as_bytes()).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
        let v = &mesh.vertices[1];
        assert_eq!(v.pos, [MODEL_SCALE, 0.0, 0.0]);
        assert!((v.color[0] - 0.8).abs() < 1e-6);
        assert!((v.color[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn out_of_bounds_face_is_a_decode_error() {
        let obj = "v 0.0 0.0 0.0\nf 1 2 3\n";
        let result = decode_model(obj.as_bytes(), MTL.as_bytes());
        assert!(matches!(result, Err(AssetError::Decode(_))));
    }
}
