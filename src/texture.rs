//! Texture decoding and upload.

use crate::error::AssetError;

/// Decoded RGBA8 pixels, row-major, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    /// Decodes any format the `image` crate recognises from its magic bytes.
    pub fn decode(path: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|source| AssetError::Image {
                path: path.to_string(),
                source,
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    /// A single-colour image.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }
}

/// A sampled texture living on the GPU.
#[derive(Debug)]
pub struct GpuTexture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    /// Device-assigned key, unique among live textures.
    pub(crate) id: u32,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    /// Uploads `image` as an sRGB texture. `id` keys material bind groups
    /// built over this texture.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        id: u32,
        label: &str,
        image: &ImageData,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            id,
            width: image.width,
            height: image.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::png_bytes;

    #[test]
    fn decodes_png_to_rgba() {
        let original = ImageData::solid(3, 2, [200, 10, 20, 255]);
        let decoded = ImageData::decode("brick.png", &png_bytes(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn garbage_is_an_image_error() {
        match ImageData::decode("broken.png", b"definitely not a png") {
            Err(AssetError::Image { path, .. }) => assert_eq!(path, "broken.png"),
            other => panic!("expected Image error, got {other:?}"),
        }
    }

    #[test]
    fn solid_fills_every_pixel() {
        let image = ImageData::solid(2, 2, [1, 2, 3, 4]);
        assert_eq!(image.rgba, vec![1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }
}
