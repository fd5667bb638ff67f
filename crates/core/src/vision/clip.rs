use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use hf_hub::api::tokio::Api;
use hf_hub::{Repo, RepoType};
use image::imageops::FilterType;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{ImageClassifier, label_prompt};
use crate::{Result, ScopeError};

pub const CLIP_MODEL_ID: &str = "openai/clip-vit-base-patch32";
/// Hub revision that ships `model.safetensors`.
pub const CLIP_MODEL_REVISION: &str = "refs/pr/15";

const PAD_TOKEN: &str = "<|endoftext|>";

/// CLIP ViT-B/32 zero-shot classifier running on the CPU.
pub struct ClipClassifier {
    model: ClipModel,
    tokenizer: Tokenizer,
    device: Device,
    image_size: usize,
}

impl ClipClassifier {
    /// Downloads (or reuses the cached) weights and tokenizer from the Hugging Face hub.
    pub async fn from_hub() -> Result<Self> {
        let api = Api::new().map_err(|e| ScopeError::Vision(e.to_string()))?;
        let repo = api.repo(Repo::with_revision(
            CLIP_MODEL_ID.to_string(),
            RepoType::Model,
            CLIP_MODEL_REVISION.to_string(),
        ));

        info!(model = CLIP_MODEL_ID, "fetching CLIP weights");
        let weights = repo
            .get("model.safetensors")
            .await
            .map_err(|e| ScopeError::Vision(e.to_string()))?;
        let tokenizer = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| ScopeError::Vision(e.to_string()))?;

        Self::from_files(&weights, &tokenizer)
    }

    /// Loads CLIP from local safetensors weights and a `tokenizer.json`.
    pub fn from_files(weights: &Path, tokenizer: &Path) -> Result<Self> {
        let device = Device::Cpu;
        let config = ClipConfig::vit_base_patch32();

        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = ClipModel::new(vb, &config)?;
        let tokenizer = Tokenizer::from_file(tokenizer).map_err(|e| ScopeError::Vision(e.to_string()))?;

        Ok(Self { model, tokenizer, device, image_size: config.image_size })
    }

    /// Tokenizes the label prompts, right-padded to a common length.
    fn tokenize_labels(&self, labels: &[String]) -> Result<Tensor> {
        let pad_id = *self
            .tokenizer
            .get_vocab(true)
            .get(PAD_TOKEN)
            .ok_or_else(|| ScopeError::Vision(format!("tokenizer has no {} token", PAD_TOKEN)))?;

        let mut tokens: Vec<Vec<u32>> = Vec::with_capacity(labels.len());
        for label in labels {
            let encoding = self
                .tokenizer
                .encode(label_prompt(label), true)
                .map_err(|e| ScopeError::Vision(e.to_string()))?;
            tokens.push(encoding.get_ids().to_vec());
        }

        let max_len = tokens.iter().map(Vec::len).max().unwrap_or(0);
        for ids in tokens.iter_mut() {
            ids.resize(max_len, pad_id);
        }

        Ok(Tensor::new(tokens, &self.device)?)
    }
}

impl ImageClassifier for ClipClassifier {
    fn label_probabilities(&self, image: &[u8], labels: &[String]) -> Result<Vec<f32>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        let pixels = load_image_tensor(image, self.image_size)?
            .to_device(&self.device)?
            .unsqueeze(0)?;
        let input_ids = self.tokenize_labels(labels)?;

        let (_logits_per_text, logits_per_image) = self.model.forward(&pixels, &input_ids)?;
        let probabilities = candle_nn::ops::softmax(&logits_per_image, 1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        debug!(labels = labels.len(), "classified image");
        Ok(probabilities)
    }
}

/// Per-channel RGB mean of the CLIP training images.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
/// Per-channel RGB standard deviation of the CLIP training images.
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

/// Decodes an image into a normalized `(3, size, size)` tensor.
///
/// The shorter side is resized to `size` with a bicubic filter and the centre
/// is cropped, then each channel becomes `(x / 255 - mean) / std`.
pub fn load_image_tensor(bytes: &[u8], image_size: usize) -> Result<Tensor> {
    let img = image::load_from_memory(bytes)?;
    let side = image_size as u32;
    let rgb = img.resize_to_fill(side, side, FilterType::CatmullRom).to_rgb8().into_raw();

    let mean = Tensor::new(&CLIP_MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&CLIP_STD, &Device::Cpu)?.reshape((3, 1, 1))?;

    let tensor = Tensor::from_vec(rgb, (image_size, image_size, 3), &Device::Cpu)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(1. / 255., 0.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?;

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn black_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_image_tensor_shape_and_scale() {
        let tensor = load_image_tensor(&black_png(40, 20), 224).unwrap();
        assert_eq!(tensor.dims(), &[3, 224, 224]);

        let channels = tensor.to_vec3::<f32>().unwrap();
        for (c, plane) in channels.iter().enumerate() {
            let expected = -CLIP_MEAN[c] / CLIP_STD[c];
            assert!(plane.iter().flatten().all(|v| (v - expected).abs() < 1e-5));
        }
        assert!((channels[0][0][0] + 1.792).abs() < 1e-3);
    }

    #[test]
    fn test_white_pixels_normalize_per_channel() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();

        let channels = load_image_tensor(&bytes, 16).unwrap().to_vec3::<f32>().unwrap();
        for (c, plane) in channels.iter().enumerate() {
            let expected = (1.0 - CLIP_MEAN[c]) / CLIP_STD[c];
            assert!((plane[5][5] - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_undecodable_image() {
        let result = load_image_tensor(b"definitely not an image", 224);
        assert!(matches!(result, Err(ScopeError::Image(_))));
    }
}
