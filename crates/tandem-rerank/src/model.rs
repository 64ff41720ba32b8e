//! Candle-backed cross-encoder over local model files.
//!
//! Loads an XLM-RoBERTa sequence-classification checkpoint
//! (`tokenizer.json` + `config.json` + `pytorch_model.bin`, the
//! `BAAI/bge-reranker-base` layout) and scores (query, passage) pairs:
//! encoder output at the CLS position, dense/tanh/out_proj head, sigmoid.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cross_encoder::PairScorer;
use crate::device::select_device;

/// Positional limit for one tokenized (query, passage) pair.
const MAX_TOKENS: usize = 512;
/// XLM-RoBERTa pad token id.
const PAD_ID: u32 = 1;

pub struct CrossEncoderModel {
    model: XLMRobertaModel,
    dense: Linear,
    out_proj: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)
        })?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(
            &fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?,
        )?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("reading {}", weights_path.display()))?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);

        let model = XLMRobertaModel::new(&config, vb.pp("roberta"))?;
        let dense = linear(config.hidden_size, config.hidden_size, vb.pp("classifier.dense"))?;
        let out_proj = linear(config.hidden_size, 1, vb.pp("classifier.out_proj"))?;

        info!("cross-encoder loaded from {}", model_dir.display());
        Ok(Self { model, dense, out_proj, tokenizer, device })
    }

    /// Tokenize every (query, passage) pair and pad the batch to one
    /// width, capped at the model's positional limit.
    fn encode_pairs(&self, query: &str, passages: &[String]) -> Result<(Tensor, Tensor, usize)> {
        let mut encodings = Vec::with_capacity(passages.len());
        for passage in passages {
            let enc = self
                .tokenizer
                .encode((query, passage.as_str()), true)
                .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
            encodings.push(enc);
        }

        let width = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(1)
            .clamp(1, MAX_TOKENS);

        let mut ids = Vec::with_capacity(passages.len() * width);
        let mut mask = Vec::with_capacity(passages.len() * width);
        for enc in &encodings {
            let mut row_ids = enc.get_ids().to_vec();
            let mut row_mask = enc.get_attention_mask().to_vec();
            if row_ids.len() > width {
                row_ids.truncate(width);
                row_mask.truncate(width);
            }
            if row_ids.len() < width {
                let pad = width - row_ids.len();
                row_ids.extend(std::iter::repeat(PAD_ID).take(pad));
                row_mask.extend(std::iter::repeat(0).take(pad));
            }
            ids.extend(row_ids);
            mask.extend(row_mask);
        }

        let input_ids = Tensor::from_vec(ids, (passages.len(), width), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (passages.len(), width), &self.device)?;
        Ok((input_ids, attention_mask, width))
    }
}

impl PairScorer for CrossEncoderModel {
    fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(vec![]);
        }
        let (input_ids, attention_mask, width) = self.encode_pairs(query, passages)?;
        let token_type_ids = Tensor::zeros((passages.len(), width), DType::I64, &self.device)?;

        let hidden =
            self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        // the CLS position feeds the classification head
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.dense.forward(&cls)?.tanh()?;
        let logits = self.out_proj.forward(&pooled)?;
        let scores = candle_nn::ops::sigmoid(&logits)?
            .squeeze(1)?
            .to_device(&Device::Cpu)?
            .to_vec1::<f32>()?;

        debug!("cross-encoder scored a batch of {}", scores.len());
        Ok(scores)
    }
}
