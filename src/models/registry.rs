//! Registry of pretrained models that can be loaded by name.
//!
//! Each entry maps a model name (and its aliases) to the ONNX export files
//! hosted on HuggingFace and the cache subdirectory they are stored in.

/// A pretrained model known by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PretrainedModel {
    /// Canonical model name.
    pub name: &'static str,
    /// Alternative names accepted by [`lookup`].
    pub aliases: &'static [&'static str],
    /// Directory under the model cache where files are stored.
    pub cache_dir: &'static str,
    /// Version string reported by the loaded model.
    pub version: &'static str,
    /// `(file name, download URL)` pairs.
    pub files: &'static [(&'static str, &'static str)],
}

impl PretrainedModel {
    /// Returns the download URL for one of this model's files.
    pub fn url_for(&self, file: &str) -> Option<&'static str> {
        self.files
            .iter()
            .find(|(name, _)| *name == file)
            .map(|(_, url)| *url)
    }

    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Model files for musicgen-small (fp16 ONNX export).
const MUSICGEN_SMALL_FILES: &[(&str, &str)] = &[
    (
        "config.json",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small/config.json",
    ),
    (
        "tokenizer.json",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small/tokenizer.json",
    ),
    (
        "text_encoder.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/text_encoder.onnx",
    ),
    (
        "decoder_model.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/decoder_model.onnx",
    ),
    (
        "decoder_with_past_model.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/decoder_with_past_model.onnx",
    ),
    (
        "encodec_decode.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/encodec_decode.onnx",
    ),
];

/// All models that can be loaded by name.
pub const PRETRAINED_MODELS: &[PretrainedModel] = &[PretrainedModel {
    name: "facebook/musicgen-small",
    aliases: &["musicgen-small", "small"],
    cache_dir: "musicgen-small-fp16",
    version: "musicgen-small-fp16-v1",
    files: MUSICGEN_SMALL_FILES,
}];

/// Finds a pretrained model by name or alias, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static PretrainedModel> {
    let name = name.trim();
    PRETRAINED_MODELS.iter().find(|m| m.matches(name))
}

/// Names accepted by [`lookup`], canonical names first.
pub fn known_names() -> Vec<&'static str> {
    PRETRAINED_MODELS.iter().map(|m| m.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loader::REQUIRED_MODEL_FILES;

    #[test]
    fn lookup_by_name_and_alias() {
        let model = lookup("facebook/musicgen-small").unwrap();
        assert_eq!(model.version, "musicgen-small-fp16-v1");
        assert_eq!(lookup("MusicGen-Small"), Some(model));
        assert_eq!(lookup(" small "), Some(model));
        assert!(lookup("facebook/musicgen-huge").is_none());
    }

    #[test]
    fn every_required_file_has_url() {
        for model in PRETRAINED_MODELS {
            for file in REQUIRED_MODEL_FILES {
                assert!(
                    model.url_for(file).is_some(),
                    "{} missing URL for {}",
                    model.name,
                    file
                );
            }
        }
    }

    #[test]
    fn known_names_lists_canonical() {
        assert!(known_names().contains(&"facebook/musicgen-small"));
    }
}
