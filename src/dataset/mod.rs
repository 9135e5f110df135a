// Dataset partitioning
// Splits a workspace of WAV/MIDI pairs into training and inference sets

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory layout of an audio workspace. Input dirs (`audio/`,
/// `midi/`) are expected to exist; output dirs are created on demand.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    pub audio_dir: PathBuf,
    pub midi_dir: PathBuf,
    pub raw_json_dir: PathBuf,
    pub quantized_json_dir: PathBuf,
    pub predictions_dir: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        WorkspaceLayout {
            audio_dir: root.join("audio"),
            midi_dir: root.join("midi"),
            raw_json_dir: root.join("drum_json"),
            quantized_json_dir: root.join("quantized_json"),
            predictions_dir: root.join("predictions_json"),
            root,
        }
    }

    /// Create the output directories.
    pub fn ensure_output_dirs(&self) -> Result<(), DatasetError> {
        fs::create_dir_all(&self.raw_json_dir)?;
        fs::create_dir_all(&self.quantized_json_dir)?;
        fs::create_dir_all(&self.predictions_dir)?;
        Ok(())
    }
}

/// Which WAV files have a usable MIDI counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    pub generated_at: String,

    /// Total WAV files found in the audio directory
    pub total_wavs: usize,

    /// WAVs paired with a MIDI file that parses (training-eligible)
    pub trainable: Vec<String>,

    /// WAVs with no usable MIDI counterpart (inference-only)
    pub inference_only: Vec<String>,

    /// MIDI files that exist but fail to parse as SMF
    pub invalid_midi: Vec<String>,
}

/// Pair WAV files with MIDI files by stem and partition them.
///
/// A WAV whose MIDI counterpart fails SMF parsing is demoted to the
/// inference-only set and the MIDI file is reported separately. Lists
/// come back sorted for stable output.
pub fn partition_workspace(layout: &WorkspaceLayout) -> Result<PartitionReport, DatasetError> {
    layout.ensure_output_dirs()?;

    let wavs = files_with_extension(&layout.audio_dir, "wav")?;
    let midis = files_with_extension(&layout.midi_dir, "mid")?;

    let midi_by_stem: BTreeMap<String, PathBuf> = midis
        .into_iter()
        .filter_map(|p| stem_of(&p).map(|s| (s, p)))
        .collect();

    let mut trainable = Vec::new();
    let mut inference_only = Vec::new();
    let mut invalid_midi = Vec::new();

    for wav in &wavs {
        let Some(stem) = stem_of(wav) else {
            continue;
        };
        let name = file_name_of(wav);

        match midi_by_stem.get(&stem) {
            Some(midi_path) => {
                if midi_parses(midi_path) {
                    trainable.push(name);
                } else {
                    invalid_midi.push(file_name_of(midi_path));
                    inference_only.push(name);
                }
            }
            None => inference_only.push(name),
        }
    }

    trainable.sort();
    inference_only.sort();
    invalid_midi.sort();

    log::info!(
        "workspace {}: {} wavs, {} trainable, {} inference-only, {} invalid midi",
        layout.root.display(),
        wavs.len(),
        trainable.len(),
        inference_only.len(),
        invalid_midi.len()
    );

    Ok(PartitionReport {
        generated_at: Utc::now().to_rfc3339(),
        total_wavs: wavs.len(),
        trainable,
        inference_only,
        invalid_midi,
    })
}

fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn midi_parses(path: &Path) -> bool {
    match fs::read(path) {
        Ok(bytes) => midly::Smf::parse(&bytes).is_ok(),
        Err(e) => {
            log::warn!("failed to read {}: {}", path.display(), e);
            false
        }
    }
}
