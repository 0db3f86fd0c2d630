//! Silero VAD as a [`SpeechClassifier`].
//!
//! Wraps the Silero VAD ONNX model published at
//! <https://github.com/snakers4/silero-vad>. Both the v3/v4 LSTM interface
//! (`h`/`c` tensors) and the v5 GRU interface (single `state` tensor) are
//! recognised by input name.
//!
//! The stream is scored in 512-sample windows (32 ms at 16 kHz); the last
//! window is zero-padded. Probabilities are turned into segments by
//! [`segments_from_probabilities`].

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Array3};
use ort::session::builder::SessionBuilder;
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use tracing::{info, warn};

use super::classifier::{
    segments_from_probabilities, SegmentationParams, SpeechClassifier, SpeechSegment,
};
use crate::{
    audio::CLASSIFIER_SAMPLE_RATE,
    error::{HushtrimError, Result},
};

/// Samples per model call.
const WINDOW: usize = 512;
/// v3/v4 LSTM: 2 layers × 1 batch × 64 units (each of h and c).
const LSTM_SIZE: usize = 128;
/// v5 GRU: 2 layers × 1 batch × 128 units.
const GRU_STATE_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecurrentState {
    Lstm {
        h_in: String,
        c_in: String,
        h_out: String,
        c_out: String,
    },
    Gru {
        state_in: String,
        state_out: Option<String>,
    },
    Stateless,
}

/// Neural speech classifier backed by the Silero VAD ONNX model.
pub struct SileroClassifier {
    session: Session,
    input_name: String,
    sr_name: Option<String>,
    output_name: String,
    recurrent: RecurrentState,
    h: Vec<f32>,
    c: Vec<f32>,
    state: Vec<f32>,
    params: SegmentationParams,
}

impl SileroClassifier {
    /// Load the model at `path`; windows scoring `>= threshold` count as speech.
    ///
    /// # Errors
    /// `ModelNotFound` if the file is missing, `Classifier` if ONNX Runtime
    /// cannot build a session from it.
    pub fn new(path: impl AsRef<Path>, threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HushtrimError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let session = SessionBuilder::new()
            .map_err(onnx_err)?
            .commit_from_file(path)
            .map_err(onnx_err)?;

        let inputs: Vec<String> = session
            .inputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();
        let outputs: Vec<String> = session
            .outputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();

        let input_name = resolve_name(&inputs, &["input", "audio", "x"])
            .or_else(|| inputs.first().cloned())
            .ok_or_else(|| HushtrimError::Classifier("Silero model has no inputs".into()))?;
        let output_name = resolve_name(&outputs, &["output", "speech_prob", "prob"])
            .or_else(|| outputs.first().cloned())
            .ok_or_else(|| HushtrimError::Classifier("Silero model has no outputs".into()))?;
        let sr_name = resolve_name(&inputs, &["sr", "sample_rate"]);

        let lstm = (
            resolve_name(&inputs, &["h", "state_h"]),
            resolve_name(&inputs, &["c", "state_c"]),
            resolve_name(&outputs, &["hn", "state_hn", "h_out"]),
            resolve_name(&outputs, &["cn", "state_cn", "c_out"]),
        );
        let recurrent = match lstm {
            (Some(h_in), Some(c_in), Some(h_out), Some(c_out)) => RecurrentState::Lstm {
                h_in,
                c_in,
                h_out,
                c_out,
            },
            _ => match resolve_name(&inputs, &["state", "h_0", "hidden"]) {
                Some(state_in) => RecurrentState::Gru {
                    state_in,
                    state_out: resolve_name(&outputs, &["stateN", "state_out", "hn_out"]),
                },
                None => RecurrentState::Stateless,
            },
        };

        info!(
            ?path,
            threshold,
            ?inputs,
            ?outputs,
            ?recurrent,
            "Silero classifier loaded"
        );

        Ok(Self {
            session,
            input_name,
            sr_name,
            output_name,
            recurrent,
            h: vec![0.0; LSTM_SIZE],
            c: vec![0.0; LSTM_SIZE],
            state: vec![0.0; GRU_STATE_SIZE],
            params: SegmentationParams::with_threshold(threshold),
        })
    }

    /// Default model location under the platform data directory.
    pub fn default_model_path() -> PathBuf {
        default_models_dir().join("silero_vad.onnx")
    }

    /// Speech probability for one 512-sample window; advances recurrent state.
    fn score_window(&mut self, window: &[f32]) -> Result<f32> {
        debug_assert_eq!(window.len(), WINDOW);

        let input = Array2::<f32>::from_shape_vec((1, WINDOW), window.to_vec())
            .map_err(|e| HushtrimError::Classifier(e.to_string()))?;
        let mut feeds: Vec<(String, SessionInputValue<'_>)> = vec![(
            self.input_name.clone(),
            Value::from_array(input).map_err(onnx_err)?.into(),
        )];

        if let Some(sr_name) = &self.sr_name {
            let sr = Array1::<i64>::from_elem(1, CLASSIFIER_SAMPLE_RATE as i64);
            feeds.push((sr_name.clone(), Value::from_array(sr).map_err(onnx_err)?.into()));
        }

        match &self.recurrent {
            RecurrentState::Lstm { h_in, c_in, .. } => {
                feeds.push((h_in.clone(), state_tensor(&self.h, 64)?));
                feeds.push((c_in.clone(), state_tensor(&self.c, 64)?));
            }
            RecurrentState::Gru { state_in, .. } => {
                feeds.push((state_in.clone(), state_tensor(&self.state, 128)?));
            }
            RecurrentState::Stateless => {}
        }

        let outputs = self.session.run(feeds).map_err(onnx_err)?;

        let prob_output = named_or_first(outputs.get(self.output_name.as_str()), || {
            (!outputs.is_empty()).then(|| &outputs[0])
        })?;
        let (_, prob_data) = prob_output.try_extract_tensor::<f32>().map_err(onnx_err)?;
        let prob = prob_data.first().copied().unwrap_or(0.0);

        let mut downgrade = false;
        match &self.recurrent {
            RecurrentState::Lstm { h_out, c_out, .. } => {
                match (outputs.get(h_out.as_str()), outputs.get(c_out.as_str())) {
                    (Some(hn), Some(cn)) => {
                        self.h = hn.try_extract_tensor::<f32>().map_err(onnx_err)?.1.to_vec();
                        self.c = cn.try_extract_tensor::<f32>().map_err(onnx_err)?.1.to_vec();
                    }
                    _ => downgrade = true,
                }
            }
            RecurrentState::Gru {
                state_out: Some(state_out),
                ..
            } => match outputs.get(state_out.as_str()) {
                Some(next) => {
                    self.state = next.try_extract_tensor::<f32>().map_err(onnx_err)?.1.to_vec();
                }
                None => downgrade = true,
            },
            _ => {}
        }
        drop(outputs);

        if downgrade {
            warn!("Silero state outputs missing; continuing stateless");
            self.recurrent = RecurrentState::Stateless;
        }

        Ok(prob)
    }
}

impl SpeechClassifier for SileroClassifier {
    fn segments(&mut self, samples: &[f32]) -> Result<Vec<SpeechSegment>> {
        let mut probs = Vec::with_capacity(samples.len().div_ceil(WINDOW));
        let mut padded = [0f32; WINDOW];
        for chunk in samples.chunks(WINDOW) {
            let prob = if chunk.len() == WINDOW {
                self.score_window(chunk)?
            } else {
                padded.fill(0.0);
                padded[..chunk.len()].copy_from_slice(chunk);
                self.score_window(&padded)?
            };
            probs.push(prob);
        }
        Ok(segments_from_probabilities(
            &probs,
            WINDOW,
            samples.len(),
            &self.params,
        ))
    }

    fn reset(&mut self) {
        self.h.fill(0.0);
        self.c.fill(0.0);
        self.state.fill(0.0);
    }
}

/// Recurrent state as a `[2, 1, units]` tensor feed.
fn state_tensor(data: &[f32], units: usize) -> Result<SessionInputValue<'static>> {
    let arr = Array3::<f32>::from_shape_vec((2, 1, units), data.to_vec())
        .map_err(|e| HushtrimError::Classifier(e.to_string()))?;
    Ok(Value::from_array(arr).map_err(onnx_err)?.into())
}

/// The named output, else the session's first one. A model with no outputs
/// at all is a classifier error.
fn named_or_first<T>(named: Option<T>, first: impl FnOnce() -> Option<T>) -> Result<T> {
    named
        .or_else(first)
        .ok_or_else(|| HushtrimError::Classifier("Silero model produced no outputs".into()))
}

fn onnx_err(e: ort::Error) -> HushtrimError {
    HushtrimError::Classifier(e.to_string())
}

fn resolve_name(candidates: &[String], preferred: &[&str]) -> Option<String> {
    preferred.iter().find_map(|needle| {
        candidates
            .iter()
            .find(|name| name.eq_ignore_ascii_case(needle))
            .cloned()
    })
}

/// Platform data directory for downloaded models.
pub fn default_models_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(|p| PathBuf::from(p).join("hushtrim").join("models"))
            .unwrap_or_else(|| PathBuf::from("models"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("hushtrim")
            .join("models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_reported() {
        let err = SileroClassifier::new("/nonexistent/silero_vad.onnx", 0.5)
            .err()
            .expect("load should fail");
        assert!(matches!(err, HushtrimError::ModelNotFound { .. }));
    }

    #[test]
    fn resolve_name_is_case_insensitive() {
        let names = vec!["Input".to_string(), "SR".to_string()];
        assert_eq!(resolve_name(&names, &["input"]), Some("Input".into()));
        assert_eq!(resolve_name(&names, &["sample_rate", "sr"]), Some("SR".into()));
        assert_eq!(resolve_name(&names, &["state"]), None);
    }

    #[test]
    fn empty_outputs_are_an_error_not_a_panic() {
        let probs = [0.7f32];
        assert_eq!(*named_or_first(None, || probs.first()).unwrap(), 0.7);
        assert_eq!(*named_or_first(Some(&0.2f32), || probs.first()).unwrap(), 0.2);
        let err = named_or_first::<&f32>(None, || None).unwrap_err();
        assert!(matches!(err, HushtrimError::Classifier(_)));
    }

    #[test]
    fn default_model_path_is_under_models_dir() {
        assert!(SileroClassifier::default_model_path().ends_with("models/silero_vad.onnx"));
    }
}
