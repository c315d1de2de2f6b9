//! Artifact containers
//!
//! Two on-disk layouts share one signature:
//! - Serving directory: `signature.json`, `metadata.json`, `weights.bin`
//! - Quantized single file: signature, metadata and int8 weights in one envelope
//!
//! Binary payloads are wrapped in an [`Envelope`] carrying magic bytes, a
//! format version and an FNV-1a checksum of the payload.

use super::metadata::{ArtifactMetadata, WeightFormat};
use super::quantize::QuantizedNetwork;
use super::signature::ServingSignature;
use crate::error::{HarError, Result};
use crate::model::HarNetwork;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

pub const SIGNATURE_FILE: &str = "signature.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const WEIGHTS_FILE: &str = "weights.bin";

/// Default name of the serving directory
pub const SERVING_DIR: &str = "har_gru_savedmodel";
/// Default name of the quantized artifact
pub const QUANTIZED_FILE: &str = "har_gru_model.hq8";

const WEIGHTS_MAGIC: [u8; 4] = *b"HARW";
const QUANTIZED_MAGIC: [u8; 4] = *b"HAQ8";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    payload: Vec<u8>,
    checksum: u64,
}

impl Envelope {
    fn seal<T: Serialize>(magic: [u8; 4], value: &T) -> Result<Self> {
        let payload = bincode::serialize(value)?;
        let checksum = fnv1a(&payload);
        Ok(Self {
            magic,
            format_version: FORMAT_VERSION,
            payload,
            checksum,
        })
    }

    fn write(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path).map_err(|e| load_error(path, e))?);
        bincode::deserialize_from(reader).map_err(|e| load_error(path, e))
    }

    fn open<T: for<'de> Deserialize<'de>>(&self, magic: [u8; 4], path: &Path) -> Result<T> {
        if self.magic != magic {
            return Err(load_error(path, format!("bad magic bytes {:?}", self.magic)));
        }
        if self.format_version != FORMAT_VERSION {
            return Err(load_error(
                path,
                format!("unsupported format version {}", self.format_version),
            ));
        }
        if fnv1a(&self.payload) != self.checksum {
            return Err(load_error(path, "checksum verification failed, file may be corrupted"));
        }
        bincode::deserialize(&self.payload).map_err(|e| load_error(path, e))
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn load_error(path: &Path, reason: impl std::fmt::Display) -> HarError {
    HarError::ModelLoadFailure(format!("{}: {}", path.display(), reason))
}

#[derive(Serialize, Deserialize)]
struct QuantizedPayload {
    signature: ServingSignature,
    metadata: ArtifactMetadata,
    network: QuantizedNetwork,
}

/// A loaded, validated model ready for inference
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub network: HarNetwork,
    pub signature: ServingSignature,
    pub metadata: ArtifactMetadata,
}

/// Write the serving directory, creating it if needed
pub fn save_serving_dir(
    dir: impl AsRef<Path>,
    network: &HarNetwork,
    signature: &ServingSignature,
    metadata: &ArtifactMetadata,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    fs::write(dir.join(SIGNATURE_FILE), serde_json::to_string_pretty(signature)?)?;
    fs::write(dir.join(METADATA_FILE), serde_json::to_string_pretty(metadata)?)?;
    Envelope::seal(WEIGHTS_MAGIC, network)?.write(&dir.join(WEIGHTS_FILE))?;

    info!(path = %dir.display(), "Wrote serving directory");
    Ok(())
}

/// Write the int8 single-file artifact; returns the quantized weight size in bytes
pub fn save_quantized(
    path: impl AsRef<Path>,
    network: &HarNetwork,
    signature: &ServingSignature,
    metadata: &ArtifactMetadata,
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let quantized = QuantizedNetwork::from_network(network);
    let size = quantized.size_bytes();
    let payload = QuantizedPayload {
        signature: signature.clone(),
        metadata: metadata.clone().with_weight_format(WeightFormat::Int8),
        network: quantized,
    };
    Envelope::seal(QUANTIZED_MAGIC, &payload)?.write(path)?;

    info!(path = %path.display(), weight_bytes = size, "Wrote quantized artifact");
    Ok(size)
}

/// Load either container; any failure is a [`HarError::ModelLoadFailure`]
pub fn load_artifact(path: impl AsRef<Path>) -> Result<LoadedArtifact> {
    let path = path.as_ref();
    let artifact = if path.is_dir() {
        load_serving_dir(path)?
    } else if path.is_file() {
        load_quantized(path)?
    } else {
        return Err(load_error(path, "no such file or directory"));
    };

    artifact.signature.check_matches(artifact.network.config())?;
    if artifact.signature != ServingSignature::canonical() {
        return Err(load_error(path, "signature is not the (batch, 1, 561) -> (batch, 6) contract"));
    }

    debug!(
        path = %path.display(),
        params = artifact.network.n_params(),
        format = ?artifact.metadata.weight_format,
        "Loaded artifact"
    );
    Ok(artifact)
}

fn load_serving_dir(dir: &Path) -> Result<LoadedArtifact> {
    let read_json = |name: &str| -> Result<String> {
        let file = dir.join(name);
        fs::read_to_string(&file).map_err(|e| load_error(&file, e))
    };
    let signature: ServingSignature = serde_json::from_str(&read_json(SIGNATURE_FILE)?)
        .map_err(|e| load_error(&dir.join(SIGNATURE_FILE), e))?;
    let metadata: ArtifactMetadata = serde_json::from_str(&read_json(METADATA_FILE)?)
        .map_err(|e| load_error(&dir.join(METADATA_FILE), e))?;

    let weights = dir.join(WEIGHTS_FILE);
    let network: HarNetwork = Envelope::read(&weights)?.open(WEIGHTS_MAGIC, &weights)?;
    let network = HarNetwork::from_parts(
        network.config().clone(),
        network.gru_layers().to_vec(),
        network.dense_layers().to_vec(),
    )
    .map_err(|e| load_error(&weights, e))?;

    Ok(LoadedArtifact { network, signature, metadata })
}

fn load_quantized(path: &Path) -> Result<LoadedArtifact> {
    let payload: QuantizedPayload = Envelope::read(path)?.open(QUANTIZED_MAGIC, path)?;
    let network = payload.network.to_network().map_err(|e| load_error(path, e))?;
    Ok(LoadedArtifact {
        network,
        signature: payload.signature,
        metadata: payload.metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use ndarray::Array3;

    fn small_network() -> HarNetwork {
        let config = ModelConfig::new().with_gru_units(vec![8]).with_dense_units(vec![8]);
        HarNetwork::new(config).unwrap()
    }

    fn sample_input() -> Array3<f32> {
        Array3::from_shape_fn((2, 1, 561), |(b, _, f)| ((f % 13) as f32 - 6.0) * 0.1 * (b as f32 + 1.0))
    }

    #[test]
    fn test_serving_dir_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SERVING_DIR);
        let network = small_network();
        let metadata = ArtifactMetadata::new("test").with_params(network.n_params());
        save_serving_dir(&path, &network, &ServingSignature::canonical(), &metadata).unwrap();

        assert!(path.join(SIGNATURE_FILE).exists());
        assert!(path.join(METADATA_FILE).exists());
        let loaded = load_artifact(&path).unwrap();
        let x = sample_input();
        assert_eq!(network.forward(&x).unwrap(), loaded.network.forward(&x).unwrap());
        assert_eq!(loaded.metadata.name, "test");
        assert_eq!(loaded.metadata.weight_format, WeightFormat::Float32);
    }

    #[test]
    fn test_quantized_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(QUANTIZED_FILE);
        let network = small_network();
        save_quantized(&path, &network, &ServingSignature::canonical(), &ArtifactMetadata::default()).unwrap();

        let loaded = load_artifact(&path).unwrap();
        assert_eq!(loaded.metadata.weight_format, WeightFormat::Int8);
        let x = sample_input();
        let a = network.forward(&x).unwrap();
        let b = loaded.network.forward(&x).unwrap();
        for (p, q) in a.iter().zip(b.iter()) {
            assert!((p - q).abs() < 0.05, "{} vs {}", p, q);
        }
    }

    #[test]
    fn test_corrupted_weights_fail_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(QUANTIZED_FILE);
        let network = small_network();
        save_quantized(&path, &network, &ServingSignature::canonical(), &ArtifactMetadata::default()).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = load_artifact(&path).unwrap_err();
        assert!(matches!(err, HarError::ModelLoadFailure(_)), "{:?}", err);
    }

    #[test]
    fn test_wrong_signature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SERVING_DIR);
        let network = small_network();
        let mut signature = ServingSignature::canonical();
        signature.inputs[0].name = "x".to_string();
        save_serving_dir(&path, &network, &signature, &ArtifactMetadata::default()).unwrap();

        assert!(matches!(load_artifact(&path), Err(HarError::ModelLoadFailure(_))));
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_artifact(dir.path().join("nothing")),
            Err(HarError::ModelLoadFailure(_))
        ));
    }

    #[test]
    fn test_checksum_is_fnv1a() {
        assert_eq!(fnv1a(b""), 14695981039346656037);
        assert_ne!(fnv1a(b"a"), fnv1a(b"b"));
    }
}
