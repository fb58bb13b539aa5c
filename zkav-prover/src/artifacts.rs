// zkav-prover/src/artifacts.rs
//
// On-disk persistence for circuit artifacts (KZG params, verifying key,
// proving key) with an integrity manifest. Setup at the default size takes
// minutes; deployments generate artifacts once and load them at startup.
//
// The manifest records a BLAKE3 hash per file, so corruption or truncation
// fails loudly at load time. The manifest itself is not signed; deployments
// that distribute artifacts over untrusted channels should pin the expected
// verifying-key hash out of band.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use halo2_proofs_axiom::{
    plonk::{self, Circuit},
    poly::{commitment::Params, kzg::commitment::ParamsKZG},
    SerdeFormat,
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use serde::{Deserialize, Serialize};

use zkav_circuit::{TransferCircuit, VoteCircuit};
use zkav_common::{Error, Result};

use crate::CircuitArtifacts;

pub const MANIFEST_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";

/// Which circuit a set of artifacts belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Transfer,
    Vote,
}

impl CircuitKind {
    fn file_stem(self) -> &'static str {
        match self {
            CircuitKind::Transfer => "transfer",
            CircuitKind::Vote => "vote",
        }
    }
}

/// Metadata for a single artifact file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    /// BLAKE3 hash of the file contents (hex-encoded).
    pub blake3: String,
    pub size: u64,
}

impl ArtifactFile {
    fn from_bytes(path: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            blake3: blake3::hash(bytes).to_hex().to_string(),
            size: bytes.len() as u64,
        }
    }
}

/// Manifest describing one circuit's params, verifying key, and proving key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub manifest_version: u32,
    pub circuit: CircuitKind,
    /// Circuit size parameter (rows = 2^k).
    pub k: u32,
    pub params: ArtifactFile,
    pub vk: ArtifactFile,
    pub pk: ArtifactFile,
}

/// Write a circuit's artifacts plus manifest into `dir`.
pub fn save_artifacts(
    dir: impl AsRef<Path>,
    kind: CircuitKind,
    artifacts: &CircuitArtifacts,
) -> Result<ArtifactManifest> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(io_err("create artifact dir"))?;

    let params_bytes = serialize_params(&artifacts.params)?;
    let vk_bytes = serialize_verifying_key(&artifacts.vk)?;
    let pk_bytes = serialize_proving_key(&artifacts.pk)?;

    let stem = kind.file_stem();
    let manifest = ArtifactManifest {
        manifest_version: MANIFEST_VERSION,
        circuit: kind,
        k: artifacts.params.k(),
        params: ArtifactFile::from_bytes(format!("{stem}-params.bin"), &params_bytes),
        vk: ArtifactFile::from_bytes(format!("{stem}-vk.bin"), &vk_bytes),
        pk: ArtifactFile::from_bytes(format!("{stem}-pk.bin"), &pk_bytes),
    };

    fs::write(dir.join(&manifest.params.path), &params_bytes)
        .map_err(io_err("write params"))?;
    fs::write(dir.join(&manifest.vk.path), &vk_bytes).map_err(io_err("write vk"))?;
    fs::write(dir.join(&manifest.pk.path), &pk_bytes).map_err(io_err("write pk"))?;

    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| Error::Internal(format!("serialize manifest: {e}")))?;
    fs::write(manifest_path(dir, kind), manifest_json).map_err(io_err("write manifest"))?;

    Ok(manifest)
}

/// Load a circuit's artifacts from `dir`, verifying the manifest hashes.
pub fn load_artifacts(dir: impl AsRef<Path>, kind: CircuitKind) -> Result<CircuitArtifacts> {
    let dir = dir.as_ref();
    let manifest = read_manifest(dir, kind)?;

    let params_bytes = read_artifact_file(dir, &manifest.params, "params")?;
    let vk_bytes = read_artifact_file(dir, &manifest.vk, "verifying key")?;
    let pk_bytes = read_artifact_file(dir, &manifest.pk, "proving key")?;

    let params = deserialize_params(&params_bytes)?;
    let (vk, pk) = match kind {
        CircuitKind::Transfer => (
            read_vk::<TransferCircuit>(&vk_bytes)?,
            read_pk::<TransferCircuit>(&pk_bytes)?,
        ),
        CircuitKind::Vote => (
            read_vk::<VoteCircuit>(&vk_bytes)?,
            read_pk::<VoteCircuit>(&pk_bytes)?,
        ),
    };

    Ok(CircuitArtifacts { params, vk, pk })
}

pub fn read_manifest(dir: &Path, kind: CircuitKind) -> Result<ArtifactManifest> {
    let bytes = fs::read(manifest_path(dir, kind)).map_err(io_err("read manifest"))?;
    let manifest: ArtifactManifest = serde_json::from_slice(&bytes)
        .map_err(|e| Error::MalformedInput(format!("parse manifest: {e}")))?;
    if manifest.manifest_version != MANIFEST_VERSION {
        return Err(Error::MalformedInput(format!(
            "unsupported manifest version {}, expected {}",
            manifest.manifest_version, MANIFEST_VERSION
        )));
    }
    if manifest.circuit != kind {
        return Err(Error::MalformedInput(format!(
            "manifest is for {:?}, expected {:?}",
            manifest.circuit, kind
        )));
    }
    Ok(manifest)
}

fn manifest_path(dir: &Path, kind: CircuitKind) -> PathBuf {
    dir.join(format!("{}-{}", kind.file_stem(), MANIFEST_FILE))
}

fn read_artifact_file(dir: &Path, entry: &ArtifactFile, label: &str) -> Result<Vec<u8>> {
    let path = dir.join(&entry.path);
    let bytes = fs::read(&path)
        .map_err(|e| Error::Internal(format!("read {label} at {}: {e}", path.display())))?;
    if bytes.len() as u64 != entry.size {
        return Err(Error::MalformedInput(format!(
            "{label} size mismatch: manifest recorded {} bytes, found {}",
            entry.size,
            bytes.len()
        )));
    }
    let actual = blake3::hash(&bytes).to_hex().to_string();
    if actual != entry.blake3 {
        return Err(Error::MalformedInput(format!(
            "{label} hash mismatch: expected {}, computed {actual}",
            entry.blake3
        )));
    }
    Ok(bytes)
}

pub fn serialize_params(params: &ParamsKZG<Bn256>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    params
        .write(&mut buf)
        .map_err(|e| Error::Internal(format!("serialize KZG params: {e}")))?;
    Ok(buf)
}

pub fn deserialize_params(bytes: &[u8]) -> Result<ParamsKZG<Bn256>> {
    let mut reader = Cursor::new(bytes);
    ParamsKZG::<Bn256>::read(&mut reader)
        .map_err(|e| Error::MalformedInput(format!("deserialize KZG params: {e}")))
}

pub fn serialize_verifying_key(vk: &plonk::VerifyingKey<G1Affine>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    vk.write(&mut buf, SerdeFormat::Processed)
        .map_err(|e| Error::Internal(format!("serialize verifying key: {e}")))?;
    Ok(buf)
}

pub fn serialize_proving_key(pk: &plonk::ProvingKey<G1Affine>) -> Result<Vec<u8>> {
    let mut buf = vec![];
    pk.write(&mut buf, SerdeFormat::Processed)
        .map_err(|e| Error::Internal(format!("serialize proving key: {e}")))?;
    Ok(buf)
}

fn read_vk<C: Circuit<Fr> + Default>(bytes: &[u8]) -> Result<plonk::VerifyingKey<G1Affine>> {
    let params = C::default().params();
    let mut reader = Cursor::new(bytes);
    plonk::VerifyingKey::read::<_, C>(&mut reader, SerdeFormat::Processed, params)
        .map_err(|e| Error::MalformedInput(format!("deserialize verifying key: {e}")))
}

fn read_pk<C: Circuit<Fr> + Default>(bytes: &[u8]) -> Result<plonk::ProvingKey<G1Affine>> {
    let params = C::default().params();
    let mut reader = Cursor::new(bytes);
    plonk::ProvingKey::read::<_, C>(&mut reader, SerdeFormat::Processed, params)
        .map_err(|e| Error::MalformedInput(format!("deserialize proving key: {e}")))
}

fn io_err(label: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |e| Error::Internal(format!("{label}: {e}"))
}
