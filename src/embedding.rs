//! Lexical embeddings for atom names.
//!
//! Names are split into lowercase word tokens (so `is_mortal`, `IsMortal`
//! and `is mortal` share features) and padded character trigrams (so `cat`
//! and `cats` land close together). Each feature is hashed with blake3 into
//! a signed bucket and the result is L2-normalized.

use blake3::Hasher;

/// Default embedding dimensionality for atom names.
pub const DEFAULT_EMBEDDING_DIM: usize = 64;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Split on non-alphanumerics and lower-to-upper case boundaries.
fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn add_feature(vec: &mut [f32], kind: u8, feature: &str, weight: f32) {
    let mut h = Hasher::new();
    h.update(&[kind]);
    h.update(feature.as_bytes());
    let digest = h.finalize();
    let bytes = digest.as_bytes();

    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes[..8]);
    #[allow(clippy::cast_possible_truncation)]
    let slot = (u64::from_le_bytes(head) % vec.len() as u64) as usize;
    vec[slot] += if bytes[8] & 1 == 0 { weight } else { -weight };
}

/// Embed `text` with [`DEFAULT_EMBEDDING_DIM`] dimensions.
#[must_use]
pub fn lexical_embedding(text: &str) -> Vec<f32> {
    lexical_embedding_with_dim(text, DEFAULT_EMBEDDING_DIM)
}

/// Embed `text` with `dim` dimensions. Text without alphanumerics yields the zero vector.
#[must_use]
pub fn lexical_embedding_with_dim(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    if dim == 0 {
        return vec;
    }

    for word in words(text) {
        add_feature(&mut vec, b'w', &word, WORD_WEIGHT);
        let padded: Vec<char> = format!("^{word}$").chars().collect();
        for gram in padded.windows(3) {
            let gram: String = gram.iter().collect();
            add_feature(&mut vec, b't', &gram, TRIGRAM_WEIGHT);
        }
    }

    let norm = vec.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        let scale = norm.recip() as f32;
        vec.iter_mut().for_each(|x| *x *= scale);
    }
    vec
}

/// Cosine similarity of two equally sized vectors; 0 for mismatched or zero vectors.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, na, nb) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |(d, na, nb), (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (d + x * y, na + x * x, nb + y * y)
    });
    if na <= 0.0 || nb <= 0.0 {
        return 0.0;
    }

    let sim = dot / (na.sqrt() * nb.sqrt());
    if sim.is_finite() {
        sim as f32
    } else {
        0.0
    }
}
