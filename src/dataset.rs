//! Dataset utilities: word2vec ingestion, synthetic data, encoding and recall.

use crate::codebook::{Codebook, SubspaceLayout};
use crate::coarse::CoarseQuantizer;
use crate::distance::scalar::{squared_distance, subtract_into};
use crate::distance::normalize;
use crate::error::{AdcError, Result};
use crate::pq::{CellRow, QuantizedRow};
use crate::vector::Vector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Longest accepted word, in bytes.
pub const MAX_WORD_BYTES: usize = 99;

/// Options for reading the word2vec text format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Word2VecOptions {
    /// Scale every vector to unit length.
    pub normalize: bool,
    /// Stop after this many accepted vectors.
    pub limit: Option<usize>,
}

/// Word embeddings read from a word2vec text file.
///
/// Ids are assigned sequentially from 1 in file order, counting only
/// accepted lines; `words[i]` belongs to `vectors[i]`.
#[derive(Debug, Clone, Default)]
pub struct Embeddings {
    pub dim: usize,
    pub words: Vec<String>,
    pub vectors: Vec<Vector>,
}

impl Embeddings {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Word stored under `id`.
    pub fn word(&self, id: u64) -> Option<&str> {
        let idx = usize::try_from(id.checked_sub(1)?).ok()?;
        self.words.get(idx).map(String::as_str)
    }

    /// Parse the word2vec text format: a `<count> <dim>` header, then one
    /// `word v1 ... vD` line per vector.
    ///
    /// Lines with an overlong word, an unparsable value or the wrong number
    /// of values are skipped with a warning. With `normalize`, zero vectors
    /// are skipped too.
    pub fn read_word2vec<R: BufRead>(reader: R, options: Word2VecOptions) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .ok_or_else(|| AdcError::invalid_format("word2vec file is empty"))??;
        let dim = parse_header(&header)?;

        let mut out = Embeddings {
            dim,
            ..Default::default()
        };
        let mut skipped = 0usize;

        for (lineno, line) in lines.enumerate() {
            if options.limit.is_some_and(|limit| out.len() >= limit) {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line, dim, options.normalize) {
                Some((word, data)) => {
                    let id = out.len() as u64 + 1;
                    out.words.push(word.to_string());
                    out.vectors.push(Vector::new(id, data));
                }
                None => {
                    skipped += 1;
                    warn!(line = lineno + 2, "skipping malformed word2vec line");
                }
            }
        }

        info!(vectors = out.len(), dim, skipped, "read word2vec embeddings");
        Ok(out)
    }

    /// Read a word2vec text file from disk.
    pub fn load_word2vec(path: impl AsRef<Path>, options: Word2VecOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_word2vec(BufReader::new(file), options)
    }
}

fn parse_header(header: &str) -> Result<usize> {
    let mut fields = header.split_whitespace();
    let count = fields.next().and_then(|f| f.parse::<usize>().ok());
    let dim = fields.next().and_then(|f| f.parse::<usize>().ok());
    match (count, dim, fields.next()) {
        (Some(_), Some(dim), None) if dim > 0 => Ok(dim),
        _ => Err(AdcError::invalid_format(format!(
            "bad word2vec header {:?}, expected \"<count> <dim>\"",
            header
        ))),
    }
}

fn parse_line(line: &str, dim: usize, normalized: bool) -> Option<(&str, Vec<f32>)> {
    let mut fields = line.split_whitespace();
    let word = fields.next()?;
    if word.len() > MAX_WORD_BYTES {
        return None;
    }

    let data = fields
        .map(|f| f.parse::<f32>().ok())
        .collect::<Option<Vec<f32>>>()?;
    if data.len() != dim {
        return None;
    }

    if normalized {
        let mut data = data;
        normalize(&mut data).ok()?;
        return Some((word, data));
    }
    Some((word, data))
}

/// A synthetic dataset with queries and brute-force ground truth.
pub struct Dataset {
    pub vectors: Vec<Vector>,
    pub queries: Vec<Vector>,
    pub ground_truth: Vec<Vec<u64>>,
}

impl Dataset {
    /// Generate a random synthetic dataset.
    ///
    /// Creates `n_vectors` database vectors with ids `1..=n_vectors` and
    /// `n_queries` query vectors, values uniform in [-1, 1].
    pub fn generate(n_vectors: usize, n_queries: usize, dim: usize) -> Self {
        Self::generate_with_rng(n_vectors, n_queries, dim, &mut StdRng::from_entropy())
    }

    /// [`generate`](Self::generate) with a fixed seed.
    pub fn generate_seeded(n_vectors: usize, n_queries: usize, dim: usize, seed: u64) -> Self {
        Self::generate_with_rng(n_vectors, n_queries, dim, &mut StdRng::seed_from_u64(seed))
    }

    fn generate_with_rng(n_vectors: usize, n_queries: usize, dim: usize, rng: &mut StdRng) -> Self {
        let mut random = |id: u64| {
            let data: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
            Vector::new(id, data)
        };

        let vectors: Vec<Vector> = (1..=n_vectors as u64).map(&mut random).collect();
        let queries: Vec<Vector> = (0..n_queries as u64)
            .map(|i| random(n_vectors as u64 + 1 + i))
            .collect();

        Self {
            vectors,
            queries,
            ground_truth: Vec::new(),
        }
    }

    /// Compute exact nearest neighbors by squared distance for every query.
    pub fn compute_ground_truth(&mut self, k: usize) {
        self.ground_truth = self
            .queries
            .iter()
            .map(|query| {
                let mut scored: Vec<(u64, f32)> = self
                    .vectors
                    .iter()
                    .map(|v| (v.id, squared_distance(query.as_slice(), v.as_slice())))
                    .collect();
                scored.sort_by(|a, b| a.1.total_cmp(&b.1));
                scored.into_iter().take(k).map(|(id, _)| id).collect()
            })
            .collect();
    }

    /// Build an untrained codebook by sampling database subvectors.
    ///
    /// Each `(pos, code)` entry is the `pos` subvector of a randomly drawn
    /// database vector. Good enough for benchmarks and tests; real codebooks
    /// come from an offline training step.
    pub fn sample_codebook(&self, layout: SubspaceLayout, codes: usize, seed: u64) -> Result<Codebook> {
        if self.vectors.is_empty() {
            return Err(AdcError::invalid_parameter("cannot sample a codebook from no vectors"));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Vec::with_capacity(layout.dim() * codes);
        for pos in 0..layout.positions() {
            for _ in 0..codes {
                let v = &self.vectors[rng.gen_range(0..self.vectors.len())];
                if v.dim() != layout.dim() {
                    return Err(AdcError::dimension_mismatch(layout.dim(), v.dim()));
                }
                data.extend_from_slice(layout.subvector(v.as_slice(), pos));
            }
        }
        Codebook::from_flat(layout, codes, data)
    }
}

/// Encode vectors into flat PQ code rows.
pub fn encode_rows(codebook: &Codebook, vectors: &[Vector]) -> Result<Vec<QuantizedRow>> {
    vectors
        .iter()
        .map(|v| Ok(QuantizedRow::new(v.id, codebook.encode(v.as_slice())?)))
        .collect()
}

/// File vectors under their nearest coarse cell and encode their residuals.
pub fn encode_cell_rows(
    coarse: &CoarseQuantizer,
    residual_codebook: &Codebook,
    vectors: &[Vector],
) -> Result<Vec<CellRow>> {
    let mut residual = Vec::new();
    vectors
        .iter()
        .map(|v| {
            let (centroid, _) = coarse.assign(v.as_slice())?;
            residual.clear();
            residual.resize(v.dim(), 0.0);
            subtract_into(v.as_slice(), &centroid.vector, &mut residual);
            Ok(CellRow {
                cell: centroid.cell,
                row: QuantizedRow::new(v.id, residual_codebook.encode(&residual)?),
            })
        })
        .collect()
}

/// Compute recall@k between predicted and ground truth results.
///
/// Recall is the fraction of true nearest neighbors that were found.
/// Returns a value between 0.0 and 1.0.
pub fn recall_at_k(predicted: &[u64], ground_truth: &[u64], k: usize) -> f32 {
    if k == 0 {
        return 0.0;
    }
    let pred_set: HashSet<u64> = predicted.iter().take(k).copied().collect();
    let truth_set: HashSet<u64> = ground_truth.iter().take(k).copied().collect();

    let intersection = pred_set.intersection(&truth_set).count();
    intersection as f32 / k as f32
}
