// ============================================================
// Layer 4 — DataManager
// ============================================================
// Discovers and loads the paired simulation volumes for a run:
//
//   <data_dir>/outputs — one high-res T21 cube per (seed, redshift),
//                        file name "T21_cube_<z>_..._<seed>.mat"
//                        (redshift = token 2, seed = token 7 of the
//                        '_'-split file stem)
//   <data_dir>/IC      — one "delta<seed>.mat" and one
//                        "vbv<seed>.mat" per seed
//
// Scanning leaves unmatched (seed, redshift) slots empty; loading
// turns an empty slot into a hard data-availability error. The
// simulation inputs are assumed complete — nothing is retried.
//
// Two consumption modes, mirroring how much memory a run can
// afford:
//   data()          — eager: load everything, augment, return the
//                     full sample list
//   sample_stream() — lazy: yield one augmented sample at a time,
//                     single redshift only, single pass

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::data::augment::{self, IDENTITY, SYMMETRY_COUNT};
use crate::data::lowres::LowResStrategy;
use crate::domain::sample::VolumeSample;
use crate::domain::traits::VolumeSource;
use crate::domain::volume::Volume;

/// Key under which each file stores its array.
const T21_KEY: &str = "Tlin";
const DELTA_KEY: &str = "delta";
const VBV_KEY: &str = "vbv";

// ─── FileIndex ────────────────────────────────────────────────────────────────
/// Result of scanning the storage layout: for every requested seed
/// and redshift, the matching file if one exists.
#[derive(Debug, Clone)]
pub struct FileIndex {
    /// t21[seed_idx][redshift_idx]
    pub t21: Vec<Vec<Option<PathBuf>>>,
    /// delta[seed_idx]
    pub delta: Vec<Option<PathBuf>>,
    /// vbv[seed_idx]
    pub vbv: Vec<Option<PathBuf>>,
}

impl FileIndex {
    /// Human-readable list of every unfilled slot, for `scan`
    /// reporting and error messages.
    pub fn missing(&self, seeds: &[u32], redshifts: &[u32]) -> Vec<String> {
        let mut gaps = Vec::new();
        for (i, seed) in seeds.iter().enumerate() {
            if self.delta[i].is_none() {
                gaps.push(format!("delta for seed {seed}"));
            }
            if self.vbv[i].is_none() {
                gaps.push(format!("vbv for seed {seed}"));
            }
            for (j, z) in redshifts.iter().enumerate() {
                if self.t21[i][j].is_none() {
                    gaps.push(format!("T21 cube for seed {seed}, z={z}"));
                }
            }
        }
        gaps
    }

    pub fn is_complete(&self, seeds: &[u32], redshifts: &[u32]) -> bool {
        self.missing(seeds, redshifts).is_empty()
    }
}

/// All volumes for a run, eagerly loaded.
pub struct LoadedVolumes {
    /// t21[seed_idx][redshift_idx]
    pub t21: Vec<Vec<Volume>>,
    pub delta: Vec<Volume>,
    pub vbv: Vec<Volume>,
}

// ─── Filename parsing ─────────────────────────────────────────────────────────

/// Parse "(redshift, seed)" out of a T21 cube file stem, e.g.
/// "T21_cube_10_HII_dim_128_seed_1000" → (10, 1000).
fn parse_t21_stem(stem: &str) -> Option<(u32, u32)> {
    if !stem.starts_with("T21_cube") {
        return None;
    }
    let parts: Vec<&str> = stem.split('_').collect();
    let z = parts.get(2)?.parse().ok()?;
    let seed = parts.get(7)?.parse().ok()?;
    Some((z, seed))
}

/// Parse the seed out of an IC file stem, e.g. "delta1000" → 1000.
fn parse_ic_stem(stem: &str, prefix: &str) -> Option<u32> {
    stem.strip_prefix(prefix)?.parse().ok()
}

// ─── DataManager ──────────────────────────────────────────────────────────────
/// Indexes and loads the (target, delta, vbv) volumes for a list
/// of IC seeds and redshifts. Generic over the storage format so
/// tests can inject synthetic volumes.
pub struct DataManager<S: VolumeSource> {
    data_dir: PathBuf,
    redshifts: Vec<u32>,
    seeds: Vec<u32>,
    source: S,
}

impl<S: VolumeSource> DataManager<S> {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        redshifts: Vec<u32>,
        seeds: Vec<u32>,
        source: S,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            redshifts,
            seeds,
            source,
        }
    }

    pub fn seeds(&self) -> &[u32] {
        &self.seeds
    }

    pub fn redshifts(&self) -> &[u32] {
        &self.redshifts
    }

    /// Scan both storage locations and build the file index.
    /// Slots with no matching file stay empty — `load()` is where
    /// a hole becomes an error.
    pub fn get_file_lists(&self) -> Result<FileIndex> {
        let mut index = FileIndex {
            t21: vec![vec![None; self.redshifts.len()]; self.seeds.len()],
            delta: vec![None; self.seeds.len()],
            vbv: vec![None; self.seeds.len()],
        };

        let outputs = self.data_dir.join("outputs");
        for entry in fs::read_dir(&outputs)
            .with_context(|| format!("cannot read directory '{}'", outputs.display()))?
        {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some((z, seed)) = parse_t21_stem(stem) {
                let (Some(i), Some(j)) = (
                    self.seeds.iter().position(|&s| s == seed),
                    self.redshifts.iter().position(|&r| r == z),
                ) else {
                    continue;
                };
                index.t21[i][j] = Some(path);
            }
        }

        let ic = self.data_dir.join("IC");
        for entry in fs::read_dir(&ic)
            .with_context(|| format!("cannot read directory '{}'", ic.display()))?
        {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(seed) = parse_ic_stem(stem, "delta") {
                if let Some(i) = self.seeds.iter().position(|&s| s == seed) {
                    index.delta[i] = Some(path);
                }
            } else if let Some(seed) = parse_ic_stem(stem, "vbv") {
                if let Some(i) = self.seeds.iter().position(|&s| s == seed) {
                    index.vbv[i] = Some(path);
                }
            }
        }

        Ok(index)
    }

    /// Eagerly load every requested volume. Any hole in the index
    /// is a fatal data-availability error.
    pub fn load(&self) -> Result<LoadedVolumes> {
        let index = self.get_file_lists()?;
        let mut loaded = LoadedVolumes {
            t21: Vec::with_capacity(self.seeds.len()),
            delta: Vec::with_capacity(self.seeds.len()),
            vbv: Vec::with_capacity(self.seeds.len()),
        };

        for (i, &seed) in self.seeds.iter().enumerate() {
            let delta_path = index.delta[i]
                .as_ref()
                .with_context(|| format!("no delta file found for IC seed {seed}"))?;
            let vbv_path = index.vbv[i]
                .as_ref()
                .with_context(|| format!("no vbv file found for IC seed {seed}"))?;
            loaded.delta.push(self.source.load_volume(delta_path, DELTA_KEY)?);
            loaded.vbv.push(self.source.load_volume(vbv_path, VBV_KEY)?);

            let mut per_redshift = Vec::with_capacity(self.redshifts.len());
            for (j, &z) in self.redshifts.iter().enumerate() {
                let t21_path = index.t21[i][j].as_ref().with_context(|| {
                    format!("no T21 cube found for IC seed {seed} at redshift {z}")
                })?;
                per_redshift.push(self.source.load_volume(t21_path, T21_KEY)?);
            }
            loaded.t21.push(per_redshift);
        }
        Ok(loaded)
    }

    /// Load everything, optionally augment, and materialize one
    /// sample per (seed variant, redshift).
    ///
    /// When augmenting, each seed gets `augments` symmetry indices
    /// drawn with replacement from [0, 23) plus the identity as the
    /// final variant — the same index applied across all channels
    /// and redshifts of the seed so the sample stays co-registered.
    pub fn data(
        &self,
        augment: bool,
        augments: usize,
        strategy: LowResStrategy,
    ) -> Result<Vec<VolumeSample>> {
        if augment {
            ensure!(
                (1..=23).contains(&augments),
                "augments must be between 1 and 23, got {augments}"
            );
        }
        let loaded = self.load()?;
        let mut rng = rand::thread_rng();
        let mut samples = Vec::new();

        for (i, _) in self.seeds.iter().enumerate() {
            let variants: Vec<usize> = if augment {
                let mut v: Vec<usize> =
                    (0..augments).map(|_| rng.gen_range(0..IDENTITY)).collect();
                v.push(IDENTITY);
                v
            } else {
                vec![IDENTITY]
            };

            for &aug in &variants {
                let delta = augment::augment(&loaded.delta[i], aug)?;
                let vbv = augment::augment(&loaded.vbv[i], aug)?;
                for t21 in &loaded.t21[i] {
                    let target = augment::augment(t21, aug)?;
                    let low_res = strategy.downsample(&target)?;
                    samples.push(VolumeSample::new(
                        target,
                        delta.clone(),
                        vbv.clone(),
                        low_res,
                    )?);
                }
            }
        }

        tracing::info!(
            "Materialized {} samples ({} seeds × {} variants × {} redshifts)",
            samples.len(),
            self.seeds.len(),
            if augment { augments + 1 } else { 1 },
            self.redshifts.len()
        );
        Ok(samples)
    }

    /// Lazy single-pass producer of one sample at a time, for runs
    /// where the augmented dataset does not fit in memory. Only
    /// defined for exactly one configured redshift. The iterator is
    /// finite and not restartable; re-invoke for another pass.
    ///
    /// Unlike `data()`, the per-seed symmetry indices are drawn
    /// without replacement from the full group.
    pub fn sample_stream(
        &self,
        augment: bool,
        augments: usize,
        strategy: LowResStrategy,
    ) -> Result<SampleStream<'_, S>> {
        ensure!(
            self.redshifts.len() == 1,
            "sample_stream requires exactly one redshift, got {}",
            self.redshifts.len()
        );
        ensure!(
            (1..=SYMMETRY_COUNT).contains(&augments),
            "augments must be between 1 and {SYMMETRY_COUNT}, got {augments}"
        );
        let index = self.get_file_lists()?;

        let mut rng = rand::thread_rng();
        let per_seed: Vec<Vec<usize>> = self
            .seeds
            .iter()
            .map(|_| {
                if augment {
                    let mut all: Vec<usize> = (0..SYMMETRY_COUNT).collect();
                    all.shuffle(&mut rng);
                    all.truncate(augments);
                    all
                } else {
                    vec![IDENTITY]
                }
            })
            .collect();

        // Variant-major order: one pass over all seeds per variant,
        // so consecutive samples come from different simulations.
        let variants = if augment { augments } else { 1 };
        let mut plan = Vec::with_capacity(variants * self.seeds.len());
        for v in 0..variants {
            for s in 0..self.seeds.len() {
                plan.push((s, per_seed[s][v]));
            }
        }

        Ok(SampleStream {
            manager: self,
            index,
            strategy,
            plan,
            position: 0,
        })
    }

    fn load_sample(
        &self,
        index: &FileIndex,
        seed_idx: usize,
        aug: usize,
        strategy: LowResStrategy,
    ) -> Result<VolumeSample> {
        let seed = self.seeds[seed_idx];
        let z = self.redshifts[0];
        let t21_path = index.t21[seed_idx][0]
            .as_ref()
            .with_context(|| format!("no T21 cube found for IC seed {seed} at redshift {z}"))?;
        let delta_path = index.delta[seed_idx]
            .as_ref()
            .with_context(|| format!("no delta file found for IC seed {seed}"))?;
        let vbv_path = index.vbv[seed_idx]
            .as_ref()
            .with_context(|| format!("no vbv file found for IC seed {seed}"))?;

        let target = augment::augment(&self.source.load_volume(t21_path, T21_KEY)?, aug)?;
        let delta = augment::augment(&self.source.load_volume(delta_path, DELTA_KEY)?, aug)?;
        let vbv = augment::augment(&self.source.load_volume(vbv_path, VBV_KEY)?, aug)?;
        let low_res = strategy.downsample(&target)?;
        VolumeSample::new(target, delta, vbv, low_res)
    }
}

// ─── SampleStream ─────────────────────────────────────────────────────────────
/// Lazy iterator over augmented samples; see
/// [`DataManager::sample_stream`].
pub struct SampleStream<'a, S: VolumeSource> {
    manager: &'a DataManager<S>,
    index: FileIndex,
    strategy: LowResStrategy,
    plan: Vec<(usize, usize)>,
    position: usize,
}

impl<S: VolumeSource> Iterator for SampleStream<'_, S> {
    type Item = Result<VolumeSample>;

    fn next(&mut self) -> Option<Self::Item> {
        let &(seed_idx, aug) = self.plan.get(self.position)?;
        self.position += 1;
        Some(
            self.manager
                .load_sample(&self.index, seed_idx, aug, self.strategy),
        )
    }
}
