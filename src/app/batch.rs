use crate::app::sweep::SweepTask;
use crate::app::workspace::SolverWorkspace;
use crate::config::{Config, SpinConstraint};
use crate::dataset::DpWriter;
use crate::error::{Result as SfResult, SpinForceError};
use crate::sphinx::Solver;
use color_eyre::eyre::{eyre, Result, WrapErr};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, Span};

pub const STRUCTURE_SUFFIX: &str = "structure.sx";
pub const SPIN_SUFFIX: &str = "spin.sx";
pub const CONSTRAINT_SUFFIX: &str = "spinforce.json";

/// Matched inputs of one tag
#[derive(Debug, Clone, PartialEq)]
pub struct TagFiles {
    pub tag: u64,
    pub structure: PathBuf,
    pub spin: PathBuf,
}

/// Totals over a whole batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub tags: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub frames_written: usize,
}

/// Leading `<tag>_` of a file name
fn parse_tag(name: &str) -> Option<u64> {
    name.split('_').next()?.parse().ok()
}

/// Files in `dir` ending with `suffix`, sorted by numeric tag.
fn load_dir(dir: &Path, suffix: &str) -> SfResult<Vec<(u64, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(suffix) {
            continue;
        }
        let tag = parse_tag(&name).ok_or_else(|| {
            SpinForceError::config(format!("file {} does not start with an integer tag", name))
        })?;
        files.push((tag, entry.path()));
    }

    if files.is_empty() {
        return Err(SpinForceError::config(format!(
            "there is no {} file in {}",
            suffix,
            dir.display()
        )));
    }
    files.sort_by_key(|(tag, _)| *tag);
    Ok(files)
}

/// Pair structure and spin files by tag. Both directories must carry exactly
/// the same tags.
pub fn discover_tags(structure_dir: &Path, spin_dir: &Path) -> SfResult<Vec<TagFiles>> {
    let structures = load_dir(structure_dir, STRUCTURE_SUFFIX)?;
    let spins = load_dir(spin_dir, SPIN_SUFFIX)?;

    let structure_tags: Vec<u64> = structures.iter().map(|(t, _)| *t).collect();
    let spin_tags: Vec<u64> = spins.iter().map(|(t, _)| *t).collect();
    if structure_tags != spin_tags {
        return Err(SpinForceError::config(format!(
            "structure tags {:?} and spin tags {:?} are not in one-to-one correspondence",
            structure_tags, spin_tags
        )));
    }

    Ok(structures
        .into_iter()
        .zip(spins)
        .map(|((tag, structure), (_, spin))| TagFiles {
            tag,
            structure,
            spin,
        })
        .collect())
}

/// Constraint file `<tag>_..._spinforce.json` in `config_dir`, if any.
pub fn find_constraint_file(config_dir: &Path, tag: u64) -> SfResult<Option<PathBuf>> {
    if !config_dir.is_dir() {
        return Ok(None);
    }

    let mut found: Option<PathBuf> = None;
    for entry in fs::read_dir(config_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(CONSTRAINT_SUFFIX) && parse_tag(&name) == Some(tag) {
            if let Some(previous) = &found {
                return Err(SpinForceError::config(format!(
                    "tag {} has several constraint files: {} and {}",
                    tag,
                    previous.display(),
                    entry.path().display()
                )));
            }
            found = Some(entry.path());
        }
    }
    Ok(found)
}

/// Runs the sweep of every tag into one dataset
pub struct Batch<'a, S: Solver> {
    config: &'a Config,
    solver: S,
    span: Span,
}

impl<'a, S: Solver> Batch<'a, S> {
    pub fn new(config: &'a Config, solver: S) -> Self {
        Self {
            config,
            solver,
            span: info_span!("batch"),
        }
    }

    pub fn run(&self) -> Result<BatchSummary> {
        let _enter = self.span.enter();
        let files = &self.config.sphinx_file;

        let tags = discover_tags(&files.structure_dir, &files.spin_dir)
            .wrap_err("Unable to match structure and spin files")?;
        info!(
            "All structure files: {:?}",
            tags.iter().map(|t| &t.structure).collect::<Vec<_>>()
        );
        info!(
            "All spin files: {:?}",
            tags.iter().map(|t| &t.spin).collect::<Vec<_>>()
        );

        let workspace = SolverWorkspace::new(&files.working_dir);
        workspace
            .clean()
            .wrap_err_with(|| format!("Unable to clean {}", files.working_dir.display()))?;

        let dp = &self.config.dp_file;
        let mut writer = DpWriter::create(&dp.output_dir, dp.affine_parameter, info_span!("dataset"))
            .wrap_err_with(|| format!("Unable to create raw files in {}", dp.output_dir.display()))?;

        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!("Task begins for {} tag(s)", tags.len());
        let mut summary = BatchSummary {
            tags: tags.len(),
            ..Default::default()
        };

        for tag_files in &tags {
            let constraint = self.constraint_for(tag_files.tag)?;
            let task = SweepTask::new(
                tag_files,
                constraint,
                &workspace,
                &files.input_path,
                &self.solver,
            );
            let outcome = task
                .run(&mut writer, &mut rng)
                .wrap_err_with(|| format!("Sweep of tag {} failed", tag_files.tag))?;
            summary.accepted += outcome.accepted;
            summary.rejected += outcome.rejected;
        }

        summary.frames_written = writer.finish()?;
        info!("Task done");
        Ok(summary)
    }

    fn constraint_for(&self, tag: u64) -> Result<SpinConstraint> {
        let config_dir = &self.config.sphinx_file.config_dir;
        match find_constraint_file(config_dir, tag)? {
            Some(path) => {
                info!("Using constraints in file {} for Tag {}", path.display(), tag);
                Ok(SpinConstraint::from_file(&path)?)
            }
            None => {
                info!(
                    "Corresponding constraints not found, using default constraints for Tag {}",
                    tag
                );
                self.config
                    .spin_constraint
                    .clone()
                    .ok_or_else(|| eyre!("No constraint file for tag {} and no default constraint", tag))
            }
        }
    }
}
