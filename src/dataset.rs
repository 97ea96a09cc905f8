//! DeePMD raw dataset writer
//!
//! Frames are appended to five parallel text files, one row per frame:
//!
//! - `box.raw`: cell, 9 values (Bohr)
//! - `coord.raw`: 3N coordinates followed by 3N pseudo-coordinates
//! - `type.raw`: N atom types followed by N pseudo-atom types, written once
//! - `energy.raw`: total energy (Hartree)
//! - `force.raw`: 3N forces (Hartree/Bohr) followed by 3N constraint
//!   multipliers (Hartree per unit spin)
//!
//! A pseudo-atom sits at `coordinate + affine_parameter * spin` and carries
//! type `type + number_of_species`, so spin reaches consumers that only read
//! positions.

use crate::error::{Result, SpinForceError};
use crate::io::text::{fmt_float, fmt_row};
use nalgebra::{Matrix3, Vector3};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, Span};

pub const BOX_FILE: &str = "box.raw";
pub const COORD_FILE: &str = "coord.raw";
pub const TYPE_FILE: &str = "type.raw";
pub const ENERGY_FILE: &str = "energy.raw";
pub const FORCE_FILE: &str = "force.raw";

/// One accepted solver result
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Lattice vectors as rows
    pub cell: Matrix3<f64>,
    pub coords: Vec<Vector3<f64>>,
    pub atom_types: Vec<usize>,
    /// Number of declared species, including empty ones
    pub type_count: usize,
    pub spins: Vec<Vector3<f64>>,
    pub energy: f64,
    pub forces: Vec<Vector3<f64>>,
    pub multipliers: Vec<Vector3<f64>>,
}

impl Frame {
    pub fn n_atoms(&self) -> usize {
        self.coords.len()
    }

    fn check_shapes(&self) -> Result<()> {
        let n = self.n_atoms();
        let shapes = [
            ("atom types", self.atom_types.len()),
            ("spins", self.spins.len()),
            ("forces", self.forces.len()),
            ("constraint multipliers", self.multipliers.len()),
        ];
        for (what, len) in shapes {
            if len != n {
                return Err(SpinForceError::config(format!(
                    "frame has {} coordinates but {} {}",
                    n, len, what
                )));
            }
        }
        Ok(())
    }

    /// Type row: real atoms then pseudo-atoms.
    pub fn type_layout(&self) -> Vec<usize> {
        self.atom_types
            .iter()
            .copied()
            .chain(self.atom_types.iter().map(|t| t + self.type_count))
            .collect()
    }

    pub fn pseudo_coords(&self, affine_parameter: f64) -> Vec<Vector3<f64>> {
        self.coords
            .iter()
            .zip(&self.spins)
            .map(|(r, s)| r + s * affine_parameter)
            .collect()
    }
}

/// Appends frames to the raw files of one output directory
pub struct DpWriter {
    output_dir: PathBuf,
    box_file: BufWriter<File>,
    coord_file: BufWriter<File>,
    type_file: BufWriter<File>,
    energy_file: BufWriter<File>,
    force_file: BufWriter<File>,
    type_written: Option<Vec<usize>>,
    affine_parameter: f64,
    num_frames: usize,
    span: Span,
}

impl DpWriter {
    /// Create the output directory if needed and start the five files afresh.
    pub fn create<P: AsRef<Path>>(output_dir: P, affine_parameter: f64, span: Span) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;

        let open = |name: &str| -> Result<BufWriter<File>> {
            let path = output_dir.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(BufWriter::new(file))
        };

        let box_file = open(BOX_FILE)?;
        let coord_file = open(COORD_FILE)?;
        let type_file = open(TYPE_FILE)?;
        let energy_file = open(ENERGY_FILE)?;
        let force_file = open(FORCE_FILE)?;

        let writer = Self {
            output_dir,
            box_file,
            coord_file,
            type_file,
            energy_file,
            force_file,
            type_written: None,
            affine_parameter,
            num_frames: 0,
            span,
        };

        writer.span.in_scope(|| {
            info!(
                "Using affine parameter {} to generate pseudo-coordinates from spins",
                affine_parameter
            );
        });
        Ok(writer)
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Append one frame. The type layout is checked before anything is
    /// written, so a rejected frame leaves every file untouched.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        frame.check_shapes()?;

        let layout = frame.type_layout();
        match &self.type_written {
            Some(first) if *first != layout => {
                tracing::error!("Atom type not consistent between frames!");
                return Err(SpinForceError::TypeMismatch {
                    frame: self.num_frames,
                });
            }
            Some(_) => {}
            None => {
                let row = layout
                    .iter()
                    .map(|t| format!("{:4}", t))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(self.type_file, "{}", row)?;
                self.type_file.flush()?;
                self.type_written = Some(layout);
            }
        }

        writeln!(self.box_file, "{}", fmt_row(self.cell_row(frame)))?;

        let pseudo = frame.pseudo_coords(self.affine_parameter);
        let coords = flatten(&frame.coords).chain(flatten(&pseudo));
        writeln!(self.coord_file, "{}", fmt_row(coords))?;

        writeln!(self.energy_file, "{}", fmt_float(frame.energy))?;

        let forces = flatten(&frame.forces).chain(flatten(&frame.multipliers));
        writeln!(self.force_file, "{}", fmt_row(forces))?;

        self.flush()?;
        self.num_frames += 1;
        Ok(())
    }

    fn cell_row(&self, frame: &Frame) -> Vec<f64> {
        (0..3)
            .flat_map(|i| (0..3).map(move |j| (i, j)))
            .map(|(i, j)| frame.cell[(i, j)])
            .collect()
    }

    fn flush(&mut self) -> Result<()> {
        self.box_file.flush()?;
        self.coord_file.flush()?;
        self.type_file.flush()?;
        self.energy_file.flush()?;
        self.force_file.flush()?;
        Ok(())
    }

    /// Flush and close the files, returning the number of frames written.
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        let _enter = self.span.enter();
        info!(
            "{} frames overall have been successfully written to {}",
            self.num_frames,
            self.output_dir.display()
        );
        Ok(self.num_frames)
    }
}

fn flatten(vectors: &[Vector3<f64>]) -> impl Iterator<Item = f64> + '_ {
    vectors.iter().flat_map(|v| v.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::text::parse_floats;
    use approx::assert_relative_eq;
    use tempfile::TempDir;
    use tracing::info_span;

    fn two_atom_frame(energy: f64) -> Frame {
        Frame {
            cell: Matrix3::new(10.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0),
            coords: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 3.0)],
            atom_types: vec![0, 1],
            type_count: 2,
            spins: vec![Vector3::new(0.0, 0.0, 2.0), Vector3::new(0.0, 0.0, -1.0)],
            energy,
            forces: vec![Vector3::new(0.1, 0.2, 0.3), Vector3::new(-0.1, -0.2, -0.3)],
            multipliers: vec![Vector3::new(0.0, 0.0, 0.01), Vector3::new(0.0, 0.0, -0.02)],
        }
    }

    fn rows(dir: &Path, name: &str) -> Vec<String> {
        fs::read_to_string(dir.join(name))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_type_layout_and_pseudo_coords() {
        let frame = two_atom_frame(-1.0);
        assert_eq!(frame.type_layout(), vec![0, 1, 2, 3]);
        let pseudo = frame.pseudo_coords(0.5);
        assert_eq!(pseudo[0], Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(pseudo[1], Vector3::new(1.0, 2.0, 2.5));
    }

    #[test]
    fn test_two_frames_same_layout() {
        let dir = TempDir::new().unwrap();
        let mut writer = DpWriter::create(dir.path(), 0.5, info_span!("dataset")).unwrap();
        writer.write_frame(&two_atom_frame(-1.0)).unwrap();
        writer.write_frame(&two_atom_frame(-2.0)).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let types = rows(dir.path(), TYPE_FILE);
        assert_eq!(types, vec!["   0    1    2    3".to_string()]);
        for name in [BOX_FILE, COORD_FILE, ENERGY_FILE, FORCE_FILE] {
            assert_eq!(rows(dir.path(), name).len(), 2, "{}", name);
        }

        let energies = parse_floats(&rows(dir.path(), ENERGY_FILE).join("\n")).unwrap();
        assert_eq!(energies, vec![-1.0, -2.0]);

        let coord = parse_floats(&rows(dir.path(), COORD_FILE)[0]).unwrap();
        assert_eq!(coord.len(), 12);
        assert_relative_eq!(coord[8], 1.0);
        assert_relative_eq!(coord[11], 2.5);

        let force = parse_floats(&rows(dir.path(), FORCE_FILE)[1]).unwrap();
        assert_eq!(force.len(), 12);
        assert_relative_eq!(force[0], 0.1);
        assert_relative_eq!(force[11], -0.02);

        let cell = parse_floats(&rows(dir.path(), BOX_FILE)[0]).unwrap();
        assert_eq!(cell, vec![10.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_type_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut writer = DpWriter::create(dir.path(), 0.5, info_span!("dataset")).unwrap();
        writer.write_frame(&two_atom_frame(-1.0)).unwrap();

        let mut swapped = two_atom_frame(-2.0);
        swapped.atom_types = vec![1, 0];
        let err = writer.write_frame(&swapped).unwrap_err();
        assert!(matches!(err, SpinForceError::TypeMismatch { frame: 1 }));

        assert_eq!(writer.num_frames(), 1);
        for name in [BOX_FILE, COORD_FILE, ENERGY_FILE, FORCE_FILE, TYPE_FILE] {
            assert_eq!(rows(dir.path(), name).len(), 1, "{}", name);
        }
    }

    #[test]
    fn test_existing_files_are_replaced() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(ENERGY_FILE), "1.0\n2.0\n").unwrap();

        let mut writer = DpWriter::create(dir.path(), 0.5, info_span!("dataset")).unwrap();
        writer.write_frame(&two_atom_frame(-3.0)).unwrap();
        writer.finish().unwrap();

        assert_eq!(rows(dir.path(), ENERGY_FILE).len(), 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut writer = DpWriter::create(dir.path().join("nested"), 0.5, info_span!("dataset")).unwrap();
        let mut frame = two_atom_frame(-1.0);
        frame.forces.pop();
        assert!(writer.write_frame(&frame).is_err());
        assert_eq!(writer.num_frames(), 0);
    }
}
