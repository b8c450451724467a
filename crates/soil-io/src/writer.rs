//! CSV snapshots of the terrain, the body soil and the body outline.

use log::debug;
use soil_geom::Vec3;
use soil_world::{Body, Grid, Layer, SimOut};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_INDEX: u32 = 100_000;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("every result index up to {MAX_INDEX} is taken in {0}")]
    Exhausted(PathBuf),
}

/// Writes numbered `terrain_`, `body_soil_` and `bucket_` files into one
/// directory. Each call takes the first index whose terrain file does not
/// exist yet.
pub struct ResultsWriter {
    dir: PathBuf,
}

impl ResultsWriter {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, WriteError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| WriteError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, prefix: &str, index: u32) -> PathBuf {
        self.dir.join(format!("{prefix}_{index:05}.csv"))
    }

    fn next_index(&self) -> Result<u32, WriteError> {
        (0..MAX_INDEX)
            .find(|&n| !self.file("terrain", n).exists())
            .ok_or_else(|| WriteError::Exhausted(self.dir.clone()))
    }

    /// Writes one snapshot and returns its index.
    pub fn write(&self, sim_out: &SimOut, grid: &Grid, body: &Body) -> Result<u32, WriteError> {
        let index = self.next_index()?;
        write_csv(&self.file("terrain", index), |w| write_terrain(w, sim_out, grid))?;
        write_csv(&self.file("body_soil", index), |w| write_body_soil(w, sim_out, grid))?;
        write_csv(&self.file("bucket", index), |w| write_body(w, body))?;
        debug!("wrote results {index:05} to {}", self.dir.display());
        Ok(index)
    }
}

fn write_csv<F>(path: &Path, body: F) -> Result<(), WriteError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let run = || -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "x,y,z")?;
        body(&mut w)?;
        w.flush()
    };
    run().map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_terrain<W: Write>(w: &mut W, sim_out: &SimOut, grid: &Grid) -> io::Result<()> {
    for ((ii, jj), h) in sim_out.terrain.indexed_iter() {
        writeln!(w, "{},{},{}", grid.vect_x[ii], grid.vect_y[jj], h)?;
    }
    Ok(())
}

/// Top of every body soil interval. A single row at the grid origin stands
/// in for an empty journal so that the file is never empty.
fn write_body_soil<W: Write>(w: &mut W, sim_out: &SimOut, grid: &Grid) -> io::Result<()> {
    if sim_out.body_soil_pos.is_empty() {
        return writeln!(w, "{},{},{}", grid.vect_x[0], grid.vect_y[0], grid.vect_z[0]);
    }
    for ii in 0..grid.size_x() {
        for jj in 0..grid.size_y() {
            for layer in Layer::ALL {
                if let Some(s) = sim_out.body_soil[(layer, ii, jj)] {
                    writeln!(w, "{},{},{}", grid.vect_x[ii], grid.vect_y[jj], s.max)?;
                }
            }
        }
    }
    Ok(())
}

/// Outline of the body at its current pose: right side, back, base and
/// left side.
fn write_body<W: Write>(w: &mut W, body: &Body) -> io::Result<()> {
    let c = body.corners(&body.current_pose());
    let outline: [Vec3; 14] = [
        c.b_r, c.t_r, c.j_r, // right side
        c.j_r, c.j_l, c.b_l, c.b_r, // back
        c.b_r, c.t_r, c.t_l, c.b_l, // base
        c.b_l, c.t_l, c.j_l, // left side
    ];
    for p in outline {
        writeln!(w, "{},{},{}", p.x, p.y, p.z)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use soil_world::Span;

    fn setup() -> (Grid, SimOut, Body) {
        let grid = Grid::new(0.1, 0.1, 0.1, 0.05, 0.01).unwrap();
        let out = SimOut::new(&grid);
        let body = Body::bucket(
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -0.05),
            Vec3::new(0.05, 0.0, -0.05),
            0.05,
        )
        .unwrap();
        (grid, out, body)
    }

    #[test]
    fn empty_journal_writes_origin_row() {
        let (grid, out, _) = setup();
        let mut buf = Vec::new();
        write_body_soil(&mut buf, &out, &grid).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("-0.1,-0.1,"));
    }

    #[test]
    fn body_soil_rows_hold_interval_tops() {
        let (grid, mut out, _) = setup();
        out.body_soil[(Layer::First, 1, 2)] = Some(Span::new(0.0, 0.03));
        out.body_soil[(Layer::Second, 1, 2)] = Some(Span::new(0.05, 0.07));
        out.body_soil_pos.push(soil_world::BodySoil {
            layer: Layer::First,
            ii: 1,
            jj: 2,
            pos: Vec3::ZERO,
            h_soil: 0.03,
        });
        let mut buf = Vec::new();
        write_body_soil(&mut buf, &out, &grid).unwrap();
        let rows: Vec<&str> = std::str::from_utf8(&buf).unwrap().lines().collect();
        assert_eq!(rows, vec!["-0.05,0,0.03", "-0.05,0,0.07"]);
    }

    #[test]
    fn body_outline_has_fourteen_rows() {
        let (_, _, body) = setup();
        let mut buf = Vec::new();
        write_body(&mut buf, &body).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 14);
    }
}
