//! Grid definition and rectangular spatial chunking.

use std::ops::Range;

use gridver_accum::GridIndex;
use ndarray::{Array2, ArrayView2, s};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bbox::BoundingBox;
use crate::error::SpatialError;

/// Default chunk edge length in cells.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// A rectangular window `[i_start, i_end) x [j_start, j_end)` of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the enumeration that produced this chunk.
    pub chunk_id: usize,
    pub i_start: usize,
    pub i_end: usize,
    pub j_start: usize,
    pub j_end: usize,
}

impl Chunk {
    /// Width along `i`.
    pub fn ni(&self) -> usize {
        self.i_end - self.i_start
    }

    /// Height along `j`.
    pub fn nj(&self) -> usize {
        self.j_end - self.j_start
    }

    pub fn n_cells(&self) -> usize {
        self.ni() * self.nj()
    }

    /// Array shape of data covering this chunk, `(nj, ni)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nj(), self.ni())
    }

    pub fn contains(&self, index: GridIndex) -> bool {
        (self.i_start..self.i_end).contains(&index.i)
            && (self.j_start..self.j_end).contains(&index.j)
    }

    /// Global grid index of the chunk-local cell `(local_i, local_j)`.
    #[inline]
    pub fn global_index(&self, local_i: usize, local_j: usize) -> GridIndex {
        GridIndex::new(self.i_start + local_i, self.j_start + local_j)
    }

    /// Chunk-local `(j, i)` array position of a global index inside the chunk.
    pub fn local_position(&self, index: GridIndex) -> Option<(usize, usize)> {
        self.contains(index)
            .then(|| (index.j - self.j_start, index.i - self.i_start))
    }

    /// Global indices of every cell, row-major (j outer, i inner).
    pub fn indices(&self) -> impl Iterator<Item = GridIndex> + '_ {
        (self.j_start..self.j_end)
            .flat_map(move |j| (self.i_start..self.i_end).map(move |i| GridIndex::new(i, j)))
    }
}

/// Summary of a grid and its default chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridInfo {
    pub ni: usize,
    pub nj: usize,
    pub total_gridpoints: usize,
    pub chunk_size: (usize, usize),
    pub num_chunks: usize,
    pub has_coordinates: bool,
}

/// Owns grid dimensions, optional 2-D coordinates and the chunk size.
///
/// Coordinate arrays have shape `(nj, ni)`: rows run along `j`, columns
/// along `i`.
#[derive(Debug, Clone)]
pub struct GridManager {
    ni: usize,
    nj: usize,
    chunk_i: usize,
    chunk_j: usize,
    lats: Option<Array2<f64>>,
    lons: Option<Array2<f64>>,
}

impl GridManager {
    /// A grid of `ni x nj` cells with the default chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidGridSize`] if either dimension is zero.
    pub fn new(ni: usize, nj: usize) -> Result<Self, SpatialError> {
        if ni == 0 || nj == 0 {
            return Err(SpatialError::InvalidGridSize { ni, nj });
        }
        Ok(Self {
            ni,
            nj,
            chunk_i: DEFAULT_CHUNK_SIZE,
            chunk_j: DEFAULT_CHUNK_SIZE,
            lats: None,
            lons: None,
        })
    }

    /// Set the chunk size `(chunk_i, chunk_j)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidChunkSize`] if either dimension is zero.
    pub fn with_chunk_size(mut self, chunk_i: usize, chunk_j: usize) -> Result<Self, SpatialError> {
        self.set_chunk_size(chunk_i, chunk_j)?;
        Ok(self)
    }

    pub fn set_chunk_size(&mut self, chunk_i: usize, chunk_j: usize) -> Result<(), SpatialError> {
        if chunk_i == 0 || chunk_j == 0 {
            return Err(SpatialError::InvalidChunkSize { chunk_i, chunk_j });
        }
        self.chunk_i = chunk_i;
        self.chunk_j = chunk_j;
        Ok(())
    }

    /// Attach coordinates; see [`set_coordinates`](Self::set_coordinates).
    pub fn with_coordinates(
        mut self,
        lats: Array2<f64>,
        lons: Array2<f64>,
    ) -> Result<Self, SpatialError> {
        self.set_coordinates(lats, lons)?;
        Ok(self)
    }

    /// Replaces the coordinate arrays.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CoordinateShape`] unless both arrays have
    /// shape `(nj, ni)`; the previous coordinates are kept in that case.
    pub fn set_coordinates(
        &mut self,
        lats: Array2<f64>,
        lons: Array2<f64>,
    ) -> Result<(), SpatialError> {
        let expected = (self.nj, self.ni);
        for (name, arr) in [("latitude", &lats), ("longitude", &lons)] {
            if arr.dim() != expected {
                return Err(SpatialError::CoordinateShape {
                    name,
                    expected,
                    got: arr.dim(),
                });
            }
        }
        self.lats = Some(lats);
        self.lons = Some(lons);
        Ok(())
    }

    pub fn ni(&self) -> usize {
        self.ni
    }

    pub fn nj(&self) -> usize {
        self.nj
    }

    pub fn chunk_size(&self) -> (usize, usize) {
        (self.chunk_i, self.chunk_j)
    }

    pub fn total_gridpoints(&self) -> usize {
        self.ni * self.nj
    }

    pub fn has_coordinates(&self) -> bool {
        self.lats.is_some() && self.lons.is_some()
    }

    /// Both coordinate arrays, or [`SpatialError::CoordinatesUnavailable`].
    pub fn coordinates(&self) -> Result<(ArrayView2<'_, f64>, ArrayView2<'_, f64>), SpatialError> {
        match (&self.lats, &self.lons) {
            (Some(lats), Some(lons)) => Ok((lats.view(), lons.view())),
            _ => Err(SpatialError::CoordinatesUnavailable),
        }
    }

    /// `(lat, lon)` of one cell, if coordinates are set and the index is on the grid.
    pub fn coordinate(&self, index: GridIndex) -> Option<(f64, f64)> {
        let (lats, lons) = self.coordinates().ok()?;
        let lat = *lats.get((index.j, index.i))?;
        let lon = *lons.get((index.j, index.i))?;
        Some((lat, lon))
    }

    /// Partitions the grid, or the part of it inside `bbox`, into chunks.
    ///
    /// Chunks are enumerated row-major (j outer, i inner) and clipped at the
    /// edges of the index range, so the last chunk of a row or column may be
    /// smaller. Chunk ids follow enumeration order and are stable for the
    /// same grid, chunk size and bbox.
    ///
    /// # Errors
    ///
    /// With a `bbox`: [`SpatialError::CoordinatesUnavailable`] if no
    /// coordinates are set, or [`SpatialError::BboxOutsideGrid`] if no cell
    /// lies inside it.
    pub fn get_chunks(&self, bbox: Option<&BoundingBox>) -> Result<Vec<Chunk>, SpatialError> {
        let (i_range, j_range) = match bbox {
            Some(bbox) => self.bbox_index_range(bbox)?,
            None => (0..self.ni, 0..self.nj),
        };
        let chunks = self.chunks_in(i_range, j_range);
        info!(
            n_chunks = chunks.len(),
            chunk_i = self.chunk_i,
            chunk_j = self.chunk_j,
            "created spatial chunks"
        );
        Ok(chunks)
    }

    fn chunks_in(&self, i_range: Range<usize>, j_range: Range<usize>) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for j_start in j_range.clone().step_by(self.chunk_j) {
            let j_end = (j_start + self.chunk_j).min(j_range.end);
            for i_start in i_range.clone().step_by(self.chunk_i) {
                let i_end = (i_start + self.chunk_i).min(i_range.end);
                chunks.push(Chunk {
                    chunk_id: chunks.len(),
                    i_start,
                    i_end,
                    j_start,
                    j_end,
                });
            }
        }
        chunks
    }

    /// Smallest index rectangle holding every cell whose coordinates fall in `bbox`.
    ///
    /// Cells with non-finite coordinates never match.
    pub fn bbox_index_range(
        &self,
        bbox: &BoundingBox,
    ) -> Result<(Range<usize>, Range<usize>), SpatialError> {
        bbox.validate()?;
        let (lats, lons) = self.coordinates()?;

        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for ((j, i), &lat) in lats.indexed_iter() {
            if !bbox.contains(lat, lons[(j, i)]) {
                continue;
            }
            bounds = Some(match bounds {
                None => (i, i, j, j),
                Some((i0, i1, j0, j1)) => (i0.min(i), i1.max(i), j0.min(j), j1.max(j)),
            });
        }

        let (i0, i1, j0, j1) = bounds.ok_or(SpatialError::BboxOutsideGrid { bbox: *bbox })?;
        debug!(i_start = i0, i_end = i1 + 1, j_start = j0, j_end = j1 + 1, "bbox index range");
        Ok((i0..i1 + 1, j0..j1 + 1))
    }

    /// Latitude and longitude views covering `chunk`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CoordinatesUnavailable`] if coordinates are not set.
    pub fn chunk_coords(
        &self,
        chunk: &Chunk,
    ) -> Result<(ArrayView2<'_, f64>, ArrayView2<'_, f64>), SpatialError> {
        let (lats, lons) = self.coordinates()?;
        Ok((
            lats.slice_move(s![chunk.j_start..chunk.j_end, chunk.i_start..chunk.i_end]),
            lons.slice_move(s![chunk.j_start..chunk.j_end, chunk.i_start..chunk.i_end]),
        ))
    }

    pub fn grid_info(&self) -> GridInfo {
        GridInfo {
            ni: self.ni,
            nj: self.nj,
            total_gridpoints: self.total_gridpoints(),
            chunk_size: self.chunk_size(),
            num_chunks: self.chunks_in(0..self.ni, 0..self.nj).len(),
            has_coordinates: self.has_coordinates(),
        }
    }
}
