//! Fixed-size worker pool for the parallel phases of an atlas build.
//!
//! Each phase splits its data into one contiguous range per worker, runs the
//! ranges, and joins before returning. Ranges never overlap, so workers never
//! share a mutable element.

use crate::error::Result;

#[cfg(feature = "parallel")]
use crate::error::ContentError;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// One worker per logical processor.
    pub fn detect() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Items per range when `len` items are split across the workers.
    pub fn range_len(&self, len: usize) -> usize {
        len.div_ceil(self.workers).max(1)
    }

    /// Runs `f` on each contiguous range of `items`, passing the index of the
    /// range's first item.
    pub fn for_each_range<T, F>(&self, items: &mut [T], f: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
    {
        let chunk = self.range_len(items.len());
        self.run(items, chunk, f)
    }

    /// Splits a row-major buffer into bands of whole rows, passing each band's
    /// first row index.
    pub fn for_each_row_band<T, F>(&self, buf: &mut [T], row_len: usize, f: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
    {
        if row_len == 0 {
            return Ok(());
        }
        let rows = buf.len() / row_len;
        let chunk = self.range_len(rows) * row_len;
        self.run(buf, chunk, |start, band| f(start / row_len, band))
    }

    fn run<T, F>(&self, items: &mut [T], chunk: usize, f: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> Result<()> + Sync + Send,
    {
        if items.is_empty() {
            return Ok(());
        }
        #[cfg(feature = "parallel")]
        let result = {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(|e| ContentError::WorkerPool(e.to_string()))?;
            pool.install(|| {
                items
                    .par_chunks_mut(chunk)
                    .enumerate()
                    .try_for_each(|(i, part)| f(i * chunk, part))
            })
        };
        #[cfg(not(feature = "parallel"))]
        let result = items
            .chunks_mut(chunk)
            .enumerate()
            .try_for_each(|(i, part)| f(i * chunk, part));
        result
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_every_item_once() {
        let pool = WorkerPool::new(3);
        let mut items: Vec<usize> = vec![0; 10];
        pool.for_each_range(&mut items, |start, part| {
            for (i, v) in part.iter_mut().enumerate() {
                *v = start + i;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(items, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn row_bands_start_on_row_boundaries() {
        let pool = WorkerPool::new(4);
        let mut buf = vec![0u32; 7 * 5];
        pool.for_each_row_band(&mut buf, 5, |first_row, band| {
            assert_eq!(band.len() % 5, 0);
            for (i, row) in band.chunks_mut(5).enumerate() {
                row.fill((first_row + i) as u32);
            }
            Ok(())
        })
        .unwrap();
        for (y, row) in buf.chunks(5).enumerate() {
            assert!(row.iter().all(|&v| v == y as u32));
        }
    }
}
