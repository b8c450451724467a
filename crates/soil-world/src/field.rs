use std::ops::{Index, IndexMut};

/// Dense 2D array indexed by `(ii, jj)`, x-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Field2<T> {
    nx: usize,
    ny: usize,
    data: Vec<T>,
}

impl<T: Clone> Field2<T> {
    pub fn filled(nx: usize, ny: usize, value: T) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; nx * ny],
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T: Clone + Default> Field2<T> {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self::filled(nx, ny, T::default())
    }
}

impl<T> Field2<T> {
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    fn offset(&self, ii: usize, jj: usize) -> usize {
        debug_assert!(ii < self.nx && jj < self.ny, "({ii}, {jj}) out of bounds");
        ii * self.ny + jj
    }

    pub fn get(&self, ii: usize, jj: usize) -> Option<&T> {
        if ii < self.nx && jj < self.ny {
            Some(&self.data[ii * self.ny + jj])
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Iterates `((ii, jj), value)` in storage order.
    pub fn indexed_iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let ny = self.ny;
        self.data
            .iter()
            .enumerate()
            .map(move |(n, v)| ((n / ny, n % ny), v))
    }
}

impl<T> Index<(usize, usize)> for Field2<T> {
    type Output = T;
    #[inline]
    fn index(&self, (ii, jj): (usize, usize)) -> &T {
        &self.data[self.offset(ii, jj)]
    }
}

impl<T> IndexMut<(usize, usize)> for Field2<T> {
    #[inline]
    fn index_mut(&mut self, (ii, jj): (usize, usize)) -> &mut T {
        let n = self.offset(ii, jj);
        &mut self.data[n]
    }
}
