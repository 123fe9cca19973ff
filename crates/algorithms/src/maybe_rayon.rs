//! Rayon or sequential iteration, chosen by the `parallel` feature.
//!
//! Kernels in this crate only call `into_par_iter()` on ranges and
//! vectors. Without `parallel` that call resolves to `into_iter()`, and the
//! rest of the chain (`map`, `flat_map`, `collect`) uses `Iterator`.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
pub trait IntoParallelIterator {
    type Iter: Iterator<Item = Self::Item>;
    type Item;
    fn into_par_iter(self) -> Self::Iter;
}

#[cfg(not(feature = "parallel"))]
impl<I: IntoIterator> IntoParallelIterator for I {
    type Iter = I::IntoIter;
    type Item = I::Item;
    fn into_par_iter(self) -> Self::Iter {
        self.into_iter()
    }
}
