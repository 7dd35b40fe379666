//! Sum factorization for tensor product bases.
//!
//! A tensor product basis acts on an element by a sequence of one-dimensional contractions, one
//! per reference direction. Data is viewed as an array `[pre][B][post]` and contracted along the
//! middle index with a `J x B` matrix, producing `[pre][J][post]`. Node and point indices vary
//! with the first direction fastest, so the first contraction has `post = 1`.
use crate::Real;
use davenport::{define_thread_local_workspace, with_thread_local_workspace};
use nalgebra::DMatrix;

#[derive(Debug)]
pub(crate) struct ContractionBuffers<T> {
    current: Vec<T>,
    next: Vec<T>,
}

impl<T> Default for ContractionBuffers<T> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            next: Vec::new(),
        }
    }
}

define_thread_local_workspace!(WORKSPACE);

/// Runs `f` with the contraction buffers of the current thread.
pub(crate) fn with_contraction_buffers<T: Real, R>(f: impl FnOnce(&mut ContractionBuffers<T>) -> R) -> R {
    with_thread_local_workspace(&WORKSPACE, f)
}

/// Computes `v[a, j, c] = sum_b A[j, b] u[a, b, c]`, or adds it to `v` if `add` is set.
///
/// `A` is `matrix` or, if `transpose` is set, its transpose.
pub(crate) fn contract<T: Real>(
    matrix: &DMatrix<T>,
    transpose: bool,
    pre: usize,
    post: usize,
    u: &[T],
    v: &mut [T],
    add: bool,
) {
    let (j_len, b_len) = if transpose {
        (matrix.ncols(), matrix.nrows())
    } else {
        (matrix.nrows(), matrix.ncols())
    };
    debug_assert_eq!(u.len(), pre * b_len * post);
    debug_assert_eq!(v.len(), pre * j_len * post);

    if !add {
        v.fill(T::zero());
    }
    for a in 0..pre {
        for j in 0..j_len {
            let v_row = &mut v[(a * j_len + j) * post..(a * j_len + j + 1) * post];
            for b in 0..b_len {
                let coeff = if transpose { matrix[(b, j)] } else { matrix[(j, b)] };
                let u_row = &u[(a * b_len + b) * post..(a * b_len + b + 1) * post];
                for (v_c, u_c) in v_row.iter_mut().zip(u_row) {
                    *v_c += coeff * *u_c;
                }
            }
        }
    }
}

/// Applies one matrix per direction to data of `num_comp` components.
///
/// `matrices[d]` is the `Q x P` matrix for direction `d`. Without `transpose` the input is
/// `[num_comp][P^dim]` and the output `[num_comp][Q^dim]`, with `transpose` the roles are reversed.
pub(crate) fn tensor_contract<T: Real>(
    matrices: &[&DMatrix<T>],
    num_comp: usize,
    transpose: bool,
    u: &[T],
    v: &mut [T],
    add: bool,
    buffers: &mut ContractionBuffers<T>,
) {
    let dim = matrices.len();
    let (q, p) = matrices[0].shape();
    let (b_len, j_len) = if transpose { (q, p) } else { (p, q) };
    let mut pre = num_comp * b_len.pow(dim as u32 - 1);
    let mut post = 1;

    for (d, matrix) in matrices.iter().enumerate() {
        let last = d + 1 == dim;
        if last {
            let src: &[T] = if d == 0 { u } else { &buffers.current };
            contract(matrix, transpose, pre, post, src, v, add);
        } else {
            buffers
                .next
                .resize(pre * j_len * post, T::zero());
            let src: &[T] = if d == 0 { u } else { &buffers.current };
            contract(matrix, transpose, pre, post, src, &mut buffers.next, false);
            std::mem::swap(&mut buffers.current, &mut buffers.next);
        }
        pre /= b_len;
        post *= j_len;
    }
}

/// Tensor product of the one-dimensional quadrature weights, first direction fastest.
pub(crate) fn tensor_weights<T: Real>(weights_1d: &[T], dim: usize, output: &mut [T]) {
    let q = weights_1d.len();
    debug_assert_eq!(output.len(), q.pow(dim as u32));
    for (index, w) in output.iter_mut().enumerate() {
        let mut remainder = index;
        *w = T::one();
        for _ in 0..dim {
            *w *= weights_1d[remainder % q];
            remainder /= q;
        }
    }
}
