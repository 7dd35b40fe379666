//! QFunctions for common operators, available by name.
//!
//! The `*Build` QFunctions compute geometric factors from the reference gradient `dx` of the
//! coordinate field and the quadrature weights. The Jacobian entry for coordinate `c` and
//! reference direction `d` is component `d * dim + c` of `dx`. Symmetric matrices are stored
//! in Voigt order: `[00, 11, 01]` in 2D and `[00, 11, 22, 12, 02, 01]` in 3D.
use crate::qfunction::{QFunction, QFunctionContext};
use crate::{Ceed, Error, EvalMode, Real, Result};
use eyre::eyre;
use nalgebra::{Matrix2, Matrix3};
use std::sync::Arc;

/// Names of the QFunctions in the gallery.
pub const GALLERY: [&str; 12] = [
    "Identity",
    "Scale",
    "MassApply",
    "Mass1DBuild",
    "Mass2DBuild",
    "Mass3DBuild",
    "Poisson1DBuild",
    "Poisson2DBuild",
    "Poisson3DBuild",
    "Poisson1DApply",
    "Poisson2DApply",
    "Poisson3DApply",
];

pub(super) fn build<T: Real>(ceed: &Ceed<T>, name: &str) -> Result<QFunction<T>> {
    match name {
        "Identity" => identity(ceed, 1, EvalMode::Interp, EvalMode::Interp),
        "Scale" => scale(ceed, 1, T::one()),
        "MassApply" => mass_apply(ceed),
        "Mass1DBuild" => mass_build(ceed, 1),
        "Mass2DBuild" => mass_build(ceed, 2),
        "Mass3DBuild" => mass_build(ceed, 3),
        "Poisson1DBuild" => poisson_build(ceed, 1),
        "Poisson2DBuild" => poisson_build(ceed, 2),
        "Poisson3DBuild" => poisson_build(ceed, 3),
        "Poisson1DApply" => poisson_apply(ceed, 1),
        "Poisson2DApply" => poisson_apply(ceed, 2),
        "Poisson3DApply" => poisson_apply(ceed, 3),
        _ => Err(Error::configuration(format!(
            "no gallery QFunction named \"{}\", available: {}",
            name,
            GALLERY.join(", ")
        ))
        .with_object("QFunction")),
    }
}

pub(super) fn identity<T: Real>(
    ceed: &Ceed<T>,
    size: usize,
    in_mode: EvalMode,
    out_mode: EvalMode,
) -> Result<QFunction<T>> {
    ceed.q_function_interior(1, |_ctx, _q, inputs, outputs| {
        outputs[0].copy_from_slice(inputs[0]);
        Ok(())
    })
    .input("input", size, in_mode)?
    .output("output", size, out_mode)
}

pub(super) fn scale<T: Real>(ceed: &Ceed<T>, size: usize, alpha: T) -> Result<QFunction<T>> {
    ceed.q_function_interior(1, |ctx, _q, inputs, outputs| {
        let alpha = *ctx.get::<T>()?;
        for (v, u) in outputs[0].iter_mut().zip(inputs[0]) {
            *v = alpha * *u;
        }
        Ok(())
    })
    .context(Arc::new(QFunctionContext::new(alpha)))
    .input("input", size, EvalMode::Interp)?
    .output("output", size, EvalMode::Interp)
}

fn mass_apply<T: Real>(ceed: &Ceed<T>) -> Result<QFunction<T>> {
    ceed.q_function_interior(1, |_ctx, q, inputs, outputs| {
        let (u, q_data) = (inputs[0], inputs[1]);
        for i in 0..q {
            outputs[0][i] = q_data[i] * u[i];
        }
        Ok(())
    })
    .input("u", 1, EvalMode::Interp)?
    .input("qdata", 1, EvalMode::None)?
    .output("v", 1, EvalMode::Interp)
}

fn jacobian2<T: Real>(dx: &[T], q: usize, i: usize) -> Matrix2<T> {
    Matrix2::from_fn(|c, d| dx[(d * 2 + c) * q + i])
}

fn jacobian3<T: Real>(dx: &[T], q: usize, i: usize) -> Matrix3<T> {
    Matrix3::from_fn(|c, d| dx[(d * 3 + c) * q + i])
}

fn mass_build<T: Real>(ceed: &Ceed<T>, dim: usize) -> Result<QFunction<T>> {
    ceed.q_function_interior(1, move |_ctx, q, inputs, outputs| {
        let (dx, w) = (inputs[0], inputs[1]);
        for i in 0..q {
            let det = match dim {
                1 => dx[i],
                2 => jacobian2(dx, q, i).determinant(),
                _ => jacobian3(dx, q, i).determinant(),
            };
            outputs[0][i] = det * w[i];
        }
        Ok(())
    })
    .input("dx", dim * dim, EvalMode::Grad)?
    .input("weights", 1, EvalMode::Weight)?
    .output("qdata", 1, EvalMode::None)
}

fn poisson_q_data_size(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

fn poisson_build<T: Real>(ceed: &Ceed<T>, dim: usize) -> Result<QFunction<T>> {
    ceed.q_function_interior(1, move |_ctx, q, inputs, outputs| {
        let (dx, w) = (inputs[0], inputs[1]);
        let q_data = &mut *outputs[0];
        for i in 0..q {
            match dim {
                1 => {
                    if dx[i].is_zero() {
                        return Err(eyre!("singular Jacobian at quadrature point {}", i));
                    }
                    q_data[i] = w[i] / dx[i];
                }
                2 => {
                    let j = jacobian2(dx, q, i);
                    let det = j.determinant();
                    let j_inv = j
                        .try_inverse()
                        .ok_or_else(|| eyre!("singular Jacobian at quadrature point {}", i))?;
                    let g = j_inv * j_inv.transpose() * (w[i] * det);
                    for (k, (r, c)) in [(0, 0), (1, 1), (0, 1)].into_iter().enumerate() {
                        q_data[k * q + i] = g[(r, c)];
                    }
                }
                _ => {
                    let j = jacobian3(dx, q, i);
                    let det = j.determinant();
                    let j_inv = j
                        .try_inverse()
                        .ok_or_else(|| eyre!("singular Jacobian at quadrature point {}", i))?;
                    let g = j_inv * j_inv.transpose() * (w[i] * det);
                    let voigt = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];
                    for (k, (r, c)) in voigt.into_iter().enumerate() {
                        q_data[k * q + i] = g[(r, c)];
                    }
                }
            }
        }
        Ok(())
    })
    .input("dx", dim * dim, EvalMode::Grad)?
    .input("weights", 1, EvalMode::Weight)?
    .output("qdata", poisson_q_data_size(dim), EvalMode::None)
}

fn poisson_apply<T: Real>(ceed: &Ceed<T>, dim: usize) -> Result<QFunction<T>> {
    ceed.q_function_interior(1, move |_ctx, q, inputs, outputs| {
        let (du, q_data) = (inputs[0], inputs[1]);
        let dv = &mut *outputs[0];
        for i in 0..q {
            match dim {
                1 => dv[i] = q_data[i] * du[i],
                2 => {
                    let g = |k: usize| q_data[k * q + i];
                    let (du0, du1) = (du[i], du[q + i]);
                    dv[i] = g(0) * du0 + g(2) * du1;
                    dv[q + i] = g(2) * du0 + g(1) * du1;
                }
                _ => {
                    let g = |k: usize| q_data[k * q + i];
                    let (du0, du1, du2) = (du[i], du[q + i], du[2 * q + i]);
                    dv[i] = g(0) * du0 + g(5) * du1 + g(4) * du2;
                    dv[q + i] = g(5) * du0 + g(1) * du1 + g(3) * du2;
                    dv[2 * q + i] = g(4) * du0 + g(3) * du1 + g(2) * du2;
                }
            }
        }
        Ok(())
    })
    .input("du", dim, EvalMode::Grad)?
    .input("qdata", poisson_q_data_size(dim), EvalMode::None)?
    .output("dv", dim, EvalMode::Grad)
}
