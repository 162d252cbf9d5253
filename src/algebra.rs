use crate::ConfigurationError;
use color_eyre::Report;
use nalgebra::{DMatrix, DVector};
use vector::Momentum;

pub type Matrix = DMatrix<f64>;
pub type Vector = DVector<f64>;

/// Metric tensor with signature `(-, -, -, +)` in the `(px, py, pz, E)` ordering.
pub fn metric() -> Matrix {
    Matrix::from_diagonal(&Vector::from_column_slice(&[-1., -1., -1., 1.]))
}

pub fn to_vector(p: &Momentum) -> Vector {
    Vector::from_column_slice(&[p.px(), p.py(), p.pz(), p.energy()])
}

pub fn determinant(m: &Matrix) -> f64 {
    m.determinant()
}

/// Solve `m x = b` with an LU decomposition.
pub fn solve(m: &Matrix, b: &Vector) -> Result<Vector, Report> {
    if !m.is_square() || m.nrows() != b.len() {
        return Err(ConfigurationError::InvalidSetting(format!(
            "cannot solve a {}x{} system with a right-hand side of size {}",
            m.nrows(),
            m.ncols(),
            b.len()
        ))
        .into());
    }
    m.clone()
        .lu()
        .solve(b)
        .ok_or_else(|| Report::msg("Singular matrix in linear solve"))
}

pub fn inverse(m: &Matrix) -> Result<Matrix, Report> {
    m.clone()
        .try_inverse()
        .ok_or_else(|| Report::msg("Matrix is not invertible"))
}

/// Matrix of Minkowski products `p_i . p_j`.
pub fn gram_matrix(momenta: &[Momentum]) -> Matrix {
    Matrix::from_fn(momenta.len(), momenta.len(), |i, j| {
        momenta[i].four_product(&momenta[j])
    })
}

pub fn gram_determinant(momenta: &[Momentum]) -> f64 {
    gram_matrix(momenta).determinant()
}

/// Coefficients `c` such that `p = sum_i c_i basis_i` for four independent basis momenta.
pub fn decompose(p: &Momentum, basis: &[Momentum; 4]) -> Result<[f64; 4], Report> {
    let m = Matrix::from_fn(4, 4, |i, j| basis[j][i]);
    let c = solve(&m, &to_vector(p))?;
    Ok([c[0], c[1], c[2], c[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solve_small_system() {
        let m = Matrix::from_row_slice(3, 3, &[2., 1., 0., 1., 3., 1., 0., 1., 4.]);
        let b = Vector::from_column_slice(&[3., 5., 5.]);
        let x = solve(&m, &b).unwrap();
        for (xi, ei) in x.iter().zip(&[1., 1., 1.]) {
            assert!((xi - ei).abs() < 1e-12);
        }

        let inv = inverse(&m).unwrap();
        let id = &m * &inv;
        assert!((determinant(&id) - 1.).abs() < 1e-12);
    }

    #[test]
    fn singular_system_is_an_error() {
        let m = Matrix::from_row_slice(2, 2, &[1., 2., 2., 4.]);
        assert!(solve(&m, &Vector::from_column_slice(&[1., 1.])).is_err());
        assert!(solve(&m, &Vector::from_column_slice(&[1., 1., 1.])).is_err());
    }

    #[test]
    fn gram_matrix_of_a_momentum_is_its_mass() {
        let p = Momentum::from_px_py_pz_m(1., 2., 3., 4.);
        assert!((gram_determinant(&[p]) - 16.).abs() < 1e-9);
        let q = to_vector(&p);
        assert!(((q.transpose() * metric() * &q)[0] - 16.).abs() < 1e-9);
    }

    #[test]
    fn decomposition_reconstructs_momentum() {
        let basis = [
            Momentum::from_px_py_pz_e(0., 0., 1., 1.),
            Momentum::from_px_py_pz_e(0., 0., -1., 1.),
            Momentum::from_px_py_pz_e(1., 0., 0., 0.),
            Momentum::from_px_py_pz_e(0., 1., 0., 0.),
        ];
        let p = Momentum::from_px_py_pz_e(0.5, -0.25, 3., 5.);
        let c = decompose(&p, &basis).unwrap();
        assert!((c[0] - 4.).abs() < 1e-12);
        assert!((c[1] - 1.).abs() < 1e-12);
        assert!((c[2] - 0.5).abs() < 1e-12);
        assert!((c[3] + 0.25).abs() < 1e-12);
    }
}
