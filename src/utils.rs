/// Källén triangle function `λ(x, y, z) = x² + y² + z² - 2xy - 2xz - 2yz`.
#[inline]
pub fn kallen(x: f64, y: f64, z: f64) -> f64 {
    x * x + y * y + z * z - 2. * (x * y + x * z + y * z)
}

/// Format a value with its uncertainty in the compact `1.2345(67)e-3` notation,
/// keeping two significant digits of the uncertainty.
pub fn format_uncertainty(mean: f64, sdev: f64) -> String {
    if !mean.is_finite() || !sdev.is_finite() {
        return format!("{:e} +- {:e}", mean, sdev);
    }
    if sdev == 0. {
        return format!("{:e}", mean);
    }

    let exponent = if mean != 0. {
        mean.abs().log10().floor() as i32
    } else {
        sdev.abs().log10().floor() as i32
    };
    let scale = 10f64.powi(exponent);
    let (m, s) = (mean / scale, sdev.abs() / scale);

    // number of decimals that keeps two significant digits of the error
    let decimals = (1 - s.log10().floor() as i32).max(0) as usize;
    let err_digits = (s * 10f64.powi(decimals as i32)).round() as u64;

    if exponent == 0 {
        format!("{:.*}({})", decimals, m, err_digits)
    } else {
        format!("{:.*}({})e{}", decimals, m, err_digits, exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kallen_of_massless_pair() {
        assert_eq!(kallen(100., 0., 0.), 1e4);
        assert_eq!(kallen(4., 1., 1.), 0.);
        assert!(kallen(1., 4., 0.) > 0.);
    }

    #[test]
    fn uncertainty_notation() {
        assert_eq!(format_uncertainty(1.23456, 0.0012), "1.2346(12)");
        assert_eq!(format_uncertainty(123.456, 2.5), "1.235(25)e2");
        assert_eq!(format_uncertainty(-0.05, 0.01), "-5.0(10)e-2");
        assert_eq!(format_uncertainty(3., 0.), "3e0");
    }
}
