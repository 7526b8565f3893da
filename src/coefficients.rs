//! Bogacki–Shampine 3(2) Coefficients
//!
//! Four-stage embedded pair from:
//! Bogacki, P. & Shampine, L.F. (1989). "A 3(2) pair of Runge-Kutta
//! formulas". Applied Mathematics Letters 2(4), 321-325.
//!
//! The last row of `A` holds the third-order weights, so the fourth stage
//! is evaluated at the end of the step and can be handed to the next step
//! as its first stage (first-same-as-last). The state is advanced with the
//! four-stage combination `B`; `B_ERR` yields the local error estimate.

/// Number of stages in the Bogacki–Shampine method
pub const STAGES: usize = 4;

/// Order of the method that positions the final stage
pub const ORDER: u8 = 3;

/// Order of the embedded combination
pub const EMBEDDED_ORDER: u8 = 2;

/// Node coefficients (c_i): stage i is evaluated at t_n + c[i]*h
pub const C: [f64; STAGES] = [
    0.0,        // c[0]
    0.5,        // c[1] = 1/2
    0.75,       // c[2] = 3/4
    1.0,        // c[3] = 1
];

/// Runge-Kutta matrix (a_ij), stored as A[i][j] for j < i
///
/// k_i = f(t_n + c_i*h, y_n + h * sum_{j=0}^{i-1} a_{i,j} * k_j)
pub const A: [[f64; 3]; STAGES] = [
    // Row 0: k_0 = f(t_n, y_n), reused from the previous step
    [0.0; 3],

    // Row 1: k_1 = f(t_n + h/2, y_n + (h/2)*k_0)
    [0.5, 0.0, 0.0],

    // Row 2: k_2 = f(t_n + 3h/4, y_n + (3h/4)*k_1)
    [0.0, 0.75, 0.0],

    // Row 3: k_3 = f(t_n + h, y_n + (h/9)*(2*k_0 + 3*k_1 + 4*k_2))
    [2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
];

/// Weights used to advance the state (b_i)
///
/// y_{n+1} = y_n + (h/24) * (7*k_0 + 6*k_1 + 8*k_2 + 3*k_3)
pub const B: [f64; STAGES] = [
    7.0 / 24.0,     // b[0]
    1.0 / 4.0,      // b[1]
    1.0 / 3.0,      // b[2]
    1.0 / 8.0,      // b[3]
];

/// Error estimation weights
///
/// err = h * sum_i B_ERR[i] * k_i, the difference between the
/// third-order weights (row 3 of `A`) and `B`, up to sign.
pub const B_ERR: [f64; STAGES] = [
    5.0 / 72.0,     // err[0]
    -1.0 / 12.0,    // err[1]
    -1.0 / 9.0,     // err[2]
    1.0 / 8.0,      // err[3]
];

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-15;

    #[test]
    fn test_row_sums_equal_nodes() {
        for i in 0..STAGES {
            let row_sum: f64 = A[i].iter().take(i).sum();
            assert!(
                (row_sum - C[i]).abs() < TOL,
                "Row {} sum {} != c[{}] = {}",
                i,
                row_sum,
                i,
                C[i]
            );
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = B.iter().sum();
        assert!((sum - 1.0).abs() < TOL, "sum(b) = {}", sum);

        let third_order: f64 = A[STAGES - 1].iter().sum();
        assert!((third_order - 1.0).abs() < TOL, "sum(a_3j) = {}", third_order);
    }

    #[test]
    fn test_error_weights_sum_to_zero() {
        let sum: f64 = B_ERR.iter().sum();
        assert!(sum.abs() < TOL, "sum(b_err) = {}", sum);
    }

    #[test]
    fn test_error_weights_are_weight_difference() {
        // b - b_hat, with the third-order weights taken from the last row of A
        // (its fourth entry is implicitly zero).
        for i in 0..STAGES {
            let third = if i < STAGES - 1 { A[STAGES - 1][i] } else { 0.0 };
            let diff = B[i] - third;
            assert!(
                (diff - B_ERR[i]).abs() < TOL,
                "b[{}] - b_hat[{}] = {}, expected {}",
                i,
                i,
                diff,
                B_ERR[i]
            );
        }
    }

    #[test]
    fn test_order_conditions() {
        // Third-order conditions for the weights in the last row of A:
        // sum b_i c_i = 1/2, sum b_i c_i^2 = 1/3, sum b_i a_ij c_j = 1/6
        let b3 = [A[3][0], A[3][1], A[3][2], 0.0];
        let c1: f64 = (0..STAGES).map(|i| b3[i] * C[i]).sum();
        let c2: f64 = (0..STAGES).map(|i| b3[i] * C[i] * C[i]).sum();
        let mut c3 = 0.0;
        for i in 0..STAGES {
            for j in 0..i {
                c3 += b3[i] * A[i][j] * C[j];
            }
        }
        assert!((c1 - 0.5).abs() < TOL);
        assert!((c2 - 1.0 / 3.0).abs() < TOL);
        assert!((c3 - 1.0 / 6.0).abs() < TOL);

        // Second-order condition for the propagation weights
        let b_c: f64 = (0..STAGES).map(|i| B[i] * C[i]).sum();
        assert!((b_c - 0.5).abs() < TOL);
    }
}
