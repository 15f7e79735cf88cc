//! Embedded explicit Runge-Kutta pairs.
//!
//! Both supplied pairs have seven stages, are first-same-as-last (the final
//! stage is evaluated at the propagated solution, so its weights equal the
//! last row of `a`) and propagate the fifth-order solution while using the
//! embedded fourth-order one only for the error estimate.

use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};

pub const STAGES: usize = 7;

/// Order of the propagated solution.
pub const ORDER: i32 = 5;

/// Order of the embedded solution used for error estimation.
pub const ERROR_ORDER: i32 = 4;

/// Butcher tableau of a seven-stage FSAL pair.
#[derive(Debug)]
pub struct Tableau {
    pub c: [f64; STAGES],
    /// Row `i` holds the `i` coefficients `a[i][0..i]`; row 6 doubles as the solution weights.
    pub a: [[f64; STAGES - 1]; STAGES],
    /// Difference between propagated and embedded weights.
    pub e: [f64; STAGES],
}

/// Tsitouras 5(4) coefficients.
pub static TSIT5: Tableau = Tableau {
    c: [0.0, 0.161, 0.327, 0.9, 0.9800255409045097, 1.0, 1.0],
    a: [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.161, 0.0, 0.0, 0.0, 0.0, 0.0],
        [-0.008480655492356989, 0.335480655492357, 0.0, 0.0, 0.0, 0.0],
        [
            2.897153057105493,
            -6.359448489975075,
            4.3622954328695815,
            0.0,
            0.0,
            0.0,
        ],
        [
            5.325864828439257,
            -11.748883564062828,
            7.4955393428898365,
            -0.09249506636175525,
            0.0,
            0.0,
        ],
        [
            5.86145544294642,
            -12.92096931784711,
            8.159367898576159,
            -0.071584973281401,
            -0.028269050394068383,
            0.0,
        ],
        [
            0.09646076681806523,
            0.01,
            0.4798896504144996,
            1.379008574103742,
            -3.290069515436081,
            2.324710524099774,
        ],
    ],
    e: [
        -0.00178001105222577714,
        -0.0008164344596567469,
        0.007880878010261995,
        -0.1447110071732629,
        0.5823571654525552,
        -0.45808210592918697,
        0.015151515151515152,
    ],
};

/// Dormand-Prince 5(4) coefficients.
pub static DOPRI5: Tableau = Tableau {
    c: [0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0],
    a: [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.2, 0.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
        [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
        [
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
            0.0,
            0.0,
        ],
        [
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
            0.0,
        ],
        [
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ],
    e: [
        71.0 / 57600.0,
        0.0,
        -71.0 / 16695.0,
        71.0 / 1920.0,
        -17253.0 / 339200.0,
        22.0 / 525.0,
        -1.0 / 40.0,
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Tsit5,
    DormandPrince,
}

impl Method {
    pub fn tableau(self) -> &'static Tableau {
        match self {
            Method::Tsit5 => &TSIT5,
            Method::DormandPrince => &DOPRI5,
        }
    }
}

/// Stage storage and FSAL bookkeeping for one embedded pair.
///
/// `k[0]` always holds the derivative at the current accepted state once
/// [`EmbeddedRk::prime`] has run; a rejected attempt leaves it untouched so
/// retries from the same point cost six evaluations.
pub struct EmbeddedRk {
    tableau: &'static Tableau,
    k: Vec<Vec<f64>>,
    tmp: Vec<f64>,
    err: Vec<f64>,
    evaluations: u64,
}

impl EmbeddedRk {
    pub fn new(method: Method, dim: usize) -> Self {
        Self {
            tableau: method.tableau(),
            k: vec![vec![0.0; dim]; STAGES],
            tmp: vec![0.0; dim],
            err: vec![0.0; dim],
            evaluations: 0,
        }
    }

    /// Evaluates the first stage at `(t, y)`.
    pub fn prime(&mut self, system: &impl DynamicalSystem<f64>, t: f64, y: &[f64]) {
        system.apply(t, y, &mut self.k[0]);
        self.evaluations += 1;
    }

    /// Derivative at the current accepted state.
    pub fn derivative(&self) -> &[f64] {
        &self.k[0]
    }

    /// Unscaled local error vector of the most recent attempt.
    pub fn local_error(&self) -> &[f64] {
        &self.err
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Computes the stages of a trial step of size `h` from `(t, y)`, writing
    /// the fifth-order solution into `y_new` and the error estimate into the
    /// internal buffer read by [`EmbeddedRk::local_error`].
    pub fn attempt(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: f64,
        y: &[f64],
        h: f64,
        y_new: &mut [f64],
    ) {
        let tab = self.tableau;
        let dim = y.len();

        for i in 1..STAGES {
            for n in 0..dim {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += tab.a[i][j] * self.k[j][n];
                }
                self.tmp[n] = y[n] + h * sum;
            }
            system.apply(t + tab.c[i] * h, &self.tmp, &mut self.k[i]);
        }
        self.evaluations += (STAGES - 1) as u64;

        // The last stage was evaluated at the propagated solution.
        y_new.copy_from_slice(&self.tmp);

        for n in 0..dim {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += tab.e[i] * self.k[i][n];
            }
            self.err[n] = h * sum;
        }
    }

    /// Promotes the last stage of an accepted attempt to the first stage of the next.
    pub fn accept(&mut self) {
        self.k.swap(0, STAGES - 1);
    }
}
