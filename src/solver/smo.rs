//! Sequential Minimal Optimization (SMO) solver for one class pair
//!
//! Implements SMO with the two threshold modification of Keerthi et al.:
//! instead of a single bias, the solver tracks `b_up`/`b_low`, the smallest
//! and largest cached error over the index sets that may still move up or
//! down, and stops once no example violates the KKT conditions by more than
//! `2 * tol` with respect to them.
//!
//! Every training index lives in exactly one of five sets, a pure function of
//! its label and multiplier:
//!
//! | set | condition                  |
//! |-----|----------------------------|
//! | I0  | 0 < alpha < C              |
//! | I1  | y = +1, alpha = 0          |
//! | I2  | y = -1, alpha = C          |
//! | I3  | y = +1, alpha = C          |
//! | I4  | y = -1, alpha = 0          |

use crate::cache::KernelCache;
use crate::core::{Header, Instance, Result, SMOConfig, SVMError, SparseVector};
use crate::kernel::{dot_product_sparse, Kernel, KernelFunction};
use crate::solver::index_set::IndexSet;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Relative distance to a bound below which a multiplier snaps onto it
const DEL: f64 = 1000.0 * 4.940_656_458_412_465_4e-324;

const I0: usize = 0;
const I1: usize = 1;
const I2: usize = 2;
const I3: usize = 3;
const I4: usize = 4;

/// Lifecycle of a [`BinarySMO`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverState {
    Uninitialized,
    Optimizing,
    Converged,
    /// Only one of the two classes occurred; the machine outputs a constant
    DegenerateOneClassOnly,
}

/// Counters collected while optimizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub sweeps: usize,
    pub steps: usize,
    pub kernel_evaluations: u64,
    pub cache_hits: u64,
}

/// The five disjoint sets I0..I4
#[derive(Debug, Clone, Default)]
struct Partition {
    sets: [IndexSet; 5],
}

impl Partition {
    fn new(n: usize) -> Self {
        Self {
            sets: std::array::from_fn(|_| IndexSet::new(n)),
        }
    }

    /// Set an index belongs to for a given label, multiplier and bound
    fn region(y: f64, alpha: f64, c: f64) -> usize {
        if alpha > 0.0 && alpha < c {
            I0
        } else if y > 0.0 {
            if alpha == 0.0 {
                I1
            } else {
                I3
            }
        } else if alpha == 0.0 {
            I4
        } else {
            I2
        }
    }

    /// Recompute the membership of `i`; a set it already belongs to keeps
    /// its position
    fn update(&mut self, i: usize, y: f64, alpha: f64, c: f64) {
        let target = Self::region(y, alpha, c);
        for (k, set) in self.sets.iter_mut().enumerate() {
            if k == target {
                set.insert(i);
            } else {
                set.delete(i);
            }
        }
    }

    fn i0(&self) -> &IndexSet {
        &self.sets[I0]
    }

    fn contains(&self, set: usize, i: usize) -> bool {
        self.sets[set].contains(i)
    }
}

/// Binary SMO machine separating class `classes.0` (label -1) from
/// `classes.1` (label +1)
#[derive(Serialize, Deserialize)]
pub struct BinarySMO {
    state: SolverState,
    classes: (usize, usize),
    kernel: KernelFunction,
    num_attributes: usize,
    c: f64,
    tol: f64,
    eps: f64,
    cache_size: usize,
    max_kernel_evaluations: Option<u64>,

    /// Training subset; dropped once a linear machine collapses
    data: Vec<Instance>,
    alpha: Vec<f64>,
    class: Vec<f64>,
    support_vectors: IndexSet,
    b: f64,
    sparse_weights: Option<SparseVector>,
    stats: TrainingStats,

    #[serde(skip)]
    errors: Vec<f64>,
    #[serde(skip)]
    sets: Partition,
    #[serde(skip)]
    b_low: f64,
    #[serde(skip)]
    b_up: f64,
    #[serde(skip)]
    i_low: Option<usize>,
    #[serde(skip)]
    i_up: Option<usize>,
    #[serde(skip)]
    weights: Vec<f64>,
    #[serde(skip)]
    cache: KernelCache,
}

impl BinarySMO {
    /// Create an untrained machine for one class pair
    pub fn new(
        classes: (usize, usize),
        kernel: KernelFunction,
        num_attributes: usize,
        config: &SMOConfig,
    ) -> Self {
        Self {
            state: SolverState::Uninitialized,
            classes,
            kernel,
            num_attributes,
            c: config.c,
            tol: config.tol,
            eps: config.eps,
            cache_size: config.cache_size,
            max_kernel_evaluations: config.max_kernel_evaluations,
            data: Vec::new(),
            alpha: Vec::new(),
            class: Vec::new(),
            support_vectors: IndexSet::default(),
            b: 0.0,
            sparse_weights: None,
            stats: TrainingStats::default(),
            errors: Vec::new(),
            sets: Partition::default(),
            b_low: 0.0,
            b_up: 0.0,
            i_low: None,
            i_up: None,
            weights: Vec::new(),
            cache: KernelCache::default(),
        }
    }

    /// Train on the instances of this class pair
    ///
    /// Every instance must carry one of the two pair classes. A subset
    /// containing only one of them yields a constant machine.
    pub fn build(&mut self, data: Vec<Instance>) -> Result<()> {
        if self.state != SolverState::Uninitialized {
            return Err(SVMError::InvalidParameter(format!(
                "machine for classes {:?} is already built",
                self.classes
            )));
        }

        if !self.initialize(data)? {
            return Ok(());
        }
        self.optimize()?;
        self.finish();
        Ok(())
    }

    /// Set up labels, sets and cache; false when only one class occurs
    fn initialize(&mut self, data: Vec<Instance>) -> Result<bool> {
        let n = data.len();
        let (low_class, high_class) = self.classes;

        self.class = Vec::with_capacity(n);
        self.i_low = None;
        self.i_up = None;
        for (i, inst) in data.iter().enumerate() {
            let value = inst.class_value;
            if value == low_class as f64 {
                self.class.push(-1.0);
                self.i_low = Some(i);
            } else if value == high_class as f64 {
                self.class.push(1.0);
                self.i_up = Some(i);
            } else {
                return Err(SVMError::InvalidDataset(format!(
                    "instance {i} has class {value}, expected {low_class} or {high_class}"
                )));
            }
        }

        let (i_low, i_up) = match (self.i_low, self.i_up) {
            (Some(i_low), Some(i_up)) => (i_low, i_up),
            (low, up) => {
                self.b = if up.is_some() {
                    -1.0
                } else if low.is_some() {
                    1.0
                } else {
                    0.0
                };
                warn!(
                    "Classes {:?}: only one class present in {} instances, using constant output {}",
                    self.classes, n, -self.b
                );
                self.class = Vec::new();
                if self.kernel.is_linear() {
                    self.sparse_weights = Some(SparseVector::empty());
                }
                self.state = SolverState::DegenerateOneClassOnly;
                return Ok(false);
            }
        };

        self.cache = KernelCache::new(n, self.cache_size)?;
        self.b_up = -1.0;
        self.b_low = 1.0;
        self.b = 0.0;
        self.alpha = vec![0.0; n];
        self.errors = vec![0.0; n];
        self.errors[i_low] = 1.0;
        self.errors[i_up] = -1.0;

        if self.kernel.is_linear() {
            let width = data
                .iter()
                .filter_map(|inst| inst.values.indices.last())
                .map(|&last| last + 1)
                .fold(self.num_attributes, usize::max);
            self.weights = vec![0.0; width];
        }

        self.support_vectors = IndexSet::new(n);
        self.sets = Partition::new(n);
        for i in 0..n {
            let c_i = self.c * data[i].weight;
            self.sets.update(i, self.class[i], 0.0, c_i);
        }
        self.data = data;

        debug!(
            "Classes {:?}: optimizing {} instances ({} kernel, {} cache)",
            self.classes,
            n,
            if self.kernel.is_linear() { "linear" } else { "polynomial" },
            if self.cache.is_full_mode() { "full" } else { "bounded" }
        );
        self.state = SolverState::Optimizing;
        Ok(true)
    }

    /// Alternate full sweeps and sweeps over I0 until nothing changes
    fn optimize(&mut self) -> Result<()> {
        let n = self.alpha.len();
        let mut num_changed = 0usize;
        let mut examine_all = true;

        while num_changed > 0 || examine_all {
            num_changed = 0;
            if examine_all {
                for i in 0..n {
                    if self.examine_example(i) {
                        num_changed += 1;
                    }
                }
            } else {
                let mut cursor = self.sets.i0().first();
                while let Some(i) = cursor {
                    // a deleted index still links to its old successor
                    if self.sets.i0().contains(i) {
                        if self.examine_example(i) {
                            num_changed += 1;
                        }
                        if self.b_up > self.b_low - 2.0 * self.tol {
                            num_changed = 0;
                            break;
                        }
                    }
                    cursor = self.sets.i0().next(Some(i));
                }
            }

            self.stats.sweeps += 1;
            trace!(
                "Classes {:?}: sweep {} ({}) changed {}, b_up {:.6}, b_low {:.6}",
                self.classes,
                self.stats.sweeps,
                if examine_all { "all" } else { "free" },
                num_changed,
                self.b_up,
                self.b_low
            );

            if let Some(limit) = self.max_kernel_evaluations {
                if self.cache.evaluations() > limit {
                    return Err(SVMError::EvaluationLimit(limit));
                }
            }

            if examine_all {
                examine_all = false;
            } else if num_changed == 0 {
                examine_all = true;
            }
        }

        Ok(())
    }

    /// Fix the threshold and release everything prediction does not need
    fn finish(&mut self) {
        self.b = (self.b_low + self.b_up) / 2.0;
        self.stats.kernel_evaluations = self.cache.evaluations();
        self.stats.cache_hits = self.cache.hits();

        self.cache.clear();
        self.cache = KernelCache::default();
        self.errors = Vec::new();
        self.sets = Partition::default();

        if self.kernel.is_linear() {
            self.sparse_weights = Some(SparseVector::from_dense(&self.weights));
            self.weights = Vec::new();
            self.alpha = Vec::new();
            self.class = Vec::new();
            self.support_vectors = IndexSet::default();
            self.data = Vec::new();
        }

        self.state = SolverState::Converged;
        debug!(
            "Classes {:?}: converged after {} sweeps, {} steps, {} kernel evaluations ({} cached), {} support vectors, b = {:.6}",
            self.classes,
            self.stats.sweeps,
            self.stats.steps,
            self.stats.kernel_evaluations,
            self.stats.cache_hits,
            self.num_support_vectors(),
            self.b
        );
    }

    /// Check example `i2` against the current thresholds and, if it violates
    /// them, optimize it jointly with the matching extreme index
    fn examine_example(&mut self, i2: usize) -> bool {
        let y2 = self.class[i2];

        let f2 = if self.sets.contains(I0, i2) {
            self.errors[i2]
        } else {
            let f2 = self.training_output(i2) + self.b - y2;
            self.errors[i2] = f2;

            if (self.sets.contains(I1, i2) || self.sets.contains(I2, i2)) && f2 < self.b_up {
                self.b_up = f2;
                self.i_up = Some(i2);
            } else if (self.sets.contains(I3, i2) || self.sets.contains(I4, i2)) && f2 > self.b_low
            {
                self.b_low = f2;
                self.i_low = Some(i2);
            }
            f2
        };

        let in_i0 = self.sets.contains(I0, i2);
        let mut optimal = true;
        let mut i1 = None;
        if (in_i0 || self.sets.contains(I1, i2) || self.sets.contains(I2, i2))
            && self.b_low - f2 > 2.0 * self.tol
        {
            optimal = false;
            i1 = self.i_low;
        }
        if (in_i0 || self.sets.contains(I3, i2) || self.sets.contains(I4, i2))
            && f2 - self.b_up > 2.0 * self.tol
        {
            optimal = false;
            i1 = self.i_up;
        }
        if optimal {
            return false;
        }

        if in_i0 {
            i1 = if self.b_low - f2 > f2 - self.b_up {
                self.i_low
            } else {
                self.i_up
            };
        }

        match i1 {
            Some(i1) => self.take_step(i1, i2, f2),
            None => panic!(
                "classes {:?}: no partner index for violating example {}",
                self.classes, i2
            ),
        }
    }

    /// Jointly optimize the multipliers of `i1` and `i2`
    fn take_step(&mut self, i1: usize, i2: usize, f2: f64) -> bool {
        if i1 == i2 {
            return false;
        }

        let alph1 = self.alpha[i1];
        let alph2 = self.alpha[i2];
        let y1 = self.class[i1];
        let y2 = self.class[i2];
        let f1 = self.errors[i1];
        let s = y1 * y2;
        let c1 = self.c * self.data[i1].weight;
        let c2 = self.c * self.data[i2].weight;

        let (l, h) = if y1 != y2 {
            ((alph2 - alph1).max(0.0), c2.min(c1 + alph2 - alph1))
        } else {
            ((alph1 + alph2 - c1).max(0.0), c2.min(alph1 + alph2))
        };
        if l >= h {
            return false;
        }

        let k11 = self.kernel_eval(i1, i1);
        let k12 = self.kernel_eval(i1, i2);
        let k22 = self.kernel_eval(i2, i2);
        let eta = 2.0 * k12 - k11 - k22;

        let mut a2 = if eta < 0.0 {
            let a2 = alph2 + y2 * (f2 - f1) / eta;
            if a2 < l {
                l
            } else if a2 > h {
                h
            } else {
                a2
            }
        } else {
            // objective at both ends of the segment
            let out1 = self.training_output(i1);
            let out2 = self.training_output(i2);
            let v1 = out1 + self.b - y1 * alph1 * k11 - y2 * alph2 * k12;
            let v2 = out2 + self.b - y1 * alph1 * k12 - y2 * alph2 * k22;
            let gamma = alph1 + s * alph2;
            let objective = |a: f64| {
                let g = gamma - s * a;
                g + a - 0.5 * k11 * g * g - 0.5 * k22 * a * a - s * k12 * g * a - y1 * g * v1
                    - y2 * a * v2
            };
            let l_obj = objective(l);
            let h_obj = objective(h);
            if l_obj > h_obj + self.eps {
                l
            } else if l_obj < h_obj - self.eps {
                h
            } else {
                alph2
            }
        };

        if (a2 - alph2).abs() < self.eps * (a2 + alph2 + self.eps) {
            return false;
        }

        if a2 > c2 - DEL * c2 {
            a2 = c2;
        } else if a2 <= DEL * c2 {
            a2 = 0.0;
        }
        let mut a1 = alph1 + s * (alph2 - a2);
        if a1 > c1 - DEL * c1 {
            a1 = c1;
        } else if a1 <= DEL * c1 {
            a1 = 0.0;
        }

        for (i, a, y, c) in [(i1, a1, y1, c1), (i2, a2, y2, c2)] {
            if a > 0.0 {
                self.support_vectors.insert(i);
            } else {
                self.support_vectors.delete(i);
            }
            self.sets.update(i, y, a, c);
        }

        let t1 = y1 * (a1 - alph1);
        let t2 = y2 * (a2 - alph2);

        if self.kernel.is_linear() {
            let class_index = self.kernel.class_index();
            for (i, t) in [(i1, t1), (i2, t2)] {
                for (index, value) in self.data[i].values.iter() {
                    if Some(index) != class_index {
                        self.weights[index] += t * value;
                    }
                }
            }
        }

        let mut cursor = self.sets.i0().first();
        while let Some(j) = cursor {
            if j != i1 && j != i2 {
                let delta = t1 * self.kernel_eval(i1, j) + t2 * self.kernel_eval(i2, j);
                self.errors[j] += delta;
            }
            cursor = self.sets.i0().next(Some(j));
        }
        self.errors[i1] += t1 * k11 + t2 * k12;
        self.errors[i2] += t1 * k12 + t2 * k22;

        self.alpha[i1] = a1;
        self.alpha[i2] = a2;

        self.update_thresholds(i1, i2);
        self.stats.steps += 1;

        #[cfg(test)]
        self.assert_invariants();

        true
    }

    /// Recompute `b_low`/`b_up` from I0 and the two indices just moved
    fn update_thresholds(&mut self, i1: usize, i2: usize) {
        self.b_low = f64::MIN;
        self.b_up = f64::MAX;
        self.i_low = None;
        self.i_up = None;

        for j in self.sets.i0().iter() {
            let e = self.errors[j];
            if e < self.b_up {
                self.b_up = e;
                self.i_up = Some(j);
            }
            if e > self.b_low {
                self.b_low = e;
                self.i_low = Some(j);
            }
        }

        for i in [i1, i2] {
            if self.sets.contains(I0, i) {
                continue;
            }
            let e = self.errors[i];
            if self.sets.contains(I3, i) || self.sets.contains(I4, i) {
                if e > self.b_low {
                    self.b_low = e;
                    self.i_low = Some(i);
                }
            } else if e < self.b_up {
                self.b_up = e;
                self.i_up = Some(i);
            }
        }

        if self.i_low.is_none() || self.i_up.is_none() {
            panic!(
                "classes {:?}: lost the threshold witnesses after updating {} and {}",
                self.classes, i1, i2
            );
        }
    }

    /// Cached kernel value between two training instances
    fn kernel_eval(&mut self, i: usize, j: usize) -> f64 {
        let kernel = &self.kernel;
        let data = &self.data;
        self.cache
            .get(i, j, |a, b| kernel.compute(&data[a].values, &data[b].values))
    }

    /// SVM output for training instance `index`, through the cache
    fn training_output(&mut self, index: usize) -> f64 {
        let mut result = 0.0;
        if self.kernel.is_linear() {
            let class_index = self.kernel.class_index();
            for (i, value) in self.data[index].values.iter() {
                if Some(i) != class_index {
                    result += self.weights[i] * value;
                }
            }
        } else {
            let mut cursor = self.support_vectors.first();
            while let Some(i) = cursor {
                result += self.class[i] * self.alpha[i] * self.kernel_eval(index, i);
                cursor = self.support_vectors.next(Some(i));
            }
        }
        result - self.b
    }

    /// Decision value for an arbitrary instance; positive votes for the
    /// second class of the pair
    pub fn decision_function(&self, x: &SparseVector) -> f64 {
        if self.state == SolverState::DegenerateOneClassOnly {
            return -self.b;
        }

        let result = match &self.sparse_weights {
            Some(weights) => dot_product_sparse(weights, x, self.kernel.class_index()),
            None => self.dual_sum(x),
        };
        result - self.b
    }

    fn dual_sum(&self, x: &SparseVector) -> f64 {
        self.support_vectors
            .iter()
            .map(|i| self.class[i] * self.alpha[i] * self.kernel.compute(x, &self.data[i].values))
            .sum()
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// The (label -1, label +1) class pair
    pub fn classes(&self) -> (usize, usize) {
        self.classes
    }

    pub fn bias(&self) -> f64 {
        self.b
    }

    pub fn stats(&self) -> TrainingStats {
        self.stats
    }

    /// Lagrange multipliers; empty for collapsed linear machines
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Weight vector of a linear machine
    pub fn sparse_weights(&self) -> Option<&SparseVector> {
        self.sparse_weights.as_ref()
    }

    pub fn num_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn is_linear(&self) -> bool {
        self.kernel.is_linear()
    }

    /// Human-readable form of the machine
    pub fn describe(&self, header: &Header, normalized: bool) -> String {
        let mut text = String::new();
        let class_index = self.kernel.class_index();

        if self.state == SolverState::DegenerateOneClassOnly {
            let _ = writeln!(text, "Constant machine (one class only)");
        } else if let Some(weights) = &self.sparse_weights {
            let _ = writeln!(text, "Machine linear: showing attribute weights, not support vectors.\n");
            let mut printed = 0;
            for (index, weight) in weights.iter() {
                if Some(index) == class_index {
                    continue;
                }
                let prefix = if printed > 0 { " + " } else { "   " };
                let scale = if normalized { "(normalized) " } else { "" };
                let _ = writeln!(
                    text,
                    "{prefix}{weight:>12.4} * {scale}{}",
                    header.attribute_name(index)
                );
                printed += 1;
            }
        } else {
            let mut printed = 0;
            for i in self.support_vectors.iter() {
                let sign = if self.class[i] > 0.0 {
                    if printed > 0 {
                        " + "
                    } else {
                        "   "
                    }
                } else {
                    " - "
                };
                let point = self.data[i]
                    .values
                    .iter()
                    .filter(|&(index, _)| Some(index) != class_index)
                    .map(|(index, value)| format!("{}={value}", header.attribute_name(index)))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = writeln!(text, "{sign}{:>12.4} * <{point}> * X]", self.alpha[i]);
                printed += 1;
            }
        }

        if self.b > 0.0 {
            let _ = write!(text, " - {:>12.4}", self.b);
        } else {
            let _ = write!(text, " + {:>12.4}", -self.b);
        }
        if self.state == SolverState::Converged {
            if !self.is_linear() {
                let _ = write!(
                    text,
                    "\n\nNumber of support vectors: {}",
                    self.num_support_vectors()
                );
            }
            let total = self.stats.kernel_evaluations + self.stats.cache_hits;
            let cached = if total == 0 {
                0.0
            } else {
                100.0 * self.stats.cache_hits as f64 / total as f64
            };
            let _ = write!(
                text,
                "\n\nNumber of kernel evaluations: {} ({cached:.3}% cached)",
                self.stats.kernel_evaluations
            );
        }
        text
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        for i in 0..self.alpha.len() {
            let c_i = self.c * self.data[i].weight;
            let a = self.alpha[i];
            assert!((0.0..=c_i).contains(&a), "alpha[{i}] = {a} outside [0, {c_i}]");

            let expected = Partition::region(self.class[i], a, c_i);
            for k in 0..5 {
                assert_eq!(self.sets.contains(k, i), k == expected, "index {i} in set I{k}");
            }
            assert_eq!(self.support_vectors.contains(i), a > 0.0);
        }
    }
}
