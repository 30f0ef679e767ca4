//! Pairwise multiclass optimization
//!
//! [`MulticlassSMO`] trains one [`BinarySMO`] per pair of classes `(a, b)`,
//! `a < b`, and predicts by majority vote over the pairwise machines.
//! Within a pair the lower class index takes label -1 and the higher +1;
//! the training subset lists all instances of `a` before those of `b`.

use crate::core::{Classifier, Header, Instance, Prediction, Result, SMOConfig, SparseVector};
use crate::kernel::KernelFunction;
use crate::solver::BinarySMO;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One-vs-one ensemble of binary SMO machines
#[derive(Serialize, Deserialize)]
pub struct MulticlassSMO {
    header: Header,
    num_classes: usize,
    normalized: bool,
    /// Machines in `(a, b)` lexicographic order; `None` when neither class
    /// of the pair occurred in the training data
    machines: Vec<Option<BinarySMO>>,
}

impl MulticlassSMO {
    /// Train every class pair on `instances`
    ///
    /// Either every pair trains or the whole build fails; no partially
    /// trained ensemble is returned.
    pub fn build(
        instances: &[Instance],
        header: &Header,
        kernel: &KernelFunction,
        config: &SMOConfig,
    ) -> Result<Self> {
        let num_classes = header.num_classes();
        let mut by_class: Vec<Vec<&Instance>> = vec![Vec::new(); num_classes];
        for instance in instances {
            if instance.class_is_missing() {
                continue;
            }
            if let Some(bucket) = by_class.get_mut(instance.class_value as usize) {
                bucket.push(instance);
            }
        }

        let pairs: Vec<(usize, usize)> = (0..num_classes)
            .flat_map(|a| ((a + 1)..num_classes).map(move |b| (a, b)))
            .collect();
        info!(
            "Training {} pairwise machines for {} classes on {} instances{}",
            pairs.len(),
            num_classes,
            instances.len(),
            if config.parallel { " (parallel)" } else { "" }
        );

        let train_pair = |&(a, b): &(usize, usize)| -> Result<Option<BinarySMO>> {
            let subset: Vec<Instance> = by_class[a]
                .iter()
                .chain(by_class[b].iter())
                .map(|&instance| instance.clone())
                .collect();
            if subset.is_empty() {
                debug!("Classes ({a}, {b}): no instances, pair abstains");
                return Ok(None);
            }

            let mut machine = BinarySMO::new((a, b), kernel.clone(), header.num_attributes(), config);
            machine.build(subset)?;
            Ok(Some(machine))
        };

        let machines = if config.parallel {
            pairs.par_iter().map(train_pair).collect::<Result<Vec<_>>>()?
        } else {
            pairs.iter().map(train_pair).collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            header: header.clone(),
            num_classes,
            normalized: config.normalize,
            machines,
        })
    }

    /// Index of the pair `(a, b)`, `a < b`, in lexicographic order
    fn pair_index(&self, a: usize, b: usize) -> usize {
        let k = self.num_classes;
        a * (2 * k - a - 1) / 2 + (b - a - 1)
    }

    /// Machine trained for classes `a < b`, if the pair took part
    pub fn machine(&self, a: usize, b: usize) -> Option<&BinarySMO> {
        if a >= b || b >= self.num_classes {
            return None;
        }
        self.machines[self.pair_index(a, b)].as_ref()
    }

    /// All participating machines in pair order
    pub fn machines(&self) -> impl Iterator<Item = &BinarySMO> {
        self.machines.iter().flatten()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Pairwise votes for an already preprocessed input
    pub fn votes(&self, x: &SparseVector) -> Vec<usize> {
        let mut votes = vec![0; self.num_classes];
        for machine in self.machines() {
            let (a, b) = machine.classes();
            if machine.decision_function(x) > 0.0 {
                votes[b] += 1;
            } else {
                votes[a] += 1;
            }
        }
        votes
    }

    /// Raw per-pair outputs, positive favouring the higher class
    pub fn decision_values(&self, x: &SparseVector) -> Vec<((usize, usize), f64)> {
        self.machines()
            .map(|machine| (machine.classes(), machine.decision_function(x)))
            .collect()
    }
}

/// Index of the largest vote count, lowest index on ties
pub(crate) fn argmax(votes: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in votes.iter().enumerate() {
        if count > votes[best] {
            best = class;
        }
    }
    best
}

impl Classifier for MulticlassSMO {
    fn predict(&self, instance: &Instance) -> Prediction {
        let votes = self.votes(&instance.values);
        Prediction::new(argmax(&votes), votes)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl fmt::Display for MulticlassSMO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SMO")?;
        writeln!(f)?;
        for machine in self.machines() {
            let (a, b) = machine.classes();
            writeln!(
                f,
                "Classifier for classes: {}, {}",
                self.header.class_name(a),
                self.header.class_name(b)
            )?;
            writeln!(f)?;
            writeln!(f, "{}", machine.describe(&self.header, self.normalized))?;
            writeln!(f)?;
        }
        Ok(())
    }
}
