//! Integration tests for the complete training workflow
//!
//! These tests drive the public API end to end: reading data, training
//! pairwise machines, voting, evaluating and persisting models.

use approx::assert_relative_eq;
use rsmo::api::{quick, SMO};
use rsmo::persistence::SerializableModel;
use rsmo::{
    Attribute, CSVReader, Classifier, Dataset, Header, Instance, Instances, LibSVMReader,
    SMOConfig, SVMError, SolverState, SparseVector,
};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

fn two_blobs() -> Instances {
    let data = "\
0.0,0.0,a
0.4,0.1,a
0.2,0.5,a
-0.3,0.2,a
0.1,-0.4,a
5.0,5.0,b
5.4,4.7,b
4.6,5.3,b
5.2,5.5,b
4.8,4.6,b
";
    CSVReader::from_reader(Cursor::new(data)).expect("valid csv")
}

fn three_classes() -> Instances {
    let data = "\
sepal,petal,species
1.0,1.0,setosa
1.2,0.8,setosa
0.9,1.1,setosa
1.1,1.2,setosa
5.0,1.0,versicolor
5.2,1.3,versicolor
4.8,0.9,versicolor
5.1,0.7,versicolor
3.0,5.0,virginica
3.2,5.2,virginica
2.8,4.9,virginica
3.1,4.7,virginica
";
    CSVReader::from_reader(Cursor::new(data)).expect("valid csv")
}

fn assert_perfect_fit(model: &impl Classifier, data: &Instances) {
    for i in 0..data.len() {
        let instance = data.instance(i);
        assert_eq!(
            model.classify(instance) as f64,
            instance.class_value,
            "instance {i} misclassified"
        );
    }
}

#[test]
fn test_separable_blobs_linear() {
    let data = two_blobs();
    let model = SMO::new()
        .with_c(1.0)
        .with_normalize(false)
        .train(&data)
        .expect("Training should succeed");

    assert_perfect_fit(&model, &data);

    let machine = model.inner().machine(0, 1).expect("pair trained");
    assert_eq!(machine.state(), SolverState::Converged);
    let weights = machine.sparse_weights().expect("linear machine keeps weights");
    // class b (label +1) lies in the positive quadrant
    assert!(weights.get(0) > 0.0);
    assert!(weights.get(1) > 0.0);
    assert!(machine.alpha().is_empty());

    // margin sign follows the label
    let values = model.decision_values(data.instance(0));
    assert!(values[0].1 < 0.0);
    let values = model.decision_values(data.instance(9));
    assert!(values[0].1 > 0.0);
}

#[test]
fn test_three_class_voting() {
    let data = three_classes();
    let model = SMO::new().with_c(10.0).train(&data).expect("Training should succeed");

    assert_eq!(model.num_classes(), 3);
    assert_eq!(model.info().num_machines, 3);
    assert_perfect_fit(&model, &data);

    let unseen = Instance::new(SparseVector::new(vec![0, 1], vec![3.0, 5.5]), f64::NAN);
    let prediction = model.predict(&unseen);
    assert_eq!(model.header().class_name(prediction.class), "virginica");
    assert_eq!(prediction.votes.iter().sum::<usize>(), 3);
    assert_eq!(prediction.votes[prediction.class], 2);
}

#[test]
fn test_polynomial_kernel_solves_xor() {
    let data = "1,1,same\n0,0,same\n0,1,diff\n1,0,diff\n";
    let data = CSVReader::from_reader_with_options(Cursor::new(data), false).unwrap();

    let linear = SMO::new().with_c(100.0).train(&data).unwrap();
    let correct = (0..data.len())
        .filter(|&i| linear.classify(data.instance(i)) as f64 == data.instance(i).class_value)
        .count();
    assert!(correct < 4, "a linear machine cannot fit xor");

    let quadratic = SMO::new()
        .with_c(100.0)
        .with_exponent(2.0)
        .with_lower_order(true)
        .train(&data)
        .unwrap();
    assert_perfect_fit(&quadratic, &data);
}

#[test]
fn test_full_and_bounded_cache_agree() {
    let data = three_classes();
    let train = |cache_size: usize| {
        SMO::new()
            .with_exponent(3.0)
            .with_lower_order(true)
            .with_rescale(true)
            .with_cache_size(cache_size)
            .train(&data)
            .unwrap()
    };
    let full = train(0);
    let bounded = train(1_000_003);
    let tiny = train(1);

    for i in 0..data.len() {
        let expected = full.decision_values(data.instance(i));
        assert_eq!(bounded.decision_values(data.instance(i)), expected);
        assert_eq!(tiny.decision_values(data.instance(i)), expected);
    }
    for (a, b) in full.inner().machines().zip(bounded.inner().machines()) {
        assert_eq!(a.alpha(), b.alpha());
        assert_eq!(a.bias(), b.bias());
    }
}

#[test]
fn test_training_is_deterministic() {
    let data = three_classes();
    let smo = SMO::new().with_c(2.0).with_exponent(2.0);
    let first = smo.train(&data).unwrap();
    let second = smo.train(&data).unwrap();
    let parallel = smo.clone().with_parallel(true).train(&data).unwrap();

    for i in 0..data.len() {
        let expected = first.decision_values(data.instance(i));
        assert_eq!(second.decision_values(data.instance(i)), expected);
        assert_eq!(parallel.decision_values(data.instance(i)), expected);
    }
}

#[test]
fn test_missing_class_value_votes_constant() {
    // three declared classes, the third never occurs
    let header = Header::new(
        vec![
            Attribute::numeric("x"),
            Attribute::nominal("class", vec!["lo".into(), "hi".into(), "none".into()]),
        ],
        Some(1),
    );
    let rows = (0..6)
        .map(|i| {
            let class = (i % 2) as f64;
            let x = class * 4.0 + i as f64 * 0.1;
            Instance::new(SparseVector::new(vec![0, 1], vec![x, class]), class)
        })
        .collect();
    let data = Instances::new(header, rows);

    let model = SMO::new().with_c(10.0).train(&data).unwrap();
    let constant = model.inner().machine(0, 2).expect("pair with one class present");
    assert_eq!(constant.state(), SolverState::DegenerateOneClassOnly);
    assert_eq!(constant.bias(), 1.0);

    for i in 0..data.len() {
        let prediction = model.predict(data.instance(i));
        assert_eq!(prediction.class as f64, data.instance(i).class_value);
        assert_eq!(prediction.votes[2], 0);
    }
}

#[test]
fn test_instance_weights_bound_alpha() {
    let data = two_blobs();
    let rows: Vec<Instance> = data
        .instances()
        .iter()
        .map(|i| i.clone().with_weight(0.01))
        .collect();
    let weighted = Instances::new(data.header().clone(), rows);

    let model = SMO::new()
        .with_c(1.0)
        .with_exponent(2.0)
        .train(&weighted)
        .unwrap();
    let machine = model.inner().machine(0, 1).unwrap();
    for &alpha in machine.alpha() {
        assert!(alpha <= 0.01 + 1e-12);
    }
}

#[test]
fn test_evaluation_budget() {
    let data = three_classes();
    let result = SMO::new().with_max_kernel_evaluations(1).train(&data);
    assert!(matches!(result, Err(SVMError::EvaluationLimit(1))));

    assert!(SMO::new()
        .with_max_kernel_evaluations(1_000_000)
        .train(&data)
        .is_ok());
}

#[test]
fn test_error_handling() {
    // Invalid options are rejected before training
    let data = two_blobs();
    assert!(matches!(
        SMO::new().with_rescale(true).train(&data),
        Err(SVMError::InvalidParameter(_))
    ));
    assert!(matches!(
        SMO::new().with_c(-1.0).train(&data),
        Err(SVMError::InvalidParameter(_))
    ));

    // Numeric class attribute
    let header = Header::new(vec![Attribute::numeric("x"), Attribute::numeric("y")], Some(1));
    let numeric = Instances::new(
        header,
        vec![Instance::new(SparseVector::new(vec![0, 1], vec![1.0, 0.5]), 0.5)],
    );
    assert!(matches!(SMO::new().train(&numeric), Err(SVMError::NumericClass(_))));

    // Non-finite feature values
    let with_nan = CSVReader::from_reader(Cursor::new("1.0,nan,a\n2.0,0.5,b\n")).unwrap();
    assert!(matches!(SMO::new().train(&with_nan), Err(SVMError::InvalidDataset(_))));

    // Malformed input files
    assert!(LibSVMReader::from_reader(Cursor::new("1 x:1\n")).is_err());
    assert!(matches!(
        LibSVMReader::from_reader(Cursor::new("")),
        Err(SVMError::EmptyDataset)
    ));
    assert!(quick::train_libsvm("/nonexistent/file.libsvm").is_err());
}

#[test]
fn test_complete_workflow_libsvm() {
    let mut train_file = NamedTempFile::new().expect("Failed to create temp file");
    for i in 0..10 {
        let offset = i as f64 * 0.1;
        writeln!(train_file, "1 1:{} 2:{}", 1.0 + offset, 1.0 - offset).unwrap();
        writeln!(train_file, "2 1:{} 2:{}", 6.0 + offset, 6.0 - offset).unwrap();
        writeln!(train_file, "3 1:{} 2:{}", 1.0 + offset, 6.0 - offset).unwrap();
    }
    train_file.flush().unwrap();

    let mut test_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(test_file, "1 1:1.3 2:0.9").unwrap();
    writeln!(test_file, "2 1:6.2 2:5.8").unwrap();
    writeln!(test_file, "3 1:1.1 2:6.3").unwrap();
    writeln!(test_file, "7 1:1.1 2:6.3").unwrap();
    test_file.flush().unwrap();

    let model = SMO::new()
        .with_c(10.0)
        .train_from_file(train_file.path())
        .expect("Training should succeed");

    let test = model.load_libsvm(test_file.path()).unwrap();
    // the unknown label 7 reads as a missing class
    assert!(test.instance(3).class_is_missing());

    let metrics = model.evaluate(&test).unwrap();
    assert_eq!(metrics.total(), 3);
    assert_relative_eq!(metrics.accuracy(), 1.0);
    assert_relative_eq!(metrics.precision(2), 1.0);
    assert_relative_eq!(metrics.recall(0), 1.0);

    // persist and reload
    let model_file = NamedTempFile::new().unwrap();
    SerializableModel::from_trained_model(model)
        .save_to_file(model_file.path())
        .unwrap();
    let restored = SerializableModel::load_from_file(model_file.path())
        .unwrap()
        .into_trained_model();
    assert_relative_eq!(restored.evaluate(&test).unwrap().accuracy(), 1.0);
    assert_eq!(restored.config(), &SMOConfig { c: 10.0, ..SMOConfig::default() });
}

#[test]
fn test_description_lists_every_pair() {
    let data = three_classes();
    let text = SMO::new().train(&data).unwrap().to_string();

    assert!(text.contains("Linear Kernel"));
    assert!(text.contains("Classifier for classes: setosa, versicolor"));
    assert!(text.contains("Classifier for classes: setosa, virginica"));
    assert!(text.contains("Classifier for classes: versicolor, virginica"));
    assert!(text.contains("(normalized) sepal"));
}
