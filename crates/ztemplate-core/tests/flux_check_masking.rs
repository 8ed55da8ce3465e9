use ndarray::{Array2, array, s};
use ztemplate_core::modules::{
    FluxCheckConfig, FluxChecker, MaskScope, QualityCondition, QualityEvent, flux_check,
};

fn uniform(rows: usize, columns: usize) -> (Array2<f64>, Array2<f64>) {
    (
        Array2::from_elem((rows, columns), 10.0),
        Array2::from_elem((rows, columns), 1.0),
    )
}

#[test]
fn benign_arrays_pass_through_unchanged() {
    let (flux, ivar) = uniform(3, 12);
    let mut events: Vec<QualityEvent> = Vec::new();

    let report = FluxChecker::default()
        .check_with(flux.view(), ivar.view(), &mut events)
        .expect("check");
    assert_eq!(report.ivar, ivar);
    assert!(events.is_empty());
}

#[test]
fn over_significant_pixels_are_reported_but_not_masked() {
    let (mut flux, ivar) = uniform(2, 12);
    flux[[0, 3]] = 500.0;
    flux[[0, 9]] = 300.0;
    let mut events: Vec<QualityEvent> = Vec::new();

    let report = FluxChecker::default()
        .check_with(flux.view(), ivar.view(), &mut events)
        .expect("check");
    assert_eq!(report.ivar, ivar);
    assert_eq!(
        events,
        vec![QualityEvent {
            row_index: 0,
            pixel_count: 2,
            condition: QualityCondition::OverSignificant,
        }]
    );
}

#[test]
fn negative_pixel_is_reported_and_its_window_masked() {
    let (mut flux, ivar) = uniform(2, 10);
    flux[[0, 5]] = -15.0;
    let mut events: Vec<QualityEvent> = Vec::new();

    let report = FluxChecker::default()
        .check_with(flux.view(), ivar.view(), &mut events)
        .expect("check");
    assert_eq!(
        events,
        vec![QualityEvent {
            row_index: 0,
            pixel_count: 1,
            condition: QualityCondition::NegativeFlux,
        }]
    );
    for row in 0..2 {
        for column in 0..10 {
            let expected = if (3..=6).contains(&column) { 0.0 } else { 1.0 };
            assert_eq!(report.ivar[[row, column]], expected, "row {row}, column {column}");
        }
    }
}

#[test]
fn negative_pixel_zeroes_two_columns_either_side_exclusive_upper() {
    let (mut flux, ivar) = uniform(3, 12);
    flux[[1, 6]] = -20.0;

    let corrected =
        flux_check(flux.view(), ivar.view(), FluxCheckConfig::default()).expect("check");
    for row in 0..3 {
        assert_eq!(
            corrected.row(row).to_vec(),
            vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]
        );
    }
}

#[test]
fn window_clamps_at_array_edges() {
    let (mut flux, ivar) = uniform(1, 8);
    flux[[0, 0]] = -20.0;
    flux[[0, 7]] = -20.0;

    let corrected =
        flux_check(flux.view(), ivar.view(), FluxCheckConfig::default()).expect("check");
    assert_eq!(corrected.row(0).to_vec(), vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn later_rows_see_masking_from_earlier_rows() {
    let (mut flux, ivar) = uniform(2, 10);
    flux[[0, 5]] = -20.0;
    flux[[1, 5]] = -20.0;
    let mut events: Vec<QualityEvent> = Vec::new();

    let report = FluxChecker::default()
        .check_with(flux.view(), ivar.view(), &mut events)
        .expect("check");
    let negative: Vec<usize> = report
        .events_for(QualityCondition::NegativeFlux)
        .map(|event| event.row_index)
        .collect();
    assert_eq!(negative, vec![0]);
    assert!(report.ivar.slice(s![.., 3..7]).iter().all(|value| *value == 0.0));
}

#[test]
fn flagged_row_scope_leaves_other_rows_untouched() {
    let flux = array![[10.0, 10.0, -30.0, 10.0, 10.0], [10.0, 10.0, 10.0, 10.0, 10.0]];
    let ivar = Array2::from_elem((2, 5), 1.0);
    let config = FluxCheckConfig {
        mask_scope: MaskScope::FlaggedRow,
        ..FluxCheckConfig::default()
    };

    let corrected = flux_check(flux.view(), ivar.view(), config).expect("check");
    assert_eq!(corrected.row(0).to_vec(), vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    assert_eq!(corrected.row(1).to_vec(), vec![1.0; 5]);
}

#[test]
fn zero_ivar_pixels_are_never_flagged() {
    let (mut flux, mut ivar) = uniform(1, 6);
    flux[[0, 2]] = -1.0e9;
    ivar[[0, 2]] = 0.0;

    let corrected =
        flux_check(flux.view(), ivar.view(), FluxCheckConfig::default()).expect("check");
    assert_eq!(corrected, ivar);
}

#[test]
fn mismatched_shapes_are_rejected() {
    let flux = Array2::<f64>::zeros((2, 5));
    let ivar = Array2::<f64>::zeros((2, 4));

    let error = flux_check(flux.view(), ivar.view(), FluxCheckConfig::default())
        .expect_err("shape mismatch");
    assert_eq!(error.placeholder(), "RUN.SHAPE_MISMATCH");
}
