#[path = "support/util.rs"]
mod util;

use orrery::interpreter::errors::ErrorCode;
use orrery::symbol::BinaryOp;
use orrery::{Arg, Expr, Interpreter, ProgramImage, RoutineImage, Scalar, Stmt, SymbolValue, TempScope};
use util::{elements, run_ok};

#[test]
fn long_loops_do_not_accumulate_temporaries() {
    let mut interp = Interpreter::default();
    let body = Stmt::assign(
        "acc",
        Expr::binary(
            BinaryOp::Add,
            Expr::var("acc"),
            Expr::binary(BinaryOp::Mul, Expr::var("i"), Expr::Long(2)),
        ),
    );
    let image = ProgramImage::new()
        .statement(Stmt::assign("acc", Expr::Long(0)))
        .statement(Stmt::for_loop("i", Expr::Long(1), Expr::Long(1000), None, body));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("acc"), Some(Scalar::Long(1_001_000)));
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn array_results_from_calls_are_reclaimed_each_iteration() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .routine(RoutineImage::function(
            "ramp",
            &["n"],
            vec![Stmt::ret(Some(Expr::binary(
                BinaryOp::Add,
                Expr::call("indgen", vec![Arg::pos(Expr::Long(4))]),
                Expr::var("n"),
            )))],
        ))
        .statement(Stmt::for_loop(
            "k",
            Expr::Long(0),
            Expr::Long(49),
            None,
            Stmt::assign("last", Expr::call("ramp", vec![Arg::pos(Expr::var("k"))])),
        ));
    run_ok(&mut interp, &image);
    assert_eq!(elements(&interp, "last"), vec![49, 50, 51, 52]);
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn a_failure_part_way_through_an_expression_leaves_no_temporaries() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::assign("x", Expr::longs(&[1, 2, 3])))
        .statement(Stmt::assign(
            "y",
            Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::Long(10)),
                Expr::var("never_set"),
            ),
        ))
        .statement(Stmt::assign(
            "z",
            Expr::binary(
                BinaryOp::Div,
                Expr::call("indgen", vec![Arg::pos(Expr::Long(3))]),
                Expr::Long(0),
            ),
        ));
    let report = interp.run_image(&image).expect("compiles");
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.errors[0].code, ErrorCode::IllegalClass);
    assert!(interp.value("y").is_none_or(|value| matches!(value, SymbolValue::Undefined)));
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn evaluating_an_expression_hands_back_a_copy() {
    let mut interp = Interpreter::default();
    let value = interp
        .eval(&Expr::binary(BinaryOp::Mul, Expr::longs(&[1, 2]), Expr::Double(0.5)))
        .expect("eval");
    match value {
        SymbolValue::Array(array) => {
            assert_eq!(array.dims, vec![2]);
            assert_eq!(array.data.wide_at(1).as_f64(), 1.0);
        }
        other => panic!("expected an array, got {other:?}"),
    }
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn kept_temporaries_outlive_their_scope() {
    let mut interp = Interpreter::default();
    let kept = {
        let mut outer = TempScope::new(&mut interp);
        let kept = {
            let mut inner = TempScope::new(&mut outer);
            inner
                .store_mut()
                .allocate_temp(SymbolValue::Scalar(Scalar::Long(1)))
                .expect("scratch");
            let kept = inner
                .store_mut()
                .allocate_temp(SymbolValue::Scalar(Scalar::Long(2)))
                .expect("result");
            inner.finish(kept)
        };
        assert_eq!(outer.store().live_temps(), 1);
        assert_eq!(
            outer.store().value(kept).expect("still live"),
            &SymbolValue::Scalar(Scalar::Long(2))
        );
        kept
    };
    assert!(interp.store().value(kept).is_err());
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn lists_moved_into_a_parameter_keep_their_members() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .routine(RoutineImage::function(
            "second",
            &["x"],
            vec![
                Stmt::assign(
                    "x",
                    Expr::List(vec![Arg::pos(Expr::Long(1)), Arg::pos(Expr::Long(2))]),
                ),
                Stmt::ret(Some(Expr::extract(Expr::var("x"), vec![Expr::Long(1)]))),
            ],
        ))
        .statement(Stmt::assign("r", Expr::call("second", vec![Arg::pos(Expr::Long(0))])));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("r"), Some(Scalar::Long(2)));
    assert_eq!(interp.store().live_temps(), 0);
}
