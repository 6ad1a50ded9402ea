#[path = "support/util.rs"]
mod util;

use orrery::image::StmtKind;
use orrery::interpreter::errors::{ArityProblem, EngineError, ErrorCode};
use orrery::symbol::BinaryOp;
use orrery::{Arg, EngineConfig, Expr, Interpreter, ProgramImage, RoutineImage, Scalar, Stmt};
use util::{run_ok, with_big_stack};

fn factorial() -> RoutineImage {
    let n = || Expr::var("n");
    RoutineImage::function(
        "fact",
        &["n"],
        vec![Stmt::if_then(
            Expr::binary(BinaryOp::Le, n(), Expr::Long(1)),
            Stmt::ret(Some(Expr::Long(1))),
            Some(Stmt::ret(Some(Expr::binary(
                BinaryOp::Mul,
                n(),
                Expr::call(
                    "fact",
                    vec![Arg::pos(Expr::binary(BinaryOp::Sub, n(), Expr::Long(1)))],
                ),
            )))),
        )],
    )
}

#[test]
fn recursive_calls_see_their_own_parameter_bindings() {
    let (value, temps) = with_big_stack(|| {
        let mut interp = Interpreter::default();
        run_ok(
            &mut interp,
            &ProgramImage::new()
                .routine(factorial())
                .statement(Stmt::assign("r", Expr::call("fact", vec![Arg::pos(Expr::Long(10))]))),
        );
        (interp.scalar("r"), interp.store().live_temps())
    });
    assert_eq!(value, Some(Scalar::Long(3_628_800)));
    assert_eq!(temps, 0);
}

#[test]
fn runaway_recursion_stops_at_the_depth_limit_and_cleans_up() {
    let (report, temps, r) = with_big_stack(|| {
        let mut interp = Interpreter::new(EngineConfig::default().with_max_depth(64));
        let image = ProgramImage::new()
            .routine(RoutineImage::function(
                "forever",
                &["n"],
                vec![Stmt::ret(Some(Expr::call(
                    "forever",
                    vec![Arg::pos(Expr::binary(BinaryOp::Add, Expr::var("n"), Expr::Long(1)))],
                )))],
            ))
            .statement(Stmt::assign("r", Expr::call("forever", vec![Arg::pos(Expr::Long(0))])));
        let report = interp.run_image(&image).expect("compiles");
        let r = interp.value("r").cloned();
        (report, interp.store().live_temps(), r)
    });
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, ErrorCode::Allocation);
    assert_eq!(temps, 0);
    assert!(!matches!(r, Some(orrery::SymbolValue::Scalar(_))));
}

#[test]
fn swapped_recursive_arguments_read_the_callers_bindings() {
    let mut interp = Interpreter::default();
    let var = Expr::var;
    let image = ProgramImage::new()
        .routine(RoutineImage::function(
            "swap",
            &["a", "b", "depth"],
            vec![Stmt::if_then(
                Expr::binary(BinaryOp::Eq, var("depth"), Expr::Long(0)),
                Stmt::ret(Some(Expr::binary(BinaryOp::Sub, var("a"), var("b")))),
                Some(Stmt::ret(Some(Expr::call(
                    "swap",
                    vec![
                        Arg::pos(var("b")),
                        Arg::pos(var("a")),
                        Arg::pos(Expr::binary(BinaryOp::Sub, var("depth"), Expr::Long(1))),
                    ],
                )))),
            )],
        ))
        .statement(Stmt::assign(
            "r",
            Expr::call(
                "swap",
                vec![Arg::pos(Expr::Long(10)), Arg::pos(Expr::Long(3)), Arg::pos(Expr::Long(1))],
            ),
        ));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("r"), Some(Scalar::Long(-7)));
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn omitted_parameters_can_be_passed_along_as_outputs() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .routine(RoutineImage::subroutine(
            "fill",
            &["out"],
            vec![Stmt::assign("out", Expr::Long(5))],
        ))
        .routine(RoutineImage::subroutine(
            "relay",
            &["out"],
            vec![Stmt::call("fill", vec![Arg::pos(Expr::var("out"))])],
        ))
        .statement(Stmt::call("relay", vec![]))
        .statement(Stmt::call("relay", vec![Arg::pos(Expr::var("got"))]));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("got"), Some(Scalar::Long(5)));
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn mode_keywords_bind_in_any_position() {
    let mut interp = Interpreter::default();
    let data = Expr::longs(&[1, 2, 6]);
    let image = ProgramImage::new()
        .statement(Stmt::assign(
            "a",
            Expr::call("total", vec![Arg::flag("mean"), Arg::pos(data.clone()), Arg::flag("double")]),
        ))
        .statement(Stmt::assign(
            "b",
            Expr::call("total", vec![Arg::pos(data), Arg::key("mean", Expr::Long(0))]),
        ));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("a"), Some(Scalar::Double(3.0)));
    assert_eq!(interp.scalar("b"), Some(Scalar::Float(9.0)));
}

#[test]
fn arity_errors_name_the_routine() {
    let mut interp = Interpreter::default();
    let err = interp
        .eval(&Expr::call("cal_jd", vec![Arg::pos(Expr::Long(2000))]))
        .expect_err("too few");
    assert_eq!(
        err,
        EngineError::arity("CAL_JD", ArityProblem::TooFew { min: 3, given: 1 })
    );
}

#[test]
fn return_all_unwinds_every_level_and_skips_the_rest_of_the_statement() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .routine(RoutineImage::subroutine(
            "inner",
            &[],
            vec![Stmt::new(StmtKind::ReturnAll), Stmt::assign("$after_inner", Expr::Long(1))],
        ))
        .routine(RoutineImage::subroutine(
            "outer",
            &[],
            vec![Stmt::call("inner", vec![]), Stmt::assign("$after_outer", Expr::Long(1))],
        ))
        .statement(Stmt::call("outer", vec![]))
        .statement(Stmt::assign("next", Expr::Long(2)));
    let report = interp.run_image(&image).expect("compiles");
    assert!(report.is_success(), "{:?}", report.errors);
    assert!(report.returned_all);
    assert!(interp.scalar("$after_inner").is_none());
    assert!(interp.scalar("$after_outer").is_none());
    assert_eq!(interp.scalar("next"), Some(Scalar::Long(2)));
    assert_eq!(interp.store().live_temps(), 0);
}
