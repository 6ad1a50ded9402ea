#[path = "support/util.rs"]
mod util;

use orrery::image::loader::{read_image, write_image};
use orrery::image::{CaseArm, StmtKind};
use orrery::interpreter::errors::ErrorCode;
use orrery::symbol::{BinaryOp, IncludeMode};
use orrery::{
    Arg, DebugCommand, EngineConfig, Expr, Interpreter, ProgramImage, RoutineImage, Scalar,
    ScriptedDebugger, Stmt,
};
use util::{interpreter_with, run_ok, write_json};

fn bump(name: &str) -> Stmt {
    Stmt::assign(
        name,
        Expr::binary(BinaryOp::Add, Expr::var(name), Expr::Long(1)),
    )
}

fn compare(op: BinaryOp, name: &str, value: i32) -> Expr {
    Expr::binary(op, Expr::var(name), Expr::Long(value))
}

fn arm(condition: Expr, body: Stmt) -> CaseArm {
    CaseArm { condition, body }
}

#[test]
fn includes_run_every_time_unless_loaded_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let included = write_json(dir.path(), "bump.json", &ProgramImage::new().statement(bump("count")));
    let path = included.display().to_string();

    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::assign("count", Expr::Long(0)))
        .statement(Stmt::include(&path, IncludeMode::Once))
        .statement(Stmt::include(&path, IncludeMode::Once))
        .statement(Stmt::include(&path, IncludeMode::Always))
        .statement(Stmt::include(&path, IncludeMode::Always));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("count"), Some(Scalar::Long(3)));
    assert_eq!(interp.store().live_temps(), 0);
}

#[test]
fn missing_includes_report_an_io_error() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::include("no/such/file.json", IncludeMode::Always))
        .statement(Stmt::assign("after", Expr::Long(1)));
    let report = interp.run_image(&image).expect("compiles");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, ErrorCode::Io);
    assert_eq!(interp.scalar("after"), Some(Scalar::Long(1)));
}

#[test]
fn deferred_routines_are_found_on_the_include_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let square = RoutineImage::function(
        "square",
        &["x"],
        vec![Stmt::ret(Some(Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::var("x"))))],
    );
    write_json(dir.path(), "square.json", &ProgramImage::new().routine(square));

    let mut interp = interpreter_with(EngineConfig::default().with_include_path(dir.path()));
    let image = ProgramImage::new()
        .statement(Stmt::assign("a", Expr::call("square", vec![Arg::pos(Expr::Long(7))])))
        .statement(Stmt::assign("b", Expr::call("square", vec![Arg::pos(Expr::var("a"))])));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("a"), Some(Scalar::Long(49)));
    assert_eq!(interp.scalar("b"), Some(Scalar::Long(2401)));
}

#[test]
fn unknown_routines_fail_when_called_not_when_compiled() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::assign("before", Expr::Long(1)))
        .statement(Stmt::call("nowhere_to_be_found", vec![]));
    let report = interp.run_image(&image).expect("compiles");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, ErrorCode::UnknownName);
    assert_eq!(interp.scalar("before"), Some(Scalar::Long(1)));
}

#[test]
fn debugger_runs_inserted_statements_and_aborts() {
    let debugger = ScriptedDebugger::new([
        DebugCommand::Execute(Box::new(Stmt::assign("inserted", Expr::Long(9)))),
        DebugCommand::ContinueTo(Some(4)),
        DebugCommand::Abort,
    ]);
    let log = debugger.log.clone();

    let mut interp = Interpreter::default();
    interp.set_debug_hook(Box::new(debugger));
    interp.add_breakpoint(2);
    let image = ProgramImage::new()
        .statement(Stmt::assign("a", Expr::Long(1)).at(1))
        .statement(Stmt::assign("b", Expr::Long(2)).at(2))
        .statement(Stmt::assign("c", Expr::Long(3)).at(3))
        .statement(Stmt::assign("d", Expr::Long(4)).at(4))
        .statement(Stmt::assign("e", Expr::Long(5)).at(5));
    let report = interp.run_image(&image).expect("compiles");

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, ErrorCode::Aborted);
    assert_eq!(interp.scalar("inserted"), Some(Scalar::Long(9)));
    assert_eq!(interp.scalar("c"), Some(Scalar::Long(3)));
    assert!(interp.scalar("d").is_none());
    assert!(interp.scalar("e").is_none());

    let log = log.lock();
    assert_eq!(log.len(), 3, "{log:?}");
    assert!(log[0].contains("line 2") && log[1].contains("line 2"));
    assert!(log[2].contains("line 4"));
}

#[test]
fn compiled_images_run_like_their_json_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = ProgramImage::new()
        .routine(RoutineImage::function(
            "twice",
            &["v"],
            vec![Stmt::ret(Some(Expr::binary(BinaryOp::Mul, Expr::var("v"), Expr::Long(2))))],
        ))
        .statement(Stmt::assign("r", Expr::call("twice", vec![Arg::pos(Expr::longs(&[1, 2, 3]))])))
        .statement(Stmt::call("print", vec![Arg::pos(Expr::var("r"))]))
        .numbered();
    let json = write_json(dir.path(), "prog.json", &image);
    let evb = dir.path().join("prog.evb");
    write_image(&evb, &read_image(&json).expect("read json")).expect("write evb");
    assert_eq!(read_image(&evb).expect("read evb"), image);

    let mut outputs = Vec::new();
    for path in [&json, &evb] {
        let mut interp = Interpreter::default();
        let buffer = interp.capture_output();
        let report = interp.run_file(path).expect("runs");
        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(report.statements, 2);
        outputs.push(buffer.lock().clone());
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], "2 4 6\n");
}

#[test]
fn case_switches_take_the_first_matching_arm() {
    let mut interp = Interpreter::default();
    let set = |name: &str, value: i32| Stmt::assign(name, Expr::Long(value));
    let image = ProgramImage::new()
        .statement(Stmt::assign("x", Expr::Long(2)))
        .statement(Stmt::new(StmtKind::Case {
            arms: vec![
                arm(compare(BinaryOp::Eq, "x", 1), set("pick", 10)),
                arm(compare(BinaryOp::Eq, "x", 2), set("pick", 20)),
                arm(compare(BinaryOp::Gt, "x", 0), set("pick", 30)),
            ],
            otherwise: Some(Box::new(set("pick", -1))),
        }))
        .statement(Stmt::new(StmtKind::Case {
            arms: vec![arm(compare(BinaryOp::Lt, "x", 0), set("miss", 1))],
            otherwise: Some(Box::new(set("miss", -1))),
        }))
        .statement(Stmt::new(StmtKind::Ncase {
            selector: Expr::Long(1),
            arms: vec![set("n", 0), set("n", 1), set("n", 2)],
            otherwise: None,
        }))
        .statement(Stmt::new(StmtKind::Ncase {
            selector: Expr::Long(5),
            arms: vec![set("m", 0)],
            otherwise: Some(Box::new(set("m", 99))),
        }))
        .statement(Stmt::new(StmtKind::Ncase {
            selector: Expr::Long(-1),
            arms: vec![set("untouched", 1)],
            otherwise: None,
        }));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("pick"), Some(Scalar::Long(20)));
    assert_eq!(interp.scalar("miss"), Some(Scalar::Long(-1)));
    assert_eq!(interp.scalar("n"), Some(Scalar::Long(1)));
    assert_eq!(interp.scalar("m"), Some(Scalar::Long(99)));
    assert!(interp.scalar("untouched").is_none());
}

#[test]
fn post_test_loops_run_their_body_at_least_once() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::assign("i", Expr::Long(10)))
        .statement(Stmt::assign("j", Expr::Long(10)))
        .statement(Stmt::assign("k", Expr::Long(10)))
        .statement(Stmt::repeat_until(bump("i"), compare(BinaryOp::Gt, "i", 0)))
        .statement(Stmt::do_while(bump("j"), compare(BinaryOp::Lt, "j", 5)))
        .statement(Stmt::while_do(compare(BinaryOp::Lt, "k", 5), bump("k")))
        .statement(Stmt::assign("w", Expr::Long(0)))
        .statement(Stmt::while_do(compare(BinaryOp::Lt, "w", 5), bump("w")));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("i"), Some(Scalar::Long(11)));
    assert_eq!(interp.scalar("j"), Some(Scalar::Long(11)));
    assert_eq!(interp.scalar("k"), Some(Scalar::Long(10)));
    assert_eq!(interp.scalar("w"), Some(Scalar::Long(5)));
}

#[test]
fn continue_skips_the_exit_test_and_break_leaves_normally() {
    let skip_below = |name: &str, limit: i32| {
        Stmt::if_then(
            compare(BinaryOp::Lt, name, limit),
            Stmt::new(StmtKind::Continue),
            None,
        )
    };
    let stop_at = |name: &str, limit: i32| {
        Stmt::if_then(compare(BinaryOp::Eq, name, limit), Stmt::new(StmtKind::Break), None)
    };
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::assign("i", Expr::Long(0)))
        .statement(Stmt::assign("hits", Expr::Long(0)))
        .statement(Stmt::repeat_until(
            Stmt::block(vec![bump("i"), skip_below("i", 3), bump("hits")]),
            Expr::Long(1),
        ))
        .statement(Stmt::assign("j", Expr::Long(0)))
        .statement(Stmt::do_while(
            Stmt::block(vec![bump("j"), skip_below("j", 3)]),
            Expr::Long(0),
        ))
        .statement(Stmt::assign("k", Expr::Long(0)))
        .statement(Stmt::while_do(
            Expr::Long(1),
            Stmt::block(vec![bump("k"), stop_at("k", 4)]),
        ))
        .statement(Stmt::for_loop("m", Expr::Long(0), Expr::Long(10), None, stop_at("m", 3)))
        .statement(Stmt::assign("after", Expr::Long(1)));
    let report = interp.run_image(&image).expect("compiles");
    assert!(report.is_success(), "{:?}", report.errors);
    assert_eq!(interp.scalar("i"), Some(Scalar::Long(3)));
    assert_eq!(interp.scalar("hits"), Some(Scalar::Long(1)));
    assert_eq!(interp.scalar("j"), Some(Scalar::Long(3)));
    assert_eq!(interp.scalar("k"), Some(Scalar::Long(4)));
    assert_eq!(interp.scalar("m"), Some(Scalar::Long(3)));
    assert_eq!(interp.scalar("after"), Some(Scalar::Long(1)));
}

#[test]
fn for_counters_take_the_widest_bound_type() {
    let mut interp = Interpreter::default();
    let image = ProgramImage::new()
        .statement(Stmt::assign("n", Expr::Long(0)))
        .statement(Stmt::for_loop(
            "t",
            Expr::Long(0),
            Expr::Long(2),
            Some(Expr::Double(0.5)),
            bump("n"),
        ))
        .statement(Stmt::assign("acc", Expr::Long(0)))
        .statement(Stmt::for_loop(
            "d",
            Expr::Long(3),
            Expr::Long(1),
            Some(Expr::Long(-1)),
            Stmt::assign(
                "acc",
                Expr::binary(
                    BinaryOp::Add,
                    Expr::binary(BinaryOp::Mul, Expr::var("acc"), Expr::Long(10)),
                    Expr::var("d"),
                ),
            ),
        ));
    run_ok(&mut interp, &image);
    assert_eq!(interp.scalar("n"), Some(Scalar::Long(5)));
    assert_eq!(interp.scalar("t"), Some(Scalar::Double(2.5)));
    assert_eq!(interp.scalar("acc"), Some(Scalar::Long(321)));
    assert_eq!(interp.scalar("d"), Some(Scalar::Long(0)));
}
