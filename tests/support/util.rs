//==================================================
// File: tests/support/util.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared helpers for integration tests
// Objective: Build interpreters, run images and read back element values
//==================================================

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use orrery::image::loader::write_image;
use orrery::{EngineConfig, Interpreter, ProgramImage, RunReport, SymbolValue};

/// Run an image and fail the test if any statement failed.
pub fn run_ok(interp: &mut Interpreter, image: &ProgramImage) -> RunReport {
    let report = interp.run_image(image).expect("image compiles");
    assert!(report.is_success(), "statements failed: {:?}", report.errors);
    report
}

pub fn interpreter_with(config: EngineConfig) -> Interpreter {
    Interpreter::new(config)
}

/// Every element of a numeric variable, widened to i64.
pub fn elements(interp: &Interpreter, name: &str) -> Vec<i64> {
    match interp.value(name) {
        Some(SymbolValue::Array(array)) => (0..array.element_count())
            .map(|k| array.data.wide_at(k).as_i64())
            .collect(),
        Some(SymbolValue::Scalar(scalar)) => vec![scalar.as_i64()],
        other => panic!("{name} is not numeric: {other:?}"),
    }
}

pub fn write_json(dir: &Path, file: &str, image: &ProgramImage) -> PathBuf {
    let path = dir.join(file);
    write_image(&path, image).expect("write image");
    path
}

/// Deep script recursion needs more native stack than a test thread has.
pub fn with_big_stack<T: Send + 'static>(body: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(body)
        .expect("spawn")
        .join()
        .expect("test thread")
}

//==================================================
// End of file
//==================================================
